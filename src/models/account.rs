use crate::models::RecordError;
use std::fmt;

/// One row of the account directory.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountRecord {
    /// Username (distinct)
    pub username: String,
    /// Salted argon2 hash in PHC string format
    pub password_hash: String,
}

impl fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRecord")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl AccountRecord {
    pub fn to_row(&self) -> String {
        format!("{} {}", self.username, self.password_hash)
    }

    pub fn parse_row(row: &str) -> Result<Self, RecordError> {
        let cols: Vec<&str> = row.split_whitespace().collect();
        let [username, password_hash] = cols.as_slice() else {
            return Err(RecordError::Columns {
                expected: 2,
                got: cols.len(),
            });
        };

        Ok(Self {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_format() {
        let rec = AccountRecord {
            username: "alice".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
        };
        assert_eq!(AccountRecord::parse_row(&rec.to_row()).unwrap(), rec);
        assert!(!format!("{rec:?}").contains("argon2"));
    }

    #[test]
    fn short_rows_are_rejected() {
        assert_eq!(
            AccountRecord::parse_row("alice"),
            Err(RecordError::Columns { expected: 2, got: 1 })
        );
    }
}
