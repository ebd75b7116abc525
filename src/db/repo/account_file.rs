use crate::db::DbResult;
use crate::db::error::DbError;
use crate::db::repo::AccountRepo;
use crate::models::account::AccountRecord;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only flat file with one `username hash` row per account.
pub struct AccountFileRepository {
    path: PathBuf,
    // serializes the check-then-append in append_if_absent
    append_lock: Mutex<()>,
}

impl AccountFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> DbResult<Vec<AccountRecord>> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DbError::io(&self.path)(e)),
        };

        let mut accounts = Vec::new();
        for (lineno, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match AccountRecord::parse_row(line) {
                Ok(rec) => accounts.push(rec),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), line = lineno + 1, error = %e, "skipping malformed account row");
                }
            }
        }
        Ok(accounts)
    }
}

#[async_trait::async_trait]
impl AccountRepo for AccountFileRepository {
    async fn get_by_username(&self, username: &str) -> DbResult<Option<AccountRecord>> {
        Ok(self.read_all().await?.into_iter().find(|a| a.username == username))
    }

    async fn append_if_absent(&self, account: AccountRecord) -> DbResult<bool> {
        let _guard = self.append_lock.lock().await;

        if self.get_by_username(&account.username).await?.is_some() {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(DbError::io(parent))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(DbError::io(&self.path))?;

        let row = format!("{}\n", account.to_row());
        file.write_all(row.as_bytes())
            .await
            .map_err(DbError::io(&self.path))?;
        file.flush().await.map_err(DbError::io(&self.path))?;

        Ok(true)
    }
}
