use std::fmt;

pub mod protocol;

pub use protocol::{Command, CommandKind, Credentials, Fields, Frame, ProtocolError, ShotRequest, parse_command};

/// Longest account name the directory accepts.
pub const MAX_USERNAME_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(pub String);

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Username {
    /// Account names end up as the first column of a whitespace separated
    /// file, so only a conservative character set is allowed.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || s.len() > MAX_USERNAME_LEN {
            return None;
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_')) {
            return None;
        }
        Some(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
