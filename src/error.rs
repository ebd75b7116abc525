use crate::db::error::DbError;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
}

#[derive(Debug, Error)]
pub enum ConfigErrorKind {
    #[error("failed to read file: {0}")]
    Read(std::io::Error),

    #[error("failed to parse file: {0}")]
    Parse(toml::de::Error),

    #[error("invalid environment variable {0}: {1}")]
    InvalidEnv(String, String),

    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: std::path::PathBuf,
        #[source]
        source: ConfigErrorKind,
    },

    #[error("invalid configuration: {0}")]
    Settings(#[from] ConfigErrorKind),

    #[error("network issue: {0}")]
    Net(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,

    #[error("invalid password")]
    InvalidPassword,

    #[error("invalid username")]
    InvalidUsername,

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Password(#[from] password_hash::Error),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Errors that mean "wrong credentials" rather than "the server broke".
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::UserNotFound | AuthError::InvalidPassword | AuthError::InvalidUsername
        )
    }
}
