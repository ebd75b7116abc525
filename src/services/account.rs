use crate::db::repo::AccountRepo;
use crate::error::AuthError;
use crate::models::account::AccountRecord;
use argon2::Argon2;
use orbis_core::Username;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use std::sync::Arc;

pub type AuthResult<T> = Result<T, AuthError>;

pub struct AccountService {
    repo: Arc<dyn AccountRepo>,
    argon: Argon2<'static>,
}

impl AccountService {
    pub fn new(repo: Arc<dyn AccountRepo>) -> Self {
        let argon = Argon2::default();
        Self { repo, argon }
    }

    pub async fn exists(&self, username: &str) -> AuthResult<bool> {
        Ok(self.repo.get_by_username(username).await?.is_some())
    }

    pub async fn login(&self, username: &str, password: &str) -> AuthResult<AccountRecord> {
        let Some(account) = self.repo.get_by_username(username).await? else {
            return Err(AuthError::UserNotFound);
        };

        // hashing runs on the blocking pool
        let argon = self.argon.clone();
        let password = password.to_string();
        let stored = account.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored)?;
            argon.verify_password(password.as_bytes(), &parsed)
        })
        .await
        .map_err(|e| AuthError::InternalError(e.to_string()))?;

        match verified {
            Ok(()) => Ok(account),
            Err(password_hash::Error::Password) => Err(AuthError::InvalidPassword),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns `Ok(false)` when the username is already taken.
    pub async fn register(&self, username: &str, password: &str) -> AuthResult<bool> {
        let Some(username) = Username::parse(username) else {
            return Err(AuthError::InvalidUsername);
        };

        if self.exists(username.as_str()).await? {
            return Ok(false);
        }

        let argon = self.argon.clone();
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon
                .hash_password(password.as_bytes(), &salt)
                .map(|h| h.to_string())
        })
        .await
        .map_err(|e| AuthError::InternalError(e.to_string()))??;

        let account = AccountRecord {
            username: username.0,
            password_hash,
        };
        Ok(self.repo.append_if_absent(account).await?)
    }
}
