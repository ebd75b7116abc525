use crate::db::DbResult;
use crate::models::account::AccountRecord;

#[async_trait::async_trait]
pub trait AccountRepo: Send + Sync {
    /// Looks up an account by its exact username
    async fn get_by_username(&self, username: &str) -> DbResult<Option<AccountRecord>>;

    /// Stores the account unless the username is already taken. Returns whether it was stored.
    async fn append_if_absent(&self, account: AccountRecord) -> DbResult<bool>;
}
