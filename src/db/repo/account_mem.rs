use crate::db::DbResult;
use crate::db::repo::AccountRepo;
use crate::models::account::AccountRecord;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory account directory, nothing survives a restart.
#[derive(Default)]
pub struct AccountMemoryRepository {
    accounts: RwLock<HashMap<String, AccountRecord>>,
}

impl AccountMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AccountRepo for AccountMemoryRepository {
    async fn get_by_username(&self, username: &str) -> DbResult<Option<AccountRecord>> {
        Ok(self.accounts.read().get(username).cloned())
    }

    async fn append_if_absent(&self, account: AccountRecord) -> DbResult<bool> {
        let mut g = self.accounts.write();
        if g.contains_key(&account.username) {
            return Ok(false);
        }
        g.insert(account.username.clone(), account);
        Ok(true)
    }
}
