use crate::commands::CommandResult;
use crate::error::AuthError;
use crate::state::pool::SlotId;
use crate::state::registry::Registry;
use orbis_core::Credentials;
use orbis_core::protocol::reply;

pub async fn signup(registry: &mut Registry, slot: SlotId, creds: Credentials) -> CommandResult {
    let accounts = registry.services.account.clone();
    let token = match accounts.register(&creds.username, &creds.password).await {
        Ok(true) => {
            tracing::info!(%slot, username = %creds.username, "account created");
            reply::SIGNUP_ACCEPTED
        }
        Ok(false) => reply::SIGNUP_TAKEN,
        Err(AuthError::InvalidUsername) => reply::SIGNUP_DECLINED,
        Err(e) => return Err(e.into()),
    };

    registry.send_to(slot, token);
    Ok(())
}
