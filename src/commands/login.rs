use crate::commands::CommandResult;
use crate::state::pool::SlotId;
use crate::state::registry::Registry;
use orbis_core::Credentials;
use orbis_core::protocol::reply;

pub async fn login(registry: &mut Registry, slot: SlotId, creds: Credentials) -> CommandResult {
    // one session per name, whatever the password
    if registry.sessions.is_active(&creds.username) {
        tracing::info!(%slot, username = %creds.username, "login refused, already in game");
        registry.send_to(slot, reply::LOGIN_ALREADY_ON);
        return Ok(());
    }

    let accounts = registry.services.account.clone();
    match accounts.login(&creds.username, &creds.password).await {
        Ok(account) => {
            tracing::info!(%slot, username = %account.username, "login accepted");
            registry.send_to(slot, reply::LOGIN_ACCEPTED);
            Ok(())
        }
        Err(e) if e.is_rejection() => {
            tracing::info!(%slot, username = %creds.username, reason = %e, "login declined");
            registry.send_to(slot, reply::LOGIN_DECLINED);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
