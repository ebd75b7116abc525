use crate::commands::CommandResult;
use crate::state::pool::SlotId;
use crate::state::registry::Registry;

pub fn join(registry: &mut Registry, slot: SlotId, name: String) -> CommandResult {
    tracing::info!(%slot, %name, "player joined");
    registry.sessions.join(slot, name);
    Ok(())
}
