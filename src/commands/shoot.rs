use crate::commands::CommandResult;
use crate::state::pool::SlotId;
use crate::state::registry::Registry;
use orbis_core::ShotRequest;
use tokio::time::Instant;

pub fn shoot(registry: &mut Registry, slot: SlotId, req: ShotRequest) -> CommandResult {
    let id = registry.shots.spawn(req, Instant::now());
    tracing::debug!(%slot, shot = %id, in_flight = registry.shots.len(), "shot fired");

    registry.broadcast_shots();
    Ok(())
}
