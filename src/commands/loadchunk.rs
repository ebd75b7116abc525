use crate::commands::CommandResult;
use crate::models::chunk::ChunkCoord;
use crate::state::pool::SlotId;
use crate::state::registry::Registry;

pub async fn loadchunk(registry: &mut Registry, slot: SlotId, coord: ChunkCoord) -> CommandResult {
    let chunks = registry.services.chunk.clone();
    let chunk = chunks.get_or_create(coord).await?;

    tracing::debug!(%slot, cx = coord.cx, cy = coord.cy, "sending chunk");
    for row in chunk.wire_rows() {
        registry.send_to(slot, row);
    }
    Ok(())
}
