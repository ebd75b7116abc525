use crate::state::pool::SlotId;
use crate::state::registry::Registry;
use bytes::Bytes;

/// Plain traffic goes to every other connection exactly as it arrived.
pub fn relay(registry: &mut Registry, origin: SlotId, frame: Bytes) {
    if frame.is_empty() {
        return;
    }
    tracing::trace!(slot = %origin, len = frame.len(), "relaying frame");
    registry.broadcast_except(origin, frame);
}
