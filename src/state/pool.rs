use crate::net::OutputHandle;
use std::collections::BTreeSet;
use std::fmt;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One accepted stream. Slot indexes are reused; connection ids never are,
/// so a late event from a closed stream cannot reach the slot's next owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone)]
pub struct Slot {
    pub peer: SocketAddr,
    pub conn: ConnId,
    pub output: OutputHandle,
}

/// Fixed arena of connection slots. Capacity never changes after construction
/// and the lowest free index is always handed out first.
#[derive(Debug)]
pub struct ConnectionPool {
    slots: Vec<Option<Slot>>,
    free: BTreeSet<usize>,
}

impl ConnectionPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            free: (0..capacity).collect(),
        }
    }

    pub fn allocate(&mut self, slot: Slot) -> Option<SlotId> {
        let idx = self.free.pop_first()?;
        self.slots[idx] = Some(slot);
        Some(SlotId(idx))
    }

    pub fn release(&mut self, id: SlotId) -> Option<Slot> {
        let slot = self.slots.get_mut(id.0)?.take()?;
        self.free.insert(id.0);
        Some(slot)
    }

    pub fn get(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(id.0)?.as_ref()
    }

    /// Occupied slots in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Slot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|s| (SlotId(idx), s)))
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }
}
