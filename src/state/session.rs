use crate::state::pool::SlotId;
use std::collections::VecDeque;

/// Display names per slot, plus the names of players who left and have not
/// been announced yet.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    names: Vec<String>,
    departures: VecDeque<String>,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            names: vec![String::new(); capacity],
            departures: VecDeque::new(),
        }
    }

    /// Names are not required to be unique.
    pub fn join(&mut self, slot: SlotId, name: impl Into<String>) {
        if let Some(entry) = self.names.get_mut(slot.0) {
            *entry = name.into();
        }
    }

    /// Display name of the slot, empty while anonymous.
    pub fn name(&self, slot: SlotId) -> &str {
        self.names.get(slot.0).map(String::as_str).unwrap_or("")
    }

    pub fn is_active(&self, name: &str) -> bool {
        !name.is_empty() && self.names.iter().any(|n| n == name)
    }

    /// Forget the slot's name and queue a departure notice for it.
    pub fn depart(&mut self, slot: SlotId) -> Option<String> {
        let name = std::mem::take(self.names.get_mut(slot.0)?);
        if name.is_empty() {
            return None;
        }
        self.departures.push_back(name.clone());
        Some(name)
    }

    pub fn take_pending_departure(&mut self) -> Option<String> {
        self.departures.pop_front()
    }

    pub fn pending_departures(&self) -> usize {
        self.departures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_lookup() {
        let mut sessions = SessionRegistry::new(2);
        assert_eq!(sessions.name(SlotId(0)), "");
        sessions.join(SlotId(0), "Alice");
        sessions.join(SlotId(1), "Alice");
        assert_eq!(sessions.name(SlotId(1)), "Alice");
        assert!(sessions.is_active("Alice"));
        assert!(!sessions.is_active(""));
        assert!(!sessions.is_active("Bob"));
    }

    #[test]
    fn departures_are_never_dropped() {
        let mut sessions = SessionRegistry::new(4);
        for (idx, name) in ["a", "b", "c"].iter().enumerate() {
            sessions.join(SlotId(idx), *name);
        }
        sessions.depart(SlotId(0));
        sessions.depart(SlotId(1));
        sessions.depart(SlotId(2));
        // anonymous players leave silently
        assert_eq!(sessions.depart(SlotId(3)), None);

        assert_eq!(sessions.pending_departures(), 3);
        assert_eq!(sessions.take_pending_departure().as_deref(), Some("a"));
        assert_eq!(sessions.take_pending_departure().as_deref(), Some("b"));
        assert_eq!(sessions.take_pending_departure().as_deref(), Some("c"));
        assert_eq!(sessions.take_pending_departure(), None);
        assert!(!sessions.is_active("a"));
    }
}
