use crate::models::shot::{ShotId, ShotRecord};
use orbis_core::ShotRequest;
use orbis_core::protocol::reply;
use rand::Rng;
use std::collections::HashSet;
use tokio::time::Instant;

/// Shots in flight. All shots expire together on [`ProjectileRegistry::clear`].
#[derive(Debug, Default)]
pub struct ProjectileRegistry {
    shots: Vec<ShotRecord>,
    ids: HashSet<ShotId>,
}

impl ProjectileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, req: ShotRequest, now: Instant) -> ShotId {
        let mut rng = rand::rng();
        let id = loop {
            let candidate = ShotId(rng.random());
            if self.ids.insert(candidate) {
                break candidate;
            }
        };

        self.shots.push(ShotRecord::new(id, req, now));
        id
    }

    /// The combined `shoot:` broadcast, or `None` when nothing is in flight.
    pub fn encode(&self, now: Instant) -> Option<String> {
        if self.shots.is_empty() {
            return None;
        }

        let mut out = String::from(reply::SHOTS_PREFIX);
        for shot in &self.shots {
            shot.write_block(&mut out, now);
        }
        Some(out)
    }

    /// Drops every shot, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let n = self.shots.len();
        self.shots.clear();
        self.ids.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }
}
