use crate::config::Config;
use crate::db::repo::{AccountFileRepository, AccountRepo, ChunkFileRepository, ChunkRepo};
use crate::net::{OutputError, OutputHandle};
use crate::services::{AccountService, ChunkService};
use crate::state::pool::{ConnId, ConnectionPool, Slot, SlotId};
use crate::state::session::SessionRegistry;
use crate::state::shots::ProjectileRegistry;
use bytes::Bytes;
use orbis_core::protocol::reply;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::Instant;

pub struct Repos {
    pub account: Arc<dyn AccountRepo>,
    pub chunk: Arc<dyn ChunkRepo>,
}

impl Repos {
    /// Flat file stores below `config.data_dir`.
    pub fn open(config: &Config) -> Self {
        Self {
            account: Arc::new(AccountFileRepository::new(config.accounts_path())),
            chunk: Arc::new(ChunkFileRepository::new(config.chunk_dir())),
        }
    }
}

pub struct Services {
    pub account: Arc<AccountService>,
    pub chunk: Arc<ChunkService>,
}

/// All live game state. Owned by the game loop, which is the only mutator.
pub struct Registry {
    pub config: Arc<Config>,
    pub repos: Arc<Repos>,
    pub services: Arc<Services>,
    pub sessions: SessionRegistry,
    pub shots: ProjectileRegistry,
    pool: ConnectionPool,
    shutdown_requested: bool,
}

impl Registry {
    pub fn new(config: Arc<Config>, repos: Repos) -> Self {
        let repos = Arc::new(repos);
        let services = Arc::new(Services {
            account: Arc::new(AccountService::new(repos.account.clone())),
            chunk: Arc::new(ChunkService::new(repos.chunk.clone())),
        });

        Self {
            pool: ConnectionPool::new(config.max_clients),
            sessions: SessionRegistry::new(config.max_clients),
            shots: ProjectileRegistry::new(),
            config,
            repos,
            services,
            shutdown_requested: false,
        }
    }

    /// Takes a new connection into the lowest free slot and greets it with
    /// `OK`. When every slot is taken the peer gets `FULL` and is closed.
    pub fn admit(&mut self, peer: SocketAddr, conn: ConnId, output: OutputHandle) -> Option<SlotId> {
        let slot = Slot {
            peer,
            conn,
            output: output.clone(),
        };

        match self.pool.allocate(slot) {
            Some(id) => {
                let _ = output.send(reply::SERVER_NOT_FULL);
                tracing::info!(%peer, %conn, slot = %id, clients = self.pool.len(), "client admitted");
                Some(id)
            }
            None => {
                let _ = output.send(reply::SERVER_FULL);
                output.close();
                tracing::warn!(%peer, capacity = self.pool.capacity(), "server full, connection rejected");
                None
            }
        }
    }

    /// Frees the slot and queues a departure notice for its player.
    pub fn disconnect(&mut self, slot: SlotId) -> Option<String> {
        let released = self.pool.release(slot)?;
        released.output.close();

        let name = self.sessions.depart(slot);
        tracing::info!(
            peer = %released.peer,
            %slot,
            name = name.as_deref().unwrap_or(""),
            clients = self.pool.len(),
            "client disconnected"
        );
        name
    }

    pub fn client_count(&self) -> usize {
        self.pool.len()
    }

    /// True while `slot` is still held by the connection `conn`.
    pub fn owns(&self, slot: SlotId, conn: ConnId) -> bool {
        self.pool.get(slot).is_some_and(|s| s.conn == conn)
    }

    pub fn send_to(&mut self, slot: SlotId, frame: impl Into<Bytes>) {
        let stalled = self
            .pool
            .get(slot)
            .is_some_and(|s| s.output.send(frame).is_err_and(|e| e == OutputError::Full));
        if stalled {
            self.drop_stalled(slot);
        }
    }

    pub fn broadcast(&mut self, frame: impl Into<Bytes>) {
        self.fan_out(None, frame.into());
    }

    pub fn broadcast_except(&mut self, origin: SlotId, frame: impl Into<Bytes>) {
        self.fan_out(Some(origin), frame.into());
    }

    fn fan_out(&mut self, skip: Option<SlotId>, frame: Bytes) {
        let stalled: Vec<SlotId> = self
            .pool
            .iter()
            .filter(|(id, _)| Some(*id) != skip)
            .filter(|(_, s)| s.output.send(frame.clone()) == Err(OutputError::Full))
            .map(|(id, _)| id)
            .collect();

        for slot in stalled {
            self.drop_stalled(slot);
        }
    }

    /// A client whose queue is full has stopped reading; it is cut off so the
    /// game loop never waits on it.
    fn drop_stalled(&mut self, slot: SlotId) {
        tracing::warn!(%slot, queue = self.config.outbound_queue, "client is not reading, disconnecting");
        self.disconnect(slot);
    }

    pub fn take_pending_departure(&mut self) -> Option<String> {
        self.sessions.take_pending_departure()
    }

    /// Sends the combined shot message to everyone. Returns false when there
    /// was nothing in flight.
    pub fn broadcast_shots(&mut self) -> bool {
        match self.shots.encode(Instant::now()) {
            Some(msg) => {
                self.broadcast(msg);
                true
            }
            None => false,
        }
    }

    /// Announces the current shots one last time, then expires all of them.
    pub fn clear_expired_shots(&mut self) -> usize {
        self.broadcast_shots();
        let cleared = self.shots.clear();
        if cleared > 0 {
            tracing::trace!(cleared, "shots expired");
        }
        cleared
    }

    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    /// Closes every connection after its queued frames are written. Stalled
    /// connections are aborted instead.
    pub fn close_all(&mut self) {
        let ids: Vec<SlotId> = self.pool.iter().map(|(id, _)| id).collect();
        for id in ids {
            if let Some(slot) = self.pool.release(id) {
                slot.output.close();
            }
        }
    }
}
