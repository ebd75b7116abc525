//! The game loop.
//!
//! A single task owns the [`Registry`] and processes connection events one at
//! a time, interleaved with the periodic broadcasts. Nothing else mutates game
//! state, so a frame's replies and broadcasts are always queued before the
//! next frame is looked at.

use crate::commands::process_frame;
use crate::net::OutputHandle;
use crate::state::pool::{ConnId, SlotId};
use crate::state::registry::Registry;
use bytes::Bytes;
use orbis_core::protocol::reply;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior};

#[derive(Debug)]
pub enum GameEvent {
    /// A new stream was accepted; the slot (or `None` when full) goes back on `admitted`
    Connected {
        peer: SocketAddr,
        conn: ConnId,
        output: OutputHandle,
        admitted: oneshot::Sender<Option<SlotId>>,
    },
    Frame { slot: SlotId, conn: ConnId, data: Bytes },
    /// Peer closed the stream, a read failed or the writer stopped
    Disconnected { slot: SlotId, conn: ConnId },
}

fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Runs until a client sends the shutdown sentinel, `shutdown` resolves or
/// every event sender is gone. All connections are closed on the way out.
pub async fn run(
    mut registry: Registry,
    mut events: mpsc::Receiver<GameEvent>,
    shutdown: impl Future<Output = ()>,
) {
    let config = registry.config.clone();
    let mut shot_tick = ticker(config.shot_broadcast_interval());
    let mut clear_tick = ticker(config.shot_clear_interval());
    let mut departure_tick = ticker(config.departure_interval());
    let mut count_tick = ticker(config.player_count_interval());

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received");
                break;
            }
            event = events.recv() => match event {
                Some(event) => handle_event(&mut registry, event).await,
                None => break,
            },
            _ = shot_tick.tick() => {
                registry.broadcast_shots();
            }
            _ = clear_tick.tick() => {
                registry.clear_expired_shots();
            }
            _ = departure_tick.tick() => announce_departures(&mut registry),
            _ = count_tick.tick() => {
                let msg = format!("{}{}", reply::PLAYER_COUNT_PREFIX, registry.client_count());
                registry.broadcast(msg);
            }
        }

        if registry.is_shutdown_requested() {
            tracing::info!("shutdown sentinel received");
            break;
        }
    }

    registry.close_all();
    tracing::info!("game loop stopped");
}

async fn handle_event(registry: &mut Registry, event: GameEvent) {
    match event {
        GameEvent::Connected {
            peer,
            conn,
            output,
            admitted,
        } => {
            let slot = registry.admit(peer, conn, output);
            if admitted.send(slot).is_err() {
                // reader went away before it learnt its slot
                if let Some(slot) = slot {
                    registry.disconnect(slot);
                }
            }
        }
        // events from a stream that already lost its slot are stale
        GameEvent::Frame { slot, conn, data } => {
            if registry.owns(slot, conn) {
                process_frame(registry, slot, data).await;
            }
        }
        GameEvent::Disconnected { slot, conn } => {
            if registry.owns(slot, conn) {
                registry.disconnect(slot);
            }
        }
    }
}

fn announce_departures(registry: &mut Registry) {
    while let Some(name) = registry.take_pending_departure() {
        tracing::info!(%name, "player left");
        let msg = format!("{}{}", reply::PLAYER_LEFT_PREFIX, name);
        registry.broadcast(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::repo::{AccountMemoryRepository, ChunkMemoryRepository};
    use crate::net::{OutFrame, SessionOut};
    use crate::state::registry::Repos;
    use std::sync::Arc;

    fn quiet_registry(departure_ms: u64) -> Registry {
        let config = Config {
            max_clients: 4,
            departure_ms,
            player_count_ms: 60_000,
            ..Config::default()
        };
        let repos = Repos {
            account: Arc::new(AccountMemoryRepository::new()),
            chunk: Arc::new(ChunkMemoryRepository::new()),
        };
        Registry::new(Arc::new(config), repos)
    }

    async fn connect(events: &mpsc::Sender<GameEvent>, port: u16) -> (SlotId, ConnId, SessionOut) {
        let (output, out) = OutputHandle::channel(16);
        let (tx, rx) = oneshot::channel();
        let conn = ConnId(port.into());
        events
            .send(GameEvent::Connected {
                peer: SocketAddr::from(([127, 0, 0, 1], port)),
                conn,
                output,
                admitted: tx,
            })
            .await
            .unwrap();
        (rx.await.unwrap().unwrap(), conn, out)
    }

    fn frame(slot: SlotId, conn: ConnId, data: &'static str) -> GameEvent {
        GameEvent::Frame {
            slot,
            conn,
            data: Bytes::from_static(data.as_bytes()),
        }
    }

    async fn next_text(out: &mut SessionOut) -> String {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(2), out.recv())
                .await
                .expect("timed out waiting for a frame")
                .expect("output closed");
            if let OutFrame::Data(data) = frame {
                if !data.starts_with(b"shoot:") {
                    return String::from_utf8(data.to_vec()).unwrap();
                }
            }
        }
    }

    #[tokio::test]
    async fn departures_are_announced_to_remaining_players() {
        let (tx, rx) = mpsc::channel(8);
        let game = tokio::spawn(run(quiet_registry(10), rx, std::future::pending()));

        let (a, conn_a, mut out_a) = connect(&tx, 1).await;
        let (b, conn_b, mut out_b) = connect(&tx, 2).await;
        assert_eq!(next_text(&mut out_a).await, "OK");
        assert_eq!(next_text(&mut out_b).await, "OK");

        tx.send(frame(b, conn_b, "!use:Bob")).await.unwrap();
        tx.send(GameEvent::Disconnected { slot: b, conn: conn_b }).await.unwrap();
        assert_eq!(next_text(&mut out_a).await, "usrl:Bob");

        tx.send(frame(a, conn_a, "/shutdown")).await.unwrap();
        game.await.unwrap();

        let mut rest = Vec::new();
        while let Some(frame) = out_a.recv().await {
            rest.push(frame);
        }
        assert_eq!(rest, vec![OutFrame::Data("/shutdown".into()), OutFrame::Close]);
    }

    #[tokio::test]
    async fn stale_connection_cannot_touch_reused_slot() {
        let (tx, rx) = mpsc::channel(8);
        let game = tokio::spawn(run(quiet_registry(60_000), rx, std::future::pending()));

        let (a, conn_a, mut out_a) = connect(&tx, 1).await;
        let (old, old_conn, _old_out) = connect(&tx, 2).await;
        tx.send(GameEvent::Disconnected { slot: old, conn: old_conn }).await.unwrap();

        let (new, new_conn, mut out_new) = connect(&tx, 3).await;
        assert_eq!(new, old);
        assert_eq!(next_text(&mut out_new).await, "OK");

        // late events from the first occupant are dropped
        tx.send(frame(old, old_conn, "ghost")).await.unwrap();
        tx.send(GameEvent::Disconnected { slot: old, conn: old_conn }).await.unwrap();
        tx.send(frame(new, new_conn, "alive")).await.unwrap();
        assert_eq!(next_text(&mut out_a).await, "OK");
        assert_eq!(next_text(&mut out_a).await, "alive");

        tx.send(frame(a, conn_a, "/shutdown")).await.unwrap();
        game.await.unwrap();
        assert_eq!(next_text(&mut out_new).await, "/shutdown");
    }

    #[tokio::test]
    async fn loop_ends_when_shutdown_resolves() {
        let (_tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let game = tokio::spawn(run(quiet_registry(250), rx, async {
            let _ = stop_rx.await;
        }));

        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), game)
            .await
            .unwrap()
            .unwrap();
    }
}
