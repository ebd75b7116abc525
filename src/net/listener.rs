use crate::config::Config;
use crate::error::{AppResult, InfraError};
use crate::game::GameEvent;
use crate::net::frame::FrameReader;
use crate::net::output::OutputHandle;
use crate::net::sink::FrameSink;
use crate::state::pool::{ConnId, SlotId};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

/// Accepts connections and hands each one to the game loop. Once the game loop
/// has stopped it waits for every connection to finish writing, then returns.
pub async fn serve(listener: TcpListener, events: mpsc::Sender<GameEvent>, config: Arc<Config>) {
    let mut connections = JoinSet::new();
    let mut next_conn = 0u64;

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            Some(_) = connections.join_next() => continue,
            _ = events.closed() => break,
        };

        match accepted {
            Ok((stream, peer)) => {
                next_conn += 1;
                let conn = ConnId(next_conn);
                tracing::debug!(%peer, %conn, "connection accepted");

                let events = events.clone();
                let config = config.clone();
                connections.spawn(async move {
                    if let Err(e) = handle_connection(stream, peer, conn, events, config).await {
                        tracing::warn!(%peer, error = %e, "connection error");
                    }
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to accept connection");
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            }
        }
    }

    drop(listener);
    if !connections.is_empty() {
        tracing::debug!(open = connections.len(), "flushing open connections");
    }
    while connections.join_next().await.is_some() {}

    tracing::info!("listener stopped");
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    conn: ConnId,
    events: mpsc::Sender<GameEvent>,
    config: Arc<Config>,
) -> AppResult<()> {
    let _ = stream.set_nodelay(true);
    let (read_half, write_half) = stream.into_split();

    let (output, session_out) = OutputHandle::channel(config.outbound_queue);
    let mut writer = tokio::spawn(async move {
        if let Err(e) = session_out.run(FrameSink::new(write_half)).await {
            tracing::debug!(%peer, error = %e, "writer stopped");
        }
    });

    let (admitted_tx, admitted_rx) = oneshot::channel();
    events
        .send(GameEvent::Connected {
            peer,
            conn,
            output,
            admitted: admitted_tx,
        })
        .await
        .map_err(|_| InfraError::Net("game loop is not running".into()))?;

    let Ok(Some(slot)) = admitted_rx.await else {
        // rejected: let the writer deliver FULL before the socket goes away
        let _ = writer.await;
        return Ok(());
    };

    let mut reader = FrameReader::new(read_half, config.buffer_size);
    let mut writer_done = false;
    let result = tokio::select! {
        result = read_loop(&mut reader, slot, conn, &events) => result,
        // the game loop closed or cut off this client
        _ = &mut writer => {
            writer_done = true;
            Ok(())
        }
    };
    if let Err(e) = result {
        tracing::debug!(%peer, error = %e, "read failed");
    }

    let _ = events.send(GameEvent::Disconnected { slot, conn }).await;
    if !writer_done {
        let _ = writer.await;
    }

    Ok(())
}

async fn read_loop<R: AsyncRead + Unpin>(
    reader: &mut FrameReader<R>,
    slot: SlotId,
    conn: ConnId,
    events: &mpsc::Sender<GameEvent>,
) -> io::Result<()> {
    while let Some(data) = reader.next_frame().await? {
        if events.send(GameEvent::Frame { slot, conn, data }).await.is_err() {
            break;
        }
    }
    Ok(())
}
