use crate::net::sink::ClientSink;
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutFrame {
    /// One protocol frame, without terminator
    Data(Bytes),
    /// Flush what is queued and close the connection
    Close,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OutputError {
    #[error("outbound queue is full")]
    Full,

    #[error("connection writer has stopped")]
    Closed,
}

/// Cloneable handle onto a connection's bounded outbound queue. Frames are
/// written in the order they were queued. Queueing never waits: a client
/// that stops reading fills its queue and gets [`OutputError::Full`].
#[derive(Clone, Debug)]
pub struct OutputHandle {
    tx: mpsc::Sender<(OutFrame, u64)>,
    next_seq: Arc<AtomicU64>,
    abort: Arc<Notify>,
}

impl OutputHandle {
    pub fn new(tx: mpsc::Sender<(OutFrame, u64)>, abort: Arc<Notify>) -> Self {
        Self {
            tx,
            next_seq: Arc::new(AtomicU64::new(1)),
            abort,
        }
    }

    pub fn channel(capacity: usize) -> (Self, SessionOut) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let abort = Arc::new(Notify::new());
        (Self::new(tx, abort.clone()), SessionOut::new(rx, abort))
    }

    #[inline]
    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn send(&self, frame: impl Into<Bytes>) -> Result<(), OutputError> {
        self.tx
            .try_send((OutFrame::Data(frame.into()), self.next_seq()))
            .map_err(|e| match e {
                TrySendError::Full(_) => OutputError::Full,
                TrySendError::Closed(_) => OutputError::Closed,
            })
    }

    /// Flush and close. When the queue is full there is no room for the close
    /// marker, so the writer is aborted and the queued frames are dropped.
    pub fn close(&self) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send((OutFrame::Close, self.next_seq())) {
            self.abort();
        }
    }

    /// Stops the writer without flushing, even if it is stuck on a write.
    pub fn abort(&self) {
        self.abort.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving side of an [`OutputHandle`], drained by the connection's writer task.
pub struct SessionOut {
    rx: mpsc::Receiver<(OutFrame, u64)>,
    abort: Arc<Notify>,
}

impl SessionOut {
    pub fn new(rx: mpsc::Receiver<(OutFrame, u64)>, abort: Arc<Notify>) -> Self {
        Self { rx, abort }
    }

    /// Next queued frame, for callers that read the queue directly.
    pub async fn recv(&mut self) -> Option<OutFrame> {
        self.rx.recv().await.map(|(frame, _)| frame)
    }

    /// Pending frames that are already queued, without waiting.
    pub fn drain(&mut self) -> Vec<OutFrame> {
        let mut frames = Vec::new();
        while let Ok((frame, _)) = self.rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    pub async fn run<C>(mut self, mut client: C) -> anyhow::Result<()>
    where
        C: ClientSink,
    {
        let abort = self.abort.clone();
        let pump = async {
            while let Some((frame, seq)) = self.rx.recv().await {
                match frame {
                    OutFrame::Data(data) => {
                        tracing::trace!(seq, len = data.len(), "writing frame");
                        client.send_frame(&data, seq).await?;
                    }
                    OutFrame::Close => break,
                }
            }

            client.close().await
        };

        tokio::select! {
            result = pump => result,
            _ = abort.notified() => Err(anyhow::anyhow!("output aborted")),
        }
    }
}
