use crate::net::frame::encode_frame;
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[async_trait]
pub trait ClientSink: Send {
    async fn send_frame(&mut self, frame: &[u8], seq: u64) -> anyhow::Result<()>;

    /// Called once after the last frame.
    async fn close(&mut self) -> anyhow::Result<()>;
}

/// Writes NUL terminated frames to a socket.
pub struct FrameSink<W> {
    writer: W,
}

impl<W> FrameSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W> ClientSink for FrameSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_frame(&mut self, frame: &[u8], _seq: u64) -> anyhow::Result<()> {
        self.writer.write_all(&encode_frame(frame)).await?;
        Ok(())
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}
