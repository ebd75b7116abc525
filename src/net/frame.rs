//! Framing for the game protocol.
//!
//! Outbound frames are terminated by a single NUL byte. Inbound, either a NUL
//! or a newline ends a frame, which keeps the server usable from `nc` and
//! `telnet` as well as from the game client. Frames are raw bytes; nothing
//! here assumes they are valid UTF-8.

use bytes::{Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

pub const FRAME_TERMINATOR: u8 = 0;

pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.extend_from_slice(payload);
    out.push(FRAME_TERMINATOR);
    out
}

/// Splits a byte stream into frames of at most `max_len` bytes.
///
/// Longer frames are truncated and the remainder up to the next terminator is
/// dropped. Empty frames are skipped.
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    max_len: usize,
    // true while skipping the tail of an oversized frame
    discarding: bool,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R, max_len: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(max_len.max(64)),
            max_len: max_len.max(1),
            discarding: false,
        }
    }

    /// Next frame, or `None` once the peer has closed the stream.
    pub async fn next_frame(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            if let Some(frame) = self.take_frame() {
                return Ok(Some(frame));
            }

            if self.inner.read_buf(&mut self.buf).await? == 0 {
                // an unterminated frame at end of stream still counts
                let rest = self.buf.split();
                if std::mem::take(&mut self.discarding) {
                    return Ok(None);
                }
                return Ok(self.finish(rest));
            }
        }
    }

    fn take_frame(&mut self) -> Option<Bytes> {
        loop {
            match self.buf.iter().position(|b| matches!(*b, FRAME_TERMINATOR | b'\n')) {
                Some(pos) => {
                    let mut raw = self.buf.split_to(pos + 1);
                    if std::mem::take(&mut self.discarding) {
                        continue;
                    }
                    raw.truncate(pos);
                    if let Some(frame) = self.finish(raw) {
                        return Some(frame);
                    }
                }
                None if self.discarding => {
                    self.buf.clear();
                    return None;
                }
                None if self.buf.len() >= self.max_len => {
                    let raw = self.buf.split_to(self.max_len);
                    self.buf.clear();
                    self.discarding = true;
                    return self.finish(raw);
                }
                None => return None,
            }
        }
    }

    fn finish(&self, mut raw: BytesMut) -> Option<Bytes> {
        raw.truncate(self.max_len);
        if raw.last() == Some(&b'\r') {
            raw.truncate(raw.len() - 1);
        }
        if raw.is_empty() {
            return None;
        }
        Some(raw.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &[u8], max_len: usize) -> Vec<Bytes> {
        let mut reader = FrameReader::new(input, max_len);
        let mut frames = Vec::new();
        while let Some(frame) = reader.next_frame().await.unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn splits_on_nul_and_newline() {
        let frames = collect(b"hello\0!use:Alice\r\nbye\n", 512).await;
        assert_eq!(frames, vec!["hello", "!use:Alice", "bye"]);
    }

    #[tokio::test]
    async fn empty_frames_are_skipped() {
        let frames = collect(b"\0\n\r\nping\0\0", 512).await;
        assert_eq!(frames, vec!["ping"]);
    }

    #[tokio::test]
    async fn trailing_partial_frame_is_delivered() {
        let frames = collect(b"one\0two", 512).await;
        assert_eq!(frames, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn oversized_frames_are_truncated() {
        let frames = collect(b"abcdefghij\0xy\0", 4).await;
        assert_eq!(frames, vec!["abcd", "xy"]);

        let frames = collect(b"abcd\0efgh", 4).await;
        assert_eq!(frames, vec!["abcd", "efgh"]);
    }

    #[tokio::test]
    async fn oversized_tail_at_eof_is_dropped() {
        let frames = collect(b"abcdefgh", 3).await;
        assert_eq!(frames, vec!["abc"]);
    }

    #[tokio::test]
    async fn bytes_are_kept_as_sent() {
        let frames = collect(b"caf\xe9\0\xff\xfe\n", 512).await;
        assert_eq!(frames, vec![&b"caf\xe9"[..], &b"\xff\xfe"[..]]);

        // truncation may split a multi-byte character; the half stays as is
        let frames = collect("a\u{e9}\0".as_bytes(), 2).await;
        assert_eq!(frames, vec![&b"a\xc3"[..]]);
    }

    #[test]
    fn encoded_frames_end_in_nul() {
        assert_eq!(encode_frame(b"OK"), b"OK\0".to_vec());
        assert_eq!(encode_frame(b"\xe9"), b"\xe9\0".to_vec());
    }
}
