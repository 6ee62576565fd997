//! Framing over the local stream socket.
//!
//! ```text
//! [u32 length] [u32 channel] [u32 offset_hi] [u32 offset_lo] [u32 flags] [payload: length bytes]
//! ```
//!
//! All descriptor words are big-endian. `length` counts only the payload; the
//! four words after it are written as `0xFFFFFFFF, 0, 0, 0` and ignored on
//! receive.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::protocol::{Command, CONTROL_CHANNEL, DESCRIPTOR_SIZE, MAX_FRAME_SIZE};
use crate::tagstruct::TagStructWriter;

/// Byte offset of the request tag value inside a sealed frame:
/// descriptor, then `'L'` + command, then `'L'`.
const TAG_OFFSET: usize = DESCRIPTOR_SIZE + 5 + 1;

/// An outgoing command under construction. The tag is a placeholder until
/// the dispatcher assigns one.
#[derive(Debug)]
pub struct Request {
    command: Command,
    payload: TagStructWriter,
}

impl Request {
    pub fn new(command: Command) -> Self {
        let mut payload = TagStructWriter::new();
        payload.put_u32(command as u32).put_u32(0);
        Self { command, payload }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    /// Arguments following command and tag.
    pub fn args(&mut self) -> &mut TagStructWriter {
        &mut self.payload
    }

    /// Prepends the descriptor. Fails before anything is sent when the
    /// payload exceeds the frame limit.
    pub fn into_frame(self) -> Result<BytesMut> {
        let payload = self.payload.as_slice();
        if payload.len() > MAX_FRAME_SIZE {
            return Err(Error::RequestTooLarge {
                size: payload.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        let mut frame = BytesMut::with_capacity(DESCRIPTOR_SIZE + payload.len());
        frame.put_u32(payload.len() as u32);
        frame.put_u32(CONTROL_CHANNEL);
        frame.put_u32(0);
        frame.put_u32(0);
        frame.put_u32(0);
        frame.put_slice(payload);
        Ok(frame)
    }
}

/// Writes the request tag into a frame produced by [`Request::into_frame`].
pub fn patch_tag(frame: &mut BytesMut, tag: u32) {
    frame[TAG_OFFSET..TAG_OFFSET + 4].copy_from_slice(&tag.to_be_bytes());
}

/// Reading half of the connection.
pub struct FrameReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads one frame and returns its payload (command, tag and body).
    pub async fn read_frame(&mut self) -> Result<Bytes> {
        let mut length = [0u8; 4];
        self.inner.read_exact(&mut length).await.map_err(closed)?;
        let n = u32::from_be_bytes(length) as usize;
        if n > MAX_FRAME_SIZE {
            return Err(Error::malformed(format!(
                "response size {n} is too long (only {MAX_FRAME_SIZE} allowed)"
            )));
        }

        let mut rest = vec![0u8; DESCRIPTOR_SIZE - 4 + n];
        self.inner.read_exact(&mut rest).await.map_err(closed)?;
        Ok(Bytes::from(rest).slice(DESCRIPTOR_SIZE - 4..))
    }
}

/// Writing half of the connection.
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Sends a complete frame; partial writes are retried until done.
    pub async fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.inner.write_all(frame).await?;
        self.inner.flush().await
    }

    pub async fn shutdown(&mut self) {
        let _ = self.inner.shutdown().await;
    }
}

fn closed(e: std::io::Error) -> Error {
    log::debug!("read side closed: {}", e);
    Error::ConnectionClosed
}
