//! Length-prefixed frame transport
//!
//! Each frame on the wire is a 4-byte big-endian signed length followed by
//! that many payload bytes. The transport knows nothing about payloads.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the length prefix
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Default upper bound for a single frame (4 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed mid-frame: received {received} of {expected} bytes")]
    Truncated { expected: usize, received: usize },

    #[error("Invalid frame length: {0}")]
    InvalidLength(i32),

    #[error("Frame too large: {0} bytes (max: {1})")]
    FrameTooLarge(usize, usize),

    #[error("Transport closed")]
    Closed,
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Reads and writes whole frames over a byte stream
pub struct FrameTransport<S> {
    stream: S,
    max_frame_size: usize,
    closed: bool,
    frames_read: u64,
    frames_written: u64,
}

impl<S> FrameTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self::with_max_frame_size(stream, DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(stream: S, max_frame_size: usize) -> Self {
        Self {
            stream,
            max_frame_size,
            closed: false,
            frames_read: 0,
            frames_written: 0,
        }
    }

    /// Fill `buf` completely, returning how many bytes arrived before EOF
    async fn fill(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.stream.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` when the peer closes the stream between frames.
    pub async fn read_frame(&mut self) -> TransportResult<Option<Bytes>> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        match self.fill(&mut prefix).await? {
            0 => return Ok(None),
            LENGTH_PREFIX_LEN => {}
            received => {
                return Err(TransportError::Truncated {
                    expected: LENGTH_PREFIX_LEN,
                    received,
                })
            }
        }

        let length = i32::from_be_bytes(prefix);
        let length = usize::try_from(length).map_err(|_| TransportError::InvalidLength(length))?;
        if length > self.max_frame_size {
            return Err(TransportError::FrameTooLarge(length, self.max_frame_size));
        }

        let mut payload = BytesMut::zeroed(length);
        let received = self.fill(&mut payload).await?;
        if received < length {
            return Err(TransportError::Truncated {
                expected: length,
                received,
            });
        }

        self.frames_read += 1;
        Ok(Some(payload.freeze()))
    }

    /// Write one frame, prefix and payload in a single write
    pub async fn write_frame(&mut self, payload: &[u8]) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if payload.len() > self.max_frame_size {
            return Err(TransportError::FrameTooLarge(payload.len(), self.max_frame_size));
        }
        let length = i32::try_from(payload.len())
            .map_err(|_| TransportError::FrameTooLarge(payload.len(), i32::MAX as usize))?;

        let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_LEN + payload.len());
        buf.put_i32(length);
        buf.put_slice(payload);

        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;
        self.frames_written += 1;
        Ok(())
    }

    /// Shut down the stream; later calls are no-ops
    pub async fn close(&mut self) -> TransportResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream.shutdown().await?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Get the underlying stream
    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}
