//! Length-prefixed message framing per RFC 5734 §4.
//!
//! Every EPP data unit is preceded by a 4-byte big-endian total length
//! that counts the header itself. [`read_frame`] and [`write_frame`]
//! validate the length before any allocation happens and apply a
//! 10-second deadline to each payload I/O, so a stalled peer cannot pin
//! a session to a half-transferred frame. Whole-message timeouts (idle,
//! session lifetime) are layered on top by the session engine.

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::FrameError;

/// Length of the frame header: a `u32` total length, big-endian.
pub const HEADER_LEN: usize = 4;

/// Largest payload that still fits a 32-bit total length.
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize - HEADER_LEN;

/// Deadline applied to each payload read and to each frame write.
pub const IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Reads one whole frame and returns its payload, without the header.
///
/// The header read has no deadline of its own (callers race it against
/// their idle and shutdown signals), but once a header has arrived the
/// payload must follow within [`IO_TIMEOUT`].
///
/// # Errors
///
/// - [`FrameError::InvalidLength`] if the declared total is below the
///   header size.
/// - [`FrameError::Timeout`] if the payload stalls past the deadline.
/// - [`FrameError::Io`] on connection failure or a short read.
pub async fn read_frame<S>(stream: &mut S) -> Result<Bytes, FrameError>
where
    S: AsyncRead + Unpin,
{
    read_frame_with_deadline(stream, IO_TIMEOUT).await
}

async fn read_frame_with_deadline<S>(
    stream: &mut S,
    deadline: Duration,
) -> Result<Bytes, FrameError>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    stream.read_exact(&mut header).await?;

    let total = u32::from_be_bytes(header);
    let payload_len = payload_length(total)?;

    let mut payload = vec![0u8; payload_len];
    match timeout(deadline, stream.read_exact(&mut payload)).await {
        Ok(read) => {
            read?;
        }
        Err(_) => return Err(FrameError::Timeout),
    }

    Ok(Bytes::from(payload))
}

/// Writes `payload` as a single frame: big-endian total length, then the
/// payload bytes, flushed, all under [`IO_TIMEOUT`].
///
/// # Errors
///
/// - [`FrameError::TooLarge`] if `payload.len() + 4` exceeds `u32::MAX`.
/// - [`FrameError::Timeout`] if the write stalls past the deadline.
/// - [`FrameError::Io`] on connection failure.
pub async fn write_frame<S>(stream: &mut S, payload: &[u8]) -> Result<(), FrameError>
where
    S: AsyncWrite + Unpin,
{
    write_frame_with_deadline(stream, payload, IO_TIMEOUT).await
}

async fn write_frame_with_deadline<S>(
    stream: &mut S,
    payload: &[u8],
    deadline: Duration,
) -> Result<(), FrameError>
where
    S: AsyncWrite + Unpin,
{
    let total = total_length(payload.len())?;

    let write = async {
        stream.write_all(&total.to_be_bytes()).await?;
        stream.write_all(payload).await?;
        stream.flush().await
    };

    match timeout(deadline, write).await {
        Ok(written) => written.map_err(FrameError::Io),
        Err(_) => Err(FrameError::Timeout),
    }
}

/// Computes the total frame length for a payload, rejecting payloads that
/// do not fit a 32-bit length.
pub fn total_length(payload_len: usize) -> Result<u32, FrameError> {
    payload_len
        .checked_add(HEADER_LEN)
        .and_then(|total| u32::try_from(total).ok())
        .ok_or(FrameError::TooLarge { size: payload_len })
}

/// Computes the payload length from a declared total, rejecting totals
/// smaller than the header.
pub fn payload_length(total: u32) -> Result<usize, FrameError> {
    if (total as usize) < HEADER_LEN {
        return Err(FrameError::InvalidLength(total));
    }
    Ok(total as usize - HEADER_LEN)
}
