//! Helpers for reading the attached session stream: scanning a growing,
//! unframed byte buffer for a completion marker, and draining residual
//! bytes until the container goes quiet.

use std::time::Duration;

use futures::StreamExt;
use tokio::time::Instant;

use crate::error::{EngineError, Result};
use crate::runtime::AttachStream;

/// Reads from `stream`, accumulating decoded bytes, until `marker` appears
/// in the accumulated buffer or `timeout` elapses.
///
/// Partial reads are normal: a marker can straddle two chunks, so the
/// buffer keeps growing across iterations rather than scanning each chunk
/// in isolation.
pub async fn read_until_marker(
    stream: &mut AttachStream,
    marker: &str,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let mut buf = String::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(EngineError::CommandTimeout);
        }

        match tokio::time::timeout(remaining, stream.next()).await {
            Ok(Some(Ok(chunk))) => {
                buf.push_str(&String::from_utf8_lossy(chunk.as_bytes()));
                if buf.contains(marker) {
                    return Ok(());
                }
            }
            Ok(Some(Err(e))) => return Err(e),
            Ok(None) => return Err(EngineError::SessionClosed),
            Err(_) => return Err(EngineError::CommandTimeout),
        }
    }
}

/// Consumes whatever the stream produces until `inactivity` passes with no
/// new bytes, or the stream closes. Used to swallow startup banners, the
/// echo of `stty -echo` itself, and anything left over after a command's
/// marker has already been seen.
pub async fn drain_stream(stream: &mut AttachStream, inactivity: Duration) -> Result<()> {
    loop {
        match tokio::time::timeout(inactivity, stream.next()).await {
            Ok(Some(Ok(_chunk))) => continue,
            Ok(Some(Err(e))) => return Err(e),
            Ok(None) => return Ok(()),
            Err(_) => return Ok(()),
        }
    }
}
