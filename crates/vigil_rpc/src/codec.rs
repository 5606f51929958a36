//! Newline-delimited JSON framing.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::RpcError;
use crate::message::Message;

/// Writes one message followed by a newline and flushes the stream.
pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads the next message, skipping blank lines.
///
/// Returns `Ok(None)` at end of stream. A line that is not a valid message
/// yields [`RpcError::Codec`]; the stream stays usable afterwards.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Message>, RpcError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        return Ok(Some(serde_json::from_str(trimmed)?));
    }
}
