//! Length-prefixed framing.
//!
//! Every message in both directions is a `u32` big-endian payload length
//! followed by exactly that many payload bytes. The very first frame a
//! client sends is special: its payload is the bare UTF-8 display name with
//! no command envelope (the authentication handshake).

use crate::error::{ProtocolError, ProtocolResult};
use std::io::{Read, Write};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum accepted payload length. Anything larger is rejected before the
/// payload buffer is allocated.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

fn check_len(len: usize) -> ProtocolResult<usize> {
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    Ok(len)
}

/// Builds a framed message: length prefix followed by the payload.
pub fn encode_frame(payload: &[u8]) -> ProtocolResult<Vec<u8>> {
    check_len(payload.len())?;
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Writes one framed message to a blocking stream.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> ProtocolResult<()> {
    let frame = encode_frame(payload)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Reads one framed message from a blocking stream.
pub fn read_frame<R: Read>(reader: &mut R) -> ProtocolResult<Vec<u8>> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header)?;
    let len = check_len(u32::from_be_bytes(header) as usize)?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

/// Writes one framed message to a tokio stream.
pub async fn write_frame_async<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> ProtocolResult<()> {
    let frame = encode_frame(payload)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one framed message from a tokio stream.
pub async fn read_frame_async<R: AsyncRead + Unpin>(reader: &mut R) -> ProtocolResult<Vec<u8>> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await?;
    let len = check_len(u32::from_be_bytes(header) as usize)?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Sends the authentication handshake: the display name, unframed payload.
pub fn write_handshake<W: Write>(writer: &mut W, name: &str) -> ProtocolResult<()> {
    write_frame(writer, name.as_bytes())
}

/// Receives the authentication handshake.
pub fn read_handshake<R: Read>(reader: &mut R) -> ProtocolResult<String> {
    let payload = read_frame(reader)?;
    Ok(String::from_utf8(payload)?)
}

/// Sends the authentication handshake on a tokio stream.
pub async fn write_handshake_async<W: AsyncWrite + Unpin>(
    writer: &mut W,
    name: &str,
) -> ProtocolResult<()> {
    write_frame_async(writer, name.as_bytes()).await
}

/// Receives the authentication handshake on a tokio stream.
pub async fn read_handshake_async<R: AsyncRead + Unpin>(reader: &mut R) -> ProtocolResult<String> {
    let payload = read_frame_async(reader).await?;
    Ok(String::from_utf8(payload)?)
}
