//! Wire framing: an ASCII decimal byte count, a single `\n`, then exactly that many
//! bytes of XML payload. Over any `AsyncRead`/`AsyncWrite` so it is unit-testable
//! against an in-memory duplex stream as well as a real socket.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ServerError;

/// Longest header line we're willing to buffer before giving up — well beyond any
/// realistic payload size, just a backstop against a client that never sends `\n`.
const MAX_HEADER_LEN: usize = 20;

/// Largest payload a length header is allowed to declare. A batch this size already
/// dwarfs any realistic request; anything bigger is refused before the allocation,
/// not after.
const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ServerError> {
    let mut header = Vec::with_capacity(MAX_HEADER_LEN);
    loop {
        let byte = reader.read_u8().await.map_err(|_| ServerError::BadHeader)?;
        if byte == b'\n' {
            break;
        }
        if !byte.is_ascii_digit() || header.len() >= MAX_HEADER_LEN {
            return Err(ServerError::BadHeader);
        }
        header.push(byte);
    }
    if header.is_empty() {
        return Err(ServerError::BadHeader);
    }
    let len: usize = std::str::from_utf8(&header)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(ServerError::BadHeader)?;
    if len > MAX_PAYLOAD_LEN {
        return Err(ServerError::BadHeader);
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|_| ServerError::ShortRead { expected: len })?;
    Ok(payload)
}

pub async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, body: &[u8]) -> std::io::Result<()> {
    writer.write_all(body).await?;
    writer.flush().await
}
