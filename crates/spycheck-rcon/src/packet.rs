//! RCON frame encoding and decoding.
//!
//! A frame is `size:i32 | id:i32 | type:i32 | body | 0x00 0x00`, all
//! little-endian, where `size` counts everything after itself. Bodies are
//! capped at 4096 bytes by the engine; larger responses arrive split
//! across multiple frames.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::RconError;

/// Client authentication request.
pub const TYPE_AUTH: i32 = 3;
/// Command execution request; also the server's auth verdict frame.
pub const TYPE_EXEC_OR_AUTH_RESPONSE: i32 = 2;
/// Command output frame.
pub const TYPE_RESPONSE_VALUE: i32 = 0;

/// Upper bound on a single frame body.
pub const MAX_BODY: usize = 4096;

/// Size of the fixed fields after the length prefix (id + type + two
/// trailing zero bytes).
const OVERHEAD: i32 = 10;

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: Vec<u8>,
}

impl Packet {
    pub fn new(id: i32, kind: i32, body: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    /// The body as text, tolerating whatever encoding the server used.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Serialize to the wire framing.
    pub fn encode(&self) -> Vec<u8> {
        let size = OVERHEAD + self.body.len() as i32;
        let mut out = Vec::with_capacity(4 + size as usize);
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&self.kind.to_le_bytes());
        out.extend_from_slice(&self.body);
        out.extend_from_slice(&[0, 0]);
        out
    }
}

/// Write one frame.
///
/// # Errors
///
/// Returns [`RconError::Io`] on write failure.
pub async fn write_packet<W: AsyncWrite + Unpin>(
    writer: &mut W,
    packet: &Packet,
) -> Result<(), RconError> {
    writer.write_all(&packet.encode()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame.
///
/// # Errors
///
/// Returns [`RconError::Protocol`] when the length prefix is out of
/// bounds, or [`RconError::Io`] on read failure.
pub async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Packet, RconError> {
    let mut size_buf = [0u8; 4];
    reader.read_exact(&mut size_buf).await?;
    let size = i32::from_le_bytes(size_buf);
    if size < OVERHEAD || size as usize > MAX_BODY + OVERHEAD as usize {
        return Err(RconError::Protocol(format!("frame size {size} out of bounds")));
    }

    let mut id_buf = [0u8; 4];
    reader.read_exact(&mut id_buf).await?;
    let mut kind_buf = [0u8; 4];
    reader.read_exact(&mut kind_buf).await?;

    let body_len = (size - OVERHEAD) as usize;
    let mut body = vec![0u8; body_len];
    reader.read_exact(&mut body).await?;

    let mut terminator = [0u8; 2];
    reader.read_exact(&mut terminator).await?;
    if terminator != [0, 0] {
        return Err(RconError::Protocol("missing frame terminator".to_owned()));
    }

    Ok(Packet {
        id: i32::from_le_bytes(id_buf),
        kind: i32::from_le_bytes(kind_buf),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encode_decode_roundtrip() {
        let original = Packet::new(7, TYPE_EXEC_OR_AUTH_RESPONSE, "status".as_bytes());
        let wire = original.encode();
        // size = 10 overhead + 6 body
        assert_eq!(&wire[0..4], &16i32.to_le_bytes());
        let mut cursor = std::io::Cursor::new(wire);
        let decoded = read_packet(&mut cursor).await.unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.body_text(), "status");
    }

    #[tokio::test]
    async fn empty_body_roundtrip() {
        let original = Packet::new(-1, TYPE_AUTH, Vec::new());
        let mut cursor = std::io::Cursor::new(original.encode());
        let decoded = read_packet(&mut cursor).await.unwrap();
        assert_eq!(decoded, original);
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&(MAX_BODY as i32 + 100).to_le_bytes());
        wire.extend_from_slice(&[0u8; 16]);
        let mut cursor = std::io::Cursor::new(wire);
        assert!(matches!(
            read_packet(&mut cursor).await,
            Err(RconError::Protocol(_))
        ));
    }
}
