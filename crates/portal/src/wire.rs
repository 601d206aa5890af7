//! TCP wire format for portal messages.
//!
//! # Wire format
//!
//! ```text
//! PER MESSAGE:
//!   [1 byte: kind 0x01=interest, 0x02=content]
//!   [2 bytes BE: name_len]
//!   [name_len bytes: name URI UTF-8]
//!
//!   CONTENT ONLY:
//!     [8 bytes BE: final_chunk]
//!     [4 bytes BE: payload_len]
//!     [payload_len bytes: payload]
//! ```
//!
//! A connection closed between messages is a clean end of stream.

use std::io::ErrorKind;

use chunkfetch_protocol::{ContentObject, Interest, Message, ResourceName};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::PortalError;

/// Message kind: interest.
pub const KIND_INTEREST: u8 = 0x01;

/// Message kind: content object.
pub const KIND_CONTENT: u8 = 0x02;

/// Largest accepted payload (16 MiB).
pub const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// Writes one message. The caller flushes.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &Message,
) -> Result<(), PortalError> {
    match message {
        Message::Interest(interest) => {
            writer.write_u8(KIND_INTEREST).await?;
            write_name(writer, &interest.name).await?;
        }
        Message::Content(content) => {
            let payload_len = content.payload.len();
            if payload_len > MAX_PAYLOAD_LEN {
                return Err(PortalError::Protocol(format!(
                    "payload too large: {payload_len} bytes (max {MAX_PAYLOAD_LEN})"
                )));
            }

            writer.write_u8(KIND_CONTENT).await?;
            write_name(writer, &content.name).await?;
            writer.write_u64(content.final_chunk).await?;
            writer.write_u32(payload_len as u32).await?;
            writer.write_all(&content.payload).await?;
        }
    }
    Ok(())
}

/// Reads one message.
///
/// Returns `None` if the stream ends before the first byte of a message.
pub async fn read_message<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Message>, PortalError> {
    let kind = match reader.read_u8().await {
        Ok(kind) => kind,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let name = read_name(reader).await?;

    match kind {
        KIND_INTEREST => Ok(Some(Message::Interest(Interest::new(name)))),
        KIND_CONTENT => {
            let final_chunk = reader.read_u64().await?;
            let payload_len = reader.read_u32().await? as usize;
            if payload_len > MAX_PAYLOAD_LEN {
                return Err(PortalError::Protocol(format!(
                    "payload too large: {payload_len} bytes (max {MAX_PAYLOAD_LEN})"
                )));
            }

            let mut payload = vec![0u8; payload_len];
            reader.read_exact(&mut payload).await?;
            Ok(Some(Message::Content(ContentObject::new(
                name,
                payload,
                final_chunk,
            ))))
        }
        other => Err(PortalError::Protocol(format!(
            "unknown message kind: {other:#04x}"
        ))),
    }
}

async fn write_name<W: AsyncWrite + Unpin>(
    writer: &mut W,
    name: &ResourceName,
) -> Result<(), PortalError> {
    let uri = name.to_string();
    let name_len = uri.len();
    if name_len > u16::MAX as usize {
        return Err(PortalError::Protocol(format!(
            "name too long: {name_len} bytes (max {})",
            u16::MAX
        )));
    }

    writer.write_u16(name_len as u16).await?;
    writer.write_all(uri.as_bytes()).await?;
    Ok(())
}

async fn read_name<R: AsyncRead + Unpin>(reader: &mut R) -> Result<ResourceName, PortalError> {
    let name_len = reader.read_u16().await?;
    let mut name_buf = vec![0u8; name_len as usize];
    reader.read_exact(&mut name_buf).await?;
    let uri = String::from_utf8(name_buf)
        .map_err(|e| PortalError::Protocol(format!("invalid UTF-8 name: {e}")))?;
    Ok(uri.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ResourceName {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn interest_layout() {
        let msg = Message::Interest(Interest::new(name("lci:/a/chunk=1")));
        let mut buf = Vec::new();
        write_message(&mut buf, &msg).await.unwrap();

        let uri = b"lci:/a/chunk=1";
        assert_eq!(buf[0], KIND_INTEREST);
        assert_eq!(&buf[1..3], &(uri.len() as u16).to_be_bytes());
        assert_eq!(&buf[3..], uri);

        let mut cursor = &buf[..];
        assert_eq!(read_message(&mut cursor).await.unwrap(), Some(msg));
    }

    #[tokio::test]
    async fn content_layout() {
        let msg = Message::Content(ContentObject::new(
            name("lci:/ccnx/tutorial/list/chunk=0"),
            b"hello".to_vec(),
            4,
        ));
        let mut buf = Vec::new();
        write_message(&mut buf, &msg).await.unwrap();

        let name_len = "lci:/ccnx/tutorial/list/chunk=0".len();
        let tail = &buf[3 + name_len..];
        assert_eq!(&tail[..8], &4u64.to_be_bytes());
        assert_eq!(&tail[8..12], &5u32.to_be_bytes());
        assert_eq!(&tail[12..], b"hello");

        let mut cursor = &buf[..];
        assert_eq!(read_message(&mut cursor).await.unwrap(), Some(msg));
    }

    #[tokio::test]
    async fn several_messages_then_eof() {
        let msgs = vec![
            Message::Interest(Interest::new(name("lci:/a/chunk=0"))),
            Message::Content(ContentObject::new(name("lci:/a/chunk=0"), Vec::<u8>::new(), 0)),
        ];
        let mut buf = Vec::new();
        for m in &msgs {
            write_message(&mut buf, m).await.unwrap();
        }

        let mut cursor = &buf[..];
        for m in &msgs {
            assert_eq!(read_message(&mut cursor).await.unwrap().as_ref(), Some(m));
        }
        assert!(read_message(&mut cursor).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn truncated_message_is_an_error() {
        let msg = Message::Content(ContentObject::new(name("lci:/a/chunk=0"), b"abc".to_vec(), 0));
        let mut buf = Vec::new();
        write_message(&mut buf, &msg).await.unwrap();
        buf.truncate(buf.len() - 1);

        let mut cursor = &buf[..];
        assert!(matches!(
            read_message(&mut cursor).await,
            Err(PortalError::Io(_))
        ));
    }

    #[tokio::test]
    async fn unknown_kind_rejected() {
        let mut buf = vec![0x7f];
        buf.extend_from_slice(&6u16.to_be_bytes());
        buf.extend_from_slice(b"lci:/a");
        let mut cursor = &buf[..];
        assert!(matches!(
            read_message(&mut cursor).await,
            Err(PortalError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn unparsable_name_rejected() {
        let mut buf = vec![KIND_INTEREST];
        buf.extend_from_slice(&4u16.to_be_bytes());
        buf.extend_from_slice(b"/a/b");
        let mut cursor = &buf[..];
        assert!(matches!(
            read_message(&mut cursor).await,
            Err(PortalError::Name(_))
        ));
    }

    #[tokio::test]
    async fn oversized_payload_rejected() {
        let mut buf = vec![KIND_CONTENT];
        buf.extend_from_slice(&6u16.to_be_bytes());
        buf.extend_from_slice(b"lci:/a");
        buf.extend_from_slice(&0u64.to_be_bytes());
        buf.extend_from_slice(&((MAX_PAYLOAD_LEN + 1) as u32).to_be_bytes());
        let mut cursor = &buf[..];
        assert!(matches!(
            read_message(&mut cursor).await,
            Err(PortalError::Protocol(_))
        ));
    }
}
