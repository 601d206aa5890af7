//! Interest and content object messages.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::addressing::decode_chunk_index;
use crate::error::ProtocolError;
use crate::name::ResourceName;

/// A request for the content published under `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    pub name: ResourceName,
}

impl Interest {
    pub fn new(name: ResourceName) -> Self {
        Self { name }
    }
}

/// A response: the interest's own name, one chunk of payload and the final
/// chunk index of the resource at the time it was produced.
///
/// The payload is shared so that cached chunks can be handed out without
/// copying. It is base64-encoded in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentObject {
    pub name: ResourceName,
    #[serde(with = "base64_bytes")]
    pub payload: Arc<[u8]>,
    pub final_chunk: u64,
}

impl ContentObject {
    pub fn new(name: ResourceName, payload: impl Into<Arc<[u8]>>, final_chunk: u64) -> Self {
        Self {
            name,
            payload: payload.into(),
            final_chunk,
        }
    }

    /// Chunk index carried by the trailing segment of the name.
    pub fn chunk_index(&self) -> Result<u64, ProtocolError> {
        decode_chunk_index(&self.name)
    }
}

/// Anything a portal can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Interest(Interest),
    Content(ContentObject),
}

impl Message {
    pub fn name(&self) -> &ResourceName {
        match self {
            Message::Interest(interest) => &interest.name,
            Message::Content(content) => &content.name,
        }
    }
}

impl From<Interest> for Message {
    fn from(interest: Interest) -> Self {
        Message::Interest(interest)
    }
}

impl From<ContentObject> for Message {
    fn from(content: ContentObject) -> Self {
        Message::Content(content)
    }
}

mod base64_bytes {
    use std::sync::Arc;

    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(data).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Arc<[u8]>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD
            .decode(&s)
            .map(Arc::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_name(n: u64) -> ResourceName {
        "lci:/ccnx/tutorial/list"
            .parse::<ResourceName>()
            .unwrap()
            .with_chunk(n)
    }

    #[test]
    fn content_payload_is_base64() {
        let content = ContentObject::new(chunk_name(1), b"Hello".to_vec(), 3);
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["payload"], "SGVsbG8=");
        assert_eq!(json["finalChunk"], 3);
        assert_eq!(json["name"], "lci:/ccnx/tutorial/list/chunk=1");

        let back: ContentObject = serde_json::from_value(json).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn message_is_tagged() {
        let msg: Message = Interest::new(chunk_name(0)).into();
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "interest");
        assert_eq!(msg.name(), &chunk_name(0));
    }

    #[test]
    fn chunk_index_from_name() {
        let content = ContentObject::new(chunk_name(7), Vec::<u8>::new(), 7);
        assert_eq!(content.chunk_index(), Ok(7));

        let bare = ContentObject::new("lci:/x".parse().unwrap(), Vec::<u8>::new(), 0);
        assert!(bare.chunk_index().is_err());
    }

    #[test]
    fn rejects_invalid_base64() {
        let json = r#"{"name":"lci:/x/chunk=0","payload":"!!","finalChunk":0}"#;
        assert!(serde_json::from_str::<ContentObject>(json).is_err());
    }
}
