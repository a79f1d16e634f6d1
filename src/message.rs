// Message batch collaborator
// Ordered, index-addressable parts with content bytes and string metadata

use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::value::Value;

/// A single message part.
///
/// `document` is the structured-document parser: it turns the content bytes
/// into a `Value` tree or reports why it could not. It is only consulted when
/// an expression actually needs structured access.
pub trait Part: Sync {
    fn content(&self) -> &[u8];

    fn metadata(&self, key: &str) -> Option<&str>;

    /// Every metadata pair. Ordering is not significant.
    fn metadata_pairs(&self) -> Vec<(&str, &str)>;

    fn document(&self) -> Result<Value, String> {
        Value::from_json_slice(self.content()).map_err(|e| e.to_string())
    }
}

/// An ordered batch of message parts
pub trait Batch: Sync {
    fn len(&self) -> usize;

    fn get(&self, index: usize) -> Option<&dyn Part>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory message part whose parsed document is cached after the first
/// structured lookup.
#[derive(Debug, Default)]
pub struct MessagePart {
    content: Vec<u8>,
    metadata: IndexMap<String, String>,
    parsed: OnceLock<Result<Value, String>>,
}

impl MessagePart {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        MessagePart {
            content: content.into(),
            metadata: IndexMap::new(),
            parsed: OnceLock::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl Clone for MessagePart {
    fn clone(&self) -> Self {
        MessagePart {
            content: self.content.clone(),
            metadata: self.metadata.clone(),
            parsed: OnceLock::new(),
        }
    }
}

impl Part for MessagePart {
    fn content(&self) -> &[u8] {
        &self.content
    }

    fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    fn metadata_pairs(&self) -> Vec<(&str, &str)> {
        self.metadata
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    fn document(&self) -> Result<Value, String> {
        self.parsed
            .get_or_init(|| Value::from_json_slice(&self.content).map_err(|e| e.to_string()))
            .clone()
    }
}

/// In-memory batch
#[derive(Debug, Clone, Default)]
pub struct Message {
    parts: Vec<MessagePart>,
}

impl Message {
    pub fn new() -> Self {
        Message { parts: Vec::new() }
    }
}

impl From<Vec<MessagePart>> for Message {
    fn from(parts: Vec<MessagePart>) -> Self {
        Message { parts }
    }
}

impl FromIterator<MessagePart> for Message {
    fn from_iter<I: IntoIterator<Item = MessagePart>>(iter: I) -> Self {
        Message {
            parts: iter.into_iter().collect(),
        }
    }
}

impl Batch for Message {
    fn len(&self) -> usize {
        self.parts.len()
    }

    fn get(&self, index: usize) -> Option<&dyn Part> {
        self.parts.get(index).map(|p| p as &dyn Part)
    }
}
