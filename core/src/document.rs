use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// What the index needs from a stored item.
///
/// `id` must be non-empty and must not change while the item is indexed.
pub trait Item {
    fn id(&self) -> &str;
    fn content(&self) -> &str;
}

/// Default item: a piece of text and its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document {
    id: String,
    content: String,
}

impl Document {
    /// Document whose id is the content hash.
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_id(String::new(), content)
    }

    /// An empty `id` falls back to the content hash.
    pub fn with_id(id: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let mut id = id.into();
        if id.is_empty() {
            id = content_id(&content);
        }
        Self { id, content }
    }
}

impl Item for Document {
    fn id(&self) -> &str { &self.id }
    fn content(&self) -> &str { &self.content }
}

impl From<String> for Document {
    fn from(content: String) -> Self { Self::new(content) }
}

impl From<&str> for Document {
    fn from(content: &str) -> Self { Self::new(content) }
}

/// Hex SHA-1 of the content; depends on nothing but the text itself.
pub(crate) fn content_id(content: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
