//! Entry attributes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::time::Timestamp;

/// Attributes of a projected entry.
///
/// Every field is optional: synthetic entries (group prefixes without a
/// marker object) legitimately have no attributes at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    /// Modification time
    pub mtime: Option<Timestamp>,
    /// Change time
    pub ctime: Option<Timestamp>,
    /// Creation time
    pub crtime: Option<Timestamp>,
    /// Content size in bytes
    pub size: Option<u64>,
    /// Raw provider document the attributes were derived from
    pub meta: Option<Value>,
}

impl Attributes {
    /// Creates empty attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the modification time.
    pub fn with_mtime(mut self, mtime: Timestamp) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// Sets the change time.
    pub fn with_ctime(mut self, ctime: Timestamp) -> Self {
        self.ctime = Some(ctime);
        self
    }

    /// Sets the creation time.
    pub fn with_crtime(mut self, crtime: Timestamp) -> Self {
        self.crtime = Some(crtime);
        self
    }

    /// Sets crtime, ctime and mtime to the same instant.
    pub fn with_created(self, created: Timestamp) -> Self {
        self.with_crtime(created).with_ctime(created).with_mtime(created)
    }

    /// Sets the content size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the raw metadata document.
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Returns true if no attribute is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let created = Timestamp::new(1_000);
        let attrs = Attributes::new().with_created(created).with_size(42);

        assert_eq!(attrs.crtime, Some(created));
        assert_eq!(attrs.ctime, Some(created));
        assert_eq!(attrs.mtime, Some(created));
        assert_eq!(attrs.size, Some(42));
        assert!(!attrs.is_empty());
        assert!(Attributes::new().is_empty());
    }
}
