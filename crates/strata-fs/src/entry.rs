//! The entry surface exposed to the mount layer.
//!
//! Every projected node implements [`Entry`]. Capabilities that make no
//! sense for a node (listing a file, reading a directory) keep the default
//! implementation, which reports [`FsError::Unsupported`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};
use strata_core::{Attributes, FsError, OpContext, DELIMITER};
use tracing::debug;

/// Shape of an entry in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// File-like leaf
    File,
    /// Directory-like group
    Dir,
}

/// Operations an entry supports beyond name and attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Children can be listed
    pub list: bool,
    /// Content can be read
    pub read: bool,
    /// The entry can be deleted
    pub delete: bool,
}

impl Capabilities {
    /// No optional capability.
    pub const NONE: Capabilities = Capabilities {
        list: false,
        read: false,
        delete: false,
    };

    /// Adds listing.
    pub const fn with_list(mut self) -> Self {
        self.list = true;
        self
    }

    /// Adds reading.
    pub const fn with_read(mut self) -> Self {
        self.read = true;
        self
    }

    /// Adds deletion.
    pub const fn with_delete(mut self) -> Self {
        self.delete = true;
        self
    }
}

/// A shared handle to a projected entry.
pub type Node = Arc<dyn Entry>;

/// A projected filesystem entry.
#[async_trait]
pub trait Entry: Send + Sync + fmt::Debug {
    /// Returns the entry name within its parent.
    fn name(&self) -> &str;

    /// Returns whether the entry is file- or directory-like.
    fn kind(&self) -> EntryKind;

    /// Returns the optional operations the entry supports.
    fn capabilities(&self) -> Capabilities;

    /// Returns a human readable description of the entry type.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Returns the entry attributes. Computed on every call.
    async fn attributes(&self, _ctx: &OpContext) -> Result<Attributes, FsError> {
        Ok(Attributes::default())
    }

    /// Returns the structured document describing the entry.
    async fn metadata(&self, ctx: &OpContext) -> Result<Value, FsError> {
        Ok(self
            .attributes(ctx)
            .await?
            .meta
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    /// Lists the children of a directory-like entry.
    async fn list(&self, _ctx: &OpContext) -> Result<Vec<Node>, FsError> {
        Err(FsError::unsupported("list", self.name()))
    }

    /// Finds a child by exact, case-sensitive name.
    async fn find(&self, ctx: &OpContext, name: &str) -> Result<Node, FsError> {
        if !self.capabilities().list {
            return Err(FsError::unsupported("find", self.name()));
        }
        self.list(ctx)
            .await?
            .into_iter()
            .find(|child| child.name() == name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    /// Finds a child by name, taking the one of kind `prefer` when a leaf
    /// and a group share the name. Falls back to any child with the name.
    async fn find_kind(
        &self,
        ctx: &OpContext,
        name: &str,
        prefer: EntryKind,
    ) -> Result<Node, FsError> {
        if !self.capabilities().list {
            return Err(FsError::unsupported("find", self.name()));
        }
        let mut fallback = None;
        for child in self.list(ctx).await? {
            if child.name() != name {
                continue;
            }
            if child.kind() == prefer {
                return Ok(child);
            }
            if fallback.is_none() {
                fallback = Some(child);
            }
        }
        fallback.ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    /// Reads the content of a file-like entry.
    async fn read(&self, _ctx: &OpContext) -> Result<Bytes, FsError> {
        Err(FsError::unsupported("read", self.name()))
    }

    /// Deletes the entry. Returns true once the entry is gone.
    async fn delete(&self, _ctx: &OpContext) -> Result<bool, FsError> {
        Err(FsError::unsupported("delete", self.name()))
    }
}

/// Walks a `/`-separated path from `root`.
///
/// A key may be both a leaf and the prefix of other keys, giving two
/// children with one name. Intermediate segments resolve to the group. The
/// last segment resolves to the leaf unless the path ends with the delimiter.
pub async fn resolve(root: &Node, path: &str, ctx: &OpContext) -> Result<Node, FsError> {
    let segments: Vec<&str> = path.split(DELIMITER).filter(|s| !s.is_empty()).collect();
    let wants_group = path.ends_with(DELIMITER);

    let mut current = root.clone();
    for (idx, segment) in segments.iter().enumerate() {
        let last = idx + 1 == segments.len();
        let prefer = if last && !wants_group {
            EntryKind::File
        } else {
            EntryKind::Dir
        };
        debug!(parent = %current.name(), segment = %segment, "Resolving");
        current = current.find_kind(ctx, segment, prefer).await?;
    }
    Ok(current)
}
