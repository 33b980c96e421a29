//! Directory structure imposed on delimiter-encoded object keys.
//!
//! Keys such as `photos/2024/a.jpg` are presented as a tree: every shared
//! prefix up to a delimiter becomes a synthetic group entry, every remaining
//! key becomes a leaf. Only the direct children of a prefix are requested
//! from the provider, using its grouped query when it has one.

use std::collections::HashSet;
use std::sync::Arc;

use strata_core::{FsError, OpContext, DELIMITER};
use tracing::debug;

use crate::entries::{ObjectEntry, PrefixEntry};
use crate::entry::Node;
use crate::provider::{ListItem, ObjectQuery, ObjectStore};

/// Lists the direct children of `prefix` in `bucket`.
///
/// Children are returned in provider order. The marker object named exactly
/// `prefix`, if present, is not listed as its own child. An empty prefix
/// lists the top level of the bucket.
pub async fn list_children(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
    prefix: &str,
    ctx: &OpContext,
) -> Result<Vec<Node>, FsError> {
    let items = if store.supports_delimiter() {
        ctx.run(store.list_objects(bucket, &ObjectQuery::grouped(prefix, DELIMITER)))
            .await?
    } else {
        let flat = ctx
            .run(store.list_objects(bucket, &ObjectQuery::flat(prefix)))
            .await?;
        group_items(flat, prefix, DELIMITER)
    };

    let mut entries: Vec<Node> = Vec::with_capacity(items.len());
    for item in items {
        match item {
            ListItem::Prefix(full) => {
                let name = group_name(&full, prefix, DELIMITER).to_string();
                // Most providers keep no object at the prefix itself.
                let attrs = match ctx.run(store.object_attrs(bucket, &full)).await {
                    Ok(attrs) => Some(attrs),
                    Err(FsError::Cancelled) => return Err(FsError::Cancelled),
                    Err(err) => {
                        debug!(bucket = %bucket, prefix = %full, error = %err, "Could not get attributes of prefix");
                        None
                    }
                };
                entries.push(Arc::new(PrefixEntry::new(
                    store.clone(),
                    bucket,
                    name,
                    full,
                    attrs,
                )));
            }
            ListItem::Object(attrs) if attrs.name == prefix => continue,
            ListItem::Object(attrs) => {
                let name = leaf_name(&attrs.name, prefix).to_string();
                entries.push(Arc::new(ObjectEntry::new(store.clone(), bucket, name, attrs)));
            }
        }
    }

    debug!(bucket = %bucket, prefix = %prefix, count = entries.len(), "Listed children");
    Ok(entries)
}

/// Groups a flat listing the way a delimiter-aware provider would.
///
/// Keys outside `prefix` are dropped. Keys containing `delimiter` after the
/// prefix collapse into one [`ListItem::Prefix`] per distinct group,
/// positioned where the group was first seen.
pub fn group_items(items: Vec<ListItem>, prefix: &str, delimiter: &str) -> Vec<ListItem> {
    let mut seen = HashSet::new();
    let mut grouped = Vec::new();

    for item in items {
        match item {
            ListItem::Object(attrs) => {
                let Some(rest) = attrs.name.strip_prefix(prefix) else {
                    continue;
                };
                match rest.find(delimiter) {
                    Some(idx) => {
                        let end = prefix.len() + idx + delimiter.len();
                        let group = attrs.name[..end].to_string();
                        if seen.insert(group.clone()) {
                            grouped.push(ListItem::Prefix(group));
                        }
                    }
                    None => {
                        if seen.insert(attrs.name.clone()) {
                            grouped.push(ListItem::Object(attrs));
                        }
                    }
                }
            }
            ListItem::Prefix(group) => {
                if group.starts_with(prefix) && seen.insert(group.clone()) {
                    grouped.push(ListItem::Prefix(group));
                }
            }
        }
    }

    grouped
}

/// Returns the entry name of a group prefix relative to its parent prefix.
pub fn group_name<'a>(full: &'a str, parent: &str, delimiter: &str) -> &'a str {
    let trimmed = full.strip_suffix(delimiter).unwrap_or(full);
    trimmed.strip_prefix(parent).unwrap_or(trimmed)
}

/// Returns the entry name of a leaf key relative to its parent prefix.
pub fn leaf_name<'a>(key: &'a str, parent: &str) -> &'a str {
    key.strip_prefix(parent).unwrap_or(key)
}
