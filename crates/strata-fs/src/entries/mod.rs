//! Concrete entry types.
//!
//! Container providers contribute a root per provider with one directory per
//! resource kind. Object stores contribute a root listing buckets, whose
//! keys are projected through the hierarchy builder.

mod container;
mod object;
mod resource;
mod storage;
mod volume;

pub use container::ContainerEntry;
pub use object::{ObjectEntry, PrefixEntry};
pub use resource::{ProviderRoot, ResourceKindEntry};
pub use storage::{BucketEntry, StorageRoot, BUCKET_DESCRIPTION};
pub use volume::{VolumeDirEntry, VolumeEntry, VolumeFileEntry};
