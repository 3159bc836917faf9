//! Manifest list inspection and assembly

pub mod builder;
pub mod inspect;

pub use builder::{
    BlobMountRequest, ManifestListBuilder, ManifestPushRequest, PublishPlan, PublishedList,
    put_manifest_list,
};
pub use inspect::{Inspection, ManifestInspector, ManifestRecord};
