//! Image content model: manifest wire formats and content digests

pub mod digest;
pub mod manifest;

pub use digest::DigestUtils;
pub use manifest::{
    DecodedManifest, Descriptor, ImageConfig, Manifest, ManifestDescriptor, ManifestList,
    ManifestType, PlatformSpec,
};
