//! Manifest list pusher library
//!
//! Builds and publishes multi-architecture manifest lists against registries
//! speaking the Docker Registry HTTP API V2, and inspects existing manifests
//! and lists to report per-platform metadata.

pub mod cli;
pub mod config;
pub mod error;
pub mod image;
pub mod logging;
pub mod manifest_list;
pub mod reference;
pub mod registry;

pub use config::{AuthConfig, ClientConfig, Credentials};
pub use error::{RegistryError, Result};
pub use logging::Logger;
pub use manifest_list::{ManifestInspector, ManifestListBuilder, put_manifest_list};
pub use reference::Reference;
