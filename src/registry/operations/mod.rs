//! Registry operations
//!
//! [`RegistryOperations`] is the seam between the manifest logic and the
//! network. [`Session`] implements it over HTTP.

pub mod blob_operations;
pub mod manifest_operations;

pub use blob_operations::BlobOperations;
pub use manifest_operations::{DOCKER_CONTENT_DIGEST, ManifestOperations};

use crate::error::Result;
use crate::image::manifest::DecodedManifest;
use crate::registry::session::Session;
use async_trait::async_trait;

#[async_trait]
pub trait RegistryOperations: Send + Sync {
    /// Fetch and decode a manifest by tag or digest
    async fn fetch_manifest(&self, repository: &str, reference: &str) -> Result<DecodedManifest>;

    /// Push a manifest; returns the digest the registry reports
    async fn push_manifest(
        &self,
        repository: &str,
        reference: &str,
        manifest: &DecodedManifest,
    ) -> Result<String>;

    async fn pull_blob(&self, repository: &str, digest: &str) -> Result<Vec<u8>>;

    /// Make a blob from `from_repository` available in `repository`
    async fn mount_blob(
        &self,
        repository: &str,
        digest: &str,
        from_repository: &str,
    ) -> Result<Option<String>>;
}

#[async_trait]
impl RegistryOperations for Session {
    async fn fetch_manifest(&self, repository: &str, reference: &str) -> Result<DecodedManifest> {
        ManifestOperations::new(self).fetch(repository, reference).await
    }

    async fn push_manifest(
        &self,
        repository: &str,
        reference: &str,
        manifest: &DecodedManifest,
    ) -> Result<String> {
        ManifestOperations::new(self)
            .push(repository, reference, manifest)
            .await
    }

    async fn pull_blob(&self, repository: &str, digest: &str) -> Result<Vec<u8>> {
        BlobOperations::new(self).pull(repository, digest).await
    }

    async fn mount_blob(
        &self,
        repository: &str,
        digest: &str,
        from_repository: &str,
    ) -> Result<Option<String>> {
        BlobOperations::new(self)
            .mount(repository, digest, from_repository)
            .await
    }
}
