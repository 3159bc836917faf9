//! Manifest operations for a registry session
//!
//! - Manifest download (GET /v2/{name}/manifests/{reference}) with an
//!   `Accept` header listing the manifest list and schema 2 media types
//! - Manifest upload (PUT /v2/{name}/manifests/{reference}) returning the
//!   registry's `Docker-Content-Digest`

use crate::error::{RegistryError, Result};
use crate::image::manifest::{DecodedManifest, ManifestType};
use crate::registry::session::{RegistryRequest, Session};
use reqwest::header::{ACCEPT, CONTENT_TYPE};

pub const DOCKER_CONTENT_DIGEST: &str = "Docker-Content-Digest";

pub struct ManifestOperations<'a> {
    session: &'a Session,
}

impl<'a> ManifestOperations<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub async fn fetch(&self, repository: &str, reference: &str) -> Result<DecodedManifest> {
        let mut request =
            RegistryRequest::get(format!("/v2/{}/manifests/{}", repository, reference));
        for media_type in ManifestType::accepted() {
            request = request.header(ACCEPT, media_type)?;
        }

        let response = self.session.execute(request).await?;
        let content_type = response.header(CONTENT_TYPE.as_str()).unwrap_or_default().to_string();

        self.session.output().detail(&format!(
            "Fetched manifest {}:{} ({}, {} bytes)",
            repository,
            reference,
            content_type,
            response.body.len()
        ));

        DecodedManifest::decode(&content_type, response.body)
    }

    /// Push the manifest's exact payload. The returned digest is the
    /// registry's; callers compare it with [`DecodedManifest::digest`].
    pub async fn push(
        &self,
        repository: &str,
        reference: &str,
        manifest: &DecodedManifest,
    ) -> Result<String> {
        let request = RegistryRequest::put(format!("/v2/{}/manifests/{}", repository, reference))
            .header(CONTENT_TYPE, &manifest.media_type)?
            .body(manifest.payload.clone());

        let response = self.session.execute(request).await?;
        let digest = response.header(DOCKER_CONTENT_DIGEST).ok_or_else(|| {
            RegistryError::Decode(format!(
                "push of {}:{} returned no {} header",
                repository, reference, DOCKER_CONTENT_DIGEST
            ))
        })?;

        self.session.output().detail(&format!(
            "Manifest uploaded for {}:{}, registry digest {}",
            repository, reference, digest
        ));
        Ok(digest.to_string())
    }
}
