//! Blob operations for a registry session
//!
//! Only reads and cross-repository mounts; blob content is never uploaded.

use crate::error::Result;
use crate::registry::session::{RegistryRequest, Session};
use reqwest::header::{CONTENT_LENGTH, LOCATION};
use url::Url;

pub struct BlobOperations<'a> {
    session: &'a Session,
}

impl<'a> BlobOperations<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// GET /v2/{name}/blobs/{digest}
    pub async fn pull(&self, repository: &str, digest: &str) -> Result<Vec<u8>> {
        let request = RegistryRequest::get(format!("/v2/{}/blobs/{}", repository, digest));
        let response = self.session.execute(request).await?;
        self.session.output().detail(&format!(
            "Pulled blob {} ({})",
            digest,
            self.session.output().format_size(response.body.len() as u64)
        ));
        Ok(response.body)
    }

    /// POST /v2/{name}/blobs/uploads/?mount={digest}&from={from}
    ///
    /// Any 2xx counts as success. Returns the `Location` header if present.
    pub async fn mount(
        &self,
        repository: &str,
        digest: &str,
        from_repository: &str,
    ) -> Result<Option<String>> {
        let mut url = Url::parse(&format!(
            "{}/v2/{}/blobs/uploads/",
            self.session.base_url(),
            repository
        ))?;
        url.query_pairs_mut()
            .append_pair("mount", digest)
            .append_pair("from", from_repository);

        let request = RegistryRequest::post(url.to_string())
            .header(CONTENT_LENGTH, "0")?
            .body(Vec::new());

        let response = self.session.execute(request).await?;
        let location = response.header(LOCATION.as_str()).map(str::to_string);

        self.session.output().detail(&format!(
            "Mounted blob {} from {} into {} (status {}, location {:?})",
            digest, from_repository, repository, response.status, location
        ));
        Ok(location)
    }
}
