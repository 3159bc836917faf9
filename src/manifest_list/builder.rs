//! Manifest list assembly and publication
//!
//! Sources are inspected in the order given and must each resolve to a
//! single-platform manifest on the target's registry. Publication is
//! mount blobs, push referenced manifests, push the list. The first error
//! aborts; anything already mounted or pushed stays in place. Re-running is
//! safe since identical content-addressed data mounts and pushes idempotently.

use crate::config::{AuthConfig, ClientConfig};
use crate::error::{RegistryError, Result};
use crate::image::digest::DigestUtils;
use crate::image::manifest::{DecodedManifest, ManifestDescriptor, ManifestList};
use crate::logging::Logger;
use crate::manifest_list::inspect::ManifestInspector;
use crate::reference::Reference;
use crate::registry::operations::RegistryOperations;
use crate::registry::pool::SessionPool;

/// A blob that must be cross-mounted into the target repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMountRequest {
    pub from_repository: String,
    pub digest: String,
}

/// A manifest from another repository that must exist in the target
/// repository before the list can reference it
#[derive(Debug, Clone)]
pub struct ManifestPushRequest {
    pub from_repository: String,
    pub manifest: DecodedManifest,
}

/// Everything collected from the sources, ready to publish
#[derive(Debug, Clone)]
pub struct PublishPlan {
    pub target: Reference,
    pub manifests: Vec<ManifestDescriptor>,
    pub blob_mounts: Vec<BlobMountRequest>,
    pub manifest_pushes: Vec<ManifestPushRequest>,
}

#[derive(Debug, Clone)]
pub struct PublishedList {
    pub digest: String,
    pub size: u64,
    pub media_type: String,
    pub manifests: Vec<ManifestDescriptor>,
}

pub struct ManifestListBuilder<'a> {
    pool: &'a mut SessionPool,
    inspector: ManifestInspector,
    output: Logger,
}

impl<'a> ManifestListBuilder<'a> {
    pub fn new(pool: &'a mut SessionPool, output: Logger) -> Self {
        Self {
            pool,
            inspector: ManifestInspector::new(output.clone()),
            output,
        }
    }

    /// Inspect every source and collect descriptors, mounts and pushes
    pub async fn plan(
        &mut self,
        target_image: &str,
        source_images: &[String],
    ) -> Result<PublishPlan> {
        let target = Reference::parse(target_image)?;

        let mut plan = PublishPlan {
            target,
            manifests: Vec::with_capacity(source_images.len()),
            blob_mounts: Vec::new(),
            manifest_pushes: Vec::new(),
        };

        self.output.step("Retrieving digests of images...");
        for image in source_images {
            let source = Reference::parse(image)?;
            if source.hostname() != plan.target.hostname() {
                return Err(RegistryError::CrossRegistry {
                    source_host: source.hostname().to_string(),
                    target_host: plan.target.hostname().to_string(),
                });
            }

            let session = self.pool.session(source.hostname())?;
            let mut inspection = self
                .inspector
                .inspect(session, source.repository(), source.tag_or_digest())
                .await?;

            if inspection.is_list() || inspection.records.len() != 1 {
                return Err(RegistryError::Recursion(format!("{} is a manifest list", image)));
            }
            let record = inspection.records.remove(0);
            if record.parent.is_some() {
                return Err(RegistryError::Recursion(format!("{} is a manifest list", image)));
            }

            self.output.info(&format!(
                "Image {} is digest {}; size: {}",
                image, record.descriptor.digest, record.descriptor.size
            ));

            if source.repository() != plan.target.repository() {
                self.output.verbose(&format!(
                    "Adding {} blob references of {} to mount requests",
                    record.references.len(),
                    image
                ));
                for digest in &record.references {
                    let mount = BlobMountRequest {
                        from_repository: source.repository().to_string(),
                        digest: digest.clone(),
                    };
                    if !plan.blob_mounts.contains(&mount) {
                        plan.blob_mounts.push(mount);
                    }
                }

                let already_queued = plan
                    .manifest_pushes
                    .iter()
                    .any(|push| push.manifest.payload == record.manifest.payload);
                if !already_queued {
                    plan.manifest_pushes.push(ManifestPushRequest {
                        from_repository: source.repository().to_string(),
                        manifest: record.manifest,
                    });
                }
            }

            plan.manifests.push(ManifestDescriptor {
                descriptor: record.descriptor,
                platform: record.platform,
            });
        }

        Ok(plan)
    }

    /// Mount blobs, push referenced manifests, then push and verify the list
    pub async fn publish(&mut self, plan: PublishPlan) -> Result<PublishedList> {
        let list =
            DecodedManifest::from_list(ManifestList::from_descriptors(plan.manifests.clone()))?;
        let target = &plan.target;
        let repository = target.repository();
        let session = self.pool.session(target.hostname())?;

        for mount in &plan.blob_mounts {
            session
                .mount_blob(repository, &mount.digest, &mount.from_repository)
                .await
                .inspect_err(|e| self.output.error(&format!("Mount failed {}", e)))?;
        }
        if !plan.blob_mounts.is_empty() {
            self.output.success(&format!(
                "Mounted {} blobs into {}",
                plan.blob_mounts.len(),
                repository
            ));
        }

        for push in &plan.manifest_pushes {
            let expected = push.manifest.digest();
            let actual = session
                .push_manifest(repository, &expected, &push.manifest)
                .await?;
            DigestUtils::verify_echoed(&expected, &actual)?;
            self.output.verbose(&format!(
                "Pushed manifest {} from {} into {}",
                expected, push.from_repository, repository
            ));
        }

        let expected = list.digest();
        let actual = session
            .push_manifest(repository, target.tag_or_digest(), &list)
            .await?;
        DigestUtils::verify_echoed(&expected, &actual)?;

        self.output.success(&format!(
            "Pushed manifest list {} with {} entries",
            target,
            plan.manifests.len()
        ));

        Ok(PublishedList {
            digest: actual,
            size: list.size(),
            media_type: list.media_type,
            manifests: plan.manifests,
        })
    }

    pub async fn put_manifest_list(
        &mut self,
        target_image: &str,
        source_images: &[String],
    ) -> Result<PublishedList> {
        let plan = self.plan(target_image, source_images).await?;
        self.publish(plan).await
    }
}

/// Build and publish a manifest list; returns its digest
pub async fn put_manifest_list(
    auth: AuthConfig,
    config: ClientConfig,
    output: Logger,
    target_image: &str,
    source_images: &[String],
) -> Result<String> {
    let mut pool = SessionPool::new(config, auth, output.clone());
    let published = ManifestListBuilder::new(&mut pool, output)
        .put_manifest_list(target_image, source_images)
        .await?;
    Ok(published.digest)
}
