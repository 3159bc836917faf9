//! Manifest inspection
//!
//! Resolves a repository and tag or digest into flat per-platform records.
//! Lists are expanded one level: each entry is fetched by digest and keeps
//! the platform written in the list. Only a top-level schema 2 manifest has
//! its platform read from the image config blob.

use crate::error::Result;
use crate::image::digest::DigestUtils;
use crate::image::manifest::{
    DecodedManifest, Descriptor, ImageConfig, Manifest, ManifestType, PlatformSpec,
};
use crate::logging::Logger;
use crate::registry::operations::RegistryOperations;

/// One resolved single-platform manifest
#[derive(Debug, Clone)]
pub struct ManifestRecord {
    pub descriptor: Descriptor,
    pub platform: PlatformSpec,
    /// Tag or digest the inspection was asked for
    pub tag: String,
    pub manifest: DecodedManifest,
    /// Distinct blob digests the manifest names
    pub references: Vec<String>,
    /// Descriptor of the list this record was expanded from
    pub parent: Option<Descriptor>,
}

impl ManifestRecord {
    fn new(
        manifest: DecodedManifest,
        platform: PlatformSpec,
        tag: &str,
        parent: Option<Descriptor>,
    ) -> Self {
        Self {
            descriptor: manifest.descriptor(),
            references: manifest.manifest.references(),
            platform,
            tag: tag.to_string(),
            manifest,
            parent,
        }
    }

    pub fn manifest_type(&self) -> ManifestType {
        self.manifest.manifest_type()
    }
}

/// Result of inspecting one reference
#[derive(Debug, Clone)]
pub struct Inspection {
    pub repository: String,
    pub reference: String,
    /// Descriptor of the top-level manifest that was fetched
    pub descriptor: Descriptor,
    pub manifest_type: ManifestType,
    pub records: Vec<ManifestRecord>,
}

impl Inspection {
    pub fn is_list(&self) -> bool {
        self.manifest_type == ManifestType::List
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManifestInspector {
    output: Logger,
}

impl ManifestInspector {
    pub fn new(output: Logger) -> Self {
        Self { output }
    }

    pub async fn inspect<R>(
        &self,
        registry: &R,
        repository: &str,
        reference: &str,
    ) -> Result<Inspection>
    where
        R: RegistryOperations + ?Sized,
    {
        let top = registry.fetch_manifest(repository, reference).await?;
        let descriptor = top.descriptor();
        let manifest_type = top.manifest_type();
        self.output.verbose(&format!(
            "{}:{} is {} ({})",
            repository, reference, descriptor.media_type, descriptor.digest
        ));

        let records = match &top.manifest {
            Manifest::Schema2(image) => {
                let blob = registry
                    .pull_blob(repository, &image.config.digest)
                    .await?;
                let platform = ImageConfig::from_json(&blob)?.platform();
                vec![ManifestRecord::new(top, platform, reference, None)]
            }
            Manifest::List(list) => {
                let mut records = Vec::with_capacity(list.manifests.len());
                for entry in &list.manifests {
                    self.output.detail(&format!("List entry {}", entry.descriptor.digest));
                    let sub = registry
                        .fetch_manifest(repository, &entry.descriptor.digest)
                        .await?;
                    DigestUtils::verify_echoed(&entry.descriptor.digest, &sub.digest())?;
                    if sub.manifest_type() == ManifestType::List {
                        self.output.warning(&format!(
                            "{} in {}:{} is itself a manifest list; not expanded",
                            entry.descriptor.digest, repository, reference
                        ));
                    }
                    records.push(ManifestRecord::new(
                        sub,
                        entry.platform.clone(),
                        reference,
                        Some(descriptor.clone()),
                    ));
                }
                records
            }
            Manifest::Schema1(_) => {
                self.output.warning(&format!(
                    "{}:{} is a schema 1 manifest; platform information is not available",
                    repository, reference
                ));
                vec![ManifestRecord::new(
                    top,
                    PlatformSpec::default(),
                    reference,
                    None,
                )]
            }
        };

        Ok(Inspection {
            repository: repository.to_string(),
            reference: reference.to_string(),
            descriptor,
            manifest_type,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::image::manifest::{
        MEDIA_TYPE_MANIFEST_LIST, MEDIA_TYPE_SCHEMA1, MEDIA_TYPE_SCHEMA2, ManifestDescriptor,
        ManifestList,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory registry keyed by `repository@reference`
    #[derive(Default)]
    struct MemoryRegistry {
        manifests: HashMap<String, (String, Vec<u8>)>,
        blobs: HashMap<String, Vec<u8>>,
        blob_pulls: Mutex<Vec<String>>,
    }

    impl MemoryRegistry {
        fn add_manifest(
            &mut self,
            repository: &str,
            tag: Option<&str>,
            media_type: &str,
            payload: &[u8],
        ) -> String {
            let digest = DigestUtils::compute_docker_digest(payload);
            let entry = (media_type.to_string(), payload.to_vec());
            self.manifests
                .insert(format!("{}@{}", repository, digest), entry.clone());
            if let Some(tag) = tag {
                self.manifests.insert(format!("{}@{}", repository, tag), entry);
            }
            digest
        }

        fn add_image(
            &mut self,
            repository: &str,
            tag: Option<&str>,
            config: &str,
        ) -> (String, usize) {
            let config_digest = DigestUtils::compute_docker_digest(config.as_bytes());
            self.blobs.insert(config_digest.clone(), config.as_bytes().to_vec());
            let payload = format!(
                r#"{{"schemaVersion":2,"mediaType":"{}","config":{{"mediaType":"application/vnd.docker.container.image.v1+json","size":{},"digest":"{}"}},"layers":[{{"mediaType":"application/vnd.docker.image.rootfs.diff.tar.gzip","size":10,"digest":"sha256:{}"}}]}}"#,
                MEDIA_TYPE_SCHEMA2,
                config.len(),
                config_digest,
                "1".repeat(64)
            );
            let digest = self.add_manifest(repository, tag, MEDIA_TYPE_SCHEMA2, payload.as_bytes());
            (digest, payload.len())
        }
    }

    #[async_trait]
    impl RegistryOperations for MemoryRegistry {
        async fn fetch_manifest(
            &self,
            repository: &str,
            reference: &str,
        ) -> Result<DecodedManifest> {
            let (media_type, payload) = self
                .manifests
                .get(&format!("{}@{}", repository, reference))
                .cloned()
                .ok_or_else(|| RegistryError::status(404, "MANIFEST_UNKNOWN"))?;
            DecodedManifest::decode(&media_type, payload)
        }

        async fn push_manifest(
            &self,
            _: &str,
            _: &str,
            manifest: &DecodedManifest,
        ) -> Result<String> {
            Ok(manifest.digest())
        }

        async fn pull_blob(&self, _repository: &str, digest: &str) -> Result<Vec<u8>> {
            self.blob_pulls.lock().unwrap().push(digest.to_string());
            self.blobs
                .get(digest)
                .cloned()
                .ok_or_else(|| RegistryError::status(404, "BLOB_UNKNOWN"))
        }

        async fn mount_blob(&self, _: &str, _: &str, _: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn platform(os: &str, architecture: &str) -> PlatformSpec {
        PlatformSpec {
            os: os.to_string(),
            architecture: architecture.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_schema2_reads_platform_from_config_blob() {
        let mut registry = MemoryRegistry::default();
        let (digest, size) = registry.add_image(
            "app",
            Some("v1"),
            r#"{"architecture":"amd64","os":"windows","os.version":"10.0.17763.1","os.features":["win32k"]}"#,
        );

        let inspection = ManifestInspector::new(Logger::new_quiet())
            .inspect(&registry, "app", "v1")
            .await
            .unwrap();

        assert!(!inspection.is_list());
        assert_eq!(inspection.records.len(), 1);
        let record = &inspection.records[0];
        assert_eq!(record.descriptor.digest, digest);
        assert_eq!(record.descriptor.size, size as u64);
        assert_eq!(record.descriptor.media_type, MEDIA_TYPE_SCHEMA2);
        assert_eq!(record.platform.os, "windows");
        assert_eq!(record.platform.os_version, "10.0.17763.1");
        assert_eq!(record.platform.os_features, vec!["win32k"]);
        assert_eq!(record.tag, "v1");
        assert!(record.parent.is_none());
        assert_eq!(record.references.len(), 2);
    }

    #[tokio::test]
    async fn test_list_entries_keep_embedded_platform_and_order() {
        let mut registry = MemoryRegistry::default();
        // The config blobs say something different from the list on purpose.
        let (amd64, amd64_size) =
            registry.add_image("app", None, r#"{"architecture":"bogus","os":"bogus"}"#);
        let (arm64, arm64_size) =
            registry.add_image("app", None, r#"{"architecture":"other","os":"other"}"#);

        let list = ManifestList::from_descriptors(vec![
            ManifestDescriptor {
                descriptor: Descriptor {
                    media_type: MEDIA_TYPE_SCHEMA2.to_string(),
                    size: arm64_size as u64,
                    digest: arm64.clone(),
                },
                platform: PlatformSpec {
                    variant: "v8".to_string(),
                    ..platform("linux", "arm64")
                },
            },
            ManifestDescriptor {
                descriptor: Descriptor {
                    media_type: MEDIA_TYPE_SCHEMA2.to_string(),
                    size: amd64_size as u64,
                    digest: amd64.clone(),
                },
                platform: platform("linux", "amd64"),
            },
        ]);
        let payload = serde_json::to_vec(&list).unwrap();
        let list_digest =
            registry.add_manifest("app", Some("latest"), MEDIA_TYPE_MANIFEST_LIST, &payload);

        let inspection = ManifestInspector::new(Logger::new_quiet())
            .inspect(&registry, "app", "latest")
            .await
            .unwrap();

        assert!(inspection.is_list());
        assert_eq!(inspection.descriptor.digest, list_digest);
        let digests: Vec<_> = inspection
            .records
            .iter()
            .map(|r| r.descriptor.digest.clone())
            .collect();
        assert_eq!(digests, vec![arm64, amd64]);
        assert_eq!(inspection.records[0].platform.architecture, "arm64");
        assert_eq!(inspection.records[0].platform.variant, "v8");
        assert_eq!(inspection.records[1].platform, platform("linux", "amd64"));
        assert!(inspection
            .records
            .iter()
            .all(|r| r.parent.as_ref().map(|p| p.digest.as_str()) == Some(list_digest.as_str())));
        assert!(registry.blob_pulls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nested_list_entry_is_reported_not_flattened() {
        let mut registry = MemoryRegistry::default();
        let (image, image_size) =
            registry.add_image("app", None, r#"{"architecture":"amd64","os":"linux"}"#);
        let image_descriptor = ManifestDescriptor {
            descriptor: Descriptor {
                media_type: MEDIA_TYPE_SCHEMA2.to_string(),
                size: image_size as u64,
                digest: image.clone(),
            },
            platform: platform("linux", "amd64"),
        };

        let inner = serde_json::to_vec(&ManifestList::from_descriptors(vec![
            image_descriptor.clone(),
        ]))
        .unwrap();
        let inner_digest = registry.add_manifest("app", None, MEDIA_TYPE_MANIFEST_LIST, &inner);

        let outer = serde_json::to_vec(&ManifestList::from_descriptors(vec![
            image_descriptor,
            ManifestDescriptor {
                descriptor: Descriptor {
                    media_type: MEDIA_TYPE_MANIFEST_LIST.to_string(),
                    size: inner.len() as u64,
                    digest: inner_digest.clone(),
                },
                platform: platform("windows", "arm64"),
            },
        ]))
        .unwrap();
        registry.add_manifest("app", Some("nested"), MEDIA_TYPE_MANIFEST_LIST, &outer);

        let inspection = ManifestInspector::new(Logger::new_quiet())
            .inspect(&registry, "app", "nested")
            .await
            .unwrap();

        assert_eq!(inspection.records.len(), 2);
        let nested = &inspection.records[1];
        assert_eq!(nested.descriptor.digest, inner_digest);
        assert_eq!(nested.descriptor.media_type, MEDIA_TYPE_MANIFEST_LIST);
        assert_eq!(nested.manifest_type(), ManifestType::List);
        assert_eq!(nested.platform, platform("windows", "arm64"));
        assert!(nested.references.is_empty());
        assert_eq!(inspection.records[0].descriptor.digest, image);
    }

    #[tokio::test]
    async fn test_schema1_has_zero_platform() {
        let mut registry = MemoryRegistry::default();
        let payload = br#"{"schemaVersion":1,"name":"app","tag":"old","fsLayers":[{"blobSum":"sha256:ab"}]}"#;
        let digest = registry.add_manifest("app", Some("old"), MEDIA_TYPE_SCHEMA1, payload);

        let inspection = ManifestInspector::new(Logger::new_quiet())
            .inspect(&registry, "app", "old")
            .await
            .unwrap();

        assert_eq!(inspection.records.len(), 1);
        assert_eq!(inspection.records[0].descriptor.digest, digest);
        assert_eq!(inspection.records[0].platform, PlatformSpec::default());
        assert_eq!(inspection.records[0].manifest_type(), ManifestType::Schema1);
    }

    #[tokio::test]
    async fn test_fetch_errors_propagate_unchanged() {
        let registry = MemoryRegistry::default();
        let result = ManifestInspector::new(Logger::new_quiet())
            .inspect(&registry, "app", "missing")
            .await;
        assert!(matches!(
            result,
            Err(RegistryError::Transport { status: Some(404), .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_config_blob_propagates() {
        let mut registry = MemoryRegistry::default();
        registry.add_image("app", Some("v1"), r#"{"os":"linux"}"#);
        registry.blobs.clear();

        let result = ManifestInspector::new(Logger::new_quiet())
            .inspect(&registry, "app", "v1")
            .await;
        assert!(matches!(
            result,
            Err(RegistryError::Transport { status: Some(404), .. })
        ));
    }
}
