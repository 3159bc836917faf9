//! Manifest wire formats
//!
//! Three variants are understood, keyed by the response `Content-Type`:
//! legacy signed schema 1, single-platform schema 2, and the manifest list.
//! A [`DecodedManifest`] keeps the exact payload bytes next to the parsed
//! value; digests and sizes are always taken from those bytes.

use crate::error::{RegistryError, Result};
use crate::image::digest::DigestUtils;
use serde::{Deserialize, Serialize};

pub const MEDIA_TYPE_SCHEMA1: &str = "application/vnd.docker.distribution.manifest.v1+json";
pub const MEDIA_TYPE_SCHEMA1_SIGNED: &str =
    "application/vnd.docker.distribution.manifest.v1+prettyjws";
pub const MEDIA_TYPE_SCHEMA2: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const MEDIA_TYPE_MANIFEST_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestType {
    Schema1,
    Schema2,
    List,
}

impl ManifestType {
    /// Map a content type to a manifest variant, ignoring any parameters
    pub fn from_media_type(content_type: &str) -> Option<Self> {
        let media_type = content_type.split(';').next().unwrap_or("").trim();
        match media_type {
            MEDIA_TYPE_SCHEMA1 | MEDIA_TYPE_SCHEMA1_SIGNED => Some(ManifestType::Schema1),
            MEDIA_TYPE_SCHEMA2 => Some(ManifestType::Schema2),
            MEDIA_TYPE_MANIFEST_LIST => Some(ManifestType::List),
            _ => None,
        }
    }

    /// Media types sent in the `Accept` header when fetching. Schema 1 is
    /// decoded if a registry serves it but never asked for.
    pub fn accepted() -> [&'static str; 2] {
        [MEDIA_TYPE_MANIFEST_LIST, MEDIA_TYPE_SCHEMA2]
    }
}

/// Reference to a manifest or blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "mediaType", default)]
    pub media_type: String,
    pub size: u64,
    pub digest: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSpec {
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub os: String,
    #[serde(rename = "os.version", default, skip_serializing_if = "String::is_empty")]
    pub os_version: String,
    #[serde(rename = "os.features", default, skip_serializing_if = "Vec::is_empty")]
    pub os_features: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub variant: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsLayer {
    #[serde(rename = "blobSum")]
    pub blob_sum: String,
}

/// Legacy signed manifest; only its layer references are used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema1Manifest {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(rename = "fsLayers", default)]
    pub fs_layers: Vec<FsLayer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema2Manifest {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    #[serde(rename = "mediaType", default)]
    pub media_type: String,
    pub config: Descriptor,
    #[serde(default)]
    pub layers: Vec<Descriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDescriptor {
    #[serde(flatten)]
    pub descriptor: Descriptor,
    #[serde(default)]
    pub platform: PlatformSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestList {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    #[serde(rename = "mediaType", default)]
    pub media_type: String,
    #[serde(default)]
    pub manifests: Vec<ManifestDescriptor>,
}

impl ManifestList {
    /// Build a list from descriptors, keeping their order
    pub fn from_descriptors(manifests: Vec<ManifestDescriptor>) -> Self {
        Self {
            schema_version: 2,
            media_type: MEDIA_TYPE_MANIFEST_LIST.to_string(),
            manifests,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Manifest {
    Schema1(Schema1Manifest),
    Schema2(Schema2Manifest),
    List(ManifestList),
}

impl Manifest {
    pub fn manifest_type(&self) -> ManifestType {
        match self {
            Manifest::Schema1(_) => ManifestType::Schema1,
            Manifest::Schema2(_) => ManifestType::Schema2,
            Manifest::List(_) => ManifestType::List,
        }
    }

    /// Distinct blob digests this manifest names, in document order
    pub fn references(&self) -> Vec<String> {
        let digests: Vec<&str> = match self {
            Manifest::Schema1(m) => m.fs_layers.iter().map(|l| l.blob_sum.as_str()).collect(),
            Manifest::Schema2(m) => std::iter::once(m.config.digest.as_str())
                .chain(m.layers.iter().map(|l| l.digest.as_str()))
                .collect(),
            Manifest::List(_) => Vec::new(),
        };

        let mut references: Vec<String> = Vec::with_capacity(digests.len());
        for digest in digests {
            if !references.iter().any(|r| r == digest) {
                references.push(digest.to_string());
            }
        }
        references
    }
}

/// A manifest together with the exact bytes it was decoded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedManifest {
    pub manifest: Manifest,
    pub media_type: String,
    pub payload: Vec<u8>,
}

impl DecodedManifest {
    pub fn decode(content_type: &str, payload: Vec<u8>) -> Result<Self> {
        let manifest_type = ManifestType::from_media_type(content_type).ok_or_else(|| {
            RegistryError::Decode(format!("unsupported manifest content type '{}'", content_type))
        })?;

        let manifest = match manifest_type {
            ManifestType::Schema1 => Manifest::Schema1(serde_json::from_slice(&payload)?),
            ManifestType::Schema2 => Manifest::Schema2(serde_json::from_slice(&payload)?),
            ManifestType::List => Manifest::List(serde_json::from_slice(&payload)?),
        };

        Ok(Self {
            manifest,
            media_type: content_type.split(';').next().unwrap_or("").trim().to_string(),
            payload,
        })
    }

    /// Serialize a locally assembled list once; the bytes become its payload
    pub fn from_list(list: ManifestList) -> Result<Self> {
        let payload = serde_json::to_vec_pretty(&list)
            .map_err(|e| RegistryError::Decode(format!("cannot serialize manifest list: {}", e)))?;
        Ok(Self {
            media_type: list.media_type.clone(),
            manifest: Manifest::List(list),
            payload,
        })
    }

    pub fn manifest_type(&self) -> ManifestType {
        self.manifest.manifest_type()
    }

    pub fn digest(&self) -> String {
        DigestUtils::compute_docker_digest(&self.payload)
    }

    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn descriptor(&self) -> Descriptor {
        Descriptor {
            media_type: self.media_type.clone(),
            size: self.size(),
            digest: self.digest(),
        }
    }
}

/// The fields of an image config blob that describe its platform. Older
/// images write `null` for empty lists, so everything is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageConfig {
    pub architecture: Option<String>,
    pub os: Option<String>,
    #[serde(rename = "os.version")]
    pub os_version: Option<String>,
    #[serde(rename = "os.features")]
    pub os_features: Option<Vec<String>>,
    pub variant: Option<String>,
    pub features: Option<Vec<String>>,
}

impl ImageConfig {
    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .map_err(|e| RegistryError::Decode(format!("invalid image config: {}", e)))
    }

    pub fn platform(&self) -> PlatformSpec {
        PlatformSpec {
            architecture: self.architecture.clone().unwrap_or_default(),
            os: self.os.clone().unwrap_or_default(),
            os_version: self.os_version.clone().unwrap_or_default(),
            os_features: self.os_features.clone().unwrap_or_default(),
            variant: self.variant.clone().unwrap_or_default(),
            features: self.features.clone().unwrap_or_default(),
        }
    }
}
