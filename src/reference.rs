//! Image reference parsing
//!
//! Turns `host[:port]/path/name[:tag][@sha256:digest]` into its parts. The
//! hostname decides which registry session a reference is routed to.

use crate::error::{RegistryError, Result};
use crate::image::digest::DigestUtils;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_REGISTRY: &str = "docker.io";
pub const DEFAULT_TAG: &str = "latest";

const LEGACY_DEFAULT_REGISTRY: &str = "index.docker.io";
const OFFICIAL_NAMESPACE: &str = "library";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    hostname: String,
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl Reference {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RegistryError::Parse("empty image reference".to_string()));
        }

        let (name_and_tag, digest) = match input.split_once('@') {
            Some((name, digest)) => {
                if !DigestUtils::is_valid_docker_digest(digest) {
                    return Err(RegistryError::Parse(format!(
                        "invalid digest '{}' in reference {}",
                        digest, input
                    )));
                }
                (name, Some(digest.to_string()))
            }
            None => (input, None),
        };

        // A colon after the last slash separates the tag; earlier colons belong to a port.
        let last_slash = name_and_tag.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (name, tag) = match name_and_tag[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                (
                    &name_and_tag[..split],
                    Some(name_and_tag[split + 1..].to_string()),
                )
            }
            None => (name_and_tag, None),
        };

        let (hostname, path) = match name.split_once('/') {
            Some((first, rest)) if is_hostname(first) => (first.to_string(), rest.to_string()),
            _ => (DEFAULT_REGISTRY.to_string(), name.to_string()),
        };
        let hostname = if hostname == LEGACY_DEFAULT_REGISTRY {
            DEFAULT_REGISTRY.to_string()
        } else {
            hostname
        };

        validate_hostname(&hostname, input)?;
        validate_repository(&path, input)?;
        if let Some(tag) = &tag {
            validate_tag(tag, input)?;
        }

        let repository = if hostname == DEFAULT_REGISTRY && !path.contains('/') {
            format!("{}/{}", OFFICIAL_NAMESPACE, path)
        } else {
            path
        };

        let tag = match (&tag, &digest) {
            (None, None) => Some(DEFAULT_TAG.to_string()),
            _ => tag,
        };

        Ok(Self {
            hostname,
            repository,
            tag,
            digest,
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// The `{reference}` path segment used on the wire; a digest wins over a tag
    pub fn tag_or_digest(&self) -> &str {
        self.digest
            .as_deref()
            .or(self.tag.as_deref())
            .unwrap_or(DEFAULT_TAG)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.hostname, self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

impl FromStr for Reference {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn is_hostname(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn validate_hostname(hostname: &str, input: &str) -> Result<()> {
    let valid = !hostname.is_empty()
        && hostname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'));
    if !valid {
        return Err(RegistryError::Parse(format!(
            "invalid registry hostname '{}' in reference {}",
            hostname, input
        )));
    }
    Ok(())
}

fn validate_repository(path: &str, input: &str) -> Result<()> {
    if path.is_empty() {
        return Err(RegistryError::Parse(format!(
            "missing repository name in reference {}",
            input
        )));
    }
    for component in path.split('/') {
        if !is_valid_path_component(component) {
            return Err(RegistryError::Parse(format!(
                "invalid repository component '{}' in reference {}",
                component, input
            )));
        }
    }
    Ok(())
}

/// `[a-z0-9]+` runs joined by `.`, `_`, `__` or any number of `-`
fn is_valid_path_component(component: &str) -> bool {
    let bytes = component.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    if !is_lower_alnum(*first) || !is_lower_alnum(*last) {
        return false;
    }

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if is_lower_alnum(b) {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && !is_lower_alnum(bytes[i]) {
            i += 1;
        }
        let separator = &component[start..i];
        let allowed = matches!(separator, "." | "_" | "__") || separator.bytes().all(|c| c == b'-');
        if !allowed {
            return false;
        }
    }
    true
}

fn is_lower_alnum(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit()
}

fn validate_tag(tag: &str, input: &str) -> Result<()> {
    let mut chars = tag.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphanumeric() || first == '_')
                && tag.len() <= 128
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        }
        None => false,
    };
    if !valid {
        return Err(RegistryError::Parse(format!(
            "invalid tag '{}' in reference {}",
            tag, input
        )));
    }
    Ok(())
}
