//! In-process registry used by the integration tests.
//!
//! `FakeRegistry` answers the V2 manifest, blob and mount endpoints from
//! shared state, so a list pushed by one call can be fetched by the next.

#![allow(dead_code)]

use manifest_pusher::config::{AuthConfig, ClientConfig};
use manifest_pusher::image::DigestUtils;
use manifest_pusher::image::manifest::MEDIA_TYPE_SCHEMA2;
use manifest_pusher::logging::Logger;
use manifest_pusher::registry::SessionPool;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const CONFIG_MEDIA_TYPE: &str = "application/vnd.docker.container.image.v1+json";
pub const LAYER_MEDIA_TYPE: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";

#[derive(Default)]
struct State {
    /// (repository, tag or digest) -> (content type, payload)
    manifests: HashMap<(String, String), (String, Vec<u8>)>,
    /// (repository, digest) -> content
    blobs: HashMap<(String, String), Vec<u8>>,
    /// Pushes to these references answer with a wrong digest
    wrong_digest_for: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeRegistry {
    state: Arc<Mutex<State>>,
}

pub struct TestImage {
    pub digest: String,
    pub size: u64,
    pub payload: Vec<u8>,
    pub config_digest: String,
    pub layer_digests: Vec<String>,
}

impl FakeRegistry {
    pub async fn start() -> (MockServer, Self) {
        let server = MockServer::start().await;
        let registry = FakeRegistry::default();
        Mock::given(any())
            .respond_with(registry.clone())
            .mount(&server)
            .await;
        (server, registry)
    }

    pub fn put_blob(&self, repository: &str, content: &[u8]) -> String {
        let digest = DigestUtils::compute_docker_digest(content);
        self.state
            .lock()
            .unwrap()
            .blobs
            .insert((repository.to_string(), digest.clone()), content.to_vec());
        digest
    }

    pub fn put_manifest(
        &self,
        repository: &str,
        tag: Option<&str>,
        media_type: &str,
        payload: &[u8],
    ) -> String {
        let digest = DigestUtils::compute_docker_digest(payload);
        let mut state = self.state.lock().unwrap();
        let entry = (media_type.to_string(), payload.to_vec());
        state
            .manifests
            .insert((repository.to_string(), digest.clone()), entry.clone());
        if let Some(tag) = tag {
            state
                .manifests
                .insert((repository.to_string(), tag.to_string()), entry);
        }
        digest
    }

    /// A schema 2 image with a config blob and two layers, one shared by all images
    pub fn add_image(
        &self,
        repository: &str,
        tag: &str,
        os: &str,
        architecture: &str,
    ) -> TestImage {
        let config = format!(
            r#"{{"architecture":"{}","os":"{}","rootfs":{{"type":"layers","diff_ids":[]}}}}"#,
            architecture, os
        );
        let config_digest = self.put_blob(repository, config.as_bytes());
        let shared_layer = self.put_blob(repository, b"shared base layer");
        let own_layer =
            self.put_blob(repository, format!("{} {} layer", os, architecture).as_bytes());

        let payload = format!(
            r#"{{
   "schemaVersion": 2,
   "mediaType": "{}",
   "config": {{"mediaType": "{}", "size": {}, "digest": "{}"}},
   "layers": [
      {{"mediaType": "{}", "size": 17, "digest": "{}"}},
      {{"mediaType": "{}", "size": 20, "digest": "{}"}}
   ]
}}"#,
            MEDIA_TYPE_SCHEMA2,
            CONFIG_MEDIA_TYPE,
            config.len(),
            config_digest,
            LAYER_MEDIA_TYPE,
            shared_layer,
            LAYER_MEDIA_TYPE,
            own_layer
        )
        .into_bytes();
        let digest = self.put_manifest(repository, Some(tag), MEDIA_TYPE_SCHEMA2, &payload);

        TestImage {
            digest,
            size: payload.len() as u64,
            payload,
            config_digest,
            layer_digests: vec![shared_layer, own_layer],
        }
    }

    pub fn answer_wrong_digest_for(&self, reference: &str) {
        self.state
            .lock()
            .unwrap()
            .wrong_digest_for
            .push(reference.to_string());
    }

    pub fn has_blob(&self, repository: &str, digest: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .blobs
            .contains_key(&(repository.to_string(), digest.to_string()))
    }

    pub fn manifest(&self, repository: &str, reference: &str) -> Option<(String, Vec<u8>)> {
        self.state
            .lock()
            .unwrap()
            .manifests
            .get(&(repository.to_string(), reference.to_string()))
            .cloned()
    }
}

impl Respond for FakeRegistry {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let path = request.url.path().to_string();
        let Some(rest) = path.strip_prefix("/v2/") else {
            return ResponseTemplate::new(404);
        };
        let method = request.method.as_str();
        let mut state = self.state.lock().unwrap();

        if let Some((name, reference)) = rest.rsplit_once("/manifests/") {
            let key = (name.to_string(), reference.to_string());
            return match method {
                "GET" => match state.manifests.get(&key) {
                    Some((media_type, payload)) => ResponseTemplate::new(200)
                        .insert_header(
                            "Docker-Content-Digest",
                            DigestUtils::compute_docker_digest(payload).as_str(),
                        )
                        .set_body_raw(payload.clone(), media_type),
                    None => ResponseTemplate::new(404)
                        .set_body_string(r#"{"errors":[{"code":"MANIFEST_UNKNOWN"}]}"#),
                },
                "PUT" => {
                    let media_type = request
                        .headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    let digest = DigestUtils::compute_docker_digest(&request.body);
                    let entry = (media_type, request.body.clone());
                    state
                        .manifests
                        .insert((name.to_string(), digest.clone()), entry.clone());
                    state.manifests.insert(key, entry);

                    let echoed = if state.wrong_digest_for.iter().any(|r| r == reference) {
                        format!("sha256:{}", "0".repeat(64))
                    } else {
                        digest
                    };
                    ResponseTemplate::new(201)
                        .insert_header("Docker-Content-Digest", echoed.as_str())
                }
                _ => ResponseTemplate::new(405),
            };
        }

        if let Some(name) = rest.strip_suffix("/blobs/uploads/") {
            if method != "POST" {
                return ResponseTemplate::new(405);
            }
            let query: HashMap<String, String> = request.url.query_pairs().into_owned().collect();
            let (Some(digest), Some(from)) = (query.get("mount"), query.get("from")) else {
                return ResponseTemplate::new(400);
            };
            let existing = state.blobs.get(&(from.clone(), digest.clone())).cloned();
            return match existing {
                Some(content) => {
                    state.blobs.insert((name.to_string(), digest.clone()), content);
                    let location = format!("/v2/{}/blobs/{}", name, digest);
                    ResponseTemplate::new(201).insert_header("Location", location.as_str())
                }
                None => ResponseTemplate::new(404)
                    .set_body_string(r#"{"errors":[{"code":"BLOB_UNKNOWN"}]}"#),
            };
        }

        if let Some((name, digest)) = rest.rsplit_once("/blobs/") {
            if method == "GET" {
                if let Some(content) = state.blobs.get(&(name.to_string(), digest.to_string())) {
                    return ResponseTemplate::new(200).set_body_bytes(content.clone());
                }
            }
        }

        ResponseTemplate::new(404)
    }
}

/// Hostname of the mock server as used inside image references
pub fn host(server: &MockServer) -> String {
    server.address().to_string()
}

pub fn anonymous_auth() -> AuthConfig {
    AuthConfig::new(None, None, Some(PathBuf::from("/nonexistent/docker-config")))
}

pub fn plain_http() -> ClientConfig {
    ClientConfig::new().with_plain_http(true)
}

pub fn session_pool() -> SessionPool {
    SessionPool::new(plain_http(), anonymous_auth(), Logger::new_quiet())
}

/// (method, path) of every request the server saw, in order
pub async fn request_log(server: &MockServer) -> Vec<(String, String)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| (r.method.as_str().to_string(), r.url.path().to_string()))
        .collect()
}
