//! Authenticated HTTP session against one registry host
//!
//! Every request is first sent without credentials. A `401` answer triggers
//! the bearer token exchange and exactly one retry with the new token.

use crate::config::{ClientConfig, Credentials};
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::registry::auth::{Auth, BearerChallenge};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, WWW_AUTHENTICATE};
use reqwest::{Client, Method, StatusCode};

/// A request relative to the registry's base URL
#[derive(Debug, Clone)]
pub struct RegistryRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl RegistryRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| RegistryError::Parse(format!("invalid {} header: {}", name, e)))?;
        self.headers.append(name, value);
        Ok(self)
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone)]
pub struct RegistryResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RegistryResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// HTTP transport and credentials for one registry hostname
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    hostname: String,
    base_url: String,
    auth: Auth,
    output: Logger,
}

impl Session {
    pub fn new(
        hostname: &str,
        credentials: Credentials,
        config: &ClientConfig,
        output: Logger,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RegistryError::transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            auth: Auth::new(client.clone(), credentials, output.clone()),
            client,
            hostname: hostname.to_string(),
            base_url: config.base_url(hostname),
            output,
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn output(&self) -> &Logger {
        &self.output
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Execute a request, negotiating a bearer token if challenged.
    /// Any non-2xx final status is a transport error carrying the body.
    pub async fn execute(&self, request: RegistryRequest) -> Result<RegistryResponse> {
        let url = self.url_for(&request.path);
        self.output.debug(&format!("{} {}", request.method, url));

        let mut response = self.send(&request, &url, None).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let header = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            self.output.detail(&format!("Auth challenge received: {}", header));

            let challenge = BearerChallenge::parse(header);
            let token = self.auth.fetch_token(&challenge).await?;
            response = self.send(&request, &url, Some(&token)).await?;
        }

        let status = response.status();
        let headers = response.headers().clone();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(RegistryError::status(status.as_u16(), error_text));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| {
                RegistryError::transport(format!("failed to read response from {}: {}", url, e))
            })?
            .to_vec();

        Ok(RegistryResponse {
            status,
            headers,
            body,
        })
    }

    async fn send(
        &self,
        request: &RegistryRequest,
        url: &str,
        token: Option<&str>,
    ) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RegistryError::transport(format!("request to {} timed out: {}", url, e))
            } else {
                RegistryError::transport(format!("request to {} failed: {}", url, e))
            }
        })
    }
}
