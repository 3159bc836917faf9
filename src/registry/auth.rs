//! Bearer token negotiation for Docker registry access
//!
//! A registry answers an unauthenticated request with `401` and a
//! `WWW-Authenticate: Bearer realm="..",service="..",scope=".."` challenge.
//! The token is fetched from the realm and used for a single retry; tokens
//! are never cached between requests.

use crate::config::Credentials;
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

/// Parameters of a `Bearer` challenge. Missing parameters are empty strings;
/// a challenge without a usable realm fails later, at the token request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BearerChallenge {
    pub realm: String,
    pub service: String,
    pub scope: String,
}

impl BearerChallenge {
    pub fn parse(header: &str) -> Self {
        let header = header.trim();
        let params_str = match header.split_once(char::is_whitespace) {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest,
            _ => "",
        };

        let mut params = parse_auth_params(params_str);
        Self {
            realm: params.remove("realm").unwrap_or_default(),
            service: params.remove("service").unwrap_or_default(),
            scope: params.remove("scope").unwrap_or_default(),
        }
    }
}

/// Split `key="quoted, value",key=token` pairs. Commas inside quotes are
/// part of the value (scopes such as `repository:app:pull,push`).
fn parse_auth_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut rest = input;

    loop {
        rest = rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        let Some(eq) = rest.find('=') else {
            break;
        };
        let key = rest[..eq].trim().to_ascii_lowercase();
        rest = rest[eq + 1..].trim_start();

        let value = if let Some(quoted) = rest.strip_prefix('"') {
            let mut value = String::new();
            let mut escaped = false;
            let mut consumed = quoted.len();
            for (i, c) in quoted.char_indices() {
                if escaped {
                    value.push(c);
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    consumed = i + 1;
                    break;
                } else {
                    value.push(c);
                }
            }
            rest = &quoted[consumed..];
            value
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            let value = rest[..end].trim().to_string();
            rest = &rest[end..];
            value
        };

        params.insert(key, value);
    }

    params
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

/// Token client for one registry host
#[derive(Debug, Clone)]
pub struct Auth {
    client: Client,
    credentials: Credentials,
    output: Logger,
}

impl Auth {
    pub fn new(client: Client, credentials: Credentials, output: Logger) -> Self {
        Self {
            client,
            credentials,
            output,
        }
    }

    /// `GET {realm}?service=..&scope=..`, with basic auth when a username is set
    pub async fn fetch_token(&self, challenge: &BearerChallenge) -> Result<String> {
        let mut url = url::Url::parse(&challenge.realm).map_err(|e| {
            RegistryError::Auth(format!("invalid token realm '{}': {}", challenge.realm, e))
        })?;
        url.query_pairs_mut()
            .append_pair("service", &challenge.service)
            .append_pair("scope", &challenge.scope);

        self.output.detail(&format!(
            "Requesting token from {} (service={}, scope={})",
            challenge.realm, challenge.service, challenge.scope
        ));

        let mut request = self.client.get(url);
        if !self.credentials.is_anonymous() {
            request =
                request.basic_auth(&self.credentials.username, Some(&self.credentials.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| RegistryError::Auth(format!("failed to get auth token: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(RegistryError::Auth(format!(
                "token request failed with status {}: {}",
                status, error_text
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::Auth(format!("failed to parse token response: {}", e)))?;

        let token = token_response
            .token
            .filter(|t| !t.is_empty())
            .or(token_response.access_token.filter(|t| !t.is_empty()))
            .ok_or_else(|| RegistryError::Auth("token response carried no token".to_string()))?;

        self.output.detail(&format!("Token obtained (length: {} chars)", token.len()));
        Ok(token)
    }
}
