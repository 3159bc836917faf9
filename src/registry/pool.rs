//! Per-hostname session map
//!
//! Built at the start of an operation and passed down explicitly. Sessions
//! are created on first use with the credentials resolved for that host.

use crate::config::{AuthConfig, ClientConfig};
use crate::error::Result;
use crate::logging::Logger;
use crate::registry::session::Session;
use std::collections::HashMap;

pub struct SessionPool {
    config: ClientConfig,
    auth: AuthConfig,
    output: Logger,
    sessions: HashMap<String, Session>,
}

impl SessionPool {
    pub fn new(config: ClientConfig, auth: AuthConfig, output: Logger) -> Self {
        Self {
            config,
            auth,
            output,
            sessions: HashMap::new(),
        }
    }

    /// Get the session for a hostname, creating it on first use
    pub fn session(&mut self, hostname: &str) -> Result<&Session> {
        if !self.sessions.contains_key(hostname) {
            let credentials = self.auth.resolve(hostname)?;
            self.output.verbose(&format!(
                "Creating session for {} ({})",
                hostname,
                if credentials.is_anonymous() {
                    "anonymous".to_string()
                } else {
                    format!("user {}", credentials.username)
                }
            ));
            let session = Session::new(hostname, credentials, &self.config, self.output.clone())?;
            self.sessions.insert(hostname.to_string(), session);
        }
        Ok(&self.sessions[hostname])
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
