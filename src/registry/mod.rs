//! Registry module for Docker Registry HTTP API V2 interactions
//!
//! Provides the per-host authenticated [`Session`], the bearer token
//! exchange, and the manifest and blob operations built on top of them.

pub mod auth;
pub mod operations;
pub mod pool;
pub mod session;

pub use auth::{Auth, BearerChallenge};
pub use operations::{BlobOperations, ManifestOperations, RegistryOperations};
pub use pool::SessionPool;
pub use session::{RegistryRequest, RegistryResponse, Session};
