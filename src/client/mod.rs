//! Upstream client module
//!
//! Defines the `ProfileClient` seam the request handlers call through, the
//! loosely-typed `RawRecord` the upstream returns, and the HTTP
//! implementation used in production.

mod error;
mod http;
#[cfg(test)]
pub mod stub;

pub use error::ClientError;
pub use http::HttpProfileClient;

use async_trait::async_trait;

/// Loosely-typed mapping returned by the upstream data API
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// How a profile is looked up upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileLookup {
    /// Human-readable slug used in profile URLs
    PublicId(String),
    /// Opaque internal identifier
    UrnId(String),
}

impl ProfileLookup {
    /// Name of the lookup key as the upstream expects it
    pub const fn key(&self) -> &'static str {
        match self {
            Self::PublicId(_) => "public_id",
            Self::UrnId(_) => "urn_id",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::PublicId(v) | Self::UrnId(v) => v,
        }
    }
}

/// Operations consumed from the upstream social-network API.
///
/// One instance is built at startup and shared by every request, so
/// implementations must tolerate concurrent calls.
#[async_trait]
pub trait ProfileClient: Send + Sync {
    /// Search people by keywords, returning at most `limit` hits
    async fn search_people(&self, keywords: &str, limit: usize)
        -> Result<Vec<RawRecord>, ClientError>;

    /// Fetch the full profile mapping
    async fn get_profile(&self, lookup: &ProfileLookup) -> Result<RawRecord, ClientError>;

    /// Fetch the contact info mapping of a profile
    async fn get_profile_contact_info(&self, urn_id: &str) -> Result<RawRecord, ClientError>;
}
