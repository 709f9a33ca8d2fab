//! Seam between the verifier and the social-graph API.

use async_trait::async_trait;

/// Transport or decoding failure talking to the social API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("invalid response: {0}")]
    Parse(String),
}

/// The parts of a cast the verifier looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CastRecord {
    pub hash: String,
    pub author_fid: Option<u64>,
    pub parent_hash: Option<String>,
    /// Hashes of casts quoted or embedded in this one.
    pub embedded_hashes: Vec<String>,
    pub recasts_count: Option<u64>,
}

/// Read access to casts and their recasters.
///
/// `Ok(None)` means the API answered and has no such cast; `Err` means the API
/// could not be asked at all.
#[async_trait]
pub trait CastLookup: Send + Sync {
    async fn cast_by_hash(&self, hash: &str) -> Result<Option<CastRecord>, LookupError>;

    async fn cast_by_url(&self, url: &str) -> Result<Option<CastRecord>, LookupError>;

    /// FIDs of the accounts that recast `hash`.
    async fn recasters(&self, hash: &str) -> Result<Vec<u64>, LookupError>;
}
