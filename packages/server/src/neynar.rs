//! Neynar v2 client used to cross-check recast claims.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::verify::{CastLookup, CastRecord, LookupError};

pub const DEFAULT_BASE_URL: &str = "https://api.neynar.com";

/// Value shipped in sample configs; treated the same as no key at all.
const PLACEHOLDER_KEY: &str = "YOUR_API_KEY";

/// Returns the key if it is set and not the placeholder.
pub fn usable_api_key(key: Option<&str>) -> Option<&str> {
    key.map(str::trim)
        .filter(|k| !k.is_empty() && *k != PLACEHOLDER_KEY)
}

pub struct NeynarClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NeynarClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, LookupError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .header("accept", "application/json")
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        resp.json::<T>()
            .await
            .map(Some)
            .map_err(|e| LookupError::Parse(e.to_string()))
    }

    async fn lookup_cast(&self, identifier: &str, kind: &str) -> Result<Option<CastRecord>, LookupError> {
        let resp: Option<CastEnvelope> = self
            .get(
                "/v2/farcaster/cast",
                &[("identifier", identifier), ("type", kind)],
            )
            .await?;
        Ok(resp.map(|r| r.cast.into()))
    }
}

#[async_trait]
impl CastLookup for NeynarClient {
    async fn cast_by_hash(&self, hash: &str) -> Result<Option<CastRecord>, LookupError> {
        self.lookup_cast(hash, "hash").await
    }

    async fn cast_by_url(&self, url: &str) -> Result<Option<CastRecord>, LookupError> {
        self.lookup_cast(url, "url").await
    }

    async fn recasters(&self, hash: &str) -> Result<Vec<u64>, LookupError> {
        let resp: Option<RecastersEnvelope> = self
            .get(
                "/v2/farcaster/cast/recasters",
                &[("identifier", hash), ("type", "hash"), ("limit", "100")],
            )
            .await?;
        Ok(resp
            .map(|r| r.users.into_iter().map(|u| u.fid).collect())
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CastEnvelope {
    cast: NeynarCast,
}

#[derive(Deserialize)]
struct NeynarCast {
    hash: String,
    #[serde(default)]
    parent_hash: Option<String>,
    #[serde(default)]
    author: Option<NeynarUser>,
    #[serde(default)]
    embeds: Vec<NeynarEmbed>,
    #[serde(default)]
    reactions: Option<NeynarReactions>,
}

#[derive(Deserialize)]
struct NeynarUser {
    fid: u64,
}

/// Embeds are either URLs (ignored) or references to other casts.
#[derive(Deserialize)]
struct NeynarEmbed {
    #[serde(default)]
    cast_id: Option<EmbeddedCastId>,
    #[serde(default)]
    cast: Option<EmbeddedCast>,
}

#[derive(Deserialize)]
struct EmbeddedCastId {
    hash: String,
}

#[derive(Deserialize)]
struct EmbeddedCast {
    hash: String,
}

#[derive(Deserialize)]
struct NeynarReactions {
    #[serde(default)]
    recasts_count: Option<u64>,
}

#[derive(Deserialize)]
struct RecastersEnvelope {
    #[serde(default)]
    users: Vec<NeynarUser>,
}

impl From<NeynarCast> for CastRecord {
    fn from(c: NeynarCast) -> Self {
        let embedded_hashes = c
            .embeds
            .into_iter()
            .filter_map(|e| e.cast_id.map(|id| id.hash).or(e.cast.map(|c| c.hash)))
            .collect();
        Self {
            hash: c.hash,
            author_fid: c.author.map(|a| a.fid),
            parent_hash: c.parent_hash,
            embedded_hashes,
            recasts_count: c.reactions.and_then(|r| r.recasts_count),
        }
    }
}
