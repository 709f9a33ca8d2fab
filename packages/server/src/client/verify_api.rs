//! HTTP client for the recast verification endpoint.

use anyhow::{Context, Result};

use crate::verify::{VerificationRequest, VerifyResponse};

pub const DEFAULT_VERIFY_URL: &str = "http://localhost:3000/api/verify-recast";

/// Shortest pasted value worth sending to the server.
pub const MIN_RECAST_INPUT: usize = 10;

#[derive(Clone)]
pub struct VerifyApiClient {
    http: reqwest::Client,
    url: String,
}

impl VerifyApiClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// POST a claim. Rejections arrive with 4xx statuses but the same body
    /// shape, so the body is decoded whatever the status.
    pub async fn verify(&self, cast_url: &str, original_cast_hash: &str) -> Result<VerifyResponse> {
        let req = VerificationRequest::new(cast_url, Some(original_cast_hash));
        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .with_context(|| format!("verification request to {} failed", self.url))?;
        let status = resp.status();
        resp.json::<VerifyResponse>()
            .await
            .with_context(|| format!("unreadable verification response (status {})", status))
    }
}
