//! Recast verification: reference extraction, normalization, and the verdict
//! state machine behind `/api/verify-recast`.

pub mod engine;
pub mod error;
pub mod extract;
pub mod hash;
pub mod lookup;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use engine::{Verdict, VerdictSource, Verifier};
pub use error::VerifyError;
pub use hash::{HashNormalizer, PaddingNormalizer};
pub use lookup::{CastLookup, CastRecord, LookupError};

/// How hard the verifier leans on the social API's answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Unknown casts and unrelated casts are rejected outright.
    Strict,
    /// Unknown casts fall back to format checks; unrelated casts pass with a note.
    #[default]
    Lenient,
}

impl Strictness {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

/// Body of `POST /api/verify-recast`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    #[serde(default)]
    pub cast_url: Option<String>,
    #[serde(default)]
    pub original_cast_hash: Option<String>,
    #[serde(default)]
    pub user_fid: Option<Fid>,
}

impl VerificationRequest {
    pub fn new(cast_url: &str, original_cast_hash: Option<&str>) -> Self {
        Self {
            cast_url: Some(cast_url.to_string()),
            original_cast_hash: original_cast_hash.map(str::to_string),
            user_fid: None,
        }
    }

    /// Requester FID, if one was supplied and parses.
    pub fn fid(&self) -> Option<u64> {
        match self.user_fid.as_ref()? {
            Fid::Number(n) => Some(*n),
            Fid::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Farcaster ID, sent by clients as either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fid {
    Number(u64),
    Text(String),
}

/// Response body shared by acceptances and rejections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recast_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Rejection kind, e.g. `InvalidFormat`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recast_count: Option<u64>,
}

impl From<Verdict> for VerifyResponse {
    fn from(v: Verdict) -> Self {
        Self {
            success: true,
            verified: true,
            recast_hash: Some(v.recast_hash),
            message: Some(v.message),
            note: v.note,
            recast_count: v.recast_count,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_numeric_and_string_fids() {
        let a: VerificationRequest =
            serde_json::from_str(r#"{"castUrl":"0xabc12345","userFid":42}"#).unwrap();
        assert_eq!(a.fid(), Some(42));

        let b: VerificationRequest =
            serde_json::from_str(r#"{"castUrl":"0xabc12345","userFid":" 7 "}"#).unwrap();
        assert_eq!(b.fid(), Some(7));

        let c: VerificationRequest =
            serde_json::from_str(r#"{"castUrl":"0xabc12345","userFid":null}"#).unwrap();
        assert_eq!(c.fid(), None);
    }

    #[test]
    fn rejection_body_shape() {
        let body = serde_json::to_value(VerifyResponse {
            success: false,
            verified: false,
            error: Some("Invalid cast hash format".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "verified": false,
                "error": "Invalid cast hash format"
            })
        );
    }
}
