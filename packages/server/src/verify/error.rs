use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::{lookup::LookupError, VerifyResponse};

/// Why a recast claim was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Body missing, not JSON, or without a cast URL.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Invalid cast hash format")]
    InvalidFormat,

    #[error("You submitted the original cast, not your recast")]
    SameAsOriginal,

    /// Social API has no such cast (strict mode only).
    #[error("Cast not found")]
    NotFound,

    /// Cast exists but does not reference the boosted post (strict mode only).
    #[error("Cast is not a recast of the boosted post")]
    NotARecast,

    /// Recovered inside the verifier; never returned to callers.
    #[error("Social API unavailable: {0}")]
    UpstreamUnavailable(#[from] LookupError),

    #[error("Internal error: {0}")]
    Unexpected(String),
}

impl VerifyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedRequest(_)
            | Self::InvalidFormat
            | Self::SameAsOriginal
            | Self::NotARecast => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable(_) | Self::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable name of the rejection kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "MalformedRequest",
            Self::InvalidFormat => "InvalidFormat",
            Self::SameAsOriginal => "SameAsOriginal",
            Self::NotFound => "NotFound",
            Self::NotARecast => "NotARecast",
            Self::UpstreamUnavailable(_) => "UpstreamUnavailable",
            Self::Unexpected(_) => "Unexpected",
        }
    }

    /// `success` reports whether the request itself was usable; a well-formed
    /// claim that fails verification still counts as a successful request.
    fn request_was_valid(&self) -> bool {
        matches!(self, Self::SameAsOriginal | Self::NotFound | Self::NotARecast)
    }
}

impl IntoResponse for VerifyError {
    fn into_response(self) -> Response {
        let body = VerifyResponse {
            success: self.request_was_valid(),
            verified: false,
            error: Some(self.to_string()),
            code: Some(self.kind().to_string()),
            ..Default::default()
        };
        (self.status(), Json(body)).into_response()
    }
}
