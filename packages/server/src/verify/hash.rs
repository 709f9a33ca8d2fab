//! Cast hash normalization and local format checks.
//!
//! Pasted references come in several shapes: full 20-byte cast hashes, the
//! 8-character short form shown in warpcast URLs, and everything in between.
//! Normalization maps them all to a `0x`-prefixed 64-hex-char canonical form so
//! two references can be compared as strings.
//!
//! The short-form expansion is a heuristic. It prepends a fixed padding template
//! and has no way of recovering the real hash bytes, so it will happily produce
//! well-formed identifiers that do not exist. When the social API is available
//! the verifier resolves references through it first and only falls back to
//! this module.

use anyhow::{bail, Result};

/// Hex prefix carried by every canonical reference.
pub const HASH_PREFIX: &str = "0x";

/// Payloads at least this long are treated as already canonical.
pub const CANONICAL_MIN_PAYLOAD: usize = 56;

/// Payload length of the short identifiers shown in platform URLs.
pub const SHORT_PAYLOAD_LEN: usize = 8;

/// Payload length produced by zero-padding.
pub const PADDED_PAYLOAD_LEN: usize = 64;

/// Accepted total length (prefix included) of a canonical claimed reference.
pub const ACCEPTED_LEN: std::ops::RangeInclusive<usize> = 10..=66;

/// Default template prepended to short identifiers.
pub const DEFAULT_SHORT_HASH_PADDING: &str =
    "00000000000000000000000000000000000000000000000000000000";

/// A strategy for turning a user-supplied reference into its canonical form.
///
/// Implementations must be total: malformed input is returned as-is rather
/// than rejected, and later format checks decide what to do with it.
pub trait HashNormalizer: Send + Sync {
    fn normalize(&self, input: &str) -> String;

    /// Whether 8-char short identifiers are expanded with a padding template.
    fn expands_short_hashes(&self) -> bool;
}

/// Normalizer that zero-pads mid-length payloads and expands short ones with a
/// fixed template.
#[derive(Debug, Clone)]
pub struct PaddingNormalizer {
    short_padding: Option<String>,
}

impl PaddingNormalizer {
    /// Build a normalizer. `short_padding` must be exactly 56 hex chars; `None`
    /// disables short-hash expansion (short payloads are zero-padded instead).
    pub fn new(short_padding: Option<&str>) -> Result<Self> {
        let short_padding = match short_padding {
            Some(p) => {
                let p = strip_prefix(p.trim());
                let expected = PADDED_PAYLOAD_LEN - SHORT_PAYLOAD_LEN;
                if p.len() != expected {
                    bail!(
                        "short hash padding must be {} hex chars, got {}",
                        expected,
                        p.len()
                    );
                }
                if !is_hex(p) {
                    bail!("short hash padding must be hexadecimal");
                }
                Some(p.to_ascii_lowercase())
            }
            None => None,
        };
        Ok(Self { short_padding })
    }
}

impl Default for PaddingNormalizer {
    fn default() -> Self {
        Self {
            short_padding: Some(DEFAULT_SHORT_HASH_PADDING.to_string()),
        }
    }
}

impl HashNormalizer for PaddingNormalizer {
    fn normalize(&self, input: &str) -> String {
        let payload = strip_prefix(input);
        let len = payload.len();

        if len >= CANONICAL_MIN_PAYLOAD {
            return format!("{HASH_PREFIX}{payload}");
        }
        if len < SHORT_PAYLOAD_LEN || !is_hex(payload) {
            return input.to_string();
        }

        match &self.short_padding {
            Some(padding) if len == SHORT_PAYLOAD_LEN => {
                format!("{HASH_PREFIX}{padding}{payload}")
            }
            _ => format!("{HASH_PREFIX}{payload:0>width$}", width = PADDED_PAYLOAD_LEN),
        }
    }

    fn expands_short_hashes(&self) -> bool {
        self.short_padding.is_some()
    }
}

/// Case-insensitive comparison of two canonical references.
pub fn same_reference(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Local shape check applied when no upstream verdict exists.
pub fn is_well_formed(canonical: &str) -> bool {
    let Some(payload) = canonical.strip_prefix(HASH_PREFIX) else {
        return false;
    };
    ACCEPTED_LEN.contains(&canonical.len()) && is_hex(payload)
}

fn strip_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}
