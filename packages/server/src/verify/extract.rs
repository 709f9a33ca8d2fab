//! Pull a cast identifier out of a pasted value.

use std::sync::OnceLock;

use regex::Regex;

/// Domains whose share URLs embed cast hashes in the path.
pub const PLATFORM_DOMAINS: &[&str] = &["warpcast.com", "farcaster.xyz"];

fn hex_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"0x[0-9a-fA-F]{8,}").expect("static regex"))
}

/// Whether the input looks like a share URL from a known platform.
pub fn is_platform_url(input: &str) -> bool {
    let lower = input.to_ascii_lowercase();
    PLATFORM_DOMAINS.iter().any(|d| lower.contains(d))
}

/// Extract the most likely cast identifier from `input`.
///
/// For platform URLs the *last* hex run wins: a recast link can carry both the
/// original cast and the share, and the share comes last. Inputs with no match
/// come back unchanged.
pub fn extract_reference(input: &str) -> String {
    let trimmed = input.trim();

    if is_platform_url(trimmed) {
        if let Some(m) = hex_ref_pattern().find_iter(trimmed).last() {
            return m.as_str().to_string();
        }
        return trimmed.to_string();
    }

    if trimmed.starts_with("0x") {
        return trimmed.to_string();
    }

    input.to_string()
}
