//! Ether <-> wei conversions.

use anyhow::{bail, Context, Result};

pub const ETHER_DECIMALS: usize = 18;
const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Parse a decimal ether amount ("0.001", "2", ".5") into wei.
pub fn parse_ether(input: &str) -> Result<u128> {
    let s = input.trim();
    if s.is_empty() {
        bail!("empty ether amount");
    }

    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && frac.is_empty() {
        bail!("invalid ether amount: {}", input);
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        bail!("invalid ether amount: {}", input);
    }
    if frac.len() > ETHER_DECIMALS {
        bail!("too many decimal places (max {}): {}", ETHER_DECIMALS, input);
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().context("ether amount too large")?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        format!("{:0<width$}", frac, width = ETHER_DECIMALS).parse()?
    };

    whole
        .checked_mul(WEI_PER_ETHER)
        .and_then(|w| w.checked_add(frac))
        .context("ether amount too large")
}

/// Format wei as ether the way wallets do: trailing zeros trimmed, at least one
/// fractional digit ("1.0", "0.001").
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    let frac = format!("{:0>width$}", frac, width = ETHER_DECIMALS);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, frac)
    }
}
