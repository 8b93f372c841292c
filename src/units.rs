//! Amount conversion and address helpers shared by both adapters.

use anyhow::{anyhow, Result};
use ethers::types::{Address, U256};
use ethers::utils::parse_units;
use std::str::FromStr;

/// Placeholder address aggregators use for the chain's native currency.
pub const NATIVE_TOKEN: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

/// `0x` followed by exactly 40 hex digits, any case. No checksum validation.
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

pub fn parse_address(address: &str) -> Result<Address> {
    if !is_valid_address(address) {
        return Err(anyhow!("Invalid address: {}", address));
    }
    Address::from_str(address).map_err(|e| anyhow!("Invalid address {}: {}", address, e))
}

pub fn is_native(token: &Address) -> bool {
    Address::from_str(NATIVE_TOKEN)
        .map(|native| native == *token)
        .unwrap_or(false)
}

/// Lower-case `0x` hex form used for cache keys and JSON output.
pub fn address_to_string(addr: &Address) -> String {
    format!("{:?}", addr)
}

/// Converts a human decimal amount into raw integer units.
///
/// Fractional digits beyond `decimals` are truncated rather than rejected.
pub fn to_raw_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(anyhow!("Invalid amount: {}", amount));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(anyhow!("Invalid amount: {}", amount));
    }
    let frac_part = &frac_part[..frac_part.len().min(decimals as usize)];
    let int_part = if int_part.is_empty() { "0" } else { int_part };
    let normalized = if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    };
    let raw = parse_units(normalized, decimals as u32)
        .map_err(|e| anyhow!("Failed to convert amount {} with {} decimals: {}", amount, decimals, e))?;
    Ok(raw.into())
}

/// Decimals assumed when checking that a request amount converts.
pub const VALIDATION_DECIMALS: u8 = 18;

/// Strictly positive plain decimal (`123`, `0.5`, `.25`) that [`to_raw_units`] accepts.
pub fn is_positive_amount(amount: &str) -> bool {
    amount == amount.trim()
        && amount.bytes().any(|b| (b'1'..=b'9').contains(&b))
        && to_raw_units(amount, VALIDATION_DECIMALS).is_ok()
}

/// Converts raw integer units into the shortest exact decimal string.
pub fn to_human_units(raw: U256, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

/// Masks API keys embedded in RPC URLs before they reach the logs.
pub fn redact_url(raw: &str) -> String {
    let mut parsed = match url::Url::parse(raw) {
        Ok(u) => u,
        Err(_) => return "<invalid url>".to_string(),
    };
    let segments: Vec<String> = parsed
        .path_segments()
        .map(|s| s.map(|seg| seg.to_string()).collect())
        .unwrap_or_default();
    if let Some(last) = segments.last() {
        if last.len() >= 16 {
            let mut masked = segments.clone();
            if let Some(tail) = masked.last_mut() {
                *tail = "***".to_string();
            }
            parsed.set_path(&masked.join("/"));
        }
    }
    if parsed.query().is_some() {
        parsed.set_query(Some("***"));
    }
    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC_BASE: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";

    #[test]
    fn accepts_mixed_case_addresses() {
        assert!(is_valid_address(USDC_BASE));
        assert!(is_valid_address(&USDC_BASE.to_lowercase()));
        assert!(is_valid_address("0x833589FCD6EDB6E08F4C7C32D4F71B54BDA02913"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_address("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"));
        assert!(!is_valid_address("0x123"));
        assert!(!is_valid_address("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA0291300"));
        assert!(!is_valid_address("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA0291G"));
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("USDC"));
    }

    #[test]
    fn converts_human_to_raw() {
        assert_eq!(to_raw_units("1000", 6).unwrap(), U256::from(1_000_000_000u64));
        assert_eq!(to_raw_units("0.5", 18).unwrap(), U256::exp10(17) * 5);
        assert_eq!(to_raw_units(".25", 2).unwrap(), U256::from(25));
    }

    #[test]
    fn truncates_excess_fraction() {
        assert_eq!(to_raw_units("1.123456789", 6).unwrap(), U256::from(1_123_456u64));
        assert_eq!(to_raw_units("7.9", 0).unwrap(), U256::from(7));
    }

    #[test]
    fn rejects_non_numeric_amounts() {
        assert!(to_raw_units("abc", 18).is_err());
        assert!(to_raw_units("1e3", 18).is_err());
        assert!(to_raw_units(".", 18).is_err());
    }

    #[test]
    fn positive_amounts_match_conversion_grammar() {
        for ok in ["1000", "0.5", ".25", "1.", "0.0000000000000000001", "100000000000000000000000000000"] {
            assert!(is_positive_amount(ok), "{ok} should pass");
        }
        for bad in ["0", "0.000", "-5", "+5", "1_000", "1e3", "1.2.3", " 1", "abc", "."] {
            assert!(!is_positive_amount(bad), "{bad} should fail");
        }
    }

    #[test]
    fn formats_raw_to_human() {
        assert_eq!(to_human_units(U256::exp10(17) * 4, 18), "0.4");
        assert_eq!(to_human_units(U256::from(1_000_000u64), 6), "1");
        assert_eq!(to_human_units(U256::from(1), 6), "0.000001");
        assert_eq!(to_human_units(U256::zero(), 18), "0");
        assert_eq!(to_human_units(U256::from(42), 0), "42");
    }

    #[test]
    fn redacts_api_key_segment() {
        let redacted = redact_url("https://eth-mainnet.g.alchemy.com/v2/abcdefghijklmnopqrstuvwxyz");
        assert_eq!(redacted, "https://eth-mainnet.g.alchemy.com/v2/***");
        assert_eq!(redact_url("http://localhost:8545/"), "http://localhost:8545/");
    }

    #[test]
    fn recognises_native_placeholder() {
        let native = Address::from_str(NATIVE_TOKEN).unwrap();
        assert!(is_native(&native));
        assert!(!is_native(&Address::from_str(USDC_BASE).unwrap()));
    }
}
