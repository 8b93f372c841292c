use serde::Serialize;
use std::collections::HashMap;

use crate::chains;
use crate::errors::QuoteError;
use crate::units::{is_positive_amount, is_valid_address};

pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;
pub const MAX_SLIPPAGE_BPS: u32 = 10_000;

/// A validated swap request. Token addresses keep the caller's casing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub chain_id: u64,
    pub from: String,
    pub to: String,
    /// Human-readable input amount, strictly positive
    pub amount: String,
    pub slippage_bps: u32,
    pub sender: Option<String>,
}

fn invalid(msg: impl Into<String>) -> QuoteError {
    QuoteError::Validation(msg.into())
}

/// Validates raw query parameters into a [`QuoteRequest`].
///
/// Performs no I/O; the first failing check determines the error message.
pub fn parse_quote_params(params: &HashMap<String, String>) -> Result<QuoteRequest, QuoteError> {
    let get = |key: &str| params.get(key).map(|v| v.as_str()).filter(|v| !v.is_empty());

    let chain_id_str = get("chainId").ok_or_else(|| invalid("Missing required param: chainId"))?;
    let chain_id = match chain_id_str.parse::<i64>() {
        Ok(id) if id > 0 => id as u64,
        _ => return Err(invalid(format!("Invalid chainId: {}", chain_id_str))),
    };
    if !chains::is_supported(chain_id) {
        return Err(invalid(format!(
            "Unsupported chainId: {}. Supported: {}",
            chain_id,
            chains::supported_ids()
        )));
    }

    let (from, to) = match (get("from"), get("to")) {
        (Some(from), Some(to)) => (from, to),
        _ => return Err(invalid("Missing required params: from, to (token addresses)")),
    };
    if !is_valid_address(from) {
        return Err(invalid(format!("Invalid 'from' address: {}", from)));
    }
    if !is_valid_address(to) {
        return Err(invalid(format!("Invalid 'to' address: {}", to)));
    }

    let amount = get("amount").ok_or_else(|| invalid("Missing required param: amount"))?;
    if !is_positive_amount(amount) {
        return Err(invalid(format!("Invalid amount: {}", amount)));
    }

    let slippage_str = get("slippageBps").unwrap_or("50");
    let slippage_bps = match slippage_str.parse::<i64>() {
        Ok(bps) if (0..=MAX_SLIPPAGE_BPS as i64).contains(&bps) => bps as u32,
        _ => {
            return Err(invalid(format!(
                "Invalid slippageBps: {} (must be 0-10000)",
                slippage_str
            )))
        }
    };

    let sender = get("sender");
    if let Some(sender) = sender {
        if !is_valid_address(sender) {
            return Err(invalid(format!("Invalid sender address: {}", sender)));
        }
    }

    Ok(QuoteRequest {
        chain_id,
        from: from.to_string(),
        to: to.to_string(),
        amount: amount.to_string(),
        slippage_bps,
        sender: sender.map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC_BASE: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
    const WETH_BASE: &str = "0x4200000000000000000000000000000000000006";

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("chainId", "8453"),
            ("from", USDC_BASE),
            ("to", WETH_BASE),
            ("amount", "1000"),
        ]
    }

    fn err_of(pairs: &[(&str, &str)]) -> String {
        parse_quote_params(&params(pairs)).unwrap_err().to_string()
    }

    #[test]
    fn parses_valid_params() {
        let mut p = base();
        p.push(("slippageBps", "100"));
        let req = parse_quote_params(&params(&p)).unwrap();
        assert_eq!(
            req,
            QuoteRequest {
                chain_id: 8453,
                from: USDC_BASE.to_string(),
                to: WETH_BASE.to_string(),
                amount: "1000".to_string(),
                slippage_bps: 100,
                sender: None,
            }
        );
    }

    #[test]
    fn slippage_defaults_to_fifty() {
        let req = parse_quote_params(&params(&base())).unwrap();
        assert_eq!(req.slippage_bps, DEFAULT_SLIPPAGE_BPS);
    }

    #[test]
    fn slippage_bounds_are_inclusive() {
        for ok in ["0", "10000"] {
            let mut p = base();
            p.push(("slippageBps", ok));
            assert!(parse_quote_params(&params(&p)).is_ok(), "{ok} should pass");
        }
        for bad in ["-1", "10001", "abc"] {
            let mut p = base();
            p.push(("slippageBps", bad));
            let msg = err_of(&p);
            assert!(msg.contains("must be 0-10000"), "{bad}: {msg}");
        }
    }

    #[test]
    fn parses_sender_and_ignores_empty_sender() {
        let sender = "0xEe7aE85f2Fe2239E27D9c1E23fFFe168D63b4055";
        let mut p = base();
        p.push(("sender", sender));
        assert_eq!(
            parse_quote_params(&params(&p)).unwrap().sender.as_deref(),
            Some(sender)
        );

        let mut p = base();
        p.push(("sender", ""));
        assert_eq!(parse_quote_params(&params(&p)).unwrap().sender, None);
    }

    #[test]
    fn rejects_bad_sender() {
        let mut p = base();
        p.push(("sender", "0xnothex"));
        assert!(err_of(&p).contains("Invalid sender address"));
    }

    #[test]
    fn rejects_missing_and_invalid_chain() {
        assert!(err_of(&[("from", USDC_BASE), ("to", WETH_BASE), ("amount", "1")]).contains("chainId"));
        assert!(err_of(&[("chainId", "abc"), ("from", USDC_BASE), ("to", WETH_BASE), ("amount", "1")])
            .contains("Invalid chainId"));
        assert!(err_of(&[("chainId", "-1"), ("from", USDC_BASE), ("to", WETH_BASE), ("amount", "1")])
            .contains("Invalid chainId"));
        let msg = err_of(&[("chainId", "999"), ("from", USDC_BASE), ("to", WETH_BASE), ("amount", "1")]);
        assert!(msg.contains("Unsupported chainId: 999"));
        assert!(msg.contains("8453"));
    }

    #[test]
    fn rejects_bad_tokens() {
        assert!(err_of(&[("chainId", "8453"), ("to", WETH_BASE), ("amount", "1")]).contains("from, to"));
        assert!(err_of(&[("chainId", "8453"), ("from", "USDC"), ("to", WETH_BASE), ("amount", "1")])
            .contains("Invalid 'from' address"));
        assert!(err_of(&[("chainId", "8453"), ("from", USDC_BASE), ("to", "0x12"), ("amount", "1")])
            .contains("Invalid 'to' address"));
    }

    #[test]
    fn rejects_bad_amounts() {
        assert!(err_of(&[("chainId", "8453"), ("from", USDC_BASE), ("to", WETH_BASE)])
            .contains("Missing required param: amount"));
        for bad in ["0", "-5", "abc", "0.0", "1_000", "+1", "1e3"] {
            let msg = err_of(&[("chainId", "8453"), ("from", USDC_BASE), ("to", WETH_BASE), ("amount", bad)]);
            assert!(msg.contains("Invalid amount"), "{bad}: {msg}");
        }
    }

    #[test]
    fn accepts_fractional_amounts() {
        let req = parse_quote_params(&params(&[
            ("chainId", "1"),
            ("from", USDC_BASE),
            ("to", WETH_BASE),
            ("amount", "0.0015"),
        ]))
        .unwrap();
        assert_eq!(req.amount, "0.0015");
    }

    #[test]
    fn accepts_amounts_beyond_decimal_precision() {
        let big = "100000000000000000000000000000";
        let req = parse_quote_params(&params(&[
            ("chainId", "1"),
            ("from", USDC_BASE),
            ("to", WETH_BASE),
            ("amount", big),
        ]))
        .unwrap();
        assert_eq!(req.amount, big);
        assert!(crate::units::to_raw_units(&req.amount, 6).is_ok());
    }
}
