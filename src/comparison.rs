use ethers::types::U256;
use ethers::utils::format_units;
use log::debug;
use serde::Serialize;
use std::sync::Arc;

use crate::chains;
use crate::curve::{is_curve_supported, SecondaryAdapter, CURVE_CHAIN_ID};
use crate::errors::{ErrorKind, QuoteError, SourceFailure};
use crate::primary::PrimaryAdapter;
use crate::registry::Registry;
use crate::request::QuoteRequest;
use crate::types::{CurveQuote, SwapQuote};

const PRIMARY_NAME: &str = "Aggregator";
const SECONDARY_NAME: &str = "Curve";

/// Outcome of one source: the quote or a structured failure.
pub type SourceResult<T> = Result<T, SourceFailure>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub primary: Option<SwapQuote>,
    pub primary_error: Option<String>,
    pub primary_error_kind: Option<ErrorKind>,
    pub secondary: Option<CurveQuote>,
    pub secondary_error: Option<String>,
    pub secondary_error_kind: Option<ErrorKind>,
    pub recommendation: Option<Recommendation>,
    pub reason: String,
    pub gas_price_gwei: Option<String>,
}

fn split<T>(result: SourceResult<T>) -> (Option<T>, Option<String>, Option<ErrorKind>) {
    match result {
        Ok(value) => (Some(value), None, None),
        Err(failure) => (None, Some(failure.message), Some(failure.kind)),
    }
}

impl ComparisonResult {
    pub fn new(
        primary: SourceResult<SwapQuote>,
        secondary: SourceResult<CurveQuote>,
        gas_price_gwei: Option<String>,
        native_symbol: &str,
    ) -> Self {
        let (recommendation, reason) = recommend(
            primary.as_ref().ok(),
            secondary.as_ref().ok(),
            gas_price_gwei.as_deref(),
            native_symbol,
        );
        let (primary, primary_error, primary_error_kind) = split(primary);
        let (secondary, secondary_error, secondary_error_kind) = split(secondary);
        Self {
            primary,
            primary_error,
            primary_error_kind,
            secondary,
            secondary_error,
            secondary_error_kind,
            recommendation,
            reason,
            gas_price_gwei,
        }
    }
}

fn parse_amount(amount: &str) -> f64 {
    amount.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Wei to gwei with four decimals.
pub fn format_gwei(wei: U256) -> Option<String> {
    let gwei: f64 = format_units(wei, "gwei").ok()?.parse().ok()?;
    Some(format!("{:.4}", gwei))
}

/// Picks the larger human-readable output. Ties go to the aggregator.
pub fn recommend(
    primary: Option<&SwapQuote>,
    secondary: Option<&CurveQuote>,
    gas_price_gwei: Option<&str>,
    native_symbol: &str,
) -> (Option<Recommendation>, String) {
    let (primary, secondary) = match (primary, secondary) {
        (Some(p), Some(s)) => (p, s),
        (Some(_), None) => {
            return (
                Some(Recommendation::Primary),
                format!("Only {} returned a quote", PRIMARY_NAME),
            )
        }
        (None, Some(_)) => {
            return (
                Some(Recommendation::Secondary),
                format!("Only {} returned a quote", SECONDARY_NAME),
            )
        }
        (None, None) => return (None, "Neither source returned a quote".to_string()),
    };

    let primary_out = parse_amount(&primary.output_amount);
    let secondary_out = parse_amount(&secondary.output_amount);
    if primary_out == secondary_out {
        return (
            Some(Recommendation::Primary),
            "Equal output amounts; defaulting to the aggregator for multi-provider coverage".to_string(),
        );
    }

    let (winner, winner_name, winner_out, loser_out) = if secondary_out > primary_out {
        (Recommendation::Secondary, SECONDARY_NAME.to_string(), secondary_out, primary_out)
    } else {
        (
            Recommendation::Primary,
            format!("{} ({})", PRIMARY_NAME, primary.provider),
            primary_out,
            secondary_out,
        )
    };
    let diff = winner_out - loser_out;
    let mut reason = format!("{} outputs {:.6} more", winner_name, diff);
    if loser_out > 0.0 {
        reason.push_str(&format!(" (+{:.3}%)", diff / loser_out * 100.0));
    }

    // Aggregator gas cost in native units, for context only
    let gas_units = parse_amount(&primary.gas_used.to_string());
    let gas_price_wei = gas_price_gwei.map(parse_amount).unwrap_or(0.0) * 1e9;
    let gas_cost = gas_units * gas_price_wei / 1e18;
    if gas_cost > 0.0 {
        reason.push_str(&format!(
            ". {} gas: {} units (~{:.6} {})",
            PRIMARY_NAME, primary.gas_used, gas_cost, native_symbol
        ));
    }
    (Some(winner), reason)
}

/// Runs both sources and the gas price lookup side by side.
pub struct ComparisonEngine {
    registry: Arc<Registry>,
    primary: Arc<PrimaryAdapter>,
    /// `None` when the Curve source is switched off
    secondary: Option<Arc<SecondaryAdapter>>,
}

impl ComparisonEngine {
    pub fn new(
        registry: Arc<Registry>,
        primary: Arc<PrimaryAdapter>,
        secondary: Option<Arc<SecondaryAdapter>>,
    ) -> Self {
        Self {
            registry,
            primary,
            secondary,
        }
    }

    async fn secondary_quote(&self, req: &QuoteRequest) -> Result<CurveQuote, QuoteError> {
        let secondary = self
            .secondary
            .as_ref()
            .ok_or_else(|| QuoteError::Unavailable("Curve disabled".to_string()))?;
        if !is_curve_supported(req.chain_id) {
            return Err(QuoteError::Unavailable(format!(
                "Curve only supports Ethereum (chainId {})",
                CURVE_CHAIN_ID
            )));
        }
        let client = self.registry.client(CURVE_CHAIN_ID).ok();
        secondary
            .quote(&req.from, &req.to, &req.amount, req.sender.as_deref(), client)
            .await
    }

    async fn gas_price_gwei(&self, chain_id: u64) -> Option<String> {
        let client = self.registry.client(chain_id).ok()?;
        match client.gas_price().await {
            Ok(wei) => format_gwei(wei),
            Err(e) => {
                debug!("Gas price lookup failed on chain {}: {:#}", chain_id, e);
                None
            }
        }
    }

    pub async fn compare(&self, req: &QuoteRequest) -> ComparisonResult {
        let (primary, secondary, gas_price_gwei) = tokio::join!(
            self.primary.quote(req),
            self.secondary_quote(req),
            self.gas_price_gwei(req.chain_id),
        );
        let native_symbol = chains::get_chain(req.chain_id)
            .map(|c| c.native_symbol)
            .unwrap_or("ETH");
        ComparisonResult::new(
            primary.map_err(SourceFailure::from),
            secondary.map_err(SourceFailure::from),
            gas_price_gwei,
            native_symbol,
        )
    }
}
