use ethers::types::Address;
use log::{debug, info};
use std::sync::Arc;

use crate::aggregator::{AggregatorQuote, QuoteEngine, SwapParams};
use crate::errors::QuoteError;
use crate::registry::Registry;
use crate::request::QuoteRequest;
use crate::types::SwapQuote;
use crate::units::{parse_address, to_human_units, to_raw_units};

/// Wraps the multi-provider engine behind the request/response shapes the
/// HTTP layer speaks.
pub struct PrimaryAdapter {
    registry: Arc<Registry>,
    engine: Arc<dyn QuoteEngine>,
    fallback_account: Address,
}

impl PrimaryAdapter {
    pub fn new(registry: Arc<Registry>, engine: Arc<dyn QuoteEngine>, fallback_account: Address) -> Self {
        Self {
            registry,
            engine,
            fallback_account,
        }
    }

    pub async fn quote(&self, req: &QuoteRequest) -> Result<SwapQuote, QuoteError> {
        let chain_id = req.chain_id;
        let (input_decimals, output_decimals, from_symbol, to_symbol) = tokio::join!(
            self.registry.decimals(chain_id, &req.from),
            self.registry.decimals(chain_id, &req.to),
            self.registry.symbol(chain_id, &req.from),
            self.registry.symbol(chain_id, &req.to),
        );
        let (input_decimals, output_decimals) = (input_decimals?, output_decimals?);

        let input_amount = to_raw_units(&req.amount, input_decimals)
            .map_err(|e| QuoteError::Validation(e.to_string()))?;
        let invalid = |e: anyhow::Error| QuoteError::Validation(e.to_string());
        let mut params = SwapParams {
            chain_id,
            input_token: parse_address(&req.from).map_err(invalid)?,
            output_token: parse_address(&req.to).map_err(invalid)?,
            input_decimals,
            output_decimals,
            input_amount,
            slippage_bps: req.slippage_bps,
            swapper_account: self.fallback_account,
        };

        let mut quote = None;
        if let Some(sender) = &req.sender {
            params.swapper_account = parse_address(sender).map_err(invalid)?;
            quote = self.engine.get_quote(&params).await;
            if quote.is_none() {
                debug!("No quote simulating as {}, retrying with fallback account", sender);
            }
        }
        if quote.is_none() {
            params.swapper_account = self.fallback_account;
            quote = self.engine.get_quote(&params).await;
        }
        let quote = quote.ok_or(QuoteError::NoQuote)?;
        info!(
            "Primary quote on chain {} from {}: {}",
            chain_id, quote.provider, quote.output_amount
        );

        Ok(Self::to_swap_quote(
            req,
            quote,
            from_symbol.unwrap_or_default(),
            to_symbol.unwrap_or_default(),
            output_decimals,
        ))
    }

    fn to_swap_quote(
        req: &QuoteRequest,
        quote: AggregatorQuote,
        from_symbol: String,
        to_symbol: String,
        output_decimals: u8,
    ) -> SwapQuote {
        let router_value = Some(quote.tx.value).filter(|v| !v.is_zero());
        SwapQuote {
            chain_id: req.chain_id,
            from: req.from.clone(),
            from_symbol,
            to: req.to.clone(),
            to_symbol,
            amount: req.amount.clone(),
            provider: quote.provider,
            output_amount: to_human_units(quote.output_amount, output_decimals),
            output_amount_raw: quote.output_amount,
            input_amount_raw: quote.input_amount,
            slippage_bps: req.slippage_bps,
            gas_used: quote.gas_used.unwrap_or_default(),
            router_address: quote.tx.to,
            router_calldata: quote.tx.data,
            router_value,
            approval: quote.approval,
        }
    }
}
