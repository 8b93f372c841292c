//! # Multi-provider quote engine
//!
//! Fans an exact-input swap out to every configured aggregator API at once,
//! bounds each call by a shared deadline and keeps the best answer. Provider
//! failures are logged and dropped; the engine only reports "no quote".

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, U256};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::settings::AggregatorSettings;
use crate::types::{Approval, TxRequest};

pub mod config;
pub mod providers;

pub use config::{build_provider_configs, ProviderConfig};

/// Exact-input swap the engine is asked to price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapParams {
    pub chain_id: u64,
    pub input_token: Address,
    pub output_token: Address,
    pub input_decimals: u8,
    pub output_decimals: u8,
    pub input_amount: U256,
    pub slippage_bps: u32,
    /// Account the providers simulate the swap from
    pub swapper_account: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorQuote {
    pub provider: String,
    pub input_amount: U256,
    pub output_amount: U256,
    pub gas_used: Option<U256>,
    pub tx: TxRequest,
    pub approval: Option<Approval>,
}

/// How to choose among successful provider answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Wait for every provider, keep the highest output
    #[default]
    BestPrice,
    /// First successful answer wins
    Fastest,
}

/// One upstream aggregator API.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn quote(&self, params: &SwapParams) -> Result<AggregatorQuote>;
}

/// What the primary adapter needs from a routing engine.
#[async_trait]
pub trait QuoteEngine: Send + Sync {
    async fn get_quote(&self, params: &SwapParams) -> Option<AggregatorQuote>;
}

pub struct Aggregator {
    providers: Vec<Arc<dyn QuoteProvider>>,
    deadline: Duration,
    strategy: Strategy,
}

impl Aggregator {
    /// Builds the HTTP providers selected by the settings' API keys.
    pub fn from_settings(settings: &AggregatorSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.deadline_ms))
            .user_agent(format!("{}/{}", settings.app_id, env!("CARGO_PKG_VERSION")))
            .build()?;
        let providers = build_provider_configs(settings)
            .into_iter()
            .map(|config| providers::build(config, http.clone()))
            .collect::<Vec<_>>();
        info!(
            "Aggregator configured with providers: {}",
            providers.iter().map(|p| p.name()).collect::<Vec<_>>().join(", ")
        );
        Ok(Self::new(
            providers,
            Duration::from_millis(settings.deadline_ms),
        ))
    }

    pub fn new(providers: Vec<Arc<dyn QuoteProvider>>, deadline: Duration) -> Self {
        Self {
            providers,
            deadline,
            strategy: Strategy::BestPrice,
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    async fn bounded(&self, provider: Arc<dyn QuoteProvider>, params: &SwapParams) -> Option<AggregatorQuote> {
        let started = Instant::now();
        match tokio::time::timeout(self.deadline, provider.quote(params)).await {
            Ok(Ok(quote)) => {
                debug!(
                    "{} quoted {} in {}ms",
                    provider.name(),
                    quote.output_amount,
                    started.elapsed().as_millis()
                );
                Some(quote)
            }
            Ok(Err(e)) => {
                debug!("{} failed: {:#}", provider.name(), e);
                None
            }
            Err(_) => {
                debug!("{} missed the {}ms deadline", provider.name(), self.deadline.as_millis());
                None
            }
        }
    }
}

#[async_trait]
impl QuoteEngine for Aggregator {
    async fn get_quote(&self, params: &SwapParams) -> Option<AggregatorQuote> {
        let mut pending: FuturesUnordered<_> = self
            .providers
            .iter()
            .map(|provider| self.bounded(Arc::clone(provider), params))
            .collect();

        let mut best: Option<AggregatorQuote> = None;
        while let Some(result) = pending.next().await {
            let Some(quote) = result else { continue };
            if self.strategy == Strategy::Fastest {
                return Some(quote);
            }
            if best
                .as_ref()
                .map_or(true, |current| quote.output_amount > current.output_amount)
            {
                best = Some(quote);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use ethers::types::Bytes;

    struct Fixed {
        name: &'static str,
        output: Option<u64>,
        delay: Duration,
    }

    #[async_trait]
    impl QuoteProvider for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn quote(&self, params: &SwapParams) -> Result<AggregatorQuote> {
            tokio::time::sleep(self.delay).await;
            let output = self.output.ok_or_else(|| anyhow!("no route"))?;
            Ok(AggregatorQuote {
                provider: self.name.to_string(),
                input_amount: params.input_amount,
                output_amount: U256::from(output),
                gas_used: None,
                tx: TxRequest {
                    from: None,
                    to: Address::zero(),
                    data: Bytes::default(),
                    value: U256::zero(),
                },
                approval: None,
            })
        }
    }

    fn provider(name: &'static str, output: Option<u64>, delay_ms: u64) -> Arc<dyn QuoteProvider> {
        Arc::new(Fixed {
            name,
            output,
            delay: Duration::from_millis(delay_ms),
        })
    }

    fn params() -> SwapParams {
        SwapParams {
            chain_id: 8453,
            input_token: Address::repeat_byte(1),
            output_token: Address::repeat_byte(2),
            input_decimals: 6,
            output_decimals: 18,
            input_amount: U256::from(1_000_000u64),
            slippage_bps: 50,
            swapper_account: Address::repeat_byte(3),
        }
    }

    #[tokio::test]
    async fn best_price_keeps_highest_output() {
        let engine = Aggregator::new(
            vec![
                provider("a", Some(100), 0),
                provider("b", Some(300), 20),
                provider("c", Some(200), 5),
                provider("d", None, 0),
            ],
            Duration::from_secs(1),
        );
        let quote = engine.get_quote(&params()).await.unwrap();
        assert_eq!(quote.provider, "b");
        assert_eq!(quote.output_amount, U256::from(300));
    }

    #[tokio::test]
    async fn slow_providers_are_dropped_at_deadline() {
        let engine = Aggregator::new(
            vec![provider("slow", Some(1_000), 2_000), provider("fast", Some(1), 0)],
            Duration::from_millis(50),
        );
        let quote = engine.get_quote(&params()).await.unwrap();
        assert_eq!(quote.provider, "fast");
    }

    #[tokio::test]
    async fn no_successful_provider_yields_none() {
        let engine = Aggregator::new(
            vec![provider("a", None, 0), provider("b", None, 0)],
            Duration::from_secs(1),
        );
        assert!(engine.get_quote(&params()).await.is_none());
        assert!(Aggregator::new(vec![], Duration::from_secs(1))
            .get_quote(&params())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn fastest_strategy_takes_first_success() {
        let engine = Aggregator::new(
            vec![provider("slow", Some(1_000), 200), provider("fast", Some(1), 0)],
            Duration::from_secs(1),
        )
        .with_strategy(Strategy::Fastest);
        assert_eq!(engine.get_quote(&params()).await.unwrap().provider, "fast");
    }

    #[test]
    fn settings_select_provider_set() {
        let mut settings = AggregatorSettings::default();
        let engine = Aggregator::from_settings(&settings).unwrap();
        assert_eq!(engine.provider_names(), vec!["kyberswap", "odos", "lifi", "relay", "velora"]);

        settings.zerox_api_key = Some("key".into());
        let engine = Aggregator::from_settings(&settings).unwrap();
        assert_eq!(engine.provider_names()[0], "0x");
    }
}
