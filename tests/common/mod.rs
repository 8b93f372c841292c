//! Offline collaborators shared by the integration tests.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use quote_arbiter::aggregator::{AggregatorQuote, QuoteEngine, SwapParams};
use quote_arbiter::client_cache::{ChainClient, ClientCache, Connector};
use quote_arbiter::comparison::ComparisonEngine;
use quote_arbiter::curve::{CoinData, CurveRouter, PoolCategory, RouteOutput, SecondaryAdapter};
use quote_arbiter::primary::PrimaryAdapter;
use quote_arbiter::registry::Registry;
use quote_arbiter::reporter::ErrorReporter;
use quote_arbiter::errors::QuoteError;
use quote_arbiter::server::AppState;
use quote_arbiter::settings::Rpc;
use quote_arbiter::types::{RouteStep, TxRequest};
use quote_arbiter::units::parse_address;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const USDC: &str = "0xA0b86991c6218b36c1d19D4a2E9Eb0cE3606eB48";
pub const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const FALLBACK: &str = "0xEe7aE85f2Fe2239E27D9c1E23fFFe168D63b4055";
pub const ROUTER: &str = "0x16C6521Dff6baB339122a0FE25a9116693265353";
pub const POOL: &str = "0x4DEcE678ceceb27446b35C672dC7d61F30bAD69E";

pub fn addr(s: &str) -> Address {
    parse_address(s).unwrap()
}

/// USDC has 6 decimals, everything else 18. Gas price is 25 gwei.
pub struct FakeChain;

#[async_trait]
impl ChainClient for FakeChain {
    async fn read_decimals(&self, token: Address) -> Result<u8> {
        Ok(if token == addr(USDC) { 6 } else { 18 })
    }

    async fn read_symbol(&self, token: Address) -> Result<String> {
        Ok(if token == addr(USDC) { "USDC" } else { "WETH" }.to_string())
    }

    async fn estimate_gas(&self, _tx: &TxRequest) -> Result<U256> {
        Ok(U256::from(180_000u64))
    }

    async fn gas_price(&self) -> Result<U256> {
        Ok(U256::from(25_000_000_000u64))
    }
}

pub fn fake_registry() -> Arc<Registry> {
    let connector: Connector = Arc::new(|_, _| {
        let client: Arc<dyn ChainClient> = Arc::new(FakeChain);
        Ok(client)
    });
    Arc::new(Registry::with_clients(ClientCache::with_connector(
        Rpc::default(),
        connector,
    )))
}

/// Answers every request with a fixed raw output, or nothing.
pub struct FixedEngine {
    pub output: Option<U256>,
    pub calls: AtomicUsize,
}

impl FixedEngine {
    pub fn new(output: Option<U256>) -> Self {
        Self {
            output,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl QuoteEngine for FixedEngine {
    async fn get_quote(&self, params: &SwapParams) -> Option<AggregatorQuote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = self.output?;
        Some(AggregatorQuote {
            provider: "odos".to_string(),
            input_amount: params.input_amount,
            output_amount: output,
            gas_used: Some(U256::from(150_000u64)),
            tx: TxRequest {
                from: Some(params.swapper_account),
                to: addr(ROUTER),
                data: Bytes::from(vec![0x83, 0xbd, 0x37, 0xf9]),
                value: U256::zero(),
            },
            approval: None,
        })
    }
}

/// Single-hop Curve router returning a fixed human-readable output.
pub struct FixedCurve {
    pub output: String,
    pub routes: AtomicUsize,
}

impl FixedCurve {
    pub fn new(output: &str) -> Self {
        Self {
            output: output.to_string(),
            routes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CurveRouter for FixedCurve {
    async fn connect(&self, _rpc_url: &str) -> Result<()> {
        Ok(())
    }

    async fn fetch_pools(&self, _category: PoolCategory) -> Result<usize> {
        Ok(3)
    }

    async fn get_best_route_and_output(&self, from: Address, to: Address, _amount: &str) -> Result<RouteOutput> {
        self.routes.fetch_add(1, Ordering::SeqCst);
        Ok(RouteOutput {
            route: vec![RouteStep {
                pool_id: "factory-tricrypto-4".to_string(),
                pool_address: addr(POOL),
                input_coin_address: from,
                output_coin_address: to,
            }],
            output: self.output.clone(),
        })
    }

    async fn populate_swap(&self, _from: Address, _to: Address, _amount: &str) -> Result<TxRequest> {
        Ok(TxRequest {
            from: None,
            to: addr(ROUTER),
            data: Bytes::from(vec![0x37, 0x1d, 0xc4, 0x47]),
            value: U256::zero(),
        })
    }

    async fn has_allowance(&self, _token: Address, _amount: &str, _owner: Address, _spender: Address) -> Result<bool> {
        Ok(true)
    }

    async fn populate_approve(&self, _token: Address, _amount: &str, _owner: Address) -> Result<Option<TxRequest>> {
        Ok(None)
    }

    async fn get_coins_data(&self, coins: &[Address]) -> Result<Vec<CoinData>> {
        coins
            .iter()
            .map(|coin| {
                let symbol = if *coin == addr(USDC) {
                    "USDC"
                } else if *coin == addr(WETH) {
                    "WETH"
                } else {
                    return Err(anyhow!("unknown coin"));
                };
                Ok(CoinData {
                    address: *coin,
                    symbol: symbol.to_string(),
                    decimals: if *coin == addr(USDC) { 6 } else { 18 },
                })
            })
            .collect()
    }
}

pub async fn ready_curve(output: &str) -> Arc<SecondaryAdapter> {
    ready_curve_over(Arc::new(FixedCurve::new(output))).await
}

pub async fn ready_curve_over(router: Arc<FixedCurve>) -> Arc<SecondaryAdapter> {
    let adapter = Arc::new(SecondaryAdapter::new(router));
    adapter.initialize("http://localhost:8545").await.unwrap();
    adapter
}

/// Remembers every context it is handed.
#[derive(Default)]
pub struct RecordingReporter {
    pub reports: Mutex<Vec<String>>,
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, context: &str, error: &QuoteError) {
        self.reports
            .lock()
            .unwrap()
            .push(format!("{}: {}", context, error));
    }
}

pub fn comparison(
    engine: Arc<dyn QuoteEngine>,
    secondary: Option<Arc<SecondaryAdapter>>,
) -> (Arc<PrimaryAdapter>, ComparisonEngine) {
    let registry = fake_registry();
    let primary = Arc::new(PrimaryAdapter::new(registry.clone(), engine, addr(FALLBACK)));
    let engine = ComparisonEngine::new(registry, primary.clone(), secondary);
    (primary, engine)
}

pub fn app_state(
    engine: Arc<dyn QuoteEngine>,
    secondary: Option<Arc<SecondaryAdapter>>,
    reporter: Arc<dyn ErrorReporter>,
    compare_enabled: bool,
) -> AppState {
    let (primary, comparison) = comparison(engine, secondary.clone());
    AppState {
        primary,
        comparison: Arc::new(comparison),
        secondary,
        reporter,
        compare_enabled,
    }
}
