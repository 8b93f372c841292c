//! # Curve secondary source
//!
//! [`SecondaryAdapter`] quotes Ethereum swaps through a [`CurveRouter`]. The
//! router needs a one-time pool load before it can route; the adapter guards
//! that load so concurrent callers share a single in-flight initialisation.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use ethers::types::{Address, U256};
use futures::future::join_all;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

use crate::chains;
use crate::client_cache::ChainClient;
use crate::errors::QuoteError;
use crate::types::{CurveQuote, RouteStep, TxRequest};
use crate::units::{address_to_string, is_valid_address, parse_address};

pub mod onchain;

pub use onchain::OnchainRouter;

/// The only chain the Curve source serves.
pub const CURVE_CHAIN_ID: u64 = chains::ETHEREUM;

pub fn is_curve_supported(chain_id: u64) -> bool {
    chain_id == CURVE_CHAIN_ID
}

/// Factory generations whose pools are loaded at initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PoolCategory {
    StableFactory,
    CrvUsdFactory,
    CryptoFactory,
    TwocryptoFactory,
    TricryptoFactory,
    StableNgFactory,
}

impl PoolCategory {
    pub const ALL: [PoolCategory; 6] = [
        PoolCategory::StableFactory,
        PoolCategory::CrvUsdFactory,
        PoolCategory::CryptoFactory,
        PoolCategory::TwocryptoFactory,
        PoolCategory::TricryptoFactory,
        PoolCategory::StableNgFactory,
    ];

    /// Prefix of the pool ids this category produces.
    pub fn id(&self) -> &'static str {
        match self {
            PoolCategory::StableFactory => "factory-v2",
            PoolCategory::CrvUsdFactory => "factory-crvusd",
            PoolCategory::CryptoFactory => "factory-crypto",
            PoolCategory::TwocryptoFactory => "factory-twocrypto",
            PoolCategory::TricryptoFactory => "factory-tricrypto",
            PoolCategory::StableNgFactory => "factory-stable-ng",
        }
    }
}

impl fmt::Display for PoolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinData {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

/// Best route and its human-readable output amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOutput {
    pub route: Vec<RouteStep>,
    pub output: String,
}

/// Curve routing collaborator. Amounts are human-readable decimal strings.
#[async_trait]
pub trait CurveRouter: Send + Sync {
    async fn connect(&self, rpc_url: &str) -> Result<()>;
    /// Loads one factory category, returning the number of pools now known.
    async fn fetch_pools(&self, category: PoolCategory) -> Result<usize>;
    async fn get_best_route_and_output(&self, from: Address, to: Address, amount: &str) -> Result<RouteOutput>;
    async fn populate_swap(&self, from: Address, to: Address, amount: &str) -> Result<TxRequest>;
    async fn has_allowance(&self, token: Address, amount: &str, owner: Address, spender: Address) -> Result<bool>;
    /// `None` when the token needs no approval (native currency).
    async fn populate_approve(&self, token: Address, amount: &str, owner: Address) -> Result<Option<TxRequest>>;
    async fn get_coins_data(&self, coins: &[Address]) -> Result<Vec<CoinData>>;
}

pub struct SecondaryAdapter {
    router: Arc<dyn CurveRouter>,
    init: OnceCell<()>,
    symbols: DashMap<Address, String>,
}

impl SecondaryAdapter {
    pub fn new(router: Arc<dyn CurveRouter>) -> Self {
        Self {
            router,
            init: OnceCell::new(),
            symbols: DashMap::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.init.initialized()
    }

    /// Connects and loads every pool category exactly once.
    ///
    /// Callers arriving while the load is in flight wait for it instead of
    /// starting another. A failed load leaves the adapter uninitialised and the
    /// next caller retries.
    pub async fn initialize(&self, rpc_url: &str) -> Result<(), QuoteError> {
        self.init
            .get_or_try_init(|| async {
                let started = Instant::now();
                info!("Initializing Curve pools");
                self.router.connect(rpc_url).await?;

                let loads = join_all(PoolCategory::ALL.iter().map(|category| async move {
                    (*category, self.router.fetch_pools(*category).await)
                }))
                .await;
                let mut counts = Vec::with_capacity(loads.len());
                for (category, result) in loads {
                    counts.push(format!("{}={}", category, result?));
                }
                info!(
                    "Curve pools loaded in {}ms: {}",
                    started.elapsed().as_millis(),
                    counts.join(", ")
                );
                Ok::<(), anyhow::Error>(())
            })
            .await
            .map(|_| ())
            .map_err(|e| {
                warn!("Curve initialization failed: {:#}", e);
                QuoteError::from(e)
            })
    }

    /// Cached per address; a failed lookup caches the empty string.
    async fn symbol(&self, token: Address) -> String {
        if let Some(symbol) = self.symbols.get(&token) {
            return symbol.clone();
        }
        let symbol = match self.router.get_coins_data(&[token]).await {
            Ok(data) => data.into_iter().next().map(|c| c.symbol).unwrap_or_default(),
            Err(e) => {
                debug!("Curve coin data failed for {}: {:#}", address_to_string(&token), e);
                String::new()
            }
        };
        self.symbols.insert(token, symbol.clone());
        symbol
    }

    pub async fn quote(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        sender: Option<&str>,
        client: Option<Arc<dyn ChainClient>>,
    ) -> Result<CurveQuote, QuoteError> {
        if !self.is_initialized() {
            return Err(QuoteError::NotInitialized);
        }
        let invalid = |e: anyhow::Error| QuoteError::Validation(e.to_string());
        let from_addr = parse_address(from).map_err(invalid)?;
        let to_addr = parse_address(to).map_err(invalid)?;

        let (best, from_symbol, to_symbol) = tokio::join!(
            self.router.get_best_route_and_output(from_addr, to_addr, amount),
            self.symbol(from_addr),
            self.symbol(to_addr),
        );
        let RouteOutput { route, output } = best?;

        let route_tokens: BTreeSet<Address> = route
            .iter()
            .flat_map(|step| [step.input_coin_address, step.output_coin_address])
            .filter(|addr| !addr.is_zero())
            .collect();
        let route_symbols: BTreeMap<String, String> = join_all(
            route_tokens
                .into_iter()
                .map(|addr| async move { (address_to_string(&addr), self.symbol(addr).await) }),
        )
        .await
        .into_iter()
        .filter(|(_, symbol)| !symbol.is_empty())
        .collect();

        let swap = self.router.populate_swap(from_addr, to_addr, amount).await?;
        if swap.to.is_zero() || swap.data.is_empty() {
            return Err(QuoteError::Internal(
                "Failed to generate Curve swap transaction".to_string(),
            ));
        }

        let mut quote = CurveQuote {
            from: from.to_string(),
            from_symbol,
            to: to.to_string(),
            to_symbol,
            amount: amount.to_string(),
            output_amount: output,
            route,
            route_symbols,
            router_address: swap.to,
            router_calldata: swap.data.clone(),
            gas_used: None,
            approval_target: None,
            approval_calldata: None,
        };

        let Some(sender) = sender.filter(|s| is_valid_address(s)) else {
            return Ok(quote);
        };
        let sender = parse_address(sender).map_err(invalid)?;

        if let Some(client) = client {
            let tx = TxRequest {
                from: Some(sender),
                ..swap.clone()
            };
            match client.estimate_gas(&tx).await {
                Ok(gas) => quote.gas_used = Some(gas),
                Err(e) => debug!("Curve gas estimate skipped: {:#}", e),
            }
        }

        match self.approval_for(from_addr, amount, sender, swap.to).await {
            Ok(Some(approve)) => {
                quote.approval_target = Some(approve.to);
                quote.approval_calldata = Some(approve.data);
            }
            Ok(None) => {}
            Err(e) => debug!("Curve allowance check skipped: {:#}", e),
        }

        Ok(quote)
    }

    async fn approval_for(
        &self,
        token: Address,
        amount: &str,
        owner: Address,
        spender: Address,
    ) -> Result<Option<TxRequest>> {
        if self.router.has_allowance(token, amount, owner, spender).await? {
            return Ok(None);
        }
        Ok(self
            .router
            .populate_approve(token, amount, owner)
            .await?
            .filter(|tx| !tx.to.is_zero() && !tx.data.is_empty()))
    }
}

/// `amount * (10_000 - bps) / 10_000`, the minimum accepted output.
pub fn apply_slippage(amount: U256, slippage_bps: u32) -> U256 {
    let bps = U256::from(slippage_bps.min(10_000));
    amount * (U256::from(10_000) - bps) / U256::from(10_000)
}
