use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use ethers::prelude::{Http, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, TransactionRequest, U256};
use log::{debug, info};
use std::sync::Arc;

use crate::chains;
use crate::contracts::Erc20;
use crate::errors::QuoteError;
use crate::settings::Rpc;
use crate::types::TxRequest;
use crate::units::redact_url;

/// Read-only chain access the quoting core depends on.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// ERC-20 `decimals()`
    async fn read_decimals(&self, token: Address) -> Result<u8>;
    /// ERC-20 `symbol()`
    async fn read_symbol(&self, token: Address) -> Result<String>;
    async fn estimate_gas(&self, tx: &TxRequest) -> Result<U256>;
    async fn gas_price(&self) -> Result<U256>;
}

/// [`ChainClient`] over an ethers HTTP provider.
pub struct RpcClient {
    provider: Arc<Provider<Http>>,
}

impl RpcClient {
    pub fn connect(url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(url)
            .map_err(|e| anyhow!("Invalid RPC URL {}: {}", redact_url(url), e))?;
        Ok(Self {
            provider: Arc::new(provider),
        })
    }

    pub fn provider(&self) -> Arc<Provider<Http>> {
        Arc::clone(&self.provider)
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn read_decimals(&self, token: Address) -> Result<u8> {
        let erc20 = Erc20::new(token, Arc::clone(&self.provider));
        Ok(erc20.decimals().call().await?)
    }

    async fn read_symbol(&self, token: Address) -> Result<String> {
        let erc20 = Erc20::new(token, Arc::clone(&self.provider));
        Ok(erc20.symbol().call().await?)
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<U256> {
        let mut request = TransactionRequest::new()
            .to(tx.to)
            .data(tx.data.clone())
            .value(tx.value);
        if let Some(from) = tx.from {
            request = request.from(from);
        }
        let typed: TypedTransaction = request.into();
        Ok(self.provider.estimate_gas(&typed, None).await?)
    }

    async fn gas_price(&self) -> Result<U256> {
        Ok(self.provider.get_gas_price().await?)
    }
}

/// Builds a client for `(chain_id, rpc_url)`. Swappable for tests.
pub type Connector = Arc<dyn Fn(u64, &str) -> Result<Arc<dyn ChainClient>> + Send + Sync>;

fn http_connector() -> Connector {
    Arc::new(|_chain_id, url| {
        let client: Arc<dyn ChainClient> = Arc::new(RpcClient::connect(url)?);
        Ok(client)
    })
}

/// One lazily created client per chain, kept for the life of the process.
///
/// Entries never expire and are never health-checked; a dead endpoint makes
/// downstream calls fail, not the cache.
pub struct ClientCache {
    rpc: Rpc,
    clients: DashMap<u64, Arc<dyn ChainClient>>,
    connector: Connector,
}

impl ClientCache {
    pub fn new(rpc: Rpc) -> Self {
        Self::with_connector(rpc, http_connector())
    }

    pub fn with_connector(rpc: Rpc, connector: Connector) -> Self {
        Self {
            rpc,
            clients: DashMap::new(),
            connector,
        }
    }

    /// Per-chain override first, then the templated provider URL.
    pub fn rpc_url(&self, chain_id: u64) -> Result<String, QuoteError> {
        chains::require_chain(chain_id)?;
        self.rpc
            .url_for(chain_id)
            .ok_or_else(|| QuoteError::Internal(format!("No RPC URL for chain {}", chain_id)))
    }

    pub fn get_client(&self, chain_id: u64) -> Result<Arc<dyn ChainClient>, QuoteError> {
        if let Some(client) = self.clients.get(&chain_id) {
            return Ok(Arc::clone(client.value()));
        }

        let url = self.rpc_url(chain_id)?;
        // The entry lock makes racing first calls agree on a single client
        let entry = self
            .clients
            .entry(chain_id)
            .or_try_insert_with(|| {
                info!("Creating RPC client for chain {} at {}", chain_id, redact_url(&url));
                (self.connector)(chain_id, &url)
            })
            .map_err(QuoteError::from)?;
        debug!("RPC client cache now holds {} chains", self.clients.len());
        Ok(Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
