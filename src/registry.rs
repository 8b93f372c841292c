use std::sync::Arc;

use crate::client_cache::{ChainClient, ClientCache};
use crate::errors::QuoteError;
use crate::settings::Rpc;
use crate::token_metadata::TokenMetadataCache;

/// Owns the process-wide caches. Engines receive it by `Arc` instead of
/// reaching for globals, so every test can build an isolated instance.
pub struct Registry {
    clients: ClientCache,
    tokens: TokenMetadataCache,
}

impl Registry {
    pub fn new(rpc: Rpc) -> Self {
        Self::with_clients(ClientCache::new(rpc))
    }

    pub fn with_clients(clients: ClientCache) -> Self {
        Self {
            clients,
            tokens: TokenMetadataCache::new(),
        }
    }

    pub fn clients(&self) -> &ClientCache {
        &self.clients
    }

    pub fn client(&self, chain_id: u64) -> Result<Arc<dyn ChainClient>, QuoteError> {
        self.clients.get_client(chain_id)
    }

    pub async fn decimals(&self, chain_id: u64, token: &str) -> Result<u8, QuoteError> {
        self.tokens.get_decimals(&self.clients, chain_id, token).await
    }

    pub async fn symbol(&self, chain_id: u64, token: &str) -> Result<String, QuoteError> {
        self.tokens.get_symbol(&self.clients, chain_id, token).await
    }
}
