use dashmap::DashMap;
use ethers::types::Address;
use log::{debug, warn};

use crate::client_cache::ClientCache;
use crate::errors::QuoteError;
use crate::units::{address_to_string, parse_address};

/// Write-once ERC-20 metadata per `(chain_id, token)`.
///
/// Parsed addresses compare byte-wise, so the key is case-insensitive without
/// lower-casing strings. Entries are never evicted. Racing first reads may both
/// hit the chain; they write the same value.
#[derive(Default)]
pub struct TokenMetadataCache {
    decimals: DashMap<(u64, Address), u8>,
    symbols: DashMap<(u64, Address), String>,
}

impl TokenMetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Required for unit conversion, so read failures propagate.
    pub async fn get_decimals(
        &self,
        clients: &ClientCache,
        chain_id: u64,
        token: &str,
    ) -> Result<u8, QuoteError> {
        let address = parse_address(token).map_err(|e| QuoteError::Validation(e.to_string()))?;
        if let Some(decimals) = self.decimals.get(&(chain_id, address)) {
            return Ok(*decimals);
        }

        let client = clients.get_client(chain_id)?;
        let decimals = client
            .read_decimals(address)
            .await
            .map_err(|e| QuoteError::TokenRead {
                chain_id,
                token: address_to_string(&address),
                reason: format!("{:#}", e),
            })?;
        debug!("Cached decimals {} for {} on chain {}", decimals, token, chain_id);
        self.decimals.insert((chain_id, address), decimals);
        Ok(decimals)
    }

    /// Cosmetic; a failed read is cached as the empty string.
    pub async fn get_symbol(
        &self,
        clients: &ClientCache,
        chain_id: u64,
        token: &str,
    ) -> Result<String, QuoteError> {
        let address = parse_address(token).map_err(|e| QuoteError::Validation(e.to_string()))?;
        if let Some(symbol) = self.symbols.get(&(chain_id, address)) {
            return Ok(symbol.clone());
        }

        let client = clients.get_client(chain_id)?;
        let symbol = match client.read_symbol(address).await {
            Ok(symbol) => symbol,
            Err(e) => {
                warn!("symbol() failed for {} on chain {}: {:#}", token, chain_id, e);
                String::new()
            }
        };
        self.symbols.insert((chain_id, address), symbol.clone());
        Ok(symbol)
    }

    pub fn cached_entries(&self) -> usize {
        self.decimals.len() + self.symbols.len()
    }
}
