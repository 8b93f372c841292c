use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::errors::QuoteError;

/// Static description of a supported chain.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub id: u64,
    pub name: &'static str,
    /// Subdomain of the hosted RPC provider, e.g. `eth-mainnet`
    pub rpc_subdomain: &'static str,
    /// Symbol of the gas currency, used when pricing gas costs
    pub native_symbol: &'static str,
}

/// Chain id of Ethereum mainnet, the only chain the Curve router is loaded for.
pub const ETHEREUM: u64 = 1;

pub static SUPPORTED_CHAINS: Lazy<BTreeMap<u64, ChainConfig>> = Lazy::new(|| {
    [
        (ETHEREUM, "Ethereum", "eth-mainnet", "ETH"),
        (8453, "Base", "base-mainnet", "ETH"),
        (42161, "Arbitrum", "arb-mainnet", "ETH"),
        (10, "Optimism", "opt-mainnet", "ETH"),
        (137, "Polygon", "polygon-mainnet", "POL"),
        (56, "BSC", "bnb-mainnet", "BNB"),
        (43114, "Avalanche", "avax-mainnet", "AVAX"),
    ]
    .into_iter()
    .map(|(id, name, rpc_subdomain, native_symbol)| {
        (
            id,
            ChainConfig {
                id,
                name,
                rpc_subdomain,
                native_symbol,
            },
        )
    })
    .collect()
});

pub fn get_chain(chain_id: u64) -> Option<&'static ChainConfig> {
    SUPPORTED_CHAINS.get(&chain_id)
}

pub fn is_supported(chain_id: u64) -> bool {
    SUPPORTED_CHAINS.contains_key(&chain_id)
}

/// Comma separated list of supported ids, used in error messages.
pub fn supported_ids() -> String {
    SUPPORTED_CHAINS
        .keys()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Looks up a chain or fails with [`QuoteError::UnsupportedChain`].
pub fn require_chain(chain_id: u64) -> Result<&'static ChainConfig, QuoteError> {
    get_chain(chain_id).ok_or_else(|| QuoteError::UnsupportedChain {
        chain_id,
        supported: supported_ids(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_seven_chains() {
        let ids: Vec<u64> = SUPPORTED_CHAINS.keys().copied().collect();
        assert_eq!(ids.len(), 7);
        for id in [1, 8453, 42161, 10, 137, 56, 43114] {
            assert!(is_supported(id), "chain {id} should be supported");
        }
    }

    #[test]
    fn every_chain_has_name_and_subdomain() {
        for chain in SUPPORTED_CHAINS.values() {
            assert!(!chain.name.is_empty());
            assert!(!chain.rpc_subdomain.is_empty());
            assert!(!chain.native_symbol.is_empty());
        }
    }

    #[test]
    fn unsupported_chain_lists_supported_ids() {
        let err = require_chain(999).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("999"));
        assert!(msg.contains("8453"));
        assert!(msg.contains("43114"));
    }
}
