use ethers::types::{Address, Bytes, U256};
use serde::Serialize;
use std::collections::BTreeMap;

use super::u256_dec;

/// An unsigned call the caller may submit; never signed or sent here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// ERC-20 approval the swapper must grant before the router can pull funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Approval {
    pub token: Address,
    pub spender: Address,
}

/// Best quote from the multi-provider aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub chain_id: u64,
    pub from: String,
    pub from_symbol: String,
    pub to: String,
    pub to_symbol: String,
    pub amount: String,
    pub provider: String,
    pub output_amount: String,
    #[serde(with = "u256_dec")]
    pub output_amount_raw: U256,
    #[serde(with = "u256_dec")]
    pub input_amount_raw: U256,
    pub slippage_bps: u32,
    #[serde(with = "u256_dec")]
    pub gas_used: U256,
    pub router_address: Address,
    pub router_calldata: Bytes,
    #[serde(with = "u256_dec::option", skip_serializing_if = "Option::is_none")]
    pub router_value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<Approval>,
}

/// One pool hop of a Curve route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    pub pool_id: String,
    pub pool_address: Address,
    pub input_coin_address: Address,
    pub output_coin_address: Address,
}

/// Quote from the Curve router, with populated swap (and optional approval) calldata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveQuote {
    pub from: String,
    pub from_symbol: String,
    pub to: String,
    pub to_symbol: String,
    pub amount: String,
    pub output_amount: String,
    pub route: Vec<RouteStep>,
    /// Lower-case token address to symbol, for route tokens with a known symbol
    pub route_symbols: BTreeMap<String, String>,
    pub router_address: Address,
    pub router_calldata: Bytes,
    #[serde(with = "u256_dec::option", skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_target: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_calldata: Option<Bytes>,
}
