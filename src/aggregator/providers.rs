//! HTTP clients for the individual aggregator APIs.
//!
//! Each provider turns the typed API reply into an [`AggregatorQuote`] in a
//! separate pure function so the mapping can be tested without a network.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

use super::{AggregatorQuote, ProviderConfig, QuoteProvider, SwapParams};
use crate::types::{Approval, TxRequest};
use crate::units::{address_to_string, is_native};

const ZEROX_API: &str = "https://api.0x.org";
const KYBERSWAP_API: &str = "https://aggregator-api.kyberswap.com";
const ODOS_API: &str = "https://api.odos.xyz";
const LIFI_API: &str = "https://li.quest";
const RELAY_API: &str = "https://api.relay.link";
const VELORA_API: &str = "https://api.paraswap.io";

pub fn build(config: ProviderConfig, http: Client) -> Arc<dyn QuoteProvider> {
    match config {
        ProviderConfig::ZeroX { api_key } => Arc::new(ZeroX { http, api_key }),
        ProviderConfig::KyberSwap { client_id } => Arc::new(KyberSwap { http, client_id }),
        ProviderConfig::Odos { api_key } => Arc::new(Odos { http, api_key }),
        ProviderConfig::LiFi { integrator, api_key } => Arc::new(LiFi {
            http,
            integrator,
            api_key,
        }),
        ProviderConfig::Relay { referrer } => Arc::new(Relay { http, referrer }),
        ProviderConfig::Velora { partner } => Arc::new(Velora { http, partner }),
    }
}

/// Accepts both decimal and `0x`-prefixed hex quantities.
fn parse_u256(value: &str) -> Result<U256> {
    match value.strip_prefix("0x") {
        Some(hex) if hex.is_empty() => Ok(U256::zero()),
        Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| anyhow!("bad hex quantity {}: {}", value, e)),
        None => U256::from_dec_str(value).map_err(|e| anyhow!("bad quantity {}: {}", value, e)),
    }
}

fn parse_opt_u256(value: Option<&str>) -> Result<Option<U256>> {
    value.filter(|v| !v.is_empty()).map(parse_u256).transpose()
}

fn parse_addr(value: &str) -> Result<Address> {
    Address::from_str(value).map_err(|e| anyhow!("bad address {}: {}", value, e))
}

fn parse_bytes(value: &str) -> Result<Bytes> {
    Bytes::from_str(value).map_err(|e| anyhow!("bad calldata: {}", e))
}

/// Native input needs no ERC-20 allowance.
fn approval_for(params: &SwapParams, spender: Address) -> Option<Approval> {
    if is_native(&params.input_token) || spender == Address::zero() {
        None
    } else {
        Some(Approval {
            token: params.input_token,
            spender,
        })
    }
}

async fn read_json<T: DeserializeOwned>(provider: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .with_context(|| format!("{} response body", provider))?;
    if !status.is_success() {
        bail!("{} API error {}: {}", provider, status, text);
    }
    serde_json::from_str(&text).with_context(|| format!("{} JSON: {}", provider, text))
}

// ---------------------------------------------------------------- 0x

struct ZeroX {
    http: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZeroXQuote {
    #[serde(default)]
    liquidity_available: Option<bool>,
    buy_amount: String,
    sell_amount: String,
    transaction: ZeroXTransaction,
    #[serde(default)]
    issues: Option<ZeroXIssues>,
}

#[derive(Debug, Deserialize)]
struct ZeroXTransaction {
    to: String,
    data: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    gas: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZeroXIssues {
    #[serde(default)]
    allowance: Option<ZeroXAllowance>,
}

#[derive(Debug, Deserialize)]
struct ZeroXAllowance {
    spender: String,
}

fn zerox_to_quote(reply: ZeroXQuote, params: &SwapParams) -> Result<AggregatorQuote> {
    if reply.liquidity_available == Some(false) {
        bail!("0x reports no liquidity");
    }
    let spender = reply
        .issues
        .and_then(|i| i.allowance)
        .map(|a| parse_addr(&a.spender))
        .transpose()?;
    Ok(AggregatorQuote {
        provider: "0x".to_string(),
        input_amount: parse_u256(&reply.sell_amount)?,
        output_amount: parse_u256(&reply.buy_amount)?,
        gas_used: parse_opt_u256(reply.transaction.gas.as_deref())?,
        tx: TxRequest {
            from: Some(params.swapper_account),
            to: parse_addr(&reply.transaction.to)?,
            data: parse_bytes(&reply.transaction.data)?,
            value: parse_opt_u256(reply.transaction.value.as_deref())?.unwrap_or_default(),
        },
        approval: spender.and_then(|s| approval_for(params, s)),
    })
}

#[async_trait]
impl QuoteProvider for ZeroX {
    fn name(&self) -> &'static str {
        "0x"
    }

    async fn quote(&self, params: &SwapParams) -> Result<AggregatorQuote> {
        let response = self
            .http
            .get(format!("{}/swap/allowance-holder/quote", ZEROX_API))
            .header("0x-api-key", &self.api_key)
            .header("0x-version", "v2")
            .query(&[
                ("chainId", params.chain_id.to_string()),
                ("sellToken", address_to_string(&params.input_token)),
                ("buyToken", address_to_string(&params.output_token)),
                ("sellAmount", params.input_amount.to_string()),
                ("taker", address_to_string(&params.swapper_account)),
                ("slippageBps", params.slippage_bps.to_string()),
            ])
            .send()
            .await?;
        zerox_to_quote(read_json("0x", response).await?, params)
    }
}

// ---------------------------------------------------------------- KyberSwap

struct KyberSwap {
    http: Client,
    client_id: String,
}

fn kyber_chain(chain_id: u64) -> Option<&'static str> {
    Some(match chain_id {
        1 => "ethereum",
        10 => "optimism",
        56 => "bsc",
        137 => "polygon",
        8453 => "base",
        42161 => "arbitrum",
        43114 => "avalanche",
        _ => return None,
    })
}

#[derive(Debug, Deserialize)]
struct KyberEnvelope<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl<T> KyberEnvelope<T> {
    fn into_data(self) -> Result<T> {
        match (self.code, self.data) {
            (0, Some(data)) => Ok(data),
            (code, _) => bail!(
                "KyberSwap error {}: {}",
                code,
                self.message.unwrap_or_default()
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KyberRoutes {
    route_summary: serde_json::Value,
    router_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KyberBuild {
    amount_in: String,
    amount_out: String,
    #[serde(default)]
    gas: Option<String>,
    data: String,
    router_address: String,
    #[serde(default)]
    transaction_value: Option<String>,
}

fn kyber_to_quote(build: KyberBuild, params: &SwapParams) -> Result<AggregatorQuote> {
    let router = parse_addr(&build.router_address)?;
    Ok(AggregatorQuote {
        provider: "kyberswap".to_string(),
        input_amount: parse_u256(&build.amount_in)?,
        output_amount: parse_u256(&build.amount_out)?,
        gas_used: parse_opt_u256(build.gas.as_deref())?,
        tx: TxRequest {
            from: Some(params.swapper_account),
            to: router,
            data: parse_bytes(&build.data)?,
            value: parse_opt_u256(build.transaction_value.as_deref())?.unwrap_or_default(),
        },
        approval: approval_for(params, router),
    })
}

#[async_trait]
impl QuoteProvider for KyberSwap {
    fn name(&self) -> &'static str {
        "kyberswap"
    }

    async fn quote(&self, params: &SwapParams) -> Result<AggregatorQuote> {
        let chain = kyber_chain(params.chain_id)
            .ok_or_else(|| anyhow!("KyberSwap does not serve chain {}", params.chain_id))?;
        let base = format!("{}/{}/api/v1", KYBERSWAP_API, chain);

        let response = self
            .http
            .get(format!("{}/routes", base))
            .header("x-client-id", &self.client_id)
            .query(&[
                ("tokenIn", address_to_string(&params.input_token)),
                ("tokenOut", address_to_string(&params.output_token)),
                ("amountIn", params.input_amount.to_string()),
            ])
            .send()
            .await?;
        let routes: KyberRoutes = read_json::<KyberEnvelope<KyberRoutes>>("KyberSwap", response)
            .await?
            .into_data()?;
        let account = address_to_string(&params.swapper_account);

        let response = self
            .http
            .post(format!("{}/route/build", base))
            .header("x-client-id", &self.client_id)
            .json(&json!({
                "routeSummary": routes.route_summary,
                "sender": account,
                "recipient": account,
                "slippageTolerance": params.slippage_bps,
                "source": self.client_id,
            }))
            .send()
            .await?;
        let build: KyberBuild = read_json::<KyberEnvelope<KyberBuild>>("KyberSwap", response)
            .await?
            .into_data()?;
        if build.router_address.is_empty() {
            return kyber_to_quote(
                KyberBuild {
                    router_address: routes.router_address,
                    ..build
                },
                params,
            );
        }
        kyber_to_quote(build, params)
    }
}

// ---------------------------------------------------------------- Odos

struct Odos {
    http: Client,
    api_key: Option<String>,
}

/// Odos names the native currency with the zero address.
fn odos_token(token: &Address) -> String {
    if is_native(token) {
        address_to_string(&Address::zero())
    } else {
        address_to_string(token)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OdosQuote {
    path_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OdosAssembled {
    transaction: OdosTransaction,
    input_tokens: Vec<OdosTokenAmount>,
    output_tokens: Vec<OdosTokenAmount>,
    #[serde(default)]
    gas_estimate: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OdosTransaction {
    to: String,
    data: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OdosTokenAmount {
    amount: String,
}

fn odos_to_quote(reply: OdosAssembled, params: &SwapParams) -> Result<AggregatorQuote> {
    let router = parse_addr(&reply.transaction.to)?;
    let output = reply
        .output_tokens
        .first()
        .ok_or_else(|| anyhow!("Odos returned no output token"))?;
    let input_amount = match reply.input_tokens.first() {
        Some(input) => parse_u256(&input.amount)?,
        None => params.input_amount,
    };
    Ok(AggregatorQuote {
        provider: "odos".to_string(),
        input_amount,
        output_amount: parse_u256(&output.amount)?,
        gas_used: reply
            .gas_estimate
            .filter(|g| g.is_finite() && *g > 0.0)
            .map(|g| U256::from(g as u64)),
        tx: TxRequest {
            from: Some(params.swapper_account),
            to: router,
            data: parse_bytes(&reply.transaction.data)?,
            value: parse_opt_u256(reply.transaction.value.as_deref())?.unwrap_or_default(),
        },
        approval: approval_for(params, router),
    })
}

impl Odos {
    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.http.post(format!("{}{}", ODOS_API, path));
        match &self.api_key {
            Some(key) => request.header("x-api-key", key),
            None => request,
        }
    }
}

#[async_trait]
impl QuoteProvider for Odos {
    fn name(&self) -> &'static str {
        "odos"
    }

    async fn quote(&self, params: &SwapParams) -> Result<AggregatorQuote> {
        let account = address_to_string(&params.swapper_account);
        let response = self
            .post("/sor/quote/v2")
            .json(&json!({
                "chainId": params.chain_id,
                "inputTokens": [{
                    "tokenAddress": odos_token(&params.input_token),
                    "amount": params.input_amount.to_string(),
                }],
                "outputTokens": [{
                    "tokenAddress": odos_token(&params.output_token),
                    "proportion": 1,
                }],
                "userAddr": account,
                "slippageLimitPercent": params.slippage_bps as f64 / 100.0,
                "compact": true,
            }))
            .send()
            .await?;
        let quote: OdosQuote = read_json("Odos", response).await?;

        let response = self
            .post("/sor/assemble")
            .json(&json!({
                "userAddr": account,
                "pathId": quote.path_id,
                "simulate": false,
            }))
            .send()
            .await?;
        odos_to_quote(read_json("Odos", response).await?, params)
    }
}

// ---------------------------------------------------------------- LI.FI

struct LiFi {
    http: Client,
    integrator: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiFiQuote {
    tool: String,
    estimate: LiFiEstimate,
    transaction_request: LiFiTransaction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiFiEstimate {
    from_amount: String,
    to_amount: String,
    #[serde(default)]
    approval_address: Option<String>,
    #[serde(default)]
    gas_costs: Vec<LiFiGasCost>,
}

#[derive(Debug, Deserialize)]
struct LiFiGasCost {
    estimate: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiFiTransaction {
    to: String,
    data: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    gas_limit: Option<String>,
}

fn lifi_to_quote(reply: LiFiQuote, params: &SwapParams) -> Result<AggregatorQuote> {
    let mut gas = U256::zero();
    for cost in &reply.estimate.gas_costs {
        gas = gas.saturating_add(parse_u256(&cost.estimate)?);
    }
    let gas_used = if gas.is_zero() {
        parse_opt_u256(reply.transaction_request.gas_limit.as_deref())?
    } else {
        Some(gas)
    };
    let router = parse_addr(&reply.transaction_request.to)?;
    let spender = match reply.estimate.approval_address.as_deref() {
        Some(addr) => parse_addr(addr)?,
        None => router,
    };
    Ok(AggregatorQuote {
        provider: format!("lifi:{}", reply.tool),
        input_amount: parse_u256(&reply.estimate.from_amount)?,
        output_amount: parse_u256(&reply.estimate.to_amount)?,
        gas_used,
        tx: TxRequest {
            from: Some(params.swapper_account),
            to: router,
            data: parse_bytes(&reply.transaction_request.data)?,
            value: parse_opt_u256(reply.transaction_request.value.as_deref())?.unwrap_or_default(),
        },
        approval: approval_for(params, spender),
    })
}

#[async_trait]
impl QuoteProvider for LiFi {
    fn name(&self) -> &'static str {
        "lifi"
    }

    async fn quote(&self, params: &SwapParams) -> Result<AggregatorQuote> {
        let mut request = self.http.get(format!("{}/v1/quote", LIFI_API)).query(&[
            ("fromChain", params.chain_id.to_string()),
            ("toChain", params.chain_id.to_string()),
            ("fromToken", address_to_string(&params.input_token)),
            ("toToken", address_to_string(&params.output_token)),
            ("fromAmount", params.input_amount.to_string()),
            ("fromAddress", address_to_string(&params.swapper_account)),
            ("slippage", (params.slippage_bps as f64 / 10_000.0).to_string()),
            ("integrator", self.integrator.clone()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("x-lifi-api-key", key);
        }
        lifi_to_quote(read_json("LI.FI", request.send().await?).await?, params)
    }
}

// ---------------------------------------------------------------- Relay

struct Relay {
    http: Client,
    referrer: String,
}

/// ERC-20 `approve(address,uint256)`
const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// Relay names the native currency with the zero address.
fn relay_currency(token: &Address) -> String {
    if is_native(token) {
        address_to_string(&Address::zero())
    } else {
        address_to_string(token)
    }
}

#[derive(Debug, Deserialize)]
struct RelayQuote {
    steps: Vec<RelayStep>,
    details: RelayDetails,
}

#[derive(Debug, Deserialize)]
struct RelayStep {
    id: String,
    #[serde(default)]
    items: Vec<RelayItem>,
}

#[derive(Debug, Deserialize)]
struct RelayItem {
    data: RelayTransaction,
}

#[derive(Debug, Deserialize)]
struct RelayTransaction {
    to: String,
    data: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    gas: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayDetails {
    currency_in: RelayAmount,
    currency_out: RelayAmount,
}

#[derive(Debug, Deserialize)]
struct RelayAmount {
    amount: String,
}

/// Spender argument of an `approve` call.
fn approve_spender(calldata: &Bytes) -> Result<Address> {
    if calldata.len() < 68 || calldata[..4] != APPROVE_SELECTOR {
        bail!("Relay approve step is not an approve call");
    }
    Ok(Address::from_slice(&calldata[16..36]))
}

fn relay_to_quote(reply: RelayQuote, params: &SwapParams) -> Result<AggregatorQuote> {
    let first_tx = |id: &str| {
        reply
            .steps
            .iter()
            .find(|step| step.id == id)
            .and_then(|step| step.items.first())
            .map(|item| &item.data)
    };
    let swap = first_tx("swap")
        .or_else(|| first_tx("deposit"))
        .ok_or_else(|| anyhow!("Relay returned no swap transaction"))?;
    let router = parse_addr(&swap.to)?;
    let spender = match first_tx("approve") {
        Some(approve) => approve_spender(&parse_bytes(&approve.data)?)?,
        None => router,
    };
    Ok(AggregatorQuote {
        provider: "relay".to_string(),
        input_amount: parse_u256(&reply.details.currency_in.amount)?,
        output_amount: parse_u256(&reply.details.currency_out.amount)?,
        gas_used: parse_opt_u256(swap.gas.as_deref())?,
        tx: TxRequest {
            from: Some(params.swapper_account),
            to: router,
            data: parse_bytes(&swap.data)?,
            value: parse_opt_u256(swap.value.as_deref())?.unwrap_or_default(),
        },
        approval: approval_for(params, spender),
    })
}

#[async_trait]
impl QuoteProvider for Relay {
    fn name(&self) -> &'static str {
        "relay"
    }

    async fn quote(&self, params: &SwapParams) -> Result<AggregatorQuote> {
        let account = address_to_string(&params.swapper_account);
        let response = self
            .http
            .post(format!("{}/quote", RELAY_API))
            .json(&json!({
                "user": account,
                "recipient": account,
                "originChainId": params.chain_id,
                "destinationChainId": params.chain_id,
                "originCurrency": relay_currency(&params.input_token),
                "destinationCurrency": relay_currency(&params.output_token),
                "amount": params.input_amount.to_string(),
                "tradeType": "EXACT_INPUT",
                "slippageTolerance": params.slippage_bps.to_string(),
                "referrer": self.referrer,
            }))
            .send()
            .await?;
        relay_to_quote(read_json("Relay", response).await?, params)
    }
}

// ---------------------------------------------------------------- Velora

struct Velora {
    http: Client,
    partner: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeloraSwap {
    price_route: VeloraPriceRoute,
    tx_params: VeloraTxParams,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeloraPriceRoute {
    src_amount: String,
    dest_amount: String,
    #[serde(default)]
    gas_cost: Option<String>,
    #[serde(default)]
    token_transfer_proxy: Option<String>,
    #[serde(default)]
    contract_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VeloraTxParams {
    to: String,
    data: String,
    #[serde(default)]
    value: Option<String>,
}

fn velora_to_quote(reply: VeloraSwap, params: &SwapParams) -> Result<AggregatorQuote> {
    let router = parse_addr(&reply.tx_params.to)?;
    let spender = match reply
        .price_route
        .token_transfer_proxy
        .as_deref()
        .or(reply.price_route.contract_address.as_deref())
    {
        Some(addr) => parse_addr(addr)?,
        None => router,
    };
    Ok(AggregatorQuote {
        provider: "velora".to_string(),
        input_amount: parse_u256(&reply.price_route.src_amount)?,
        output_amount: parse_u256(&reply.price_route.dest_amount)?,
        gas_used: parse_opt_u256(reply.price_route.gas_cost.as_deref())?,
        tx: TxRequest {
            from: Some(params.swapper_account),
            to: router,
            data: parse_bytes(&reply.tx_params.data)?,
            value: parse_opt_u256(reply.tx_params.value.as_deref())?.unwrap_or_default(),
        },
        approval: approval_for(params, spender),
    })
}

#[async_trait]
impl QuoteProvider for Velora {
    fn name(&self) -> &'static str {
        "velora"
    }

    async fn quote(&self, params: &SwapParams) -> Result<AggregatorQuote> {
        let response = self
            .http
            .get(format!("{}/swap", VELORA_API))
            .query(&[
                ("srcToken", address_to_string(&params.input_token)),
                ("destToken", address_to_string(&params.output_token)),
                ("srcDecimals", params.input_decimals.to_string()),
                ("destDecimals", params.output_decimals.to_string()),
                ("amount", params.input_amount.to_string()),
                ("side", "SELL".to_string()),
                ("network", params.chain_id.to_string()),
                ("userAddress", address_to_string(&params.swapper_account)),
                ("slippage", params.slippage_bps.to_string()),
                ("partner", self.partner.clone()),
            ])
            .send()
            .await?;
        velora_to_quote(read_json("Velora", response).await?, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::NATIVE_TOKEN;

    const ROUTER: &str = "0x6131b5fae19ea4f9d964eac0408e4408b66337b5";

    fn params() -> SwapParams {
        SwapParams {
            chain_id: 8453,
            input_token: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".parse().unwrap(),
            output_token: "0x4200000000000000000000000000000000000006".parse().unwrap(),
            input_decimals: 6,
            output_decimals: 18,
            input_amount: U256::from(1_000_000_000u64),
            slippage_bps: 100,
            swapper_account: "0xEe7aE85f2Fe2239E27D9c1E23fFFe168D63b4055".parse().unwrap(),
        }
    }

    #[test]
    fn quantities_accept_hex_and_decimal() {
        assert_eq!(parse_u256("0x10").unwrap(), U256::from(16));
        assert_eq!(parse_u256("16").unwrap(), U256::from(16));
        assert_eq!(parse_u256("0x").unwrap(), U256::zero());
        assert!(parse_u256("1.5").is_err());
        assert_eq!(parse_opt_u256(Some("")).unwrap(), None);
    }

    #[test]
    fn zerox_reply_maps_allowance_issue() {
        let reply: ZeroXQuote = serde_json::from_value(json!({
            "liquidityAvailable": true,
            "buyAmount": "400000000000000000",
            "sellAmount": "1000000000",
            "transaction": { "to": ROUTER, "data": "0xdeadbeef", "value": "0", "gas": "180000" },
            "issues": { "allowance": { "spender": ROUTER, "actual": "0" } }
        }))
        .unwrap();
        let quote = zerox_to_quote(reply, &params()).unwrap();
        assert_eq!(quote.output_amount, U256::exp10(17) * 4);
        assert_eq!(quote.gas_used, Some(U256::from(180_000)));
        assert_eq!(quote.approval.unwrap().spender, ROUTER.parse::<Address>().unwrap());
    }

    #[test]
    fn zerox_without_liquidity_fails() {
        let reply: ZeroXQuote = serde_json::from_value(json!({
            "liquidityAvailable": false,
            "buyAmount": "0",
            "sellAmount": "0",
            "transaction": { "to": ROUTER, "data": "0x" }
        }))
        .unwrap();
        assert!(zerox_to_quote(reply, &params()).is_err());
    }

    #[test]
    fn kyber_envelope_surfaces_error_code() {
        let envelope: KyberEnvelope<KyberBuild> =
            serde_json::from_value(json!({ "code": 4008, "message": "route not found" })).unwrap();
        let err = envelope.into_data().unwrap_err().to_string();
        assert!(err.contains("4008"));
        assert!(err.contains("route not found"));
        assert_eq!(kyber_chain(8453), Some("base"));
        assert_eq!(kyber_chain(5), None);
    }

    #[test]
    fn kyber_build_maps_router_as_spender() {
        let build: KyberBuild = serde_json::from_value(json!({
            "amountIn": "1000000000",
            "amountOut": "410000000000000000",
            "gas": "250000",
            "data": "0x1234",
            "routerAddress": ROUTER,
            "transactionValue": "0"
        }))
        .unwrap();
        let quote = kyber_to_quote(build, &params()).unwrap();
        assert_eq!(quote.provider, "kyberswap");
        assert_eq!(quote.tx.to, ROUTER.parse::<Address>().unwrap());
        assert_eq!(quote.approval.unwrap().token, params().input_token);
    }

    #[test]
    fn native_input_needs_no_approval() {
        let mut p = params();
        p.input_token = NATIVE_TOKEN.parse().unwrap();
        let reply: OdosAssembled = serde_json::from_value(json!({
            "transaction": { "to": ROUTER, "data": "0xab", "value": "1000000000" },
            "inputTokens": [{ "tokenAddress": "0x0000000000000000000000000000000000000000", "amount": "1000000000" }],
            "outputTokens": [{ "tokenAddress": "0x4200000000000000000000000000000000000006", "amount": "5" }],
            "gasEstimate": 151234.0
        }))
        .unwrap();
        let quote = odos_to_quote(reply, &p).unwrap();
        assert!(quote.approval.is_none());
        assert_eq!(quote.tx.value, U256::from(1_000_000_000u64));
        assert_eq!(quote.gas_used, Some(U256::from(151_234)));
        assert_eq!(odos_token(&p.input_token), "0x0000000000000000000000000000000000000000");
    }

    #[test]
    fn lifi_sums_gas_costs_and_names_tool() {
        let reply: LiFiQuote = serde_json::from_value(json!({
            "tool": "sushiswap",
            "estimate": {
                "fromAmount": "1000000000",
                "toAmount": "399000000000000000",
                "approvalAddress": ROUTER,
                "gasCosts": [{ "estimate": "100000" }, { "estimate": "20000" }]
            },
            "transactionRequest": { "to": ROUTER, "data": "0x01", "value": "0x0", "gasLimit": "0x30d40" }
        }))
        .unwrap();
        let quote = lifi_to_quote(reply, &params()).unwrap();
        assert_eq!(quote.provider, "lifi:sushiswap");
        assert_eq!(quote.gas_used, Some(U256::from(120_000)));
    }

    #[test]
    fn relay_reads_spender_from_approve_step() {
        let spender = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let approve = format!(
            "0x095ea7b3000000000000000000000000{}{}",
            &spender[2..],
            "f".repeat(64)
        );
        let reply: RelayQuote = serde_json::from_value(json!({
            "steps": [
                { "id": "approve", "items": [{ "data": { "to": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", "data": approve, "value": "0" } }] },
                { "id": "swap", "items": [{ "data": { "to": ROUTER, "data": "0xc0ffee", "value": "0", "gas": "210000" } }] }
            ],
            "details": {
                "currencyIn": { "amount": "1000000000" },
                "currencyOut": { "amount": "402000000000000000" }
            }
        }))
        .unwrap();
        let quote = relay_to_quote(reply, &params()).unwrap();
        assert_eq!(quote.provider, "relay");
        assert_eq!(quote.output_amount, U256::from(402_000_000_000_000_000u64));
        assert_eq!(quote.gas_used, Some(U256::from(210_000)));
        assert_eq!(quote.tx.to, ROUTER.parse::<Address>().unwrap());
        assert_eq!(quote.approval.unwrap().spender, spender.parse::<Address>().unwrap());
    }

    #[test]
    fn relay_without_swap_step_fails() {
        let reply: RelayQuote = serde_json::from_value(json!({
            "steps": [],
            "details": { "currencyIn": { "amount": "1" }, "currencyOut": { "amount": "1" } }
        }))
        .unwrap();
        assert!(relay_to_quote(reply, &params()).is_err());
        assert!(approve_spender(&Bytes::from(vec![0xde, 0xad])).is_err());
        assert_eq!(relay_currency(&NATIVE_TOKEN.parse().unwrap()), "0x0000000000000000000000000000000000000000");
    }

    #[test]
    fn velora_prefers_transfer_proxy_as_spender() {
        let proxy = "0x216b4b4ba9f3e719726886d34a177484278bfcae";
        let reply: VeloraSwap = serde_json::from_value(json!({
            "priceRoute": {
                "srcAmount": "1000000000",
                "destAmount": "400500000000000000",
                "gasCost": "210000",
                "tokenTransferProxy": proxy
            },
            "txParams": { "to": ROUTER, "data": "0xfe", "value": "0" }
        }))
        .unwrap();
        let quote = velora_to_quote(reply, &params()).unwrap();
        assert_eq!(quote.approval.unwrap().spender, proxy.parse::<Address>().unwrap());
    }
}
