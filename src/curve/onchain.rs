use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use ethers::abi::{self, ParamType, Token};
use ethers::prelude::{Http, Middleware, Provider};
use ethers::types::{Address, Bytes, U256};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use super::{apply_slippage, CoinData, CurveRouter, PoolCategory, RouteOutput, CURVE_CHAIN_ID};
use crate::contracts::{Erc20, ICurveCryptoPool, ICurveFactory, ICurveRouterNg, ICurveStablePool};
use crate::multicall::{Call, Multicall};
use crate::settings::CurveSettings;
use crate::types::{RouteStep, TxRequest};
use crate::units::{address_to_string, is_native, parse_address, to_human_units, to_raw_units};

/// Coins are read up to this index; factory pools hold at most eight.
const MAX_COINS: usize = 8;
/// Upper bound on pools read from any one factory.
const MAX_POOLS_PER_FACTORY: u64 = 5_000;
/// Upper bound on intermediate coins tried for two-hop routes.
const MAX_INTERMEDIATES: usize = 48;

impl PoolCategory {
    pub fn factory(&self) -> &'static str {
        match self {
            PoolCategory::StableFactory => "0xB9fC157394Af804a3578134A6585C0dc9cc990d4",
            PoolCategory::CrvUsdFactory => "0x4F8846Ae9380B90d2E71D5e3D042dff3E7ebb40d",
            PoolCategory::CryptoFactory => "0xF18056Bbd320E96A48e3Fbf8bC061322531aac99",
            PoolCategory::TwocryptoFactory => "0x98EE851a00abeE0d95D08cF4CA2BdCE32aeaAF7F",
            PoolCategory::TricryptoFactory => "0x0c0e5f2fF0ff18a3be9b835635039256dC4B4963",
            PoolCategory::StableNgFactory => "0x6A8cbed756804B16E05E741eDaBd5cB544AE21bf",
        }
    }

    /// `pool_type` slot of a Router NG swap param.
    pub fn router_pool_type(&self) -> u64 {
        match self {
            PoolCategory::StableFactory | PoolCategory::CrvUsdFactory => 1,
            PoolCategory::CryptoFactory => 2,
            PoolCategory::TwocryptoFactory => 20,
            PoolCategory::TricryptoFactory => 30,
            PoolCategory::StableNgFactory => 10,
        }
    }

    /// Stableswap pools index coins with `int128`, cryptoswap with `uint256`.
    pub fn is_stableswap(&self) -> bool {
        matches!(
            self,
            PoolCategory::StableFactory | PoolCategory::CrvUsdFactory | PoolCategory::StableNgFactory
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurvePool {
    pub id: String,
    pub address: Address,
    pub category: PoolCategory,
    pub coins: Vec<Address>,
}

impl CurvePool {
    fn index_of(&self, coin: Address) -> Option<usize> {
        self.coins.iter().position(|c| *c == coin)
    }
}

/// One pool hop with coin indices resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub pool: CurvePool,
    pub i: usize,
    pub j: usize,
}

impl Hop {
    fn input(&self) -> Address {
        self.pool.coins[self.i]
    }

    fn output(&self) -> Address {
        self.pool.coins[self.j]
    }

    fn to_step(&self) -> RouteStep {
        RouteStep {
            pool_id: self.pool.id.clone(),
            pool_address: self.pool.address,
            input_coin_address: self.input(),
            output_coin_address: self.output(),
        }
    }
}

/// A priced route: raw input, raw output and its hops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePlan {
    pub hops: Vec<Hop>,
    pub amount_in: U256,
    pub amount_out: U256,
}

/// Every hop in `pools` that swaps `from` into `to`.
pub fn direct_hops(pools: &[CurvePool], from: Address, to: Address) -> Vec<Hop> {
    pools
        .iter()
        .filter_map(|pool| {
            Some(Hop {
                i: pool.index_of(from)?,
                j: pool.index_of(to)?,
                pool: pool.clone(),
            })
        })
        .collect()
}

/// Stable ordering for hops: factory, then pool id, then output index.
fn hop_key(hop: &Hop) -> (PoolCategory, &str, usize) {
    (hop.pool.category, hop.pool.id.as_str(), hop.j)
}

/// First legs out of `from` whose output can reach `to` in one more hop,
/// ordered by [`hop_key`] whatever the order of `pools`.
pub fn first_legs(pools: &[CurvePool], from: Address, to: Address) -> Vec<Hop> {
    let reaches_to: HashSet<Address> = pools
        .iter()
        .filter(|pool| pool.index_of(to).is_some())
        .flat_map(|pool| pool.coins.iter().copied())
        .filter(|coin| *coin != to && *coin != from)
        .collect();
    let mut legs: Vec<Hop> = pools
        .iter()
        .filter_map(|pool| {
            let i = pool.index_of(from)?;
            Some(
                pool.coins
                    .iter()
                    .enumerate()
                    .filter(|(j, coin)| *j != i && reaches_to.contains(coin))
                    .map(|(j, _)| Hop {
                        pool: pool.clone(),
                        i,
                        j,
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .flatten()
        .collect();
    legs.sort_by(|a, b| hop_key(a).cmp(&hop_key(b)));
    legs
}

/// Keeps the highest-output priced leg per intermediate coin, in leg order.
/// Ties keep the earlier leg.
pub fn best_leg_per_coin(legs: Vec<Hop>, outs: Vec<Option<U256>>) -> Vec<(Hop, U256)> {
    let mut best: Vec<(Hop, U256)> = Vec::new();
    for (leg, out) in legs.into_iter().zip(outs) {
        let Some(out) = out else { continue };
        match best.iter_mut().find(|slot| slot.0.output() == leg.output()) {
            Some(slot) if out > slot.1 => *slot = (leg, out),
            Some(_) => {}
            None => best.push((leg, out)),
        }
    }
    best
}

/// Router NG `exchange` arguments for a plan: zero-padded route and swap params.
pub fn encode_route(hops: &[Hop]) -> Result<([Address; 11], [[U256; 5]; 5])> {
    if hops.is_empty() || hops.len() > 5 {
        bail!("Curve route must have 1-5 hops, got {}", hops.len());
    }
    let mut route = [Address::zero(); 11];
    let mut swap_params = [[U256::zero(); 5]; 5];
    route[0] = hops[0].input();
    for (n, hop) in hops.iter().enumerate() {
        route[2 * n + 1] = hop.pool.address;
        route[2 * n + 2] = hop.output();
        swap_params[n] = [
            U256::from(hop.i),
            U256::from(hop.j),
            U256::one(),
            U256::from(hop.pool.category.router_pool_type()),
            U256::from(hop.pool.coins.len()),
        ];
    }
    Ok((route, swap_params))
}

fn decode_address(data: &Bytes) -> Option<Address> {
    abi::decode(&[ParamType::Address], data)
        .ok()?
        .pop()?
        .into_address()
}

fn decode_uint(data: &Bytes) -> Option<U256> {
    abi::decode(&[ParamType::Uint(256)], data).ok()?.pop()?.into_uint()
}

/// ERC-20 symbols are usually `string`; a few old tokens return `bytes32`.
pub fn decode_symbol(data: &Bytes) -> Option<String> {
    if let Some(Token::String(symbol)) = abi::decode(&[ParamType::String], data).ok()?.pop() {
        return Some(symbol);
    }
    None
}

fn decode_symbol_bytes32(data: &Bytes) -> Option<String> {
    let raw = abi::decode(&[ParamType::FixedBytes(32)], data)
        .ok()?
        .pop()?
        .into_fixed_bytes()?;
    let trimmed: Vec<u8> = raw.into_iter().take_while(|b| *b != 0).collect();
    String::from_utf8(trimmed).ok().filter(|s| !s.is_empty())
}

/// Curve Router NG over a live Ethereum RPC endpoint.
pub struct OnchainRouter {
    settings: CurveSettings,
    router: Address,
    multicall: Address,
    provider: OnceCell<Arc<Provider<Http>>>,
    pools: DashMap<PoolCategory, Vec<CurvePool>>,
    coins: DashMap<Address, CoinData>,
    /// Plans priced by route queries, consumed by `populate_swap`
    plans: DashMap<(Address, Address, String), RoutePlan>,
}

impl OnchainRouter {
    pub fn new(settings: CurveSettings) -> Result<Self> {
        let router = parse_address(&settings.router_address).context("curve.router_address")?;
        let multicall = parse_address(&settings.multicall_address).context("curve.multicall_address")?;
        Ok(Self {
            settings,
            router,
            multicall,
            provider: OnceCell::new(),
            pools: DashMap::new(),
            coins: DashMap::new(),
            plans: DashMap::new(),
        })
    }

    fn provider(&self) -> Result<Arc<Provider<Http>>> {
        self.provider
            .get()
            .cloned()
            .ok_or_else(|| anyhow!("Curve router is not connected"))
    }

    fn multicall(&self) -> Result<Multicall<Provider<Http>>> {
        Ok(Multicall::new(
            self.provider()?,
            self.multicall,
            self.settings.multicall_batch_size,
        ))
    }

    /// Loaded pools in factory order, each factory in `pool_list` order.
    fn all_pools(&self) -> Vec<CurvePool> {
        PoolCategory::ALL
            .iter()
            .filter_map(|category| self.pools.get(category).map(|entry| entry.value().clone()))
            .flatten()
            .collect()
    }

    async fn decimals_of(&self, token: Address) -> Result<u8> {
        let data = self.get_coins_data(&[token]).await?;
        data.first()
            .map(|c| c.decimals)
            .ok_or_else(|| anyhow!("No coin data for {}", address_to_string(&token)))
    }

    /// Prices every hop with the pools' own `get_dy`, in one multicall.
    async fn quote_hops(&self, hops: &[Hop], amounts_in: &[U256]) -> Result<Vec<Option<U256>>> {
        let provider = self.provider()?;
        let calls = hops
            .iter()
            .zip(amounts_in)
            .map(|(hop, dx)| {
                let call_data = if hop.pool.category.is_stableswap() {
                    ICurveStablePool::new(hop.pool.address, provider.clone())
                        .get_dy(hop.i as i128, hop.j as i128, *dx)
                        .calldata()
                } else {
                    ICurveCryptoPool::new(hop.pool.address, provider.clone())
                        .get_dy(U256::from(hop.i), U256::from(hop.j), *dx)
                        .calldata()
                };
                call_data
                    .map(|call_data| Call {
                        target: hop.pool.address,
                        call_data,
                    })
                    .ok_or_else(|| anyhow!("Failed to encode get_dy for {}", hop.pool.id))
            })
            .collect::<Result<Vec<_>>>()?;
        let results = self.multicall()?.run(calls).await?;
        Ok(results
            .iter()
            .map(|r| r.as_ref().and_then(decode_uint).filter(|v| !v.is_zero()))
            .collect())
    }

    async fn best_plan(&self, from: Address, to: Address, amount: &str) -> Result<RoutePlan> {
        if from == to {
            bail!("Input and output tokens are the same");
        }
        let amount_in = to_raw_units(amount, self.decimals_of(from).await?)?;
        let pools = self.all_pools();
        if pools.is_empty() {
            bail!("No Curve pools loaded");
        }

        let mut best: Option<RoutePlan> = None;
        let mut consider = |plan: RoutePlan| {
            if best.as_ref().map_or(true, |b| plan.amount_out > b.amount_out) {
                best = Some(plan);
            }
        };

        let direct = direct_hops(&pools, from, to);
        let outs = self.quote_hops(&direct, &vec![amount_in; direct.len()]).await?;
        for (hop, out) in direct.into_iter().zip(outs) {
            if let Some(amount_out) = out {
                consider(RoutePlan {
                    hops: vec![hop],
                    amount_in,
                    amount_out,
                });
            }
        }

        let legs = first_legs(&pools, from, to);
        let leg_outs = self.quote_hops(&legs, &vec![amount_in; legs.len()]).await?;
        let mut kept = best_leg_per_coin(legs, leg_outs);
        if kept.len() > MAX_INTERMEDIATES {
            debug!(
                "Trying {} of {} intermediate coins for two-hop routes",
                MAX_INTERMEDIATES,
                kept.len()
            );
            kept.truncate(MAX_INTERMEDIATES);
        }
        let mut seconds = Vec::new();
        let mut second_inputs = Vec::new();
        let mut parents = Vec::new();
        for (leg, mid_amount) in &kept {
            let mid_amount = *mid_amount;
            for hop in direct_hops(&pools, leg.output(), to) {
                if hop.pool.address == leg.pool.address {
                    continue;
                }
                seconds.push(hop);
                second_inputs.push(mid_amount);
                parents.push(leg.clone());
            }
        }
        let second_outs = self.quote_hops(&seconds, &second_inputs).await?;
        for ((second, first), out) in seconds.into_iter().zip(parents).zip(second_outs) {
            if let Some(amount_out) = out {
                consider(RoutePlan {
                    hops: vec![first, second],
                    amount_in,
                    amount_out,
                });
            }
        }

        best.ok_or_else(|| {
            anyhow!(
                "No Curve route from {} to {}",
                address_to_string(&from),
                address_to_string(&to)
            )
        })
    }

    /// Takes the plan priced by the last route query for these arguments, or
    /// prices a fresh one.
    async fn take_plan(&self, from: Address, to: Address, amount: &str) -> Result<RoutePlan> {
        match self.plans.remove(&(from, to, amount.to_string())) {
            Some((_, plan)) => Ok(plan),
            None => self.best_plan(from, to, amount).await,
        }
    }
}

#[async_trait]
impl CurveRouter for OnchainRouter {
    async fn connect(&self, rpc_url: &str) -> Result<()> {
        let provider = Provider::<Http>::try_from(rpc_url)?;
        let chain_id = provider.get_chainid().await?;
        if chain_id != U256::from(CURVE_CHAIN_ID) {
            bail!("Curve RPC serves chain {}, expected {}", chain_id, CURVE_CHAIN_ID);
        }
        // A concurrent connect may have won; both point at the same endpoint
        let _ = self.provider.set(Arc::new(provider));
        Ok(())
    }

    async fn fetch_pools(&self, category: PoolCategory) -> Result<usize> {
        let provider = self.provider()?;
        let factory_address = Address::from_str(category.factory())?;
        let factory = ICurveFactory::new(factory_address, provider.clone());
        let total = factory.pool_count().call().await?.as_u64();
        if total > MAX_POOLS_PER_FACTORY {
            warn!(
                "{} lists {} pools, loading only the first {}",
                category, total, MAX_POOLS_PER_FACTORY
            );
        }
        let count = total.min(MAX_POOLS_PER_FACTORY);
        let multicall = self.multicall()?;

        let calls = (0..count)
            .map(|i| {
                factory
                    .pool_list(U256::from(i))
                    .calldata()
                    .map(|call_data| Call {
                        target: factory_address,
                        call_data,
                    })
                    .ok_or_else(|| anyhow!("Failed to encode pool_list({})", i))
            })
            .collect::<Result<Vec<_>>>()?;
        let addresses: Vec<(u64, Address)> = multicall
            .run(calls)
            .await?
            .iter()
            .enumerate()
            .filter_map(|(i, r)| Some((i as u64, r.as_ref().and_then(decode_address)?)))
            .filter(|(_, a)| !a.is_zero())
            .collect();

        // coins(i) shares one selector across pool kinds
        let pool_abi = ICurveCryptoPool::new(Address::zero(), provider);
        let coin_calldata = (0..MAX_COINS)
            .map(|i| {
                pool_abi
                    .coins(U256::from(i))
                    .calldata()
                    .ok_or_else(|| anyhow!("Failed to encode coins({})", i))
            })
            .collect::<Result<Vec<_>>>()?;
        let calls: Vec<Call> = addresses
            .iter()
            .flat_map(|(_, pool)| {
                coin_calldata.iter().map(move |call_data| Call {
                    target: *pool,
                    call_data: call_data.clone(),
                })
            })
            .collect();
        let results = multicall.run(calls).await?;

        let mut pools = Vec::with_capacity(addresses.len());
        for (n, (index, address)) in addresses.into_iter().enumerate() {
            let coins: Vec<Address> = results[n * MAX_COINS..(n + 1) * MAX_COINS]
                .iter()
                .map_while(|r| r.as_ref().and_then(decode_address).filter(|a| !a.is_zero()))
                .collect();
            if coins.len() < 2 {
                debug!("Skipping {} pool {} with {} coins", category, address_to_string(&address), coins.len());
                continue;
            }
            pools.push(CurvePool {
                id: format!("{}-{}", category.id(), index),
                address,
                category,
                coins,
            });
        }

        info!("Loaded {} {} pools", pools.len(), category);
        let loaded = pools.len();
        self.pools.insert(category, pools);
        self.plans.clear();
        Ok(loaded)
    }

    async fn get_best_route_and_output(&self, from: Address, to: Address, amount: &str) -> Result<RouteOutput> {
        let plan = self.best_plan(from, to, amount).await?;
        let output_decimals = self.decimals_of(to).await?;
        let output = RouteOutput {
            route: plan.hops.iter().map(Hop::to_step).collect(),
            output: to_human_units(plan.amount_out, output_decimals),
        };
        self.plans.insert((from, to, amount.to_string()), plan);
        Ok(output)
    }

    async fn populate_swap(&self, from: Address, to: Address, amount: &str) -> Result<TxRequest> {
        let plan = self.take_plan(from, to, amount).await?;
        let (route, swap_params) = encode_route(&plan.hops)?;
        let min_dy = apply_slippage(plan.amount_out, self.settings.slippage_bps);
        let data = ICurveRouterNg::new(self.router, self.provider()?)
            .exchange(route, swap_params, plan.amount_in, min_dy)
            .calldata()
            .ok_or_else(|| anyhow!("Failed to encode Router NG exchange"))?;
        Ok(TxRequest {
            from: None,
            to: self.router,
            data,
            value: if is_native(&from) { plan.amount_in } else { U256::zero() },
        })
    }

    async fn has_allowance(&self, token: Address, amount: &str, owner: Address, spender: Address) -> Result<bool> {
        if is_native(&token) {
            return Ok(true);
        }
        let needed = to_raw_units(amount, self.decimals_of(token).await?)?;
        let allowance = Erc20::new(token, self.provider()?)
            .allowance(owner, spender)
            .call()
            .await?;
        Ok(allowance >= needed)
    }

    async fn populate_approve(&self, token: Address, amount: &str, owner: Address) -> Result<Option<TxRequest>> {
        if is_native(&token) {
            return Ok(None);
        }
        let raw = to_raw_units(amount, self.decimals_of(token).await?)?;
        let data = Erc20::new(token, self.provider()?)
            .approve(self.router, raw)
            .calldata()
            .ok_or_else(|| anyhow!("Failed to encode approve"))?;
        Ok(Some(TxRequest {
            from: Some(owner),
            to: token,
            data,
            value: U256::zero(),
        }))
    }

    async fn get_coins_data(&self, coins: &[Address]) -> Result<Vec<CoinData>> {
        let missing: Vec<Address> = coins
            .iter()
            .copied()
            .filter(|c| !is_native(c) && !self.coins.contains_key(c))
            .collect();

        if !missing.is_empty() {
            let provider = self.provider()?;
            let mut calls = Vec::with_capacity(missing.len() * 2);
            for coin in &missing {
                let erc20 = Erc20::new(*coin, provider.clone());
                for call_data in [erc20.symbol().calldata(), erc20.decimals().calldata()] {
                    calls.push(Call {
                        target: *coin,
                        call_data: call_data.ok_or_else(|| anyhow!("Failed to encode ERC-20 call"))?,
                    });
                }
            }
            let results = self.multicall()?.run(calls).await?;
            for (n, coin) in missing.iter().enumerate() {
                let symbol = results[2 * n]
                    .as_ref()
                    .and_then(|d| decode_symbol(d).or_else(|| decode_symbol_bytes32(d)));
                let decimals = results[2 * n + 1]
                    .as_ref()
                    .and_then(decode_uint)
                    .filter(|d| *d <= U256::from(u8::MAX));
                match decimals {
                    Some(decimals) => {
                        self.coins.insert(
                            *coin,
                            CoinData {
                                address: *coin,
                                symbol: symbol.unwrap_or_default(),
                                decimals: decimals.as_u32() as u8,
                            },
                        );
                    }
                    None => warn!("decimals() failed for Curve coin {}", address_to_string(coin)),
                }
            }
        }

        coins
            .iter()
            .map(|coin| {
                if is_native(coin) {
                    return Ok(CoinData {
                        address: *coin,
                        symbol: "ETH".to_string(),
                        decimals: 18,
                    });
                }
                self.coins
                    .get(coin)
                    .map(|c| c.value().clone())
                    .ok_or_else(|| anyhow!("No coin data for {}", address_to_string(coin)))
            })
            .collect()
    }
}
