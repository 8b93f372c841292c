use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;

use crate::chains;

#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Rpc {
    /// Shared key for the hosted RPC provider
    #[serde(default)]
    pub api_key: Option<String>,
    /// `{subdomain}` and `{api_key}` are substituted per chain
    #[serde(default = "default_url_template")]
    pub url_template: String,
    /// Per-chain URL overrides, keyed by the decimal chain id
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_url_template() -> String {
    "https://{subdomain}.g.alchemy.com/v2/{api_key}".to_string()
}

impl Default for Rpc {
    fn default() -> Self {
        Self {
            api_key: None,
            url_template: default_url_template(),
            overrides: HashMap::new(),
        }
    }
}

impl Rpc {
    /// Override first, then the templated provider URL. `None` for unknown chains.
    pub fn url_for(&self, chain_id: u64) -> Option<String> {
        if let Some(url) = self.overrides.get(&chain_id.to_string()) {
            return Some(url.clone());
        }
        let chain = chains::get_chain(chain_id)?;
        Some(
            self.url_template
                .replace("{subdomain}", chain.rpc_subdomain)
                .replace("{api_key}", self.api_key.as_deref().unwrap_or("")),
        )
    }

    /// Like [`Rpc::url_for`] but only when a real endpoint is configured.
    pub fn configured_url_for(&self, chain_id: u64) -> Option<String> {
        if self.overrides.contains_key(&chain_id.to_string()) || self.api_key.is_some() {
            self.url_for(chain_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AggregatorSettings {
    #[serde(default = "default_app_id")]
    pub app_id: String,
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    /// Simulating account used when the caller's sender is unknown or yields nothing
    #[serde(default = "default_fallback_account")]
    pub fallback_account: String,
    #[serde(default)]
    pub zerox_api_key: Option<String>,
    #[serde(default)]
    pub odos_api_key: Option<String>,
    #[serde(default)]
    pub lifi_api_key: Option<String>,
}

fn default_app_id() -> String {
    "quote-arbiter".to_string()
}
fn default_deadline_ms() -> u64 {
    15_000
}
fn default_fallback_account() -> String {
    "0xEe7aE85f2Fe2239E27D9c1E23fFFe168D63b4055".to_string()
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            deadline_ms: default_deadline_ms(),
            fallback_account: default_fallback_account(),
            zerox_api_key: None,
            odos_api_key: None,
            lifi_api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Features {
    #[serde(default = "default_true")]
    pub curve_enabled: bool,
    #[serde(default = "default_true")]
    pub compare_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Features {
    fn default() -> Self {
        Self {
            curve_enabled: true,
            compare_enabled: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CurveSettings {
    /// Curve Router NG on Ethereum; the router only ever serves chain 1
    #[serde(default = "default_curve_router")]
    pub router_address: String,
    #[serde(default = "default_multicall")]
    pub multicall_address: String,
    #[serde(default = "default_multicall_batch_size")]
    pub multicall_batch_size: usize,
    /// Tolerance baked into `min_dy` of the populated swap
    #[serde(default = "default_curve_slippage_bps")]
    pub slippage_bps: u32,
}

fn default_curve_router() -> String {
    "0x16C6521Dff6baB339122a0FE25a9116693265353".to_string()
}
fn default_multicall() -> String {
    "0xcA11bde05977b3631167028862bE2a173976CA11".to_string()
}
fn default_multicall_batch_size() -> usize {
    150
}
fn default_curve_slippage_bps() -> u32 {
    50
}

impl Default for CurveSettings {
    fn default() -> Self {
        Self {
            router_address: default_curve_router(),
            multicall_address: default_multicall(),
            multicall_batch_size: default_multicall_batch_size(),
            slippage_bps: default_curve_slippage_bps(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub rpc: Rpc,
    #[serde(default)]
    pub aggregator: AggregatorSettings,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub curve: CurveSettings,
    #[serde(default)]
    pub log: LogSettings,
}

impl Settings {
    /// Loads `Config.toml` if present, then applies process environment overrides.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_path("Config.toml")
    }

    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        let mut settings = Self::from_file(path)?;
        settings.apply_env_overrides(|key| env::var(key).ok());
        Ok(settings)
    }

    /// File layer only, without environment overrides.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()?;
        s.try_deserialize()
    }

    /// Applies the environment contract on top of file settings.
    ///
    /// `lookup` abstracts `std::env::var` so overrides can be exercised without
    /// touching process state.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(host) = non_empty("HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(e) => log::warn!("Ignoring invalid PORT {:?}: {}", port, e),
            }
        }
        if let Some(key) = non_empty("ALCHEMY_API_KEY") {
            self.rpc.api_key = Some(key);
        }
        for chain_id in chains::SUPPORTED_CHAINS.keys() {
            if let Some(url) = non_empty(&format!("RPC_URL_{}", chain_id)) {
                self.rpc.overrides.insert(chain_id.to_string(), url);
            }
        }
        if let Some(app_id) = non_empty("APP_ID") {
            self.aggregator.app_id = app_id;
        }
        if let Some(key) = non_empty("ZEROX_API_KEY") {
            self.aggregator.zerox_api_key = Some(key);
        }
        if let Some(key) = non_empty("ODOS_API_KEY") {
            self.aggregator.odos_api_key = Some(key);
        }
        if let Some(key) = non_empty("LIFI_API_KEY") {
            self.aggregator.lifi_api_key = Some(key);
        }
        if let Some(ms) = non_empty("AGGREGATOR_DEADLINE_MS") {
            match ms.parse() {
                Ok(v) => self.aggregator.deadline_ms = v,
                Err(e) => log::warn!("Ignoring invalid AGGREGATOR_DEADLINE_MS {:?}: {}", ms, e),
            }
        }
        // Flags stay on unless explicitly set to "false"
        if let Some(flag) = lookup("CURVE_ENABLED") {
            self.features.curve_enabled = flag.trim() != "false";
        }
        if let Some(flag) = lookup("COMPARE_ENABLED") {
            self.features.compare_enabled = flag.trim() != "false";
        }
        if let Some(level) = non_empty("LOG_LEVEL") {
            self.log.level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_sane() {
        let s = Settings::default();
        assert_eq!(s.server.port, 3000);
        assert_eq!(s.aggregator.deadline_ms, 15_000);
        assert!(s.features.curve_enabled);
        assert!(s.features.compare_enabled);
        assert_eq!(s.curve.slippage_bps, 50);
    }

    #[test]
    fn rpc_url_prefers_override() {
        let mut s = Settings::default();
        s.apply_env_overrides(lookup_from(&[
            ("ALCHEMY_API_KEY", "k3y"),
            ("RPC_URL_8453", "http://base.local:8545"),
        ]));
        assert_eq!(s.rpc.url_for(8453).as_deref(), Some("http://base.local:8545"));
        assert_eq!(
            s.rpc.url_for(1).as_deref(),
            Some("https://eth-mainnet.g.alchemy.com/v2/k3y")
        );
        assert_eq!(s.rpc.url_for(999), None);
    }

    #[test]
    fn configured_url_requires_key_or_override() {
        let s = Settings::default();
        assert_eq!(s.rpc.configured_url_for(1), None);
        let mut s = Settings::default();
        s.apply_env_overrides(lookup_from(&[("RPC_URL_1", "http://eth.local")]));
        assert_eq!(s.rpc.configured_url_for(1).as_deref(), Some("http://eth.local"));
    }

    #[test]
    fn flags_disable_only_on_literal_false() {
        let mut s = Settings::default();
        s.apply_env_overrides(lookup_from(&[("CURVE_ENABLED", "false"), ("COMPARE_ENABLED", "0")]));
        assert!(!s.features.curve_enabled);
        assert!(s.features.compare_enabled);
    }

    #[test]
    fn invalid_port_is_ignored() {
        let mut s = Settings::default();
        s.apply_env_overrides(lookup_from(&[("PORT", "http"), ("HOST", "127.0.0.1")]));
        assert_eq!(s.server.port, 3000);
        assert_eq!(s.server.host, "127.0.0.1");
    }

    #[test]
    fn loads_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 8080\n\n[aggregator]\ndeadline_ms = 5000\n\n[features]\ncurve_enabled = false\n\n[rpc.overrides]\n1 = \"http://eth.local\"\n"
        )
        .unwrap();
        let s = Settings::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(s.server.port, 8080);
        assert_eq!(s.aggregator.deadline_ms, 5000);
        assert!(!s.features.curve_enabled);
        assert_eq!(s.rpc.url_for(1).as_deref(), Some("http://eth.local"));
    }
}
