use crate::settings::AggregatorSettings;

/// One upstream provider plus the credentials it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    ZeroX { api_key: String },
    KyberSwap { client_id: String },
    Odos { api_key: Option<String> },
    LiFi { integrator: String, api_key: Option<String> },
    Relay { referrer: String },
    Velora { partner: String },
}

impl ProviderConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderConfig::ZeroX { .. } => "0x",
            ProviderConfig::KyberSwap { .. } => "kyberswap",
            ProviderConfig::Odos { .. } => "odos",
            ProviderConfig::LiFi { .. } => "lifi",
            ProviderConfig::Relay { .. } => "relay",
            ProviderConfig::Velora { .. } => "velora",
        }
    }
}

/// Provider list for the given settings. 0x requires a key and is skipped
/// without one; the keyless providers are always present.
pub fn build_provider_configs(settings: &AggregatorSettings) -> Vec<ProviderConfig> {
    let mut configs = Vec::with_capacity(6);
    if let Some(api_key) = settings.zerox_api_key.clone() {
        configs.push(ProviderConfig::ZeroX { api_key });
    }
    configs.push(ProviderConfig::KyberSwap {
        client_id: settings.app_id.clone(),
    });
    configs.push(ProviderConfig::Odos {
        api_key: settings.odos_api_key.clone(),
    });
    configs.push(ProviderConfig::LiFi {
        integrator: settings.app_id.clone(),
        api_key: settings.lifi_api_key.clone(),
    });
    configs.push(ProviderConfig::Relay {
        referrer: settings.app_id.clone(),
    });
    configs.push(ProviderConfig::Velora {
        partner: settings.app_id.clone(),
    });
    configs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyless_defaults() {
        let configs = build_provider_configs(&AggregatorSettings::default());
        assert_eq!(
            configs,
            vec![
                ProviderConfig::KyberSwap {
                    client_id: "quote-arbiter".into()
                },
                ProviderConfig::Odos { api_key: None },
                ProviderConfig::LiFi {
                    integrator: "quote-arbiter".into(),
                    api_key: None
                },
                ProviderConfig::Relay {
                    referrer: "quote-arbiter".into()
                },
                ProviderConfig::Velora {
                    partner: "quote-arbiter".into()
                },
            ]
        );
    }

    #[test]
    fn keys_flow_into_configs() {
        let settings = AggregatorSettings {
            app_id: "desk".into(),
            zerox_api_key: Some("zx".into()),
            odos_api_key: Some("od".into()),
            lifi_api_key: Some("lf".into()),
            ..Default::default()
        };
        let configs = build_provider_configs(&settings);
        assert_eq!(configs.len(), 6);
        assert_eq!(configs[0], ProviderConfig::ZeroX { api_key: "zx".into() });
        assert_eq!(configs[0].name(), "0x");
        assert!(configs.contains(&ProviderConfig::Odos {
            api_key: Some("od".into())
        }));
        assert!(configs.contains(&ProviderConfig::LiFi {
            integrator: "desk".into(),
            api_key: Some("lf".into())
        }));
    }
}
