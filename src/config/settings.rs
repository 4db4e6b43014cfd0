use serde::Deserialize;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
}

/// Where the HTTP server binds and how loudly it logs.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

/// Broker attributes applied when create requests leave fields unset,
/// plus the sweep cadence. TTL values of zero mean "never expires".
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub default_message_ttl_secs: u32,
    pub default_topic_ttl_secs: u32,
    pub default_ack_deadline_secs: u32,
    pub default_subscription_ttl_secs: u32,
    pub default_max_messages: usize,
    pub sweep_interval_secs: u64,
}

/// Partial configuration loaded from files or environment. Missing values
/// fall back to defaults during the merge.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub default_message_ttl_secs: Option<u32>,
    pub default_topic_ttl_secs: Option<u32>,
    pub default_ack_deadline_secs: Option<u32>,
    pub default_subscription_ttl_secs: Option<u32>,
    pub default_max_messages: Option<usize>,
    pub sweep_interval_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 3140,
                log_level: "info".to_string(),
            },
            broker: BrokerSettings {
                default_message_ttl_secs: 3600,
                default_topic_ttl_secs: 0,
                default_ack_deadline_secs: 60,
                default_subscription_ttl_secs: 0,
                default_max_messages: 1,
                sweep_interval_secs: 1,
            },
        }
    }
}
