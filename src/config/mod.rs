mod settings;

use config::{Config, ConfigError, Environment, File};

use crate::config::settings::PartialSettings;

pub use settings::{BrokerSettings, ServerSettings, Settings};


/// Load configuration from `config/default` (if present) and environment
/// variables (`SERVER__PORT`, `BROKER__SWEEP_INTERVAL_SECS`, ...), then
/// merge what was found over the built-in defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default().separator("__"));

    let config = builder.build()?;

    // Deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    Ok(Settings {
        server: ServerSettings {
            host: partial
                .server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: partial
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
            log_level: partial
                .server
                .as_ref()
                .and_then(|s| s.log_level.clone())
                .unwrap_or(default.server.log_level),
        },
        broker: BrokerSettings {
            default_message_ttl_secs: partial
                .broker
                .as_ref()
                .and_then(|b| b.default_message_ttl_secs)
                .unwrap_or(default.broker.default_message_ttl_secs),
            default_topic_ttl_secs: partial
                .broker
                .as_ref()
                .and_then(|b| b.default_topic_ttl_secs)
                .unwrap_or(default.broker.default_topic_ttl_secs),
            default_ack_deadline_secs: partial
                .broker
                .as_ref()
                .and_then(|b| b.default_ack_deadline_secs)
                .unwrap_or(default.broker.default_ack_deadline_secs),
            default_subscription_ttl_secs: partial
                .broker
                .as_ref()
                .and_then(|b| b.default_subscription_ttl_secs)
                .unwrap_or(default.broker.default_subscription_ttl_secs),
            default_max_messages: partial
                .broker
                .as_ref()
                .and_then(|b| b.default_max_messages)
                .unwrap_or(default.broker.default_max_messages),
            sweep_interval_secs: partial
                .broker
                .as_ref()
                .and_then(|b| b.sweep_interval_secs)
                .unwrap_or(default.broker.sweep_interval_secs),
        },
    })
}
