use std::sync::Arc;
use std::time::Duration;

use postbox::broker::engine::sweep_loop;
use postbox::broker::{Broker, BrokerDefaults};
use postbox::config::load_config;
use postbox::transport::http::start_http_server;
use postbox::utils::logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = load_config().expect("failed to load configuration");
    logging::init(&config.server.log_level);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let broker = Arc::new(Broker::new(BrokerDefaults::from(&config.broker)));

    tokio::spawn(sweep_loop(
        Arc::clone(&broker),
        Duration::from_secs(config.broker.sweep_interval_secs),
    ));

    if let Err(err) = start_http_server(&addr, broker).await {
        tracing::error!("server error: {err}");
        std::process::exit(1);
    }
}
