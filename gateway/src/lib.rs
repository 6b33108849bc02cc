pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod relay;
pub mod service;
pub mod testutils;

use crate::errors::GatewayError;
use crate::relay::RelayClient;
use crate::service::GatewayService;
use aggregator::engine::Aggregator;
use shared::http::run_http_service;
use std::sync::Arc;

/// Build the relay client and HTTP service from config and serve until the
/// listener fails.
pub async fn run(config: config::Config, aggregator: Arc<Aggregator>) -> Result<(), GatewayError> {
    let relay = RelayClient::new(&config.relay);
    let service = GatewayService::new(aggregator, relay, config.relay.policy);
    run_http_service(&config.listener.host, config.listener.port, service).await
}
