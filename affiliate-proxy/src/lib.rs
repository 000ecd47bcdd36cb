//! Signed query proxy for the affiliate product API.
//!
//! A caller sends a search phrase, a product URL or a product id. The proxy
//! resolves it to either a product id or a search term, signs one call to the
//! upstream API and answers with a flat JSON record.

mod callback;
pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod params;
pub mod product;
pub mod resolver;
mod service;
pub mod signing;
pub mod upstream;

#[cfg(test)]
mod testutils;

pub use errors::ProxyError;
pub use service::{Gateway, GatewayService, QueryInput};

use shared::http::run_http_service;

pub async fn run(config: config::Config) -> Result<(), ProxyError> {
    let gateway = Gateway::new(&config)?;

    if !gateway.has_credentials() {
        tracing::warn!(
            "API credentials are not configured, queries will fail until {} and {} are set",
            config::APP_KEY_ENV,
            config::APP_SECRET_ENV
        );
    }

    run_http_service(
        &config.listener.host,
        config.listener.port,
        GatewayService::new(gateway),
    )
    .await
}
