//! Pooled HTTP client construction.
//!
//! One [`reqwest::Client`] is built per [`ServerConfig`] and reused for every
//! request issued against that server. Recreating the client per request
//! would defeat the connection pool, so [`crate::BitbucketClient`] builds it
//! once at construction time.

use std::time::Duration;

use tracing::warn;

use crate::config::ServerConfig;
use crate::errors::Error;

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;

/// Grace period after which idle pooled connections are evicted.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Builds a pooled HTTP client honoring the timeout and TLS policy of the
/// given configuration.
///
/// Connect and total request timeouts are both set to the configured timeout,
/// the pool is bounded to the configured size, and idle connections are
/// evicted after a fixed 15-second grace period.
///
/// When `trust_all_certificates` is set, certificate-chain and hostname
/// verification are both disabled. This is an explicit opt-out of transport
/// security and is logged as a warning every time such a client is built.
///
/// # Errors
///
/// Returns [`Error::Transport`] when the underlying TLS backend cannot be
/// initialized.
pub(crate) fn build_client(config: &ServerConfig) -> Result<reqwest::Client, Error> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(config.timeout())
        .timeout(config.timeout())
        .pool_max_idle_per_host(config.pool_size())
        .pool_idle_timeout(POOL_IDLE_TIMEOUT);

    if config.trust_all_certificates() {
        warn!(
            base_url = %config.base_url(),
            "certificate and hostname verification disabled for this server"
        );
        builder = builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }

    builder.build().map_err(Error::Transport)
}
