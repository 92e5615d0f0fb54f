//! Server connection configuration.
//!
//! A [`ServerConfig`] captures everything needed to talk to one Bitbucket
//! Server instance: where it lives, who we are, and how the connection pool
//! should behave. It is validated on construction and immutable afterwards,
//! so a value that exists is always usable.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::errors::Error;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Connection and authentication parameters for one Bitbucket Server instance.
///
/// Constructed once per target server, typically from persisted settings at
/// session start, and passed by reference into every component that needs it.
/// The password is held in a [`SecretString`] so it never leaks through
/// `Debug` output or logs.
///
/// # Examples
///
/// ```rust
/// use bitbucket_client::ServerConfig;
///
/// let config = ServerConfig::new(
///     "https://bitbucket.example.com",
///     "builder",
///     "s3cret",
///     30,
///     4,
///     false,
/// )?;
/// assert_eq!(config.username(), "builder");
/// # Ok::<(), bitbucket_client::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    base_url: Url,
    username: String,
    password: SecretString,
    timeout: Duration,
    pool_size: usize,
    trust_all_certificates: bool,
}

impl ServerConfig {
    /// Validates the given connection parameters and builds a config.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the Bitbucket Server instance.
    /// * `username` - The name of the Bitbucket user.
    /// * `password` - The password of the Bitbucket user.
    /// * `timeout_secs` - Connect/read/write timeout for every request, in seconds.
    /// * `pool_size` - Maximum number of pooled connections to the server.
    /// * `trust_all_certificates` - Disable certificate and hostname
    ///   verification. Never enable this against a production server; it
    ///   exists for instances behind self-signed certificates only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the offending field when the
    /// URL does not parse as an absolute http(s) URL, the username or password
    /// is empty, or the timeout or pool size is zero.
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        timeout_secs: u64,
        pool_size: usize,
        trust_all_certificates: bool,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(base_url).map_err(|e| Error::Configuration {
            field: "base_url",
            message: format!("'{base_url}' is not a valid URL: {e}"),
        })?;

        if !matches!(base_url.scheme(), "http" | "https") || base_url.host_str().is_none() {
            return Err(Error::Configuration {
                field: "base_url",
                message: format!("'{base_url}' is not an absolute http(s) URL"),
            });
        }

        if username.is_empty() {
            return Err(Error::Configuration {
                field: "username",
                message: "please enter the username of the bitbucket user".to_string(),
            });
        }

        if password.is_empty() {
            return Err(Error::Configuration {
                field: "password",
                message: "please enter the password of the bitbucket user".to_string(),
            });
        }

        if timeout_secs == 0 {
            return Err(Error::Configuration {
                field: "timeout",
                message: "the timeout must be a positive number of seconds".to_string(),
            });
        }

        if pool_size == 0 {
            return Err(Error::Configuration {
                field: "pool_size",
                message: "the connection pool size must be positive".to_string(),
            });
        }

        Ok(Self {
            base_url,
            username: username.to_string(),
            password: SecretString::from(password.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            pool_size,
            trust_all_certificates,
        })
    }

    /// Returns the base URL of the server instance.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the name of the Bitbucket user.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Exposes the configured password for request authentication.
    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the maximum connection pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Returns whether certificate and hostname verification is disabled.
    pub fn trust_all_certificates(&self) -> bool {
        self.trust_all_certificates
    }
}
