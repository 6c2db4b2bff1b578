//! `HotspotClient` builder and connection entry point.
//!
//! This ties the layers together: TCP transport → protocol → session →
//! hotspot directory.

use std::sync::Arc;
use std::time::Duration;

use hotspot_directory::{
    GuestStore, HotspotDirectory, LookupStrategy, ProvisionConfig, Provisioner,
};
use hotspot_protocol::FrameLimits;
use hotspot_session::{Credential, Session};
use hotspot_transport::{TcpConnection, TcpConnector};

use crate::{ClientConfig, HotspotError};

/// Builder for a [`HotspotClient`].
///
/// # Example
///
/// ```rust,no_run
/// use hotspot::prelude::*;
///
/// # async fn run() -> Result<(), HotspotError> {
/// let client = HotspotClient::builder()
///     .host("10.5.50.1")
///     .credential("hotel-api", "s3cret")
///     .build()?;
/// let mut directory = client.connect().await?;
/// for account in directory.list_accounts().await? {
///     println!("{} {}", account.id, account.name);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct HotspotClientBuilder {
    config: ClientConfig,
}

impl HotspotClientBuilder {
    /// Creates a builder with default settings and no host or credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.config.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Appends a credential to the fallback list.
    pub fn credential(mut self, username: &str, password: &str) -> Self {
        self.config.credentials.push(Credential::new(username, password));
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.config.io_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn lookup(mut self, strategy: LookupStrategy) -> Self {
        self.config.directory.lookup = strategy;
        self
    }

    pub fn limits(mut self, limits: FrameLimits) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn provision(mut self, provision: ProvisionConfig) -> Self {
        self.config.provision = provision;
        self
    }

    /// Validates the configuration and builds the client.
    pub fn build(self) -> Result<HotspotClient, HotspotError> {
        HotspotClient::from_config(self.config)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// A configured client for one router.
///
/// Holds no connection itself: each [`connect`](Self::connect) opens an
/// independent, authenticated session.
#[derive(Debug, Clone)]
pub struct HotspotClient {
    config: ClientConfig,
}

impl HotspotClient {
    pub fn builder() -> HotspotClientBuilder {
        HotspotClientBuilder::new()
    }

    /// Creates a client from a validated configuration.
    pub fn from_config(config: ClientConfig) -> Result<Self, HotspotError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The TCP connector for the configured router.
    pub fn connector(&self) -> TcpConnector {
        TcpConnector::new(&self.config.host, self.config.port)
            .connect_timeout(self.config.connect_timeout())
    }

    /// Opens a session with credential fallback.
    pub async fn session(&self) -> Result<Session<TcpConnection>, HotspotError> {
        let session = Session::connect(
            &self.connector(),
            &self.config.credentials,
            self.config.session_config(),
        )
        .await?;
        Ok(session)
    }

    /// Opens a session and wraps it in a [`HotspotDirectory`].
    pub async fn connect(&self) -> Result<HotspotDirectory<TcpConnection>, HotspotError> {
        let session = self.session().await?;
        Ok(HotspotDirectory::new(session, self.config.directory.clone()))
    }

    /// A provisioner over `store` using the configured provisioning rules.
    pub fn provisioner<S: GuestStore>(&self, store: Arc<S>) -> Provisioner<S> {
        Provisioner::new(store, self.config.provision.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_settings() {
        let client = HotspotClient::builder()
            .host("10.5.50.1")
            .port(8729)
            .credential("hotel-api", "s3cret")
            .credential("admin", "")
            .io_timeout(Duration::from_secs(3))
            .lookup(LookupStrategy::Filtered)
            .build()
            .unwrap();

        let config = client.config();
        assert_eq!(config.port, 8729);
        assert_eq!(config.io_timeout_ms, 3_000);
        assert_eq!(config.credentials[1].username, "admin");
        assert_eq!(config.directory.lookup, LookupStrategy::Filtered);
        assert_eq!(client.connector().addr(), "10.5.50.1:8729");
    }

    #[test]
    fn test_builder_without_credentials_fails() {
        let result = HotspotClient::builder().host("10.5.50.1").build();
        assert!(matches!(result, Err(HotspotError::Config(_))));
    }

    #[test]
    fn test_duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }
}
