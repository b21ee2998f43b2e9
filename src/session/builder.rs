//! Session construction.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;
use crate::resolver::{MibRegistry, OidResolver};
use crate::transport::UdpTransport;
use crate::version::Version;

use super::{Session, SessionConfig};

/// Builder for a UDP-backed [`Session`].
///
/// ```no_run
/// # async fn example() -> albedo_snmp::Result<()> {
/// use albedo_snmp::SessionBuilder;
///
/// let session = SessionBuilder::new("192.0.2.10:161".parse().unwrap())
///     .read_community("public")
///     .write_community("private")
///     .timeout(std::time::Duration::from_secs(2))
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    target: SocketAddr,
    config: SessionConfig,
    resolver: Option<Arc<dyn OidResolver>>,
}

impl SessionBuilder {
    pub fn new(target: SocketAddr) -> Self {
        Self {
            target,
            config: SessionConfig::default(),
            resolver: None,
        }
    }

    /// Protocol version. Defaults to v2c.
    pub fn version(mut self, version: Version) -> Self {
        self.config.version = version;
        self
    }

    /// Community used for GET/GETNEXT. Defaults to `public`.
    pub fn read_community(mut self, community: impl Into<Bytes>) -> Self {
        self.config.read_community = community.into();
        self
    }

    /// Community used for SET. Defaults to `private`.
    pub fn write_community(mut self, community: impl Into<Bytes>) -> Self {
        self.config.write_community = community.into();
        self
    }

    /// One community for both reads and writes.
    pub fn community(self, community: impl Into<Bytes>) -> Self {
        let community = community.into();
        self.read_community(community.clone()).write_community(community)
    }

    /// Per-round-trip timeout. Defaults to 2 s.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Retransmits after a timeout. Defaults to 1.
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Walk step safety net. Defaults to 10 000.
    pub fn max_walk_steps(mut self, steps: usize) -> Self {
        self.config.max_walk_steps = steps;
        self
    }

    /// Name resolver shared with other sessions. Defaults to a registry
    /// pre-loaded with the ALBEDO objects this crate's layers use.
    pub fn resolver(mut self, resolver: Arc<dyn OidResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Bind a UDP socket and build the session.
    pub async fn connect(self) -> Result<Session<UdpTransport>> {
        let transport = UdpTransport::connect(self.target).await?;
        let resolver = self
            .resolver
            .unwrap_or_else(|| MibRegistry::with_albedo_defaults());
        tracing::debug!(
            snmp.target = %self.target,
            snmp.version = %self.config.version,
            "session established"
        );
        Ok(Session::new(transport, resolver, self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_builds_a_live_session() {
        let session = SessionBuilder::new("127.0.0.1:16161".parse().unwrap())
            .community("secret")
            .retries(0)
            .timeout(Duration::from_millis(20))
            .connect()
            .await
            .unwrap();
        assert!(!session.is_closed().await);
        assert!(session.has_albedo_resolution());
        assert_eq!(
            session.config().read_community,
            Bytes::from_static(b"secret")
        );
        assert_eq!(
            session.config().write_community,
            Bytes::from_static(b"secret")
        );
    }
}
