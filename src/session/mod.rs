//! Device sessions.
//!
//! A [`Session`] composes one exclusively-owned [`Transport`] with a shared
//! [`OidResolver`] behind the four operations callers use: `get`, `set`,
//! `walk`, `table_operation`. One session means one socket for its whole
//! life; constructing a session per operation is the documented
//! anti-pattern this type exists to prevent.
//!
//! Requests on a session never overlap: the transport slot sits behind an
//! async mutex held across each send/receive round trip, so concurrent
//! callers serialize instead of corrupting each other's correlation.
//! Independent sessions (one per device) proceed concurrently and share
//! nothing but the resolver.

mod builder;
mod walk;

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::error::{DecodeErrorKind, Error, ErrorStatus, Result};
use crate::message::CommunityMessage;
use crate::oid::Oid;
use crate::pdu::Pdu;
use crate::resolver::OidResolver;
use crate::rowstatus::{TableOperation, run_table_operation};
use crate::transport::Transport;
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;

pub use builder::SessionBuilder;
pub use walk::Walk;

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Protocol version for all requests.
    pub version: Version,
    /// Community for GET/GETNEXT.
    pub read_community: Bytes,
    /// Community for SET.
    pub write_community: Bytes,
    /// Per-round-trip timeout.
    pub timeout: Duration,
    /// Retransmits after a timeout (datagram loss recovery).
    pub retries: u32,
    /// Safety net: maximum GETNEXT rounds in one walk.
    pub max_walk_steps: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: Version::V2c,
            read_community: Bytes::from_static(b"public"),
            write_community: Bytes::from_static(b"private"),
            timeout: Duration::from_secs(2),
            retries: 1,
            max_walk_steps: 10_000,
        }
    }
}

pub(crate) struct SessionInner<T: Transport> {
    /// The one wire resource. `None` after `close()`.
    transport: Mutex<Option<T>>,
    resolver: Arc<dyn OidResolver>,
    config: SessionConfig,
    next_request_id: AtomicI32,
}

/// Handle to one managed device.
///
/// Cheap to clone; clones share the same transport and observe the same
/// `close()`.
pub struct Session<T: Transport> {
    inner: Arc<SessionInner<T>>,
}

impl<T: Transport> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Transport> Session<T> {
    /// Wrap an already-connected transport.
    pub fn new(transport: T, resolver: Arc<dyn OidResolver>, config: SessionConfig) -> Self {
        // Seed the request id from the clock so a quick process restart
        // doesn't collide with responses addressed to the previous run.
        let initial_id = {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as i32)
                .unwrap_or(1)
                .wrapping_abs()
                .max(1)
        };
        Self {
            inner: Arc::new(SessionInner {
                transport: Mutex::new(Some(transport)),
                resolver,
                config,
                next_request_id: AtomicI32::new(initial_id),
            }),
        }
    }

    /// The shared resolver.
    pub fn resolver(&self) -> &Arc<dyn OidResolver> {
        &self.inner.resolver
    }

    /// True when vendor modules are registered in the resolver. When false,
    /// only standard symbols resolve and vendor tables need numeric OIDs.
    pub fn has_albedo_resolution(&self) -> bool {
        self.inner.resolver.has_albedo_modules()
    }

    pub(crate) fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Release the transport. Idempotent; later operations fail with
    /// [`Error::SessionClosed`].
    pub async fn close(&self) {
        let released = self.inner.transport.lock().await.take();
        if released.is_some() {
            tracing::debug!("session closed, transport released");
        }
    }

    /// True once [`close()`](Self::close) has run.
    pub async fn is_closed(&self) -> bool {
        self.inner.transport.lock().await.is_none()
    }

    fn alloc_request_id(&self) -> i32 {
        self.inner.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// One request/response round trip, with bounded retransmits.
    ///
    /// The transport lock is held for the full exchange; this is what keeps
    /// two operations on one session from ever being in flight together.
    async fn request(&self, pdu: Pdu, community: Bytes) -> Result<Pdu> {
        let config = &self.inner.config;
        let request_id = pdu.request_id;
        let encoded = CommunityMessage::new(config.version, community, pdu).encode();

        let guard = self.inner.transport.lock().await;
        let transport = guard.as_ref().ok_or(Error::SessionClosed)?;

        let mut attempt = 0u32;
        loop {
            transport.send(&encoded).await?;
            match transport.recv(request_id, config.timeout).await {
                Ok((data, _source)) => {
                    let response = CommunityMessage::decode(data)?;
                    return self.validate_response(request_id, response);
                }
                Err(err) if err.is_timeout() && attempt < config.retries => {
                    attempt += 1;
                    tracing::debug!(
                        snmp.request_id = request_id,
                        snmp.attempt = attempt,
                        "retransmitting after timeout"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn validate_response(&self, request_id: i32, response: CommunityMessage) -> Result<Pdu> {
        let config = &self.inner.config;
        if response.version != config.version {
            return Err(Error::VersionMismatch {
                expected: config.version.as_i32(),
                actual: response.version.as_i32(),
            });
        }
        if response.pdu.request_id != request_id {
            return Err(Error::RequestIdMismatch {
                expected: request_id,
                actual: response.pdu.request_id,
            });
        }
        if response.pdu.error_status != 0 {
            let index = response.pdu.error_index;
            // error_index is 1-based per RFC 3416
            let oid = usize::try_from(index)
                .ok()
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| response.pdu.varbinds.get(i))
                .map(|vb| vb.oid.clone());
            return Err(Error::Snmp {
                status: ErrorStatus::from_i32(response.pdu.error_status),
                index,
                oid,
            });
        }
        Ok(response.pdu)
    }

    fn first_varbind(pdu: Pdu) -> Result<VarBind> {
        pdu.varbinds
            .into_iter()
            .next()
            .ok_or_else(|| Error::decode(0, DecodeErrorKind::MissingVarBind))
    }

    /// GET one object. Exceptions come back as values, not errors.
    #[tracing::instrument(level = "debug", skip(self), fields(snmp.oid = %oid))]
    pub async fn fetch(&self, oid: &Oid) -> Result<VarBind> {
        let pdu = Pdu::get_request(self.alloc_request_id(), std::slice::from_ref(oid));
        let response = self
            .request(pdu, self.inner.config.read_community.clone())
            .await?;
        Self::first_varbind(response)
    }

    /// GETNEXT: the lexicographic successor of `oid`.
    #[tracing::instrument(level = "debug", skip(self), fields(snmp.oid = %oid))]
    pub async fn get_next(&self, oid: &Oid) -> Result<VarBind> {
        let pdu = Pdu::get_next_request(self.alloc_request_id(), oid.clone());
        let response = self
            .request(pdu, self.inner.config.read_community.clone())
            .await?;
        Self::first_varbind(response)
    }

    /// SET one object, using the write community.
    #[tracing::instrument(level = "debug", skip(self, value), fields(snmp.oid = %oid))]
    pub async fn set_value(&self, oid: &Oid, value: Value) -> Result<VarBind> {
        let pdu = Pdu::set_request(
            self.alloc_request_id(),
            vec![VarBind::new(oid.clone(), value)],
        );
        let response = self
            .request(pdu, self.inner.config.write_community.clone())
            .await?;
        Self::first_varbind(response)
    }

    /// Resolve a symbolic target through the shared resolver.
    pub fn resolve(&self, target: &str) -> Result<Oid> {
        self.inner.resolver.resolve(target)
    }
}

impl<T: Transport + 'static> Session<T> {
    /// Convenience GET: the value, or `None` on any failure.
    ///
    /// This is the one documented boundary where failures collapse to an
    /// absent value. Resolution errors, timeouts, agent rejections and the
    /// v2c exceptions all come back as `None`, logged at debug.
    pub async fn get(&self, target: &str) -> Option<Value> {
        let oid = match self.resolve(target) {
            Ok(oid) => oid,
            Err(err) => {
                tracing::debug!(snmp.target = target, error = %err, "get: resolution failed");
                return None;
            }
        };
        match self.fetch(&oid).await {
            Ok(vb) if vb.value.is_exception() => {
                tracing::debug!(snmp.target = target, value = %vb.value, "get: absent");
                None
            }
            Ok(vb) => Some(vb.value),
            Err(err) => {
                tracing::debug!(snmp.target = target, error = %err, "get failed");
                None
            }
        }
    }

    /// Convenience SET: true iff the agent accepted the write.
    pub async fn set(&self, target: &str, value: impl Into<Value>) -> bool {
        let oid = match self.resolve(target) {
            Ok(oid) => oid,
            Err(err) => {
                tracing::debug!(snmp.target = target, error = %err, "set: resolution failed");
                return false;
            }
        };
        match self.set_value(&oid, value.into()).await {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(snmp.target = target, error = %err, "set failed");
                false
            }
        }
    }

    /// Stream the subtree rooted at `root`, one GETNEXT per item.
    pub fn walk_stream(&self, root: Oid) -> Walk<T> {
        Walk::new(self.clone(), root, self.inner.config.max_walk_steps)
    }

    /// Collect a whole subtree in ascending OID order.
    ///
    /// Stops cleanly at the subtree boundary or end-of-MIB; fails on agent
    /// errors, non-increasing OIDs, or hitting the step safety net.
    #[tracing::instrument(level = "debug", skip(self), fields(snmp.oid = %root))]
    pub async fn walk_oid(&self, root: &Oid) -> Result<Vec<VarBind>> {
        use std::future::poll_fn;
        use std::pin::pin;

        let mut stream = pin!(self.walk_stream(root.clone()));
        let mut results = Vec::new();
        while let Some(item) =
            poll_fn(|cx| futures_core::Stream::poll_next(stream.as_mut(), cx)).await
        {
            results.push(item?);
        }
        Ok(results)
    }

    /// Walk a symbolic subtree, returning `(name, value)` pairs with names
    /// reverse-resolved through the shared resolver.
    pub async fn walk(&self, target: &str) -> Result<Vec<(String, Value)>> {
        let root = self.resolve(target)?;
        let varbinds = self.walk_oid(&root).await?;
        Ok(varbinds
            .into_iter()
            .map(|vb| (self.inner.resolver.reverse_resolve(&vb.oid), vb.value))
            .collect())
    }

    /// Run a RowStatus provisioning recipe. See [`TableOperation`].
    ///
    /// Returns the typed outcome: `Ok(true)` on terminal success,
    /// `Ok(false)` on terminal failure or poll exhaustion. The row is
    /// destroyed on every path before this returns.
    pub async fn try_table_operation(&self, op: &TableOperation) -> Result<bool> {
        run_table_operation(self, op).await
    }

    /// Convenience form of [`try_table_operation`](Self::try_table_operation):
    /// any error collapses to `false`, logged at debug.
    pub async fn table_operation(&self, op: &TableOperation) -> bool {
        match self.try_table_operation(op).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::debug!(error = %err, "table operation failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::resolver::MibRegistry;
    use crate::transport::{MockTransport, ResponseBuilder};

    fn mock_session(mock: MockTransport) -> Session<MockTransport> {
        Session::new(
            mock,
            MibRegistry::with_albedo_defaults(),
            SessionConfig {
                timeout: Duration::from_millis(50),
                retries: 0,
                ..SessionConfig::default()
            },
        )
    }

    fn mock() -> MockTransport {
        MockTransport::new("127.0.0.1:161".parse().unwrap())
    }

    #[tokio::test]
    async fn fetch_returns_varbind() {
        let transport = mock();
        transport.queue_response(
            ResponseBuilder::new()
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("ALBEDO xGenius"))
                .build_v2c(b"public"),
        );
        let session = mock_session(transport);
        let vb = session.fetch(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await.unwrap();
        assert_eq!(vb.value.as_str(), Some("ALBEDO xGenius"));
    }

    #[tokio::test]
    async fn get_collapses_exception_to_none() {
        let transport = mock();
        transport.queue_response(
            ResponseBuilder::new()
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 9, 0), Value::NoSuchInstance)
                .build_v2c(b"public"),
        );
        let session = mock_session(transport);
        assert_eq!(session.get("1.3.6.1.2.1.1.9.0").await, None);
    }

    #[tokio::test]
    async fn get_collapses_timeout_to_none() {
        let transport = mock();
        transport.queue_timeout();
        let session = mock_session(transport);
        assert_eq!(session.get("1.3.6.1.2.1.1.1.0").await, None);
    }

    #[tokio::test]
    async fn set_uses_write_community() {
        let transport = mock();
        transport.queue_response(
            ResponseBuilder::new()
                .varbind(oid!(1, 3, 6, 1, 4, 1, 39412, 1, 12, 1, 6, 1), Value::Integer(5))
                .build_v2c(b"private"),
        );
        let session = mock_session(transport.clone());
        assert!(
            session
                .set("ALBEDO-CONFIG-MIB::configFilesOpsStatus.1", 5)
                .await
        );
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].is_set());
        assert_eq!(requests[0].community.as_deref(), Some(&b"private"[..]));
    }

    #[tokio::test]
    async fn agent_error_status_becomes_typed_rejection() {
        let transport = mock();
        transport.queue_response(
            ResponseBuilder::new()
                .varbind(oid!(1, 3, 6, 1, 4, 1, 39412, 1, 12, 1, 6, 1), Value::Integer(1))
                .error_status(ErrorStatus::InconsistentValue.as_i32())
                .error_index(1)
                .build_v2c(b"private"),
        );
        let session = mock_session(transport);
        let err = session
            .set_value(
                &oid!(1, 3, 6, 1, 4, 1, 39412, 1, 12, 1, 6, 1),
                Value::Integer(1),
            )
            .await
            .unwrap_err();
        match err {
            Error::Snmp { status, index, oid } => {
                assert_eq!(status, ErrorStatus::InconsistentValue);
                assert_eq!(index, 1);
                assert_eq!(oid, Some(oid!(1, 3, 6, 1, 4, 1, 39412, 1, 12, 1, 6, 1)));
            }
            other => panic!("expected Snmp error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn request_id_mismatch_is_rejected() {
        let transport = mock();
        // Raw response keeps its placeholder id 0, which can never match
        transport.queue_raw_response(
            ResponseBuilder::new()
                .varbind(oid!(1, 3), Value::Null)
                .build_v2c(b"public"),
        );
        let session = mock_session(transport);
        let err = session.fetch(&oid!(1, 3)).await.unwrap_err();
        assert!(matches!(err, Error::RequestIdMismatch { .. }));
    }

    #[tokio::test]
    async fn retransmits_once_then_succeeds() {
        let transport = mock();
        transport.queue_timeout();
        transport.queue_response(
            ResponseBuilder::new()
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(100))
                .build_v2c(b"public"),
        );
        let session = Session::new(
            transport.clone(),
            MibRegistry::with_albedo_defaults(),
            SessionConfig {
                timeout: Duration::from_millis(20),
                retries: 1,
                ..SessionConfig::default()
            },
        );
        let vb = session.fetch(&oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)).await.unwrap();
        assert_eq!(vb.value, Value::TimeTicks(100));
        // Two sends: original plus one retransmit
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_fails_later_ops() {
        let transport = mock();
        let session = mock_session(transport);
        assert!(!session.is_closed().await);
        session.close().await;
        session.close().await;
        assert!(session.is_closed().await);
        let err = session.fetch(&oid!(1, 3)).await.unwrap_err();
        assert!(matches!(err, Error::SessionClosed));
    }

    #[tokio::test]
    async fn clones_share_the_closed_state() {
        let session = mock_session(mock());
        let clone = session.clone();
        session.close().await;
        assert!(clone.is_closed().await);
    }
}
