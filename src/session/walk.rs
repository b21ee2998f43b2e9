//! Subtree walking.
//!
//! A [`Walk`] issues one GETNEXT per item and yields varbinds in ascending
//! OID order until one of the clean stop conditions fires:
//!
//! - the returned OID is no longer inside the root subtree,
//! - the agent signals `endOfMibView`.
//!
//! Misbehaving agents are handled defensively: an OID that fails to advance
//! past the cursor terminates the walk with [`Error::NonIncreasingOid`]
//! (yielding nothing for that round), and a step counter caps the total
//! number of GETNEXT rounds so a cyclic agent cannot walk forever.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::transport::Transport;
use crate::varbind::VarBind;

use super::Session;

type StepFuture = Pin<Box<dyn Future<Output = Result<VarBind>> + Send>>;

/// Stream of varbinds under one subtree root.
pub struct Walk<T: Transport> {
    session: Session<T>,
    root: Oid,
    /// Last OID handed to GETNEXT. Starts at the root itself.
    cursor: Oid,
    steps: usize,
    max_steps: usize,
    in_flight: Option<StepFuture>,
    done: bool,
}

impl<T: Transport + 'static> Walk<T> {
    pub(crate) fn new(session: Session<T>, root: Oid, max_steps: usize) -> Self {
        Self {
            session,
            cursor: root.clone(),
            root,
            steps: 0,
            max_steps,
            in_flight: None,
            done: false,
        }
    }

    /// The subtree root this walk is bounded to.
    pub fn root(&self) -> &Oid {
        &self.root
    }

    /// GETNEXT rounds issued so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn start_step(&mut self) -> Result<()> {
        if self.steps >= self.max_steps {
            return Err(Error::WalkTruncated {
                limit: self.max_steps,
            });
        }
        self.steps += 1;
        let session = self.session.clone();
        let cursor = self.cursor.clone();
        self.in_flight = Some(Box::pin(
            async move { session.get_next(&cursor).await },
        ));
        Ok(())
    }

    fn accept(&mut self, vb: VarBind) -> Option<Result<VarBind>> {
        if vb.value == crate::value::Value::EndOfMibView {
            tracing::trace!(snmp.oid = %vb.oid, "walk: endOfMibView");
            self.done = true;
            return None;
        }
        if !vb.oid.starts_with(&self.root) {
            tracing::trace!(snmp.oid = %vb.oid, "walk: left subtree");
            self.done = true;
            return None;
        }
        if vb.oid <= self.cursor {
            self.done = true;
            return Some(Err(Error::NonIncreasingOid {
                previous: self.cursor.clone(),
                current: vb.oid,
            }));
        }
        self.cursor = vb.oid.clone();
        Some(Ok(vb))
    }
}

impl<T: Transport + 'static> Stream for Walk<T> {
    type Item = Result<VarBind>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.done {
                return Poll::Ready(None);
            }
            if this.in_flight.is_none() {
                if let Err(err) = this.start_step() {
                    this.done = true;
                    return Poll::Ready(Some(Err(err)));
                }
            }
            let Some(fut) = this.in_flight.as_mut() else {
                return Poll::Ready(None);
            };
            match fut.as_mut().poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(result) => {
                    this.in_flight = None;
                    match result {
                        Ok(vb) => match this.accept(vb) {
                            Some(item) => return Poll::Ready(Some(item)),
                            // Clean stop; loop sees `done` and ends.
                            None => continue,
                        },
                        Err(err) => {
                            this.done = true;
                            return Poll::Ready(Some(Err(err)));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::oid;
    use crate::resolver::MibRegistry;
    use crate::session::SessionConfig;
    use crate::transport::{MockTransport, ResponseBuilder};
    use crate::value::Value;

    fn session_with(mock: MockTransport, max_walk_steps: usize) -> Session<MockTransport> {
        Session::new(
            mock,
            MibRegistry::with_albedo_defaults(),
            SessionConfig {
                timeout: Duration::from_millis(50),
                retries: 0,
                max_walk_steps,
                ..SessionConfig::default()
            },
        )
    }

    fn mock() -> MockTransport {
        MockTransport::new("127.0.0.1:161".parse().unwrap())
    }

    fn reply(oid: Oid, value: Value) -> bytes::Bytes {
        ResponseBuilder::new().varbind(oid, value).build_v2c(b"public")
    }

    #[tokio::test]
    async fn stops_at_subtree_boundary() {
        let transport = mock();
        let root = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2);
        transport.queue_response(reply(root.extended(&[1]), Value::from("eth0")));
        transport.queue_response(reply(root.extended(&[2]), Value::from("eth1")));
        // Next column of the same table: outside the root, clean stop
        transport.queue_response(reply(
            oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 3, 1),
            Value::Integer(6),
        ));
        let session = session_with(transport, 100);

        let results = session.walk_oid(&root).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].value.as_str(), Some("eth0"));
        assert_eq!(results[1].value.as_str(), Some("eth1"));
    }

    #[tokio::test]
    async fn stops_at_end_of_mib_view() {
        let transport = mock();
        let root = oid!(1, 3, 6, 1, 4, 1, 39412, 1, 12, 1, 2);
        transport.queue_response(reply(root.extended(&[1]), Value::from("config.cfg")));
        transport.queue_response(reply(root.extended(&[1]), Value::EndOfMibView));
        let session = session_with(transport, 100);

        let results = session.walk_oid(&root).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn empty_subtree_yields_nothing() {
        let transport = mock();
        let root = oid!(1, 3, 6, 1, 4, 1, 39412, 1, 99);
        // First successor already lies outside the subtree
        transport.queue_response(reply(oid!(1, 3, 6, 1, 4, 1, 39412, 1, 100), Value::Null));
        let session = session_with(transport, 100);

        let results = session.walk_oid(&root).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn non_increasing_oid_is_an_error() {
        let transport = mock();
        let root = oid!(1, 3, 6, 1, 2, 1, 2);
        transport.queue_response(reply(root.extended(&[2, 1, 1]), Value::Integer(1)));
        // Agent repeats the same OID
        transport.queue_response(reply(root.extended(&[2, 1, 1]), Value::Integer(1)));
        let session = session_with(transport, 100);

        let err = session.walk_oid(&root).await.unwrap_err();
        assert!(matches!(err, Error::NonIncreasingOid { .. }));
    }

    #[tokio::test]
    async fn step_cap_truncates_cyclic_walks() {
        let transport = mock();
        let root = oid!(1, 3, 6, 1, 2, 1, 1);
        for i in 1..=10u32 {
            transport.queue_response(reply(root.extended(&[i]), Value::Integer(i as i32)));
        }
        let session = session_with(transport, 3);

        let err = session.walk_oid(&root).await.unwrap_err();
        assert!(matches!(err, Error::WalkTruncated { limit: 3 }));
    }

    #[tokio::test]
    async fn boundary_is_prefix_wise_not_lexicographic() {
        let transport = mock();
        // 1.3.6.1.20 sorts after every 1.3.6.1.2.* lexicographically but is
        // not inside the 1.3.6.1.2 subtree
        let root = oid!(1, 3, 6, 1, 2);
        transport.queue_response(reply(oid!(1, 3, 6, 1, 2, 1), Value::Integer(1)));
        transport.queue_response(reply(oid!(1, 3, 6, 1, 20), Value::Integer(2)));
        let session = session_with(transport, 100);

        let results = session.walk_oid(&root).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn symbolic_walk_reverse_resolves_names() {
        let transport = mock();
        let base = oid!(1, 3, 6, 1, 4, 1, 39412, 1, 12, 1, 2);
        transport.queue_response(reply(base.extended(&[1]), Value::from("a.cfg")));
        transport.queue_response(reply(base.extended(&[2]), Value::from("b.cfg")));
        transport.queue_response(reply(
            oid!(1, 3, 6, 1, 4, 1, 39412, 1, 12, 1, 3, 1),
            Value::Integer(0),
        ));
        let session = session_with(transport, 100);

        let pairs = session
            .walk("ALBEDO-CONFIG-MIB::configFilesOpsFileName")
            .await
            .unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "ALBEDO-CONFIG-MIB::configFilesOpsFileName.1");
        assert_eq!(pairs[1].0, "ALBEDO-CONFIG-MIB::configFilesOpsFileName.2");
    }
}
