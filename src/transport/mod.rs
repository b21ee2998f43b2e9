//! Transport abstraction.
//!
//! A [`Transport`] is the single wire conduit a session owns: it sends one
//! encoded request and receives one response with a bounded wait. The
//! session layer guarantees requests never overlap on one transport, so
//! implementations need no correlation machinery beyond matching a request
//! id for logging.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

mod mock;
mod udp;

pub use mock::{MockResponse, MockTransport, RecordedRequest, ResponseBuilder};
pub use udp::UdpTransport;

/// Datagram conduit to one SNMP agent.
pub trait Transport: Send + Sync {
    /// Send one encoded message to the peer.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait up to `timeout` for the next datagram from the peer.
    ///
    /// `request_id` is the id of the request awaiting a response; it is used
    /// for timeout attribution, not for filtering — response validation
    /// happens in the session layer.
    fn recv(
        &self,
        request_id: i32,
        timeout: Duration,
    ) -> impl Future<Output = Result<(Bytes, SocketAddr)>> + Send;

    /// The agent's address.
    fn peer_addr(&self) -> SocketAddr;

    /// The local socket address.
    fn local_addr(&self) -> SocketAddr;
}
