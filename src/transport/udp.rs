//! Connected UDP transport: one socket per session.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;

use super::Transport;
use crate::error::{Error, Result};
use crate::util::bind_ephemeral_udp;

/// UDP transport bound to an ephemeral local port and connected to one
/// agent.
///
/// The socket is the session's single wire resource; it lives exactly as
/// long as the transport value. Cloning shares the same socket.
#[derive(Clone)]
pub struct UdpTransport {
    inner: Arc<UdpTransportInner>,
}

struct UdpTransportInner {
    socket: UdpSocket,
    target: SocketAddr,
    local_addr: SocketAddr,
}

impl UdpTransport {
    /// Bind an ephemeral local port and connect to `target`.
    pub async fn connect(target: SocketAddr) -> Result<Self> {
        let socket = bind_ephemeral_udp(target).map_err(|e| Error::Io {
            target: Some(target),
            source: e,
        })?;
        socket.connect(target).await.map_err(|e| Error::Io {
            target: Some(target),
            source: e,
        })?;
        let local_addr = socket.local_addr().map_err(|e| Error::Io {
            target: Some(target),
            source: e,
        })?;

        tracing::debug!(
            snmp.target = %target,
            snmp.local_addr = %local_addr,
            "UDP transport connected"
        );

        Ok(Self {
            inner: Arc::new(UdpTransportInner {
                socket,
                target,
                local_addr,
            }),
        })
    }
}

impl Transport for UdpTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        tracing::trace!(
            snmp.target = %self.inner.target,
            snmp.bytes = data.len(),
            "UDP send"
        );
        self.inner.socket.send(data).await.map_err(|e| Error::Io {
            target: Some(self.inner.target),
            source: e,
        })?;
        Ok(())
    }

    async fn recv(&self, request_id: i32, timeout: Duration) -> Result<(Bytes, SocketAddr)> {
        let mut buf = vec![0u8; 65535];
        match tokio::time::timeout(timeout, self.inner.socket.recv(&mut buf)).await {
            Ok(Ok(len)) => {
                tracing::trace!(
                    snmp.target = %self.inner.target,
                    snmp.bytes = len,
                    "UDP recv"
                );
                buf.truncate(len);
                Ok((Bytes::from(buf), self.inner.target))
            }
            Ok(Err(e)) => Err(Error::Io {
                target: Some(self.inner.target),
                source: e,
            }),
            Err(_) => {
                tracing::trace!(
                    snmp.target = %self.inner.target,
                    snmp.request_id = request_id,
                    snmp.timeout_ms = timeout.as_millis() as u64,
                    "UDP recv timeout"
                );
                Err(Error::Timeout {
                    target: Some(self.inner.target),
                    elapsed: timeout,
                    request_id,
                })
            }
        }
    }

    fn peer_addr(&self) -> SocketAddr {
        self.inner.target
    }

    fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_binds_ephemeral_port() {
        // Loopback target; no agent needed for bind/connect
        let transport = UdpTransport::connect("127.0.0.1:16100".parse().unwrap())
            .await
            .unwrap();
        assert_ne!(transport.local_addr().port(), 0);
        assert_eq!(transport.peer_addr().port(), 16100);
    }

    #[tokio::test]
    async fn recv_times_out() {
        let transport = UdpTransport::connect("127.0.0.1:16101".parse().unwrap())
            .await
            .unwrap();
        let err = transport
            .recv(1, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn echo_round_trip() {
        // Stand up a loopback echo peer
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer_addr = peer.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 128];
            if let Ok((len, from)) = peer.recv_from(&mut buf).await {
                let _ = peer.send_to(&buf[..len], from).await;
            }
        });

        let transport = UdpTransport::connect(peer_addr).await.unwrap();
        transport.send(b"ping").await.unwrap();
        let (data, from) = transport.recv(1, Duration::from_secs(1)).await.unwrap();
        assert_eq!(data.as_ref(), b"ping");
        assert_eq!(from, peer_addr);
    }
}
