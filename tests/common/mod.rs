//! Shared helpers for the integration suites.
#![allow(dead_code)]

use std::time::Duration;

use bytes::Bytes;

use albedo_snmp::transport::{MockTransport, ResponseBuilder};
use albedo_snmp::{MibRegistry, Oid, Session, SessionConfig, Value};

/// A mock device at a fixed address.
pub fn device() -> MockTransport {
    init_tracing();
    MockTransport::new("192.0.2.10:161".parse().unwrap())
}

/// Honor `RUST_LOG` when a test needs wire-level detail.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Session over the mock with fast timeouts and no retransmits, so failure
/// scenarios don't stall the suite.
pub fn session(transport: MockTransport) -> Session<MockTransport> {
    Session::new(
        transport,
        MibRegistry::with_albedo_defaults(),
        SessionConfig {
            timeout: Duration::from_millis(50),
            retries: 0,
            ..SessionConfig::default()
        },
    )
}

/// A clean response carrying one varbind, read-community scoped.
pub fn reply(oid: Oid, value: impl Into<Value>) -> Bytes {
    ResponseBuilder::new()
        .varbind(oid, value.into())
        .build_v2c(b"public")
}

/// Same, but for responses to SET requests (write community).
pub fn set_ack(oid: Oid, value: impl Into<Value>) -> Bytes {
    ResponseBuilder::new()
        .varbind(oid, value.into())
        .build_v2c(b"private")
}
