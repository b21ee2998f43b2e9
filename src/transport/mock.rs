//! Programmable in-memory transport for tests.

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;

use super::Transport;
use crate::error::{Error, Result};
use crate::message::CommunityMessage;
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;

/// One scripted reply.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return this message; its request id is patched to match the request.
    Data(Bytes),
    /// Return this message verbatim (for request-id mismatch tests).
    RawData(Bytes),
    /// Let the recv time out.
    Timeout,
    /// Fail the recv with an I/O error.
    IoError(String),
}

/// A request captured by the mock, decoded where possible.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    /// Raw wire bytes.
    pub data: Bytes,
    /// Decoded PDU, `None` when the bytes were not a valid message.
    pub pdu: Option<Pdu>,
    /// Community string from the message wrapper.
    pub community: Option<Bytes>,
}

impl RecordedRequest {
    /// True if this was a SET request.
    pub fn is_set(&self) -> bool {
        self.pdu
            .as_ref()
            .is_some_and(|pdu| pdu.pdu_type == PduType::SetRequest)
    }
}

struct MockTransportInner {
    target: SocketAddr,
    responses: VecDeque<MockResponse>,
    requests: Vec<RecordedRequest>,
    default_response: Option<MockResponse>,
    last_request_id: Option<i32>,
}

/// In-memory [`Transport`] with scripted responses and request recording.
///
/// Queue responses in the order the code under test will issue requests;
/// queued data has its request id patched to match the request that consumed
/// it, so scripts don't depend on the session's id counter.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

impl MockTransport {
    pub fn new(target: SocketAddr) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockTransportInner {
                target,
                responses: VecDeque::new(),
                requests: Vec::new(),
                default_response: None,
                last_request_id: None,
            })),
        }
    }

    /// Queue a response with request-id patching.
    pub fn queue_response(&self, data: impl Into<Bytes>) {
        self.push(MockResponse::Data(data.into()));
    }

    /// Queue a response returned verbatim.
    pub fn queue_raw_response(&self, data: impl Into<Bytes>) {
        self.push(MockResponse::RawData(data.into()));
    }

    /// Queue a timeout.
    pub fn queue_timeout(&self) {
        self.push(MockResponse::Timeout);
    }

    /// Queue an I/O error.
    pub fn queue_io_error(&self, msg: impl Into<String>) {
        self.push(MockResponse::IoError(msg.into()));
    }

    /// Response used whenever the queue is empty.
    pub fn set_default_response(&self, response: MockResponse) {
        self.inner.lock().unwrap().default_response = Some(response);
    }

    /// All requests recorded so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Recorded SET requests only.
    pub fn set_requests(&self) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| r.is_set()).collect()
    }

    /// Number of scripted responses not yet consumed.
    pub fn queued_response_count(&self) -> usize {
        self.inner.lock().unwrap().responses.len()
    }

    fn push(&self, response: MockResponse) {
        self.inner.lock().unwrap().responses.push_back(response);
    }

    /// Rewrite the request id of a scripted response to `new_id`.
    fn patch_request_id(data: Bytes, new_id: i32) -> Bytes {
        match CommunityMessage::decode(data.clone()) {
            Ok(mut msg) => {
                msg.pdu.request_id = new_id;
                msg.encode()
            }
            // Not decodable; hand back unmodified
            Err(_) => data,
        }
    }
}

impl Transport for MockTransport {
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<()>> + Send {
        let data = Bytes::copy_from_slice(data);
        let decoded = CommunityMessage::decode(data.clone()).ok();
        let mut inner = self.inner.lock().unwrap();
        inner.last_request_id = decoded.as_ref().map(|msg| msg.pdu.request_id);
        inner.requests.push(RecordedRequest {
            data,
            pdu: decoded.as_ref().map(|msg| msg.pdu.clone()),
            community: decoded.map(|msg| msg.community),
        });
        async { Ok(()) }
    }

    fn recv(
        &self,
        request_id: i32,
        timeout: Duration,
    ) -> impl Future<Output = Result<(Bytes, SocketAddr)>> + Send {
        let inner = self.inner.clone();
        async move {
            let (response, target, last_id) = {
                let mut guard = inner.lock().unwrap();
                let resp = guard
                    .responses
                    .pop_front()
                    .or_else(|| guard.default_response.clone());
                (resp, guard.target, guard.last_request_id)
            };

            match response {
                Some(MockResponse::Data(data)) => {
                    let patched = match last_id {
                        Some(id) => Self::patch_request_id(data, id),
                        None => data,
                    };
                    Ok((patched, target))
                }
                Some(MockResponse::RawData(data)) => Ok((data, target)),
                Some(MockResponse::IoError(msg)) => Err(Error::Io {
                    target: Some(target),
                    source: std::io::Error::other(msg),
                }),
                Some(MockResponse::Timeout) | None => Err(Error::Timeout {
                    target: Some(target),
                    elapsed: timeout,
                    request_id,
                }),
            }
        }
    }

    fn peer_addr(&self) -> SocketAddr {
        self.inner.lock().unwrap().target
    }

    fn local_addr(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }
}

/// Builds valid response messages for scripting the mock.
pub struct ResponseBuilder {
    varbinds: Vec<VarBind>,
    error_status: i32,
    error_index: i32,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self {
            varbinds: Vec::new(),
            error_status: 0,
            error_index: 0,
        }
    }

    /// Append a varbind.
    pub fn varbind(mut self, oid: Oid, value: Value) -> Self {
        self.varbinds.push(VarBind::new(oid, value));
        self
    }

    /// Set the error-status field.
    pub fn error_status(mut self, status: i32) -> Self {
        self.error_status = status;
        self
    }

    /// Set the error-index field.
    pub fn error_index(mut self, index: i32) -> Self {
        self.error_index = index;
        self
    }

    /// Build a v2c Response message. The request id is a placeholder; the
    /// mock patches it on delivery.
    pub fn build_v2c(self, community: &[u8]) -> Bytes {
        let pdu = Pdu {
            pdu_type: PduType::Response,
            request_id: 0,
            error_status: self.error_status,
            error_index: self.error_index,
            varbinds: self.varbinds,
        };
        CommunityMessage::new(Version::V2c, Bytes::copy_from_slice(community), pdu).encode()
    }
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
