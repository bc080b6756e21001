use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// One scripted answer from a [`MockTransport`]
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Respond with this status and raw body
    Respond { status: u16, body: String },
    /// Fail at the connection level with this message
    Fail(String),
    /// Behave as if the cancellation token had fired
    Cancel,
    /// Never answer; resolve only once the token is cancelled
    Hang,
}

impl MockReply {
    pub fn json(status: u16, body: &str) -> Self {
        MockReply::Respond {
            status,
            body: body.to_string(),
        }
    }
}

/// Request captured by a [`MockTransport`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Default)]
struct MockState {
    queued: VecDeque<MockReply>,
    fallback: Option<MockReply>,
    requests: Vec<RecordedRequest>,
}

/// Scripted transport for exercising the requesters without a network
///
/// Replies are served from a queue in order; once the queue is empty the
/// fallback reply (if any) is used for every further call.
///
/// # Examples
///
/// ```
/// use echoprobe::common::{MockReply, MockTransport};
///
/// let transport = MockTransport::always(MockReply::json(200, r#"{"status":"ok"}"#));
/// assert_eq!(transport.request_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that gives the same reply to every call
    pub fn always(reply: MockReply) -> Self {
        let transport = Self::new();
        transport.lock().fallback = Some(reply);
        transport
    }

    /// Queues a reply for the next unanswered call
    pub fn push(&self, reply: MockReply) -> &Self {
        self.lock().queued.push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the state from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(
        &self,
        request: Request<Bytes>,
        cancel: CancellationToken,
    ) -> Result<Response<Bytes>, TransportError> {
        let (parts, body) = request.into_parts();
        let reply = {
            let mut state = self.lock();
            state.requests.push(RecordedRequest {
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                body,
            });
            state.queued.pop_front().or_else(|| state.fallback.clone())
        };

        match reply {
            Some(MockReply::Respond { status, body }) => {
                let status = StatusCode::from_u16(status)
                    .map_err(|e| TransportError::Protocol(e.to_string()))?;
                let mut response = Response::new(Bytes::from(body));
                *response.status_mut() = status;
                Ok(response)
            }
            Some(MockReply::Fail(message)) => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                message,
            ))),
            Some(MockReply::Cancel) => Err(TransportError::Cancelled),
            Some(MockReply::Hang) => {
                cancel.cancelled().await;
                Err(TransportError::Cancelled)
            }
            None => Err(TransportError::Protocol(
                "MockTransport has no reply scripted".to_string(),
            )),
        }
    }
}

/// Raw requests received by a canned server, in arrival order
pub type CapturedRequests = Arc<Mutex<Vec<Vec<u8>>>>;

/// Starts a local HTTP server that answers every request with a fixed response
///
/// `raw_response` is written verbatim, so tests control framing (Content-Length,
/// chunked, close-delimited). Returns the server task, its address and the raw
/// bytes of every request it read.
pub async fn spawn_canned_http_server(
    raw_response: impl Into<Vec<u8>>,
) -> io::Result<(JoinHandle<()>, SocketAddr, CapturedRequests)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let response = Arc::new(raw_response.into());
    let captured: CapturedRequests = Arc::new(Mutex::new(Vec::new()));

    let server_captured = captured.clone();
    let server_handle = tokio::spawn(async move {
        loop {
            let (mut socket, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "Canned server failed to accept connection");
                    break;
                }
            };
            let response = response.clone();
            let captured = server_captured.clone();
            tokio::spawn(async move {
                match read_request(&mut socket).await {
                    Ok(request) => {
                        debug!(%peer, size = request.len(), "Canned server read request");
                        captured
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .push(request);
                        if let Err(e) = socket.write_all(&response).await {
                            error!(%peer, error = %e, "Canned server failed to write response");
                        }
                        let _ = socket.shutdown().await;
                    }
                    Err(e) => error!(%peer, error = %e, "Canned server failed to read request"),
                }
            });
        }
    });

    Ok((server_handle, addr, captured))
}

/// Starts a local server that accepts connections but never answers
pub async fn spawn_silent_server() -> io::Result<(JoinHandle<()>, SocketAddr)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server_handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    Ok((server_handle, addr))
}

/// Reads one request head plus its Content-Length body
async fn read_request(socket: &mut tokio::net::TcpStream) -> io::Result<Vec<u8>> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(request);
        }
        request.extend_from_slice(&chunk[..n]);

        let mut headers = [httparse::EMPTY_HEADER; 32];
        let mut parsed = httparse::Request::new(&mut headers);
        if let Ok(httparse::Status::Complete(head_len)) = parsed.parse(&request) {
            let content_length = parsed
                .headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case("content-length"))
                .and_then(|h| std::str::from_utf8(h.value).ok())
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= head_len + content_length {
                return Ok(request);
            }
        }
    }
}

/// Builds a Content-Length framed HTTP/1.1 response
pub fn http_response(status_line: &str, content_type: &str, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
    .into_bytes()
}

/// Splits a raw captured request into its head and body
pub fn split_request(raw: &[u8]) -> (String, Vec<u8>) {
    match raw.windows(4).position(|w| w == b"\r\n\r\n") {
        Some(pos) => (
            String::from_utf8_lossy(&raw[..pos]).into_owned(),
            raw[pos + 4..].to_vec(),
        ),
        None => (String::from_utf8_lossy(raw).into_owned(), Vec::new()),
    }
}
