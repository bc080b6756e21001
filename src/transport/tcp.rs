use super::protocol::{Transport, TransportError};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default cap on a response (head plus body), 10MB
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

const READ_CHUNK: usize = 4096;
const MAX_HEADERS: usize = 64;

/// Minimal HTTP/1.1 client over a fresh TCP connection per request
///
/// Every exchange opens its own connection and sends `Connection: close`,
/// so calls share no state. Only plain `http://` URIs are supported.
///
/// # Examples
///
/// ```no_run
/// use echoprobe::transport::{TcpTransport, Transport};
/// use bytes::Bytes;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let transport = TcpTransport::default();
///     let request = http::Request::get("http://localhost:8080/healthz")
///         .header("accept", "application/json")
///         .body(Bytes::new())?;
///
///     let response = transport.execute(request, CancellationToken::new()).await?;
///     println!("status: {}", response.status());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TcpTransport {
    max_response_size: usize,
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self {
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}

impl TcpTransport {
    pub fn new(max_response_size: usize) -> Self {
        Self { max_response_size }
    }

    pub fn max_response_size(&self) -> usize {
        self.max_response_size
    }

    async fn round_trip(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let uri = request.uri();
        if uri.scheme_str() != Some("http") {
            return Err(TransportError::Protocol(format!(
                "Unsupported URI scheme in {uri}; only http:// is supported"
            )));
        }
        let host = connect_host(uri)
            .ok_or_else(|| TransportError::Protocol(format!("URI {uri} has no host")))?;
        let port = uri.port_u16().unwrap_or(80);

        debug!(%host, port, method = %request.method(), "Connecting");
        let mut stream = TcpStream::connect((host, port)).await?;

        let head = encode_request_head(&request)?;
        stream.write_all(&head).await?;
        stream.write_all(request.body()).await?;
        stream.flush().await?;

        read_response(&mut stream, self.max_response_size).await
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn execute(
        &self,
        request: Request<Bytes>,
        cancel: CancellationToken,
    ) -> Result<Response<Bytes>, TransportError> {
        // The connection lives inside the round-trip future and is dropped
        // with it when the token wins the race.
        tokio::select! {
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.round_trip(request) => result,
        }
    }
}

/// Host part of `uri` as the resolver expects it, IPv6 literals unbracketed
pub(crate) fn connect_host(uri: &http::Uri) -> Option<&str> {
    let host = uri.host()?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    (!host.is_empty()).then_some(host)
}

/// Serializes the request line and headers, terminated by the blank line
pub(crate) fn encode_request_head(request: &Request<Bytes>) -> Result<Vec<u8>, TransportError> {
    let uri = request.uri();
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let authority = uri
        .authority()
        .ok_or_else(|| TransportError::Protocol(format!("URI {uri} has no authority")))?;

    let mut head = format!("{} {} HTTP/1.1\r\n", request.method(), target).into_bytes();

    if !request.headers().contains_key(HOST) {
        head.extend_from_slice(format!("Host: {}\r\n", authority.as_str()).as_bytes());
    }
    for (name, value) in request.headers() {
        if *name == CONTENT_LENGTH || *name == TRANSFER_ENCODING || *name == CONNECTION {
            continue;
        }
        head.extend_from_slice(name.as_str().as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }
    if !request.body().is_empty() || *request.method() == Method::POST {
        head.extend_from_slice(format!("Content-Length: {}\r\n", request.body().len()).as_bytes());
    }
    head.extend_from_slice(b"Connection: close\r\n\r\n");

    Ok(head)
}

/// Parsed status line and headers plus where the body starts in the buffer
struct ResponseHead {
    status: StatusCode,
    headers: HeaderMap,
    body_start: usize,
}

fn parse_response_head(buffer: &[u8]) -> Result<Option<ResponseHead>, TransportError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = httparse::Response::new(&mut headers);

    let parsed_len = match response.parse(buffer) {
        Ok(httparse::Status::Complete(parsed_len)) => parsed_len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => {
            return Err(TransportError::Protocol(format!(
                "Failed to parse response headers: {e}"
            )));
        }
    };

    let code = response
        .code
        .ok_or_else(|| TransportError::Protocol("Response has no status code".to_string()))?;
    let status = StatusCode::from_u16(code)
        .map_err(|e| TransportError::Protocol(format!("Invalid status code {code}: {e}")))?;

    let mut header_map = HeaderMap::new();
    for header in response.headers.iter() {
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|e| TransportError::Protocol(format!("Invalid header name: {e}")))?;
        let value = HeaderValue::from_bytes(header.value)
            .map_err(|e| TransportError::Protocol(format!("Invalid header value: {e}")))?;
        header_map.append(name, value);
    }

    Ok(Some(ResponseHead {
        status,
        headers: header_map,
        body_start: parsed_len,
    }))
}

/// How the body length is delimited on the wire
#[derive(Debug, PartialEq, Eq)]
enum BodyFraming {
    Empty,
    Length(usize),
    Chunked,
    UntilClose,
}

fn body_framing(head: &ResponseHead) -> Result<BodyFraming, TransportError> {
    if head.status == StatusCode::NO_CONTENT || head.status == StatusCode::NOT_MODIFIED {
        return Ok(BodyFraming::Empty);
    }

    if let Some(encoding) = head.headers.get(TRANSFER_ENCODING) {
        let encoding = encoding.to_str().unwrap_or_default().to_ascii_lowercase();
        if encoding.split(',').any(|part| part.trim() == "chunked") {
            return Ok(BodyFraming::Chunked);
        }
    }

    match head.headers.get(CONTENT_LENGTH) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .map(BodyFraming::Length)
            .ok_or_else(|| TransportError::Protocol("Invalid Content-Length header".to_string())),
        None => Ok(BodyFraming::UntilClose),
    }
}

/// Reads more bytes into `buffer`, returning how many arrived (0 at EOF)
async fn fill(
    stream: &mut TcpStream,
    buffer: &mut BytesMut,
    max_response_size: usize,
) -> Result<usize, TransportError> {
    let mut chunk = [0u8; READ_CHUNK];
    let n = stream.read(&mut chunk).await?;
    if buffer.len() + n > max_response_size {
        return Err(TransportError::Protocol(format!(
            "Response too large: {} bytes, max allowed: {}",
            buffer.len() + n,
            max_response_size
        )));
    }
    buffer.extend_from_slice(&chunk[..n]);
    Ok(n)
}

async fn read_response(
    stream: &mut TcpStream,
    max_response_size: usize,
) -> Result<Response<Bytes>, TransportError> {
    let mut buffer = BytesMut::with_capacity(READ_CHUNK);

    let head = loop {
        if let Some(head) = parse_response_head(&buffer)? {
            break head;
        }
        if fill(stream, &mut buffer, max_response_size).await? == 0 {
            return Err(TransportError::Protocol(
                "Connection closed before response headers were received".to_string(),
            ));
        }
    };

    let framing = body_framing(&head)?;
    debug!(status = head.status.as_u16(), ?framing, "Received response head");

    let body = match framing {
        BodyFraming::Empty => Bytes::new(),
        BodyFraming::Length(len) => {
            let end = head
                .body_start
                .checked_add(len)
                .filter(|end| *end <= max_response_size)
                .ok_or_else(|| {
                    TransportError::Protocol(format!(
                        "Response too large: Content-Length {len}, max allowed: {max_response_size}"
                    ))
                })?;
            while buffer.len() < end {
                if fill(stream, &mut buffer, max_response_size).await? == 0 {
                    return Err(TransportError::Protocol(format!(
                        "Connection closed after {} of {} body bytes",
                        buffer.len() - head.body_start,
                        len
                    )));
                }
            }
            Bytes::copy_from_slice(&buffer[head.body_start..end])
        }
        BodyFraming::Chunked => {
            let mut decoder = ChunkedDecoder::new(max_response_size.saturating_sub(head.body_start));
            loop {
                if let Some(body) = decoder.decode(&buffer[head.body_start..])? {
                    break body;
                }
                if fill(stream, &mut buffer, max_response_size).await? == 0 {
                    return Err(TransportError::Protocol(
                        "Connection closed inside a chunked body".to_string(),
                    ));
                }
            }
        }
        BodyFraming::UntilClose => {
            while fill(stream, &mut buffer, max_response_size).await? > 0 {}
            Bytes::copy_from_slice(&buffer[head.body_start..])
        }
    };

    let mut response = Response::new(body);
    *response.status_mut() = head.status;
    *response.headers_mut() = head.headers;
    Ok(response)
}

/// Incremental decoder for a chunked body
///
/// `decode` is called with the whole body region received so far; the
/// region may only grow between calls. Complete chunks are consumed once,
/// so each byte is decoded a single time however the data arrives.
/// Trailers after the last chunk are ignored; the connection is closed
/// after the response anyway.
pub(crate) struct ChunkedDecoder {
    pos: usize,
    body: BytesMut,
    max_body: usize,
}

impl ChunkedDecoder {
    pub(crate) fn new(max_body: usize) -> Self {
        Self {
            pos: 0,
            body: BytesMut::new(),
            max_body,
        }
    }

    /// Returns the decoded body once the last chunk is seen, `None` while more bytes are needed
    pub(crate) fn decode(&mut self, data: &[u8]) -> Result<Option<Bytes>, TransportError> {
        loop {
            let rest = &data[self.pos..];
            let Some(line_end) = find_crlf(rest) else {
                return Ok(None);
            };
            let line = std::str::from_utf8(&rest[..line_end])
                .map_err(|_| TransportError::Protocol("Invalid chunk size line".to_string()))?;
            let size_str = line.split(';').next().unwrap_or_default().trim();
            let size = usize::from_str_radix(size_str, 16)
                .map_err(|_| TransportError::Protocol(format!("Invalid chunk size: {size_str:?}")))?;

            if size > self.max_body - self.body.len() {
                return Err(TransportError::Protocol(format!(
                    "Response too large: chunk of {size} bytes after {} decoded, max allowed: {}",
                    self.body.len(),
                    self.max_body
                )));
            }

            let data_start = line_end + 2;
            if size == 0 {
                self.pos += data_start;
                return Ok(Some(std::mem::take(&mut self.body).freeze()));
            }

            // size <= max_body, so this cannot overflow for any real buffer
            let data_end = data_start + size;
            if rest.len() < data_end + 2 {
                return Ok(None);
            }
            if &rest[data_end..data_end + 2] != b"\r\n" {
                return Err(TransportError::Protocol(
                    "Chunk data not terminated by CRLF".to_string(),
                ));
            }
            self.body.extend_from_slice(&rest[data_start..data_end]);
            self.pos += data_end + 2;
        }
    }
}

/// One-shot decode of a complete (or partial) chunked body
pub(crate) fn decode_chunked(data: &[u8], max_body: usize) -> Result<Option<Bytes>, TransportError> {
    ChunkedDecoder::new(max_body).decode(data)
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}
