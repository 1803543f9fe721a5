//! Bounded HTTP/1.x framing over blocking streams.
//!
//! Request heads are parsed with `httparse` into `http` types; the body is
//! read by `Content-Length` only. Chunked bodies are rejected.

use std::io::{self, Read, Write};

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, SERVER, TRANSFER_ENCODING};
use http::{HeaderValue, Request, Response, StatusCode, Version};
use thiserror::Error;

/// Upper bound on head plus body.
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Header slots offered to the parser.
const MAX_HEADERS: usize = 64;

/// Value of the `Server` response header.
const SERVER_HEADER: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Request carrying its raw body.
pub type HttpRequest = Request<Vec<u8>>;

/// Response carrying its encoded body.
pub type HttpResponse = Response<Vec<u8>>;

/// Errors raised while reading a request or building a response.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    TooLarge { size: usize, max_size: usize },

    #[error("malformed request head: {0}")]
    Parse(#[from] httparse::Error),

    #[error("connection closed before the request head was complete")]
    IncompleteHead,

    #[error("invalid request: {0}")]
    Http(#[from] http::Error),

    #[error("invalid Content-Length: {value}")]
    InvalidContentLength { value: String },

    #[error("unsupported Transfer-Encoding: {value}")]
    UnsupportedTransferEncoding { value: String },

    #[error("connection closed after {received} of {expected} body bytes")]
    Truncated { received: usize, expected: usize },
}

/// Reads one request from `reader`.
///
/// Returns `Ok(None)` when the peer closes before sending anything.
///
/// # Errors
///
/// Returns [`HttpError`] when the request is malformed, truncated, or larger
/// than [`MAX_REQUEST_BYTES`].
pub fn read_request<R: Read>(reader: &mut R) -> Result<Option<HttpRequest>, HttpError> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];

    let (head_len, mut request) = loop {
        if !buffer.is_empty()
            && let Some(parsed) = parse_head(&buffer)?
        {
            break parsed;
        }
        let read = read_with_retry(reader, &mut chunk)?;
        if read == 0 {
            if buffer.is_empty() {
                return Ok(None);
            }
            return Err(HttpError::IncompleteHead);
        }
        buffer.extend_from_slice(&chunk[..read]);
        enforce_limit(buffer.len())?;
    };

    reject_transfer_encoding(&request)?;
    let expected = content_length(&request)?;
    enforce_limit(head_len.saturating_add(expected))?;

    let mut body = buffer.split_off(head_len);
    body.truncate(expected);
    while body.len() < expected {
        let wanted = (expected - body.len()).min(chunk.len());
        let read = read_with_retry(reader, &mut chunk[..wanted])?;
        if read == 0 {
            return Err(HttpError::Truncated {
                received: body.len(),
                expected,
            });
        }
        body.extend_from_slice(&chunk[..read]);
    }
    *request.body_mut() = body;
    Ok(Some(request))
}

/// Parses a complete head, or returns `None` while more bytes are needed.
fn parse_head(buffer: &[u8]) -> Result<Option<(usize, HttpRequest)>, HttpError> {
    let mut slots = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Request::new(&mut slots);
    let httparse::Status::Complete(head_len) = parsed.parse(buffer)? else {
        return Ok(None);
    };

    let version = match parsed.version {
        Some(0) => Version::HTTP_10,
        _ => Version::HTTP_11,
    };
    let mut builder = Request::builder()
        .method(parsed.method.unwrap_or_default())
        .uri(parsed.path.unwrap_or_default())
        .version(version);
    for header in parsed.headers.iter() {
        builder = builder.header(header.name, header.value);
    }
    Ok(Some((head_len, builder.body(Vec::new())?)))
}

fn reject_transfer_encoding(request: &HttpRequest) -> Result<(), HttpError> {
    match request.headers().get(TRANSFER_ENCODING) {
        Some(value) if !is_identity(value) => Err(HttpError::UnsupportedTransferEncoding {
            value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
        }),
        _ => Ok(()),
    }
}

fn is_identity(value: &HeaderValue) -> bool {
    value
        .to_str()
        .is_ok_and(|text| text.trim().eq_ignore_ascii_case("identity"))
}

fn content_length(request: &HttpRequest) -> Result<usize, HttpError> {
    let Some(value) = request.headers().get(CONTENT_LENGTH) else {
        return Ok(0);
    };
    value
        .to_str()
        .ok()
        .and_then(|text| text.trim().parse::<usize>().ok())
        .ok_or_else(|| HttpError::InvalidContentLength {
            value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
        })
}

fn read_with_retry<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

fn enforce_limit(size: usize) -> Result<(), HttpError> {
    if size > MAX_REQUEST_BYTES {
        return Err(HttpError::TooLarge {
            size,
            max_size: MAX_REQUEST_BYTES,
        });
    }
    Ok(())
}

/// Header lines of `request` as owned name/value pairs, in arrival order.
#[must_use]
pub fn header_pairs(request: &HttpRequest) -> Vec<(String, String)> {
    request
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Response with a typed body.
///
/// # Errors
///
/// Returns [`HttpError::Http`] when `content_type` is not a valid header
/// value.
pub fn typed_response(
    status: StatusCode,
    content_type: &str,
    body: Vec<u8>,
) -> Result<HttpResponse, HttpError> {
    Ok(Response::builder()
        .status(status)
        .version(Version::HTTP_10)
        .header(SERVER, SERVER_HEADER)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, body.len())
        .body(body)?)
}

/// Status line only.
#[must_use]
pub fn bare_response(status: StatusCode) -> HttpResponse {
    let mut response = Response::new(Vec::new());
    *response.status_mut() = status;
    *response.version_mut() = Version::HTTP_10;
    response
}

/// Status line without the trailing CRLF.
#[must_use]
pub fn status_line(response: &HttpResponse) -> String {
    let status = response.status();
    format!(
        "HTTP/1.0 {} {}",
        status.as_str(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}

/// Serialises `response` onto `writer` and flushes it.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn write_response<W: Write>(writer: &mut W, response: &HttpResponse) -> io::Result<()> {
    let mut head = status_line(response).into_bytes();
    head.extend_from_slice(b"\r\n");
    for (name, value) in response.headers() {
        head.extend_from_slice(name.as_str().as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }
    head.extend_from_slice(b"\r\n");
    writer.write_all(&head)?;
    writer.write_all(response.body())?;
    writer.flush()
}
