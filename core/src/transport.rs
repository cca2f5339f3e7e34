//! The HTTP transport boundary.
//!
//! # Design
//! The client drives every request through five primitives — open, write,
//! fetch-headers, read, close — keyed by an opaque per-request handle, so
//! the request lifecycle stays explicit and a scripted transport can stand
//! in for the network in tests. `UreqTransport` is the production
//! implementation: `open` and `write` stage the request, `fetch_headers`
//! performs the round-trip through a shared `ureq::Agent`, and `read`
//! streams the body so the caller can accumulate it chunk by chunk into a
//! bounded buffer.

use std::io::Read;

use ureq::http::header::CONTENT_LENGTH;
use ureq::http::HeaderValue;
use ureq::Agent;

use crate::error::ClientError;

/// HTTP method for a request. Exactly the four the client supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Body metadata declared when opening a request. The transport needs the
/// length before the first write for a non-chunked body.
#[derive(Debug, Clone, Copy)]
pub struct BodySpec {
    pub len: usize,
    pub content_type: &'static str,
}

/// Status line and content length as fetched after the request is sent.
#[derive(Debug, Clone, Copy)]
pub struct ResponseHead {
    pub status: u16,
    pub content_length: Option<u64>,
}

/// The five request primitives the client is written against.
///
/// One request is in flight per handle; the client opens, drives and closes
/// a handle within a single call frame.
pub trait HttpTransport {
    type Handle;

    /// Open a connection for `method` against `url`, declaring the body
    /// length and content type up front when there is one.
    fn open(
        &mut self,
        method: HttpMethod,
        url: &str,
        content: Option<BodySpec>,
    ) -> Result<Self::Handle, ClientError>;

    /// Write part of the request body, returning how many bytes were taken.
    fn write(&mut self, handle: &mut Self::Handle, buf: &[u8]) -> Result<usize, ClientError>;

    /// Send the request and fetch the response status and content length.
    fn fetch_headers(&mut self, handle: &mut Self::Handle) -> Result<ResponseHead, ClientError>;

    /// Read the next piece of the response body; `Ok(0)` means the stream
    /// is complete.
    fn read(&mut self, handle: &mut Self::Handle, buf: &mut [u8]) -> Result<usize, ClientError>;

    /// Release the connection. Called on success and failure alike.
    fn close(&mut self, handle: Self::Handle);
}

/// Per-request state for `UreqTransport`.
pub struct UreqHandle {
    method: HttpMethod,
    url: String,
    content: Option<BodySpec>,
    staged: Vec<u8>,
    reader: Option<Box<dyn Read>>,
}

/// Production transport over a shared `ureq::Agent`.
///
/// Status codes are returned as data rather than errors so the client can
/// report them alongside `ok`.
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for UreqTransport {
    type Handle = UreqHandle;

    fn open(
        &mut self,
        method: HttpMethod,
        url: &str,
        content: Option<BodySpec>,
    ) -> Result<UreqHandle, ClientError> {
        Ok(UreqHandle {
            method,
            url: url.to_string(),
            content,
            staged: Vec::new(),
            reader: None,
        })
    }

    fn write(&mut self, handle: &mut UreqHandle, buf: &[u8]) -> Result<usize, ClientError> {
        let Some(content) = handle.content else {
            return Err(ClientError::Transport(
                "write on a request with no declared body".to_string(),
            ));
        };
        if handle.staged.len() + buf.len() > content.len {
            return Err(ClientError::Transport(format!(
                "body exceeds the declared length of {} bytes",
                content.len
            )));
        }
        handle.staged.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn fetch_headers(&mut self, handle: &mut UreqHandle) -> Result<ResponseHead, ClientError> {
        if let Some(content) = handle.content {
            if handle.staged.len() != content.len {
                return Err(ClientError::ShortWrite {
                    expected: content.len,
                    written: handle.staged.len(),
                });
            }
        }
        let response = match handle.method {
            HttpMethod::Get => self.agent.get(&handle.url).call(),
            HttpMethod::Delete => self.agent.delete(&handle.url).call(),
            HttpMethod::Post => {
                let mut request = self.agent.post(&handle.url);
                if let Some(content) = handle.content {
                    request = request.content_type(content.content_type);
                }
                request.send(&handle.staged[..])
            }
            HttpMethod::Put => {
                let mut request = self.agent.put(&handle.url);
                if let Some(content) = handle.content {
                    request = request.content_type(content.content_type);
                }
                request.send(&handle.staged[..])
            }
        }
        .map_err(|e| ClientError::Transport(e.to_string()))?;

        let (parts, body) = response.into_parts();
        let content_length = parse_content_length(parts.headers.get(CONTENT_LENGTH))?;
        handle.reader = Some(Box::new(body.into_reader()));
        Ok(ResponseHead {
            status: parts.status.as_u16(),
            content_length,
        })
    }

    fn read(&mut self, handle: &mut UreqHandle, buf: &mut [u8]) -> Result<usize, ClientError> {
        let Some(reader) = handle.reader.as_mut() else {
            return Err(ClientError::Transport(
                "read before headers were fetched".to_string(),
            ));
        };
        reader.read(buf).map_err(|e| ClientError::Transport(e.to_string()))
    }

    fn close(&mut self, handle: UreqHandle) {
        tracing::trace!(url = %handle.url, "request released");
    }
}

/// A `Content-Length` that parses negative is a header-fetch failure, not a
/// retry trigger. An absent header means read-until-EOF.
fn parse_content_length(value: Option<&HeaderValue>) -> Result<Option<u64>, ClientError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let text = value
        .to_str()
        .map_err(|_| ClientError::Transport("unreadable content-length header".to_string()))?;
    let len: i64 = text
        .trim()
        .parse()
        .map_err(|_| ClientError::Transport(format!("unparseable content-length: {text}")))?;
    if len < 0 {
        return Err(ClientError::InvalidContentLength(len));
    }
    Ok(Some(len as u64))
}
