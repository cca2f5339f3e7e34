//! The streaming REST client.
//!
//! # Design
//! `execute` drives the whole request lifecycle against the transport
//! primitives: join the URL, open, write the body in full, fetch headers,
//! read the body chunk by chunk into a fixed-capacity `ResponseBuffer`, and
//! always close. Any failed step makes the result `ok = false`; the caller
//! decides what that means for its script. The connection is released on
//! every exit path because the handle is owned here and closed after the
//! drive result is known.

use tracing::{debug, warn};

use crate::buffer::ResponseBuffer;
use crate::endpoint::Endpoint;
use crate::error::ClientError;
use crate::transport::{BodySpec, HttpMethod, HttpTransport};

const CONTENT_TYPE_JSON: &str = "application/json";

/// How much of the response is asked for per underlying read.
const READ_CHUNK: usize = 256;

/// One request, described before execution. `path` is relative to the
/// endpoint; it must not carry the scheme or host.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Vec<u8>>,
    pub content_type: Option<&'static str>,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            body: None,
            content_type: None,
        }
    }

    pub fn with_json_body(method: HttpMethod, path: &str, body: &[u8]) -> Self {
        Self {
            method,
            path: path.to_string(),
            body: Some(body.to_vec()),
            content_type: Some(CONTENT_TYPE_JSON),
        }
    }
}

/// Outcome of one request. `ok` is true only when open, write, header fetch
/// and the buffered read all succeeded; `status` is 0 when the failure came
/// before headers were fetched.
#[derive(Debug, Clone)]
pub struct HttpResult {
    pub status: u16,
    pub body: Vec<u8>,
    pub ok: bool,
}

/// Issues method-specific requests against one configured endpoint, one at
/// a time.
pub struct RestClient<T: HttpTransport> {
    endpoint: Endpoint,
    transport: T,
}

impl<T: HttpTransport> RestClient<T> {
    pub fn new(endpoint: Endpoint, transport: T) -> Self {
        Self { endpoint, transport }
    }

    pub fn get(&mut self, path: &str) -> HttpResult {
        self.execute(&RequestSpec::new(HttpMethod::Get, path))
    }

    pub fn post(&mut self, path: &str, body: &[u8]) -> HttpResult {
        self.execute(&RequestSpec::with_json_body(HttpMethod::Post, path, body))
    }

    pub fn put(&mut self, path: &str, body: &[u8]) -> HttpResult {
        self.execute(&RequestSpec::with_json_body(HttpMethod::Put, path, body))
    }

    pub fn delete(&mut self, path: &str) -> HttpResult {
        self.execute(&RequestSpec::new(HttpMethod::Delete, path))
    }

    pub fn execute(&mut self, spec: &RequestSpec) -> HttpResult {
        let url = self.endpoint.url_for(&spec.path);
        debug!(method = spec.method.as_str(), url = %url, "issuing request");
        match self.try_execute(spec, &url) {
            Ok((status, buffer)) => {
                debug!(status, content_length = buffer.len(), "request complete");
                HttpResult {
                    status,
                    body: buffer.into_bytes(),
                    ok: true,
                }
            }
            Err(err) => {
                warn!(method = spec.method.as_str(), url = %url, error = %err, "request failed");
                HttpResult {
                    status: 0,
                    body: Vec::new(),
                    ok: false,
                }
            }
        }
    }

    fn try_execute(
        &mut self,
        spec: &RequestSpec,
        url: &str,
    ) -> Result<(u16, ResponseBuffer), ClientError> {
        let content = spec.body.as_ref().map(|body| BodySpec {
            len: body.len(),
            content_type: spec.content_type.unwrap_or(CONTENT_TYPE_JSON),
        });
        let mut handle = self.transport.open(spec.method, url, content)?;
        let outcome = self.drive(&mut handle, spec);
        self.transport.close(handle);
        outcome
    }

    fn drive(
        &mut self,
        handle: &mut T::Handle,
        spec: &RequestSpec,
    ) -> Result<(u16, ResponseBuffer), ClientError> {
        if let Some(body) = &spec.body {
            // The body goes out in one call; a partial write is fatal for
            // this request, never silently retried.
            let written = self.transport.write(handle, body)?;
            if written != body.len() {
                return Err(ClientError::ShortWrite {
                    expected: body.len(),
                    written,
                });
            }
        }
        let head = self.transport.fetch_headers(handle)?;
        debug!(status = head.status, content_length = ?head.content_length, "headers fetched");

        let mut buffer = ResponseBuffer::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = self.transport.read(handle, &mut chunk)?;
            if n == 0 {
                break;
            }
            buffer.write(&chunk[..n])?;
        }
        Ok((head.status, buffer))
    }
}
