//! Error types for the customers client.
//!
//! # Design
//! Transport-class failures (`Transport`, `ShortWrite`, `Overflow`,
//! `InvalidContentLength`) are local to a single request: the client logs
//! them and reports `ok = false`, and the scripted demo moves on to its next
//! step. `Shape` is local to one extraction call. `ConnectError` is the one
//! fatal class — without connectivity the script cannot run at all.

use std::fmt;

/// Errors raised while executing a request or extracting records from a
/// response.
#[derive(Debug)]
pub enum ClientError {
    /// Opening, writing, header fetch or body read failed at the transport.
    Transport(String),

    /// The request body could not be written in full.
    ShortWrite { expected: usize, written: usize },

    /// The response body did not fit the fixed-capacity buffer.
    Overflow { capacity: usize },

    /// The server announced a negative content length.
    InvalidContentLength(i64),

    /// The JSON response does not match the expected record shape.
    Shape(String),

    /// The request payload could not be serialized to JSON.
    Serialization(String),

    /// The response body is not valid UTF-8 text.
    Utf8(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(msg) => write!(f, "transport error: {msg}"),
            ClientError::ShortWrite { expected, written } => {
                write!(f, "short write: {written} of {expected} bytes")
            }
            ClientError::Overflow { capacity } => {
                write!(f, "response exceeds the {capacity}-byte buffer")
            }
            ClientError::InvalidContentLength(len) => {
                write!(f, "negative content length: {len}")
            }
            ClientError::Shape(msg) => write!(f, "unexpected response shape: {msg}"),
            ClientError::Serialization(msg) => write!(f, "serialization failed: {msg}"),
            ClientError::Utf8(msg) => write!(f, "response is not UTF-8: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

/// Errors raised while establishing connectivity. Fatal to the run.
#[derive(Debug)]
pub enum ConnectError {
    /// Every allowed attempt failed; the caller must not issue requests.
    RetriesExceeded { attempts: u32 },

    /// The connectivity event source went away mid-call.
    LinkClosed,
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::RetriesExceeded { attempts } => {
                write!(f, "connection failed after {attempts} retries")
            }
            ConnectError::LinkClosed => write!(f, "connectivity event source closed"),
        }
    }
}

impl std::error::Error for ConnectError {}
