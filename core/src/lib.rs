//! Client core for the customers record store demo.
//!
//! # Overview
//! An interactively driven CRUD client: establish connectivity with bounded
//! retry, then run a six-step script of REST calls against one configured
//! endpoint, accumulating each response into a fixed 2048-byte buffer and
//! walking the parsed JSON to print records or pull out the newest id.
//!
//! # Design
//! - The transport is a trait of five primitives (open, write,
//!   fetch-headers, read, close) so the request lifecycle stays explicit
//!   and tests can script it; `UreqTransport` is the real implementation.
//! - Connectivity is an event source the connection manager subscribes to
//!   for the duration of one `connect` call.
//! - The watcher and worker threads share exactly one `Gate`; there is no
//!   other shared mutable state, one request in flight at a time, no
//!   cancellation.
//! - Failures below the connectivity level are logged and reported as
//!   `ok = false`; the script always proceeds to its next gated step.

pub mod buffer;
pub mod client;
pub mod connect;
pub mod endpoint;
pub mod error;
pub mod json;
pub mod task;
pub mod transport;
pub mod types;

pub use buffer::{ResponseBuffer, MAX_OUTPUT_BUFFER};
pub use client::{HttpResult, RequestSpec, RestClient};
pub use connect::{
    connect, ConnectState, ConnectionManager, Credentials, LinkEvent, NetworkLink, SubscriptionId,
    TcpProbeLink,
};
pub use endpoint::Endpoint;
pub use error::{ClientError, ConnectError};
pub use json::{analyze, extract_max_id, extract_records, print_records, walk, NodeKind, WalkEntry};
pub use task::{watch_triggers, Gate, Orchestrator, COLLECTION_PATH, TRIGGER_BYTE};
pub use transport::{BodySpec, HttpMethod, HttpTransport, ResponseHead, UreqTransport};
pub use types::{Customer, CustomerPayload};
