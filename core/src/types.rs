//! Domain DTOs for the customers API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined
//! independently; the integration tests catch schema drift between the two
//! crates. Ids are server-assigned integers — the client never invents one.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// A single customer record returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub gender: i64,
}

/// Request payload for creating or replacing a record. Serializes to
/// `{"name": <string>, "gender": <integer>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerPayload {
    pub name: String,
    pub gender: i64,
}

impl CustomerPayload {
    pub fn new(name: &str, gender: i64) -> Self {
        Self {
            name: name.to_string(),
            gender,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ClientError> {
        serde_json::to_vec(self).map_err(|e| ClientError::Serialization(e.to_string()))
    }
}
