//! Fixed-capacity accumulator for response bodies.
//!
//! # Design
//! The buffer is sized once and never grows. A response that does not fit is
//! an error for that request, not a truncation — resizing would silently
//! change the failure semantics the rest of the client is written against.
//! The logical text content of a response is exactly the consumed prefix;
//! bytes past `len` are never exposed.

use crate::error::ClientError;

/// Capacity of a response buffer, in bytes.
pub const MAX_OUTPUT_BUFFER: usize = 2048;

/// Accumulates a response body written in one or more chunks.
///
/// Allocated per request and dropped when the request returns, on success
/// and failure alike.
pub struct ResponseBuffer {
    data: Box<[u8; MAX_OUTPUT_BUFFER]>,
    len: usize,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self {
            data: Box::new([0; MAX_OUTPUT_BUFFER]),
            len: 0,
        }
    }

    /// Append a chunk. Fails with `Overflow` when the chunk would not fit;
    /// the already-consumed prefix is left intact.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), ClientError> {
        if self.len + chunk.len() > MAX_OUTPUT_BUFFER {
            return Err(ClientError::Overflow {
                capacity: MAX_OUTPUT_BUFFER,
            });
        }
        self.data[self.len..self.len + chunk.len()].copy_from_slice(chunk);
        self.len += chunk.len();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        MAX_OUTPUT_BUFFER
    }

    /// The consumed bytes, and nothing past them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The consumed bytes as text.
    pub fn as_str(&self) -> Result<&str, ClientError> {
        std::str::from_utf8(self.as_bytes()).map_err(|e| ClientError::Utf8(e.to_string()))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data[..self.len].to_vec()
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_chunks_in_order() {
        let mut buffer = ResponseBuffer::new();
        buffer.write(b"[{\"id\":1,").unwrap();
        buffer.write(b"\"name\":\"Tom\"}]").unwrap();
        assert_eq!(buffer.as_bytes(), b"[{\"id\":1,\"name\":\"Tom\"}]");
        assert_eq!(buffer.len(), 23);
    }

    #[test]
    fn fill_to_exact_capacity_is_ok() {
        let mut buffer = ResponseBuffer::new();
        buffer.write(&[b'x'; MAX_OUTPUT_BUFFER]).unwrap();
        assert_eq!(buffer.len(), MAX_OUTPUT_BUFFER);
    }

    #[test]
    fn one_byte_past_capacity_overflows() {
        let mut buffer = ResponseBuffer::new();
        buffer.write(&[b'x'; MAX_OUTPUT_BUFFER]).unwrap();
        let err = buffer.write(b"y").unwrap_err();
        assert!(matches!(err, ClientError::Overflow { capacity: MAX_OUTPUT_BUFFER }));
        // The prefix consumed so far stays intact.
        assert_eq!(buffer.len(), MAX_OUTPUT_BUFFER);
    }

    #[test]
    fn oversized_single_chunk_overflows() {
        let mut buffer = ResponseBuffer::new();
        let err = buffer.write(&[0; MAX_OUTPUT_BUFFER + 1]).unwrap_err();
        assert!(matches!(err, ClientError::Overflow { .. }));
        assert!(buffer.is_empty());
    }

    #[test]
    fn empty_chunk_on_full_buffer_is_ok() {
        let mut buffer = ResponseBuffer::new();
        buffer.write(&[0; MAX_OUTPUT_BUFFER]).unwrap();
        buffer.write(b"").unwrap();
    }

    #[test]
    fn as_str_covers_only_consumed_bytes() {
        let mut buffer = ResponseBuffer::new();
        buffer.write(b"hello").unwrap();
        assert_eq!(buffer.as_str().unwrap(), "hello");
    }

    #[test]
    fn as_str_rejects_invalid_utf8() {
        let mut buffer = ResponseBuffer::new();
        buffer.write(&[0xff, 0xfe]).unwrap();
        assert!(matches!(buffer.as_str().unwrap_err(), ClientError::Utf8(_)));
    }

    #[test]
    fn into_bytes_returns_consumed_prefix() {
        let mut buffer = ResponseBuffer::new();
        buffer.write(b"abc").unwrap();
        assert_eq!(buffer.into_bytes(), b"abc".to_vec());
    }
}
