//! A single buffered body fragment.

use std::fmt;
use std::ops::Range;

/// One append call's worth of body bytes.
///
/// Chunks are immutable once created. The data is owned by the chunk and
/// never aliased elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyChunk {
    data: Vec<u8>,
    stream_offset: u64,
    sequence_id: u32,
}

impl BodyChunk {
    /// Only [`BodyBuffer`](super::BodyBuffer) creates chunks, and never
    /// with empty data.
    pub(crate) fn new(data: Vec<u8>, stream_offset: u64, sequence_id: u32) -> Self {
        debug_assert!(!data.is_empty());
        Self {
            data,
            stream_offset,
            sequence_id,
        }
    }

    /// Chunk bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes in the chunk (always > 0).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; kept for the `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Absolute offset of the first byte within the body stream.
    pub fn stream_offset(&self) -> u64 {
        self.stream_offset
    }

    /// Ordinal assigned at append time. Diagnostic only.
    pub fn sequence_id(&self) -> u32 {
        self.sequence_id
    }

    /// End offset (exclusive).
    pub fn end_offset(&self) -> u64 {
        self.stream_offset + self.data.len() as u64
    }

    /// Stream range covered by this chunk.
    pub fn range(&self) -> Range<u64> {
        self.stream_offset..self.end_offset()
    }
}

impl fmt::Display for BodyChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chunk(id={}, {} bytes @ {})",
            self.sequence_id,
            self.len(),
            self.stream_offset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets() {
        let chunk = BodyChunk::new(b"hello".to_vec(), 100, 3);
        assert_eq!(chunk.len(), 5);
        assert!(!chunk.is_empty());
        assert_eq!(chunk.stream_offset(), 100);
        assert_eq!(chunk.end_offset(), 105);
        assert_eq!(chunk.range(), 100..105);
        assert_eq!(chunk.sequence_id(), 3);
    }

    #[test]
    fn test_display() {
        let chunk = BodyChunk::new(b"hello".to_vec(), 100, 2);
        let s = chunk.to_string();
        assert!(s.contains("id=2"));
        assert!(s.contains("5 bytes @ 100"));
    }
}
