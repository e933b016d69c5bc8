//! Fallible chunk storage allocation.
//!
//! The global allocator aborts on exhaustion, so chunk storage is
//! requested through `try_reserve*` instead. The trait lets tests inject
//! an allocator that fails on demand.

use std::collections::VecDeque;

use super::BodyChunk;
use crate::error::BodyError;

/// Source of storage for chunk records and chunk data.
pub trait ChunkAllocator {
    /// Reserve room for one more chunk record at the back of `chunks`.
    fn reserve_record(&mut self, chunks: &mut VecDeque<BodyChunk>) -> Result<(), BodyError> {
        chunks.try_reserve(1)?;
        Ok(())
    }

    /// Copy `data` into newly allocated, exclusively owned storage.
    fn copy_data(&mut self, data: &[u8]) -> Result<Vec<u8>, BodyError>;
}

/// Allocates from the global heap, reporting exhaustion as an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl ChunkAllocator for SystemAllocator {
    fn copy_data(&mut self, data: &[u8]) -> Result<Vec<u8>, BodyError> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(data.len())
            .map_err(|_| BodyError::Alloc {
                requested: data.len(),
            })?;
        storage.extend_from_slice(data);
        Ok(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_copy() {
        let mut alloc = SystemAllocator;
        let copy = alloc.copy_data(b"payload").unwrap();
        assert_eq!(copy, b"payload");
        assert!(copy.capacity() >= 7);
    }

    #[test]
    fn test_system_reserve_record() {
        let mut alloc = SystemAllocator;
        let mut chunks = VecDeque::new();
        alloc.reserve_record(&mut chunks).unwrap();
        assert!(chunks.capacity() >= 1);
        assert!(chunks.is_empty());
    }
}
