//! Ordered chunk buffer with watermark pruning.
//!
//! Chunks are contiguous: each one starts where the previous one ended,
//! and the running total of appended bytes always equals the end offset
//! of the last appended chunk. Pruning never rewinds that total, so
//! offsets of later chunks stay absolute after earlier ones are gone.

use std::collections::VecDeque;

use log::debug;

use super::alloc::{ChunkAllocator, SystemAllocator};
use super::dump::Dump;
use super::BodyChunk;
use crate::error::BodyError;

/// Body chunks for one transaction direction.
#[derive(Debug)]
pub struct BodyBuffer<A = SystemAllocator> {
    /// Front is the head (oldest), back is the tail.
    chunks: VecDeque<BodyChunk>,
    /// Bytes ever appended; stream offset of the next chunk.
    total_appended: u64,
    /// Sequence id handed to the next chunk.
    next_sequence_id: u32,
    allocator: A,
}

impl BodyBuffer<SystemAllocator> {
    /// Create an empty buffer backed by the global heap.
    pub fn new() -> Self {
        Self::with_allocator(SystemAllocator)
    }
}

impl Default for BodyBuffer<SystemAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ChunkAllocator> BodyBuffer<A> {
    /// Create an empty buffer that draws chunk storage from `allocator`.
    pub fn with_allocator(allocator: A) -> Self {
        Self {
            chunks: VecDeque::new(),
            total_appended: 0,
            next_sequence_id: 0,
            allocator,
        }
    }

    /// Append a copy of `data` as a new chunk at the tail.
    ///
    /// Absent or empty data is accepted and ignored. On allocation failure
    /// nothing is linked in and the offset bookkeeping is untouched.
    pub fn append(&mut self, data: Option<&[u8]>) -> Result<(), BodyError> {
        let data = match data {
            Some(data) if !data.is_empty() => data,
            _ => return Ok(()),
        };

        // A reserved slot with no chunk pushed into it is not observable.
        self.allocator.reserve_record(&mut self.chunks)?;
        let storage = self.allocator.copy_data(data)?;

        let chunk = BodyChunk::new(storage, self.total_appended, self.next_sequence_id);
        debug!(
            "Body {:p}; chunk id: {}, offset {}, len {}",
            self,
            chunk.sequence_id(),
            chunk.stream_offset(),
            chunk.len()
        );

        self.chunks.push_back(chunk);
        self.total_appended += data.len() as u64;
        self.next_sequence_id = self.next_sequence_id.wrapping_add(1);
        Ok(())
    }

    /// Shorthand for `append(Some(data))`.
    pub fn append_slice(&mut self, data: &[u8]) -> Result<(), BodyError> {
        self.append(Some(data))
    }

    /// Release chunks the consumer is done with.
    ///
    /// Removal stops at the first chunk whose end offset is `>=
    /// parsed_offset`; that chunk and everything after it are retained.
    /// `parsed_offset` must not decrease between calls; this is not
    /// checked.
    pub fn prune(&mut self, parsed_offset: u64) {
        if parsed_offset == 0 || self.chunks.is_empty() {
            return;
        }

        let before = self.chunks.len();
        while let Some(head) = self.chunks.front() {
            if head.end_offset() >= parsed_offset {
                break;
            }
            self.chunks.pop_front();
        }

        let released = before - self.chunks.len();
        if released > 0 {
            debug!(
                "Body {:p}; pruned {} chunks below offset {}, {} remain",
                self,
                released,
                parsed_offset,
                self.chunks.len()
            );
        }
    }

    /// Release every remaining chunk regardless of consumption.
    ///
    /// Safe to call on an empty buffer.
    pub fn free(&mut self) {
        if self.chunks.is_empty() {
            return;
        }
        if let Some(last) = self.chunks.back() {
            debug!(
                "Body {:p}; freeing {} chunks, last chunk id: {}, len {}",
                self,
                self.chunks.len(),
                last.sequence_id(),
                last.len()
            );
        }
        self.chunks.clear();
        self.chunks.shrink_to_fit();
    }

    /// Walk the chunks in stream order without touching them.
    ///
    /// When `enabled` is false the returned iterator is empty.
    pub fn dump(&self, enabled: bool) -> Dump<'_> {
        Dump::new(self.chunks.iter(), enabled)
    }

    /// Number of live chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Running total of bytes appended over the buffer's lifetime.
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Bytes currently held in live chunks.
    pub fn buffered_len(&self) -> usize {
        self.chunks.iter().map(BodyChunk::len).sum()
    }

    /// Stream offset of the head chunk, or of the next append when empty.
    pub fn start_offset(&self) -> u64 {
        self.chunks
            .front()
            .map_or(self.total_appended, BodyChunk::stream_offset)
    }

    pub fn first(&self) -> Option<&BodyChunk> {
        self.chunks.front()
    }

    pub fn last(&self) -> Option<&BodyChunk> {
        self.chunks.back()
    }

    /// Chunks in stream order.
    pub fn iter(&self) -> impl Iterator<Item = &BodyChunk> {
        self.chunks.iter()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn offsets_are_contiguous(parts in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..32)) {
            let mut buffer = BodyBuffer::new();
            for part in &parts {
                buffer.append_slice(part).unwrap();
            }

            let non_empty: Vec<&Vec<u8>> = parts.iter().filter(|p| !p.is_empty()).collect();
            prop_assert_eq!(buffer.chunk_count(), non_empty.len());

            let mut expected = 0u64;
            for (entry, part) in buffer.dump(true).zip(&non_empty) {
                prop_assert_eq!(entry.stream_offset, expected);
                prop_assert_eq!(entry.data, part.as_slice());
                expected += part.len() as u64;
            }
            prop_assert_eq!(buffer.total_appended(), expected);
        }

        #[test]
        fn prune_keeps_exactly_unconsumed_chunks(
            lengths in prop::collection::vec(1usize..50, 1..20),
            watermark in 0u64..1200,
        ) {
            let mut buffer = BodyBuffer::new();
            for len in &lengths {
                buffer.append_slice(&vec![0xAB; *len]).unwrap();
            }
            let all: Vec<BodyChunk> = buffer.iter().cloned().collect();

            buffer.prune(watermark);

            let kept: Vec<BodyChunk> = buffer.iter().cloned().collect();
            let expected: Vec<BodyChunk> = if watermark == 0 {
                all
            } else {
                all.into_iter()
                    .skip_while(|c| c.end_offset() < watermark)
                    .collect()
            };
            prop_assert_eq!(kept, expected);
            prop_assert_eq!(buffer.is_empty(), buffer.first().is_none());
        }
    }
}
