//! Read-only view over buffered chunks for diagnostics.
//!
//! Producing the view has no side effects. Rendering is left to the
//! caller (see [`crate::telemetry::render_dump`]).

use std::collections::vec_deque;
use std::iter::FusedIterator;

use super::BodyChunk;

/// One dumped chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpEntry<'a> {
    pub sequence_id: u32,
    pub stream_offset: u64,
    pub length: usize,
    pub data: &'a [u8],
}

impl DumpEntry<'_> {
    /// End offset (exclusive).
    pub fn end_offset(&self) -> u64 {
        self.stream_offset + self.length as u64
    }
}

impl<'a> From<&'a BodyChunk> for DumpEntry<'a> {
    fn from(chunk: &'a BodyChunk) -> Self {
        Self {
            sequence_id: chunk.sequence_id(),
            stream_offset: chunk.stream_offset(),
            length: chunk.len(),
            data: chunk.data(),
        }
    }
}

/// Lazy iterator returned by [`BodyBuffer::dump`](super::BodyBuffer::dump).
///
/// Yields nothing when the dump was not enabled.
#[derive(Debug, Clone)]
pub struct Dump<'a> {
    inner: Option<vec_deque::Iter<'a, BodyChunk>>,
}

impl<'a> Dump<'a> {
    pub(crate) fn new(chunks: vec_deque::Iter<'a, BodyChunk>, enabled: bool) -> Self {
        Self {
            inner: enabled.then_some(chunks),
        }
    }
}

impl<'a> Iterator for Dump<'a> {
    type Item = DumpEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.as_mut()?.next().map(DumpEntry::from)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            Some(iter) => iter.size_hint(),
            None => (0, Some(0)),
        }
    }
}

impl ExactSizeIterator for Dump<'_> {}

impl FusedIterator for Dump<'_> {}
