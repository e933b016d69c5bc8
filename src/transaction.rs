//! Per-transaction body state
//!
//! A transaction owns one body buffer per message direction together
//! with that direction's parsed-offset watermark. The watermark is only
//! ever moved forward here, which is what the buffer's prune relies on.

use serde::Serialize;

use crate::body::{BodyBuffer, ChunkAllocator, SystemAllocator};
use crate::error::BodyError;

/// Message direction within a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Request,
    Response,
}

/// Which direction is currently accumulating body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyOperation {
    #[default]
    None,
    Request,
    Response,
}

impl From<Direction> for BodyOperation {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Request => BodyOperation::Request,
            Direction::Response => BodyOperation::Response,
        }
    }
}

/// Body buffer and consumer watermark for one direction.
#[derive(Debug)]
pub struct TxBody<A = SystemAllocator> {
    buffer: BodyBuffer<A>,
    body_parsed: u64,
    operation: BodyOperation,
}

impl Default for TxBody<SystemAllocator> {
    fn default() -> Self {
        Self::with_allocator(SystemAllocator)
    }
}

impl<A: ChunkAllocator> TxBody<A> {
    pub fn with_allocator(allocator: A) -> Self {
        Self {
            buffer: BodyBuffer::with_allocator(allocator),
            body_parsed: 0,
            operation: BodyOperation::None,
        }
    }

    pub fn buffer(&self) -> &BodyBuffer<A> {
        &self.buffer
    }

    /// Offset up to which the inspector has consumed this body.
    pub fn body_parsed(&self) -> u64 {
        self.body_parsed
    }

    pub fn operation(&self) -> BodyOperation {
        self.operation
    }
}

/// Body state for one request/response exchange.
#[derive(Debug)]
pub struct Transaction<A = SystemAllocator> {
    id: u32,
    request: TxBody<A>,
    response: TxBody<A>,
}

impl Transaction<SystemAllocator> {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            request: TxBody::default(),
            response: TxBody::default(),
        }
    }
}

impl<A: ChunkAllocator> Transaction<A> {
    /// Build a transaction whose buffers draw from the given allocators.
    pub fn with_allocators(id: u32, request: A, response: A) -> Self {
        Self {
            id,
            request: TxBody::with_allocator(request),
            response: TxBody::with_allocator(response),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn body(&self, direction: Direction) -> &TxBody<A> {
        match direction {
            Direction::Request => &self.request,
            Direction::Response => &self.response,
        }
    }

    fn body_mut(&mut self, direction: Direction) -> &mut TxBody<A> {
        match direction {
            Direction::Request => &mut self.request,
            Direction::Response => &mut self.response,
        }
    }

    /// Append a newly reassembled body fragment for `direction`.
    ///
    /// The direction is marked as accumulating only once a non-empty
    /// fragment has been stored.
    pub fn append(&mut self, direction: Direction, data: &[u8]) -> Result<(), BodyError> {
        let body = self.body_mut(direction);
        body.buffer.append(Some(data))?;
        if !data.is_empty() {
            body.operation = direction.into();
        }
        Ok(())
    }

    /// Move the parsed watermark forward. Smaller values are ignored.
    pub fn set_body_parsed(&mut self, direction: Direction, offset: u64) {
        let body = self.body_mut(direction);
        body.body_parsed = body.body_parsed.max(offset);
    }

    /// Release chunks of `direction` that lie fully below its watermark.
    pub fn prune(&mut self, direction: Direction) {
        let body = self.body_mut(direction);
        body.buffer.prune(body.body_parsed);
    }

    /// Release all buffered chunks of one direction.
    pub fn free_body(&mut self, direction: Direction) {
        let body = self.body_mut(direction);
        body.buffer.free();
        body.operation = BodyOperation::None;
    }

    /// Release all buffered chunks of both directions.
    pub fn free(&mut self) {
        self.free_body(Direction::Request);
        self.free_body(Direction::Response);
    }

    /// Running total of body bytes seen in `direction`.
    pub fn content_len_so_far(&self, direction: Direction) -> u64 {
        self.body(direction).buffer.total_appended()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyChunk;
    use std::collections::VecDeque;

    struct NoMemory;

    impl ChunkAllocator for NoMemory {
        fn reserve_record(&mut self, _: &mut VecDeque<BodyChunk>) -> Result<(), BodyError> {
            Err(BodyError::Alloc { requested: 0 })
        }

        fn copy_data(&mut self, data: &[u8]) -> Result<Vec<u8>, BodyError> {
            Err(BodyError::Alloc {
                requested: data.len(),
            })
        }
    }

    #[test]
    fn test_empty_fragment_leaves_operation_unset() {
        let mut tx = Transaction::new(2);
        tx.append(Direction::Request, b"").unwrap();
        assert_eq!(tx.body(Direction::Request).operation(), BodyOperation::None);

        tx.append(Direction::Request, b"x").unwrap();
        assert_eq!(tx.body(Direction::Request).operation(), BodyOperation::Request);
    }

    #[test]
    fn test_failed_append_leaves_operation_unset() {
        let mut tx = Transaction::with_allocators(4, NoMemory, NoMemory);
        let err = tx.append(Direction::Response, b"body").unwrap_err();
        assert_eq!(err, BodyError::Alloc { requested: 0 });

        let body = tx.body(Direction::Response);
        assert_eq!(body.operation(), BodyOperation::None);
        assert!(body.buffer().is_empty());
        assert_eq!(tx.content_len_so_far(Direction::Response), 0);
    }

    #[test]
    fn test_directions_are_independent() {
        let mut tx = Transaction::new(7);
        tx.append(Direction::Request, b"GET body").unwrap();
        tx.append(Direction::Response, b"resp").unwrap();
        tx.append(Direction::Response, b"onse").unwrap();

        assert_eq!(tx.body(Direction::Request).buffer().chunk_count(), 1);
        assert_eq!(tx.body(Direction::Response).buffer().chunk_count(), 2);
        assert_eq!(tx.content_len_so_far(Direction::Request), 8);
        assert_eq!(tx.content_len_so_far(Direction::Response), 8);
        assert_eq!(
            tx.body(Direction::Response).operation(),
            BodyOperation::Response
        );
    }

    #[test]
    fn test_watermark_never_regresses() {
        let mut tx = Transaction::new(1);
        tx.set_body_parsed(Direction::Request, 40);
        tx.set_body_parsed(Direction::Request, 10);
        assert_eq!(tx.body(Direction::Request).body_parsed(), 40);
        assert_eq!(tx.body(Direction::Response).body_parsed(), 0);
    }

    #[test]
    fn test_prune_uses_direction_watermark() {
        let mut tx = Transaction::new(1);
        for part in [&b"0123456789"[..], b"abcdefghij", b"KLMNO"] {
            tx.append(Direction::Request, part).unwrap();
            tx.append(Direction::Response, part).unwrap();
        }

        tx.set_body_parsed(Direction::Request, 21);
        tx.prune(Direction::Request);
        tx.prune(Direction::Response);

        let request = tx.body(Direction::Request).buffer();
        assert_eq!(request.chunk_count(), 1);
        assert_eq!(request.first().unwrap().data(), b"KLMNO");
        assert_eq!(tx.body(Direction::Response).buffer().chunk_count(), 3);
    }

    #[test]
    fn test_free_resets_operation() {
        let mut tx = Transaction::new(3);
        tx.append(Direction::Request, b"abc").unwrap();
        tx.append(Direction::Response, b"def").unwrap();

        tx.free();
        for direction in [Direction::Request, Direction::Response] {
            let body = tx.body(direction);
            assert!(body.buffer().is_empty());
            assert_eq!(body.operation(), BodyOperation::None);
        }

        tx.free();
        assert_eq!(tx.content_len_so_far(Direction::Request), 3);
    }
}
