//! Streaming body chunk buffer
//!
//! Body fragments are stored as they arrive, one chunk per append, each
//! stamped with its absolute offset in the reassembled body stream.
//! Chunks are released from the front once the downstream inspector's
//! parsed offset has moved past them, so memory stays bounded by the
//! unconsumed tail of the body no matter how large the body grows.

pub mod alloc;
pub mod buffer;
pub mod chunk;
pub mod dump;

pub use alloc::{ChunkAllocator, SystemAllocator};
pub use buffer::BodyBuffer;
pub use chunk::BodyChunk;
pub use dump::{Dump, DumpEntry};
