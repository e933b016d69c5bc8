//! Downstream body inspection
//!
//! The inspector reads buffered chunks through the buffer's dump view and
//! reports how far it got. That offset becomes the direction's parsed
//! watermark, which in turn decides what the buffer may prune.
//! Matching is FSM based (no regex): O(1) per byte, constant memory,
//! case-insensitive, and state carries across chunk boundaries.

pub mod body_inspector;
pub mod pattern_fsm;

pub use body_inspector::{BodyInspector, Inspection, Verdict};
pub use pattern_fsm::{Pattern, PatternMatch, PatternScanner, PatternState, ScanResult};
