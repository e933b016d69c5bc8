//! Per-stream body pipeline
//!
//! Drives one transaction's buffers: every body callback appends the new
//! fragment, runs the direction's inspector over the unconsumed tail,
//! advances the parsed watermark and prunes. Kept free of proxy-wasm host
//! calls so the HTTP context only has to fetch bytes and act on the
//! returned [`BodyAction`].

use log::{debug, warn};

use crate::body::{ChunkAllocator, SystemAllocator};
use crate::config::FilterConfig;
use crate::error::BodyError;
use crate::inspect::{BodyInspector, PatternMatch, Verdict};
use crate::telemetry::{audit_alloc_failure, audit_blocked, render_dump, AuditEvent, AuditEventType};
use crate::transaction::{Direction, Transaction};

/// What the HTTP context should do with the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyAction {
    /// Forward the body
    Continue,
    /// Reject the transaction
    Block(PatternMatch),
}

/// State for one direction's inspection
struct DirectionState {
    inspector: BodyInspector,
    enabled: bool,
    /// Set once buffering stopped for this direction (allocation failure,
    /// size limit or end of stream)
    done: bool,
}

impl DirectionState {
    fn new(config: &FilterConfig, enabled: bool) -> Self {
        Self {
            inspector: BodyInspector::new(config),
            enabled,
            done: false,
        }
    }
}

/// Body buffering and inspection for one HTTP stream
pub struct BodyFilter<A = SystemAllocator> {
    tx: Transaction<A>,
    config: FilterConfig,
    request: DirectionState,
    response: DirectionState,
    blocked: bool,
}

impl BodyFilter<SystemAllocator> {
    pub fn new(context_id: u32, config: FilterConfig) -> Self {
        Self::with_transaction(Transaction::new(context_id), config)
    }
}

impl<A: ChunkAllocator> BodyFilter<A> {
    pub fn with_transaction(tx: Transaction<A>, config: FilterConfig) -> Self {
        Self {
            request: DirectionState::new(&config, config.inspect_request_body),
            response: DirectionState::new(&config, config.inspect_response_body),
            tx,
            config,
            blocked: false,
        }
    }

    pub fn transaction(&self) -> &Transaction<A> {
        &self.tx
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    fn state_mut(&mut self, direction: Direction) -> &mut DirectionState {
        match direction {
            Direction::Request => &mut self.request,
            Direction::Response => &mut self.response,
        }
    }

    /// Whether body fragments of `direction` still need to be fetched.
    pub fn wants_body(&self, direction: Direction) -> bool {
        let state = match direction {
            Direction::Request => &self.request,
            Direction::Response => &self.response,
        };
        !self.blocked && state.enabled && !state.done
    }

    /// Handle one body fragment of `direction`.
    pub fn on_body(
        &mut self,
        direction: Direction,
        chunk: Option<&[u8]>,
        end_of_stream: bool,
    ) -> BodyAction {
        if !self.wants_body(direction) {
            return BodyAction::Continue;
        }

        if let Err(BodyError::Alloc { requested }) = self
            .tx
            .append(direction, chunk.unwrap_or_default())
        {
            // Forward the rest of this body uninspected
            audit_alloc_failure(requested)
                .with_transaction(self.tx.id(), direction)
                .emit();
            self.finish(direction);
            return BodyAction::Continue;
        }

        let id = self.tx.id();
        let state = match direction {
            Direction::Request => &mut self.request,
            Direction::Response => &mut self.response,
        };
        let inspection = state.inspector.inspect(self.tx.body(direction).buffer());
        self.tx.set_body_parsed(direction, inspection.parsed_offset);

        if self.config.dump_bodies {
            let body = self.tx.body(direction).buffer();
            for line in render_dump(body.dump(true)) {
                debug!("[context_id={}] {:?} {}", id, direction, line);
            }
        }
        self.tx.prune(direction);

        let body_len = self.tx.content_len_so_far(direction);
        match inspection.verdict {
            Verdict::Block(m) => {
                self.blocked = true;
                if self.config.log_matches {
                    warn!(
                        "[context_id={}] {:?} body matched '{}' at offset {}",
                        id, direction, m.pattern_name, m.end_offset
                    );
                }
                audit_blocked(direction, &m.pattern_name, m.end_offset)
                    .with_transaction(id, direction)
                    .with_body_len(body_len)
                    .emit();
                self.tx.free();
                BodyAction::Block(m)
            }
            Verdict::Skip(reason) => {
                AuditEvent::new(AuditEventType::InspectionSkipped)
                    .with_transaction(id, direction)
                    .with_body_len(body_len)
                    .with_reason(reason)
                    .emit();
                self.finish(direction);
                BodyAction::Continue
            }
            Verdict::Continue => {
                if end_of_stream {
                    AuditEvent::new(AuditEventType::BodyInspected)
                        .with_transaction(id, direction)
                        .with_body_len(body_len)
                        .emit();
                    self.finish(direction);
                }
                BodyAction::Continue
            }
        }
    }

    /// Stop buffering `direction` and release what it still holds.
    fn finish(&mut self, direction: Direction) {
        self.state_mut(direction).done = true;
        self.tx.free_body(direction);
    }

    /// Release everything at stream teardown.
    pub fn teardown(&mut self) {
        self.tx.free();
    }
}
