//! Telemetry Module
//!
//! In Wasm, we emit structured logs that can be collected by Envoy's
//! access logging or external collectors. Chunk dumps are rendered here
//! so the body buffer itself stays free of output concerns.

use std::fmt::Write;

use log::{info, warn};
use serde::Serialize;

use crate::body::DumpEntry;
use crate::transaction::Direction;

/// Bytes per hex dump row
const DUMP_ROW: usize = 16;

/// Audit event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// Body fully inspected without a match
    BodyInspected,
    /// Request blocked on a body match
    RequestBlocked,
    /// Response blocked on a body match
    ResponseBlocked,
    /// Chunk storage could not be allocated
    AllocationFailure,
    /// Inspection abandoned for this body
    InspectionSkipped,
}

/// Audit event for logging
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    /// HTTP context id of the transaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Body bytes seen in this direction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_len: Option<u64>,
    /// Stream offset the event refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Pattern matched (if blocked)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_type,
            transaction_id: None,
            direction: None,
            body_len: None,
            stream_offset: None,
            reason: None,
            matched_pattern: None,
        }
    }

    pub fn with_transaction(mut self, id: u32, direction: Direction) -> Self {
        self.transaction_id = Some(id);
        self.direction = Some(direction);
        self
    }

    pub fn with_body_len(mut self, len: u64) -> Self {
        self.body_len = Some(len);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.stream_offset = Some(offset);
        self
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.matched_pattern = Some(pattern.to_string());
        self
    }

    /// Log the event
    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(json) => match self.event_type {
                AuditEventType::RequestBlocked
                | AuditEventType::ResponseBlocked
                | AuditEventType::AllocationFailure => {
                    warn!("[BODY-AUDIT] {}", json);
                }
                _ => {
                    info!("[BODY-AUDIT] {}", json);
                }
            },
            Err(e) => {
                warn!("Failed to serialize audit event: {}", e);
            }
        }
    }
}

/// Create a blocked transaction audit event
pub fn audit_blocked(direction: Direction, pattern: &str, offset: u64) -> AuditEvent {
    let event_type = match direction {
        Direction::Request => AuditEventType::RequestBlocked,
        Direction::Response => AuditEventType::ResponseBlocked,
    };
    AuditEvent::new(event_type)
        .with_pattern(pattern)
        .with_offset(offset)
}

/// Create an allocation failure audit event
pub fn audit_alloc_failure(requested: usize) -> AuditEvent {
    AuditEvent::new(AuditEventType::AllocationFailure)
        .with_reason(&format!("failed to buffer {} body bytes", requested))
}

/// Render dumped chunks as log lines: a header per chunk followed by
/// hex/ASCII rows of 16 bytes.
pub fn render_dump<'a>(entries: impl IntoIterator<Item = DumpEntry<'a>>) -> Vec<String> {
    let mut lines = Vec::new();
    for entry in entries {
        lines.push(format!(
            "Chunk id: {}, offset {}, len {}",
            entry.sequence_id, entry.stream_offset, entry.length
        ));
        for (row, bytes) in entry.data.chunks(DUMP_ROW).enumerate() {
            lines.push(hex_row(row * DUMP_ROW, bytes));
        }
    }
    lines
}

fn hex_row(offset: usize, bytes: &[u8]) -> String {
    let mut line = format!(" {:04X}  ", offset);
    for i in 0..DUMP_ROW {
        match bytes.get(i) {
            Some(b) => {
                let _ = write!(line, "{:02X} ", b);
            }
            None => line.push_str("   "),
        }
        if i == DUMP_ROW / 2 - 1 {
            line.push(' ');
        }
    }
    line.push(' ');
    line.extend(bytes.iter().map(|&b| {
        if b.is_ascii_graphic() || b == b' ' {
            b as char
        } else {
            '.'
        }
    }));
    line
}
