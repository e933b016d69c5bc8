//! Streaming Body Inspector
//!
//! Scans each buffered byte exactly once, in stream order, picking up
//! where the previous pass stopped. Chunk prefixes below that point are
//! skipped, so chunks retained across a prune boundary are not rescanned.

use crate::body::{BodyBuffer, ChunkAllocator};
use crate::config::FilterConfig;

use super::pattern_fsm::{Pattern, PatternMatch, PatternScanner, ScanResult};

/// Outcome of one inspection pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    /// Offset up to which the body has been consumed.
    pub parsed_offset: u64,
    pub verdict: Verdict,
}

/// Decision from an inspection pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Keep inspecting as more body arrives
    Continue,
    /// Pattern detected
    Block(PatternMatch),
    /// Inspection abandoned (too large, etc.)
    Skip(&'static str),
}

/// Inspector for one body direction
pub struct BodyInspector {
    scanner: PatternScanner,
    /// Bytes of body to inspect before giving up
    max_bytes: u64,
    /// Whether a final verdict was reached
    complete: bool,
}

impl BodyInspector {
    pub fn new(config: &FilterConfig) -> Self {
        Self::with_patterns(&config.blocked_patterns, config.max_body_size)
    }

    pub fn with_patterns(patterns: &[String], max_bytes: u64) -> Self {
        let patterns: Vec<Pattern> = patterns.iter().map(|s| Pattern::from_string(s)).collect();
        Self {
            scanner: PatternScanner::new(patterns),
            max_bytes,
            complete: false,
        }
    }

    /// Scan everything buffered past the previous pass.
    ///
    /// The buffer is only read. Once a verdict other than `Continue` has
    /// been returned, later passes consume everything without scanning.
    pub fn inspect<A: ChunkAllocator>(&mut self, body: &BodyBuffer<A>) -> Inspection {
        if self.complete {
            return self.consume_all(body);
        }

        if body.total_appended() > self.max_bytes {
            self.complete = true;
            return Inspection {
                parsed_offset: body.total_appended(),
                verdict: Verdict::Skip("Body exceeds max size"),
            };
        }

        for entry in body.dump(true) {
            let offset = self.scanner.offset();
            if entry.end_offset() <= offset {
                continue;
            }
            if entry.stream_offset > offset {
                // Bytes below this chunk were released unscanned
                self.scanner.skip_to(entry.stream_offset);
            }

            let start = (self.scanner.offset() - entry.stream_offset) as usize;
            if let ScanResult::Match(m) = self.scanner.scan_bytes(&entry.data[start..]) {
                self.complete = true;
                return Inspection {
                    parsed_offset: m.end_offset,
                    verdict: Verdict::Block(m),
                };
            }
        }

        Inspection {
            parsed_offset: self.scanner.offset(),
            verdict: Verdict::Continue,
        }
    }

    fn consume_all<A: ChunkAllocator>(&self, body: &BodyBuffer<A>) -> Inspection {
        Inspection {
            parsed_offset: body.total_appended(),
            verdict: Verdict::Continue,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyBuffer;

    fn matched(result: &Inspection) -> &PatternMatch {
        match &result.verdict {
            Verdict::Block(m) => m,
            other => panic!("Expected match, got {:?}", other),
        }
    }

    fn inspector() -> BodyInspector {
        BodyInspector::with_patterns(
            &["union select".to_string(), "/etc/passwd".to_string()],
            1024,
        )
    }

    #[test]
    fn test_clean_body_consumes_everything() {
        let mut body = BodyBuffer::new();
        body.append_slice(b"name=alice&").unwrap();
        body.append_slice(b"age=30").unwrap();

        let mut inspector = inspector();
        let result = inspector.inspect(&body);
        assert_eq!(result.verdict, Verdict::Continue);
        assert_eq!(result.parsed_offset, 17);
    }

    #[test]
    fn test_match_split_across_chunks() {
        let mut body = BodyBuffer::new();
        body.append_slice(b"id=1 UNION ").unwrap();
        body.append_slice(b"SELECT pw").unwrap();

        let mut inspector = inspector();
        let result = inspector.inspect(&body);
        let m = matched(&result);
        assert_eq!(m.pattern_name, "union select");
        assert_eq!(m.end_offset, 17);
        assert_eq!(result.parsed_offset, 17);
        assert!(inspector.is_complete());
    }

    #[test]
    fn test_resumes_after_prune_without_rescan() {
        let mut body = BodyBuffer::new();
        body.append_slice(b"file=/etc/pa").unwrap();

        let mut inspector = inspector();
        let first = inspector.inspect(&body);
        assert_eq!(first.parsed_offset, 12);

        // coterminal chunk is retained by prune
        body.prune(first.parsed_offset);
        assert_eq!(body.chunk_count(), 1);

        body.append_slice(b"sswd").unwrap();
        let second = inspector.inspect(&body);
        assert_eq!(matched(&second).end_offset, 16);
        assert_eq!(second.parsed_offset, 16);

        body.prune(second.parsed_offset + 1);
        assert!(body.is_empty());
    }

    #[test]
    fn test_skips_released_gap() {
        let mut body = BodyBuffer::new();
        body.append_slice(b"0123456789").unwrap();
        body.append_slice(b"/etc/passwd").unwrap();
        // released before it was ever inspected
        body.prune(11);

        let mut inspector = inspector();
        let result = inspector.inspect(&body);
        assert_eq!(matched(&result).pattern_name, "/etc/passwd");
        assert_eq!(result.parsed_offset, 21);
    }

    #[test]
    fn test_size_limit() {
        let mut body = BodyBuffer::new();
        body.append_slice(&[b'a'; 64]).unwrap();

        let mut inspector = BodyInspector::with_patterns(&["x".to_string()], 10);
        let result = inspector.inspect(&body);
        assert_eq!(result.verdict, Verdict::Skip("Body exceeds max size"));
        assert_eq!(result.parsed_offset, 64);

        body.append_slice(b"x").unwrap();
        let after = inspector.inspect(&body);
        assert_eq!(after.verdict, Verdict::Continue);
        assert_eq!(after.parsed_offset, 65);
    }

    #[test]
    fn test_overlapping_prefix_across_chunks() {
        let mut body = BodyBuffer::new();
        body.append_slice(b"aa").unwrap();
        body.append_slice(b"ab").unwrap();

        let mut inspector = BodyInspector::with_patterns(&["aab".to_string()], 1024);
        let result = inspector.inspect(&body);
        assert_eq!(matched(&result).end_offset, 4);
    }

    #[test]
    fn test_default_traversal_pattern_after_extra_dot() {
        let mut body = BodyBuffer::new();
        body.append_slice(b"file=.../../etc").unwrap();

        let mut inspector = BodyInspector::new(&FilterConfig::default());
        let result = inspector.inspect(&body);
        let m = matched(&result);
        assert_eq!(m.pattern_name, "../../");
        assert_eq!(m.end_offset, 12);
        assert!(inspector.is_complete());
    }
}
