//! Finite state machine pattern matching over a body stream.
//!
//! Each pattern carries a prefix (failure) table, so a mismatch falls back
//! to the longest suffix of the matched bytes that is still a prefix of
//! the pattern. Amortized O(1) per byte, no buffering of input.

/// A pattern to match against
#[derive(Clone, Debug)]
pub struct Pattern {
    /// Pattern name (for logging)
    pub name: String,
    /// Pattern bytes, lowercased
    bytes: Vec<u8>,
    /// `failure[i]`: length of the longest proper prefix of
    /// `bytes[..=i]` that is also its suffix
    failure: Vec<usize>,
}

impl Pattern {
    pub fn from_string(s: &str) -> Self {
        let bytes = s.to_lowercase().into_bytes();
        Self {
            name: s.to_string(),
            failure: failure_table(&bytes),
            bytes,
        }
    }
}

fn failure_table(bytes: &[u8]) -> Vec<usize> {
    let mut table = vec![0; bytes.len()];
    let mut k = 0;
    for i in 1..bytes.len() {
        while k > 0 && bytes[i] != bytes[k] {
            k = table[k - 1];
        }
        if bytes[i] == bytes[k] {
            k += 1;
        }
        table[i] = k;
    }
    table
}

/// Match progress for a single pattern
#[derive(Clone, Debug, Default)]
pub struct PatternState {
    /// Bytes of the pattern matched so far
    position: usize,
}

impl PatternState {
    /// Advance by one byte, comparing case-insensitively.
    pub fn advance(&mut self, byte: u8, pattern: &Pattern) {
        let byte_lower = byte.to_ascii_lowercase();
        let mut position = self.position;

        if position > 0 && position == pattern.bytes.len() {
            position = pattern.failure[position - 1];
        }
        while position > 0 && pattern.bytes[position] != byte_lower {
            position = pattern.failure[position - 1];
        }
        if pattern.bytes.get(position) == Some(&byte_lower) {
            position += 1;
        }

        self.position = position;
    }

    pub fn is_match(&self, pattern: &Pattern) -> bool {
        !pattern.bytes.is_empty() && self.position >= pattern.bytes.len()
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }
}

/// Result of scanning bytes
#[derive(Clone, Debug)]
pub enum ScanResult {
    /// No match yet
    Continue,
    Match(PatternMatch),
}

/// Details of a pattern match
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternMatch {
    /// Index of the matched pattern
    pub pattern_index: usize,
    /// Stream offset just past the last matched byte
    pub end_offset: u64,
    pub pattern_name: String,
}

/// Multi-pattern scanner tracking its absolute position in the stream
#[derive(Clone, Debug)]
pub struct PatternScanner {
    patterns: Vec<Pattern>,
    states: Vec<PatternState>,
    /// Stream offset of the next byte to scan
    offset: u64,
}

impl PatternScanner {
    pub fn new(patterns: Vec<Pattern>) -> Self {
        let num_patterns = patterns.len();
        Self {
            patterns,
            states: vec![PatternState::default(); num_patterns],
            offset: 0,
        }
    }

    /// Scan a single byte, returns match if found
    pub fn scan_byte(&mut self, byte: u8) -> ScanResult {
        self.offset += 1;

        for (i, (state, pattern)) in self.states.iter_mut().zip(&self.patterns).enumerate() {
            state.advance(byte, pattern);

            if state.is_match(pattern) {
                state.reset();
                return ScanResult::Match(PatternMatch {
                    pattern_index: i,
                    end_offset: self.offset,
                    pattern_name: pattern.name.clone(),
                });
            }
        }

        ScanResult::Continue
    }

    /// Scan a slice of bytes, stopping at the first match.
    ///
    /// On a match, bytes after the matching one are left unscanned.
    pub fn scan_bytes(&mut self, bytes: &[u8]) -> ScanResult {
        for &byte in bytes {
            if let result @ ScanResult::Match(_) = self.scan_byte(byte) {
                return result;
            }
        }
        ScanResult::Continue
    }

    /// Stream offset of the next byte to scan.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Jump forward to `offset`, dropping any partial matches.
    pub fn skip_to(&mut self, offset: u64) {
        for state in &mut self.states {
            state.reset();
        }
        self.offset = self.offset.max(offset);
    }
}
