//! Pattern buffer with efficient tail-search optimization.
//!
//! Only the last N bytes of the accumulated output are searched for prompt
//! patterns. For large outputs (a full routing table, a running-config
//! dump) this keeps every poll cheap instead of rescanning megabytes.

use crate::channel::patterns::{CompiledPrompt, PromptMatcher};

/// Buffer for accumulating output and efficiently searching for prompts.
#[derive(Debug)]
pub struct PatternBuffer {
    buffer: Vec<u8>,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        self.buffer.extend_from_slice(&cleaned);
    }

    /// Search the tail region for a prompt match.
    ///
    /// Returns the absolute byte offset one past the end of the match, so
    /// the caller can drain exactly the matched response.
    pub fn find_prompt_end(&self, prompt: &CompiledPrompt) -> Option<usize> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        prompt
            .find_match(&self.buffer[start..])
            .map(|end| start + end)
    }

    /// Remove and return everything up to `end`. Bytes after `end` stay
    /// buffered and are attributed to the next read, so nothing is lost
    /// when the device emits output past the prompt.
    pub fn drain_through(&mut self, end: usize) -> Vec<u8> {
        let rest = self.buffer.split_off(end);
        std::mem::replace(&mut self.buffer, rest)
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn search_depth(&self) -> usize {
        self.search_depth
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}
