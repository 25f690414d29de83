//! Prompt framing: the output buffer and the prompt/error matchers.
//!
//! A device shell has no request/response correlation; the only framing
//! signal is the prompt the device prints when it is ready for the next
//! command. This module owns that matching logic.

mod buffer;
mod patterns;

pub use buffer::PatternBuffer;
pub use patterns::{CompiledPrompt, ErrorMatch, ErrorPattern, ErrorPatternSet, PromptMatcher};
