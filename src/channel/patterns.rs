//! Prompt and error-pattern matchers.

use regex::Regex;
use regex::bytes::Regex as BytesRegex;

/// Trait for prompt matching - regex by default, extensible for custom parsers.
pub trait PromptMatcher: Send + Sync {
    /// Returns the byte offset one past the end of the match, or None.
    fn find_match(&self, data: &[u8]) -> Option<usize>;

    /// Check if the data matches the pattern.
    fn is_match(&self, data: &[u8]) -> bool {
        self.find_match(data).is_some()
    }
}

impl PromptMatcher for BytesRegex {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        self.find(data).map(|m| m.end())
    }
}

/// A compiled prompt pattern with optional negative matches.
///
/// Negatives disambiguate prompts that share a terminator: on many CLIs
/// both privileged-exec and configuration mode end in `#`, and only the
/// `(config` substring tells them apart.
#[derive(Debug, Clone)]
pub struct CompiledPrompt {
    pattern: BytesRegex,
    not_contains: Vec<String>,
}

impl CompiledPrompt {
    /// Compile a prompt pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: BytesRegex::new(pattern)?,
            not_contains: Vec::new(),
        })
    }

    /// Compile a prompt pattern with negative substrings.
    pub fn with_not_contains(
        pattern: &str,
        not_contains: Vec<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: BytesRegex::new(pattern)?,
            not_contains,
        })
    }

    /// The source pattern string.
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Get a reference to the underlying regex.
    pub fn regex(&self) -> &BytesRegex {
        &self.pattern
    }
}

impl PromptMatcher for CompiledPrompt {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        let data_str = String::from_utf8_lossy(data);
        for nc in &self.not_contains {
            if data_str.contains(nc) {
                return None;
            }
        }

        self.pattern.find(data).map(|m| m.end())
    }
}

/// One failure matcher with a label carried into diagnostics.
#[derive(Debug, Clone)]
pub struct ErrorPattern {
    label: String,
    matcher: Regex,
}

impl ErrorPattern {
    /// Match a literal substring. The label is the literal itself.
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        let matcher =
            Regex::new(&regex::escape(&text)).expect("escaped literal is a valid regex");
        Self {
            label: text,
            matcher,
        }
    }

    /// Match a regular expression under the given label.
    pub fn regex(label: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            label: label.into(),
            matcher: Regex::new(pattern)?,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// First match of this pattern in the output, if any.
    pub fn find(&self, output: &str) -> Option<ErrorMatch<'_>> {
        self.matcher.find(output).map(|m| ErrorMatch {
            label: &self.label,
            matched: m.as_str().to_string(),
        })
    }
}

/// A hit against an error pattern set.
#[derive(Debug, Clone)]
pub struct ErrorMatch<'a> {
    /// Label of the pattern that matched.
    pub label: &'a str,
    /// The text the pattern matched on.
    pub matched: String,
}

/// Ordered set of failure matchers. First match wins.
///
/// Association is per executor instance: the set is supplied at
/// construction and immutable thereafter. "Error" phrasing differs per
/// vendor ("% Invalid input", "syntax error", ...) so the set is the
/// vendor-specific part of failure detection.
#[derive(Debug, Clone, Default)]
pub struct ErrorPatternSet {
    patterns: Vec<ErrorPattern>,
}

impl ErrorPatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set of literal substring matchers, in order.
    pub fn from_literals<I, S>(literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: literals.into_iter().map(ErrorPattern::literal).collect(),
        }
    }

    pub fn push(&mut self, pattern: ErrorPattern) {
        self.patterns.push(pattern);
    }

    pub fn with(mut self, pattern: ErrorPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Scan output against the patterns in order; the first pattern that
    /// matches anywhere wins.
    pub fn first_match(&self, output: &str) -> Option<ErrorMatch<'_>> {
        self.patterns.iter().find_map(|p| p.find(output))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
