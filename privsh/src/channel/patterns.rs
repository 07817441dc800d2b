//! Pattern matching utilities for prompt detection.
//!
//! [`StreamMatcher`] is the incremental classifier the navigator feeds while
//! device output trickles in. It holds everything that has to survive
//! between chunks: the escape-stripped buffer, the position up to which
//! failure triggers have been scanned, and the candidate prompts in priority
//! order.

use memchr::memmem;
use regex::bytes::{Regex, RegexBuilder};

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, Result};

/// Compile a prompt pattern string into a regex.
///
/// Prompt patterns are always case-insensitive, multi-line and CRLF-aware
/// (so `$` also matches before `\r\n`). A pattern without a trailing `$`
/// anchor gets `\s*$` appended.
///
/// A malformed pattern is reported as [`ChannelError::InvalidPattern`].
pub fn compile_prompt_pattern(pattern: &str) -> Result<Regex> {
    let pattern = if pattern.ends_with('$') {
        pattern.to_string()
    } else {
        format!("{}\\s*$", pattern)
    };

    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .multi_line(true)
        .crlf(true)
        .build()
        .map_err(|e| ChannelError::InvalidPattern(e).into())
}

/// A compiled prompt pattern with optional negative matches.
#[derive(Debug, Clone)]
pub struct CompiledPrompt {
    /// The main pattern to match.
    pattern: Regex,

    /// Substrings that must NOT be present in the matched prompt.
    not_contains: Vec<String>,
}

impl CompiledPrompt {
    /// Create a new compiled prompt from a pattern string.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: compile_prompt_pattern(pattern)?,
            not_contains: Vec::new(),
        })
    }

    /// Wrap an already compiled regex.
    pub fn from_regex(pattern: Regex, not_contains: Vec<String>) -> Self {
        Self {
            pattern,
            not_contains,
        }
    }

    /// Check whether `text` is vetoed by a `not_contains` entry.
    fn vetoed(&self, text: &[u8]) -> bool {
        self.not_contains
            .iter()
            .any(|nc| memmem::find(text, nc.as_bytes()).is_some())
    }

    /// Check a complete prompt string.
    pub fn is_match(&self, prompt: &[u8]) -> bool {
        self.pattern.is_match(prompt) && !self.vetoed(prompt)
    }

    /// Find this prompt at the end of the buffered output.
    fn find_in(&self, buffer: &PatternBuffer) -> Option<std::ops::Range<usize>> {
        let range = buffer.find_trailing(&self.pattern)?;
        if self.vetoed(&buffer.as_slice()[range.clone()]) {
            return None;
        }
        Some(range)
    }
}

/// What a classification result means to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchKind {
    /// The prompt of the named privilege level.
    Prompt { level: String },

    /// The authentication sub-prompt while escalating into `level`.
    EscalationAuth { level: String },

    /// A configured failure trigger.
    Failure { trigger: String },
}

/// Outcome of a successful classification.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Which candidate (or failure trigger) matched.
    pub kind: MatchKind,

    /// The text that matched, trimmed.
    pub matched: String,

    /// Everything captured since the matcher was created.
    pub captured: Vec<u8>,
}

impl Classification {
    /// Captured output as a string (lossy UTF-8).
    pub fn captured_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.captured)
    }
}

/// Incremental classifier over a growing output buffer.
#[derive(Debug)]
pub struct StreamMatcher {
    buffer: PatternBuffer,

    /// Failure triggers, checked before any prompt.
    failures: Vec<String>,

    /// Prompt candidates in priority order.
    candidates: Vec<(MatchKind, CompiledPrompt)>,

    /// Bytes of the buffer already scanned for failure triggers.
    scanned: usize,

    /// Longest failure trigger, used to overlap scans across chunks.
    longest_failure: usize,
}

impl StreamMatcher {
    /// Create an empty matcher with the given tail search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: PatternBuffer::new(search_depth),
            failures: Vec::new(),
            candidates: Vec::new(),
            scanned: 0,
            longest_failure: 0,
        }
    }

    /// Add failure triggers. Empty strings are ignored.
    pub fn with_failures<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for trigger in triggers {
            let trigger = trigger.into();
            if trigger.is_empty() {
                continue;
            }
            self.longest_failure = self.longest_failure.max(trigger.len());
            self.failures.push(trigger);
        }
        self
    }

    /// Add a prompt candidate. Candidates are tried in insertion order.
    pub fn with_candidate(mut self, kind: MatchKind, prompt: CompiledPrompt) -> Self {
        self.candidates.push((kind, prompt));
        self
    }

    /// Number of prompt candidates.
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Feed a chunk of device output and classify the buffer.
    pub fn feed(&mut self, data: &[u8]) -> Option<Classification> {
        self.buffer.extend(data);
        self.classify()
    }

    /// Classify the current buffer without adding data.
    pub fn classify(&mut self) -> Option<Classification> {
        if let Some(trigger) = self.scan_failures() {
            return Some(Classification {
                kind: MatchKind::Failure {
                    trigger: trigger.clone(),
                },
                matched: trigger,
                captured: self.buffer.as_slice().to_vec(),
            });
        }

        for (kind, prompt) in &self.candidates {
            if let Some(range) = prompt.find_in(&self.buffer) {
                let data = self.buffer.as_slice();
                return Some(Classification {
                    kind: kind.clone(),
                    matched: String::from_utf8_lossy(&data[range]).trim().to_string(),
                    captured: data.to_vec(),
                });
            }
        }

        None
    }

    /// Scan bytes not yet checked for failure triggers.
    ///
    /// The scan restarts `longest_failure - 1` bytes before the previous end
    /// so a trigger split across two chunks is still found.
    fn scan_failures(&mut self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let data = self.buffer.as_slice();
        let from = self
            .scanned
            .saturating_sub(self.longest_failure.saturating_sub(1));
        let window = &data[from..];
        self.scanned = data.len();

        self.failures
            .iter()
            .find(|trigger| memmem::find(window, trigger.as_bytes()).is_some())
            .cloned()
    }

    /// Everything captured so far.
    pub fn captured(&self) -> &[u8] {
        self.buffer.as_slice()
    }
}

/// Classify a complete buffer in one shot.
///
/// Equivalent to feeding `buffer` to a fresh [`StreamMatcher`] in a single
/// chunk.
pub fn classify(
    buffer: &[u8],
    failures: &[String],
    candidates: &[(MatchKind, CompiledPrompt)],
) -> Option<Classification> {
    let mut matcher = StreamMatcher::new(usize::MAX).with_failures(failures.iter().cloned());
    for (kind, prompt) in candidates {
        matcher = matcher.with_candidate(kind.clone(), prompt.clone());
    }
    matcher.feed(buffer)
}
