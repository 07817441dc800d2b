//! Channel layer for pattern matching and raw session I/O.
//!
//! This module handles prompt detection over streaming device output
//! (ANSI stripping, tail search, failure triggers) and the
//! [`SessionChannel`] interface the navigator drives.

mod buffer;
mod patterns;
mod stream;

pub use buffer::PatternBuffer;
pub use patterns::{
    Classification, CompiledPrompt, MatchKind, StreamMatcher, classify, compile_prompt_pattern,
};
pub use stream::{ChannelConfig, SessionChannel, StreamChannel};
