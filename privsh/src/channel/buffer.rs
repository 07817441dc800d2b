//! Escape-stripped output buffer with tail search.
//!
//! Prompts are only looked for in the last `search_depth` bytes, so long
//! outputs (full routing tables, `show running-config`) don't get rescanned
//! on every chunk.
//!
//! Output is run through a `vte` parser on the way in so that colour codes
//! and cursor movement never reach the prompt patterns. The parser lives as
//! long as the buffer, so an escape sequence split across two chunks is
//! still stripped.

use std::ops::Range;

use bytes::BytesMut;
use memchr::{memchr, memrchr};
use regex::bytes::Regex;
use vte::{Parser, Perform};

/// Accumulated device output since the last command.
pub struct PatternBuffer {
    buffer: BytesMut,

    /// Bytes from the end searched for prompts.
    search_depth: usize,

    /// VT parser state carried between chunks.
    parser: Parser,
}

impl PatternBuffer {
    /// Empty buffer searching the last `search_depth` bytes.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
            parser: Parser::new(),
        }
    }

    /// Append a chunk, dropping escape sequences and control bytes other
    /// than `\n`, `\r` and `\t`.
    pub fn extend(&mut self, data: &[u8]) {
        let mut sink = Printable {
            out: &mut self.buffer,
        };
        self.parser.advance(&mut sink, data);
    }

    /// Byte offset where the tail search window begins.
    ///
    /// The window always begins at a line start so that `^` never anchors
    /// in the middle of a line that was cut off: forward to the next line
    /// when there is one, otherwise back to the start of the last line.
    fn tail_start(&self) -> usize {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        if start == 0 || self.buffer[start - 1] == b'\n' {
            return start;
        }
        match memchr(b'\n', &self.buffer[start..]) {
            Some(pos) => start + pos + 1,
            None => memrchr(b'\n', &self.buffer[..start]).map_or(0, |pos| pos + 1),
        }
    }

    /// Find a prompt that terminates the buffered output.
    ///
    /// Device prompts are always the last thing printed, so only the final
    /// match in the tail counts, and only if nothing but whitespace follows
    /// it.
    pub fn find_trailing(&self, pattern: &Regex) -> Option<Range<usize>> {
        let start = self.tail_start();
        let tail = &self.buffer[start..];
        let m = pattern.find_iter(tail).last()?;
        if !tail[m.end()..].iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        Some((start + m.start())..(start + m.end()))
    }

    /// Buffered bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

}

impl std::fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .finish()
    }
}

/// `vte` performer that keeps printable text and line control only.
struct Printable<'a> {
    out: &'a mut BytesMut,
}

impl Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.extend_from_slice(&[byte]);
        }
    }
}
