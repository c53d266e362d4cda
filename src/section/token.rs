//! Token and document types for section detection
//!
//! This module defines the data structures that every downstream component
//! operates on: a [`Token`] carrying its text and byte span, and a
//! [`Document`] owning the source text, its token sequence, and a line index
//! for fast byte-offset-to-line conversions.
//!
//! ## Key Design
//!
//! - **Byte spans preserved**: Every token records the half-open byte range
//!   it was lexed from, so spans can always be mapped back to source text
//! - **Token indices as coordinates**: Matches, headers, and section bodies
//!   are expressed as half-open ranges over token indices, never byte offsets
//! - **Efficient line lookup**: O(log n) binary search over precomputed line
//!   start offsets, Unicode-aware via `char_indices()`

use std::fmt;
use std::ops::Range;

/// A single token in a document with its source byte span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub span: Range<usize>,
}

impl Token {
    pub fn new(text: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }

    /// Lowercased copy of the token text, used for case-insensitive matching
    pub fn lower(&self) -> String {
        self.text.to_lowercase()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A tokenized document: source text, tokens, and a line index
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    tokens: Vec<Token>,
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
}

impl Document {
    pub fn new(text: impl Into<String>, tokens: Vec<Token>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        for (byte_pos, ch) in text.char_indices() {
            if ch == '\n' {
                line_starts.push(byte_pos + 1);
            }
        }
        Self {
            text,
            tokens,
            line_starts,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of tokens in the document
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Convert a half-open token range to the byte span it covers.
    ///
    /// An empty token range maps to an empty byte span anchored at the start
    /// of the token it points at (or the end of the text when out of range).
    pub fn byte_span(&self, token_range: &Range<usize>) -> Range<usize> {
        if token_range.start >= token_range.end {
            let anchor = self
                .tokens
                .get(token_range.start)
                .map(|t| t.span.start)
                .unwrap_or(self.text.len());
            return anchor..anchor;
        }
        let start = self.tokens[token_range.start].span.start;
        let end = self.tokens[token_range.end - 1].span.end;
        start..end
    }

    /// Source text covered by a half-open token range
    pub fn slice(&self, token_range: &Range<usize>) -> &str {
        let span = self.byte_span(token_range);
        &self.text[span]
    }

    /// Get the total number of lines in the document
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset of the start of the line containing `byte_offset`
    pub fn line_start_before(&self, byte_offset: usize) -> usize {
        let line = self
            .line_starts
            .binary_search(&byte_offset)
            .unwrap_or_else(|i| i - 1);
        self.line_starts[line]
    }

    /// Byte offset just past the last content byte of the line containing
    /// `byte_offset` (the position of the terminating newline, or the end of
    /// the text for the final line)
    pub fn line_end_after(&self, byte_offset: usize) -> usize {
        let line = self
            .line_starts
            .binary_search(&byte_offset)
            .unwrap_or_else(|i| i - 1);
        match self.line_starts.get(line + 1) {
            Some(next_start) => next_start - 1,
            None => self.text.len(),
        }
    }
}
