//! Tokenization of clinical note text
//!
//! This module defines the raw tokens produced by the lexer and the entry
//! points for turning source text into a [`Document`]. The tokens are defined
//! using the logos derive macro for efficient tokenization.
//!
//! Whitespace and newlines are lexed so that every byte of the source is
//! accounted for, but they are dropped when building a [`Document`]: section
//! matching operates on content tokens only, and line boundary checks go
//! through the document's line index instead.

use logos::Logos;

use crate::section::token::{Document, Token};

/// All raw token classes recognized in note text
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum RawToken {
    // Line breaks
    #[token("\n")]
    Newline,

    // Whitespace (excluding newlines)
    #[regex(r"[ \t\r\x0C]+")]
    Whitespace,

    // Digit runs, kept separate so constraints can test for numbers
    #[regex(r"[0-9]+")]
    Number,

    // A single punctuation or symbol character
    #[regex(r"[\p{P}\p{S}]")]
    Punct,

    // Word content (catch-all for everything else)
    #[regex(r"[^\s0-9\p{P}\p{S}]+")]
    Word,
}

impl RawToken {
    /// Check if this token is whitespace (including newlines)
    pub fn is_whitespace(&self) -> bool {
        matches!(self, RawToken::Whitespace | RawToken::Newline)
    }

    /// Check if this token is a digit run
    pub fn is_number(&self) -> bool {
        matches!(self, RawToken::Number)
    }

    /// Check if this token is a punctuation or symbol character
    pub fn is_punct(&self) -> bool {
        matches!(self, RawToken::Punct)
    }

    /// Check if this token is word content
    pub fn is_word(&self) -> bool {
        matches!(self, RawToken::Word)
    }
}

/// Tokenize source text into raw tokens with their byte spans.
///
/// Unlexable bytes are skipped; every returned span is valid for `source`.
pub fn tokenize(source: &str) -> Vec<(RawToken, std::ops::Range<usize>)> {
    let mut lexer = RawToken::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        if let Ok(token) = result {
            tokens.push((token, lexer.span()));
        }
    }

    tokens
}

/// Tokenize source text and build a [`Document`] from its content tokens.
///
/// Whitespace and newline tokens are dropped here. Token indices in the
/// resulting document therefore count content tokens only.
pub fn document(source: &str) -> Document {
    let tokens = tokenize(source)
        .into_iter()
        .filter(|(raw, _)| !raw.is_whitespace())
        .map(|(_, span)| Token::new(&source[span.clone()], span))
        .collect();
    Document::new(source, tokens)
}
