//! Line and field tokenization.
//!
//! This module provides the character-level scanner that turns a byte
//! range into successive lines, and each line into successive field
//! tokens, applying the configured quote and escape rules.
//!
//! # Architecture
//!
//! A [`Tokenizer`] is built once from a [`ParserConfig`] and precomputes
//! two [`ByteMatcher`] tables: the fixed line terminators (`\n`, `\r`,
//! NUL) and the field separators (the configured separator plus NUL).
//! [`Tokenizer::scan`] then yields a [`Scan`] cursor over one input
//! buffer; a fresh cursor is cheap, so the caller typically holds one
//! cursor over the whole input for line scanning and one per line for
//! field scanning.
//!
//! Field scanning is a five-state machine. Which escaping dialect is in
//! force is decided by the configuration: when the escape character equals
//! the quote character, a quote inside a quoted field is written as `""`;
//! otherwise `\"`-style escaping applies. The mode switch being the
//! equality of the two characters is intentional configuration behavior.
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_corsac::config::ParserConfig;
//! use alopex_corsac::tokenize::{TokenBuffer, Tokenizer};
//!
//! let tokenizer = Tokenizer::new(&ParserConfig::default());
//! let mut scan = tokenizer.scan(b"a,\"b,c\"\nd");
//! let mut line = TokenBuffer::new();
//! while scan.next_line(&mut line) {
//!     let mut fields = tokenizer.scan(line.as_bytes());
//!     // ... next_token() per declared column ...
//! }
//! ```

mod buffer;
mod matcher;

pub use buffer::TokenBuffer;
pub use matcher::ByteMatcher;

use crate::config::ParserConfig;
use thiserror::Error;

/// Line terminator bytes. Fixed and not configurable.
pub const LINE_TERMINATORS: &[u8] = b"\n\r\0";

/// Tokenizer-level scan failure.
///
/// Errors carry the byte column (offset into the scanned buffer) where the
/// offending character was seen; the caller enriches them with line
/// context. Scan errors abort the current field immediately and are not
/// recoverable mid-token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenizeError {
    /// A quote character appeared after the start of an unquoted field.
    #[error("quote in the middle of a field at byte {column}")]
    QuoteMidField {
        /// Byte offset of the quote within the scanned buffer.
        column: usize,
    },

    /// In doubled-quote mode, a closing quote was followed by something
    /// other than a separator, another quote, or the end of input.
    #[error("unexpected character after closing quote at byte {column}")]
    UnexpectedAfterQuote {
        /// Byte offset of the offending character.
        column: usize,
    },

    /// A closing quote was not immediately followed by a separator or the
    /// end of input.
    #[error("quoted section must end with the field at byte {column}")]
    QuoteMismatch {
        /// Byte offset of the offending character.
        column: usize,
    },

    /// The input ended inside an open quoted section.
    #[error("unterminated quoted field at byte {column}")]
    UnterminatedQuote {
        /// Byte offset of the end of input.
        column: usize,
    },

    /// The input ended directly after an escape character.
    #[error("dangling escape at end of input at byte {column}")]
    DanglingEscape {
        /// Byte offset of the end of input.
        column: usize,
    },

    /// A field was requested but the scanned buffer was already exhausted.
    #[error("expected another field at byte {column}")]
    FieldExhausted {
        /// Byte offset of the end of input.
        column: usize,
    },
}

impl TokenizeError {
    /// Byte column carried by the error.
    pub fn column(&self) -> usize {
        match *self {
            Self::QuoteMidField { column }
            | Self::UnexpectedAfterQuote { column }
            | Self::QuoteMismatch { column }
            | Self::UnterminatedQuote { column }
            | Self::DanglingEscape { column }
            | Self::FieldExhausted { column } => column,
        }
    }
}

/// Field-scan state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Inside an unquoted field (including at its start).
    InToken,
    /// Inside a quoted section.
    InQuotes,
    /// Saw a quote inside a quoted section in doubled-quote mode; the next
    /// byte decides whether it was an escaped quote or the closing quote.
    InDoubleQuoteProbe,
    /// Saw the escape character; the next byte is taken verbatim.
    InEscape,
    /// Saw the closing quote; only a separator or end of input may follow.
    TokenEnd,
}

/// Precomputed scanner for one CSV dialect.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    quote: u8,
    escape: u8,
    token_separators: ByteMatcher,
    line_separators: ByteMatcher,
}

impl Tokenizer {
    /// Builds a tokenizer for the given dialect.
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            quote: config.quote_char,
            escape: config.escape_char,
            token_separators: ByteMatcher::new(&[config.token_separator, 0]),
            line_separators: ByteMatcher::new(LINE_TERMINATORS),
        }
    }

    /// Starts a scan cursor over `input`.
    pub fn scan<'a>(&'a self, input: &'a [u8]) -> Scan<'a> {
        Scan {
            input,
            offset: 0,
            tokenizer: self,
        }
    }

    /// The fixed line-terminator matcher.
    pub(crate) fn line_separators(&self) -> &ByteMatcher {
        &self.line_separators
    }
}

/// A cursor scanning one input buffer for lines or fields.
///
/// The cursor is transient state: buffer, offset, and nothing else. It is
/// reset simply by creating a new one via [`Tokenizer::scan`].
#[derive(Debug)]
pub struct Scan<'a> {
    input: &'a [u8],
    offset: usize,
    tokenizer: &'a Tokenizer,
}

impl<'a> Scan<'a> {
    /// Returns `true` while unconsumed input remains.
    pub fn has_more(&self) -> bool {
        self.offset < self.input.len()
    }

    /// Current byte offset into the scanned buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Scans the next line into `line`.
    ///
    /// Appends raw bytes until a line-terminator byte is seen, then
    /// consumes the whole terminator run, collapsing blank lines and CR/LF
    /// pairs. Returns `false` when the input is exhausted with nothing
    /// left to emit. A line emitted this way may be empty only when the
    /// remaining input begins with a terminator.
    pub fn next_line(&mut self, line: &mut TokenBuffer) -> bool {
        line.clear();
        if self.offset >= self.input.len() {
            return false;
        }

        while self.offset < self.input.len() {
            let c = self.input[self.offset];
            if self.tokenizer.line_separators.check(c) {
                break;
            }
            line.push(c);
            self.offset += 1;
        }

        // Chew the trailing terminator run.
        while self.offset < self.input.len()
            && self.tokenizer.line_separators.check(self.input[self.offset])
        {
            self.offset += 1;
        }

        true
    }

    /// Scans the next field into `token`.
    ///
    /// Returns `Ok(true)` when the field ended on a separator and
    /// `Ok(false)` when it ended together with the input; either way the
    /// field is complete without requiring a trailing separator.
    pub fn next_token(&mut self, token: &mut TokenBuffer) -> Result<bool, TokenizeError> {
        token.clear();
        if self.offset >= self.input.len() {
            return Err(TokenizeError::FieldExhausted {
                column: self.offset,
            });
        }

        let double_quote_mode = self.tokenizer.escape == self.tokenizer.quote;
        let mut state = State::InToken;
        // State to resume after an escape; one level of memory suffices,
        // the grammar never nests escapes.
        let mut resume = State::InToken;
        let mut pos = 0usize;

        loop {
            let at = self.offset + pos;
            if at >= self.input.len() {
                return match state {
                    State::InToken | State::InDoubleQuoteProbe | State::TokenEnd => {
                        self.offset = at + 1;
                        Ok(false)
                    }
                    State::InQuotes => Err(TokenizeError::UnterminatedQuote { column: at }),
                    State::InEscape => Err(TokenizeError::DanglingEscape { column: at }),
                };
            }
            let c = self.input[at];

            match state {
                State::InToken => {
                    if c == self.tokenizer.quote {
                        if pos > 0 {
                            return Err(TokenizeError::QuoteMidField { column: at });
                        }
                        state = State::InQuotes;
                    } else if self.tokenizer.token_separators.check(c) {
                        self.offset = at + 1;
                        return Ok(true);
                    } else {
                        token.push(c);
                    }
                }
                State::InQuotes => {
                    if double_quote_mode {
                        if c == self.tokenizer.quote {
                            state = State::InDoubleQuoteProbe;
                        } else {
                            token.push(c);
                        }
                    } else if c == self.tokenizer.escape {
                        resume = state;
                        state = State::InEscape;
                    } else if c == self.tokenizer.quote {
                        state = State::TokenEnd;
                    } else {
                        token.push(c);
                    }
                }
                State::InDoubleQuoteProbe => {
                    if c == self.tokenizer.quote {
                        // An escaped quote: one literal quote, stay quoted.
                        token.push(self.tokenizer.quote);
                        state = State::InQuotes;
                    } else if self.tokenizer.token_separators.check(c) {
                        // The probed quote was the real closing quote.
                        self.offset = at + 1;
                        return Ok(true);
                    } else {
                        return Err(TokenizeError::UnexpectedAfterQuote { column: at });
                    }
                }
                State::InEscape => {
                    token.push(c);
                    state = resume;
                }
                State::TokenEnd => {
                    if self.tokenizer.token_separators.check(c) {
                        self.offset = at + 1;
                        return Ok(true);
                    }
                    return Err(TokenizeError::QuoteMismatch { column: at });
                }
            }

            pos += 1;
        }
    }
}
