//! Parser configuration.
//!
//! A [`ParserConfig`] describes the dialect of the input: the field
//! separator, the quote character, the escape character, and the format
//! used by the calendar-timestamp loader.
//!
//! Note: some files use `""` instead of `\"` to embed a quote inside a
//! quoted field. Setting `escape_char` equal to `quote_char` selects that
//! doubled-quote dialect; the two characters being equal *is* the mode
//! switch, by design.

/// Default escape character.
pub const DEFAULT_ESCAPE_CHAR: u8 = b'\\';

/// Default quote character.
pub const DEFAULT_QUOTE_CHAR: u8 = b'"';

/// Default field separator.
pub const DEFAULT_TOKEN_SEPARATOR: u8 = b',';

/// Default timestamp format (strftime-style).
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Configuration for the CSV dialect.
///
/// Line terminators are fixed (`\n`, `\r`, NUL) and not configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Escape character inside quoted fields.
    ///
    /// When equal to `quote_char`, quoted fields use doubled-quote
    /// escaping (`""` yields one literal quote). Default: `\`.
    pub escape_char: u8,

    /// Character that opens and closes a quoted field. Default: `"`.
    pub quote_char: u8,

    /// Character that separates fields within a line. Default: `,`.
    pub token_separator: u8,

    /// strftime-style pattern used by the timestamp loader.
    ///
    /// Default: `%Y-%m-%d %H:%M:%S`.
    pub datetime_format: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            escape_char: DEFAULT_ESCAPE_CHAR,
            quote_char: DEFAULT_QUOTE_CHAR,
            token_separator: DEFAULT_TOKEN_SEPARATOR,
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
        }
    }
}

impl ParserConfig {
    /// Creates a configuration with a custom escape character.
    pub fn with_escape_char(mut self, escape_char: u8) -> Self {
        self.escape_char = escape_char;
        self
    }

    /// Creates a configuration with a custom quote character.
    pub fn with_quote_char(mut self, quote_char: u8) -> Self {
        self.quote_char = quote_char;
        self
    }

    /// Creates a configuration with a custom field separator.
    pub fn with_token_separator(mut self, token_separator: u8) -> Self {
        self.token_separator = token_separator;
        self
    }

    /// Creates a configuration with a custom timestamp format.
    pub fn with_datetime_format(mut self, datetime_format: impl Into<String>) -> Self {
        self.datetime_format = datetime_format.into();
        self
    }

    /// Returns `true` when quoted fields use doubled-quote escaping.
    pub fn double_quote_mode(&self) -> bool {
        self.escape_char == self.quote_char
    }
}
