//! Typed row storage.
//!
//! This module provides the append-only [`Table`]: an ordered sequence of
//! typed [`Row`]s plus the secondary indices declared for it.
//!
//! # Architecture
//!
//! A row's position in the table (its *offset*) is a stable identity:
//! offsets are assigned in strictly increasing append order and never
//! reused. Indices store offsets back into the one authoritative row
//! vector, never row copies, and the table always outlives its indices by
//! construction.
//!
//! The single-threaded ingest path is [`Table::append_bytes`]: the
//! tokenizer walks lines, every non-empty line is split into fields
//! left-to-right, each field is converted by its column's loader, the row
//! is appended, and every declared index is updated synchronously. When
//! header names were declared, the first line is matched verbatim and
//! consumed without becoming a row.
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_corsac::config::ParserConfig;
//! use alopex_corsac::table::{ColumnType, Schema, Table, Value};
//!
//! let config = ParserConfig::default();
//! let schema = Schema::new(&[ColumnType::UInt, ColumnType::Str], &config);
//! let mut table = Table::new(schema, &[0], &config, None)?;
//! table.append_bytes(b"1,one\n2,two\n")?;
//!
//! for row in table.find(0, &Value::UInt(2)) {
//!     // ...
//! }
//! ```

mod index;
mod schema;
mod value;

pub use index::{FindIter, SecondaryIndex};
pub use schema::{
    ColumnLoader, ColumnType, DateTimeLoader, FloatLoader, IntLoader, OptionalLoader, Schema,
    StringLoader, UIntLoader,
};
pub use value::Value;

use crate::config::ParserConfig;
use crate::error::{CsvError, Result};
use crate::tokenize::{TokenBuffer, TokenizeError, Tokenizer};
use std::ops::Index;

/// One immutable, fully parsed row: an ordered tuple of column values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Value of the given column, if it exists.
    pub fn get(&self, column: usize) -> Option<&Value> {
        self.values.get(column)
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All column values in order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Iterates over the column values in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, column: usize) -> &Value {
        &self.values[column]
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Append-only, ordered store of typed rows with secondary indices.
#[derive(Debug)]
pub struct Table {
    schema: Schema,
    tokenizer: Tokenizer,
    expected_headers: Option<Vec<String>>,
    header_done: bool,
    rows: Vec<Row>,
    indices: Vec<SecondaryIndex>,
}

impl Table {
    /// Creates an empty table.
    ///
    /// `indexed_columns` declares which columns get a secondary index; the
    /// position of a column in this slice is its index id for
    /// [`Table::find`]. When `expected_headers` is non-empty, the first
    /// line fed to [`Table::append_bytes`] must match it verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`CsvError::InvalidConfiguration`] when an indexed column
    /// is outside the schema.
    pub fn new(
        schema: Schema,
        indexed_columns: &[usize],
        config: &ParserConfig,
        expected_headers: Option<Vec<String>>,
    ) -> Result<Self> {
        validate_indexed_columns(&schema, indexed_columns)?;
        let header_done = expected_headers.as_ref().map_or(true, |h| h.is_empty());
        Ok(Self {
            tokenizer: Tokenizer::new(config),
            schema,
            expected_headers,
            header_done,
            rows: Vec::new(),
            indices: indexed_columns
                .iter()
                .map(|&c| SecondaryIndex::new(c))
                .collect(),
        })
    }

    /// Parses `data` and appends every row, updating all indices
    /// synchronously.
    ///
    /// May be called repeatedly to feed input in slices; the header, when
    /// declared, is expected once at the very beginning.
    ///
    /// # Errors
    ///
    /// Any parse, header, or conversion error aborts the call. Rows
    /// appended by earlier calls (or earlier in this call, before the
    /// offending line) remain in the table; discard the table to discard
    /// them.
    pub fn append_bytes(&mut self, data: &[u8]) -> Result<()> {
        let Self {
            tokenizer,
            schema,
            expected_headers,
            header_done,
            rows,
            indices,
        } = self;

        parse_into(
            data,
            tokenizer,
            schema,
            expected_headers.as_deref(),
            header_done,
            &mut |row| {
                let offset = rows.len();
                for index in indices.iter_mut() {
                    if let Some(key) = row.get(index.column()) {
                        index.add(key.clone(), offset);
                    }
                }
                rows.push(row);
            },
        )
    }

    /// Number of rows in the table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at the given offset, if it exists.
    pub fn get(&self, offset: usize) -> Option<&Row> {
        self.rows.get(offset)
    }

    /// All rows in insertion order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Iterates over the rows in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// The columns carrying a secondary index, in index-id order.
    pub fn index_columns(&self) -> Vec<usize> {
        self.indices.iter().map(SecondaryIndex::column).collect()
    }

    /// The declared schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Looks up all rows whose indexed column equals `key`.
    ///
    /// `index_id` is the position of the column in the `indexed_columns`
    /// slice the table was created with.
    ///
    /// # Panics
    ///
    /// Panics when `index_id` does not name a declared index.
    pub fn find(&self, index_id: usize, key: &Value) -> FindIter<'_> {
        let index = &self.indices[index_id];
        FindIter::new(&self.rows, index.offsets(key))
    }

    /// Assembles a table from already parsed and indexed parts.
    pub(crate) fn from_parts(
        schema: Schema,
        tokenizer: Tokenizer,
        rows: Vec<Row>,
        indices: Vec<SecondaryIndex>,
    ) -> Self {
        Self {
            schema,
            tokenizer,
            expected_headers: None,
            header_done: true,
            rows,
            indices,
        }
    }

}

impl Index<usize> for Table {
    type Output = Row;

    fn index(&self, offset: usize) -> &Row {
        &self.rows[offset]
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Checks that every declared index column exists in the schema.
pub(crate) fn validate_indexed_columns(schema: &Schema, indexed_columns: &[usize]) -> Result<()> {
    for &column in indexed_columns {
        if column >= schema.len() {
            return Err(CsvError::InvalidConfiguration(format!(
                "indexed column {} is outside the {}-column schema",
                column,
                schema.len()
            )));
        }
    }
    Ok(())
}

/// Walks `data` line by line, feeding parsed rows to `sink`.
///
/// `header_done` carries the header state across calls: when `false`, the
/// first emitted line is matched against `expected_headers` and consumed.
/// Empty lines are skipped. Line numbers in errors are 1-based and local
/// to `data`.
pub(crate) fn parse_into(
    data: &[u8],
    tokenizer: &Tokenizer,
    schema: &Schema,
    expected_headers: Option<&[String]>,
    header_done: &mut bool,
    sink: &mut dyn FnMut(Row),
) -> Result<()> {
    let mut scan = tokenizer.scan(data);
    let mut line = TokenBuffer::new();
    let mut token = TokenBuffer::new();
    let mut line_no: u64 = 0;

    while scan.has_more() {
        if !scan.next_line(&mut line) {
            break;
        }
        line_no += 1;

        if !*header_done {
            let expected = expected_headers.unwrap_or(&[]);
            check_header(line.as_bytes(), tokenizer, expected, &mut token)?;
            *header_done = true;
            continue;
        }

        if line.is_empty() {
            continue;
        }

        let row = line_to_row(line.as_bytes(), tokenizer, schema, &mut token, line_no)?;
        sink(row);
    }

    Ok(())
}

fn line_text(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

/// Splits one line into fields and converts each by its column's loader.
fn line_to_row(
    line: &[u8],
    tokenizer: &Tokenizer,
    schema: &Schema,
    token: &mut TokenBuffer,
    line_no: u64,
) -> Result<Row> {
    let mut fields = tokenizer.scan(line);
    let mut values = Vec::with_capacity(schema.len());

    for (column, loader) in schema.loaders().iter().enumerate() {
        match fields.next_token(token) {
            Ok(_) => {}
            Err(TokenizeError::FieldExhausted { .. }) => {
                return Err(CsvError::MissingField {
                    line: line_no,
                    column,
                    text: line_text(line),
                });
            }
            Err(source) => {
                return Err(CsvError::MalformedQuoting {
                    line: line_no,
                    text: line_text(line),
                    source,
                });
            }
        }

        let value = loader
            .load(token.as_bytes())
            .map_err(|source| CsvError::ColumnConversion {
                line: line_no,
                column,
                text: line_text(line),
                source,
            })?;
        values.push(value);
    }

    // Fields beyond the declared columns are ignored.
    Ok(Row::from_values(values))
}

/// Matches the file's first line against the declared header names.
fn check_header(
    line: &[u8],
    tokenizer: &Tokenizer,
    expected: &[String],
    token: &mut TokenBuffer,
) -> Result<()> {
    let mut fields = tokenizer.scan(line);

    for (column, want) in expected.iter().enumerate() {
        let found_bytes: &[u8] = match fields.next_token(token) {
            Ok(_) => token.as_bytes(),
            Err(TokenizeError::FieldExhausted { .. }) => &[],
            Err(source) => {
                return Err(CsvError::MalformedQuoting {
                    line: 1,
                    text: line_text(line),
                    source,
                });
            }
        };

        if want.as_bytes() != found_bytes {
            return Err(CsvError::HeaderMismatch {
                column,
                expected: want.clone(),
                found: line_text(found_bytes),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ParserConfig {
        ParserConfig::default()
    }

    fn schema(config: &ParserConfig) -> Schema {
        Schema::new(&[ColumnType::UInt, ColumnType::Str], config)
    }

    #[test]
    fn test_append_assigns_monotonic_offsets() {
        let config = config();
        let mut table = Table::new(schema(&config), &[0], &config, None).unwrap();
        table.append_bytes(b"1,one\n2,two\n3,three\n").unwrap();

        assert_eq!(table.len(), 3);
        for (offset, row) in table.iter().enumerate() {
            assert_eq!(row.get(0), Some(&Value::UInt(offset as u64 + 1)));
        }
        assert_eq!(table[1].get(1), Some(&Value::from("two")));
    }

    #[test]
    fn test_indices_updated_synchronously() {
        let config = config();
        let mut table = Table::new(schema(&config), &[1], &config, None).unwrap();
        table.append_bytes(b"1,dup\n2,uniq\n3,dup\n").unwrap();

        let matches = table.find(0, &Value::from("dup"));
        assert_eq!(matches.match_count(), 2);
        let offsets: Vec<u64> = matches.map(|r| r.get(0).unwrap().as_uint().unwrap()).collect();
        assert_eq!(offsets, vec![1, 3]);

        let empty = table.find(0, &Value::from("missing"));
        assert!(!empty.has_data());
        assert_eq!(empty.match_count(), 0);
    }

    #[test]
    fn test_header_is_consumed() {
        let config = config();
        let headers = vec!["id".to_string(), "name".to_string()];
        let mut table = Table::new(schema(&config), &[], &config, Some(headers)).unwrap();
        table.append_bytes(b"id,name\n1,one\n").unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table[0].get(1), Some(&Value::from("one")));
    }

    #[test]
    fn test_header_mismatch_before_any_row() {
        let config = config();
        let headers = vec!["id".to_string(), "name".to_string()];
        let mut table = Table::new(schema(&config), &[], &config, Some(headers)).unwrap();
        let err = table.append_bytes(b"ID,Name\n1,one\n").unwrap_err();

        match err {
            CsvError::HeaderMismatch {
                column,
                expected,
                found,
            } => {
                assert_eq!(column, 0);
                assert_eq!(expected, "id");
                assert_eq!(found, "ID");
            }
            other => panic!("expected HeaderMismatch, got {other:?}"),
        }
        assert!(table.is_empty());
    }

    #[test]
    fn test_empty_lines_are_skipped() {
        let config = config();
        let mut table = Table::new(schema(&config), &[], &config, None).unwrap();
        table.append_bytes(b"1,one\n\n\n2,two\n\n").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_short_row_is_reported_with_context() {
        let config = config();
        let mut table = Table::new(schema(&config), &[], &config, None).unwrap();
        let err = table.append_bytes(b"1,one\n2\n").unwrap_err();

        match err {
            CsvError::MissingField { line, column, text } => {
                assert_eq!(line, 2);
                assert_eq!(column, 1);
                assert_eq!(text, "2");
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let config = config();
        let mut table = Table::new(schema(&config), &[], &config, None).unwrap();
        table.append_bytes(b"1,one,EXTRA,MORE\n").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].len(), 2);
    }

    #[test]
    fn test_conversion_error_carries_line_and_column() {
        let config = config();
        let mut table = Table::new(schema(&config), &[], &config, None).unwrap();
        let err = table.append_bytes(b"1,one\nnope,two\n").unwrap_err();

        match err {
            CsvError::ColumnConversion {
                line, column, text, ..
            } => {
                assert_eq!(line, 2);
                assert_eq!(column, 0);
                assert_eq!(text, "nope,two");
            }
            other => panic!("expected ColumnConversion, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_quoting_carries_line_text() {
        let config = config();
        let mut table = Table::new(schema(&config), &[], &config, None).unwrap();
        let err = table.append_bytes(b"1,one\n2,t\"wo\n").unwrap_err();

        match err {
            CsvError::MalformedQuoting { line, text, source } => {
                assert_eq!(line, 2);
                assert_eq!(text, "2,t\"wo");
                assert!(matches!(source, TokenizeError::QuoteMidField { .. }));
            }
            other => panic!("expected MalformedQuoting, got {other:?}"),
        }
    }

    #[test]
    fn test_indexed_column_out_of_range_is_rejected() {
        let config = config();
        let err = Table::new(schema(&config), &[2], &config, None).unwrap_err();
        assert!(matches!(err, CsvError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_incremental_feeding_across_calls() {
        let config = config();
        let headers = vec!["id".to_string(), "name".to_string()];
        let mut table = Table::new(schema(&config), &[0], &config, Some(headers)).unwrap();
        table.append_bytes(b"id,name\n1,one\n").unwrap();
        table.append_bytes(b"2,two\n").unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.find(0, &Value::UInt(2)).match_count(), 1);
    }
}
