//! Secondary indices over table rows.
//!
//! An index maps one column's values to the offsets of all rows holding
//! that value. Offsets, not row copies: the table remains the single
//! owner of row storage, and a lookup pays one extra indirection, which
//! is acceptable because bulk load, not lookup, is the throughput path.

use crate::table::value::Value;
use crate::table::Row;
use std::collections::HashMap;

/// Multi-valued mapping from a column value to row offsets.
///
/// Duplicates are permitted; the index is non-unique. Offsets are stored
/// in insertion order, which for both the incremental and the bulk build
/// path is ascending row order.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryIndex {
    column: usize,
    map: HashMap<Value, Vec<usize>>,
}

impl SecondaryIndex {
    /// Creates an empty index over the given column.
    pub fn new(column: usize) -> Self {
        Self {
            column,
            map: HashMap::new(),
        }
    }

    /// Zero-based column this index covers.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Inserts one `(key, offset)` pair.
    pub fn add(&mut self, key: Value, offset: usize) {
        self.map.entry(key).or_default().push(offset);
    }

    /// Offsets of all rows whose indexed column equals `key`; empty when
    /// the key is absent.
    pub fn offsets(&self, key: &Value) -> &[usize] {
        self.map.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct keys in the index.
    pub fn key_count(&self) -> usize {
        self.map.len()
    }

    /// Builds an index over `column` in one pass across `rows`.
    pub(crate) fn build(column: usize, rows: &[Row]) -> Self {
        let mut index = Self::new(column);
        for (offset, row) in rows.iter().enumerate() {
            if let Some(key) = row.get(column) {
                index.add(key.clone(), offset);
            }
        }
        index
    }
}

/// Iterator over the rows matching one index lookup.
///
/// Matching offsets are dereferenced lazily into the owning table.
/// [`FindIter::match_count`] reports the total number of matches
/// regardless of how far the iterator has advanced; a key with zero
/// matches yields an iterator that immediately reports no data.
#[derive(Debug, Clone)]
pub struct FindIter<'a> {
    rows: &'a [Row],
    offsets: &'a [usize],
    pos: usize,
}

impl<'a> FindIter<'a> {
    pub(crate) fn new(rows: &'a [Row], offsets: &'a [usize]) -> Self {
        Self {
            rows,
            offsets,
            pos: 0,
        }
    }

    /// Returns `true` while unvisited matches remain.
    pub fn has_data(&self) -> bool {
        self.pos < self.offsets.len()
    }

    /// Total number of matches for the looked-up key.
    pub fn match_count(&self) -> usize {
        self.offsets.len()
    }
}

impl<'a> Iterator for FindIter<'a> {
    type Item = &'a Row;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = *self.offsets.get(self.pos)?;
        self.pos += 1;
        self.rows.get(offset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.offsets.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FindIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: Vec<Value>) -> Row {
        Row::from_values(values)
    }

    #[test]
    fn test_duplicates_accumulate_in_row_order() {
        let mut index = SecondaryIndex::new(0);
        index.add(Value::Int(1), 0);
        index.add(Value::Int(2), 1);
        index.add(Value::Int(1), 2);
        assert_eq!(index.offsets(&Value::Int(1)), &[0, 2]);
        assert_eq!(index.offsets(&Value::Int(2)), &[1]);
        assert_eq!(index.key_count(), 2);
    }

    #[test]
    fn test_missing_key_yields_empty_iterator() {
        let index = SecondaryIndex::new(0);
        let rows: Vec<Row> = Vec::new();
        let iter = FindIter::new(&rows, index.offsets(&Value::Int(9)));
        assert!(!iter.has_data());
        assert_eq!(iter.match_count(), 0);
        assert_eq!(iter.count(), 0);
    }

    #[test]
    fn test_bulk_build_matches_incremental() {
        let rows = vec![
            row(vec![Value::Int(1), Value::from("a")]),
            row(vec![Value::Int(2), Value::from("b")]),
            row(vec![Value::Int(1), Value::from("c")]),
        ];

        let bulk = SecondaryIndex::build(0, &rows);

        let mut incremental = SecondaryIndex::new(0);
        for (offset, r) in rows.iter().enumerate() {
            incremental.add(r.get(0).unwrap().clone(), offset);
        }

        assert_eq!(bulk, incremental);
    }

    #[test]
    fn test_iterator_dereferences_rows() {
        let rows = vec![
            row(vec![Value::Int(1)]),
            row(vec![Value::Int(7)]),
            row(vec![Value::Int(1)]),
        ];
        let index = SecondaryIndex::build(0, &rows);

        let mut iter = FindIter::new(&rows, index.offsets(&Value::Int(1)));
        assert!(iter.has_data());
        assert_eq!(iter.match_count(), 2);
        assert_eq!(iter.len(), 2);

        let first = iter.next().unwrap();
        assert_eq!(first.get(0), Some(&Value::Int(1)));
        assert_eq!(iter.len(), 1);
        assert_eq!(iter.match_count(), 2);

        assert!(iter.next().is_some());
        assert!(!iter.has_data());
        assert!(iter.next().is_none());
    }
}
