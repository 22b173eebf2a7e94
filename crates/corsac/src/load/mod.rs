//! Whole-file loading, single- and multi-threaded.
//!
//! # Architecture
//!
//! The single-threaded path reads the whole file once and feeds it to
//! [`Table::append_bytes`]. The multi-threaded path is a
//! split-parse-merge-index pipeline built from scoped [`TaskPool`]
//! batches, one pool per phase:
//!
//! ```text
//! read once → line-aligned split into N byte ranges
//!           → one parse job per partition (private, index-free stores)
//!           → barrier
//!           → prefix sum, one copy job per partition into disjoint
//!             ranges of the preallocated merged store
//!           → barrier
//!           → one build job per declared index column
//!           → barrier → merged, fully indexed table
//! ```
//!
//! During parsing, workers share nothing mutable: each owns its byte
//! range, buffers, and row vector. The copy phase is lock-free because
//! destination ranges are disjoint by construction, and the index phase
//! is lock-free because each job exclusively owns one index structure.
//! The only shared state is the job queue and the read-only source
//! buffer.
//!
//! Any worker error fails its job; the pipeline still joins every worker,
//! then surfaces the first error in partition order and discards all
//! partial results. Row order in the merged table always equals file
//! order.
//!
//! A split candidate is nudged forward to the next line-terminator byte,
//! which keeps every partition line-aligned. A terminator inside an open
//! quoted field can still attract a split into the middle of that field;
//! this is a known gap inherited from the splitter's design, not handled
//! specially here.

mod pool;

pub use pool::TaskPool;

use crate::config::ParserConfig;
use crate::error::{CsvError, Result};
use crate::table::{validate_indexed_columns, Row, Schema, SecondaryIndex, Table};
use crate::tokenize::{ByteMatcher, Tokenizer};
use std::ops::Range;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use tracing::debug;

/// Parses an in-memory byte buffer into a fully indexed table.
///
/// `indexed_columns` declares the secondary indices; `expected_headers`,
/// when present, must match the first line verbatim.
pub fn parse(
    data: &[u8],
    schema: &Schema,
    indexed_columns: &[usize],
    config: &ParserConfig,
    expected_headers: Option<&[String]>,
) -> Result<Table> {
    let mut table = Table::new(
        schema.clone(),
        indexed_columns,
        config,
        expected_headers.map(<[String]>::to_vec),
    )?;
    table.append_bytes(data)?;
    Ok(table)
}

/// Reads `path` in binary mode and parses it single-threaded.
pub fn load_file(
    path: impl AsRef<Path>,
    schema: &Schema,
    indexed_columns: &[usize],
    config: &ParserConfig,
    expected_headers: Option<&[String]>,
) -> Result<Table> {
    let data = read_file(path.as_ref())?;
    parse(&data, schema, indexed_columns, config, expected_headers)
}

/// Reads `path` once and loads it with `thread_count` workers.
///
/// For every `thread_count >= 1` the resulting table holds the same row
/// sequence and the same index contents as [`load_file`] on the same
/// input.
///
/// # Errors
///
/// Returns [`CsvError::InvalidConfiguration`] when `thread_count` is
/// zero; otherwise any worker error is surfaced after all workers have
/// joined, and no partial result is returned.
pub fn load_file_parallel(
    path: impl AsRef<Path>,
    schema: &Schema,
    indexed_columns: &[usize],
    config: &ParserConfig,
    expected_headers: Option<&[String]>,
    thread_count: usize,
) -> Result<Table> {
    if thread_count == 0 {
        return Err(CsvError::InvalidConfiguration(
            "parallel load requires at least one worker thread".to_string(),
        ));
    }
    let data: Arc<[u8]> = read_file(path.as_ref())?.into();
    parse_parallel(
        data,
        schema,
        indexed_columns,
        config,
        expected_headers,
        thread_count,
    )
}

/// Reads the whole file into memory in binary mode.
fn read_file(path: &Path) -> Result<Vec<u8>> {
    let data = std::fs::read(path)?;
    debug!(bytes = data.len(), path = %path.display(), "read source file");
    Ok(data)
}

/// Raw pointer to the merged row vector, handed to copy jobs.
///
/// Wrapped so it can cross the `'static` job boundary; every use is
/// confined to one pool batch whose drop joins before the vector is
/// touched again.
#[derive(Clone, Copy)]
struct RowsMut {
    ptr: *mut Row,
}

// SAFETY: copy jobs write disjoint destination ranges of a vector that is
// preallocated to the summed partition length and neither read, resized,
// nor dropped until the pool has joined.
unsafe impl Send for RowsMut {}

/// Read-only view of the merged rows, handed to index-build jobs.
#[derive(Clone, Copy)]
struct RowsRef {
    ptr: *const Row,
    len: usize,
}

// SAFETY: index jobs only read the fully merged vector, which outlives
// the pool join; nothing mutates it during the phase.
unsafe impl Send for RowsRef {}

/// The split-parse-merge-index pipeline over an in-memory buffer.
fn parse_parallel(
    data: Arc<[u8]>,
    schema: &Schema,
    indexed_columns: &[usize],
    config: &ParserConfig,
    expected_headers: Option<&[String]>,
    thread_count: usize,
) -> Result<Table> {
    validate_indexed_columns(schema, indexed_columns)?;

    let tokenizer = Tokenizer::new(config);
    let ranges = partition_ranges(&data, tokenizer.line_separators(), thread_count);
    debug!(
        partitions = ranges.len(),
        bytes = data.len(),
        "split input for parallel load"
    );

    // Parse phase: one job per partition, each into a private row vector.
    // Only the first partition sees the declared headers.
    let (tx, rx) = mpsc::channel::<(usize, Result<Vec<Row>>)>();
    {
        let pool = TaskPool::new(thread_count)?;
        for (slot, range) in ranges.iter().cloned().enumerate() {
            let tx = tx.clone();
            let data = Arc::clone(&data);
            let tokenizer = tokenizer.clone();
            let schema = schema.clone();
            let headers: Option<Vec<String>> = if slot == 0 {
                expected_headers.map(<[String]>::to_vec)
            } else {
                None
            };
            pool.submit(move || {
                let result = parse_partition(&data[range], &tokenizer, &schema, headers.as_deref());
                let _ = tx.send((slot, result));
            });
        }
    }
    drop(tx);

    let mut outcomes: Vec<Option<Vec<Row>>> = Vec::new();
    outcomes.resize_with(ranges.len(), || None);
    let mut first_error: Option<(usize, CsvError)> = None;
    for (slot, result) in rx {
        match result {
            Ok(rows) => outcomes[slot] = Some(rows),
            Err(err) => {
                if first_error.as_ref().map_or(true, |(s, _)| slot < *s) {
                    first_error = Some((slot, err));
                }
            }
        }
    }
    if let Some((_, err)) = first_error {
        return Err(err);
    }

    let mut parsed: Vec<Vec<Row>> = Vec::with_capacity(outcomes.len());
    for (slot, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Some(rows) => parsed.push(rows),
            None => return Err(CsvError::WorkerLost { job: slot }),
        }
    }

    // Merge phase: prefix sums assign each partition a contiguous,
    // non-overlapping destination range; one copy job per partition.
    let mut starts = Vec::with_capacity(parsed.len());
    let mut total = 0usize;
    for rows in &parsed {
        starts.push(total);
        total += rows.len();
    }
    debug!(rows = total, "merging partition stores");

    let mut merged: Vec<Row> = Vec::new();
    merged.resize_with(total, Row::default);
    let dst = RowsMut {
        ptr: merged.as_mut_ptr(),
    };
    {
        let pool = TaskPool::new(thread_count)?;
        for (rows, start) in parsed.into_iter().zip(starts) {
            pool.submit(move || {
                // Capture the whole `Send` wrapper, not the bare pointer
                // field (edition 2021 disjoint closure captures).
                let dst = dst;
                // SAFETY: [start, start + rows.len()) ranges are disjoint
                // across jobs by prefix-sum construction, and the backing
                // vector is preallocated and untouched until the pool
                // joins.
                let out = unsafe { std::slice::from_raw_parts_mut(dst.ptr.add(start), rows.len()) };
                for (slot, row) in out.iter_mut().zip(rows) {
                    *slot = row;
                }
            });
        }
    }

    // Index phase: one job per declared index column; each job owns its
    // index structure exclusively and scans the full merged row range.
    let mut indices: Vec<SecondaryIndex> = Vec::with_capacity(indexed_columns.len());
    if !indexed_columns.is_empty() {
        debug!(
            indices = indexed_columns.len(),
            "building secondary indices"
        );
        let src = RowsRef {
            ptr: merged.as_ptr(),
            len: merged.len(),
        };
        let (tx, rx) = mpsc::channel::<(usize, SecondaryIndex)>();
        {
            let pool = TaskPool::new(thread_count)?;
            for (slot, &column) in indexed_columns.iter().enumerate() {
                let tx = tx.clone();
                pool.submit(move || {
                    // Capture the whole `Send` wrapper, not the bare
                    // pointer field (edition 2021 disjoint closure
                    // captures).
                    let src = src;
                    // SAFETY: the merged vector is complete before this
                    // phase starts and is only read until the pool joins.
                    let rows = unsafe { std::slice::from_raw_parts(src.ptr, src.len) };
                    let _ = tx.send((slot, SecondaryIndex::build(column, rows)));
                });
            }
        }
        drop(tx);

        let mut built: Vec<Option<SecondaryIndex>> = Vec::new();
        built.resize_with(indexed_columns.len(), || None);
        for (slot, index) in rx {
            built[slot] = Some(index);
        }
        for (slot, index) in built.into_iter().enumerate() {
            match index {
                Some(index) => indices.push(index),
                None => return Err(CsvError::WorkerLost { job: slot }),
            }
        }
    }

    Ok(Table::from_parts(
        schema.clone(),
        tokenizer,
        merged,
        indices,
    ))
}

/// Parses one partition into a private, index-free row vector.
fn parse_partition(
    data: &[u8],
    tokenizer: &Tokenizer,
    schema: &Schema,
    expected_headers: Option<&[String]>,
) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    let mut header_done = expected_headers.map_or(true, <[String]>::is_empty);
    crate::table::parse_into(
        data,
        tokenizer,
        schema,
        expected_headers,
        &mut header_done,
        &mut |row| rows.push(row),
    )?;
    Ok(rows)
}

/// Splits `data` into up to `thread_count` line-aligned byte ranges.
///
/// Candidate offsets at `k * len / thread_count` are nudged forward past
/// the next line-terminator byte, so every range starts at offset 0 or
/// immediately after a terminator. The ranges tile the input exactly.
fn partition_ranges(
    data: &[u8],
    line_separators: &ByteMatcher,
    thread_count: usize,
) -> Vec<Range<usize>> {
    if data.is_empty() {
        return vec![0..0];
    }

    let mut bounds: Vec<usize> = Vec::with_capacity(thread_count + 1);
    bounds.push(0);
    for k in 1..thread_count {
        let mut pos = k * data.len() / thread_count;
        while pos < data.len() && !line_separators.check(data[pos]) {
            pos += 1;
        }
        // `pos` sits on a terminator (or at EOF); the partition begins on
        // the byte after it.
        let start = (pos + 1).min(data.len());
        let last = bounds.last().copied().unwrap_or(0);
        if start > last && start < data.len() {
            bounds.push(start);
        }
    }
    bounds.push(data.len());

    bounds.windows(2).map(|w| w[0]..w[1]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnType, Value};

    fn sample_csv(rows: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for i in 0..rows {
            out.extend_from_slice(format!("{},name{},{}\n", i, i % 7, i as f64 * 0.5).as_bytes());
        }
        out
    }

    fn test_schema(config: &ParserConfig) -> Schema {
        Schema::new(&[ColumnType::UInt, ColumnType::Str, ColumnType::Float], config)
    }

    #[test]
    fn test_partition_starts_are_line_aligned() {
        let data = sample_csv(100);
        let matcher = ByteMatcher::new(crate::tokenize::LINE_TERMINATORS);

        for thread_count in 1..=8 {
            let ranges = partition_ranges(&data, &matcher, thread_count);
            for range in &ranges {
                assert!(
                    range.start == 0 || matcher.check(data[range.start - 1]),
                    "partition start {} does not follow a terminator",
                    range.start
                );
            }
        }
    }

    #[test]
    fn test_partitions_tile_the_input() {
        let data = sample_csv(33);
        let matcher = ByteMatcher::new(crate::tokenize::LINE_TERMINATORS);

        for thread_count in 1..=6 {
            let ranges = partition_ranges(&data, &matcher, thread_count);
            let mut expected_start = 0;
            for range in &ranges {
                assert_eq!(range.start, expected_start);
                assert!(range.start <= range.end);
                expected_start = range.end;
            }
            assert_eq!(expected_start, data.len());
        }
    }

    #[test]
    fn test_empty_input_yields_single_empty_partition() {
        let matcher = ByteMatcher::new(crate::tokenize::LINE_TERMINATORS);
        let ranges = partition_ranges(&[], &matcher, 4);
        assert_eq!(ranges, vec![0..0]);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let config = ParserConfig::default();
        let schema = test_schema(&config);
        let data = sample_csv(250);

        let serial = parse(&data, &schema, &[1], &config, None).unwrap();
        for thread_count in 1..=5 {
            let parallel = parse_parallel(
                Arc::from(data.clone().into_boxed_slice()),
                &schema,
                &[1],
                &config,
                None,
                thread_count,
            )
            .unwrap();

            assert_eq!(parallel.rows(), serial.rows(), "threads={}", thread_count);
            for i in 0..7u64 {
                let key = Value::from(format!("name{}", i));
                let serial_offsets: Vec<usize> =
                    serial.find(0, &key).map(|r| r[0].as_uint().unwrap() as usize).collect();
                let parallel_offsets: Vec<usize> = parallel
                    .find(0, &key)
                    .map(|r| r[0].as_uint().unwrap() as usize)
                    .collect();
                assert_eq!(serial_offsets, parallel_offsets);
            }
        }
    }

    #[test]
    fn test_partition_error_discards_all_results() {
        let config = ParserConfig::default();
        let schema = test_schema(&config);
        // The bad row sits far enough in that earlier partitions parse
        // successfully.
        let mut data = sample_csv(200);
        data.extend_from_slice(b"not-a-number,x,1.0\n");

        let result = parse_parallel(
            Arc::from(data.into_boxed_slice()),
            &schema,
            &[0],
            &config,
            None,
            4,
        );
        assert!(matches!(result, Err(CsvError::ColumnConversion { .. })));
    }

    #[test]
    fn test_zero_threads_rejected_before_reading() {
        let config = ParserConfig::default();
        let schema = test_schema(&config);
        let err = load_file_parallel("/no/such/file", &schema, &[], &config, None, 0).unwrap_err();
        assert!(matches!(err, CsvError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_header_validated_by_first_partition_only() {
        let config = ParserConfig::default();
        let schema = test_schema(&config);
        let headers = vec!["id".to_string(), "name".to_string(), "score".to_string()];
        let mut data = b"id,name,score\n".to_vec();
        data.extend_from_slice(&sample_csv(64));

        let table = parse_parallel(
            Arc::from(data.into_boxed_slice()),
            &schema,
            &[],
            &config,
            Some(&headers),
            4,
        )
        .unwrap();
        assert_eq!(table.len(), 64);
        assert_eq!(table[0].get(0), Some(&Value::UInt(0)));
    }
}
