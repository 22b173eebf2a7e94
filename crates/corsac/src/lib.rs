//! Corsac - Alopex CSV Ingestion Engine
//!
//! This crate parses delimited text into strongly-typed rows, builds
//! secondary indices for fast value lookup, and supports both
//! single-threaded and multi-threaded bulk loading. The whole input is
//! memory-resident: this is a bulk loader, not a streaming parser.
//!
//! # Components
//!
//! - [`Tokenizer`]: the character-level scanner handling quote and escape
//!   rules
//! - [`TokenBuffer`]: reusable growable buffer keeping per-field parsing
//!   allocation-free
//! - [`Table`]: append-only ordered row store with [`SecondaryIndex`]
//!   lookups
//! - [`TaskPool`]: scoped worker pool backing the parallel
//!   split-parse-merge-index pipeline
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_corsac::config::ParserConfig;
//! use alopex_corsac::table::{ColumnType, Schema, Value};
//! use alopex_corsac::load;
//!
//! let config = ParserConfig::default();
//! let schema = Schema::new(
//!     &[ColumnType::UInt, ColumnType::Str, ColumnType::Float],
//!     &config,
//! );
//! let headers = vec!["id".to_string(), "name".to_string(), "score".to_string()];
//!
//! // Index column 1 ("name"); load with 8 worker threads.
//! let table = load::load_file_parallel(
//!     "data.csv", &schema, &[1], &config, Some(&headers), 8,
//! )?;
//!
//! for row in table.find(0, &Value::from("alice")) {
//!     println!("{:?}", row);
//! }
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod load;
pub mod table;
pub mod tokenize;

pub use config::ParserConfig;
pub use error::{ConvertError, CsvError, Result};
pub use load::{load_file, load_file_parallel, parse, TaskPool};
pub use table::{
    ColumnLoader, ColumnType, FindIter, Row, Schema, SecondaryIndex, Table, Value,
};
pub use tokenize::{ByteMatcher, TokenBuffer, TokenizeError, Tokenizer};
