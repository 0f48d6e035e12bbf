//! # `LaminarDB` DBF
//!
//! Reads dBASE-family (`.dbf`) tables into Arrow `RecordBatch`es.
//!
//! A DBF file is a 32-byte header, a table of 32-byte field descriptors,
//! then fixed-size records that each start with a liveness byte. The
//! crate is layered the same way:
//!
//! - [`header`]: byte-exact header and descriptor structures
//! - [`parser`]: header validation and descriptor-table walking
//! - [`scanner`]: position-addressed record reads, deleted-record skipping
//! - [`decoder`]: per-type value decoding and Arrow column building
//! - [`reader`]: the batch-producing [`DbfReader`]
//!
//! ```no_run
//! use laminar_dbf::{DbfReader, DbfReaderConfig};
//!
//! let config = DbfReaderConfig::default().with_batch_size(4096);
//! let reader = DbfReader::open_with_config("parcels.dbf", config)?;
//! for batch in reader {
//!     let batch = batch?;
//!     println!("{} rows", batch.num_rows());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

#[macro_use]
mod macros;

/// Reader configuration and option parsing
pub mod config;

/// Field decoding and batch assembly
pub mod decoder;

/// Error types and codes
pub mod error;

/// On-disk header and descriptor layout
pub mod header;

/// Header and schema parsing
pub mod parser;

/// Batch-producing reader
pub mod reader;

/// Record slot scanning
pub mod scanner;

/// Field types and Arrow schema mapping
pub mod schema;

/// Decoder trait
pub mod traits;

#[cfg(test)]
mod test_util;

pub use config::{DbfOptions, DbfReaderConfig, Utf8Strategy};
pub use decoder::{decode_field, decode_record, DbfDecoder, DbfValue};
pub use error::{DbfError, DbfResult, Stage};
pub use header::FileHeader;
pub use reader::{discover_schema, DbfReader, ScanStats};
pub use scanner::RawRecord;
pub use schema::{to_arrow_type, DbfSchema, FieldDescriptor, FieldType};
pub use traits::FormatDecoder;
