//! Batch-producing DBF reader.
//!
//! [`DbfReader`] ties the pieces together: it parses the header and schema
//! once, then each [`fill_batch`](DbfReader::fill_batch) call pulls live
//! records from the [`RecordScanner`] and hands them to the
//! [`DbfDecoder`]. A batch with zero rows means the scan is exhausted.
//!
//! ```no_run
//! use laminar_dbf::DbfReader;
//!
//! let mut reader = DbfReader::open("customers.dbf")?;
//! loop {
//!     let batch = reader.fill_batch(1024)?;
//!     if batch.num_rows() == 0 {
//!         break;
//!     }
//!     println!("{} rows", batch.num_rows());
//! }
//! # Ok::<(), laminar_dbf::DbfError>(())
//! ```

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use arrow_array::{RecordBatch, RecordBatchReader};
use arrow_schema::{ArrowError, SchemaRef};
use chrono::NaiveDate;
use tracing::debug;

use crate::config::DbfReaderConfig;
use crate::decoder::{decode_record, DbfDecoder, DbfValue};
use crate::error::{DbfError, DbfResult, Stage};
use crate::header::FileHeader;
use crate::parser::read_header_and_schema;
use crate::scanner::RecordScanner;
use crate::schema::DbfSchema;
use crate::traits::FormatDecoder;

/// Counters for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Live rows emitted in batches so far.
    pub rows_emitted: u64,
    /// Non-empty batches emitted so far.
    pub batches_emitted: u64,
    /// Deleted record slots skipped.
    pub deleted_skipped: u64,
    /// Non-blank cells that decoded to null.
    pub parse_errors: u64,
}

/// Reads a DBF table as a sequence of Arrow `RecordBatch`es.
///
/// The reader owns its source exclusively; every scan operation takes
/// `&mut self`. Independent scans of one file need independent readers.
#[derive(Debug)]
pub struct DbfReader<R> {
    scanner: RecordScanner<R>,
    schema: Arc<DbfSchema>,
    decoder: DbfDecoder,
    config: DbfReaderConfig,
    rows_emitted: u64,
    batches_emitted: u64,
    /// Set once the iterator has yielded its final item.
    done: bool,
}

impl DbfReader<BufReader<File>> {
    /// Opens the DBF file at `path` with the default config.
    ///
    /// # Errors
    ///
    /// Returns an open-stage [`DbfError`] if the file cannot be opened, or a
    /// header/schema-stage error if it is not a well-formed DBF file.
    pub fn open(path: impl AsRef<Path>) -> DbfResult<Self> {
        Self::open_with_config(path, DbfReaderConfig::default())
    }

    /// Opens the DBF file at `path` with an explicit config.
    ///
    /// # Errors
    ///
    /// As [`open`](Self::open), plus [`DbfError::InvalidConfig`] if the
    /// config does not fit the file's schema.
    pub fn open_with_config(path: impl AsRef<Path>, config: DbfReaderConfig) -> DbfResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening DBF file");
        let file = File::open(path).map_err(|e| DbfError::io(Stage::Open, e))?;
        Self::from_reader(BufReader::new(file), config)
    }
}

impl<R: Read + Seek> DbfReader<R> {
    /// Builds a reader over any seekable source.
    ///
    /// # Errors
    ///
    /// Returns a header/schema-stage [`DbfError`] if the source is not a
    /// well-formed DBF file, or [`DbfError::InvalidConfig`] if the config
    /// does not fit its schema.
    pub fn from_reader(mut source: R, config: DbfReaderConfig) -> DbfResult<Self> {
        let (header, schema) = read_header_and_schema(&mut source)?;
        let schema = Arc::new(schema);
        let decoder = DbfDecoder::with_config(Arc::clone(&schema), &config)?;

        Ok(Self {
            scanner: RecordScanner::new(source, header),
            schema,
            decoder,
            config,
            rows_emitted: 0,
            batches_emitted: 0,
            done: false,
        })
    }

    /// Reads up to `max_rows` live records into one batch.
    ///
    /// Each call resumes where the previous one stopped. A batch with
    /// zero rows means every record slot has been consumed; further calls
    /// keep returning empty batches.
    ///
    /// # Errors
    ///
    /// Returns [`DbfError::InvalidArgument`] if `max_rows` is zero, or a
    /// record-stage error if a record cannot be read. Read errors end the
    /// scan.
    pub fn fill_batch(&mut self, max_rows: usize) -> DbfResult<RecordBatch> {
        if max_rows == 0 {
            return Err(DbfError::InvalidArgument(
                "max_rows must be greater than zero".to_string(),
            ));
        }

        let remaining = self.header().record_count - self.scanner.position();
        let capacity = usize::try_from(remaining).map_or(max_rows, |r| r.min(max_rows));
        let mut records = Vec::with_capacity(capacity);
        while records.len() < max_rows {
            match self.scanner.next_record()? {
                Some(record) => records.push(record),
                None => break,
            }
        }

        let batch = self.decoder.decode_batch(&records)?;
        if batch.num_rows() > 0 {
            self.rows_emitted += batch.num_rows() as u64;
            self.batches_emitted += 1;
            debug!(
                rows = batch.num_rows(),
                next_record = self.scanner.position(),
                "produced DBF batch"
            );
        } else {
            let stats = self.stats();
            debug!(
                rows_emitted = stats.rows_emitted,
                deleted_skipped = stats.deleted_skipped,
                parse_errors = stats.parse_errors,
                "DBF scan exhausted"
            );
        }
        Ok(batch)
    }

    /// Reads the next batch of `config.batch_size` rows, or `None` once the
    /// scan is exhausted.
    ///
    /// # Errors
    ///
    /// See [`fill_batch`](Self::fill_batch).
    pub fn next_batch(&mut self) -> DbfResult<Option<RecordBatch>> {
        let batch = self.fill_batch(self.config.batch_size)?;
        Ok((batch.num_rows() > 0).then_some(batch))
    }

    /// Decodes the record in slot `index` without moving the scan cursor.
    ///
    /// Returns `None` if the slot is marked deleted. Values follow file
    /// field order and ignore any projection.
    ///
    /// # Errors
    ///
    /// Returns [`DbfError::InvalidArgument`] for an out-of-range index, or
    /// a record-stage error if the slot cannot be read.
    pub fn read_record(&mut self, index: u32) -> DbfResult<Option<Vec<Option<DbfValue>>>> {
        let slot = self.scanner.read_slot(index)?;
        if slot.deleted {
            return Ok(None);
        }
        Ok(Some(decode_record(
            &self.schema,
            &slot.record.data,
            self.config.invalid_utf8,
        )))
    }

    /// Moves the scan cursor to slot `index` (clamped to the record count).
    pub fn seek(&mut self, index: u32) {
        self.scanner.seek(index);
        self.done = false;
    }

    /// Consumes the reader, returning the source handle.
    pub fn into_inner(self) -> R {
        self.scanner.into_inner()
    }
}

impl<R> DbfReader<R> {
    /// The parsed file header.
    #[must_use]
    pub fn header(&self) -> &FileHeader {
        self.scanner.header()
    }

    /// The file's full field schema, in file order.
    #[must_use]
    pub fn schema(&self) -> &Arc<DbfSchema> {
        &self.schema
    }

    /// The Arrow schema of produced batches (after projection).
    #[must_use]
    pub fn arrow_schema(&self) -> SchemaRef {
        self.decoder.output_schema()
    }

    /// The config this reader was built with.
    #[must_use]
    pub fn config(&self) -> &DbfReaderConfig {
        &self.config
    }

    /// Number of record slots in the file, deleted ones included.
    #[must_use]
    pub fn record_count(&self) -> u32 {
        self.header().record_count
    }

    /// Size of one record slot in bytes, liveness byte included.
    #[must_use]
    pub fn record_length(&self) -> u16 {
        self.header().record_size
    }

    /// Header length in bytes (offset of the first record).
    #[must_use]
    pub fn header_length(&self) -> u16 {
        self.header().first_record_offset
    }

    /// File type / version byte.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.header().version
    }

    /// Last-update date recorded in the header, if valid.
    #[must_use]
    pub fn last_update(&self) -> Option<NaiveDate> {
        self.header().last_update()
    }

    /// Code-page (language driver) marker.
    #[must_use]
    pub fn code_page_mark(&self) -> u8 {
        self.header().code_page_mark
    }

    /// Table flags byte.
    #[must_use]
    pub fn flags(&self) -> u8 {
        self.header().flags
    }

    /// Counters for the scan so far.
    #[must_use]
    pub fn stats(&self) -> ScanStats {
        ScanStats {
            rows_emitted: self.rows_emitted,
            batches_emitted: self.batches_emitted,
            deleted_skipped: self.scanner.deleted_skipped(),
            parse_errors: self.decoder.parse_error_count(),
        }
    }
}

/// Reads the header and field schema of the DBF file at `path` without
/// scanning any records.
///
/// # Errors
///
/// Returns an open-stage [`DbfError`] if the file cannot be opened, or a
/// header/schema-stage error if it is malformed.
pub fn discover_schema(path: impl AsRef<Path>) -> DbfResult<DbfSchema> {
    let mut file = File::open(path.as_ref()).map_err(|e| DbfError::io(Stage::Open, e))?;
    let (_, schema) = read_header_and_schema(&mut file)?;
    Ok(schema)
}

impl<R: Read + Seek> Iterator for DbfReader<R> {
    type Item = Result<RecordBatch, ArrowError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_batch() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

impl<R: Read + Seek> RecordBatchReader for DbfReader<R> {
    fn schema(&self) -> SchemaRef {
        self.arrow_schema()
    }
}
