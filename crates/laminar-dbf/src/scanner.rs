//! Position-addressed record scanning.
//!
//! [`RecordScanner`] owns the source handle and the scan cursor. Each read
//! seeks to `first_record_offset + index * record_size` before reading,
//! so the scanner never depends on where a previous read left the handle.
//! Deleted slots are read in full and skipped inside a bounded loop; the
//! caller only ever sees live records.

use std::io::{Read, Seek, SeekFrom};

use tracing::trace;

use crate::error::{DbfError, DbfResult, Stage};
use crate::header::{FileHeader, DELETED_FLAG};

/// Field bytes of one record slot, liveness byte excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Zero-based slot index the record was read from.
    pub index: u32,
    /// `record_size - 1` bytes of field data.
    pub data: Vec<u8>,
}

impl RawRecord {
    /// Creates a raw record.
    #[must_use]
    pub fn new(index: u32, data: Vec<u8>) -> Self {
        Self { index, data }
    }
}

/// A record slot read by random access, deleted or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSlot {
    /// `true` if the liveness byte marks the record as deleted.
    pub deleted: bool,
    /// The slot's field data.
    pub record: RawRecord,
}

/// Reads fixed-size record slots from a DBF source.
#[derive(Debug)]
pub struct RecordScanner<R> {
    source: R,
    header: FileHeader,
    /// Next slot index to read; terminal at `header.record_count`.
    cursor: u32,
    /// Handle position after this scanner's last read, if known.
    stream_pos: Option<u64>,
    deleted_skipped: u64,
}

impl<R> RecordScanner<R> {
    /// Creates a scanner positioned at the first record.
    pub fn new(source: R, header: FileHeader) -> Self {
        Self {
            source,
            header,
            cursor: 0,
            stream_pos: None,
            deleted_skipped: 0,
        }
    }

    /// The header this scanner was built with.
    #[must_use]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Index of the next slot a sequential scan will read.
    #[must_use]
    pub fn position(&self) -> u32 {
        self.cursor
    }

    /// Returns `true` once the cursor has passed the last slot.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.header.record_count
    }

    /// Number of deleted slots skipped by [`next_record`](Self::next_record).
    #[must_use]
    pub fn deleted_skipped(&self) -> u64 {
        self.deleted_skipped
    }

    /// Moves the cursor to slot `index` (clamped to the record count).
    pub fn seek(&mut self, index: u32) {
        self.cursor = index.min(self.header.record_count);
    }

    /// Consumes the scanner, returning the source handle.
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: Read + Seek> RecordScanner<R> {
    /// Returns the next live record, or `None` at end of data.
    ///
    /// Deleted slots in between are consumed and counted, never returned.
    ///
    /// # Errors
    ///
    /// Returns a record-stage [`DbfError`] if a seek or read fails; the scan
    /// cannot continue after that.
    pub fn next_record(&mut self) -> DbfResult<Option<RawRecord>> {
        while self.cursor < self.header.record_count {
            let index = self.cursor;
            let slot = self.read_slot(index)?;
            self.cursor += 1;

            if slot.deleted {
                self.deleted_skipped += 1;
                trace!(index, "skipping deleted DBF record");
                continue;
            }
            return Ok(Some(slot.record));
        }
        Ok(None)
    }

    /// Reads the slot at `index` without moving the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`DbfError::InvalidArgument`] if `index` is out of range, or a
    /// record-stage error if the slot cannot be read in full.
    pub fn read_slot(&mut self, index: u32) -> DbfResult<RecordSlot> {
        if index >= self.header.record_count {
            return Err(DbfError::InvalidArgument(format!(
                "record index {index} out of range (record count {})",
                self.header.record_count
            )));
        }

        let stage = Stage::Record(index);
        let start = self.header.record_position(index);
        // The handle is owned exclusively, so a known position is exact and
        // the physical seek (which also drops any read buffer) can be elided.
        // Unknown until both reads complete; a failed read leaves the
        // handle mid-slot.
        if self.stream_pos.take() != Some(start) {
            self.source
                .seek(SeekFrom::Start(start))
                .map_err(|e| DbfError::io(stage, e))?;
        }

        let mut flag = [0u8; 1];
        self.source
            .read_exact(&mut flag)
            .map_err(|e| DbfError::io(stage, e))?;

        let mut data = vec![0u8; self.header.data_len()];
        self.source
            .read_exact(&mut data)
            .map_err(|e| DbfError::io(stage, e))?;
        self.stream_pos = Some(start + u64::from(self.header.record_size));

        Ok(RecordSlot {
            deleted: flag[0] == DELETED_FLAG,
            record: RawRecord::new(index, data),
        })
    }
}
