//! The decoding seam between record scanning and batch assembly.

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;

use crate::error::DbfResult;
use crate::scanner::RawRecord;

/// Decodes raw record bytes into Arrow `RecordBatch`es.
///
/// The decoder is frozen at construction: it knows the file schema and the
/// output projection, and holds no per-call configuration.
pub trait FormatDecoder: Send + Sync {
    /// Returns the Arrow schema produced by this decoder.
    fn output_schema(&self) -> SchemaRef;

    /// Decodes a batch of raw records into one `RecordBatch`, one row per
    /// record, in slice order.
    ///
    /// # Errors
    ///
    /// Returns [`DbfError::Arrow`](crate::error::DbfError::Arrow) if the
    /// columns cannot be assembled into a batch.
    fn decode_batch(&self, records: &[RawRecord]) -> DbfResult<RecordBatch>;

    /// Decodes a single raw record into a one-row `RecordBatch`.
    ///
    /// # Errors
    ///
    /// See [`decode_batch`](Self::decode_batch).
    fn decode_one(&self, record: &RawRecord) -> DbfResult<RecordBatch> {
        self.decode_batch(std::slice::from_ref(record))
    }

    /// Returns the name of the format this decoder handles.
    fn format_name(&self) -> &str;
}

const _: () = {
    fn _assert_format_decoder_object_safe(_: &dyn FormatDecoder) {}
};
