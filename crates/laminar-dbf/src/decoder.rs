//! Type-directed field decoding and Arrow batch assembly.
//!
//! Every field advances a running offset by its footprint (4 for
//! `Integer`, 8 for `Double`, the declared length otherwise) whether or
//! not its value decodes. A cell that cannot be decoded becomes null;
//! decoding never fails a record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arrow_array::builder::{
    BooleanBuilder, Date32Builder, Float64Builder, Int32Builder, Int64Builder, StringBuilder,
};
use arrow_array::{ArrayRef, RecordBatch, RecordBatchOptions};
use arrow_schema::{DataType, SchemaRef};
use chrono::{Datelike, NaiveDate};

use crate::config::{DbfReaderConfig, Utf8Strategy};
use crate::error::DbfResult;
use crate::scanner::RawRecord;
use crate::schema::{DbfSchema, FieldDescriptor, FieldType};
use crate::traits::FormatDecoder;

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A decoded, non-null cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum DbfValue {
    /// `I` field.
    Integer(i32),
    /// `N`/`F` field without decimals.
    BigInt(i64),
    /// `N`/`F` field with decimals, or an `O` field.
    Double(f64),
    /// `L` field.
    Boolean(bool),
    /// `D` field.
    Date(NaiveDate),
    /// `C` field.
    Text(String),
}

/// Converts a date to Arrow `Date32` (days since the Unix epoch).
#[must_use]
pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Outcome of decoding one cell.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Value(DbfValue),
    /// Legitimately empty: blank field or unsupported type.
    Null,
    /// Bytes present but not decodable, or the record is too short.
    Malformed,
}

impl Cell {
    fn into_value(self) -> Option<DbfValue> {
        match self {
            Self::Value(v) => Some(v),
            Self::Null | Self::Malformed => None,
        }
    }
}

/// Decodes the field that starts at `offset` in `data`.
///
/// Returns `None` for blank fields, unsupported types, unparsable values
/// and fields that run past the end of `data`. The caller advances
/// `offset` by [`FieldDescriptor::footprint`] regardless.
#[must_use]
pub fn decode_field(
    field: &FieldDescriptor,
    data: &[u8],
    offset: usize,
    invalid_utf8: Utf8Strategy,
) -> Option<DbfValue> {
    decode_cell(field, data, offset, invalid_utf8).into_value()
}

/// Decodes every field of one record, left to right.
#[must_use]
pub fn decode_record(
    schema: &DbfSchema,
    data: &[u8],
    invalid_utf8: Utf8Strategy,
) -> Vec<Option<DbfValue>> {
    let mut offset = 0;
    schema
        .fields()
        .iter()
        .map(|field| {
            let value = decode_field(field, data, offset, invalid_utf8);
            offset += field.footprint();
            value
        })
        .collect()
}

fn decode_cell(field: &FieldDescriptor, data: &[u8], offset: usize, invalid_utf8: Utf8Strategy) -> Cell {
    match field.field_type {
        FieldType::Integer => {
            return match read_fixed::<4>(data, offset) {
                Some(bytes) => Cell::Value(DbfValue::Integer(i32::from_le_bytes(bytes))),
                None => Cell::Malformed,
            };
        }
        FieldType::Double => {
            return match read_fixed::<8>(data, offset) {
                Some(bytes) => Cell::Value(DbfValue::Double(f64::from_le_bytes(bytes))),
                None => Cell::Malformed,
            };
        }
        t if t.is_unsupported() => return Cell::Null,
        _ => {}
    }

    let Some(raw) = offset
        .checked_add(usize::from(field.length))
        .and_then(|end| data.get(offset..end))
    else {
        return Cell::Malformed;
    };
    let trimmed = trim_spaces(raw);
    if trimmed.is_empty() {
        return Cell::Null;
    }

    match field.field_type {
        FieldType::Character => decode_text(trimmed, invalid_utf8),
        FieldType::Numeric | FieldType::Float => decode_number(trimmed, field.decimal_count),
        FieldType::Logical => match trimmed {
            b"T" => Cell::Value(DbfValue::Boolean(true)),
            b"F" => Cell::Value(DbfValue::Boolean(false)),
            // dBASE writes `?` for a logical that was never set.
            b"?" => Cell::Null,
            _ => Cell::Malformed,
        },
        FieldType::Date => decode_date(trimmed),
        _ => Cell::Null,
    }
}

fn read_fixed<const N: usize>(data: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    data.get(offset..end)?.try_into().ok()
}

/// Strips ASCII spaces (0x20 only) from both ends.
fn trim_spaces(bytes: &[u8]) -> &[u8] {
    let Some(start) = bytes.iter().position(|&b| b != b' ') else {
        return &[];
    };
    let end = bytes.iter().rposition(|&b| b != b' ').map_or(start, |i| i + 1);
    &bytes[start..end]
}

fn decode_text(bytes: &[u8], invalid_utf8: Utf8Strategy) -> Cell {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cell::Value(DbfValue::Text(s.to_owned())),
        Err(_) => match invalid_utf8 {
            Utf8Strategy::Lossy => {
                Cell::Value(DbfValue::Text(String::from_utf8_lossy(bytes).into_owned()))
            }
            Utf8Strategy::Null => Cell::Malformed,
        },
    }
}

fn decode_number(bytes: &[u8], decimal_count: u8) -> Cell {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return Cell::Malformed;
    };
    let value = if decimal_count > 0 {
        text.parse::<f64>().ok().map(DbfValue::Double)
    } else {
        text.parse::<i64>().ok().map(DbfValue::BigInt)
    };
    value.map_or(Cell::Malformed, Cell::Value)
}

fn decode_date(bytes: &[u8]) -> Cell {
    if bytes.len() != 8 || !bytes.iter().all(u8::is_ascii_digit) {
        return Cell::Malformed;
    }
    let digits = |range: std::ops::Range<usize>| {
        bytes[range]
            .iter()
            .fold(0u32, |acc, &b| acc * 10 + u32::from(b - b'0'))
    };
    let (year, month, day) = (digits(0..4), digits(4..6), digits(6..8));
    i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
        .map_or(Cell::Malformed, |date| Cell::Value(DbfValue::Date(date)))
}

// ── DbfDecoder ─────────────────────────────────────────────────────

/// Decodes raw DBF records into Arrow `RecordBatch`es.
///
/// Built once per file from its schema and the reader config. Fields
/// outside the projection are stepped over by footprint without being
/// decoded.
pub struct DbfDecoder {
    schema: Arc<DbfSchema>,
    output_schema: SchemaRef,
    /// For each file field, its output column (if projected).
    column_of_field: Vec<Option<usize>>,
    invalid_utf8: Utf8Strategy,
    /// Cumulative count of non-blank cells that failed to decode.
    parse_error_count: AtomicU64,
}

#[allow(clippy::missing_fields_in_debug)]
impl std::fmt::Debug for DbfDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbfDecoder")
            .field("fields", &self.schema.len())
            .field("output_schema", &self.output_schema)
            .field("invalid_utf8", &self.invalid_utf8)
            .field(
                "parse_error_count",
                &self.parse_error_count.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl DbfDecoder {
    /// Creates a decoder for every field with default settings.
    #[must_use]
    pub fn new(schema: Arc<DbfSchema>) -> Self {
        let all: Vec<usize> = (0..schema.len()).collect();
        Self::build(schema, &all, Utf8Strategy::default())
    }

    /// Creates a decoder honoring the config's projection and UTF-8 strategy.
    ///
    /// # Errors
    ///
    /// Returns [`DbfError::InvalidConfig`](crate::error::DbfError::InvalidConfig)
    /// if the projection names a field the schema does not have.
    pub fn with_config(schema: Arc<DbfSchema>, config: &DbfReaderConfig) -> DbfResult<Self> {
        config.validate_for(&schema)?;
        let projection = match &config.projection {
            Some(indices) => indices.clone(),
            None => (0..schema.len()).collect(),
        };
        Ok(Self::build(schema, &projection, config.invalid_utf8))
    }

    fn build(schema: Arc<DbfSchema>, projection: &[usize], invalid_utf8: Utf8Strategy) -> Self {
        let mut column_of_field = vec![None; schema.len()];
        for (column, &field) in projection.iter().enumerate() {
            column_of_field[field] = Some(column);
        }
        let output_schema = schema.arrow_schema(Some(projection));
        Self {
            schema,
            output_schema,
            column_of_field,
            invalid_utf8,
            parse_error_count: AtomicU64::new(0),
        }
    }

    /// Returns the cumulative parse error count.
    pub fn parse_error_count(&self) -> u64 {
        self.parse_error_count.load(Ordering::Relaxed)
    }

    /// The file schema this decoder walks.
    #[must_use]
    pub fn schema(&self) -> &Arc<DbfSchema> {
        &self.schema
    }

    fn decode_row(&self, data: &[u8], builders: &mut [Box<dyn ColumnBuilder>]) {
        let mut offset = 0;
        for (field, column) in self.schema.fields().iter().zip(&self.column_of_field) {
            if let Some(column) = *column {
                let builder = &mut builders[column];
                match decode_cell(field, data, offset, self.invalid_utf8) {
                    Cell::Value(value) => {
                        if !builder.append_decoded(value) {
                            self.parse_error_count.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Cell::Null => builder.append_null_value(),
                    Cell::Malformed => {
                        self.parse_error_count.fetch_add(1, Ordering::Relaxed);
                        builder.append_null_value();
                    }
                }
            }
            offset += field.footprint();
        }
    }
}

impl FormatDecoder for DbfDecoder {
    fn output_schema(&self) -> SchemaRef {
        self.output_schema.clone()
    }

    fn decode_batch(&self, records: &[RawRecord]) -> DbfResult<RecordBatch> {
        if records.is_empty() {
            return Ok(RecordBatch::new_empty(self.output_schema.clone()));
        }

        let mut builders = create_builders(&self.output_schema, records.len());
        for record in records {
            self.decode_row(&record.data, &mut builders);
        }

        let columns: Vec<ArrayRef> = builders.iter_mut().map(|b| b.finish()).collect();
        // Explicit row count keeps zero-column projections meaningful.
        let options = RecordBatchOptions::new().with_row_count(Some(records.len()));
        Ok(RecordBatch::try_new_with_options(
            self.output_schema.clone(),
            columns,
            &options,
        )?)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn format_name(&self) -> &str {
        "dbf"
    }
}

// ── Builder helpers ────────────────────────────────────────────────

/// Trait-object wrapper so heterogeneous builders fit in one `Vec`.
trait ColumnBuilder: Send {
    fn finish(&mut self) -> ArrayRef;
    fn append_null_value(&mut self);
    /// Appends `value`, or a null if it does not fit the column type.
    /// Returns `false` in the latter case.
    fn append_decoded(&mut self, value: DbfValue) -> bool;
}

macro_rules! impl_column_builder {
    ($builder:ty, $variant:ident) => {
        impl ColumnBuilder for $builder {
            fn finish(&mut self) -> ArrayRef {
                Arc::new(<$builder>::finish(self))
            }
            fn append_null_value(&mut self) {
                self.append_null();
            }
            fn append_decoded(&mut self, value: DbfValue) -> bool {
                if let DbfValue::$variant(v) = value {
                    self.append_value(v);
                    true
                } else {
                    self.append_null();
                    false
                }
            }
        }
    };
}

impl_column_builder!(Int32Builder, Integer);
impl_column_builder!(Int64Builder, BigInt);
impl_column_builder!(Float64Builder, Double);
impl_column_builder!(BooleanBuilder, Boolean);

impl ColumnBuilder for Date32Builder {
    fn finish(&mut self) -> ArrayRef {
        Arc::new(Date32Builder::finish(self))
    }
    fn append_null_value(&mut self) {
        self.append_null();
    }
    fn append_decoded(&mut self, value: DbfValue) -> bool {
        if let DbfValue::Date(date) = value {
            self.append_value(date_to_days(date));
            true
        } else {
            self.append_null();
            false
        }
    }
}

impl ColumnBuilder for StringBuilder {
    fn finish(&mut self) -> ArrayRef {
        Arc::new(StringBuilder::finish(self))
    }
    fn append_null_value(&mut self) {
        self.append_null();
    }
    fn append_decoded(&mut self, value: DbfValue) -> bool {
        match value {
            DbfValue::Text(s) => self.append_value(s),
            // `O` columns are Utf8 in the Arrow mapping.
            DbfValue::Double(d) => self.append_value(double_to_text(d)),
            _ => {
                self.append_null();
                return false;
            }
        }
        true
    }
}

/// Renders a double with at least one fractional digit (`2` as `"2.0"`).
fn double_to_text(value: f64) -> String {
    let mut text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        text.push_str(".0");
    }
    text
}

fn create_builders(schema: &SchemaRef, capacity: usize) -> Vec<Box<dyn ColumnBuilder>> {
    schema
        .fields()
        .iter()
        .map(|f| create_builder(f.data_type(), capacity))
        .collect()
}

fn create_builder(data_type: &DataType, capacity: usize) -> Box<dyn ColumnBuilder> {
    match data_type {
        DataType::Boolean => Box::new(BooleanBuilder::with_capacity(capacity)),
        DataType::Int32 => Box::new(Int32Builder::with_capacity(capacity)),
        DataType::Int64 => Box::new(Int64Builder::with_capacity(capacity)),
        DataType::Float64 => Box::new(Float64Builder::with_capacity(capacity)),
        DataType::Date32 => Box::new(Date32Builder::with_capacity(capacity)),
        _ => Box::new(StringBuilder::with_capacity(capacity, capacity * 16)),
    }
}
