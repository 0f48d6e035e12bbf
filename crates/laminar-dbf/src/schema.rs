//! Field types, descriptors and the Arrow view of a DBF schema.
//!
//! - [`FieldType`]: the DBF type codes this crate recognizes
//! - [`FieldDescriptor`]: a decoded descriptor (name, type, length, decimals)
//! - [`DbfSchema`]: the ordered, immutable field list of one file
//! - [`to_arrow_type`]: DBF → Arrow type mapping used for output columns

use std::collections::HashMap;
use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef};

use crate::header::RawFieldDescriptor;

/// Arrow field metadata key holding the DBF type code.
pub const META_TYPE: &str = "dbf.type";
/// Arrow field metadata key holding the declared field length.
pub const META_LENGTH: &str = "dbf.length";
/// Arrow field metadata key holding the decimal count.
pub const META_DECIMAL_COUNT: &str = "dbf.decimal_count";

/// Column type of a DBF field, keyed by its ASCII type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// `C`: space-padded text.
    Character,
    /// `N`: ASCII number.
    Numeric,
    /// `L`: one-byte logical.
    Logical,
    /// `D`: `YYYYMMDD` date.
    Date,
    /// `F`: ASCII floating-point number.
    Float,
    /// `I`: 4-byte little-endian integer.
    Integer,
    /// `M`: memo block reference (payload unsupported).
    Memo,
    /// `@`: 8-byte timestamp (unsupported).
    Timestamp,
    /// `O`: 8-byte little-endian double.
    Double,
    /// `B`: binary / block reference (unsupported).
    Binary,
    /// Any type code not listed above.
    Invalid,
}

impl FieldType {
    /// Maps a descriptor type code to a field type.
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            b'C' => Self::Character,
            b'N' => Self::Numeric,
            b'L' => Self::Logical,
            b'D' => Self::Date,
            b'F' => Self::Float,
            b'I' => Self::Integer,
            b'M' => Self::Memo,
            b'@' => Self::Timestamp,
            b'O' => Self::Double,
            b'B' => Self::Binary,
            _ => Self::Invalid,
        }
    }

    /// The canonical type code, or `None` for [`FieldType::Invalid`].
    #[must_use]
    pub fn code(self) -> Option<u8> {
        match self {
            Self::Character => Some(b'C'),
            Self::Numeric => Some(b'N'),
            Self::Logical => Some(b'L'),
            Self::Date => Some(b'D'),
            Self::Float => Some(b'F'),
            Self::Integer => Some(b'I'),
            Self::Memo => Some(b'M'),
            Self::Timestamp => Some(b'@'),
            Self::Double => Some(b'O'),
            Self::Binary => Some(b'B'),
            Self::Invalid => None,
        }
    }

    /// Returns `true` for types the decoder never materializes.
    #[must_use]
    pub fn is_unsupported(self) -> bool {
        matches!(
            self,
            Self::Memo | Self::Timestamp | Self::Binary | Self::Invalid
        )
    }
}

/// A decoded field descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Column name (significant bytes of the 11-byte name field).
    pub name: String,
    /// Column type.
    pub field_type: FieldType,
    /// The raw type code byte as read from the file.
    pub type_code: u8,
    /// Declared length in bytes.
    pub length: u8,
    /// Number of decimal places.
    pub decimal_count: u8,
}

impl FieldDescriptor {
    /// Creates a descriptor from its parts.
    #[must_use]
    pub fn new(name: impl Into<String>, type_code: u8, length: u8, decimal_count: u8) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::from_code(type_code),
            type_code,
            length,
            decimal_count,
        }
    }

    /// Number of record bytes this field consumes.
    ///
    /// Integer and double fields are fixed at 4 and 8 bytes no matter what
    /// length the descriptor declares; every other type uses the declared
    /// length.
    #[must_use]
    pub fn footprint(&self) -> usize {
        match self.field_type {
            FieldType::Integer => 4,
            FieldType::Double => 8,
            _ => usize::from(self.length),
        }
    }
}

impl From<&RawFieldDescriptor> for FieldDescriptor {
    fn from(raw: &RawFieldDescriptor) -> Self {
        Self::new(
            String::from_utf8_lossy(raw.name_bytes()),
            raw.type_code,
            raw.length,
            raw.decimal_count,
        )
    }
}

/// Maps a DBF field to the Arrow type of its output column.
///
/// Types the decoder does not materialize fall back to `Utf8` so the
/// column exists (always null).
#[must_use]
pub fn to_arrow_type(field: &FieldDescriptor) -> DataType {
    match field.field_type {
        FieldType::Character => DataType::Utf8,
        FieldType::Numeric | FieldType::Float => {
            if field.decimal_count > 0 {
                DataType::Float64
            } else {
                DataType::Int64
            }
        }
        FieldType::Logical => DataType::Boolean,
        FieldType::Date => DataType::Date32,
        FieldType::Integer => DataType::Int32,
        _ => DataType::Utf8,
    }
}

/// The ordered field list of a DBF file.
///
/// Order is significant twice over: it is the output column order and it
/// determines each field's byte offset inside a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbfSchema {
    fields: Vec<FieldDescriptor>,
}

impl DbfSchema {
    /// Creates a schema from descriptors in file order.
    #[must_use]
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    /// The field descriptors in file order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the file declares no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the field called `name`, if any.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Sum of all field footprints; should not exceed `record_size - 1`.
    #[must_use]
    pub fn record_footprint(&self) -> usize {
        self.fields.iter().map(FieldDescriptor::footprint).sum()
    }

    /// Builds the Arrow schema for the fields at `indices` (all fields when
    /// `None`). Every column is nullable; DBF layout details are kept as
    /// field metadata.
    #[must_use]
    pub fn arrow_schema(&self, indices: Option<&[usize]>) -> SchemaRef {
        let fields: Vec<Field> = match indices {
            Some(indices) => indices
                .iter()
                .filter_map(|&i| self.fields.get(i))
                .map(arrow_field)
                .collect(),
            None => self.fields.iter().map(arrow_field).collect(),
        };
        Arc::new(Schema::new(fields))
    }
}

fn arrow_field(field: &FieldDescriptor) -> Field {
    let metadata = HashMap::from([
        (
            META_TYPE.to_string(),
            char::from(field.type_code).to_string(),
        ),
        (META_LENGTH.to_string(), field.length.to_string()),
        (
            META_DECIMAL_COUNT.to_string(),
            field.decimal_count.to_string(),
        ),
    ]);
    Field::new(&field.name, to_arrow_type(field), true).with_metadata(metadata)
}
