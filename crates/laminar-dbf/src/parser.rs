//! Header and field-descriptor table parsing.
//!
//! [`read_header`] reads and validates the 32-byte file header;
//! [`read_schema`] then walks the 32-byte descriptors that follow it
//! until a terminator byte or the end of the header area.

use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};

use tracing::{debug, warn};

use crate::error::{DbfError, DbfResult, Stage};
use crate::header::{FileHeader, RawFieldDescriptor, DESCRIPTOR_SIZE, HEADER_SIZE};
use crate::schema::{DbfSchema, FieldDescriptor};

/// Reads the file header and field schema from the start of `source`.
///
/// # Errors
///
/// Returns [`DbfError::Format`] with stage `Header` if the source holds
/// fewer than 32 bytes or the header is inconsistent, and stage `Schema`
/// if the descriptor table is truncated or runs past the header area.
pub fn read_header_and_schema<R: Read + Seek>(source: &mut R) -> DbfResult<(FileHeader, DbfSchema)> {
    let header = read_header(source)?;
    let schema = read_schema(source, &header)?;

    let footprint = schema.record_footprint();
    if footprint > header.data_len() {
        warn!(
            footprint,
            record_data_len = header.data_len(),
            "DBF field footprints exceed record size; trailing fields will decode as null"
        );
    }

    let mut seen = HashSet::with_capacity(schema.len());
    for field in schema.fields() {
        if !seen.insert(field.name.as_str()) {
            warn!(field = %field.name, "duplicate DBF field name");
        }
    }

    debug!(
        version = header.version,
        record_count = header.record_count,
        header_length = header.first_record_offset,
        record_length = header.record_size,
        fields = schema.len(),
        "parsed DBF header"
    );

    Ok((header, schema))
}

/// Reads and validates the 32-byte file header at offset 0.
///
/// # Errors
///
/// Returns a header-stage [`DbfError`] if fewer than 32 bytes are
/// available, the first record offset points inside the header, or the
/// record size is zero.
pub fn read_header<R: Read + Seek>(source: &mut R) -> DbfResult<FileHeader> {
    source
        .seek(SeekFrom::Start(0))
        .map_err(|e| DbfError::io(Stage::Header, e))?;

    let mut buf = [0u8; HEADER_SIZE];
    read_exact_or_format(source, &mut buf, Stage::Header, || {
        format!("file is shorter than the {HEADER_SIZE}-byte header")
    })?;

    let header = FileHeader::from_bytes(&buf);
    if usize::from(header.first_record_offset) < HEADER_SIZE {
        return Err(DbfError::format(
            Stage::Header,
            format!(
                "first record offset {} points inside the {HEADER_SIZE}-byte header",
                header.first_record_offset
            ),
        ));
    }
    if header.record_size == 0 {
        return Err(DbfError::format(Stage::Header, "record size is zero"));
    }
    Ok(header)
}

/// Reads field descriptors starting at byte 32.
///
/// Stops at a `0x0D`/`0x1A` terminator, or once the running offset reaches
/// `first_record_offset - 1` (where the terminator conventionally lives).
/// A descriptor that would extend beyond that bound is rejected rather
/// than read from the record area.
///
/// # Errors
///
/// Returns a schema-stage [`DbfError`] on a short read or an overrunning
/// descriptor.
pub fn read_schema<R: Read + Seek>(source: &mut R, header: &FileHeader) -> DbfResult<DbfSchema> {
    let limit = usize::from(header.first_record_offset) - 1;
    let mut fields = Vec::new();
    let mut pos = HEADER_SIZE;

    source
        .seek(SeekFrom::Start(HEADER_SIZE as u64))
        .map_err(|e| DbfError::io(Stage::Schema, e))?;

    while pos < limit {
        let mut first = [0u8; 1];
        read_exact_or_format(source, &mut first, Stage::Schema, || {
            format!("field descriptor table truncated at byte {pos}")
        })?;
        if RawFieldDescriptor::is_terminator(first[0]) {
            break;
        }
        if pos + DESCRIPTOR_SIZE > limit {
            return Err(DbfError::format(
                Stage::Schema,
                format!(
                    "field descriptor at byte {pos} runs past the header end ({limit}) without a terminator"
                ),
            ));
        }

        let mut buf = [0u8; DESCRIPTOR_SIZE];
        buf[0] = first[0];
        read_exact_or_format(source, &mut buf[1..], Stage::Schema, || {
            format!("field descriptor at byte {pos} truncated")
        })?;

        fields.push(FieldDescriptor::from(&RawFieldDescriptor::from_bytes(&buf)));
        pos += DESCRIPTOR_SIZE;
    }

    Ok(DbfSchema::new(fields))
}

/// `read_exact` that reports an unexpected EOF as a format error.
fn read_exact_or_format<R: Read>(
    source: &mut R,
    buf: &mut [u8],
    stage: Stage,
    message: impl FnOnce() -> String,
) -> DbfResult<()> {
    source.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            DbfError::format(stage, message())
        } else {
            DbfError::io(stage, e)
        }
    })
}
