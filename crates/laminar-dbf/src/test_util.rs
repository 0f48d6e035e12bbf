//! In-memory DBF file construction for unit tests.

use crate::header::{FileHeader, RawFieldDescriptor, DELETED_FLAG, HEADER_SIZE, TERMINATOR_CR};
use crate::schema::FieldDescriptor;

/// Raw 32-byte header with the given counts and everything else zeroed.
pub(crate) fn header_bytes(record_count: u32, first_record_offset: u16, record_size: u16) -> [u8; HEADER_SIZE] {
    FileHeader {
        version: 0x03,
        last_update_raw: [124, 3, 9],
        record_count,
        first_record_offset,
        record_size,
        flags: 0,
        code_page_mark: 0,
    }
    .to_bytes()
}

/// Builds a complete DBF file image.
///
/// Row values are space padded (or cut) to each field's footprint, so
/// `row(&[b"42", b"hi"])` lays out exactly what a dBASE writer would.
pub(crate) struct DbfFileBuilder {
    fields: Vec<FieldDescriptor>,
    rows: Vec<(u8, Vec<u8>)>,
    terminator: u8,
    header_padding: usize,
    record_size: Option<u16>,
    record_count: Option<u32>,
}

impl DbfFileBuilder {
    pub(crate) fn new() -> Self {
        Self {
            fields: Vec::new(),
            rows: Vec::new(),
            terminator: TERMINATOR_CR,
            header_padding: 0,
            record_size: None,
            record_count: None,
        }
    }

    pub(crate) fn field(mut self, name: &str, type_code: u8, length: u8, decimals: u8) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, type_code, length, decimals));
        self
    }

    pub(crate) fn terminator(mut self, byte: u8) -> Self {
        self.terminator = byte;
        self
    }

    pub(crate) fn header_padding(mut self, bytes: usize) -> Self {
        self.header_padding = bytes;
        self
    }

    /// Overrides the computed record size (to build inconsistent files).
    pub(crate) fn record_size(mut self, size: u16) -> Self {
        self.record_size = Some(size);
        self
    }

    /// Overrides the record count written to the header.
    pub(crate) fn record_count(mut self, count: u32) -> Self {
        self.record_count = Some(count);
        self
    }

    pub(crate) fn row(mut self, values: &[&[u8]]) -> Self {
        let data = self.layout(values);
        self.rows.push((b' ', data));
        self
    }

    pub(crate) fn deleted_row(mut self, values: &[&[u8]]) -> Self {
        let data = self.layout(values);
        self.rows.push((DELETED_FLAG, data));
        self
    }

    fn layout(&self, values: &[&[u8]]) -> Vec<u8> {
        let mut data = Vec::new();
        for (field, value) in self.fields.iter().zip(values) {
            let mut cell = value.to_vec();
            cell.resize(field.footprint(), b' ');
            data.extend_from_slice(&cell);
        }
        data
    }

    fn computed_record_size(&self) -> u16 {
        let footprint: usize = self.fields.iter().map(FieldDescriptor::footprint).sum();
        u16::try_from(footprint + 1).expect("record too large for test file")
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let record_size = self.record_size.unwrap_or_else(|| self.computed_record_size());
        let header_len = HEADER_SIZE + 32 * self.fields.len() + 1 + self.header_padding;
        let record_count = self
            .record_count
            .unwrap_or(u32::try_from(self.rows.len()).expect("too many rows"));

        let mut out = header_bytes(
            record_count,
            u16::try_from(header_len).expect("header too large"),
            record_size,
        )
        .to_vec();

        for field in &self.fields {
            let mut name = [0u8; 11];
            let len = field.name.len().min(11);
            name[..len].copy_from_slice(&field.name.as_bytes()[..len]);
            let raw = RawFieldDescriptor {
                name,
                type_code: field.type_code,
                displacement: 0,
                length: field.length,
                decimal_count: field.decimal_count,
                flags: 0,
                autoincrement_next: 0,
                autoincrement_step: 0,
            };
            out.extend_from_slice(&raw.to_bytes());
        }
        out.push(self.terminator);
        out.resize(header_len, 0);

        let data_len = usize::from(record_size).saturating_sub(1);
        for (flag, mut data) in self.rows {
            data.resize(data_len, b' ');
            out.push(flag);
            out.extend_from_slice(&data);
        }
        out.push(0x1A);
        out
    }
}
