//! Byte-exact model of the DBF file header and field descriptors.
//!
//! Both structures are 32 bytes on disk. They are decoded with explicit
//! byte-offset reads rather than `repr(C)` casts, so the layout does not
//! depend on the host's alignment or padding rules.
//!
//! ```text
//! File header                          Field descriptor
//! ┌────┬───────┬─────────┬─────┬─────┐ ┌──────────┬────┬──────┬───┬───┬─────┐
//! │ 0  │ 1..=3 │ 4..=7   │8..=9│10.11│ │ 0..=10   │ 11 │12..15│16 │17 │18.. │
//! │type│ YYMMDD│ records │hdr  │rec  │ │ name     │type│disp. │len│dec│ ... │
//! └────┴───────┴─────────┴─────┴─────┘ └──────────┴────┴──────┴───┴───┴─────┘
//! 12..=26 reserved, 27 flags, 28 code page, 29..=30 reserved
//! ```

use chrono::NaiveDate;

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Size of one field descriptor in bytes.
pub const DESCRIPTOR_SIZE: usize = 32;

/// Length of the raw name field inside a descriptor.
pub const FIELD_NAME_SIZE: usize = 11;

/// Descriptor-table terminator (carriage return).
pub const TERMINATOR_CR: u8 = 0x0D;

/// Alternate descriptor-table terminator (end of file marker).
pub const TERMINATOR_EOF: u8 = 0x1A;

/// Liveness byte marking a logically deleted record.
pub const DELETED_FLAG: u8 = b'*';

/// The fixed 32-byte header at the start of every DBF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// File type / version byte (e.g. `0x03` dBASE III, `0x30` Visual `FoxPro`).
    pub version: u8,
    /// Raw last-update date: years since 1900, month, day.
    pub last_update_raw: [u8; 3],
    /// Number of record slots, live or deleted.
    pub record_count: u32,
    /// Byte offset of the first record (the header length).
    pub first_record_offset: u16,
    /// Size of one record slot, including the liveness byte.
    pub record_size: u16,
    /// Table flags byte.
    pub flags: u8,
    /// Code-page (language driver) marker.
    pub code_page_mark: u8,
}

impl FileHeader {
    /// Decodes a header from its 32 on-disk bytes.
    ///
    /// No validation happens here; see
    /// [`parser::read_header`](crate::parser::read_header).
    #[must_use]
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Self {
        Self {
            version: buf[0],
            last_update_raw: [buf[1], buf[2], buf[3]],
            record_count: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            first_record_offset: u16::from_le_bytes([buf[8], buf[9]]),
            record_size: u16::from_le_bytes([buf[10], buf[11]]),
            flags: buf[27],
            code_page_mark: buf[28],
        }
    }

    /// Encodes the header back into its 32-byte layout (reserved bytes zero).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.version;
        buf[1..4].copy_from_slice(&self.last_update_raw);
        buf[4..8].copy_from_slice(&self.record_count.to_le_bytes());
        buf[8..10].copy_from_slice(&self.first_record_offset.to_le_bytes());
        buf[10..12].copy_from_slice(&self.record_size.to_le_bytes());
        buf[27] = self.flags;
        buf[28] = self.code_page_mark;
        buf
    }

    /// Number of field-data bytes per record (the slot minus its liveness byte).
    #[must_use]
    pub fn data_len(&self) -> usize {
        usize::from(self.record_size).saturating_sub(1)
    }

    /// Absolute byte position of the record slot at `index`.
    #[must_use]
    pub fn record_position(&self, index: u32) -> u64 {
        u64::from(self.first_record_offset) + u64::from(index) * u64::from(self.record_size)
    }

    /// The last-update date, if the three raw bytes form a valid date.
    #[must_use]
    pub fn last_update(&self) -> Option<NaiveDate> {
        let [yy, mm, dd] = self.last_update_raw;
        NaiveDate::from_ymd_opt(1900 + i32::from(yy), u32::from(mm), u32::from(dd))
    }
}

/// A single 32-byte field descriptor as laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFieldDescriptor {
    /// NUL-padded field name.
    pub name: [u8; FIELD_NAME_SIZE],
    /// ASCII type code.
    pub type_code: u8,
    /// Displacement of the field within the record (unused by the decoder).
    pub displacement: u32,
    /// Declared field length in bytes.
    pub length: u8,
    /// Number of decimal places.
    pub decimal_count: u8,
    /// Field flags.
    pub flags: u8,
    /// Next auto-increment value.
    pub autoincrement_next: u32,
    /// Auto-increment step.
    pub autoincrement_step: u8,
}

impl RawFieldDescriptor {
    /// Decodes a descriptor from its 32 on-disk bytes.
    #[must_use]
    pub fn from_bytes(buf: &[u8; DESCRIPTOR_SIZE]) -> Self {
        let mut name = [0u8; FIELD_NAME_SIZE];
        name.copy_from_slice(&buf[..FIELD_NAME_SIZE]);
        Self {
            name,
            type_code: buf[11],
            displacement: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            length: buf[16],
            decimal_count: buf[17],
            flags: buf[18],
            autoincrement_next: u32::from_le_bytes([buf[19], buf[20], buf[21], buf[22]]),
            autoincrement_step: buf[23],
        }
    }

    /// Encodes the descriptor into its 32-byte layout (reserved bytes zero).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; DESCRIPTOR_SIZE] {
        let mut buf = [0u8; DESCRIPTOR_SIZE];
        buf[..FIELD_NAME_SIZE].copy_from_slice(&self.name);
        buf[11] = self.type_code;
        buf[12..16].copy_from_slice(&self.displacement.to_le_bytes());
        buf[16] = self.length;
        buf[17] = self.decimal_count;
        buf[18] = self.flags;
        buf[19..23].copy_from_slice(&self.autoincrement_next.to_le_bytes());
        buf[23] = self.autoincrement_step;
        buf
    }

    /// Returns `true` if a descriptor-table entry starting with `first`
    /// marks the end of the table.
    #[must_use]
    pub fn is_terminator(first: u8) -> bool {
        first == TERMINATOR_CR || first == TERMINATOR_EOF
    }

    /// The significant part of the name: bytes before the first NUL,
    /// with trailing space padding removed.
    #[must_use]
    pub fn name_bytes(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FIELD_NAME_SIZE);
        let mut name = &self.name[..end];
        while let [rest @ .., b' '] = name {
            name = rest;
        }
        name
    }
}
