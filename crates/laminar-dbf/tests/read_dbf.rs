//! End-to-end reads of on-disk DBF files.

use std::io::Write;

use arrow_array::cast::AsArray;
use arrow_array::types::{Date32Type, Float64Type, Int32Type, Int64Type};
use arrow_array::{Array, RecordBatch, RecordBatchReader};
use arrow_schema::DataType;
use laminar_dbf::error::codes;
use laminar_dbf::header::{FileHeader, RawFieldDescriptor};
use laminar_dbf::{
    discover_schema, DbfError, DbfOptions, DbfReader, DbfReaderConfig, FieldType, Stage,
};
use tempfile::NamedTempFile;

// ── Fixture builder ────────────────────────────────────────────────

struct Field {
    name: &'static str,
    code: u8,
    length: u8,
    decimals: u8,
}

/// A field's cell bytes, already laid out to its footprint.
enum Cell {
    Text(String),
    Int(i32),
    Double(f64),
}

fn footprint(field: &Field) -> usize {
    match field.code {
        b'I' => 4,
        b'O' => 8,
        _ => usize::from(field.length),
    }
}

fn dbf_bytes(fields: &[Field], rows: &[(bool, Vec<Cell>)]) -> Vec<u8> {
    let data_len: usize = fields.iter().map(footprint).sum();
    let header_len = 32 + 32 * fields.len() + 1;
    let header = FileHeader {
        version: 0x03,
        last_update_raw: [99, 12, 31],
        record_count: u32::try_from(rows.len()).unwrap(),
        first_record_offset: u16::try_from(header_len).unwrap(),
        record_size: u16::try_from(data_len + 1).unwrap(),
        flags: 0,
        code_page_mark: 0x57,
    };

    let mut out = header.to_bytes().to_vec();
    for field in fields {
        let mut name = [0u8; 11];
        name[..field.name.len()].copy_from_slice(field.name.as_bytes());
        let raw = RawFieldDescriptor {
            name,
            type_code: field.code,
            displacement: 0,
            length: field.length,
            decimal_count: field.decimals,
            flags: 0,
            autoincrement_next: 0,
            autoincrement_step: 0,
        };
        out.extend_from_slice(&raw.to_bytes());
    }
    out.push(0x0D);

    for (deleted, cells) in rows {
        out.push(if *deleted { b'*' } else { b' ' });
        for (field, cell) in fields.iter().zip(cells) {
            let mut bytes = match cell {
                Cell::Text(s) => s.as_bytes().to_vec(),
                Cell::Int(v) => v.to_le_bytes().to_vec(),
                Cell::Double(v) => v.to_le_bytes().to_vec(),
            };
            bytes.resize(footprint(field), b' ');
            out.extend_from_slice(&bytes);
        }
    }
    out.push(0x1A);
    out
}

fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

fn sales_fields() -> Vec<Field> {
    vec![
        Field { name: "ID", code: b'I', length: 4, decimals: 0 },
        Field { name: "CUSTOMER", code: b'C', length: 12, decimals: 0 },
        Field { name: "AMOUNT", code: b'N', length: 10, decimals: 2 },
        Field { name: "UNITS", code: b'N', length: 5, decimals: 0 },
        Field { name: "PAID", code: b'L', length: 1, decimals: 0 },
        Field { name: "SOLD_ON", code: b'D', length: 8, decimals: 0 },
        Field { name: "RATE", code: b'O', length: 8, decimals: 0 },
        Field { name: "NOTES", code: b'M', length: 10, decimals: 0 },
    ]
}

fn sales_row(id: i32, customer: &'static str, amount: &'static str, paid: &'static str) -> Vec<Cell> {
    vec![
        Cell::Int(id),
        Cell::Text(customer.into()),
        Cell::Text(amount.into()),
        Cell::Text("    7".into()),
        Cell::Text(paid.into()),
        Cell::Text("20240115".into()),
        Cell::Double(0.25),
        Cell::Text("0000000012".into()),
    ]
}

fn sales_file() -> NamedTempFile {
    let rows = vec![
        (false, sales_row(1, "Acme", "    199.99", "T")),
        (true, sales_row(2, "Deleted Co", "      1.00", "T")),
        (false, sales_row(3, "  Globex  ", "   abc    ", "F")),
        (false, sales_row(4, "", "          ", "x")),
    ];
    write_temp(&dbf_bytes(&sales_fields(), &rows))
}

fn read_all(reader: &mut DbfReader<impl std::io::Read + std::io::Seek>, max_rows: usize) -> Vec<RecordBatch> {
    let mut batches = Vec::new();
    loop {
        let batch = reader.fill_batch(max_rows).unwrap();
        if batch.num_rows() == 0 {
            return batches;
        }
        batches.push(batch);
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[test]
fn test_reads_every_supported_type() {
    let file = sales_file();
    let mut reader = DbfReader::open(file.path()).unwrap();
    let batches = read_all(&mut reader, 100);
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.num_rows(), 3);

    let ids = batch.column(0).as_primitive::<Int32Type>();
    assert_eq!((ids.value(0), ids.value(1), ids.value(2)), (1, 3, 4));

    let customers = batch.column(1).as_string::<i32>();
    assert_eq!(customers.value(0), "Acme");
    assert_eq!(customers.value(1), "Globex");
    assert!(customers.is_null(2));

    let amounts = batch.column(2).as_primitive::<Float64Type>();
    assert!((amounts.value(0) - 199.99).abs() < 1e-9);
    assert!(amounts.is_null(1));
    assert!(amounts.is_null(2));

    let units = batch.column(3).as_primitive::<Int64Type>();
    assert_eq!(units.value(0), 7);

    let paid = batch.column(4).as_boolean();
    assert!(paid.value(0));
    assert!(!paid.value(1));
    assert!(paid.is_null(2));

    let sold = batch.column(5).as_primitive::<Date32Type>();
    assert_eq!(sold.value(0), 19_737);

    let rates = batch.column(6).as_string::<i32>();
    assert_eq!(rates.value(0), "0.25");

    assert_eq!(batch.column(7).null_count(), 3);

    let stats = reader.stats();
    assert_eq!(stats.rows_emitted, 3);
    assert_eq!(stats.deleted_skipped, 1);
    // "abc" in AMOUNT and "x" in PAID.
    assert_eq!(stats.parse_errors, 2);
}

#[test]
fn test_arrow_schema_mapping() {
    let file = sales_file();
    let reader = DbfReader::open(file.path()).unwrap();
    let schema = reader.arrow_schema();
    let types: Vec<&DataType> = schema.fields().iter().map(|f| f.data_type()).collect();
    assert_eq!(
        types,
        vec![
            &DataType::Int32,
            &DataType::Utf8,
            &DataType::Float64,
            &DataType::Int64,
            &DataType::Boolean,
            &DataType::Date32,
            &DataType::Utf8,
            &DataType::Utf8,
        ]
    );
    assert!(schema.fields().iter().all(|f| f.is_nullable()));
}

#[test]
fn test_header_metadata() {
    let file = sales_file();
    let reader = DbfReader::open(file.path()).unwrap();
    assert_eq!(reader.record_count(), 4);
    assert_eq!(reader.header_length(), 32 + 8 * 32 + 1);
    assert_eq!(reader.record_length(), 1 + 4 + 12 + 10 + 5 + 1 + 8 + 8 + 10);
    assert_eq!(reader.code_page_mark(), 0x57);
    assert_eq!(
        reader.last_update(),
        chrono::NaiveDate::from_ymd_opt(1999, 12, 31)
    );
}

#[test]
fn test_discover_schema_without_scanning() {
    let file = sales_file();
    let schema = discover_schema(file.path()).unwrap();
    assert_eq!(schema.len(), 8);
    assert_eq!(schema.fields()[4].field_type, FieldType::Logical);
    assert_eq!(schema.index_of("RATE"), Some(6));
}

#[test]
fn test_batch_boundaries_do_not_change_output() {
    let fields = vec![Field { name: "N", code: b'N', length: 4, decimals: 0 }];
    let rows: Vec<(bool, Vec<Cell>)> = (0..97)
        .map(|i| (i % 5 == 0, vec![Cell::Text(i.to_string())]))
        .collect();
    let file = write_temp(&dbf_bytes(&fields, &rows));

    let expected: Vec<i64> = (0..97).filter(|i| i % 5 != 0).collect();
    for max_rows in [1, 3, 10, 77, 1000] {
        let mut reader = DbfReader::open(file.path()).unwrap();
        let values: Vec<i64> = read_all(&mut reader, max_rows)
            .iter()
            .inspect(|b| assert!(b.num_rows() <= max_rows))
            .flat_map(|b| {
                b.column(0)
                    .as_primitive::<Int64Type>()
                    .iter()
                    .flatten()
                    .collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(values, expected, "max_rows {max_rows}");
    }
}

#[test]
fn test_all_deleted_file_is_empty() {
    let fields = vec![Field { name: "C", code: b'C', length: 2, decimals: 0 }];
    let rows: Vec<(bool, Vec<Cell>)> = (0..500).map(|_| (true, vec![Cell::Text("zz".into())])).collect();
    let file = write_temp(&dbf_bytes(&fields, &rows));
    let mut reader = DbfReader::open(file.path()).unwrap();
    assert_eq!(reader.fill_batch(10).unwrap().num_rows(), 0);
    assert_eq!(reader.stats().deleted_skipped, 500);
}

#[test]
fn test_zero_record_file() {
    let file = write_temp(&dbf_bytes(&sales_fields(), &[]));
    let mut reader = DbfReader::open(file.path()).unwrap();
    assert!(read_all(&mut reader, 8).is_empty());
}

#[test]
fn test_missing_file_is_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = DbfReader::open(dir.path().join("absent.dbf")).unwrap_err();
    assert!(matches!(err, DbfError::Io { stage: Stage::Open, .. }));
    assert_eq!(err.code(), codes::OPEN_FAILED);
}

#[test]
fn test_short_file_is_header_error() {
    let file = write_temp(b"\x03short");
    let err = DbfReader::open(file.path()).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Header));
}

#[test]
fn test_header_offset_inside_header_rejected() {
    let mut bytes = dbf_bytes(&sales_fields(), &[]);
    bytes[8..10].copy_from_slice(&20u16.to_le_bytes());
    let file = write_temp(&bytes);
    let err = DbfReader::open(file.path()).unwrap_err();
    assert_eq!(err.code(), codes::MALFORMED_HEADER);
}

#[test]
fn test_truncated_records_fail_with_record_stage() {
    let rows = vec![
        (false, sales_row(1, "A", "1.00", "T")),
        (false, sales_row(2, "B", "2.00", "T")),
    ];
    let mut bytes = dbf_bytes(&sales_fields(), &rows);
    bytes.truncate(bytes.len() - 10);
    let file = write_temp(&bytes);

    let mut reader = DbfReader::open(file.path()).unwrap();
    let err = reader.fill_batch(10).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Record(1)));
    assert_eq!(err.code(), codes::RECORD_READ_FAILED);
}

#[test]
fn test_config_from_options_drives_reader() {
    let options: DbfOptions = [("batch.size", "2"), ("projection", "1,0")]
        .into_iter()
        .collect();
    let config = DbfReaderConfig::from_options(&options).unwrap();
    let file = sales_file();
    let reader = DbfReader::open_with_config(file.path(), config).unwrap();

    let schema = RecordBatchReader::schema(&reader);
    assert_eq!(schema.field(0).name(), "CUSTOMER");
    assert_eq!(schema.field(1).name(), "ID");

    let sizes: Vec<usize> = reader.map(|b| b.unwrap().num_rows()).collect();
    assert_eq!(sizes, vec![2, 1]);
}
