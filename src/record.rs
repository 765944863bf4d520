//! Btree Cells hold Records, which contain SQL rows.
//! Each field in a row has a serial type which is not the same as the column SQL type, but varies by the value stored.
//!
//! "A record contains a header and a body, in that order.
//! The header begins with a single varint which determines the total number of bytes in the header"
//! - https://www.sqlite.org/fileformat.html#record_format

use crate::serial_type;
use crate::sql_value::SqlValue;
use crate::varint::read_varint;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Payload of {payload_size} bytes is larger than the {max_local} bytes that fit on a page; overflow pages are not supported.")]
    PayloadOverflow { payload_size: i64, max_local: usize },
    #[error("Column {column} has unknown serial type code {code}.")]
    UnknownSerialType { column: usize, code: i64 },
    #[error("Record is truncated: {0} runs past the end of the payload.")]
    Truncated(&'static str),
}

/// The decoded columns of one record, with a count of the columns that could not be decoded.
///
/// A column that fails to decode holds a `SqlValue::Text` describing the failure, so `values` always
/// has one entry per serial type in the header.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub values: Vec<SqlValue>,
    pub errors: usize,
}

/// Reads the record header at the start of `record`.
///
/// Returns the serial type code of each column, in column order, and the offset where the body begins.
pub fn read_header(record: &[u8]) -> Result<(Vec<i64>, usize), Error> {
    let (hdr_len, hdr_len_len) = read_varint(record);
    if hdr_len_len == 0 || hdr_len < hdr_len_len as i64 || hdr_len as u64 > record.len() as u64 {
        return Err(Error::Truncated("record header"));
    }
    let hdr_len = hdr_len as usize;
    let mut hdr_offset = hdr_len_len;
    let mut serial_types = vec![];
    while hdr_offset < hdr_len {
        let (serial_type, bytes_read) = read_varint(&record[hdr_offset..hdr_len]);
        hdr_offset += bytes_read;
        serial_types.push(serial_type);
    }
    Ok((serial_types, hdr_len))
}

/// Decodes every column of `record`.
///
/// Text that is not valid UTF-8 does not fail the record: the column gets a placeholder value naming the
/// offending bytes and their offset in the body, `errors` is incremented, and decoding continues after the
/// column's declared width.  An unknown serial type code fails the whole record because the widths of it
/// and every later column can no longer be determined.
pub fn decode(record: &[u8]) -> Result<Record, Error> {
    let (serial_types, body_start) = read_header(record)?;
    tracing::debug!(
        "serial types: {:?}",
        serial_types
            .iter()
            .map(|t| serial_type::typecode_to_string(*t))
            .collect::<Vec<_>>()
    );
    let body = &record[body_start..];
    let mut value_offset: usize = 0;
    let mut values = Vec::with_capacity(serial_types.len());
    let mut errors = 0;
    for (column, &code) in serial_types.iter().enumerate() {
        let value_len =
            serial_type::serialized_size(code).ok_or(Error::UnknownSerialType { column, code })?;
        let data = value_offset
            .checked_add(value_len)
            .and_then(|end| body.get(value_offset..end))
            .ok_or(Error::Truncated("record body"))?;
        let value = match serial_type::to_sql_value(code, data) {
            Ok(v) => v,
            Err(serial_type::Error::InvalidStringEncoding(e)) => {
                errors += 1;
                let message = format!(
                    "failed to decode [{}] at {}: {}",
                    hex::encode(data),
                    value_offset,
                    e.utf8_error()
                );
                tracing::error!("column {}: {}", column, message);
                SqlValue::Text(message)
            }
            Err(serial_type::Error::InvalidSerialTypeCode(code)) => {
                return Err(Error::UnknownSerialType { column, code })
            }
            Err(serial_type::Error::Truncated(_)) => return Err(Error::Truncated("record body")),
        };
        values.push(value);
        value_offset += value_len;
    }
    Ok(Record { values, errors })
}

#[test]
fn test_read_header() {
    // 2 byte record header, record type is literal 1 (09), record body has zero bytes.
    assert_eq!(read_header(&[0x02, 0x09]).unwrap(), (vec![9], 2));
    // Header length varint counts itself.
    assert_eq!(read_header(&[0x01]).unwrap(), (vec![], 1));
    // A two byte serial type: 0x81 0x06 is 134, a 60 byte text.
    assert_eq!(read_header(&[0x03, 0x81, 0x06]).unwrap(), (vec![134], 3));
}

#[test]
fn test_read_header_longer_than_record() {
    assert!(matches!(read_header(&[0x05, 0x01]), Err(Error::Truncated(_))));
    assert!(matches!(read_header(&[]), Err(Error::Truncated(_))));
    assert!(matches!(read_header(&[0x00]), Err(Error::Truncated(_))));
}

#[test]
fn test_decode_five_one_byte_ints_value_ten_to_fourteen() {
    let test_record: &[u8] = &[
        0x06, 0x01, 0x01, 0x01, 0x01, 0x01, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
    ];
    let r = decode(test_record).unwrap();
    assert_eq!(r.errors, 0);
    assert_eq!(
        r.values,
        (10..=14).map(SqlValue::Int).collect::<Vec<SqlValue>>()
    );
}

#[test]
fn test_decode_various_types() {
    use SqlValue::*;
    // literal 0 | literal 1 | float 3.1415 | "Ten" | NULL
    let test_record: &[u8] = &[
        0x06, 0x08, 0x09, 0x07, 0x13, 0x00, 0x40, 0x09, 0x21, 0xca, 0xc0, 0x83, 0x12, 0x6f, 0x54,
        0x65, 0x6e,
    ];
    let r = decode(test_record).unwrap();
    assert_eq!(
        r.values,
        vec![Int(0), Int(1), Real(3.1415), Text("Ten".to_string()), Null]
    );
}

#[test]
fn test_decode_mixed_widths_advance_offsets() {
    use SqlValue::*;
    // 2 byte int | 6 byte int | blob "ab" | 8 byte int
    let test_record: &[u8] = &[
        0x05, 0x02, 0x05, 0x10, 0x06, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x61, 0x62,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    ];
    let r = decode(test_record).unwrap();
    assert_eq!(
        r.values,
        vec![Int(256), Int(1 << 32), Blob(b"ab".to_vec()), Int(-2)]
    );
    assert_eq!(r.errors, 0);
}

#[test]
fn test_decode_bad_utf8_keeps_alignment() {
    // one byte text (15) holding 0xb1 | one byte int 42
    let r = decode(&[0x03, 0x0f, 0x01, 0xb1, 0x2a]).unwrap();
    assert_eq!(r.errors, 1);
    assert_eq!(r.values.len(), 2);
    let message = r.values[0].as_text().expect("placeholder should be text");
    assert!(message.starts_with("failed to decode [b1] at 0"));
    assert_eq!(r.values[1], SqlValue::Int(42));
}

#[test]
fn test_decode_unknown_serial_type() {
    let r = decode(&[0x03, 0x01, 0x0a, 0x05]);
    assert!(matches!(
        r,
        Err(Error::UnknownSerialType { column: 1, code: 10 })
    ));
}

#[test]
fn test_decode_body_shorter_than_header_says() {
    // Header says a 3 byte text, body has 2 bytes.
    assert!(matches!(
        decode(&[0x02, 0x13, b'a', b'b']),
        Err(Error::Truncated(_))
    ));
}
