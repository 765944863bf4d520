//! Interprets SQLite serial type codes: how wide a stored value is, and what value its bytes hold.
//! See: <https://www.sqlite.org/fileformat.html#record_format>

use byteorder::BigEndian;
use byteorder::ReadBytesExt;

use crate::sql_value::SqlValue;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid serial type code {0}.")]
    InvalidSerialTypeCode(i64),
    #[error("Value bytes ended early: {0}")]
    Truncated(#[from] std::io::Error),
    #[error("Bytes were not a valid UTF-8 string: {0}")]
    InvalidStringEncoding(#[from] std::string::FromUtf8Error),
}
use Error::*;

/// Convert a serial type number to a string describing the type suitable for debug printing.
///
/// These are not SQL types, but informal names for debugging.
pub fn typecode_to_string(serial_type: i64) -> &'static str {
    match serial_type {
        0 => "st:null",
        1 => "st:int1B",
        2 => "st:int2B",
        3 => "st:int3B",
        4 => "st:int4B",
        5 => "st:int6B",
        6 => "st:int8B",
        7 => "st:float8B",
        8 => "st:zero",
        9 => "st:one",
        10 => "st:internal_10",
        11 => "st:internal_11",
        x @ 12.. => {
            if x % 2 == 0 {
                "st:blob"
            } else {
                "st:text"
            }
        }
        i64::MIN..=-1 => "st:error_negative",
    }
}

/// Returns the number of bytes a value of `serial_type` occupies in a record body,
/// or None for codes that never appear in a well-formed database file.
pub fn serialized_size(serial_type: i64) -> Option<usize> {
    match serial_type {
        // Serial Type	Content Size	Meaning
        // 0	        0	            Value is a NULL.
        0 => Some(0),
        // 1-4	        1-4	            Value is a big-endian 8, 16, 24, or 32-bit twos-complement integer.
        1..=4 => Some(serial_type as usize),
        // 5	        6	            Value is a big-endian 48-bit twos-complement integer.
        5 => Some(6),
        // 6	        8	            Value is a big-endian 64-bit twos-complement integer.
        // 7	        8	            Value is a big-endian IEEE 754-2008 64-bit floating point number.
        6 | 7 => Some(8),
        // 8	        0	            Value is the integer 0. (Only available for schema format 4 and higher.)
        // 9	        0	            Value is the integer 1. (Only available for schema format 4 and higher.)
        8 | 9 => Some(0),
        // 10,11	    variable	    Reserved for internal use.
        10 | 11 => None,
        // N≥12 & even	(N-12)/2	    Value is a BLOB that is (N-12)/2 bytes in length.
        // N≥13 & odd	(N-13)/2	    Value is a string in the text encoding and (N-13)/2 bytes in length.
        x @ 12.. => Some((x as usize - 12 - (x as usize % 2)) / 2),
        i64::MIN..=-1 => None,
    }
}

/// Convert a sqlite value in "serial type" format into a `SqlValue`.
///
///  # Arguments
/// * `serial_type` - A SQLite serial type code.
/// * `data` - The value's bytes from the record body.  Should be `serialized_size(serial_type)` long.
///
/// Text is decoded as UTF-8.  Invalid text is reported as `InvalidStringEncoding` so that the caller
/// can decide whether to recover; the value's width is still known in that case.
pub fn to_sql_value(serial_type: i64, data: &[u8]) -> Result<SqlValue, Error> {
    use SqlValue::*;

    let mut c = std::io::Cursor::new(data);
    match serial_type {
        0 => Ok(Null),
        1 => Ok(Int(c.read_i8()? as i64)),
        2 => Ok(Int(c.read_i16::<BigEndian>()? as i64)),
        3 => Ok(Int(c.read_i24::<BigEndian>()? as i64)),
        4 => Ok(Int(c.read_i32::<BigEndian>()? as i64)),
        5 => Ok(Int(c.read_i48::<BigEndian>()?)),
        6 => Ok(Int(c.read_i64::<BigEndian>()?)),
        7 => Ok(Real(c.read_f64::<BigEndian>()?)),
        8 => Ok(Int(0)),
        9 => Ok(Int(1)),
        10 | 11 => Err(InvalidSerialTypeCode(serial_type)),
        x @ 12.. => {
            let len = serialized_size(x).ok_or(InvalidSerialTypeCode(x))?;
            let bytes = data.get(..len).ok_or_else(|| {
                Truncated(std::io::Error::from(std::io::ErrorKind::UnexpectedEof))
            })?;
            match x % 2 == 0 {
                true => Ok(Blob(bytes.to_vec())),
                false => Ok(Text(String::from_utf8(bytes.to_vec())?)),
            }
        }
        i64::MIN..=-1 => Err(InvalidSerialTypeCode(serial_type)),
    }
}

#[test]
fn test_serialized_size() {
    assert_eq!(serialized_size(0), Some(0));
    assert_eq!(serialized_size(1), Some(1));
    assert_eq!(serialized_size(3), Some(3));
    assert_eq!(serialized_size(5), Some(6));
    assert_eq!(serialized_size(6), Some(8));
    assert_eq!(serialized_size(7), Some(8));
    assert_eq!(serialized_size(8), Some(0));
    assert_eq!(serialized_size(9), Some(0));
    assert_eq!(serialized_size(10), None);
    assert_eq!(serialized_size(11), None);
    assert_eq!(serialized_size(12), Some(0));
    assert_eq!(serialized_size(13), Some(0));
    assert_eq!(serialized_size(18), Some(3));
    assert_eq!(serialized_size(19), Some(3));
    assert_eq!(serialized_size(-1), None);
}

#[test]
fn test_to_sql_value() {
    use SqlValue::*;

    assert_eq!(to_sql_value(0, b"").unwrap(), Null);
    assert_eq!(to_sql_value(8, b"").unwrap(), Int(0));
    assert_eq!(to_sql_value(9, b"").unwrap(), Int(1));

    // one byte ints
    assert_eq!(to_sql_value(1, &[0x7f]).unwrap(), Int(127));
    assert_eq!(to_sql_value(1, &[0xff]).unwrap(), Int(-1));

    // two byte ints
    assert_eq!(to_sql_value(2, &[0x01, 0x00]).unwrap(), Int(256));
    assert_eq!(to_sql_value(2, &[0xff, 0xff]).unwrap(), Int(-1));

    // three byte ints
    assert_eq!(to_sql_value(3, &[0x01, 0x00, 0x00]).unwrap(), Int(65536));
    assert_eq!(to_sql_value(3, &[0xff, 0xff, 0xff]).unwrap(), Int(-1));
    assert_eq!(to_sql_value(3, &[0x80, 0x00, 0x00]).unwrap(), Int(-8388608));

    // four, six and eight byte ints
    assert_eq!(to_sql_value(4, &[0x7f, 0xff, 0xff, 0xff]).unwrap(), Int(i32::MAX as i64));
    assert_eq!(
        to_sql_value(5, &[0x00, 0x01, 0x00, 0x00, 0x00, 0x00]).unwrap(),
        Int(1 << 32)
    );
    assert_eq!(to_sql_value(5, &[0xff; 6]).unwrap(), Int(-1));
    assert_eq!(
        to_sql_value(6, &[0x80, 0, 0, 0, 0, 0, 0, 0]).unwrap(),
        Int(i64::MIN)
    );

    // float
    assert_eq!(
        to_sql_value(7, &[0x40, 0x09, 0x21, 0xca, 0xc0, 0x83, 0x12, 0x6f]).unwrap(),
        Real(3.1415)
    );

    // Text and blobs
    assert_eq!(to_sql_value(13, b"").unwrap(), Text("".to_string()));
    assert_eq!(to_sql_value(19, b"Foo").unwrap(), Text("Foo".to_string()));
    assert_eq!(to_sql_value(18, &[0x00, 0x01, 0xff]).unwrap(), Blob(vec![0, 1, 255]));
}

#[test]
fn test_to_sql_value_errors() {
    assert!(matches!(to_sql_value(10, b""), Err(InvalidSerialTypeCode(10))));
    assert!(matches!(to_sql_value(-3, b""), Err(InvalidSerialTypeCode(-3))));
    assert!(matches!(to_sql_value(2, &[0x01]), Err(Truncated(_))));
    assert!(matches!(to_sql_value(19, b"Fo"), Err(Truncated(_))));
    assert!(matches!(to_sql_value(15, b"\xb1"), Err(InvalidStringEncoding(_))));
}
