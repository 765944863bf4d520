//! Defines an enum of all the possible values that a column of a stored row can have.

use enum_as_inner::EnumAsInner;

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
/// can hold any value that can be read out of a table btree record.
/// These are SQLite's storage classes: the serial type of each stored value determines which variant it decodes to.
pub enum SqlValue {
    Int(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Null,
}

impl std::fmt::Display for SqlValue {
    /// Formats values the way the sqlite3 shell does in list mode: NULL is empty, blobs are raw bytes.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Int(x) => x.fmt(f),
            SqlValue::Real(x) => x.fmt(f),
            SqlValue::Text(x) => x.fmt(f),
            SqlValue::Blob(x) => String::from_utf8_lossy(x).fmt(f),
            SqlValue::Null => "".fmt(f),
        }
    }
}

#[test]
fn test_display() {
    assert_eq!(SqlValue::Int(-7).to_string(), "-7");
    assert_eq!(SqlValue::Real(2.5).to_string(), "2.5");
    assert_eq!(SqlValue::Text("Fuji".to_string()).to_string(), "Fuji");
    assert_eq!(SqlValue::Blob(b"ab".to_vec()).to_string(), "ab");
    assert_eq!(SqlValue::Null.to_string(), "");
}

#[test]
fn test_as_inner_accessors() {
    assert_eq!(SqlValue::Int(3).as_int(), Some(&3));
    assert_eq!(SqlValue::Text("t".to_string()).as_int(), None);
    assert!(SqlValue::Null.is_null());
}
