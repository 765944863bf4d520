//! formatting prints out query results.
//! Output follows the sqlite3 shell's list mode: one line per row, values separated by `|`.

use std::io::Write;

use itertools::Itertools;

use crate::typed_row::Row;

pub const SEPARATOR: &str = "|";

/// Formats one row as a line, without the trailing newline.
pub fn format_row(row: &Row) -> String {
    row.items.iter().join(SEPARATOR)
}

/// Writes one row, newline-terminated.
pub fn write_row<W: Write>(out: &mut W, row: &Row) -> std::io::Result<()> {
    writeln!(out, "{}", format_row(row))
}

#[test]
fn test_format_row() {
    use crate::sql_value::SqlValue::*;
    let row = Row {
        rowid: 1,
        items: vec![Int(1), Text("Fuji".to_string()), Null, Real(0.5)],
    };
    assert_eq!(format_row(&row), "1|Fuji||0.5");
}

#[test]
fn test_write_row() {
    use crate::sql_value::SqlValue::*;
    let rows = vec![
        Row {
            rowid: 1,
            items: vec![Text("Granny Smith".to_string())],
        },
        Row {
            rowid: 2,
            items: vec![Text("Fuji".to_string())],
        },
    ];
    let mut out: Vec<u8> = vec![];
    for row in &rows {
        write_row(&mut out, row).unwrap();
    }
    assert_eq!(String::from_utf8(out).unwrap(), "Granny Smith\nFuji\n");
}
