//! provides table rows in a typed form, owned by the caller.
//! Cells of a table leaf page decode into a `Row`: the rowid plus one `SqlValue` per stored column.
//! A row may hold fewer values than its table has columns, when columns were added by `ALTER TABLE`
//! after the row was written; the missing trailing values are NULL.

use crate::btree::leaf::Cell;
use crate::btree::RowId;
use crate::sql_value::SqlValue;

static NULL: SqlValue = SqlValue::Null;

/// can hold a sequence of values of any of the SQL types (sqlite supported subset), along with a rowid.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub rowid: RowId,
    pub items: Vec<SqlValue>,
}

impl Row {
    /// Returns the value of column `colidx`, treating columns past the end of the record as NULL.
    pub fn get(&self, colidx: usize) -> &SqlValue {
        self.items.get(colidx).unwrap_or(&NULL)
    }
}

impl From<Cell> for Row {
    fn from(c: Cell) -> Row {
        Row {
            rowid: c.rowid,
            items: c.columns,
        }
    }
}

#[test]
fn test_from_cell() {
    use SqlValue::*;
    let c = Cell {
        rowid: 4,
        payload_size: 9,
        columns: vec![Int(4), Text("Ten".to_string()), Real(3.1415)],
        errors: 0,
    };
    let r = Row::from(c);
    assert_eq!(r.rowid, 4);
    assert_eq!(r.items.len(), 3);
    assert_eq!(r.get(1), &Text(String::from("Ten")));
    assert_eq!(r.get(2), &Real(3.1415));
    assert_eq!(r.get(3), &Null);
}
