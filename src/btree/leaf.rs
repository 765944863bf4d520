//! leaf decodes the cells of table btree leaf pages.

use super::{cell, Error, PageNum, RowId};
use crate::record;
use crate::sql_value::SqlValue;
use crate::varint::read_varint;

/// A payload larger than the usable size less this many bytes spills onto overflow pages.
const OVERFLOW_THRESHOLD_MARGIN: usize = 35;

/// One decoded row of a table leaf page.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub rowid: RowId,
    pub payload_size: i64,
    pub columns: Vec<SqlValue>,
    /// Number of columns that held undecodable text and were replaced by a placeholder.
    pub errors: usize,
}

/// Largest payload that is stored entirely on a leaf page.
pub fn max_local_payload(usable_size: usize) -> usize {
    usable_size.saturating_sub(OVERFLOW_THRESHOLD_MARGIN)
}

/// Decodes the Table B-Tree Leaf Cell (header 0x0d) that starts at `cell_offset` within `page`.
///
/// A cell is:
/// * A varint which is the total number of bytes of payload, including any overflow
/// * A varint which is the integer key, a.k.a. "rowid"
/// * The initial portion of the payload that does not spill to overflow pages.
/// * A 4-byte big-endian integer page number for the first page of the overflow page list - omitted if all payload fits on the b-tree page.
///
/// Payloads that spill are reported as `record::Error::PayloadOverflow`.
/// When the first column is NULL it is an alias of the rowid (`INTEGER PRIMARY KEY`) and is replaced by it.
pub fn decode_cell(page: &[u8], cell_offset: usize, usable_size: usize) -> Result<Cell, record::Error> {
    let cell = page
        .get(cell_offset..)
        .ok_or(record::Error::Truncated("cell"))?;
    let (payload_size, len1) = read_varint(cell);
    if len1 == 0 {
        return Err(record::Error::Truncated("cell payload size"));
    }
    let max_local = max_local_payload(usable_size);
    // Negative sizes are treated as huge.
    if payload_size as u64 > max_local as u64 {
        return Err(record::Error::PayloadOverflow {
            payload_size,
            max_local,
        });
    }
    let (rowid, len2) = read_varint(&cell[len1..]);
    if len2 == 0 {
        return Err(record::Error::Truncated("cell rowid"));
    }
    let payload_start = len1 + len2;
    let payload = cell
        .get(payload_start..payload_start + payload_size as usize)
        .ok_or(record::Error::Truncated("cell payload"))?;
    let record = record::decode(payload)?;
    let mut columns = record.values;
    if let Some(first) = columns.first_mut() {
        if first.is_null() {
            *first = SqlValue::Int(rowid);
        }
    }
    tracing::debug!(
        "cell at {}: rowid {} payload_size {} columns {}",
        cell_offset,
        rowid,
        payload_size,
        columns.len()
    );
    Ok(Cell {
        rowid,
        payload_size,
        columns,
        errors: record.errors,
    })
}

/// Iterator over the decoded cells of one table leaf page, in cell pointer order.
pub struct Iterator<'a> {
    page: &'a [u8],
    pagenum: PageNum,
    usable_size: usize,
    ci: cell::Iterator<'a>,
    pointers: cell::Iterator<'a>,
    errors: usize,
}

impl<'a> Iterator<'a> {
    /// Creates an iterator over the cells of a single page of a btree, with page of type TableLeaf.
    ///
    /// # Arguments
    ///
    /// * `page` - The bytes of the whole page.  Borrowed for the lifetime of the iterator.
    /// * `pagenum` - The page's number, used in errors and logs.
    /// * `usable_size` - The usable size of pages in this database.
    /// * `ci` - A cell iterator for the page.
    pub fn new(page: &'a [u8], pagenum: PageNum, usable_size: usize, ci: cell::Iterator<'a>) -> Iterator<'a> {
        Iterator {
            page,
            pagenum,
            usable_size,
            pointers: ci.clone(),
            ci,
            errors: 0,
        }
    }

    /// Logs the page's error total once, after the last cell.
    fn log_page_errors(&mut self) {
        if self.errors == 0 {
            return;
        }
        tracing::error!(
            "{} text decoding error(s) on page {}",
            self.errors,
            self.pagenum
        );
        let pointers: Vec<String> = self
            .pointers
            .clone()
            .map(|off| format!("{:#06x}", off))
            .collect();
        tracing::debug!(
            "page {} cell pointer array: [{}]",
            self.pagenum,
            pointers.join(", ")
        );
        self.errors = 0;
    }
}

impl<'a> core::iter::Iterator for Iterator<'a> {
    // Overflowing payloads are not supported.
    type Item = Result<Cell, Error>;

    /// Returns the next cell on the page.  An error for one cell does not stop the iteration.
    fn next(&mut self) -> Option<Self::Item> {
        let Some(offset) = self.ci.next() else {
            self.log_page_errors();
            return None;
        };
        match decode_cell(self.page, offset, self.usable_size) {
            Ok(cell) => {
                if cell.errors > 0 {
                    self.errors += cell.errors;
                    tracing::error!(
                        "{} error(s) decoding rowid {} on page {} at offset {}",
                        cell.errors,
                        cell.rowid,
                        self.pagenum,
                        offset
                    );
                }
                Some(Ok(cell))
            }
            Err(source) => Some(Err(Error::Cell {
                pagenum: self.pagenum,
                offset,
                source,
            })),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ci.size_hint()
    }
}

#[cfg(test)]
pub(crate) fn leaf_page_with_cells(cells: &[&[u8]]) -> Vec<u8> {
    // Cells are packed at the end of a 512 byte page, first cell last, like sqlite does.
    let mut page = vec![0_u8; 512];
    let mut content_start = page.len();
    let mut pointers = vec![];
    for c in cells {
        content_start -= c.len();
        page[content_start..content_start + c.len()].copy_from_slice(c);
        pointers.push(content_start as u16);
    }
    page[0] = 0x0d;
    page[3..5].copy_from_slice(&(cells.len() as u16).to_be_bytes());
    page[5..7].copy_from_slice(&(content_start as u16).to_be_bytes());
    for (i, p) in pointers.iter().enumerate() {
        page[8 + 2 * i..10 + 2 * i].copy_from_slice(&p.to_be_bytes());
    }
    page
}

#[cfg(test)]
fn cells_of(page: &[u8]) -> Vec<Result<Cell, Error>> {
    let hdr = super::header::check_header(page, 2).unwrap();
    let ci = cell::Iterator::new(page, 2, &hdr).unwrap();
    Iterator::new(page, 2, page.len(), ci).collect()
}

#[test]
fn test_leaf_iterator_on_single_letter_rows() {
    let page = cell::test_page();
    let cells: Vec<Cell> = cells_of(&page).into_iter().map(|c| c.unwrap()).collect();
    assert_eq!(cells.len(), 10);
    for (i, c) in cells.iter().enumerate() {
        assert_eq!(c.rowid, i as i64 + 1);
        assert_eq!(c.payload_size, 3);
        assert_eq!(c.columns, vec![SqlValue::Text(((b'A' + i as u8) as char).to_string())]);
        assert_eq!(c.errors, 0);
    }
}

#[test]
fn test_decode_cell_null_first_column_is_rowid() {
    // payload 2 bytes, rowid 1, header length 2, one NULL column.
    let page = leaf_page_with_cells(&[&[0x02, 0x01, 0x02, 0x00]]);
    let hdr = super::header::check_header(&page, 2).unwrap();
    let offset = cell::Iterator::new(&page, 2, &hdr).unwrap().next().unwrap();
    let c = decode_cell(&page, offset, 512).unwrap();
    assert_eq!(c.rowid, 1);
    assert_eq!(c.columns, vec![SqlValue::Int(1)]);
}

#[test]
fn test_decode_cell_only_first_null_is_rowid() {
    // rowid 7: NULL | NULL | 'a'
    let page = leaf_page_with_cells(&[&[0x05, 0x07, 0x04, 0x00, 0x00, 0x0f, b'a']]);
    let c = cells_of(&page).pop().unwrap().unwrap();
    assert_eq!(
        c.columns,
        vec![SqlValue::Int(7), SqlValue::Null, SqlValue::Text("a".to_string())]
    );
}

#[test]
fn test_decode_cell_with_bad_text() {
    // rowid 1: 0xb1 as one byte text | int 0x0102
    let page = leaf_page_with_cells(&[
        &[0x06, 0x01, 0x03, 0x0f, 0x02, 0xb1, 0x01, 0x02],
        &[0x03, 0x02, 0x02, 0x0f, b'x'],
    ]);
    let cells = cells_of(&page);
    assert_eq!(cells.len(), 2);
    let first = cells[0].as_ref().unwrap();
    assert_eq!(first.errors, 1);
    assert_eq!(first.columns.len(), 2);
    assert_eq!(first.columns[1], SqlValue::Int(258));
    let second = cells[1].as_ref().unwrap();
    assert_eq!(second.errors, 0);
    assert_eq!(second.columns, vec![SqlValue::Text("x".to_string())]);
}

#[test]
fn test_decode_cell_payload_overflow() {
    // A payload of 0x81 0x00 = 128 bytes does not fit in a usable size of 160.
    let mut page = vec![0_u8; 512];
    page[100..103].copy_from_slice(&[0x81, 0x00, 0x01]);
    assert!(matches!(
        decode_cell(&page, 100, 160),
        Err(record::Error::PayloadOverflow {
            payload_size: 128,
            max_local: 125
        })
    ));
    // Fits in 512 bytes, but the cell runs off the end of the page.
    assert!(matches!(
        decode_cell(&page[..200], 100, 512),
        Err(record::Error::Truncated(_))
    ));
}

#[test]
fn test_bad_cell_does_not_stop_siblings() {
    // Second cell uses reserved serial type 10.
    let page = leaf_page_with_cells(&[
        &[0x03, 0x01, 0x02, 0x0f, b'a'],
        &[0x03, 0x02, 0x02, 0x0a, 0x00],
        &[0x03, 0x03, 0x02, 0x0f, b'c'],
    ]);
    let cells = cells_of(&page);
    assert_eq!(cells.len(), 3);
    assert_eq!(cells[0].as_ref().unwrap().rowid, 1);
    assert!(matches!(
        cells[1],
        Err(Error::Cell {
            pagenum: 2,
            source: record::Error::UnknownSerialType { column: 0, code: 10 },
            ..
        })
    ));
    assert_eq!(cells[2].as_ref().unwrap().rowid, 3);
}
