//! cell::Iterator iterates over the cell pointer array of a btree page.

use byteorder::{BigEndian, ByteOrder};

use super::header::Header;
use super::{btree_start_offset, Error, PageNum};

const CELL_POINTER_SIZE: usize = 2;

/// Iterator over the offsets of the cells within a page, without interpreting the cell contents.
///
/// Offsets are relative to the first byte of the page, even on page 1 where the btree header
/// starts after the database file header.
#[derive(Clone)]
pub struct Iterator<'a> {
    page: &'a [u8],
    next_pointer: usize,
    end: usize,
}

impl<'a> Iterator<'a> {
    /// Creates an iterator over the cell pointers of a single page of a btree.
    ///
    /// # Arguments
    ///
    /// * `page` - The bytes of the whole page.  Borrowed for the lifetime of the iterator.
    /// * `pagenum` - The page number, which decides where the btree header starts.
    /// * `hdr` - The page's btree header.
    pub fn new(page: &'a [u8], pagenum: PageNum, hdr: &Header) -> Result<Iterator<'a>, Error> {
        // Read the cell pointer array:
        // """
        // The cell pointer array of a b-tree page immediately follows the b-tree page header.
        // Let K be the number of cells on the btree. The cell pointer array consists of K 2-byte
        // integer offsets to the cell contents. The cell pointers are arranged in key order with
        // left-most cell (the cell with the smallest key) first and the right-most cell (the cell
        // with the largest key) last.
        // """
        let start = btree_start_offset(pagenum) + hdr.size();
        let end = start + CELL_POINTER_SIZE * hdr.num_cells as usize;
        if end > page.len() {
            return Err(Error::Truncated {
                pagenum,
                offset: start,
                what: "cell pointer array",
            });
        }
        Ok(Iterator {
            page,
            next_pointer: start,
            end,
        })
    }
}

impl<'a> core::iter::Iterator for Iterator<'a> {
    type Item = usize;

    /// Returns the offset of the next cell from the start of the page.
    fn next(&mut self) -> Option<Self::Item> {
        if self.next_pointer >= self.end {
            return None;
        }
        let off = BigEndian::read_u16(&self.page[self.next_pointer..self.next_pointer + CELL_POINTER_SIZE]);
        self.next_pointer += CELL_POINTER_SIZE;
        Some(off as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next_pointer) / CELL_POINTER_SIZE;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for Iterator<'a> {}

// A 512 byte table leaf page holding rowids 1 to 10, each row one single letter text column.
#[cfg(test)]
pub(crate) const TEST_PAGE: &str = "0d00 0000 0a01 ce00 01fb 01f6 01f1 01ec
01e7 01e2 01dd 01d8 01d3 01ce 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 030a
020f 4a03 0902 0f49 0308 020f 4803 0702
0f47 0306 020f 4603 0502 0f45 0304 020f
4403 0302 0f43 0302 020f 4203 0102 0f41";

#[cfg(test)]
pub(crate) fn test_page() -> Vec<u8> {
    use hex::FromHex;
    Vec::from_hex(TEST_PAGE.replace(&[' ', '\n'][..], "")).expect("Invalid Hex String")
}

#[test]
fn test_cell_iterator() {
    let p = test_page();
    assert_eq!(p.len(), 512);
    let hdr = super::header::check_header(&p, 2).unwrap();
    let ci = Iterator::new(&p, 2, &hdr).unwrap();
    assert_eq!(ci.len(), 10);
    let offsets: Vec<usize> = ci.collect();
    assert_eq!(
        offsets,
        vec![0x1fb, 0x1f6, 0x1f1, 0x1ec, 0x1e7, 0x1e2, 0x1dd, 0x1d8, 0x1d3, 0x1ce]
    );
    assert_eq!(&p[offsets[0]..offsets[0] + 5], &[0x03, 0x01, 0x02, 0x0f, 0x41]);
}

#[test]
fn test_cell_pointer_array_past_end_of_page() {
    let mut p = test_page();
    // Claim 300 cells; 600 bytes of pointers do not fit in a 512 byte page.
    p[3] = 0x01;
    p[4] = 0x2c;
    let hdr = super::header::check_header(&p, 2).unwrap();
    assert!(matches!(
        Iterator::new(&p, 2, &hdr),
        Err(Error::Truncated { what: "cell pointer array", .. })
    ));
}
