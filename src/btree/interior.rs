use byteorder::{BigEndian, ByteOrder};

use super::cell;
use super::{Error, PageNum};

const CHILD_POINTER_SIZE: usize = 4;

/// Iterator over the child pointers of a btree interior page.
/// Intended for use in full scans.
/// Produces child page numbers: the left child of each cell in cell order, then the rightmost pointer.
pub struct ScanIterator<'a> {
    page: &'a [u8],
    pagenum: PageNum,
    ci: cell::Iterator<'a>,
    returned_rightmost: bool,
    rightmost_pointer: PageNum,
}

impl<'a> ScanIterator<'a> {
    /// Creates an iterator over the cells of a single page of a btree, with page of type TableInterior.
    ///
    /// # Arguments
    ///
    /// * `page` - The bytes of the whole page.  Borrowed for the lifetime of the iterator.
    /// * `pagenum` - The page's number, used in errors.
    /// * `ci` - A cell iterator for the page.
    /// * `rmp` - The rightmost pointer for this page.
    pub fn new(page: &'a [u8], pagenum: PageNum, ci: cell::Iterator<'a>, rmp: PageNum) -> ScanIterator<'a> {
        ScanIterator {
            page,
            pagenum,
            ci,
            returned_rightmost: false,
            rightmost_pointer: rmp,
        }
    }
}

impl<'a> core::iter::Iterator for ScanIterator<'a> {
    type Item = Result<PageNum, Error>;

    /// Returns the next child page number.
    /// All rows in a left child have rowids less than or equal to the key of its cell.
    fn next(&mut self) -> Option<Self::Item> {
        if self.returned_rightmost {
            return None;
        }
        match self.ci.next() {
            None => {
                self.returned_rightmost = true;
                Some(Ok(self.rightmost_pointer))
            }
            Some(offset) => {
                // Table B-Tree Interior Cell (header 0x05):
                // A 4-byte big-endian page number which is the left child pointer.
                // A varint which is the integer key.
                match self.page.get(offset..offset + CHILD_POINTER_SIZE) {
                    Some(b) => Some(Ok(BigEndian::read_u32(b))),
                    None => {
                        self.returned_rightmost = true;
                        Some(Err(Error::Truncated {
                            pagenum: self.pagenum,
                            offset,
                            what: "child pointer",
                        }))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
fn interior_page(children: &[PageNum], rightmost: PageNum) -> Vec<u8> {
    let mut page = vec![0_u8; 512];
    page[0] = 0x05;
    page[3..5].copy_from_slice(&(children.len() as u16).to_be_bytes());
    page[8..12].copy_from_slice(&rightmost.to_be_bytes());
    let mut content_start = page.len();
    for (i, c) in children.iter().enumerate() {
        // 4 byte child pointer then a one byte key.
        content_start -= 5;
        page[content_start..content_start + 4].copy_from_slice(&c.to_be_bytes());
        page[content_start + 4] = (i as u8 + 1) * 10;
        page[12 + 2 * i..14 + 2 * i].copy_from_slice(&(content_start as u16).to_be_bytes());
    }
    page[5..7].copy_from_slice(&(content_start as u16).to_be_bytes());
    page
}

#[cfg(test)]
fn scan(page: &[u8]) -> Vec<Result<PageNum, Error>> {
    let hdr = super::header::check_header(page, 3).unwrap();
    let ci = cell::Iterator::new(page, 3, &hdr).unwrap();
    ScanIterator::new(page, 3, ci, hdr.rightmost_pointer.unwrap()).collect()
}

#[test]
fn test_scan_iterator_visits_left_children_then_rightmost() {
    let page = interior_page(&[4, 5], 6);
    let children: Vec<PageNum> = scan(&page).into_iter().map(|c| c.unwrap()).collect();
    assert_eq!(children, vec![4, 5, 6]);
}

#[test]
fn test_scan_iterator_with_no_cells() {
    let page = interior_page(&[], 9);
    let children: Vec<PageNum> = scan(&page).into_iter().map(|c| c.unwrap()).collect();
    assert_eq!(children, vec![9]);
}

#[test]
fn test_scan_iterator_child_pointer_past_end_of_page() {
    let mut page = interior_page(&[4], 6);
    page[12..14].copy_from_slice(&510_u16.to_be_bytes());
    let children = scan(&page);
    assert_eq!(children.len(), 1);
    assert!(matches!(
        children[0],
        Err(Error::Truncated {
            pagenum: 3,
            offset: 510,
            ..
        })
    ));
}
