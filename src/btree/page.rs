//! page reads one table btree page out of the bytes of a database file.

use super::header::{check_header, Header};
use super::{cell, interior, table, Error, PageNum, PageType};

/// A view of one btree page.  Pages are cheap to construct and borrow the file's bytes rather than copy them.
#[derive(Clone)]
pub struct Page<'a> {
    file: &'a [u8],
    bytes: &'a [u8],
    pagenum: PageNum,
    page_size: usize,
    usable_size: usize,
    header: Header,
}

/// Reads page `pagenum` of `file`, which is split into pages of `page_size` bytes.
///
/// Page N occupies bytes `[(N-1)*page_size, N*page_size)`.  Page numbers start at 1.
pub fn read_page(file: &[u8], pagenum: PageNum, page_size: usize, usable_size: usize) -> Result<Page<'_>, Error> {
    Page::read(file, pagenum, page_size, usable_size)
}

impl<'a> Page<'a> {
    pub fn read(file: &'a [u8], pagenum: PageNum, page_size: usize, usable_size: usize) -> Result<Page<'a>, Error> {
        let bytes = (pagenum as usize)
            .checked_sub(1)
            .and_then(|n| n.checked_mul(page_size))
            .and_then(|start| file.get(start..start.checked_add(page_size)?))
            .ok_or(Error::PageOutOfRange(pagenum))?;
        let header = check_header(bytes, pagenum)?;
        tracing::trace!(
            "read page {}: {:?} with {} cells",
            pagenum,
            header.btree_page_type,
            header.num_cells
        );
        if header.freeblock_start != 0 {
            // Freeblocks lie in the cell content area, and are never reached through the cell pointer array.
            tracing::warn!(
                "page {} has a freeblock list starting at {}; ignoring it",
                pagenum,
                header.freeblock_start
            );
        }
        Ok(Page {
            file,
            bytes,
            pagenum,
            page_size,
            usable_size,
            header,
        })
    }

    pub fn pagenum(&self) -> PageNum {
        self.pagenum
    }

    pub fn page_type(&self) -> PageType {
        self.header.btree_page_type
    }

    pub fn number_of_cells(&self) -> u32 {
        self.header.num_cells
    }

    pub fn cell_content_area_start(&self) -> u32 {
        self.header.cell_content_start
    }

    pub fn first_freeblock(&self) -> u32 {
        self.header.freeblock_start
    }

    /// The rightmost child of an interior page; None for a leaf.
    pub fn rightmost_pointer(&self) -> Option<PageNum> {
        self.header.rightmost_pointer
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The bytes of the whole page, from its first byte, including the database header on page 1.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn usable_size(&self) -> usize {
        self.usable_size
    }

    /// Offsets of the page's cells, in cell pointer array order.
    pub fn cell_offsets(&self) -> Result<cell::Iterator<'a>, Error> {
        cell::Iterator::new(self.bytes, self.pagenum, &self.header)
    }

    /// Child page numbers of an interior page, left children in cell order followed by the rightmost child.
    /// A leaf page has no children.
    pub fn child_page_numbers(&self) -> Result<Vec<PageNum>, Error> {
        match self.header.rightmost_pointer {
            None => Ok(vec![]),
            Some(rmp) => {
                interior::ScanIterator::new(self.bytes, self.pagenum, self.cell_offsets()?, rmp).collect()
            }
        }
    }

    /// Reads the child pages of an interior page.
    pub fn children(&self) -> Result<Vec<Page<'a>>, Error> {
        self.child_page_numbers()?
            .into_iter()
            .map(|n| Page::read(self.file, n, self.page_size, self.usable_size))
            .collect()
    }

    /// Every row in the btree rooted at this page, in rowid order.  Rows are decoded as the iterator advances.
    pub fn rows(&self) -> table::Iterator<'a> {
        table::Iterator::new(self.file, self.pagenum, self.page_size, self.usable_size)
    }
}

impl<'a> std::fmt::Debug for Page<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("pagenum", &self.pagenum)
            .field("page_size", &self.page_size)
            .field("header", &self.header)
            .finish()
    }
}

/// Builds a 3 page file: page 1 is an interior root whose children are leaf pages 2 and 3.
#[cfg(test)]
pub(crate) fn three_page_file() -> Vec<u8> {
    let mut file = vec![0_u8; 512];
    // Database header is not read by this module; start the btree header at 100.
    file[100] = 0x05;
    file[103..105].copy_from_slice(&1_u16.to_be_bytes());
    file[105..107].copy_from_slice(&500_u16.to_be_bytes());
    file[108..112].copy_from_slice(&3_u32.to_be_bytes());
    file[112..114].copy_from_slice(&500_u16.to_be_bytes());
    // Left child page 2, key 10.
    file[500..505].copy_from_slice(&[0x00, 0x00, 0x00, 0x02, 0x0a]);
    file.extend(cell::test_page());
    let page3: &[&[u8]] = &[
        &[0x03, 0x0b, 0x02, 0x0f, b'K'],
        &[0x03, 0x0c, 0x02, 0x0f, b'L'],
    ];
    file.extend(super::leaf::leaf_page_with_cells(page3));
    file
}

#[test]
fn test_read_leaf_page() {
    let file = three_page_file();
    let p = read_page(&file, 2, 512, 512).unwrap();
    assert_eq!(p.pagenum(), 2);
    assert_eq!(p.page_type(), PageType::TableLeaf);
    assert_eq!(p.number_of_cells(), 10);
    assert_eq!(p.cell_content_area_start(), 0x1ce);
    assert_eq!(p.first_freeblock(), 0);
    assert_eq!(p.rightmost_pointer(), None);
    assert_eq!(p.child_page_numbers().unwrap(), Vec::<PageNum>::new());
    assert!(p.children().unwrap().is_empty());
    let rowids: Vec<i64> = p.rows().map(|r| r.unwrap().rowid).collect();
    assert_eq!(rowids, (1..=10).collect::<Vec<i64>>());
}

#[test]
fn test_read_leaf_page_with_freeblock() {
    use crate::sql_value::SqlValue;
    use crate::typed_row::Row;
    let mut file = three_page_file();
    // Page 2 starts at byte 512; its first freeblock field is at offsets 1 and 2.
    file[513..515].copy_from_slice(&0x0100_u16.to_be_bytes());
    let p = read_page(&file, 2, 512, 512).unwrap();
    assert_eq!(p.first_freeblock(), 0x100);
    assert_eq!(p.number_of_cells(), 10);
    let rows: Vec<Row> = p.rows().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0].items, vec![SqlValue::Text("A".to_string())]);
    assert_eq!(rows[9].rowid, 10);
    assert_eq!(rows[9].items, vec![SqlValue::Text("J".to_string())]);
}

#[test]
fn test_read_interior_page_one() {
    let file = three_page_file();
    let p = read_page(&file, 1, 512, 512).unwrap();
    assert_eq!(p.page_type(), PageType::TableInterior);
    assert_eq!(p.number_of_cells(), 1);
    // Cell pointers on page 1 count from the start of the file, not the btree header.
    assert_eq!(p.cell_offsets().unwrap().collect::<Vec<_>>(), vec![500]);
    assert_eq!(p.child_page_numbers().unwrap(), vec![2, 3]);
    let children = p.children().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(
        children.iter().map(|c| c.number_of_cells()).sum::<u32>(),
        12
    );
    let rowids: Vec<i64> = p.rows().map(|r| r.unwrap().rowid).collect();
    assert_eq!(rowids, (1..=12).collect::<Vec<i64>>());
}

#[test]
fn test_read_page_out_of_range() {
    let file = three_page_file();
    assert!(matches!(read_page(&file, 0, 512, 512), Err(Error::PageOutOfRange(0))));
    assert!(matches!(read_page(&file, 4, 512, 512), Err(Error::PageOutOfRange(4))));
    // A file that ends partway through a page.
    assert!(matches!(
        read_page(&file[..1000], 2, 512, 512),
        Err(Error::PageOutOfRange(2))
    ));
}

#[test]
fn test_read_index_page() {
    let mut file = three_page_file();
    file[512] = 0x0a;
    assert!(matches!(
        read_page(&file, 2, 512, 512),
        Err(Error::UnsupportedPageType { pagenum: 2, flag: 0x0a })
    ));
}
