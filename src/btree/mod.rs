//! Reads table btrees out of the pages of a database file.
//!
//! SQLite btrees come in two types: Tables and Indexes.
//! Btree pages are either leaves or interior pages.
//! Each of these 4 combinations has a different cell format.  Only the two table formats are read here;
//! index pages are reported as `Error::UnsupportedPageType`.
//!
//! A b-tree page is divided into regions in the following order
//! 1. The 100-byte database file header (found on page 1 only)
//! 2. The 8 or 12 byte b-tree page header
//! 3. The cell pointer array
//! 4. Unallocated space
//! 5. The cell content area
//! 6. The reserved region.

/// SQLite row ids are 64b integers.
pub type RowId = i64;

/// Page numbers are 1-based, to match how Sqlite numbers pages.
pub type PageNum = u32;

/// Size of the database file header that precedes the btree header on page 1.
pub const DB_HEADER_SIZE: usize = 100;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Page {pagenum}: unsupported btree page type {flag:#04x}.")]
    UnsupportedPageType { pagenum: PageNum, flag: u8 },
    #[error("Page {0} is not in the database file.")]
    PageOutOfRange(PageNum),
    #[error("Page {pagenum}: {what} at offset {offset} runs past the end of the page.")]
    Truncated {
        pagenum: PageNum,
        offset: usize,
        what: &'static str,
    },
    #[error("Page {pagenum}: cell at offset {offset}: {source}")]
    Cell {
        pagenum: PageNum,
        offset: usize,
        #[source]
        source: crate::record::Error,
    },
    #[error("Btree rooted at page {root} is more than {depth} levels deep.")]
    TooDeep { root: PageNum, depth: usize },
}

/// The two kinds of table btree page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    TableInterior,
    TableLeaf,
}

impl PageType {
    /// Reads the one-byte flag at offset 0 of the btree header.
    pub fn from_flag(pagenum: PageNum, flag: u8) -> Result<PageType, Error> {
        match flag {
            0x05 => Ok(PageType::TableInterior),
            0x0d => Ok(PageType::TableLeaf),
            // 0x02 and 0x0a are index pages.
            _ => Err(Error::UnsupportedPageType { pagenum, flag }),
        }
    }

    /// Offset of the cell pointer array from the start of the btree header.
    pub fn cell_pointer_array_offset(&self) -> usize {
        match self {
            PageType::TableInterior => 12,
            PageType::TableLeaf => 8,
        }
    }
}

/// Returns where the btree header starts within page `pagenum`.
/// Cell pointers are still relative to the start of the page, including on page 1.
pub fn btree_start_offset(pagenum: PageNum) -> usize {
    match pagenum {
        1 => DB_HEADER_SIZE,
        _ => 0,
    }
}

/// module `header` defines types and methods for btree page headers.
pub mod header;
/// module `cell` provides an iterator over the cell pointer array of a page.
/// It is used by `leaf` and `interior` modules.
pub mod cell;
// module `leaf` decodes the cells of the leaf pages of a table btree.
pub mod leaf;
// module `interior` provides an iterator over the child pointers of the interior pages of a table btree.
pub mod interior;
/// module `page` reads one btree page out of the database file.
pub mod page;
/// module `table` provides an iterator over all rows of a table btree.
pub mod table;

pub use page::{read_page, Page};

#[test]
fn test_page_type_from_flag() {
    assert_eq!(PageType::from_flag(2, 0x0d).unwrap(), PageType::TableLeaf);
    assert_eq!(PageType::from_flag(2, 0x05).unwrap(), PageType::TableInterior);
    assert!(matches!(
        PageType::from_flag(7, 0x0a),
        Err(Error::UnsupportedPageType { pagenum: 7, flag: 0x0a })
    ));
    assert!(matches!(
        PageType::from_flag(7, 0x02),
        Err(Error::UnsupportedPageType { .. })
    ));
    assert!(PageType::from_flag(7, 0x00).is_err());
}

#[test]
fn test_layout_constants() {
    assert_eq!(PageType::TableLeaf.cell_pointer_array_offset(), 8);
    assert_eq!(PageType::TableInterior.cell_pointer_array_offset(), 12);
    assert_eq!(btree_start_offset(1), 100);
    assert_eq!(btree_start_offset(2), 0);
}
