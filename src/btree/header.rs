//! header reads the header of a btree page.

use super::{btree_start_offset, Error, PageNum, PageType};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

/// The btree page header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub btree_page_type: PageType,
    pub freeblock_start: u32,
    pub num_cells: u32,
    pub cell_content_start: u32,
    pub fragmented_free_bytes: u8,
    pub rightmost_pointer: Option<PageNum>,
}

impl Header {
    /// Size of this header in bytes; the cell pointer array follows it.
    pub fn size(&self) -> usize {
        self.btree_page_type.cell_pointer_array_offset()
    }
}

/// Reads the btree header of `page`, which holds the whole of page `pagenum` starting from its first byte.
pub fn check_header(page: &[u8], pagenum: PageNum) -> Result<Header, Error> {
    let start = btree_start_offset(pagenum);
    let truncated = |_: std::io::Error| Error::Truncated {
        pagenum,
        offset: start,
        what: "btree header",
    };
    let mut c = Cursor::new(page);
    // The first page has a header which is not btree content, but which is included in cell pointers.
    c.set_position(start as u64);

    // Offset	Size	Description
    // 0	1	The one-byte flag at offset 0 indicating the b-tree page type.
    let btree_page_type = PageType::from_flag(pagenum, c.read_u8().map_err(truncated)?)?;
    // 1	2	The two-byte integer at offset 1 gives the start of the first freeblock on the page, or is zero if there are no freeblocks.
    let freeblock_start = c.read_u16::<BigEndian>().map_err(truncated)? as u32;
    // 3	2	The two-byte integer at offset 3 gives the number of cells on the page.
    let num_cells = c.read_u16::<BigEndian>().map_err(truncated)? as u32;
    // 5	2	The two-byte integer at offset 5 designates the start of the cell content area. A zero value for this integer is interpreted as 65536.
    let cell_content_start = match c.read_u16::<BigEndian>().map_err(truncated)? {
        0 => 65536,
        x => x as u32,
    };
    // 7	1	The one-byte integer at offset 7 gives the number of fragmented free bytes within the cell content area.
    let fragmented_free_bytes = c.read_u8().map_err(truncated)?;
    // 8	4	The four-byte page number at offset 8 is the right-most pointer. This value appears in the header of interior b-tree pages only and is omitted from all other pages.
    let rightmost_pointer = match btree_page_type {
        PageType::TableInterior => Some(c.read_u32::<BigEndian>().map_err(truncated)?),
        PageType::TableLeaf => None,
    };

    Ok(Header {
        btree_page_type,
        freeblock_start,
        num_cells,
        cell_content_start,
        fragmented_free_bytes,
        rightmost_pointer,
    })
}

#[test]
fn test_leaf_header() {
    let mut page = vec![0_u8; 512];
    page[..8].copy_from_slice(&[0x0d, 0x00, 0x00, 0x00, 0x0a, 0x01, 0xce, 0x00]);
    let hdr = check_header(&page, 2).unwrap();
    assert_eq!(
        hdr,
        Header {
            btree_page_type: PageType::TableLeaf,
            freeblock_start: 0,
            num_cells: 10,
            cell_content_start: 0x1ce,
            fragmented_free_bytes: 0,
            rightmost_pointer: None,
        }
    );
    assert_eq!(hdr.size(), 8);
}

#[test]
fn test_interior_header_on_page_one() {
    let mut page = vec![0_u8; 512];
    page[100..112].copy_from_slice(&[
        0x05, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03,
    ]);
    let hdr = check_header(&page, 1).unwrap();
    assert_eq!(hdr.btree_page_type, PageType::TableInterior);
    assert_eq!(hdr.num_cells, 1);
    // Zero means 65536.
    assert_eq!(hdr.cell_content_start, 65536);
    assert_eq!(hdr.fragmented_free_bytes, 2);
    assert_eq!(hdr.rightmost_pointer, Some(3));
    assert_eq!(hdr.size(), 12);
}

#[test]
fn test_header_errors() {
    let page = vec![0x0a_u8; 16];
    assert!(matches!(
        check_header(&page, 4),
        Err(Error::UnsupportedPageType { pagenum: 4, flag: 0x0a })
    ));
    assert!(matches!(
        check_header(&[0x05, 0x00, 0x00], 4),
        Err(Error::Truncated { .. })
    ));
    assert!(matches!(
        check_header(&[0x0d; 50], 1),
        Err(Error::Truncated { .. })
    ));
}
