//! table provides iterators over Table type btrees.
//! It hides the fact that btrees span several pages.

use super::{interior, leaf, Error, Page, PageNum, PageType};
use crate::typed_row::Row;

/// Deepest descent allowed below the root.  A balanced btree of 2^32 pages is far shallower than this;
/// anything deeper has a cycle in its child pointers.
pub const MAX_DEPTH: usize = 64;

enum Frame<'z> {
    Leaf(leaf::Iterator<'z>),
    Interior(interior::ScanIterator<'z>),
}

impl<'z> Frame<'z> {
    fn for_page(page: &Page<'z>) -> Result<Frame<'z>, Error> {
        let ci = page.cell_offsets()?;
        Ok(match (page.page_type(), page.rightmost_pointer()) {
            (PageType::TableInterior, Some(rmp)) => {
                Frame::Interior(interior::ScanIterator::new(page.bytes(), page.pagenum(), ci, rmp))
            }
            _ => Frame::Leaf(leaf::Iterator::new(
                page.bytes(),
                page.pagenum(),
                page.usable_size(),
                ci,
            )),
        })
    }
}

enum Step {
    Pop,
    Descend(PageNum),
    Fail(Error),
}

/// Iterator over the rows of a Table-typed btree, in rowid order.
///
/// Pages are read when the traversal reaches them, and only the pages on the path from the root to the
/// current leaf are held at once.  An error decoding one cell is returned in place of that row and the
/// iteration continues.  An error in the structure of the tree (a bad page type, a child page outside the
/// file, a cycle) is returned once and ends the iteration.
pub struct Iterator<'p> {
    file: &'p [u8],
    root_page: PageNum,
    page_size: usize,
    usable_size: usize,
    pending: Option<PageNum>,
    stack: Vec<Frame<'p>>, // The inner iterators borrow from `file`, which outlives this iterator.
}

impl<'p> Iterator<'p> {
    /// Creates an iterator over the rows of a Table-typed btree.
    ///
    /// # Arguments
    ///
    /// * `file` - The bytes of the database file.  Borrowed for the lifetime of the iterator.
    /// * `root_page` - The root page of the btree.
    /// * `page_size` - The size of each page in the file.
    /// * `usable_size` - The page size less any reserved bytes at the end of each page.
    pub fn new(file: &'p [u8], root_page: PageNum, page_size: usize, usable_size: usize) -> Iterator<'p> {
        Iterator {
            file,
            root_page,
            page_size,
            usable_size,
            pending: Some(root_page),
            stack: vec![],
        }
    }

    /// Reads `pagenum` and pushes it onto the traversal stack.
    fn descend(&mut self, pagenum: PageNum) -> Result<(), Error> {
        if self.stack.len() >= MAX_DEPTH {
            return Err(Error::TooDeep {
                root: self.root_page,
                depth: MAX_DEPTH,
            });
        }
        let page = Page::read(self.file, pagenum, self.page_size, self.usable_size)?;
        self.stack.push(Frame::for_page(&page)?);
        Ok(())
    }

    fn fail(&mut self, e: Error) -> Option<Result<Row, Error>> {
        self.pending = None;
        self.stack.clear();
        Some(Err(e))
    }
}

impl<'p> core::iter::Iterator for Iterator<'p> {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pagenum) = self.pending.take() {
                if let Err(e) = self.descend(pagenum) {
                    return self.fail(e);
                }
            }
            let step = match self.stack.last_mut()? {
                Frame::Leaf(l) => match l.next() {
                    // When we are iterating over a leaf and aren't done, return items from the leaf.
                    Some(cell) => return Some(cell.map(Row::from)),
                    // When the leaf is done, go up to the previous interior page, if any.
                    None => Step::Pop,
                },
                Frame::Interior(i) => match i.next() {
                    // When we are still iterating on an interior page, explore down the next child pointer.
                    Some(Ok(child)) => Step::Descend(child),
                    Some(Err(e)) => Step::Fail(e),
                    // If we ran out of children on an interior page, go up to its parent.
                    None => Step::Pop,
                },
            };
            match step {
                Step::Pop => {
                    self.stack.pop();
                }
                Step::Descend(child) => self.pending = Some(child),
                Step::Fail(e) => return self.fail(e),
            }
        }
    }
}

#[test]
fn test_table_iterator_over_two_levels() {
    let file = super::page::three_page_file();
    let rows: Vec<Row> = Iterator::new(&file, 1, 512, 512)
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(rows.len(), 12);
    assert_eq!(rows[0].rowid, 1);
    assert_eq!(
        rows[11].items,
        vec![crate::sql_value::SqlValue::Text("L".to_string())]
    );
    // Restartable: a second iterator sees the same rows.
    assert_eq!(Iterator::new(&file, 1, 512, 512).count(), 12);
}

#[test]
fn test_table_iterator_stops_at_cycle() {
    let mut file = super::page::three_page_file();
    // Point page 1's rightmost child back at page 1.
    file[108..112].copy_from_slice(&1_u32.to_be_bytes());
    let results: Vec<Result<Row, Error>> = Iterator::new(&file, 1, 512, 512).collect();
    // Each visit of page 1 first walks page 2.
    assert!(results[..results.len() - 1].iter().all(|r| r.is_ok()));
    assert!(matches!(
        results.last(),
        Some(Err(Error::TooDeep { root: 1, depth: MAX_DEPTH }))
    ));
}

#[test]
fn test_table_iterator_child_out_of_range() {
    let mut file = super::page::three_page_file();
    file[108..112].copy_from_slice(&99_u32.to_be_bytes());
    let results: Vec<Result<Row, Error>> = Iterator::new(&file, 1, 512, 512).collect();
    assert_eq!(results.len(), 11);
    assert!(results[..10].iter().all(|r| r.is_ok()));
    assert!(matches!(results[10], Err(Error::PageOutOfRange(99))));
}

#[test]
fn test_table_iterator_bad_root() {
    let file = super::page::three_page_file();
    let mut it = Iterator::new(&file, 7, 512, 512);
    assert!(matches!(it.next(), Some(Err(Error::PageOutOfRange(7)))));
    assert!(it.next().is_none());
}
