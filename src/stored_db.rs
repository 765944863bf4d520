//! Defines `StoredDb` type, which represents one disk-backed database file.
//!
//! Manages the file access to one sqlite3 file.
//! The sqlite3 file format is defined at https://www.sqlite.org/fileformat.html
//!

use std::path::Path;

use memmap2::{Mmap, MmapOptions};

use crate::btree::{self, table, Page, PageNum, RowId};
use crate::dbheader::{self, DbfileHeader};
use crate::sql_value::SqlValue;
use crate::typed_row::Row;

// Page 1 (the first page) is always a btree page, and it is the root page of the schema table.
// It has references to the root pages of other btrees.
pub const SCHEMA_TABLE_NAME: &str = "sqlite_schema";
const SCHEMA_TABLE_LEGACY_NAME: &str = "sqlite_master";
pub const SCHEMA_BTREE_ROOT_PAGENUM: PageNum = 1;
pub const SCHEMA_SCHEMA: &str =
    "CREATE TABLE sqlite_schema (type text, name text, tbl_name text, rootpage integer, sql text)";
const SCHEMA_TABLE_TYPE_COLIDX: usize = 0;
const SCHEMA_TABLE_NAME_COLIDX: usize = 1;
const SCHEMA_TABLE_TBL_NAME_COLIDX: usize = 2;
const SCHEMA_TABLE_ROOTPAGE_COLIDX: usize = 3;
const SCHEMA_TABLE_SQL_COLIDX: usize = 4;

/// Tables whose names start with this are internal to sqlite.
const RESERVED_NAME_PREFIX: &str = "sqlite_";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error accessing database file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error in database header: {0}")]
    DbHdr(#[from] dbheader::Error),
    #[error("Error reading btree: {0}")]
    Btree(#[from] btree::Error),
    #[error("Table {0} not found in database.")]
    TableNameNotFound(String),
    #[error("Schema table row {rowid} is malformed: {detail}")]
    MalformedSchemaRow { rowid: RowId, detail: &'static str },
}

/// One row of the schema table, describing a table, index, view or trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    /// One of "table", "index", "view" or "trigger".
    pub kind: String,
    pub name: String,
    pub tbl_name: String,
    /// Root page of the btree.  Zero for views and triggers.
    pub rootpage: PageNum,
    /// The CREATE statement.  Indexes that sqlite creates for UNIQUE and PRIMARY KEY constraints have none.
    pub sql: Option<String>,
}

impl SchemaEntry {
    fn from_row(row: &Row) -> Result<SchemaEntry, Error> {
        let malformed = |detail: &'static str| Error::MalformedSchemaRow {
            rowid: row.rowid,
            detail,
        };
        let text = |colidx: usize, detail: &'static str| row.get(colidx).as_text().cloned().ok_or_else(|| malformed(detail));
        let rootpage = match row.get(SCHEMA_TABLE_ROOTPAGE_COLIDX) {
            SqlValue::Int(i) => PageNum::try_from(*i).map_err(|_| malformed("rootpage out of range"))?,
            SqlValue::Null => 0,
            _ => return Err(malformed("rootpage is not an integer")),
        };
        let sql = match row.get(SCHEMA_TABLE_SQL_COLIDX) {
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Null => None,
            _ => return Err(malformed("sql is not text")),
        };
        Ok(SchemaEntry {
            kind: text(SCHEMA_TABLE_TYPE_COLIDX, "type is not text")?,
            name: text(SCHEMA_TABLE_NAME_COLIDX, "name is not text")?,
            tbl_name: text(SCHEMA_TABLE_TBL_NAME_COLIDX, "tbl_name is not text")?,
            rootpage,
            sql,
        })
    }

    pub fn is_table(&self) -> bool {
        self.kind == "table"
    }
}

/// A `StoredDb` gives read-only access to one database file.
///
/// The file is memory mapped when opened and stays mapped until the `StoredDb` is dropped.  Pages read from it
/// borrow the mapping, so no page is copied.  The schema table is read once, when the file is opened.
///
/// There are a number of page types in a SQLite database: Summarizing the SQLite documentation:
/// > The complete state of an SQLite database is usually contained in a single file on disk called the "main database file".
/// >    The main database file consists of one or more pages.*
/// > -   Every page in the main database has a single use which is one of the following:
/// >    -   The lock-byte page
/// >    -   A freelist page
/// >    -   A b-tree page
/// >    -   A payload overflow page
/// >    -   A pointer map page
///
/// Only table b-tree pages are read.
pub struct StoredDb {
    mmap: Mmap,
    header: DbfileHeader,
    schema: Vec<SchemaEntry>,
}

impl StoredDb {
    /// opens a database file, verifies it is a SQLite db file, and reads its schema table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        // The mapping is read only; another process writing the file while it is open is not supported.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        let header = dbheader::get_header(&mmap)?;
        tracing::debug!("opened {}: {:?}", path.display(), header);
        let mut db = StoredDb {
            mmap,
            header,
            schema: vec![],
        };
        db.schema = db.read_schema()?;
        Ok(db)
    }

    fn read_schema(&self) -> Result<Vec<SchemaEntry>, Error> {
        self.rows_from(SCHEMA_BTREE_ROOT_PAGENUM)
            .map(|row| SchemaEntry::from_row(&row?))
            .collect()
    }

    fn rows_from(&self, root: PageNum) -> table::Iterator<'_> {
        table::Iterator::new(
            &self.mmap,
            root,
            self.page_size() as usize,
            self.usable_size() as usize,
        )
    }

    pub fn header(&self) -> &DbfileHeader {
        &self.header
    }

    pub fn page_size(&self) -> u32 {
        self.header.pagesize
    }

    /// Page size less the bytes reserved at the end of every page.
    pub fn usable_size(&self) -> u32 {
        self.header.usable_size()
    }

    /// Every row of the schema table, in rowid order.
    pub fn schema(&self) -> &[SchemaEntry] {
        &self.schema
    }

    /// Names of the tables created by the user, in schema order.
    pub fn table_names(&self) -> Vec<&str> {
        self.schema
            .iter()
            .filter(|e| e.is_table() && !e.name.starts_with(RESERVED_NAME_PREFIX))
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Number of tables, including internal ones such as `sqlite_sequence`.
    pub fn number_of_tables(&self) -> usize {
        self.schema.iter().filter(|e| e.is_table()).count()
    }

    fn is_schema_table(table_name: &str) -> bool {
        table_name.eq_ignore_ascii_case(SCHEMA_TABLE_NAME)
            || table_name.eq_ignore_ascii_case(SCHEMA_TABLE_LEGACY_NAME)
    }

    fn find_table_entry(&self, table_name: &str) -> Option<&SchemaEntry> {
        self.schema
            .iter()
            .find(|e| e.is_table() && e.name.eq_ignore_ascii_case(table_name))
    }

    /// Get the root page number for `table_name`.  Names are matched without regard to ASCII case.
    pub fn get_root_pagenum(&self, table_name: &str) -> Option<PageNum> {
        if Self::is_schema_table(table_name) {
            return Some(SCHEMA_BTREE_ROOT_PAGENUM);
        }
        self.find_table_entry(table_name).map(|e| e.rootpage)
    }

    /// Get the SQL CREATE statement used to create `table_name`, or None.
    pub fn get_creation_sql(&self, table_name: &str) -> Option<String> {
        if Self::is_schema_table(table_name) {
            return Some(String::from(SCHEMA_SCHEMA));
        }
        self.find_table_entry(table_name).and_then(|e| e.sql.clone())
    }

    /// Reads page `pagenum` as a btree page.
    pub fn get_page(&self, pagenum: PageNum) -> Result<Page<'_>, Error> {
        Ok(btree::read_page(
            &self.mmap,
            pagenum,
            self.page_size() as usize,
            self.usable_size() as usize,
        )?)
    }

    /// Returns the root page of `table_name`, or None if there is no such table.
    pub fn find_table(&self, table_name: &str) -> Result<Option<Page<'_>>, Error> {
        match self.get_root_pagenum(table_name) {
            None => Ok(None),
            Some(pagenum) => Ok(Some(self.get_page(pagenum)?)),
        }
    }

    /// Iterates over the rows of `table_name` in rowid order.
    pub fn table_rows(&self, table_name: &str) -> Result<table::Iterator<'_>, Error> {
        let page = self
            .find_table(table_name)?
            .ok_or_else(|| Error::TableNameNotFound(table_name.to_owned()))?;
        Ok(page.rows())
    }
}

#[cfg(test)]
fn path_to_testdata(filename: &str) -> String {
    std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set")
        + "/resources/test/"
        + filename
}

#[test]
fn test_open_db() {
    let path = path_to_testdata("sample.db");
    let db = StoredDb::open(path.as_str()).expect("Should have opened db.");
    assert_eq!(db.page_size(), 4096);
    assert_eq!(db.usable_size(), 4096);
    assert_eq!(db.table_names(), vec!["apples", "oranges"]);
    assert_eq!(db.number_of_tables(), 3);
}

#[test]
fn test_get_creation_sql() {
    let path = path_to_testdata("sample.db");
    let db = StoredDb::open(path.as_str()).expect("Should have opened db.");
    let create = db.get_creation_sql("oranges").expect("Should have looked up table.");
    assert_eq!(
        create.to_lowercase().replace('\n', " "),
        "create table oranges ( id integer primary key autoincrement, name text, description text )"
    );
    assert_eq!(db.get_creation_sql("sqlite_schema").unwrap(), SCHEMA_SCHEMA);
    assert_eq!(db.get_creation_sql("pears"), None);
}

#[test]
fn test_root_pagenum() {
    let path = path_to_testdata("sample.db");
    let db = StoredDb::open(path.as_str()).expect("Should have opened db.");
    let pn = db.get_root_pagenum("apples").expect("Should have looked up table.");
    assert_eq!(pn, 2);
    assert_eq!(db.get_root_pagenum("APPLES"), Some(2));
    let pn = db.get_root_pagenum("sqlite_schema").expect("Should have looked up table.");
    assert_eq!(pn, 1);
    assert_eq!(db.get_root_pagenum("sqlite_master"), Some(1));
}

#[test]
fn test_schema_entries() {
    let path = path_to_testdata("sample.db");
    let db = StoredDb::open(path.as_str()).expect("Should have opened db.");
    let kinds: Vec<(&str, &str)> = db
        .schema()
        .iter()
        .map(|e| (e.kind.as_str(), e.name.as_str()))
        .collect();
    assert_eq!(
        kinds,
        vec![("table", "apples"), ("table", "sqlite_sequence"), ("table", "oranges")]
    );
    assert!(db.schema().iter().all(|e| e.sql.is_some()));
}

#[test]
fn test_find_table() {
    let path = path_to_testdata("sample.db");
    let db = StoredDb::open(path.as_str()).expect("Should have opened db.");
    let page = db.find_table("apples").unwrap().expect("Should have found apples.");
    assert_eq!(page.pagenum(), 2);
    assert_eq!(page.number_of_cells(), 4);
    assert!(db.find_table("pears").unwrap().is_none());
    assert!(matches!(
        db.table_rows("pears"),
        Err(Error::TableNameNotFound(_))
    ));
    let schema_page = db.find_table("sqlite_schema").unwrap().unwrap();
    assert_eq!(schema_page.pagenum(), 1);
    assert_eq!(schema_page.number_of_cells(), 3);
}

#[test]
fn test_open_missing_file() {
    let path = path_to_testdata("no-such-file.db");
    assert!(matches!(StoredDb::open(path.as_str()), Err(Error::Io(_))));
}

#[test]
fn test_open_file_that_is_not_a_db() {
    use std::io::Write;
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(&[b'x'; 1024]).unwrap();
    f.flush().unwrap();
    assert!(matches!(
        StoredDb::open(f.path()),
        Err(Error::DbHdr(dbheader::Error::WrongMagic))
    ));
}
