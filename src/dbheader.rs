//! Reads the 100 byte database file header at the start of page 1.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("The magic bytes for this file are wrong.")]
    WrongMagic,
    #[error("The file is shorter than the {0} byte database header.")]
    Truncated(usize),
    #[error("The pagesize {0} is not a power of two between 512 and 65536.")]
    UnsupportedPagesize(u32),
    #[error("File format read version {0} is not supported by this code, though it may be valid Sqlite format.")]
    UnsupportedReadVersion(u8),
    #[error("Reserved space of {reserved} bytes leaves too little usable space in {pagesize} byte pages.")]
    InvalidReservedSpace { pagesize: u32, reserved: u8 },
    #[error("A payload fraction field is invalid per the Sqlite format spec (version 3.0.0).")]
    InvalidPayloadFraction,
    #[error("Text encoding {0} is not supported; only UTF-8 databases can be read.")]
    UnsupportedTextEncoding(u32),
}

// Reads cannot run short once the header slice has been taken.
impl From<std::io::Error> for Error {
    fn from(_: std::io::Error) -> Self {
        Error::Truncated(HEADER_SIZE)
    }
}

/// Size of the database file header.
pub const HEADER_SIZE: usize = 100;

const SQLITE3_MAGIC_STRING: &[u8] = b"SQLite format 3\0";

/// Smallest usable size the file format permits.
const MIN_USABLE_SIZE: u32 = 480;

const TEXT_ENCODING_UTF8: u32 = 1;

/// The database file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbfileHeader {
    pub pagesize: u32,
    pub write_version: u8,
    pub read_version: u8,
    pub reserved: u8,
    pub changecnt: u32,
    pub numpages: u32,
    pub freelist_pages: u32,
    pub schema_format: u32,
    pub text_encoding: u32,
}

impl DbfileHeader {
    /// Page size less the reserved bytes at the end of each page.
    pub fn usable_size(&self) -> u32 {
        self.pagesize - self.reserved as u32
    }
}

/// Reads the header from the first bytes of a database file.
pub fn get_header(file: &[u8]) -> Result<DbfileHeader, Error> {
    let mut f = Cursor::new(file.get(..HEADER_SIZE).ok_or(Error::Truncated(HEADER_SIZE))?);

    // Offset	Size	Description
    // 0        16	    The header string: "SQLite format 3\000"
    let mut fileid_buffer = [0; 16];
    f.read_exact(&mut fileid_buffer)?;
    if &fileid_buffer[..] != SQLITE3_MAGIC_STRING {
        return Err(Error::WrongMagic);
    }
    // Offset	Size	Description
    // 16	    2	    The database page size in bytes. Must be a power of two between 512 and 32768 inclusive, or the value 1 representing a page size of 65536.
    let pagesize: u32 = match f.read_u16::<BigEndian>()? {
        1 => 65536,
        x => x as u32,
    };
    if !(512..=65536).contains(&pagesize) || !pagesize.is_power_of_two() {
        return Err(Error::UnsupportedPagesize(pagesize));
    }
    // Offset	Size	Description
    // 18	    1	    File format write version. 1 for legacy; 2 for WAL.
    // 19	    1	    File format read version. 1 for legacy; 2 for WAL.
    let write_version = f.read_u8()?;
    let read_version = f.read_u8()?;
    if !(1..=2).contains(&read_version) {
        return Err(Error::UnsupportedReadVersion(read_version));
    }

    // Offset	Size	Description
    // 20	1	Bytes of unused "reserved" space at the end of each page. Usually 0.
    // 21	1	Maximum embedded payload fraction. Must be 64.
    // 22	1	Minimum embedded payload fraction. Must be 32.
    // 23	1	Leaf payload fraction. Must be 32.
    let reserved = f.read_u8()?;
    if pagesize - (reserved as u32) < MIN_USABLE_SIZE {
        return Err(Error::InvalidReservedSpace { pagesize, reserved });
    }
    if (f.read_u8()?, f.read_u8()?, f.read_u8()?) != (64, 32, 32) {
        return Err(Error::InvalidPayloadFraction);
    }

    // Offset	Size	Description
    // 24	    4	    File change counter.
    // 28	    4	    Size of the database file in pages. The "in-header database size".
    let changecnt = f.read_u32::<BigEndian>()?;
    let numpages = f.read_u32::<BigEndian>()?;

    // Offset	Size	Description
    // 32	    4	    Page number of the first freelist trunk page.
    // 36	    4	    Total number of freelist pages.
    // 40	    4	    The schema cookie.
    // 44	    4	    The schema format number. Supported schema formats are 1, 2, 3, and 4.
    let _freelist_trunk = f.read_u32::<BigEndian>()?;
    let freelist_pages = f.read_u32::<BigEndian>()?;
    let _schema_cookie = f.read_u32::<BigEndian>()?;
    let schema_format = f.read_u32::<BigEndian>()?;

    // Offset	Size	Description
    // 48	    4	    Default page cache size.
    // 52	    4	    The page number of the largest root b-tree page when in auto-vacuum or incremental-vacuum modes, or zero otherwise.
    // 56	    4	    The database text encoding. A value of 1 means UTF-8. A value of 2 means UTF-16le. A value of 3 means UTF-16be.
    let _cache_size = f.read_u32::<BigEndian>()?;
    let _largest_root = f.read_u32::<BigEndian>()?;
    let text_encoding = match f.read_u32::<BigEndian>()? {
        // An empty database has not chosen an encoding yet.
        0 => TEXT_ENCODING_UTF8,
        TEXT_ENCODING_UTF8 => TEXT_ENCODING_UTF8,
        x => return Err(Error::UnsupportedTextEncoding(x)),
    };

    Ok(DbfileHeader {
        pagesize,
        write_version,
        read_version,
        reserved,
        changecnt,
        numpages,
        freelist_pages,
        schema_format,
        text_encoding,
    })
}

#[cfg(test)]
fn test_header(pagesize: u16) -> Vec<u8> {
    let mut h = vec![0_u8; 100];
    h[..16].copy_from_slice(SQLITE3_MAGIC_STRING);
    h[16..18].copy_from_slice(&pagesize.to_be_bytes());
    h[18] = 1;
    h[19] = 1;
    h[21] = 64;
    h[22] = 32;
    h[23] = 32;
    h[28..32].copy_from_slice(&3_u32.to_be_bytes());
    h[44..48].copy_from_slice(&4_u32.to_be_bytes());
    h[56..60].copy_from_slice(&1_u32.to_be_bytes());
    h
}

#[test]
fn test_get_header() {
    let h = get_header(&test_header(4096)).unwrap();
    assert_eq!(h.pagesize, 4096);
    assert_eq!(h.numpages, 3);
    assert_eq!(h.schema_format, 4);
    assert_eq!(h.text_encoding, 1);
    assert_eq!(h.usable_size(), 4096);
}

#[test]
fn test_pagesize_one_means_65536() {
    assert_eq!(get_header(&test_header(1)).unwrap().pagesize, 65536);
}

#[test]
fn test_reserved_space() {
    let mut b = test_header(512);
    b[20] = 12;
    assert_eq!(get_header(&b).unwrap().usable_size(), 500);
    b[20] = 40;
    assert_eq!(
        get_header(&b),
        Err(Error::InvalidReservedSpace {
            pagesize: 512,
            reserved: 40
        })
    );
}

#[test]
fn test_bad_headers() {
    assert_eq!(get_header(&test_header(4096)[..50]), Err(Error::Truncated(100)));
    let mut b = test_header(4096);
    b[0] = b's';
    assert_eq!(get_header(&b), Err(Error::WrongMagic));
    assert_eq!(get_header(&test_header(1000)), Err(Error::UnsupportedPagesize(1000)));
    assert_eq!(get_header(&test_header(256)), Err(Error::UnsupportedPagesize(256)));
    let mut b = test_header(4096);
    b[19] = 3;
    assert_eq!(get_header(&b), Err(Error::UnsupportedReadVersion(3)));
    let mut b = test_header(4096);
    b[21] = 63;
    assert_eq!(get_header(&b), Err(Error::InvalidPayloadFraction));
    let mut b = test_header(4096);
    b[59] = 2;
    assert_eq!(get_header(&b), Err(Error::UnsupportedTextEncoding(2)));
}
