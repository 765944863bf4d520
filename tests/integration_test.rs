use std::env;
use std::path::PathBuf;

use btreescan::btree::{self, PageType};
use btreescan::{Row, SqlValue, StoredDb};

fn path_to_testdata(filename: &str) -> String {
    env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set")
        + "/resources/test/"
        + filename
}

fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_string())
}

fn run(db: &StoredDb, command: &str) -> String {
    let mut out: Vec<u8> = vec![];
    btreescan::run_command(db, command, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

/// Builds a database with 512 byte pages and `count` empty tables named `dummy0`, `dummy1`, ...
fn build_test_database(dir: &tempfile::TempDir, count: usize) -> PathBuf {
    let path = dir.path().join("test.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA page_size = 512;").unwrap();
    for table in 0..count {
        conn.execute_batch(&format!("CREATE TABLE dummy{} (value int);", table))
            .unwrap();
    }
    let n: i64 = conn
        .query_row("SELECT count(*) FROM sqlite_schema", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n as usize, count);
    path
}

#[test]
fn test_table_names_on_sample_db() {
    let db = StoredDb::open(path_to_testdata("sample.db")).unwrap();
    assert_eq!(db.page_size(), 4096);
    assert_eq!(db.table_names(), vec!["apples", "oranges"]);
}

#[test]
fn test_apples_rows_in_rowid_order() {
    use SqlValue::Int;
    let db = StoredDb::open(path_to_testdata("sample.db")).unwrap();
    let page = db.find_table("apples").unwrap().unwrap();
    let rows: Vec<Row> = page.rows().map(|r| r.unwrap()).collect();
    let items: Vec<Vec<SqlValue>> = rows.iter().map(|r| r.items.clone()).collect();
    assert_eq!(
        items,
        vec![
            vec![Int(1), text("Granny Smith"), text("Light Green")],
            vec![Int(2), text("Fuji"), text("Red")],
            vec![Int(3), text("Honeycrisp"), text("Blush Red")],
            vec![Int(4), text("Golden Delicious"), text("Yellow")],
        ]
    );
    assert_eq!(rows.iter().map(|r| r.rowid).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
}

#[test]
fn test_dot_commands() {
    let db = StoredDb::open(path_to_testdata("sample.db")).unwrap();
    assert_eq!(
        run(&db, ".dbinfo"),
        "database page size: 4096\nnumber of tables: 3\n"
    );
    assert_eq!(run(&db, ".tables"), "apples oranges\n");
    assert_eq!(
        run(&db, ".schema"),
        "CREATE TABLE apples\n(\nid integer primary key autoincrement,\nname text,\ncolor text\n);\n\
         CREATE TABLE sqlite_sequence(name,seq);\n\
         CREATE TABLE oranges\n(\nid integer primary key autoincrement,\nname text,\ndescription text\n);\n"
    );
}

#[test]
fn test_queries_on_sample_db() {
    let db = StoredDb::open(path_to_testdata("sample.db")).unwrap();
    assert_eq!(run(&db, "SELECT COUNT(*) FROM apples"), "4\n");
    assert_eq!(run(&db, "select count(*) from oranges;"), "6\n");
    assert_eq!(
        run(&db, "SELECT name FROM apples"),
        "Granny Smith\nFuji\nHoneycrisp\nGolden Delicious\n"
    );
    assert_eq!(
        run(&db, "select NAME, color from APPLES"),
        "Granny Smith|Light Green\nFuji|Red\nHoneycrisp|Blush Red\nGolden Delicious|Yellow\n"
    );
    assert_eq!(
        run(&db, "SELECT * FROM apples"),
        "1|Granny Smith|Light Green\n2|Fuji|Red\n3|Honeycrisp|Blush Red\n4|Golden Delicious|Yellow\n"
    );
    assert_eq!(
        run(&db, "select name from oranges"),
        "Mandarin\nTangelo\nTangerine\nClementine\nValencia Orange\nNavel Orange\n"
    );
}

#[test]
fn test_query_schema_table() {
    let db = StoredDb::open(path_to_testdata("sample.db")).unwrap();
    assert_eq!(
        run(&db, "select name, rootpage from sqlite_schema"),
        "apples|2\nsqlite_sequence|3\noranges|4\n"
    );
    assert_eq!(run(&db, "select count(*) from sqlite_master"), "3\n");
}

#[test]
fn test_query_errors() {
    let db = StoredDb::open(path_to_testdata("sample.db")).unwrap();
    let mut out: Vec<u8> = vec![];

    let err = btreescan::run_command(&db, ".frobnicate", &mut out).unwrap_err();
    assert_eq!(err.to_string(), "Invalid command: .frobnicate");

    let err = btreescan::run_command(&db, "select * from pears", &mut out).unwrap_err();
    assert_eq!(err.to_string(), "Table pears not found in database.");

    let err = btreescan::run_command(&db, "select flavor from apples", &mut out).unwrap_err();
    assert_eq!(err.to_string(), "No such column: flavor");

    assert!(btreescan::run_command(&db, "select count(*), name from apples", &mut out).is_err());
    assert!(out.is_empty());
}

#[test]
fn test_multipage_table() {
    let db = StoredDb::open(path_to_testdata("multipage-512B-page.db")).unwrap();
    assert_eq!(db.page_size(), 512);
    let root = db.find_table("letters").unwrap().unwrap();
    assert_eq!(root.page_type(), PageType::TableInterior);
    let children = root.children().unwrap();
    assert_eq!(children.len(), 16);
    assert!(children.iter().all(|c| c.page_type() == PageType::TableLeaf));

    let rows: Vec<Row> = root.rows().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1000);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.rowid, i as i64 + 1);
        let letter = char::from(b'A' + (i % 26) as u8).to_string();
        assert_eq!(row.items, vec![SqlValue::Text(letter)]);
    }
    assert_eq!(run(&db, "select count(*) from letters"), "1000\n");
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        StoredDb::open(path_to_testdata("no-such.db")),
        Err(btreescan::stored_db::Error::Io(_))
    ));
}

#[test]
fn test_one_table() {
    let dir = tempfile::tempdir().unwrap();
    let db = StoredDb::open(build_test_database(&dir, 1)).unwrap();
    let schema = db.find_table("sqlite_schema").unwrap().unwrap();
    let rows: Vec<Row> = schema.rows().map(|r| r.unwrap()).collect();
    assert_eq!(
        rows.iter().map(|r| r.items.clone()).collect::<Vec<_>>(),
        vec![vec![
            text("table"),
            text("dummy0"),
            text("dummy0"),
            SqlValue::Int(2),
            text("CREATE TABLE dummy0 (value int)"),
        ]]
    );
}

#[test]
fn test_schema_fits_on_one_page() {
    let dir = tempfile::tempdir().unwrap();
    let db = StoredDb::open(build_test_database(&dir, 6)).unwrap();
    let page_one = db.get_page(1).unwrap();
    assert_eq!(page_one.page_type(), PageType::TableLeaf);
    assert_eq!(page_one.number_of_cells(), 6);
    assert!(page_one.children().unwrap().is_empty());
}

fn check_schema_split(count: usize, expected_children: usize) {
    let dir = tempfile::tempdir().unwrap();
    let db = StoredDb::open(build_test_database(&dir, count)).unwrap();
    let page_one = db.get_page(1).unwrap();
    assert_eq!(page_one.page_type(), PageType::TableInterior);
    let children = page_one.children().unwrap();
    assert_eq!(children.len(), expected_children, "{} tables", count);
    assert!(children.iter().all(|c| c.page_type() == PageType::TableLeaf));
    let cells: u32 = children.iter().map(|c| c.number_of_cells()).sum();
    assert_eq!(cells as usize, count);
    assert_eq!(db.table_names().len(), count);
}

#[test]
fn test_schema_spanning_two_pages() {
    for count in [7, 8] {
        check_schema_split(count, 1);
    }
}

#[test]
fn test_schema_spanning_three_pages() {
    for count in 9..17 {
        check_schema_split(count, 2);
    }
}

#[test]
fn test_schema_spanning_four_pages() {
    check_schema_split(17, 3);
}

#[test]
fn test_schema_spanning_more_depth() {
    let dir = tempfile::tempdir().unwrap();
    let db = StoredDb::open(build_test_database(&dir, 384)).unwrap();
    let page_one = db.get_page(1).unwrap();
    let children = page_one.children().unwrap();
    assert!(!children.is_empty());
    assert!(children.iter().any(|c| c.page_type() == PageType::TableInterior));

    let names = db.table_names();
    assert_eq!(names.len(), 384);
    let expected: Vec<String> = (0..384).map(|i| format!("dummy{}", i)).collect();
    assert_eq!(names, expected);

    // The last table is empty.
    let last = db.find_table("dummy383").unwrap().unwrap();
    assert_eq!(last.rows().count(), 0);
}

#[test]
fn test_find_table_ignores_case() {
    let dir = tempfile::tempdir().unwrap();
    let db = StoredDb::open(build_test_database(&dir, 3)).unwrap();
    let lower = db.find_table("dummy0").unwrap().unwrap();
    let upper = db.find_table("DUMMY0").unwrap().unwrap();
    assert_eq!(lower.pagenum(), upper.pagenum());
    assert_eq!(lower.pagenum(), 2);
    assert!(db.find_table("dummy9").unwrap().is_none());
}

#[test]
fn test_bad_text_does_not_stop_the_scan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id integer primary key, n int, s text);
             INSERT INTO t VALUES (1, 42, CAST(x'b1' AS TEXT));
             INSERT INTO t VALUES (2, 7, 'ok');",
        )
        .unwrap();
    }
    let db = StoredDb::open(&path).unwrap();
    let page = db.find_table("t").unwrap().unwrap();

    let cells: Vec<btree::leaf::Cell> = page
        .cell_offsets()
        .unwrap()
        .map(|offset| btree::leaf::decode_cell(page.bytes(), offset, page.usable_size()).unwrap())
        .collect();
    assert_eq!(cells.len(), 2);
    assert_eq!(cells[0].errors, 1);
    assert_eq!(cells[0].columns[0], SqlValue::Int(1));
    assert_eq!(cells[0].columns[1], SqlValue::Int(42));
    assert_eq!(cells[1].errors, 0);

    let rows: Vec<Row> = page.rows().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].items, vec![SqlValue::Int(2), SqlValue::Int(7), text("ok")]);
}
