//! `parser` contains generated parsing routines for SQL and tests on them.

#[allow(unused_imports)]
use pest::Parser; // This needs to be in scope for the next statements to work.
#[derive(Parser)]
#[grammar = "sql.pest"]
pub struct SQLParser;

#[test]
fn test_parse_identifiers() {
    let cases = vec![
        "a",
        "apples",
        "Tbl_Two",
        "_x$1",
        "\"size range\"",
        "\"say \"\"hi\"\"\"",
        "`back quoted`",
        "[bracketed name]",
    ];
    for case in cases {
        let r = SQLParser::parse(Rule::identifier, case);
        assert!(r.is_ok(), "Case: {}", case);
        assert_eq!(r.unwrap().as_str(), case);
    }
}

#[test]
fn test_not_parse_invalid_identifiers() {
    let cases = vec!["1abc", "\"unterminated", "'single quoted'", "*"];
    for case in cases {
        assert!(SQLParser::parse(Rule::identifier, case).is_err(), "Case: {}", case);
    }
}

#[test]
fn test_parse_create_statements() {
    let cases = vec![
        "CREATE TABLE FOO (A INT, B INT)",
        "create table foo (a int, b int)",
        "create table foo (a int)",
        "create table foo (a int,  b int, c int, dee real)",
        "CREATE TABLE t (a int, b integer, c text, d string, e real)",
        "creaTe TaBle superlongname (superduperlongname integer)",
        "CREATE TEMPORARY TABLE FOO (A INT, B INT)",
        "CREATE TEMP TABLE FOO (A INT, B INT)",
        "CREATE TABLE apples\n(\n\tid integer primary key autoincrement,\n\tname text,\n\tcolor text\n)",
        "CREATE TABLE sqlite_sequence(name,seq)",
        "CREATE TABLE companies\n(\n\tid integer primary key autoincrement\n, name text, \"size range\" text)",
        "CREATE TABLE IF NOT EXISTS main.t (a varchar(255) NOT NULL DEFAULT 'x,y', b double precision)",
        "CREATE TABLE t (a int CHECK (a > 0), b int, PRIMARY KEY (a, b), FOREIGN KEY (b) REFERENCES u(id))",
        "CREATE TABLE t (a int, b text, UNIQUE (b)) WITHOUT ROWID, STRICT",
    ];
    for case in cases {
        println!("Case: {}", case);
        assert!(SQLParser::parse(Rule::create_stmt, case).is_ok());
    }
}

#[test]
fn test_not_parse_invalid_create_statements() {
    let cases = vec![
        "create table foo a int, b int",
        "create table foo ()",
        "create table foo (,,,,,)",
        "SELECT * from T",
        "CREATE T TABLE FOO (A INT, B INT)",
    ];
    for case in cases {
        assert!(SQLParser::parse(Rule::create_stmt, case).is_err(), "Case: {}", case);
    }
}

#[test]
fn test_parse_select_statement() {
    let cases = vec![
        ("SELECT * FROM tbl"),
        ("select a,b,c fRoM tbl"),
        ("select count(*) from apples"),
        ("SELECT COUNT( * ) FROM apples;"),
        ("select name, color from apples"),
        ("select \"size range\" from [companies]"),
        ("select count from t"),
    ];

    for case in cases {
        assert!(SQLParser::parse(Rule::select_stmt, case).is_ok(), "Case: {}", case);
    }
}

#[test]
fn test_not_parse_invalid_select_statement() {
    let cases = vec![
        ("CREATE * FROM tbl"),
        ("FROM blahblah"),
        ("select name"),
        ("select * from"),
        ("select 1 from tbl"),
        ("select * from t where x = 1"),
        ("select 'hi' from t"),
    ];

    for case in cases {
        assert!(SQLParser::parse(Rule::select_stmt, case).is_err(), "Case: {}", case);
    }
}
