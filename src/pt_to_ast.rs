//! `pt_to_ast` has routines for converting parse trees to ASTs for SQL.
//! A Pest parse tree has one enum for all possible terminals and non-terminals.
//! Our AST has enums for groups of terminals that are used in the same production.
//! The AST also discards some lexical detail like quoting, keyword case and position in the input.

use anyhow::{anyhow, bail, Result};
use itertools::Itertools;
use pest::iterators::Pair;

use crate::ast;
use crate::parser::Rule;
use crate::parser::SQLParser;
use crate::pest::Parser;

/// Returns the name an identifier refers to, without its quotes.
fn identifier_to_string(pair: Pair<'_, Rule>) -> Result<String> {
    // table_identifier and column_name wrap a single identifier, which wraps one quoting style.
    let inner = match pair.as_rule() {
        Rule::identifier => pair,
        _ => pair
            .into_inner()
            .next()
            .ok_or_else(|| anyhow!("Expected an identifier."))?,
    };
    let quoted = inner
        .into_inner()
        .next()
        .ok_or_else(|| anyhow!("Expected an identifier."))?;
    let s = quoted.as_str();
    Ok(match quoted.as_rule() {
        Rule::unquoted_identifier => s.to_string(),
        Rule::double_quoted_identifier => s[1..s.len() - 1].replace("\"\"", "\""),
        Rule::backquoted_identifier => s[1..s.len() - 1].replace("``", "`"),
        Rule::bracketed_identifier => s[1..s.len() - 1].to_string(),
        r => bail!("Unexpected {:?} in identifier.", r),
    })
}

pub fn pt_create_statement_to_ast(c: &str) -> Result<ast::CreateStatement> {
    let create_stmt = SQLParser::parse(Rule::create_stmt, c)?
        .next()
        .ok_or_else(|| anyhow!("Empty parse of create statement."))?;

    let mut coldefs: Vec<ast::ColDef> = vec![];
    let mut tablename = String::from("");
    for c in create_stmt.into_inner() {
        match c.as_rule() {
            Rule::table_identifier => {
                tablename = identifier_to_string(c)?;
            }
            Rule::column_defs => {
                for column_def in c.into_inner() {
                    match column_def.as_rule() {
                        Rule::column_def => {
                            let mut parts = column_def.into_inner();
                            let colname = parts
                                .next()
                                .ok_or_else(|| anyhow!("Column definition without a name."))?;
                            let coltype = parts
                                .find(|p| p.as_rule() == Rule::column_type)
                                .map(|t| t.as_str().split_whitespace().join(" "))
                                .unwrap_or_default();
                            coldefs.push(ast::ColDef {
                                colname: ast::ColName {
                                    name: identifier_to_string(colname)?,
                                },
                                coltype,
                            });
                        }
                        // Constraints on several columns do not name new columns.
                        Rule::table_constraint => (),
                        r => bail!("Unexpected {:?} in column definitions.", r),
                    }
                }
            }
            // The database name, in `CREATE TABLE main.t`.
            Rule::identifier => (),
            Rule::EOI => (),
            r => bail!("Unexpected {:?} in create statement.", r),
        }
    }
    Ok(ast::CreateStatement { tablename, coldefs })
}

pub fn pt_select_statement_to_ast(query: &str) -> Result<ast::SelectStatement> {
    let select_stmt = SQLParser::parse(Rule::select_stmt, query)?
        .next()
        .ok_or_else(|| anyhow!("Empty parse of select statement."))?;

    let mut items = vec![];
    let mut tablename = None;
    for s in select_stmt.into_inner() {
        match s.as_rule() {
            Rule::table_identifier => {
                tablename = Some(identifier_to_string(s)?);
            }
            Rule::select_items => {
                // For each select item.
                for t in s.into_inner() {
                    use ast::{ColName, SelItem};
                    let u = t
                        .into_inner()
                        .next()
                        .ok_or_else(|| anyhow!("Empty select item."))?;
                    items.push(match u.as_rule() {
                        Rule::count_star => SelItem::CountStar,
                        Rule::star => SelItem::Star,
                        Rule::column_name => SelItem::ColName(ColName {
                            name: identifier_to_string(u)?,
                        }),
                        r => bail!("Unexpected {:?} in select item.", r),
                    });
                }
            }
            Rule::EOI => (),
            r => bail!("Unexpected {:?} in select statement.", r),
        }
    }
    Ok(ast::SelectStatement {
        select: ast::SelectClause { items },
        from: ast::FromClause {
            tablename: tablename.ok_or_else(|| anyhow!("Select statement has no table."))?,
        },
    })
}

#[cfg(test)]
fn ast_create_statement_to_tuple(c: ast::CreateStatement) -> (String, Vec<String>, Vec<String>) {
    (
        c.tablename,
        c.coldefs.iter().map(|x| x.colname.name.clone()).collect(),
        c.coldefs.iter().map(|x| x.coltype.clone()).collect(),
    )
}

#[test]
fn test_pt_create_statement_to_ast() {
    let input = "CREATE TABLE t (a int)";
    let actual = pt_create_statement_to_ast(input).unwrap();
    let expected = ast::CreateStatement {
        tablename: "t".to_string(),
        coldefs: vec![ast::ColDef {
            colname: ast::ColName {
                name: "a".to_string(),
            },
            coltype: "int".to_string(),
        }],
    };
    assert_eq!(actual, expected);
}

#[test]
fn test_parse_create_statement() {
    let cases = vec![
        (
            "CREATE TABLE t (a int, b integer, c text, d string, e real)",
            (
                "t",
                vec!["a", "b", "c", "d", "e"],
                vec!["int", "integer", "text", "string", "real"],
            ),
        ),
        (
            "CREATE TABLE Tbl_Two(a int,b int)",
            ("Tbl_Two", vec!["a", "b"], vec!["int", "int"]),
        ),
        (
            "CREATE TABLE apples\n(\n\tid integer primary key autoincrement,\n\tname text,\n\tcolor text\n)",
            (
                "apples",
                vec!["id", "name", "color"],
                vec!["integer", "text", "text"],
            ),
        ),
        (
            "CREATE TABLE sqlite_sequence(name,seq)",
            ("sqlite_sequence", vec!["name", "seq"], vec!["", ""]),
        ),
        (
            "CREATE TABLE \"my table\" (\"size range\" text, [x] double  precision, a varchar(10) NOT NULL, PRIMARY KEY (a))",
            (
                "my table",
                vec!["size range", "x", "a"],
                vec!["text", "double precision", "varchar(10)"],
            ),
        ),
    ];
    for case in cases {
        let input = case.0;
        println!("Input: {}", input);
        let ast: ast::CreateStatement = pt_create_statement_to_ast(input).unwrap();
        let actual = ast_create_statement_to_tuple(ast);
        let expected = (
            String::from(case.1 .0),
            case.1 .1.iter().map(|x| String::from(*x)).collect(),
            case.1 .2.iter().map(|x| String::from(*x)).collect(),
        );
        assert_eq!(actual, expected);
    }
}

#[test]
fn test_parse_select_statement() {
    let cases = vec![
        ("SELECT * FROM tbl", ("tbl", vec!["*"])),
        ("select a,b,c fRoM tbl", ("tbl", vec!["a", "b", "c"])),
        ("select count(*) from apples;", ("apples", vec!["COUNT(*)"])),
        ("SELECT Name FROM \"Apples\"", ("Apples", vec!["Name"])),
        ("select `a``b` from [t 1]", ("t 1", vec!["a`b"])),
    ];

    for case in cases {
        let input = case.0;
        println!("Input: {}", input);
        let ss = pt_select_statement_to_ast(input).unwrap();
        assert_eq!(ss.from.tablename, case.1 .0);
        let items: Vec<String> = ss.select.items.iter().map(|i| format!("{}", i)).collect();
        assert_eq!(items, case.1 .1);
    }
}

#[test]
fn test_select_statement_parse_error() {
    assert!(pt_select_statement_to_ast("select name").is_err());
    assert!(pt_select_statement_to_ast(".tables").is_err());
}
