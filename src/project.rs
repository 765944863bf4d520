//! provides helper functions for the projection block of a query.

use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::ast;
use crate::sql_value::SqlValue;
use crate::typed_row::Row;

#[derive(Clone, Debug, PartialEq, Eq)]
/// holds possible actions to take when projecting one row.
pub enum ProjectAction {
    Take(usize), // let Take(x) ; take index x from input row, or NULL if the row is shorter.
}

/// builds the information needed to do a project of a table at runtime.
/// Column names are matched without regard to ASCII case, as sqlite does.
pub fn build_project(
    in_colnames: &[String],
    out_cols: &[ast::SelItem],
) -> Result<(Vec<ProjectAction>, Vec<String>)> {
    let mut actions = vec![];
    let mut out_colnames = vec![];
    let mut input_indexes: HashMap<String, usize> = HashMap::new();
    for (i, c) in in_colnames.iter().enumerate() {
        // The first of two same-named columns wins.
        input_indexes.entry(c.to_ascii_lowercase()).or_insert(i);
    }
    for out_item in out_cols.iter() {
        match out_item {
            ast::SelItem::ColName(n) => {
                let idx: usize = match input_indexes.get(&n.name.to_ascii_lowercase()) {
                    Some(idx) => *idx,
                    None => bail!("No such column: {}", n),
                };
                actions.push(ProjectAction::Take(idx));
                out_colnames.push(in_colnames[idx].clone());
            }
            ast::SelItem::Star => {
                for (i, name) in in_colnames.iter().enumerate() {
                    actions.push(ProjectAction::Take(i));
                    out_colnames.push(name.clone());
                }
            }
            ast::SelItem::CountStar => {
                bail!("COUNT(*) cannot be combined with other result columns.")
            }
        }
    }
    Ok((actions, out_colnames))
}

/// does the "Project" action of the relational algebra, using a pre-built set of actions.
pub fn project_row(actions: &[ProjectAction], input: &Row) -> Row {
    Row {
        rowid: input.rowid,
        items: actions
            .iter()
            .map(|action| match action {
                ProjectAction::Take(idx) => input.get(*idx).clone(),
            })
            .collect::<Vec<SqlValue>>(),
    }
}

#[cfg(test)]
fn make_ast_colname(s: &str) -> ast::SelItem {
    ast::SelItem::ColName(ast::ColName {
        name: String::from(s),
    })
}

#[cfg(test)]
fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|i| String::from(*i)).collect()
}

#[test]
fn test_build_project_colnames_only() {
    use ProjectAction::*;
    let colnames = strings(&["a", "b", "c", "d", "e"]);
    let out_cols = vec![
        make_ast_colname("a"),
        make_ast_colname("c"),
        make_ast_colname("B"),
        make_ast_colname("a"),
    ];
    let (actual_actions, actual_colnames) = build_project(&colnames, &out_cols).unwrap();
    assert_eq!(actual_actions, vec![Take(0), Take(2), Take(1), Take(0)]);
    assert_eq!(actual_colnames, strings(&["a", "c", "b", "a"]));
}

#[test]
fn test_build_project_multiple_star() {
    use ProjectAction::*;
    let colnames = strings(&["a", "b", "c"]);
    let out_cols = vec![ast::SelItem::Star, make_ast_colname("a"), ast::SelItem::Star];
    let (actual_actions, actual_colnames) = build_project(&colnames, &out_cols).unwrap();
    assert_eq!(
        actual_actions,
        vec![Take(0), Take(1), Take(2), Take(0), Take(0), Take(1), Take(2)]
    );
    assert_eq!(actual_colnames, strings(&["a", "b", "c", "a", "a", "b", "c"]));
}

#[test]
fn test_build_project_errors() {
    let colnames = strings(&["id", "name"]);
    let err = build_project(&colnames, &[make_ast_colname("color")]).unwrap_err();
    assert_eq!(err.to_string(), "No such column: color");
    assert!(build_project(&colnames, &[ast::SelItem::CountStar]).is_err());
}

#[test]
fn test_project_row_take() {
    use ProjectAction::*;
    use SqlValue::*;
    let input = Row {
        rowid: 3,
        items: vec![Int(0), Int(10), Int(20)],
    };
    // Index 5 is past the end of the stored record.
    let output = project_row(&[Take(2), Take(0), Take(5)], &input);
    assert_eq!(output.rowid, 3);
    assert_eq!(output.items, vec![Int(20), Int(0), Null]);
}
