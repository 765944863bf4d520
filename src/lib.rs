mod ast;
pub mod btree;
pub mod dbheader;
mod formatting;
pub mod parser;
mod project;
mod pt_to_ast;
pub mod record;
pub mod serial_type;
pub mod sql_value;
pub mod stored_db;
pub mod typed_row;
pub mod varint;

extern crate pest;
#[macro_use]
extern crate pest_derive;

use std::io::Write;

use anyhow::{bail, Context, Result};

pub use sql_value::SqlValue;
pub use stored_db::StoredDb;
pub use typed_row::Row;

/// Runs a dot-command, or else a query, against `db`, writing its output to `out`.
pub fn run_command<W: Write>(db: &StoredDb, command: &str, out: &mut W) -> Result<()> {
    match command.trim() {
        ".dbinfo" => {
            writeln!(out, "database page size: {}", db.page_size())?;
            writeln!(out, "number of tables: {}", db.number_of_tables())?;
        }
        ".tables" => {
            writeln!(out, "{}", db.table_names().join(" "))?;
        }
        ".schema" => {
            for sql in db.schema().iter().filter_map(|e| e.sql.as_deref()) {
                writeln!(out, "{};", sql)?;
            }
        }
        query => run_query(db, query, out)?,
    }
    Ok(())
}

/// Runs a SELECT statement, printing one line per row in list mode.
pub fn run_query<W: Write>(db: &StoredDb, query: &str, out: &mut W) -> Result<()> {
    // Convert parse tree to AST.
    let ss: ast::SelectStatement = pt_to_ast::pt_select_statement_to_ast(query)
        .with_context(|| format!("Invalid command: {}", query))?;
    let table_name = ss.from.tablename.as_str();
    let items = &ss.select.items;

    if items.iter().any(|i| i.is_count_star()) {
        if items.len() != 1 {
            bail!("COUNT(*) cannot be combined with other result columns.");
        }
        let mut count: usize = 0;
        for row in db.table_rows(table_name)? {
            row.with_context(|| format!("Error reading table {}", table_name))?;
            count += 1;
        }
        writeln!(out, "{}", count)?;
        return Ok(());
    }

    let create_sql = db
        .get_creation_sql(table_name)
        .ok_or_else(|| stored_db::Error::TableNameNotFound(table_name.to_owned()))?;
    let create = pt_to_ast::pt_create_statement_to_ast(&create_sql)
        .with_context(|| format!("Unable to parse schema of table {}", table_name))?;
    let colnames: Vec<String> = create.coldefs.into_iter().map(|c| c.colname.name).collect();
    let (actions, _) = project::build_project(&colnames, items)?;

    for row in db.table_rows(table_name)? {
        let row = row.with_context(|| format!("Error reading table {}", table_name))?;
        formatting::write_row(out, &project::project_row(&actions, &row))?;
    }
    Ok(())
}
