//! cqlsh result tables
//!
//! cqlsh renders a `SELECT` as:
//!
//! ```text
//!
//!  table_name | id
//! ------------+--------------------------------------
//!       users | 5a1c395e-b41f-11e5-9f22-ba0be0483c18
//!
//! (1 rows)
//! ```
//!
//! The header is located by its column names rather than by position, so
//! warnings printed before it are tolerated. Anything else that deviates
//! from this shape is a `SchemaParse` error.

use super::unexpected;
use crate::errors::Result;
use crate::model::names::{TableDirectory, TableName};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static FOOTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((\d+) rows?\)$").expect("valid footer regex"));

/// Rows of a cqlsh result table, cells trimmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CqlTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn split_cells(line: &str) -> Vec<String> {
    line.split('|').map(|c| c.trim().to_string()).collect()
}

fn is_separator(line: &str) -> bool {
    let line = line.trim();
    line.contains('-') && line.chars().all(|c| c == '-' || c == '+')
}

/// Parse a cqlsh result table whose header is exactly `columns`
pub fn parse_cql_table(output: &str, columns: &[&str]) -> Result<CqlTable> {
    const WHAT: &str = "query output";
    let lines: Vec<&str> = output.lines().collect();

    let header = lines
        .iter()
        .position(|line| split_cells(line) == columns)
        .ok_or_else(|| unexpected(WHAT, format!("no header row '{}'", columns.join(" | "))))?;

    match lines.get(header + 1) {
        Some(line) if is_separator(line) => {}
        _ => return Err(unexpected(WHAT, "header row is not followed by a separator")),
    }

    let mut rows = Vec::new();
    let mut cursor = header + 2;
    while let Some(line) = lines.get(cursor) {
        if line.trim().is_empty() {
            break;
        }
        let cells = split_cells(line);
        if cells.len() != columns.len() {
            return Err(unexpected(
                WHAT,
                format!(
                    "row {} has {} cells, expected {}",
                    rows.len() + 1,
                    cells.len(),
                    columns.len()
                ),
            ));
        }
        rows.push(cells);
        cursor += 1;
    }

    let footer = lines[cursor.min(lines.len())..]
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .ok_or_else(|| unexpected(WHAT, "missing row count footer"))?;
    let declared: usize = FOOTER
        .captures(footer)
        .and_then(|c| c[1].parse().ok())
        .ok_or_else(|| unexpected(WHAT, format!("malformed footer '{}'", footer)))?;
    if declared != rows.len() {
        return Err(unexpected(
            WHAT,
            format!("footer declares {} rows, found {}", declared, rows.len()),
        ));
    }

    Ok(CqlTable {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    })
}

/// Parse `SELECT table_name, id FROM system_schema.tables ...` output into
/// table → directory name
pub fn parse_table_directories(output: &str) -> Result<BTreeMap<TableName, TableDirectory>> {
    let table = parse_cql_table(output, &["table_name", "id"])?;

    let mut directories = BTreeMap::new();
    for row in table.rows {
        let name = TableName::new(row[0].as_str())
            .map_err(|e| unexpected("table listing", e.message().to_string()))?;
        let directory = TableDirectory::from_id_text(&name, &row[1])?;
        if directories.insert(name.clone(), directory).is_some() {
            return Err(unexpected(
                "table listing",
                format!("table '{}' listed twice", name),
            ));
        }
    }
    Ok(directories)
}
