use itertools::Itertools;
use log::debug;

use crate::btree::{count_table_rows, walk_index, walk_table};
use crate::database::Database;
use crate::error::{Error, Result};
use crate::sql::{columns_from_create_table, Projection, SelectQuery};
use crate::value::{Key, Value};

// A materialized row: the decoded column values alongside the schema
// (column name -> position) needed to project or filter by name.
struct Row<'a> {
    columns: &'a [String],
    values: Vec<Value>,
}

impl<'a> Row<'a> {
    fn get(&self, column: &str) -> Result<&Value> {
        let index = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| Error::query(format!("no such column: {column}")))?;
        self.values
            .get(index)
            .ok_or_else(|| Error::query(format!("row is missing column: {column}")))
    }
}

/// A single `WHERE column = 'literal'` predicate, resolved against a
/// row's decoded value.
pub struct ValueFilter {
    pub column: String,
    pub threshold: String,
}

impl ValueFilter {
    fn apply(&self, row: &Row) -> Result<bool> {
        let value = row.get(&self.column)?;
        if value.is_null_or_empty() {
            return Ok(false);
        }
        if matches!(value, Value::Int(_) | Value::Float(_)) {
            return Err(Error::type_mismatch(format!(
                "column '{}' is {} but threshold is text",
                self.column,
                value.type_tag()
            )));
        }
        let normalized_value = value.normalized_text()?;
        let normalized_threshold = self.threshold.trim().to_ascii_lowercase();
        Ok(normalized_value == normalized_threshold)
    }
}

/// The result of executing a query: either a bare row count or a list
/// of already-joined, `|`-delimited output lines, one per surviving
/// row, so the caller only needs to print each line.
pub enum QueryOutput {
    Count(usize),
    Rows(Vec<String>),
}

// Executes a parsed SELECT against an open database: resolves the
// table, decides between an index probe and a full scan, and
// projects/filters the resulting rows. Never emits a partial row, any
// row that fails to decode or project fails the whole command.
pub fn execute(db: &Database, query: &SelectQuery) -> Result<QueryOutput> {
    let table_schema = db.get_table(&query.table)?;
    let mut reader = db.reader()?;

    if query.projection == Projection::CountStar {
        let count = count_table_rows(&mut reader, db.page_size(), table_schema.rootpage)?;
        return Ok(QueryOutput::Count(count));
    }

    let columns = columns_from_create_table(&table_schema.sql)?;

    let rowid_filter = match &query.filter {
        Some(filter) => resolve_index_rowids(db, &mut reader, &query.table, filter)?,
        None => None,
    };

    let table_rows = walk_table(
        &mut reader,
        db.page_size(),
        table_schema.rootpage,
        rowid_filter.as_deref(),
    )?;

    let projection_columns = match &query.projection {
        Projection::Columns(cols) => cols,
        Projection::CountStar => unreachable!("handled above"),
    };

    let mut lines = Vec::with_capacity(table_rows.len());
    for table_row in &table_rows {
        let values = table_row.decode()?;
        let row = Row { columns: &columns, values };

        if let Some(filter) = &query.filter {
            let value_filter = ValueFilter {
                column: filter.column.clone(),
                threshold: filter.literal.clone(),
            };
            if !value_filter.apply(&row)? {
                continue;
            }
        }

        let projected = projection_columns
            .iter()
            .map(|col| row.get(col).map(render_value))
            .collect::<Result<Vec<_>>>()?;
        lines.push(projected.into_iter().join("|"));
    }

    Ok(QueryOutput::Rows(lines))
}

/// If `filter.column` is covered by an `idx_<table>_<column>` index,
/// walks that index for the sorted rowid set matching `filter`'s
/// threshold. Returns `None` when no such index exists, signalling a
/// full table scan instead.
fn resolve_index_rowids(
    db: &Database,
    reader: &mut crate::byte_reader::ByteReader,
    table_name: &str,
    filter: &crate::sql::ValueFilter,
) -> Result<Option<Vec<i64>>> {
    let index_name = format!("idx_{table_name}_{}", filter.column);
    let Ok(index_schema) = db.get_index(&index_name) else {
        debug!("no index named {index_name}, falling back to a full table scan");
        return Ok(None);
    };

    debug!("using index {index_name} to prune the scan of {table_name}");
    let key = Key(Value::Text(filter.literal.trim().to_ascii_lowercase()));
    let rowids = walk_index(reader, db.page_size(), index_schema.rootpage, &key)?;
    Ok(Some(rowids))
}

/// Renders a value for `|`-delimited stdout output. `Null` prints as
/// the empty string.
fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}
