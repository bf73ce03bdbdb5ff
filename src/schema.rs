use crate::btree::walk_table;
use crate::byte_reader::ByteReader;
use crate::error::{Error, Result};
use crate::page::{open_page, Page};
use crate::value::Value;

/// A single row of `sqlite_schema`: the catalog of every table and
/// index in the file.
#[derive(Debug, Clone)]
pub struct Schema {
    pub obj_type: String,
    pub name: String,
    pub table_name: String,
    pub rootpage: u32,
    pub sql: String,
}

impl Schema {
    pub fn is_table(&self) -> bool {
        self.obj_type == "table"
    }

    pub fn is_index(&self) -> bool {
        self.obj_type == "index"
    }
}

/// Reads the whole catalog off page 1. Page 1 is always a `LEAF_TABLE`
/// page holding the schema rows directly (a schema big enough to
/// overflow onto an interior page is outside what this engine reads).
pub fn load_catalog(reader: &mut ByteReader, page_size: u32) -> Result<Vec<Schema>> {
    let page1_bytes = reader.read_at(0, page_size as usize)?;
    let page1 = open_page(page1_bytes, true)?;
    if !matches!(page1, Page::LeafTable(_)) {
        return Err(Error::format(0, "sqlite_schema spans more than one page, which is unsupported"));
    }

    let rows = walk_table(reader, page_size, 1, None)?;
    let mut schema = Vec::with_capacity(rows.len());
    for row in rows {
        let values = row.decode()?;
        let entry = schema_from_row(&values)?;
        if entry.name == "sqlite_sequence" {
            continue;
        }
        schema.push(entry);
    }
    Ok(schema)
}

fn schema_from_row(values: &[Value]) -> Result<Schema> {
    if values.len() != 5 {
        return Err(Error::format(0, "sqlite_schema row does not have 5 columns"));
    }

    let text_col = |v: &Value, label: &str| -> Result<String> {
        match v {
            Value::Text(s) => Ok(s.clone()),
            _ => Err(Error::format(0, format!("sqlite_schema.{label} is not text"))),
        }
    };

    let rootpage = match &values[3] {
        Value::Int(n) => *n as u32,
        other => {
            return Err(Error::format(
                0,
                format!("sqlite_schema.rootpage is not an integer ({other:?})"),
            ))
        }
    };

    Ok(Schema {
        obj_type: text_col(&values[0], "type")?,
        name: text_col(&values[1], "name")?,
        table_name: text_col(&values[2], "tbl_name")?,
        rootpage,
        sql: text_col(&values[4], "sql")?,
    })
}
