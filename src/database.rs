use crate::btree::count_table_rows;
use crate::byte_reader::ByteReader;
use crate::error::{Error, Result};
use crate::schema::{load_catalog, Schema};

// Of the 100-byte file header, a read-only query engine needs only the
// page size (offset 16..18) to know how to slice the rest of the file
// into pages. Everything else in that header (version counters, vacuum
// bookkeeping, the application id) only matters to a writer.
fn read_page_size(reader: &mut ByteReader) -> Result<u32> {
    let raw = reader.read_u16_be(16)?;
    // sqlite stores the page size 65536 (which overflows a u16) as 1.
    let page_size = if raw == 1 { 65536 } else { raw as u32 };
    if page_size < 512 || (page_size & (page_size - 1)) != 0 {
        return Err(Error::format(16, format!("invalid page size {page_size}")));
    }
    Ok(page_size)
}

/// An opened database file: its page size and the catalog of tables
/// and indices read off page 1.
pub struct Database {
    path: String,
    page_size: u32,
    catalog: Vec<Schema>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let mut reader = ByteReader::open(path)?;
        let page_size = read_page_size(&mut reader)?;
        let catalog = load_catalog(&mut reader, page_size)?;
        Ok(Database {
            path: path.to_string(),
            page_size,
            catalog,
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn reader(&self) -> Result<ByteReader> {
        ByteReader::open(&self.path)
    }

    pub fn catalog(&self) -> &[Schema] {
        &self.catalog
    }

    /// The raw cell count of page 1, for `.dbinfo`'s "number of
    /// tables" line. This is *not* `self.catalog().len()`: the catalog
    /// omits the `sqlite_sequence` bookkeeping row, but `.dbinfo`
    /// reports the page's cell count as-is.
    pub fn schema_cell_count(&self) -> Result<usize> {
        let mut reader = self.reader()?;
        count_table_rows(&mut reader, self.page_size, 1)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Schema> {
        self.catalog.iter().filter(|s| s.is_table())
    }

    pub fn get_table(&self, table_name: &str) -> Result<&Schema> {
        self.catalog
            .iter()
            .find(|s| s.is_table() && s.table_name == table_name)
            .ok_or_else(|| Error::query(format!("no such table: {table_name}")))
    }

    pub fn get_index(&self, index_name: &str) -> Result<&Schema> {
        self.catalog
            .iter()
            .find(|s| s.is_index() && s.name == index_name)
            .ok_or_else(|| Error::query(format!("no such index: {index_name}")))
    }
}
