use itertools::Itertools;

use crate::byte_reader::ByteReader;
use crate::error::{Error, Result};
use crate::page::{open_page, Page};
use crate::value::{Key, Value};

/// Reads a single page by its 1-based page index.
fn read_page(reader: &mut ByteReader, page_size: u32, page_index: u32) -> Result<Page> {
    if page_index == 0 {
        return Err(Error::format(0, "page index 0 is not addressable"));
    }
    let offset = (page_index as u64 - 1) * page_size as u64;
    let bytes = reader.read_at(offset, page_size as usize)?;
    open_page(bytes, page_index == 1)
}

/// A decoded table-leaf row as returned by the table walker: the
/// rowid and the still-undecoded record payload. Decoding is deferred
/// to the caller (the query executor), which knows which columns it
/// actually needs to project.
pub struct TableRow {
    pub rowid: i64,
    record_bytes: Vec<u8>,
}

impl TableRow {
    pub fn decode(&self) -> Result<Vec<Value>> {
        crate::record::decode_record(&self.record_bytes, Some(self.rowid))
    }
}

/// Walks a table b-tree rooted at `root_page`, yielding every reached
/// leaf-table cell in tree order. When `filter_rowids` is given (must
/// be sorted ascending), only cells whose rowid is in that set are
/// decoded and returned (interior subtrees with no assigned rowids are
/// never visited, which is how an index-pruned scan avoids reading
/// unrelated leaf pages).
pub fn walk_table(
    reader: &mut ByteReader,
    page_size: u32,
    root_page: u32,
    filter_rowids: Option<&[i64]>,
) -> Result<Vec<TableRow>> {
    let mut out = Vec::new();
    walk_table_inner(reader, page_size, root_page, filter_rowids, &mut out)?;
    Ok(out)
}

fn walk_table_inner(
    reader: &mut ByteReader,
    page_size: u32,
    page_index: u32,
    filter_rowids: Option<&[i64]>,
    out: &mut Vec<TableRow>,
) -> Result<()> {
    match read_page(reader, page_size, page_index)? {
        Page::LeafTable(page) => {
            for cell in page.cells()? {
                let include = match filter_rowids {
                    None => true,
                    Some(rowids) => rowids.binary_search(&cell.rowid).is_ok(),
                };
                if include {
                    out.push(TableRow {
                        rowid: cell.rowid,
                        record_bytes: cell.record_bytes().to_vec(),
                    });
                }
            }
            Ok(())
        }
        Page::InteriorTable(page) => {
            let cells = page.cells()?;
            match filter_rowids {
                None => {
                    for cell in &cells {
                        walk_table_inner(reader, page_size, cell.left_child, None, out)?;
                    }
                    walk_table_inner(reader, page_size, page.right_child, None, out)?;
                }
                Some(rowids) => {
                    let mut i = 0usize;
                    for cell in &cells {
                        let start = i;
                        while i < rowids.len() && rowids[i] < cell.boundary_rowid {
                            i += 1;
                        }
                        if i > start {
                            walk_table_inner(reader, page_size, cell.left_child, Some(&rowids[start..i]), out)?;
                        }
                    }
                    if i < rowids.len() {
                        walk_table_inner(reader, page_size, page.right_child, Some(&rowids[i..]), out)?;
                    }
                }
            }
            Ok(())
        }
        _ => Err(Error::format(0, "expected a table b-tree page")),
    }
}

// Sums the cell count of every reached LEAF_TABLE page, without
// decoding a single record (the fast path for COUNT(*)).
pub fn count_table_rows(reader: &mut ByteReader, page_size: u32, root_page: u32) -> Result<usize> {
    match read_page(reader, page_size, root_page)? {
        Page::LeafTable(page) => Ok(page.cells()?.len()),
        Page::InteriorTable(page) => {
            let mut total = 0usize;
            for cell in page.cells()? {
                total += count_table_rows(reader, page_size, cell.left_child)?;
            }
            total += count_table_rows(reader, page_size, page.right_child)?;
            Ok(total)
        }
        _ => Err(Error::format(0, "expected a table b-tree page")),
    }
}

/// Walks an index b-tree rooted at `root_page`, returning the sorted,
/// deduplicated list of table rowids whose indexed key equals `key`.
/// `key` should already be normalized the way the query executor's
/// filter layer normalizes text thresholds, since index/leaf key
/// comparisons go through the same `Key` ordering the filter uses.
pub fn walk_index(reader: &mut ByteReader, page_size: u32, root_page: u32, key: &Key) -> Result<Vec<i64>> {
    let mut out = Vec::new();
    walk_index_inner(reader, page_size, root_page, key, &mut out)?;
    Ok(out.into_iter().sorted().dedup().collect())
}

fn walk_index_inner(
    reader: &mut ByteReader,
    page_size: u32,
    page_index: u32,
    key: &Key,
    out: &mut Vec<i64>,
) -> Result<()> {
    match read_page(reader, page_size, page_index)? {
        Page::LeafIndex(page) => {
            for cell in page.cells()? {
                if matches!(cell.key, Value::Null) {
                    continue;
                }
                let cell_key = Key(cell.key);
                if !cell_key.comparable_with(key) {
                    return Err(Error::type_mismatch(format!(
                        "cannot compare indexed value against search key: {cell_key:?} vs {key:?}"
                    )));
                }
                if &cell_key == key {
                    out.push(cell.rowid);
                }
            }
            Ok(())
        }
        Page::InteriorIndex(page) => {
            let cells = page.cells()?;
            let mut recursed_into_candidate = false;

            for (i, cell) in cells.iter().enumerate() {
                if matches!(cell.key, Value::Null) {
                    continue;
                }
                let cell_key = Key(cell.key.clone());
                if !cell_key.comparable_with(key) {
                    return Err(Error::type_mismatch(format!(
                        "cannot compare indexed value against search key: {cell_key:?} vs {key:?}"
                    )));
                }

                if &cell_key == key {
                    out.push(cell.rowid);
                    walk_index_inner(reader, page_size, cell.left_child, key, out)?;
                    recursed_into_candidate = true;
                    continue;
                }

                if let Some(prev) = previous_non_null_key(&cells, i) {
                    if &prev < key && &cell_key > key {
                        walk_index_inner(reader, page_size, cell.left_child, key, out)?;
                        recursed_into_candidate = true;
                    }
                }
            }

            if !recursed_into_candidate {
                let first_non_null = cells.iter().find(|c| !matches!(c.key, Value::Null));
                match first_non_null {
                    Some(first) if &Key(first.key.clone()) > key => {
                        walk_index_inner(reader, page_size, first.left_child, key, out)?;
                    }
                    _ => {
                        walk_index_inner(reader, page_size, page.right_child, key, out)?;
                    }
                }
            } else {
                // An equal/boundary entry found earlier never rules
                // out the rightmost subtree: a run of duplicate keys
                // can still span across into it.
                let last_is_candidate = cells
                    .last()
                    .map(|c| !matches!(c.key, Value::Null) && &Key(c.key.clone()) == key)
                    .unwrap_or(false);
                if last_is_candidate {
                    walk_index_inner(reader, page_size, page.right_child, key, out)?;
                }
            }

            Ok(())
        }
        _ => Err(Error::format(0, "expected an index b-tree page")),
    }
}

fn previous_non_null_key(
    cells: &[crate::cell::InteriorIndexCell],
    before: usize,
) -> Option<Key> {
    cells[..before]
        .iter()
        .rev()
        .find(|c| !matches!(c.key, Value::Null))
        .map(|c| Key(c.key.clone()))
}
