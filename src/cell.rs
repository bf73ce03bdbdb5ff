use crate::byte_reader::{decode_u32_be, decode_varint};
use crate::error::{Error, Result};
use crate::record::decode_record;
use crate::value::Value;

// Table B-Tree Leaf Cell: varint payload_size, varint rowid, record
// payload. record_bytes is handed back raw via record_bytes() rather
// than decoded here, since the caller (the table walker) already
// knows the rowid it needs for primary-key aliasing and decodes once
// it has both.
pub struct LeafTableCell {
    pub rowid: i64,
    record_bytes: Vec<u8>,
}

impl LeafTableCell {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (payload_size, n1) = decode_varint(bytes)?;
        let (rowid, n2) = decode_varint(&bytes[n1 as usize..])?;
        let start = n1 as usize + n2 as usize;
        let end = start + payload_size as usize;
        let record_bytes = bytes
            .get(start..end)
            .ok_or_else(|| {
                Error::format(0, "leaf-table payload spills past the page (overflow pages are unsupported)")
            })?
            .to_vec();
        Ok(LeafTableCell { rowid, record_bytes })
    }

    pub fn record_bytes(&self) -> &[u8] {
        &self.record_bytes
    }
}

/// Table B-Tree Interior Cell: `u32 left_child, varint boundary_rowid`.
/// `boundary_rowid` is the largest rowid in `left_child`'s subtree.
pub struct InteriorTableCell {
    pub left_child: u32,
    pub boundary_rowid: i64,
}

impl InteriorTableCell {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let left_child = decode_u32_be(bytes, 0)?;
        let (boundary_rowid, _) = decode_varint(&bytes[4..])?;
        Ok(InteriorTableCell { left_child, boundary_rowid })
    }
}

/// Index B-Tree Leaf Cell: a record whose first column is the indexed
/// key and second column is the referenced table rowid.
pub struct LeafIndexCell {
    pub key: Value,
    pub rowid: i64,
}

impl LeafIndexCell {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (payload_size, n1) = decode_varint(bytes)?;
        let start = n1 as usize;
        let end = start + payload_size as usize;
        let record_bytes = bytes.get(start..end).ok_or_else(|| {
            Error::format(0, "leaf-index payload spills past the page (overflow pages are unsupported)")
        })?;
        let (key, rowid) = key_and_rowid_from_record(record_bytes)?;
        Ok(LeafIndexCell { key, rowid })
    }
}

/// Index B-Tree Interior Cell: `u32 left_child` followed by the same
/// key/rowid record as a leaf-index cell.
pub struct InteriorIndexCell {
    pub left_child: u32,
    pub key: Value,
    pub rowid: i64,
}

impl InteriorIndexCell {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let left_child = decode_u32_be(bytes, 0)?;
        let (payload_size, n1) = decode_varint(&bytes[4..])?;
        let start = 4 + n1 as usize;
        let end = start + payload_size as usize;
        let record_bytes = bytes.get(start..end).ok_or_else(|| {
            Error::format(0, "interior-index payload spills past the page (overflow pages are unsupported)")
        })?;
        let (key, rowid) = key_and_rowid_from_record(record_bytes)?;
        Ok(InteriorIndexCell { left_child, key, rowid })
    }
}

fn key_and_rowid_from_record(record_bytes: &[u8]) -> Result<(Value, i64)> {
    let values = decode_record(record_bytes, None)?;
    let key = values
        .first()
        .cloned()
        .ok_or_else(|| Error::format(0, "index record missing key column"))?;
    let rowid = match values.get(1) {
        Some(Value::Int(n)) => *n,
        _ => return Err(Error::format(0, "index record missing rowid column")),
    };
    Ok((key, rowid))
}
