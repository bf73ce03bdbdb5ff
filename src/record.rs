use crate::error::Result;
use crate::value::{read_serial_types, Value};

/// Decodes a record payload (header + body) into an ordered list of
/// column values. `rowid_alias`, when given, replaces column 0 with
/// `Value::Int(rowid)`, but only if column 0 decoded to `Null`. This
/// narrows the INTEGER PRIMARY KEY aliasing rule so that a table whose
/// primary key isn't the first declared column is never corrupted by
/// an unconditional overwrite.
pub fn decode_record(bytes: &[u8], rowid_alias: Option<i64>) -> Result<Vec<Value>> {
    let (serial_types, header_len) = read_serial_types(bytes)?;
    let mut offset = header_len;
    let mut values = Vec::with_capacity(serial_types.len());
    for serial_type in &serial_types {
        let value = serial_type.decode(&bytes[offset..])?;
        offset += serial_type.body_len();
        values.push(value);
    }

    if let Some(rowid) = rowid_alias {
        if let Some(first) = values.first_mut() {
            if matches!(first, Value::Null) {
                *first = Value::Int(rowid);
            }
        }
    }

    Ok(values)
}
