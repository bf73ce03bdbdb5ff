use std::cmp::Ordering;

use crate::byte_reader::decode_varint;
use crate::error::{Error, Result};

/// A decoded column value. All integer serial types (1/2/3/4/6/8 bytes)
/// collapse into `Int(i64)`, since the record codec deals in an
/// abstract value model, not in per-width integer variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Blob(Vec<u8>),
    Text(String),
}

impl Value {
    pub fn is_null_or_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            Value::Blob(b) => b.is_empty(),
            _ => false,
        }
    }

    /// UTF-8 decode + trim + ASCII-lowercase, for the filter layer and
    /// for normalized index-key comparisons. Non-text/blob values are
    /// rendered via their natural string form.
    pub fn normalized_text(&self) -> Result<String> {
        let raw = match self {
            Value::Text(s) => s.clone(),
            Value::Blob(b) => String::from_utf8(b.clone())
                .map_err(|_| Error::type_mismatch("blob value is not valid UTF-8"))?,
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Null => String::new(),
        };
        Ok(raw.trim().to_ascii_lowercase())
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Blob(_) => "blob",
            Value::Text(_) => "text",
        }
    }
}

/// The serial type of a single column, decoded from a record header
/// varint. Carries enough information to know the body's byte length.
#[derive(Debug, Clone, Copy)]
pub enum SerialType {
    Null,
    Int(u8),  // body length in bytes: 1, 2, 3, 4, 6, or 8
    Float,
    Zero,
    One,
    Blob(usize),
    Text(usize),
}

impl SerialType {
    pub fn from_code(code: i64) -> Result<Self> {
        let ty = match code {
            0 => SerialType::Null,
            1 => SerialType::Int(1),
            2 => SerialType::Int(2),
            3 => SerialType::Int(3),
            4 => SerialType::Int(4),
            5 => SerialType::Int(6),
            6 => SerialType::Int(8),
            7 => SerialType::Float,
            8 => SerialType::Zero,
            9 => SerialType::One,
            10 | 11 => {
                return Err(Error::format(0, format!("reserved serial type {code}")))
            }
            n if n >= 12 && n % 2 == 0 => SerialType::Blob(((n - 12) / 2) as usize),
            n if n >= 13 && n % 2 == 1 => SerialType::Text(((n - 13) / 2) as usize),
            n => return Err(Error::format(0, format!("invalid serial type {n}"))),
        };
        Ok(ty)
    }

    pub fn body_len(&self) -> usize {
        match self {
            SerialType::Null | SerialType::Zero | SerialType::One => 0,
            SerialType::Int(n) => *n as usize,
            SerialType::Float => 8,
            SerialType::Blob(n) | SerialType::Text(n) => *n,
        }
    }

    /// Decodes the body bytes for this serial type into a `Value`.
    pub fn decode(&self, body: &[u8]) -> Result<Value> {
        let need = self.body_len();
        if body.len() < need {
            return Err(Error::format(0, "truncated record body"));
        }
        let value = match self {
            SerialType::Null => Value::Null,
            SerialType::Zero => Value::Int(0),
            SerialType::One => Value::Int(1),
            SerialType::Int(1) => Value::Int(body[0] as i8 as i64),
            SerialType::Int(2) => Value::Int(i16::from_be_bytes(body[..2].try_into()?) as i64),
            SerialType::Int(3) => Value::Int(sign_extend_be(&body[..3])),
            SerialType::Int(4) => Value::Int(i32::from_be_bytes(body[..4].try_into()?) as i64),
            SerialType::Int(6) => Value::Int(sign_extend_be(&body[..6])),
            SerialType::Int(8) => Value::Int(i64::from_be_bytes(body[..8].try_into()?)),
            SerialType::Int(_) => unreachable!("only 1/2/3/4/6/8-byte integers exist"),
            SerialType::Float => Value::Float(f64::from_be_bytes(body[..8].try_into()?)),
            SerialType::Blob(n) => Value::Blob(body[..*n].to_vec()),
            SerialType::Text(n) => Value::Text(
                String::from_utf8(body[..*n].to_vec())
                    .map_err(|_| Error::format(0, "text column is not valid UTF-8"))?,
            ),
        };
        Ok(value)
    }
}

/// Sign-extends a big-endian two's-complement integer narrower than 8
/// bytes (the 24-bit and 48-bit serial types) into an `i64`.
fn sign_extend_be(bytes: &[u8]) -> i64 {
    let mut buf = if bytes[0] & 0x80 != 0 { [0xFFu8; 8] } else { [0u8; 8] };
    buf[8 - bytes.len()..].copy_from_slice(bytes);
    i64::from_be_bytes(buf)
}

/// Reads the serial-type header of a record starting at `bytes[0]`.
/// Returns the list of serial types and the total number of header
/// bytes consumed (including the header-size varint itself).
pub fn read_serial_types(bytes: &[u8]) -> Result<(Vec<SerialType>, usize)> {
    let (header_size, header_size_len) = decode_varint(bytes)?;
    let header_size = header_size as usize;
    let mut offset = header_size_len as usize;
    let mut types = Vec::new();
    while offset < header_size {
        let (code, len) = decode_varint(&bytes[offset..])?;
        offset += len as usize;
        types.push(SerialType::from_code(code)?);
    }
    if offset != header_size {
        return Err(Error::format(0, "record header size mismatch"));
    }
    Ok((types, header_size))
}

/// A typed, totally-ordered wrapper used only for index-key
/// comparisons during interior-index descent. `Null` sorts below every
/// other value; text and blob values compare byte-wise after the same
/// trim+lowercase normalization the query-executor filter applies, so
/// an index lookup and an equivalent full-table-scan filter never
/// disagree about which rows match.
#[derive(Debug, Clone)]
pub struct Key(pub Value);

impl Key {
    fn rank(&self) -> u8 {
        match &self.0 {
            Value::Null => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Blob(_) => 2,
            Value::Text(_) => 3,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match &self.0 {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Whether `self` and `other` belong to the same comparison class
    /// (numeric, blob, or text). `Null` is comparable with anything,
    /// since it's filtered out of index walks before a comparison is
    /// ever made. Two non-null keys of different classes can't be
    /// meaningfully ordered, which is the index-walk equivalent of the
    /// query executor's filter-layer `TypeError`.
    pub fn comparable_with(&self, other: &Key) -> bool {
        matches!((self.rank(), other.rank()), (0, _) | (_, 0) | (1, 1) | (2, 2) | (3, 3))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.rank(), other.rank()) {
            (a, b) if a != b => a.cmp(&b),
            (0, 0) => Ordering::Equal,
            (1, 1) => self
                .as_f64()
                .partial_cmp(&other.as_f64())
                .unwrap_or(Ordering::Equal),
            (2, 2) => match (&self.0, &other.0) {
                (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
                _ => unreachable!(),
            },
            (3, 3) => {
                let a = self.0.normalized_text().unwrap_or_default();
                let b = other.0.normalized_text().unwrap_or_default();
                a.cmp(&b)
            }
            _ => unreachable!("rank classes exhausted above"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_below_everything() {
        assert!(Key(Value::Null) < Key(Value::Int(0)));
        assert!(Key(Value::Null) < Key(Value::Text("".into())));
    }

    #[test]
    fn text_keys_compare_normalized() {
        assert_eq!(
            Key(Value::Text(" Yellow ".into())),
            Key(Value::Text("yellow".into()))
        );
    }

    #[test]
    fn integer_keys_compare_numerically() {
        assert!(Key(Value::Int(2)) < Key(Value::Int(10)));
    }

    #[test]
    fn serial_type_codes_decode_sizes() {
        assert_eq!(SerialType::from_code(0).unwrap().body_len(), 0);
        assert_eq!(SerialType::from_code(1).unwrap().body_len(), 1);
        assert_eq!(SerialType::from_code(6).unwrap().body_len(), 8);
        assert_eq!(SerialType::from_code(13).unwrap().body_len(), 0);
        assert_eq!(SerialType::from_code(15).unwrap().body_len(), 1);
        assert_eq!(SerialType::from_code(12).unwrap().body_len(), 0);
        assert_eq!(SerialType::from_code(14).unwrap().body_len(), 1);
    }

    #[test]
    fn reserved_serial_types_are_rejected() {
        assert!(SerialType::from_code(10).is_err());
        assert!(SerialType::from_code(11).is_err());
    }
}
