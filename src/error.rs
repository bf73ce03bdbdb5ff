use thiserror::Error;

/// Errors that can cross any component boundary in this crate.
///
/// `Format`, `Query`, and `Type` correspond exactly to the three error
/// kinds in the engine's error-handling design; `Io` exists alongside
/// them for plain OS-level read failures that aren't themselves format
/// violations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("format error at offset {offset}: {reason}")]
    Format { offset: u64, reason: String },

    #[error("query error: {0}")]
    Query(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::array::TryFromSliceError> for Error {
    fn from(err: std::array::TryFromSliceError) -> Self {
        Error::Format { offset: 0, reason: err.to_string() }
    }
}

impl Error {
    pub fn format(offset: u64, reason: impl Into<String>) -> Error {
        Error::Format {
            offset,
            reason: reason.into(),
        }
    }

    pub fn query(reason: impl Into<String>) -> Error {
        Error::Query(reason.into())
    }

    pub fn type_mismatch(reason: impl Into<String>) -> Error {
        Error::Type(reason.into())
    }
}
