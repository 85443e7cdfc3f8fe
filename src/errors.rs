use std::io;
use thiserror::Error;

/// Possible errors that arise from building headers, decompressing LZSS data,
/// or reading and writing the `.lz` and `.snd` containers.
#[derive(Error, Debug)]
pub enum LzError {
    #[error("FOURCC must be exactly 4 ASCII bytes: {0:?}")]
    InvalidFourCc(String),

    #[error("{field} value {value} does not fit in {max:#x}")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        max: u64,
    },

    #[error("track cannot store {stored} bytes for {original} bytes of data")]
    StoredSize { stored: u64, original: u64 },

    #[error("Invalid header for lz file: found {0:02x?}")]
    InvalidHeader([u8; 8]),

    #[error("Corrupt LZSS stream: offset {offset} reaches before the start of output at position {position}")]
    CorruptStream { offset: usize, position: usize },

    #[error("Invalid sound container: {0}")]
    InvalidContainer(String),

    #[error("Bad track list: {0}")]
    Config(#[from] serde_json::Error),

    #[error("{0}")]
    Io(#[from] io::Error),
}

impl LzError {
    /// `true` for errors caused by malformed header fields given to a builder
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidFourCc(_) | Self::FieldOverflow { .. } | Self::StoredSize { .. }
        )
    }
}

impl From<tempfile::PersistError> for LzError {
    fn from(error: tempfile::PersistError) -> Self {
        LzError::Io(error.error)
    }
}
