use std::io;

use thiserror::Error;

/// Everything that can abort a conversion
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CdnCiaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Unable to query stream position: {0}")]
    Position(#[source] io::Error),
    #[error("Unknown signature/certificate type {0:#010x}")]
    UnknownTypeTag(u32),
    #[error("Unable to allocate {0} byte work buffer")]
    BufferAllocation(usize),
    #[error("Content {id:08x}: {source}")]
    Content {
        id: u32,
        #[source]
        source: io::Error,
    },
    #[error("Total content size doesn't fit in 64 bits")]
    ContentSizeOverflow,
    #[error("Invalid size of header")]
    InvalidHeaderSize,
}

impl CdnCiaError {
    /// Whether this error came out of a failed open/read/write/seek
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Position(_) | Self::Content { .. })
    }
}

pub type Result<T> = std::result::Result<T, CdnCiaError>;
