use std::fmt;

use thiserror::Error;

use crate::data::cursor::Exhausted;

/// Error returned by every public decode entry point.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
}

/// Which structural block an ident check failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentBlock {
    Model,
    Submesh,
    Skin,
    Texture,
    TextureFrame,
}

impl fmt::Display for IdentBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentBlock::Model => "BVM model",
            IdentBlock::Submesh => "BVM submesh",
            IdentBlock::Skin => "BVM skin",
            IdentBlock::Texture => "BTF texture",
            IdentBlock::TextureFrame => "BTF frame",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("Unknown {block} ident: {found:#010X}")]
    UnknownIdent { block: IdentBlock, found: u32 },
    #[error("Unsupported {format} version: {major}.{minor}")]
    UnsupportedVersion {
        format: &'static str,
        major: i32,
        minor: i32,
    },
    #[error("Unsupported texture compression kind: {0}")]
    UnsupportedCompression(i16),
    #[error("Unsupported texture pixel format: {0}")]
    UnsupportedPixelFormat(i16),
    #[error("Frames are missing: {0}")]
    MissingFrames(String),
    #[error("Invalid texture dimensions: {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("Triangle index {index} out of range for {vertex_count} vertices in {surface}")]
    IndexOutOfRange {
        surface: String,
        index: i64,
        vertex_count: usize,
    },
    #[error("Negative {field}: {value}")]
    NegativeValue { field: &'static str, value: i32 },
    #[error("Truncated data: {0}")]
    TruncatedData(String),
}

impl From<Exhausted> for ErrorKind {
    fn from(e: Exhausted) -> Self {
        ErrorKind::TruncatedData(e.to_string())
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for Error {}

pub type IResult<T> = Result<T, Error>;

pub fn failure_from_kind(kind: ErrorKind) -> Error {
    Error { kind }
}
