use crate::core::io::traits::VolumeFileError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JvxlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Volume header error: {0}")]
    Header(#[from] VolumeFileError),
    #[error("Invalid character alphabet: base {base}, range {range}")]
    InvalidEncoding { base: u32, range: u32 },
    #[error("Character '{character}' at position {position} is outside the encoding alphabet")]
    InvalidCharacter { character: char, position: usize },
    #[error("Malformed compressed data at position {position}: {reason}")]
    Decompression { position: usize, reason: String },
    #[error("Malformed definition line '{line}': {reason}")]
    Definition { line: String, reason: String },
    #[error("Run lengths cover {actual} lattice points but the grid has {expected}")]
    RunLengthMismatch { expected: usize, actual: usize },
    #[error("Definition line declares {expected} run lengths but {actual} were read")]
    RunCountMismatch { expected: usize, actual: usize },
    #[error("Expected {expected} edge fraction characters, found {actual}")]
    EdgeCountMismatch { expected: usize, actual: usize },
    #[error("Expected {expected} color characters, found {actual}")]
    ColorCountMismatch { expected: usize, actual: usize },
    #[error("Unknown lattice walk order '{0}'")]
    InvalidWalkOrder(String),
    #[error("Surface {index} requested but the file holds {available}")]
    MissingSurface { index: usize, available: usize },
    #[error("Unexpected end of JVXL data while reading {expected}")]
    UnexpectedEof { expected: String },
}
