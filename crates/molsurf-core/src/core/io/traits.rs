use crate::core::models::volume::VolumeError;
use nalgebra::{Point3, Vector3};
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Angstroms per bohr radius.
pub const BOHR_TO_ANGSTROM: f64 = 0.5291772;

#[derive(Debug, Error)]
pub enum VolumeFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: VolumeParseErrorKind,
    },
    #[error("Unexpected end of file while reading {expected}")]
    UnexpectedEof { expected: String },
    #[error("Invalid voxel grid: {0}")]
    Volume(#[from] VolumeError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VolumeParseErrorKind {
    #[error("Invalid integer '{value}' for {field}")]
    InvalidInt { field: String, value: String },
    #[error("Invalid number '{value}' for {field}")]
    InvalidFloat { field: String, value: String },
    #[error("Missing value for {field}")]
    MissingToken { field: String },
    #[error("Expected a line starting with '{keyword}'")]
    MissingKeyword { keyword: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthUnit {
    #[default]
    Angstrom,
    Bohr,
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthUnit::Angstrom => write!(f, "ANGSTROMS"),
            LengthUnit::Bohr => write!(f, "BOHR"),
        }
    }
}

/// Lattice description shared by every volumetric format. Coordinates are in angstroms
/// regardless of the file's own unit.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeHeader {
    pub titles: Vec<String>,
    /// Signed atom count as written; a negative count announces an extra line after the atoms.
    pub atom_count: i64,
    pub origin: Point3<f64>,
    pub vectors: [Vector3<f64>; 3],
    pub counts: [usize; 3],
    pub units: LengthUnit,
}

impl VolumeHeader {
    pub fn point_count(&self) -> usize {
        self.counts.iter().product()
    }
}

/// Line-oriented cursor with 1-based line numbers for error reporting.
#[derive(Debug, Clone)]
pub struct LineCursor {
    lines: Vec<String>,
    position: usize,
}

impl LineCursor {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            position: 0,
        }
    }

    /// Number of the most recently consumed line.
    pub fn line_number(&self) -> usize {
        self.position
    }

    pub fn peek_line(&self) -> Option<&str> {
        self.lines.get(self.position).map(String::as_str)
    }

    pub fn next_line(&mut self) -> Option<&str> {
        let line = self.lines.get(self.position)?;
        self.position += 1;
        Some(line.as_str())
    }

    pub fn expect_line(&mut self, expected: &str) -> Result<String, VolumeFileError> {
        self.next_line()
            .map(str::to_string)
            .ok_or_else(|| VolumeFileError::UnexpectedEof {
                expected: expected.to_string(),
            })
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.lines.len()
    }

    pub fn parse_error(&self, kind: VolumeParseErrorKind) -> VolumeFileError {
        VolumeFileError::Parse {
            line: self.line_number(),
            kind,
        }
    }

    /// Parses whitespace-separated numbers spanning as many lines as needed.
    pub fn read_floats(&mut self, count: usize, field: &str) -> Result<Vec<f32>, VolumeFileError> {
        let mut values = Vec::with_capacity(count);
        while values.len() < count {
            let line = self.expect_line(field)?;
            for token in line.split_whitespace() {
                if values.len() == count {
                    break;
                }
                let value = token.parse::<f32>().map_err(|_| {
                    self.parse_error(VolumeParseErrorKind::InvalidFloat {
                        field: field.to_string(),
                        value: token.to_string(),
                    })
                })?;
                values.push(value);
            }
        }
        Ok(values)
    }
}

/// Pulls the `index`-th whitespace token from `line` and parses it.
pub fn parse_token<T: std::str::FromStr>(
    cursor: &LineCursor,
    line: &str,
    index: usize,
    field: &str,
) -> Result<T, VolumeFileError> {
    let token = line.split_whitespace().nth(index).ok_or_else(|| {
        cursor.parse_error(VolumeParseErrorKind::MissingToken {
            field: field.to_string(),
        })
    })?;
    token.parse::<T>().map_err(|_| {
        let kind = if token.contains('.') || token.contains(['e', 'E']) {
            VolumeParseErrorKind::InvalidFloat {
                field: field.to_string(),
                value: token.to_string(),
            }
        } else {
            VolumeParseErrorKind::InvalidInt {
                field: field.to_string(),
                value: token.to_string(),
            }
        };
        cursor.parse_error(kind)
    })
}

/// One volumetric file format.
///
/// Reading always runs header, then the optional extra line, then the voxel payload. CUBE and
/// OpenDX produce raw samples; JVXL produces pre-encoded surfaces.
pub trait VolumetricSource: Sized {
    /// What the data section decodes into.
    type Payload;

    /// The error type for read operations.
    type Error: Error + From<io::Error> + From<VolumeFileError>;

    fn from_text(text: &str) -> Self;

    fn read_header(&mut self) -> Result<VolumeHeader, Self::Error>;

    /// Reads the format-specific line following the atom list, if the header announces one.
    fn read_extra_line(&mut self, _header: &VolumeHeader) -> Result<(), Self::Error> {
        Ok(())
    }

    fn read_voxel_data(&mut self, header: &VolumeHeader) -> Result<Self::Payload, Self::Error>;

    fn read_all(mut self) -> Result<(VolumeHeader, Self::Payload), Self::Error> {
        let header = self.read_header()?;
        self.read_extra_line(&header)?;
        let payload = self.read_voxel_data(&header)?;
        Ok((header, payload))
    }

    /// Reads a whole file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsing fails.
    fn read_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<(VolumeHeader, Self::Payload), Self::Error> {
        let text = fs::read_to_string(path)?;
        Self::from_text(&text).read_all()
    }
}
