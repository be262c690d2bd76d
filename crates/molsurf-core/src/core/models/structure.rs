use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StructureType {
    #[default]
    None,
    Helix,
    Sheet,
    Turn,
}

#[derive(Debug, Error)]
#[error("Invalid structure type string")]
pub struct ParseStructureTypeError;

impl FromStr for StructureType {
    type Err = ParseStructureTypeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(StructureType::None),
            "helix" => Ok(StructureType::Helix),
            "sheet" => Ok(StructureType::Sheet),
            "turn" => Ok(StructureType::Turn),
            _ => Err(ParseStructureTypeError),
        }
    }
}

impl fmt::Display for StructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                StructureType::None => "none",
                StructureType::Helix => "helix",
                StructureType::Sheet => "sheet",
                StructureType::Turn => "turn",
            }
        )
    }
}

/// A maximal run of residues `[start, end]` (inclusive, 0-based backbone indices)
/// sharing one structure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondaryStructureSegment {
    pub kind: StructureType,
    pub start: usize,
    pub end: usize,
}

impl SecondaryStructureSegment {
    pub fn new(kind: StructureType, start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "segment start {start} after end {end}");
        Self { kind, start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }
}

impl fmt::Display for SecondaryStructureSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{}", self.kind, self.start, self.end)
    }
}
