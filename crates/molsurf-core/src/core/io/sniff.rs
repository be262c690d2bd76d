use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How much of a file is inspected when guessing its format.
pub const SNIFF_LENGTH: usize = 16000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeFormat {
    Cube,
    Apbs,
    Jvxl,
}

impl VolumeFormat {
    /// Guesses the format from characteristic header tokens. Anything unrecognized is
    /// treated as CUBE, which has no magic of its own.
    pub fn sniff(text: &str) -> Self {
        let head = match text.char_indices().nth(SNIFF_LENGTH) {
            Some((end, _)) => &text[..end],
            None => text,
        };
        if head.starts_with("#JVXL") || head.contains("Jmol voxel format") {
            VolumeFormat::Jvxl
        } else if head.contains("object 1 class gridpositions") {
            VolumeFormat::Apbs
        } else {
            VolumeFormat::Cube
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown volume format '{0}' (expected cube, apbs or jvxl)")]
pub struct ParseVolumeFormatError(String);

impl FromStr for VolumeFormat {
    type Err = ParseVolumeFormatError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cube" => Ok(VolumeFormat::Cube),
            "apbs" | "dx" | "opendx" => Ok(VolumeFormat::Apbs),
            "jvxl" => Ok(VolumeFormat::Jvxl),
            _ => Err(ParseVolumeFormatError(s.to_string())),
        }
    }
}

impl fmt::Display for VolumeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                VolumeFormat::Cube => "CUBE",
                VolumeFormat::Apbs => "APBS",
                VolumeFormat::Jvxl => "JVXL",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_jvxl_by_marker_or_version_string() {
        assert_eq!(VolumeFormat::sniff("#JVXL+\ntitle\n"), VolumeFormat::Jvxl);
        assert_eq!(
            VolumeFormat::sniff("t\nt\n-1 35 90 35 90 Jmol voxel format version 1.1\n"),
            VolumeFormat::Jvxl
        );
    }

    #[test]
    fn detects_opendx_grid() {
        let text = "# APBS\nobject 1 class gridpositions counts 2 2 2\n";
        assert_eq!(VolumeFormat::sniff(text), VolumeFormat::Apbs);
    }

    #[test]
    fn falls_back_to_cube() {
        assert_eq!(VolumeFormat::sniff("title\ncomment\n"), VolumeFormat::Cube);
    }

    #[test]
    fn markers_beyond_sniff_window_are_ignored() {
        let text = format!("{}object 1 class gridpositions", "x".repeat(SNIFF_LENGTH));
        assert_eq!(VolumeFormat::sniff(&text), VolumeFormat::Cube);
    }

    #[test]
    fn parses_format_names() {
        assert_eq!("DX".parse::<VolumeFormat>().unwrap(), VolumeFormat::Apbs);
        assert!("xyz".parse::<VolumeFormat>().is_err());
    }
}
