use super::traits::{
    LengthUnit, LineCursor, VolumeFileError, VolumeHeader, VolumeParseErrorKind,
    VolumetricSource, parse_token,
};
use crate::core::models::volume::{VolumeData, VolumeError};
use nalgebra::{Point3, Vector3};
use tracing::debug;

/// APBS / OpenDX scalar grid reader.
///
/// ```text
/// # comments
/// object 1 class gridpositions counts nx ny nz
/// origin ox oy oz
/// delta ax ay az      (three lines)
/// object 2 class gridconnections counts nx ny nz
/// object 3 class array type double rank 0 items N data follows
/// v v v ...
/// ```
pub struct ApbsReader {
    cursor: LineCursor,
}

impl ApbsReader {
    fn keyword_line(&mut self, keyword: &str) -> Result<String, VolumeFileError> {
        let line = self.cursor.expect_line(keyword)?;
        if line.trim_start().starts_with(keyword) {
            Ok(line)
        } else {
            Err(self.cursor.parse_error(VolumeParseErrorKind::MissingKeyword {
                keyword: keyword.to_string(),
            }))
        }
    }
}

impl VolumetricSource for ApbsReader {
    type Payload = VolumeData;
    type Error = VolumeFileError;

    fn from_text(text: &str) -> Self {
        Self {
            cursor: LineCursor::new(text),
        }
    }

    fn read_header(&mut self) -> Result<VolumeHeader, Self::Error> {
        let mut titles = Vec::new();
        while let Some(line) = self.cursor.peek_line() {
            if !line.starts_with('#') {
                break;
            }
            let comment = line.trim_start_matches('#').trim().to_string();
            self.cursor.next_line();
            if titles.len() < 2 && !comment.is_empty() {
                titles.push(comment);
            }
        }
        titles.resize(2, String::new());

        let positions = self.keyword_line("object 1 class gridpositions")?;
        let mut counts = [0usize; 3];
        for (axis, count) in counts.iter_mut().enumerate() {
            *count = parse_token(&self.cursor, &positions, 5 + axis, "grid count")?;
        }

        let origin_line = self.keyword_line("origin")?;
        let origin = Point3::new(
            parse_token(&self.cursor, &origin_line, 1, "origin x")?,
            parse_token(&self.cursor, &origin_line, 2, "origin y")?,
            parse_token(&self.cursor, &origin_line, 3, "origin z")?,
        );

        let mut vectors = [Vector3::zeros(); 3];
        for vector in &mut vectors {
            let delta = self.keyword_line("delta")?;
            *vector = Vector3::new(
                parse_token(&self.cursor, &delta, 1, "delta x")?,
                parse_token(&self.cursor, &delta, 2, "delta y")?,
                parse_token(&self.cursor, &delta, 3, "delta z")?,
            );
        }

        self.keyword_line("object 2 class gridconnections")?;
        let data_line = self.keyword_line("object 3 class array")?;
        let items: usize = data_line
            .split_whitespace()
            .skip_while(|token| *token != "items")
            .nth(1)
            .and_then(|token| token.parse().ok())
            .ok_or_else(|| {
                self.cursor.parse_error(VolumeParseErrorKind::MissingToken {
                    field: "items".to_string(),
                })
            })?;
        let expected = counts.iter().product::<usize>();
        if items != expected {
            return Err(VolumeFileError::Volume(VolumeError::ValueCountMismatch {
                nx: counts[0],
                ny: counts[1],
                nz: counts[2],
                expected,
                actual: items,
            }));
        }

        debug!(
            "Read OpenDX header: {}x{}x{} points",
            counts[0], counts[1], counts[2]
        );

        Ok(VolumeHeader {
            titles,
            atom_count: 0,
            origin,
            vectors,
            counts,
            units: LengthUnit::Angstrom,
        })
    }

    fn read_voxel_data(&mut self, header: &VolumeHeader) -> Result<Self::Payload, Self::Error> {
        let values = self.cursor.read_floats(header.point_count(), "voxel data")?;
        Ok(VolumeData::new(
            header.origin,
            header.vectors,
            header.counts,
            values,
        )?)
    }
}
