use super::codec::{FractionEncoding, decompress};
use super::definition::DefinitionLine;
use super::document::{FORMAT_MARKER, JvxlDocument, JvxlSurface, parse_info_line};
use super::error::JvxlError;
use crate::core::io::cube::read_cube_header;
use crate::core::io::traits::{
    LineCursor, VolumeHeader, VolumeParseErrorKind, VolumetricSource, parse_token,
};
use tracing::debug;

/// Reads JVXL text into a [`JvxlDocument`] without touching any voxel values; the surfaces
/// stay encoded until a decoder rebuilds them.
pub struct JvxlReader {
    cursor: LineCursor,
    surface_count: usize,
    edge_encoding: FractionEncoding,
    color_encoding: FractionEncoding,
}

impl JvxlReader {
    fn expect_line(&mut self, expected: &str) -> Result<String, JvxlError> {
        self.cursor
            .next_line()
            .map(str::to_string)
            .ok_or_else(|| JvxlError::UnexpectedEof {
                expected: expected.to_string(),
            })
    }

    fn read_run_lengths(&mut self, total: usize) -> Result<Vec<u32>, JvxlError> {
        let mut runs = Vec::new();
        let mut sum = 0usize;
        while runs.is_empty() || sum < total {
            let line = self.expect_line("run lengths")?;
            for token in line.split_whitespace() {
                let run: u32 = token.parse().map_err(|_| {
                    self.cursor.parse_error(VolumeParseErrorKind::InvalidInt {
                        field: "run length".to_string(),
                        value: token.to_string(),
                    })
                })?;
                sum += run as usize;
                runs.push(run);
            }
            if sum > total {
                return Err(JvxlError::RunLengthMismatch {
                    expected: total,
                    actual: sum,
                });
            }
        }
        Ok(runs)
    }

    fn read_surface(&mut self, header: &VolumeHeader) -> Result<JvxlSurface, JvxlError> {
        let definition: DefinitionLine = self.expect_line("definition line")?.parse()?;

        let (run_lengths, edge_data) = if definition.is_plane() {
            (Vec::new(), String::new())
        } else {
            let runs = self.read_run_lengths(header.point_count())?;
            let declared = definition.surface_int_count();
            if declared != runs.len() {
                return Err(JvxlError::RunCountMismatch {
                    expected: declared,
                    actual: runs.len(),
                });
            }
            let edges = decompress(&self.expect_line("edge data")?)?;
            // bicolor lines carry the color count in param2 instead of the edge count
            if let Ok(expected) = usize::try_from(definition.param2) {
                let actual = edges.chars().count();
                if actual != expected {
                    return Err(JvxlError::EdgeCountMismatch { expected, actual });
                }
            }
            (runs, edges)
        };

        let color_data = if definition.is_color_mapped() {
            let colors = decompress(&self.expect_line("color data")?)?;
            let expected = definition.color_byte_count();
            let actual = colors.chars().count();
            if actual != expected {
                return Err(JvxlError::ColorCountMismatch { expected, actual });
            }
            colors
        } else {
            String::new()
        };

        let (walk_order, info) = match self.cursor.peek_line() {
            Some(line) if line.starts_with('#') => {
                let parsed = parse_info_line(line.trim_start_matches('#'))?;
                self.cursor.next_line();
                parsed
            }
            _ => Default::default(),
        };

        Ok(JvxlSurface {
            definition,
            run_lengths,
            edge_data,
            color_data,
            walk_order,
            info,
        })
    }
}

impl VolumetricSource for JvxlReader {
    type Payload = JvxlDocument;
    type Error = JvxlError;

    fn from_text(text: &str) -> Self {
        Self {
            cursor: LineCursor::new(text),
            surface_count: 1,
            edge_encoding: FractionEncoding::default(),
            color_encoding: FractionEncoding::default(),
        }
    }

    fn read_header(&mut self) -> Result<VolumeHeader, Self::Error> {
        if self
            .cursor
            .peek_line()
            .is_some_and(|line| line.starts_with(FORMAT_MARKER))
        {
            self.cursor.next_line();
        }
        Ok(read_cube_header(&mut self.cursor)?)
    }

    /// `-nSurfaces edgeBase edgeRange colorBase colorRange ...`; missing alphabet fields fall
    /// back to the defaults.
    fn read_extra_line(&mut self, header: &VolumeHeader) -> Result<(), Self::Error> {
        if header.atom_count >= 0 {
            return Ok(());
        }
        let line = self
            .cursor
            .next_line()
            .map(str::to_string)
            .ok_or_else(|| JvxlError::UnexpectedEof {
                expected: "surface count line".to_string(),
            })?;
        let surfaces: i64 = parse_token(&self.cursor, &line, 0, "surface count")?;
        self.surface_count = surfaces.unsigned_abs().max(1) as usize;

        let tokens: Vec<u32> = line
            .split_whitespace()
            .skip(1)
            .take(4)
            .map_while(|token| token.parse().ok())
            .collect();
        if let [edge_base, edge_range, rest @ ..] = tokens.as_slice() {
            self.edge_encoding = FractionEncoding::new(*edge_base, *edge_range)?;
            if let [color_base, color_range] = rest {
                self.color_encoding = FractionEncoding::new(*color_base, *color_range)?;
            }
        }
        Ok(())
    }

    fn read_voxel_data(&mut self, header: &VolumeHeader) -> Result<Self::Payload, Self::Error> {
        let mut document = JvxlDocument::new(
            header.clone(),
            self.edge_encoding,
            self.color_encoding,
        );
        for _ in 0..self.surface_count {
            if self.cursor.is_exhausted() {
                break;
            }
            document.surfaces.push(self.read_surface(header)?);
        }
        if document.surfaces.is_empty() {
            return Err(JvxlError::UnexpectedEof {
                expected: "surface definition".to_string(),
            });
        }
        debug!(
            "Read JVXL document with {} surface(s) on a {}x{}x{} lattice",
            document.surfaces.len(),
            header.counts[0],
            header.counts[1],
            header.counts[2]
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::traits::LengthUnit;
    use crate::core::models::volume::{Plane, WalkOrder};
    use nalgebra::{Point3, Vector3};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn document() -> JvxlDocument {
        let header = VolumeHeader {
            titles: vec!["density".into(), "test".into()],
            atom_count: -2,
            origin: Point3::new(-1.0, -1.0, -1.0),
            vectors: [Vector3::x(), Vector3::y(), Vector3::z()],
            counts: [2, 2, 2],
            units: LengthUnit::Angstrom,
        };
        let mut doc = JvxlDocument::new(
            header,
            FractionEncoding::default(),
            FractionEncoding::default(),
        );
        doc.surfaces.push(JvxlSurface {
            definition: DefinitionLine::plain(0.5, 2, 3, 3, false, (0.0, 2.0)),
            run_lengths: vec![7, 1],
            edge_data: "PPP".into(),
            color_data: "#$%".into(),
            walk_order: WalkOrder::Descending,
            info: "first".into(),
        });
        let plane = Plane::from_coefficients(1.0, 0.0, 0.0, 0.0).unwrap();
        doc.surfaces.push(JvxlSurface {
            definition: DefinitionLine::plane(0.0, plane, 0, false, false, (0.0, 0.0)),
            run_lengths: vec![],
            edge_data: String::new(),
            color_data: String::new(),
            walk_order: WalkOrder::Ascending,
            info: "plane".into(),
        });
        doc
    }

    #[test]
    fn reads_back_written_document() {
        let original = document();
        let (_, parsed) = JvxlReader::from_text(&original.to_text()).read_all().unwrap();
        assert_eq!(parsed.surfaces, original.surfaces);
        assert_eq!(parsed.header.counts, [2, 2, 2]);
        assert_eq!(parsed.header.titles, original.header.titles);
        assert_eq!(parsed.header.units, LengthUnit::Angstrom);
        assert!((parsed.header.origin.x + 1.0).abs() < 1e-9);
    }

    #[test]
    fn run_lengths_must_cover_grid_exactly() {
        let text = document().to_text().replace("\n7 1\n", "\n7 2\n");
        assert!(matches!(
            JvxlReader::from_text(&text).read_all(),
            Err(JvxlError::RunLengthMismatch {
                expected: 8,
                actual: 9
            })
        ));
    }

    #[test]
    fn declared_run_count_must_match_runs_read() {
        let text = document().to_text().replace("\n0.5 2 3 3 ", "\n0.5 3 3 3 ");
        assert!(matches!(
            JvxlReader::from_text(&text).read_all(),
            Err(JvxlError::RunCountMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn declared_edge_count_must_match_edge_data() {
        let text = document().to_text().replace("\n0.5 2 3 3 ", "\n0.5 2 12345 3 ");
        assert!(matches!(
            JvxlReader::from_text(&text).read_all(),
            Err(JvxlError::EdgeCountMismatch {
                expected: 12345,
                actual: 3
            })
        ));
    }

    #[test]
    fn reads_walk_order_from_info_line() {
        let text = document().to_text();
        assert!(text.contains("\n# walk=descending first\n"));
        let (_, parsed) = JvxlReader::from_text(&text).read_all().unwrap();
        assert_eq!(parsed.surfaces[0].walk_order, WalkOrder::Descending);
        assert_eq!(parsed.surfaces[0].info, "first");
        assert_eq!(parsed.surfaces[1].walk_order, WalkOrder::Ascending);
    }

    #[test]
    fn unknown_walk_order_is_an_error() {
        let text = document()
            .to_text()
            .replace("# walk=descending first", "# walk=spiral first");
        assert!(matches!(
            JvxlReader::from_text(&text).read_all(),
            Err(JvxlError::InvalidWalkOrder(_))
        ));
    }

    #[test]
    fn truncated_color_line_is_an_error() {
        let text = document().to_text().replace("\n#$%\n", "\n#$\n");
        assert!(matches!(
            JvxlReader::from_text(&text).read_all(),
            Err(JvxlError::ColorCountMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn missing_surface_block_is_an_error() {
        let text = document().file_info();
        assert!(matches!(
            JvxlReader::from_text(&text).read_all(),
            Err(JvxlError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn reads_custom_alphabet_from_extra_line() {
        let mut doc = document();
        doc.edge_encoding = FractionEncoding::new(40, 60).unwrap();
        doc.surfaces.truncate(1);
        doc.surfaces[0].edge_data = "(((".into();
        let (_, parsed) = JvxlReader::from_text(&doc.to_text()).read_all().unwrap();
        assert_eq!(parsed.edge_encoding, doc.edge_encoding);
    }

    #[test]
    fn read_from_path_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", document().to_text()).unwrap();
        let (_, parsed) = JvxlReader::read_from_path(file.path()).unwrap();
        assert_eq!(parsed.surfaces.len(), 2);
    }
}
