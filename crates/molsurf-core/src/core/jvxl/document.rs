use super::codec::{FractionEncoding, compress};
use super::definition::DefinitionLine;
use super::error::JvxlError;
use crate::core::io::traits::VolumeHeader;
use crate::core::models::volume::WalkOrder;
use itertools::Itertools;
use std::fmt::Write;

pub const FORMAT_MARKER: &str = "#JVXL";
pub const FORMAT_VERSION: &str = "Jmol voxel format version 1.1";
const INTS_PER_LINE: usize = 20;
const WALK_KEY: &str = "walk=";

fn walk_keyword(order: WalkOrder) -> &'static str {
    match order {
        WalkOrder::Ascending => "ascending",
        WalkOrder::Descending => "descending",
    }
}

/// Splits a surface info line into the walk order it records and the remaining free text.
/// Lines without a leading `walk=` token were written in ascending order.
pub fn parse_info_line(line: &str) -> Result<(WalkOrder, String), JvxlError> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix(WALK_KEY) else {
        return Ok((WalkOrder::Ascending, line.to_string()));
    };
    let (keyword, info) = rest.split_once(' ').unwrap_or((rest, ""));
    let order = match keyword {
        "ascending" => WalkOrder::Ascending,
        "descending" => WalkOrder::Descending,
        other => return Err(JvxlError::InvalidWalkOrder(other.to_string())),
    };
    Ok((order, info.trim().to_string()))
}

/// One encoded surface. Character streams are held decompressed.
#[derive(Debug, Clone, PartialEq)]
pub struct JvxlSurface {
    pub definition: DefinitionLine,
    /// Alternating outside/inside counts over lattice points in walk order, outside first.
    pub run_lengths: Vec<u32>,
    pub edge_data: String,
    pub color_data: String,
    /// Lattice walk the run lengths and edge characters follow.
    pub walk_order: WalkOrder,
    pub info: String,
}

impl JvxlSurface {
    /// The `#` line closing the block: walk token first, then free text.
    pub fn info_line(&self) -> String {
        let walk = format!("{WALK_KEY}{}", walk_keyword(self.walk_order));
        if self.info.is_empty() {
            walk
        } else {
            format!("{walk} {}", self.info)
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edge_data.chars().count()
    }

    pub fn edge_fractions(&self, encoding: &FractionEncoding) -> Result<Vec<f32>, JvxlError> {
        encoding.decode_all(&self.edge_data)
    }

    /// Decodes one value per vertex from the color stream, mapped back onto
    /// `[value_red, value_blue]`. Fails unless the stream holds exactly one (or, for precision
    /// color, two) characters per vertex.
    pub fn color_values(
        &self,
        encoding: &FractionEncoding,
        vertex_count: usize,
    ) -> Result<Vec<f32>, JvxlError> {
        let precision = self.definition.is_precision_color();
        let expected = if precision {
            vertex_count * 2
        } else {
            vertex_count
        };
        let actual = self.color_data.chars().count();
        if actual != expected {
            return Err(JvxlError::ColorCountMismatch { expected, actual });
        }
        let fractions = if precision {
            encoding.decode_all_precise(&self.color_data)?
        } else {
            encoding.decode_all(&self.color_data)?
        };
        let red = self.definition.value_red;
        let span = self.definition.value_blue - red;
        Ok(fractions.into_iter().map(|f| red + f * span).collect())
    }

    /// The surface block as it appears in a file: definition line, run lengths, compressed
    /// edge and color lines, info line.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "{}", self.definition);
        if !self.definition.is_plane() {
            for chunk in &self.run_lengths.iter().chunks(INTS_PER_LINE) {
                let _ = writeln!(text, "{}", chunk.format(" "));
            }
            let _ = writeln!(text, "{}", compress(&self.edge_data));
        }
        if self.definition.is_color_mapped() {
            let _ = writeln!(text, "{}", compress(&self.color_data));
        }
        let _ = writeln!(text, "# {}", self.info_line());
        text
    }
}

/// A complete JVXL file: lattice header, alphabets, and one or more surfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct JvxlDocument {
    pub header: VolumeHeader,
    pub edge_encoding: FractionEncoding,
    pub color_encoding: FractionEncoding,
    pub surfaces: Vec<JvxlSurface>,
}

impl JvxlDocument {
    pub fn new(
        header: VolumeHeader,
        edge_encoding: FractionEncoding,
        color_encoding: FractionEncoding,
    ) -> Self {
        Self {
            header,
            edge_encoding,
            color_encoding,
            surfaces: Vec::new(),
        }
    }

    pub fn surface(&self, index: usize) -> Result<&JvxlSurface, JvxlError> {
        self.surfaces.get(index).ok_or(JvxlError::MissingSurface {
            index,
            available: self.surfaces.len(),
        })
    }

    /// Header text through the extra line. Two dummy atoms bracket the lattice, at the first
    /// and last grid point.
    pub fn file_info(&self) -> String {
        let h = &self.header;
        let mut text = String::new();
        let _ = writeln!(text, "{FORMAT_MARKER}");
        for i in 0..2 {
            let title = h.titles.get(i).map(String::as_str).unwrap_or("");
            let _ = writeln!(text, "{}", title.replace(['\n', '\r'], " "));
        }
        let _ = writeln!(
            text,
            "-2 {:.6} {:.6} {:.6} ANGSTROMS",
            h.origin.x, h.origin.y, h.origin.z
        );
        for axis in 0..3 {
            let v = &h.vectors[axis];
            let _ = writeln!(
                text,
                "{} {:.6} {:.6} {:.6}",
                h.counts[axis], v.x, v.y, v.z
            );
        }
        let far = h.origin
            + (0..3)
                .map(|axis| h.vectors[axis] * h.counts[axis].saturating_sub(1) as f64)
                .fold(nalgebra::Vector3::zeros(), |sum, v| sum + v);
        let _ = writeln!(
            text,
            "1 1.0 {:.6} {:.6} {:.6}",
            h.origin.x, h.origin.y, h.origin.z
        );
        let _ = writeln!(text, "2 2.0 {:.6} {:.6} {:.6}", far.x, far.y, far.z);
        let _ = writeln!(
            text,
            "-{} {} {} {} {} {}",
            self.surfaces.len().max(1),
            self.edge_encoding.base(),
            self.edge_encoding.range(),
            self.color_encoding.base(),
            self.color_encoding.range(),
            FORMAT_VERSION
        );
        text
    }

    pub fn surface_data(&self, index: usize) -> Result<String, JvxlError> {
        Ok(self.surface(index)?.to_text())
    }

    pub fn to_text(&self) -> String {
        let mut text = self.file_info();
        for surface in &self.surfaces {
            text.push_str(&surface.to_text());
        }
        text
    }
}
