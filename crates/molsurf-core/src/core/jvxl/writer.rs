use super::codec::FractionEncoding;
use super::definition::DefinitionLine;
use super::document::JvxlSurface;
use crate::core::models::volume::{Plane, WalkOrder};

/// Collapses inside/outside flags into alternating run lengths. The first run always counts
/// outside points and may be zero.
pub fn run_lengths<I: IntoIterator<Item = bool>>(inside: I) -> Vec<u32> {
    let mut runs = vec![0u32];
    let mut current = false;
    for flag in inside {
        if flag != current {
            runs.push(0);
            current = flag;
        }
        if let Some(last) = runs.last_mut() {
            *last += 1;
        }
    }
    runs
}

/// Replays run lengths as per-point inside flags.
pub fn expand_run_lengths(runs: &[u32]) -> impl Iterator<Item = bool> + '_ {
    runs.iter()
        .enumerate()
        .flat_map(|(i, &run)| std::iter::repeat_n(i % 2 == 1, run as usize))
}

/// Which definition-line mode a surface is written in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceKind {
    Plain,
    Contoured,
    /// Two-color sign map. Absolute-cutoff surfaces are always written this way so a reader can
    /// re-apply the sign filter.
    Bicolor,
    Plane { plane: Plane, contourable: bool },
}

/// Per-vertex color fractions in `[0, 1]` relative to `range`.
#[derive(Debug, Clone, Copy)]
pub struct ColorChannel<'a> {
    pub fractions: &'a [f32],
    pub precision: bool,
    pub range: (f32, f32),
}

pub struct SurfaceEncoder<'a> {
    pub kind: SurfaceKind,
    pub cutoff: f32,
    pub run_lengths: &'a [u32],
    pub edge_fractions: &'a [f32],
    pub colors: Option<ColorChannel<'a>>,
    pub walk_order: WalkOrder,
    pub info: String,
}

impl SurfaceEncoder<'_> {
    pub fn encode(&self, edge: &FractionEncoding, color: &FractionEncoding) -> JvxlSurface {
        // contourable planes are always written with two characters per color
        let precision = self.colors.is_some_and(|c| c.precision)
            || matches!(
                self.kind,
                SurfaceKind::Plane {
                    contourable: true,
                    ..
                }
            );
        let color_data = match &self.colors {
            Some(channel) if precision => color.encode_all_precise(channel.fractions),
            Some(channel) => color.encode_all(channel.fractions),
            None => String::new(),
        };
        let color_bytes = color_data.chars().count();
        let range = self.colors.map(|c| c.range).unwrap_or((0.0, 0.0));
        let ints = self.run_lengths.len();
        let edges = self.edge_fractions.len();

        let definition = match self.kind {
            SurfaceKind::Plane { plane, contourable } => {
                DefinitionLine::plane(self.cutoff, plane, color_bytes, contourable, precision, range)
            }
            SurfaceKind::Contoured => {
                DefinitionLine::contoured(self.cutoff, ints, edges, color_bytes, precision, range)
            }
            SurfaceKind::Bicolor if color_bytes > 0 => DefinitionLine::bicolor(
                self.cutoff,
                ints,
                self.colors.map_or(0, |c| c.fractions.len()),
                color_bytes,
                precision,
            ),
            SurfaceKind::Bicolor | SurfaceKind::Plain => {
                DefinitionLine::plain(self.cutoff, ints, edges, color_bytes, precision, range)
            }
        };

        let (run_lengths, edge_data) = if matches!(self.kind, SurfaceKind::Plane { .. }) {
            (Vec::new(), String::new())
        } else {
            (
                self.run_lengths.to_vec(),
                edge.encode_all(self.edge_fractions),
            )
        };

        JvxlSurface {
            definition,
            run_lengths,
            edge_data,
            color_data,
            walk_order: self.walk_order,
            info: self.info.clone(),
        }
    }
}
