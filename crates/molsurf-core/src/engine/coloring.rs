use super::surface_sets::{NO_SET, label_surface_sets};
use crate::core::models::mesh::Mesh;
use nalgebra::{Point3, Vector3};
use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Value persisted for two-color maps, so the stored fraction lands clearly on one side.
pub const BICOLOR_VALUE: f32 = 0.999;

/// Angular symmetry of an atomic orbital lobe, used to split a surface into `+` and `-` parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    S,
    X,
    Y,
    Z,
    Xy,
    Yz,
    Xz,
    X2MinusY2,
    Z2,
}

static PHASE_NAMES: Map<&'static str, Phase> = phf_map! {
    "s" => Phase::S,
    "x" => Phase::X,
    "y" => Phase::Y,
    "z" => Phase::Z,
    "xy" => Phase::Xy,
    "yz" => Phase::Yz,
    "xz" => Phase::Xz,
    "x2-y2" => Phase::X2MinusY2,
    "z2" => Phase::Z2,
};

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::S => "s",
            Phase::X => "x",
            Phase::Y => "y",
            Phase::Z => "z",
            Phase::Xy => "xy",
            Phase::Yz => "yz",
            Phase::Xz => "xz",
            Phase::X2MinusY2 => "x2-y2",
            Phase::Z2 => "z2",
        }
    }

    /// The angular polynomial at `offset` from the orbital center.
    pub fn evaluate(&self, offset: &Vector3<f64>) -> f64 {
        let (x, y, z) = (offset.x, offset.y, offset.z);
        match self {
            Phase::S => 1.0,
            Phase::X => x,
            Phase::Y => y,
            Phase::Z => z,
            Phase::Xy => x * y,
            Phase::Yz => y * z,
            Phase::Xz => x * z,
            Phase::X2MinusY2 => x * x - y * y,
            Phase::Z2 => 2.0 * z * z - x * x - y * y,
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown color mode '{0}'")]
pub struct ParseColorModeError(String);

impl FromStr for Phase {
    type Err = ParseColorModeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PHASE_NAMES
            .get(s.to_lowercase().as_str())
            .copied()
            .ok_or_else(|| ParseColorModeError(s.to_string()))
    }
}

/// How vertex values are chosen before palette lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorMode {
    /// Continuous palette over the mapped scalar.
    #[default]
    Value,
    /// Two colors split at zero.
    Sign,
    /// Two colors by the sign of an orbital phase polynomial.
    Phase(Phase),
    /// One color per connected surface piece.
    Sets,
}

impl ColorMode {
    pub fn is_bicolor(&self) -> bool {
        matches!(self, ColorMode::Sign | ColorMode::Phase(_))
    }
}

/// Accepts `value`, `sign`, `sets`, or `phase:<name>` such as `phase:x2-y2`.
impl FromStr for ColorMode {
    type Err = ParseColorModeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "value" => Ok(ColorMode::Value),
            "sign" => Ok(ColorMode::Sign),
            "sets" => Ok(ColorMode::Sets),
            other => match other.strip_prefix("phase:") {
                Some(name) => Ok(ColorMode::Phase(name.parse()?)),
                None => Err(ParseColorModeError(s.to_string())),
            },
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Value => write!(f, "value"),
            ColorMode::Sign => write!(f, "sign"),
            ColorMode::Phase(phase) => write!(f, "phase:{}", phase.name()),
            ColorMode::Sets => write!(f, "sets"),
        }
    }
}

const ROYGB_STOPS: [[f32; 3]; 5] = [
    [255.0, 0.0, 0.0],
    [255.0, 165.0, 0.0],
    [255.0, 255.0, 0.0],
    [0.0, 255.0, 0.0],
    [0.0, 0.0, 255.0],
];

/// RGB of entry `index` in a red-orange-yellow-green-blue palette of `size` colors.
pub fn roygb(index: u16, size: usize) -> [u8; 3] {
    let t = if size > 1 {
        (index as f32 / (size - 1) as f32).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let scaled = t * (ROYGB_STOPS.len() - 1) as f32;
    let lower = (scaled.floor() as usize).min(ROYGB_STOPS.len() - 2);
    let w = scaled - lower as f32;
    let (a, b) = (ROYGB_STOPS[lower], ROYGB_STOPS[lower + 1]);
    std::array::from_fn(|c| (a[c] + (b[c] - a[c]) * w).round() as u8)
}

/// Maps scalar values onto palette indices over `[red, blue]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorEncoder {
    red: f32,
    blue: f32,
    palette_size: usize,
    bands: Option<usize>,
}

impl ColorEncoder {
    pub fn new(red: f32, blue: f32, palette_size: usize) -> Self {
        Self {
            red,
            blue,
            palette_size: palette_size.max(2),
            bands: None,
        }
    }

    /// Quantizes colors into `bands` flat contour bands.
    pub fn with_bands(mut self, bands: usize) -> Self {
        self.bands = Some(bands.max(1));
        self
    }

    pub fn range(&self) -> (f32, f32) {
        (self.red, self.blue)
    }

    /// Position of `value` within the range, clamped to `[0, 1]`; NaN stays NaN.
    pub fn fraction(&self, value: f32) -> f32 {
        if value.is_nan() {
            return f32::NAN;
        }
        let span = self.blue - self.red;
        if span == 0.0 {
            return 0.0;
        }
        ((value - self.red) / span).clamp(0.0, 1.0)
    }

    pub fn color_index(&self, value: f32) -> Option<u16> {
        let mut fraction = self.fraction(value);
        if fraction.is_nan() {
            return None;
        }
        if let Some(bands) = self.bands {
            let band = ((fraction * bands as f32).floor() as usize).min(bands - 1);
            fraction = if bands == 1 {
                0.5
            } else {
                band as f32 / (bands - 1) as f32
            };
        }
        Some((fraction * (self.palette_size - 1) as f32).round() as u16)
    }
}

/// Values written to the color channel and the range they were mapped over.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMapping {
    pub values: Vec<f32>,
    pub range: (f32, f32),
    pub bicolor: bool,
}

impl ColorMapping {
    pub fn fractions(&self) -> Vec<f32> {
        let encoder = ColorEncoder::new(self.range.0, self.range.1, 2);
        self.values.iter().map(|&v| encoder.fraction(v)).collect()
    }
}

fn finite_range(values: &[f32]) -> Option<(f32, f32)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn signed(value: f64) -> f32 {
    if value.is_nan() {
        f32::NAN
    } else if value >= 0.0 {
        BICOLOR_VALUE
    } else {
        -BICOLOR_VALUE
    }
}

/// Colors a mesh in one of the [`ColorMode`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshColorer {
    pub mode: ColorMode,
    /// Explicit `[red, blue]`; the data range is used when absent.
    pub range: Option<(f32, f32)>,
    pub palette_size: usize,
    pub bands: Option<usize>,
    pub phase_center: Point3<f64>,
}

impl MeshColorer {
    /// Sets per-vertex color indices on `mesh` and returns the values to persist.
    ///
    /// `mapped` holds one value per vertex sampled from a second data set; without it the
    /// mesh's own vertex values are used. In value mode the mapped values replace the
    /// mesh values.
    pub fn apply(&self, mesh: &mut Mesh, mapped: Option<Vec<f32>>) -> ColorMapping {
        let source = mapped.unwrap_or_else(|| mesh.values().to_vec());
        let (values, range, bicolor) = match self.mode {
            ColorMode::Value => {
                let range = self
                    .range
                    .or_else(|| finite_range(&source))
                    .unwrap_or((0.0, 0.0));
                (source, range, false)
            }
            ColorMode::Sign => {
                let values = source.iter().map(|&v| signed(v as f64)).collect();
                (values, (-1.0, 1.0), true)
            }
            ColorMode::Phase(phase) => {
                let values = mesh
                    .vertices()
                    .iter()
                    .map(|p| signed(phase.evaluate(&(p - self.phase_center))))
                    .collect();
                (values, (-1.0, 1.0), true)
            }
            ColorMode::Sets => {
                let summary = label_surface_sets(mesh);
                let values = mesh
                    .vertex_sets()
                    .unwrap_or(&[])
                    .iter()
                    .map(|&id| if id == NO_SET { f32::NAN } else { id as f32 })
                    .collect();
                let top = summary.set_count.saturating_sub(1).max(1) as f32;
                (values, (0.0, top), false)
            }
        };

        let mut encoder = ColorEncoder::new(range.0, range.1, self.palette_size);
        if let Some(bands) = self.bands {
            encoder = encoder.with_bands(bands);
        }
        let indices = values
            .iter()
            .map(|&v| encoder.color_index(v).unwrap_or(0))
            .collect();
        mesh.set_color_indices(Some(indices));
        if self.mode == ColorMode::Value && values.len() == mesh.vertex_count() {
            mesh.set_values(values.clone());
        }

        debug!(
            "Colored {} vertices by {} over [{}, {}]",
            values.len(),
            self.mode,
            range.0,
            range.1
        );
        ColorMapping {
            values,
            range,
            bicolor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colorer(mode: ColorMode) -> MeshColorer {
        MeshColorer {
            mode,
            range: None,
            palette_size: 256,
            bands: None,
            phase_center: Point3::origin(),
        }
    }

    fn strip() -> Mesh {
        let mut mesh = Mesh::new();
        for (i, value) in [-2.0f32, -0.5, 0.0, 1.0, 4.0].into_iter().enumerate() {
            mesh.add_vertex(Point3::new(i as f64 - 2.0, 1.0, 0.0), value);
        }
        mesh.add_triangle([0, 1, 2], 0);
        mesh.add_triangle([2, 3, 4], 0);
        mesh
    }

    #[test]
    fn palette_ends_are_red_and_blue() {
        assert_eq!(roygb(0, 256), [255, 0, 0]);
        assert_eq!(roygb(255, 256), [0, 0, 255]);
        assert_eq!(roygb(128, 257), [255, 255, 0]);
    }

    #[test]
    fn encoder_clamps_to_range() {
        let encoder = ColorEncoder::new(-1.0, 1.0, 256);
        assert_eq!(encoder.color_index(-5.0), Some(0));
        assert_eq!(encoder.color_index(5.0), Some(255));
        assert_eq!(encoder.color_index(0.0), Some(128));
        assert_eq!(encoder.color_index(f32::NAN), None);
    }

    #[test]
    fn banded_encoder_uses_flat_steps() {
        let encoder = ColorEncoder::new(0.0, 1.0, 256).with_bands(3);
        assert_eq!(encoder.color_index(0.1), encoder.color_index(0.3));
        assert_eq!(encoder.color_index(0.5), Some(128));
        assert_eq!(encoder.color_index(0.9), Some(255));
    }

    #[test]
    fn value_mode_detects_data_range() {
        let mut mesh = strip();
        let mapping = colorer(ColorMode::Value).apply(&mut mesh, None);
        assert_eq!(mapping.range, (-2.0, 4.0));
        assert!(!mapping.bicolor);
        let indices = mesh.color_indices().unwrap();
        assert_eq!(indices[0], 0);
        assert_eq!(indices[4], 255);
    }

    #[test]
    fn mapped_values_replace_vertex_values() {
        let mut mesh = strip();
        let mapped = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        colorer(ColorMode::Value).apply(&mut mesh, Some(mapped.clone()));
        assert_eq!(mesh.values(), mapped.as_slice());
    }

    #[test]
    fn sign_mode_persists_near_unit_values() {
        let mut mesh = strip();
        let mapping = colorer(ColorMode::Sign).apply(&mut mesh, None);
        assert!(mapping.bicolor);
        assert_eq!(mapping.values, vec![-0.999, -0.999, 0.999, 0.999, 0.999]);
        assert_eq!(mesh.values()[0], -2.0);
    }

    #[test]
    fn phase_mode_splits_on_polynomial_sign() {
        let mut mesh = strip();
        let mapping = colorer(ColorMode::Phase(Phase::X)).apply(&mut mesh, None);
        assert_eq!(mapping.values[0], -0.999);
        assert_eq!(mapping.values[4], 0.999);
        let mapping = colorer(ColorMode::Phase(Phase::X2MinusY2)).apply(&mut mesh, None);
        assert_eq!(mapping.values[2], -0.999);
        assert_eq!(mapping.values[0], 0.999);
    }

    #[test]
    fn sets_mode_colors_by_component() {
        let mut mesh = strip();
        let mapping = colorer(ColorMode::Sets).apply(&mut mesh, None);
        assert!(mapping.values.iter().all(|&v| v == 0.0));
        assert!(mesh.vertex_sets().is_some());
    }

    #[test]
    fn color_modes_parse_from_names() {
        assert_eq!("sign".parse::<ColorMode>().unwrap(), ColorMode::Sign);
        assert_eq!(
            "phase:X2-Y2".parse::<ColorMode>().unwrap(),
            ColorMode::Phase(Phase::X2MinusY2)
        );
        assert!("phase:f".parse::<ColorMode>().is_err());
        assert_eq!(ColorMode::Phase(Phase::Z2).to_string(), "phase:z2");
    }
}
