use super::coloring::ColorMode;
use crate::core::jvxl::codec::FractionEncoding;
use crate::core::models::volume::Plane;
pub use crate::core::models::volume::WalkOrder;
use thiserror::Error;

pub const DEFAULT_CUTOFF: f32 = 0.02;
pub const DEFAULT_PALETTE_SIZE: usize = 256;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for {parameter}: {reason}")]
    Invalid {
        parameter: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    pub cutoff: f32,
    /// Treat the surface as `|value| >= cutoff`, for signed data such as orbitals.
    pub is_absolute: bool,
    pub walk_order: WalkOrder,
    pub edge_encoding: FractionEncoding,
    pub color_encoding: FractionEncoding,
    pub precision_color: bool,
    pub color_mode: ColorMode,
    /// Values mapped to the red and blue ends of the palette; `None` uses the data range.
    pub color_range: Option<(f32, f32)>,
    pub palette_size: usize,
    pub plane: Option<Plane>,
    /// Number of evenly spaced contour levels, if contouring is requested.
    pub contour_count: Option<usize>,
    /// Quantize colors into contour bands instead of a continuous palette.
    pub color_contours: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
            is_absolute: false,
            walk_order: WalkOrder::default(),
            edge_encoding: FractionEncoding::default(),
            color_encoding: FractionEncoding::default(),
            precision_color: false,
            color_mode: ColorMode::default(),
            color_range: None,
            palette_size: DEFAULT_PALETTE_SIZE,
            plane: None,
            contour_count: None,
            color_contours: false,
        }
    }
}

#[derive(Default)]
pub struct SurfaceConfigBuilder {
    cutoff: Option<f32>,
    is_absolute: Option<bool>,
    walk_order: Option<WalkOrder>,
    edge_encoding: Option<FractionEncoding>,
    color_encoding: Option<FractionEncoding>,
    precision_color: Option<bool>,
    color_mode: Option<ColorMode>,
    color_range: Option<(f32, f32)>,
    palette_size: Option<usize>,
    plane: Option<Plane>,
    contour_count: Option<usize>,
    color_contours: Option<bool>,
}

impl SurfaceConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cutoff(mut self, cutoff: f32) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
    pub fn absolute(mut self, absolute: bool) -> Self {
        self.is_absolute = Some(absolute);
        self
    }
    pub fn walk_order(mut self, order: WalkOrder) -> Self {
        self.walk_order = Some(order);
        self
    }
    pub fn edge_encoding(mut self, encoding: FractionEncoding) -> Self {
        self.edge_encoding = Some(encoding);
        self
    }
    pub fn color_encoding(mut self, encoding: FractionEncoding) -> Self {
        self.color_encoding = Some(encoding);
        self
    }
    pub fn precision_color(mut self, precision: bool) -> Self {
        self.precision_color = Some(precision);
        self
    }
    pub fn color_mode(mut self, mode: ColorMode) -> Self {
        self.color_mode = Some(mode);
        self
    }
    pub fn color_range(mut self, red: f32, blue: f32) -> Self {
        self.color_range = Some((red, blue));
        self
    }
    pub fn palette_size(mut self, size: usize) -> Self {
        self.palette_size = Some(size);
        self
    }
    pub fn plane(mut self, plane: Plane) -> Self {
        self.plane = Some(plane);
        self
    }
    pub fn contours(mut self, count: usize) -> Self {
        self.contour_count = Some(count);
        self
    }
    pub fn color_contours(mut self, enabled: bool) -> Self {
        self.color_contours = Some(enabled);
        self
    }

    pub fn build(self) -> Result<SurfaceConfig, ConfigError> {
        let defaults = SurfaceConfig::default();
        let cutoff = self.cutoff.unwrap_or(defaults.cutoff);
        let is_absolute = self.is_absolute.unwrap_or(defaults.is_absolute);
        if !cutoff.is_finite() {
            return Err(ConfigError::Invalid {
                parameter: "cutoff",
                reason: format!("{cutoff} is not a finite number"),
            });
        }
        if is_absolute && cutoff <= 0.0 {
            return Err(ConfigError::Invalid {
                parameter: "cutoff",
                reason: "an absolute cutoff must be positive".to_string(),
            });
        }
        if let Some((red, blue)) = self.color_range {
            if !red.is_finite() || !blue.is_finite() || red == blue {
                return Err(ConfigError::Invalid {
                    parameter: "color_range",
                    reason: format!("[{red}, {blue}] is not a usable range"),
                });
            }
        }
        let palette_size = self.palette_size.unwrap_or(defaults.palette_size);
        if !(2..=u16::MAX as usize).contains(&palette_size) {
            return Err(ConfigError::Invalid {
                parameter: "palette_size",
                reason: format!("{palette_size} colors is out of range"),
            });
        }
        if self.contour_count == Some(0) {
            return Err(ConfigError::Invalid {
                parameter: "contours",
                reason: "at least one contour level is required".to_string(),
            });
        }
        let color_contours = self.color_contours.unwrap_or(defaults.color_contours);
        if color_contours && self.contour_count.is_none() {
            return Err(ConfigError::MissingParameter("contours"));
        }

        Ok(SurfaceConfig {
            cutoff,
            is_absolute,
            walk_order: self.walk_order.unwrap_or(defaults.walk_order),
            edge_encoding: self.edge_encoding.unwrap_or(defaults.edge_encoding),
            color_encoding: self.color_encoding.unwrap_or(defaults.color_encoding),
            precision_color: self.precision_color.unwrap_or(defaults.precision_color),
            color_mode: self.color_mode.unwrap_or(defaults.color_mode),
            color_range: self.color_range,
            palette_size,
            plane: self.plane,
            contour_count: self.contour_count,
            color_contours,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructureConfig {
    /// Run the hydrogen-bond tier when full backbone atoms are available.
    pub use_hbonds: bool,
    /// Alpha-carbon distance beyond which no hydrogen bond is considered.
    pub hbond_ca_cutoff: f64,
    /// Any interatomic distance below this saturates the hydrogen-bond energy.
    pub min_atom_distance: f64,
    /// Donor-acceptor offset of an alpha helix.
    pub helix_pitch: usize,
    /// Minimum run of consecutive pitch-matching donors tagged as helix.
    pub min_hbond_run: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            use_hbonds: true,
            hbond_ca_cutoff: 9.0,
            min_atom_distance: 0.5,
            helix_pitch: 4,
            min_hbond_run: 3,
        }
    }
}

#[derive(Default)]
pub struct StructureConfigBuilder {
    use_hbonds: Option<bool>,
    hbond_ca_cutoff: Option<f64>,
    min_atom_distance: Option<f64>,
    helix_pitch: Option<usize>,
    min_hbond_run: Option<usize>,
}

impl StructureConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_hbonds(mut self, enabled: bool) -> Self {
        self.use_hbonds = Some(enabled);
        self
    }
    pub fn hbond_ca_cutoff(mut self, cutoff: f64) -> Self {
        self.hbond_ca_cutoff = Some(cutoff);
        self
    }
    pub fn min_atom_distance(mut self, distance: f64) -> Self {
        self.min_atom_distance = Some(distance);
        self
    }
    pub fn helix_pitch(mut self, pitch: usize) -> Self {
        self.helix_pitch = Some(pitch);
        self
    }
    pub fn min_hbond_run(mut self, run: usize) -> Self {
        self.min_hbond_run = Some(run);
        self
    }

    pub fn build(self) -> Result<StructureConfig, ConfigError> {
        let defaults = StructureConfig::default();
        let hbond_ca_cutoff = self.hbond_ca_cutoff.unwrap_or(defaults.hbond_ca_cutoff);
        if hbond_ca_cutoff.is_nan() || hbond_ca_cutoff <= 0.0 {
            return Err(ConfigError::Invalid {
                parameter: "hbond_ca_cutoff",
                reason: format!("{hbond_ca_cutoff} must be positive"),
            });
        }
        let min_atom_distance = self.min_atom_distance.unwrap_or(defaults.min_atom_distance);
        if min_atom_distance.is_nan() || min_atom_distance < 0.0 {
            return Err(ConfigError::Invalid {
                parameter: "min_atom_distance",
                reason: format!("{min_atom_distance} must not be negative"),
            });
        }
        let helix_pitch = self.helix_pitch.unwrap_or(defaults.helix_pitch);
        if helix_pitch < 3 {
            return Err(ConfigError::Invalid {
                parameter: "helix_pitch",
                reason: format!("pitch {helix_pitch} is shorter than any helix"),
            });
        }
        Ok(StructureConfig {
            use_hbonds: self.use_hbonds.unwrap_or(defaults.use_hbonds),
            hbond_ca_cutoff,
            min_atom_distance,
            helix_pitch,
            min_hbond_run: self.min_hbond_run.unwrap_or(defaults.min_hbond_run).max(1),
        })
    }
}
