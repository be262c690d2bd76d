pub mod models;

use crate::cli::{StructureArgs, SurfaceArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use molsurf::core::jvxl::codec::{DEFAULT_BASE, DEFAULT_RANGE, FractionEncoding};
use molsurf::core::models::volume::Plane;
use molsurf::engine::coloring::ColorMode;
use molsurf::engine::config::{
    self as core_config, StructureConfigBuilder, SurfaceConfigBuilder, WalkOrder,
};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSurfaceSection {
    cutoff: Option<f32>,
    absolute: Option<bool>,
    walk_order: Option<WalkOrder>,
    plane: Option<[f64; 4]>,
    contours: Option<usize>,
    color_contours: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialColorSection {
    mode: Option<String>,
    range: Option<[f32; 2]>,
    palette_size: Option<usize>,
    precision: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialEncodingSection {
    edge_base: Option<u32>,
    edge_range: Option<u32>,
    color_base: Option<u32>,
    color_range: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialStructureSection {
    use_hbonds: Option<bool>,
    hbond_ca_cutoff: Option<f64>,
    min_atom_distance: Option<f64>,
    helix_pitch: Option<usize>,
    min_hbond_run: Option<usize>,
}

/// Everything a config file may set. Every field is optional; absent values fall through to
/// the library defaults.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    surface: Option<PartialSurfaceSection>,
    color: Option<PartialColorSection>,
    encoding: Option<PartialEncodingSection>,
    structure: Option<PartialStructureSection>,
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value))
    })
}

fn plane_from(coefficients: [f64; 4]) -> Result<Plane> {
    let [a, b, c, d] = coefficients;
    Plane::from_coefficients(a, b, c, d).ok_or_else(|| {
        CliError::Config(format!(
            "`surface.plane` {:?} has a zero normal",
            coefficients
        ))
    })
}

fn encoding_from(base: Option<u32>, range: Option<u32>, name: &str) -> Result<FractionEncoding> {
    FractionEncoding::new(base.unwrap_or(DEFAULT_BASE), range.unwrap_or(DEFAULT_RANGE))
        .map_err(|e| CliError::Config(format!("`encoding.{}-*`: {}", name, e)))
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Loads `path` when given, otherwise starts from an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    pub fn merge_surface_args(mut self, args: &SurfaceArgs) -> Result<core_config::SurfaceConfig> {
        self.apply_set_values(&args.set_values)?;

        let surface = self.surface.take().unwrap_or_default();
        let color = self.color.take().unwrap_or_default();
        let encoding = self.encoding.take().unwrap_or_default();

        let mut builder = SurfaceConfigBuilder::new();

        if let Some(cutoff) = args.cutoff.or(surface.cutoff) {
            builder = builder.cutoff(cutoff);
        }
        builder = builder.absolute(args.absolute || surface.absolute.unwrap_or(false));

        let walk_order = if args.descending {
            WalkOrder::Descending
        } else {
            surface.walk_order.unwrap_or_default()
        };
        builder = builder.walk_order(walk_order);

        let plane = match &args.plane {
            Some(text) => Some(
                parser::parse_plane(text).map_err(|e| CliError::Argument(e.to_string()))?,
            ),
            None => surface.plane.map(plane_from).transpose()?,
        };
        if let Some(plane) = plane {
            builder = builder.plane(plane);
        }

        if let Some(count) = args.contours.or(surface.contours) {
            builder = builder.contours(count);
        }
        builder =
            builder.color_contours(args.color_contours || surface.color_contours.unwrap_or(false));

        if let Some(mode) = args.color_mode.as_ref().or(color.mode.as_ref()) {
            let mode = ColorMode::from_str(mode).map_err(|e| CliError::Config(e.to_string()))?;
            builder = builder.color_mode(mode);
        }

        let range = match &args.color_range {
            Some(text) => {
                Some(parser::parse_range(text).map_err(|e| CliError::Argument(e.to_string()))?)
            }
            None => color.range.map(|[red, blue]| (red, blue)),
        };
        if let Some((red, blue)) = range {
            builder = builder.color_range(red, blue);
        }
        if let Some(size) = color.palette_size {
            builder = builder.palette_size(size);
        }
        builder =
            builder.precision_color(args.precision_color || color.precision.unwrap_or(false));

        builder = builder
            .edge_encoding(encoding_from(encoding.edge_base, encoding.edge_range, "edge")?)
            .color_encoding(encoding_from(
                encoding.color_base,
                encoding.color_range,
                "color",
            )?);

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    pub fn merge_structure_args(
        mut self,
        args: &StructureArgs,
    ) -> Result<core_config::StructureConfig> {
        self.apply_set_values(&args.set_values)?;
        let structure = self.structure.take().unwrap_or_default();

        let mut builder = StructureConfigBuilder::new();
        if args.no_hbonds {
            builder = builder.use_hbonds(false);
        } else if let Some(enabled) = structure.use_hbonds {
            builder = builder.use_hbonds(enabled);
        }
        if let Some(cutoff) = args.hbond_ca_cutoff.or(structure.hbond_ca_cutoff) {
            builder = builder.hbond_ca_cutoff(cutoff);
        }
        if let Some(distance) = structure.min_atom_distance {
            builder = builder.min_atom_distance(distance);
        }
        if let Some(pitch) = structure.helix_pitch {
            builder = builder.helix_pitch(pitch);
        }
        if let Some(run) = structure.min_hbond_run {
            builder = builder.min_hbond_run(run);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value) = parser::parse_assignment(kv_pair)
                .map_err(|e| CliError::Config(e.to_string()))?;

            match key {
                "surface.cutoff" => {
                    self.surface_mut().cutoff = Some(parse_value(key, value, "float")?);
                }
                "surface.absolute" => {
                    self.surface_mut().absolute = Some(parse_value(key, value, "boolean")?);
                }
                "surface.walk-order" => {
                    let order = match value {
                        "ascending" => WalkOrder::Ascending,
                        "descending" => WalkOrder::Descending,
                        _ => {
                            return Err(CliError::Config(format!(
                                "Invalid walk order for {}: {} (expected 'ascending' or 'descending')",
                                key, value
                            )));
                        }
                    };
                    self.surface_mut().walk_order = Some(order);
                }
                "surface.plane" => {
                    let plane = parser::parse_plane(value)
                        .map_err(|e| CliError::Config(format!("{}: {}", key, e)))?;
                    self.surface_mut().plane = Some(plane.coefficients());
                }
                "surface.contours" => {
                    self.surface_mut().contours = Some(parse_value(key, value, "integer")?);
                }
                "surface.color-contours" => {
                    self.surface_mut().color_contours =
                        Some(parse_value(key, value, "boolean")?);
                }
                "color.mode" => {
                    self.color_mut().mode = Some(value.to_string());
                }
                "color.range" => {
                    let (red, blue) = parser::parse_range(value)
                        .map_err(|e| CliError::Config(format!("{}: {}", key, e)))?;
                    self.color_mut().range = Some([red, blue]);
                }
                "color.palette-size" => {
                    self.color_mut().palette_size = Some(parse_value(key, value, "integer")?);
                }
                "color.precision" => {
                    self.color_mut().precision = Some(parse_value(key, value, "boolean")?);
                }
                "encoding.edge-base" => {
                    self.encoding_mut().edge_base = Some(parse_value(key, value, "integer")?);
                }
                "encoding.edge-range" => {
                    self.encoding_mut().edge_range = Some(parse_value(key, value, "integer")?);
                }
                "encoding.color-base" => {
                    self.encoding_mut().color_base = Some(parse_value(key, value, "integer")?);
                }
                "encoding.color-range" => {
                    self.encoding_mut().color_range = Some(parse_value(key, value, "integer")?);
                }
                "structure.use-hbonds" => {
                    self.structure_mut().use_hbonds = Some(parse_value(key, value, "boolean")?);
                }
                "structure.hbond-ca-cutoff" => {
                    self.structure_mut().hbond_ca_cutoff =
                        Some(parse_value(key, value, "float")?);
                }
                "structure.min-atom-distance" => {
                    self.structure_mut().min_atom_distance =
                        Some(parse_value(key, value, "float")?);
                }
                "structure.helix-pitch" => {
                    self.structure_mut().helix_pitch = Some(parse_value(key, value, "integer")?);
                }
                "structure.min-hbond-run" => {
                    self.structure_mut().min_hbond_run =
                        Some(parse_value(key, value, "integer")?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    fn surface_mut(&mut self) -> &mut PartialSurfaceSection {
        self.surface.get_or_insert_with(Default::default)
    }

    fn color_mut(&mut self) -> &mut PartialColorSection {
        self.color.get_or_insert_with(Default::default)
    }

    fn encoding_mut(&mut self) -> &mut PartialEncodingSection {
        self.encoding.get_or_insert_with(Default::default)
    }

    fn structure_mut(&mut self) -> &mut PartialStructureSection {
        self.structure.get_or_insert_with(Default::default)
    }
}
