use crate::core::io::apbs::ApbsReader;
use crate::core::io::cube::CubeReader;
use crate::core::io::sniff::VolumeFormat;
use crate::core::io::traits::{LengthUnit, VolumeHeader, VolumetricSource};
use crate::core::jvxl::document::JvxlDocument;
use crate::core::jvxl::reader::JvxlReader;
use crate::core::jvxl::writer::{ColorChannel, SurfaceEncoder, SurfaceKind};
use crate::core::models::mesh::Mesh;
use crate::core::models::volume::{Lattice, Plane, VolumeData};
use crate::engine::coloring::{ColorMapping, ColorMode, MeshColorer};
use crate::engine::config::{ConfigError, SurfaceConfig, WalkOrder};
use crate::engine::error::SurfaceError;
use crate::engine::marching_cubes::{MarchResult, MarchingCubes};
use crate::engine::marching_squares::{ContourSet, MarchingSquares, PlaneGrid};
use crate::engine::progress::{Progress, ProgressReporter};
use phf::{Map, phf_map};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info, instrument, warn};

/// Samples along the longer side of the grid used to contour a plane.
const PLANE_GRID_RESOLUTION: usize = 100;

/// Where a generator reads volumetric data from. Text and files are sniffed for their format.
#[derive(Debug, Clone)]
pub enum VolumeInput {
    Path(PathBuf),
    Text(String),
    Volume(VolumeData),
}

/// Settings and commands accepted by [`SurfaceGenerator::set_property`].
#[derive(Debug, Clone)]
pub enum SurfaceProperty {
    /// Discards the current data and surface.
    Init,
    Config(SurfaceConfig),
    Cutoff(f32),
    Absolute(bool),
    Plane(Option<Plane>),
    ColorMode(ColorMode),
    ColorRange(Option<(f32, f32)>),
    Contours(Option<usize>),
    /// Which surface of a multi-surface JVXL file to decode.
    SurfaceIndex(usize),
    Title(String),
    /// Loads volumetric data or a JVXL document.
    ReadData(VolumeInput),
    /// Builds the surface from the loaded data.
    Generate,
    /// Colors the surface from a second data set, or by the configured mode when `None`.
    MapColor(Option<VolumeInput>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    Empty,
    DataRead,
    SurfaceReady,
    ColorMapped,
}

impl GeneratorState {
    fn name(&self) -> &'static str {
        match self {
            GeneratorState::Empty => "empty",
            GeneratorState::DataRead => "holding unprocessed data",
            GeneratorState::SurfaceReady => "holding an uncolored surface",
            GeneratorState::ColorMapped => "holding a colored surface",
        }
    }
}

impl fmt::Display for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Query {
    FileData,
    FileInfo,
    SurfaceData,
}

static QUERIES: Map<&'static str, Query> = phf_map! {
    "jvxlFileData" => Query::FileData,
    "jvxlFileInfo" => Query::FileInfo,
    "jvxlSurfaceData" => Query::SurfaceData,
};

#[derive(Debug, Clone)]
enum LoadedData {
    Volume {
        titles: Vec<String>,
        volume: VolumeData,
    },
    Jvxl(JvxlDocument),
}

#[derive(Debug, Clone)]
struct Surface {
    march: MarchResult,
    kind: SurfaceKind,
    cutoff: f32,
    lattice: Lattice,
    walk_order: WalkOrder,
}

/// A property-driven isosurface session: read data, generate, color, then query the JVXL
/// encoding. One surface is held at a time; reading new data replaces it.
#[derive(Debug)]
pub struct SurfaceGenerator<'a> {
    config: SurfaceConfig,
    reporter: ProgressReporter<'a>,
    state: GeneratorState,
    data: Option<LoadedData>,
    surface_index: usize,
    titles: Vec<String>,
    surface: Option<Surface>,
    coloring: Option<ColorMapping>,
    contours: Option<ContourSet>,
    plane_grid: Option<PlaneGrid>,
}

impl<'a> SurfaceGenerator<'a> {
    pub fn new(config: SurfaceConfig) -> Self {
        Self::with_reporter(config, ProgressReporter::new())
    }

    pub fn with_reporter(config: SurfaceConfig, reporter: ProgressReporter<'a>) -> Self {
        Self {
            config,
            reporter,
            state: GeneratorState::Empty,
            data: None,
            surface_index: 0,
            titles: Vec::new(),
            surface: None,
            coloring: None,
            contours: None,
            plane_grid: None,
        }
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.surface.as_ref().map(|s| &s.march.mesh)
    }

    pub fn coloring(&self) -> Option<&ColorMapping> {
        self.coloring.as_ref()
    }

    pub fn contours(&self) -> Option<&ContourSet> {
        self.contours.as_ref()
    }

    pub fn plane_grid(&self) -> Option<&PlaneGrid> {
        self.plane_grid.as_ref()
    }

    /// Reads `input` and builds its surface in one step.
    pub fn generate_from(&mut self, input: VolumeInput) -> Result<&Mesh, SurfaceError> {
        self.set_property(SurfaceProperty::ReadData(input))?;
        self.set_property(SurfaceProperty::Generate)?;
        self.mesh().ok_or(SurfaceError::InvalidState {
            operation: "generate",
            state: self.state.name(),
        })
    }

    #[instrument(skip_all, name = "surface_property")]
    pub fn set_property(&mut self, property: SurfaceProperty) -> Result<(), SurfaceError> {
        match property {
            SurfaceProperty::Init => self.reset(),
            SurfaceProperty::Config(config) => self.config = config,
            SurfaceProperty::Cutoff(cutoff) => {
                if !cutoff.is_finite() {
                    return Err(ConfigError::Invalid {
                        parameter: "cutoff",
                        reason: format!("{cutoff} is not a finite number"),
                    }
                    .into());
                }
                self.config.cutoff = cutoff;
            }
            SurfaceProperty::Absolute(absolute) => self.config.is_absolute = absolute,
            SurfaceProperty::Plane(plane) => self.config.plane = plane,
            SurfaceProperty::ColorMode(mode) => self.config.color_mode = mode,
            SurfaceProperty::ColorRange(range) => self.config.color_range = range,
            SurfaceProperty::Contours(count) => {
                if count == Some(0) {
                    return Err(ConfigError::Invalid {
                        parameter: "contours",
                        reason: "at least one contour level is required".to_string(),
                    }
                    .into());
                }
                self.config.contour_count = count;
            }
            SurfaceProperty::SurfaceIndex(index) => self.surface_index = index,
            SurfaceProperty::Title(title) => self.titles.push(title),
            SurfaceProperty::ReadData(input) => self.read_data(input)?,
            SurfaceProperty::Generate => self.generate()?,
            SurfaceProperty::MapColor(input) => self.map_color(input)?,
        }
        Ok(())
    }

    /// Answers `jvxlFileData`, `jvxlFileInfo` or `jvxlSurfaceData` for the current surface.
    pub fn get_property(&self, name: &str) -> Result<String, SurfaceError> {
        let query = QUERIES
            .get(name)
            .copied()
            .ok_or_else(|| SurfaceError::UnknownProperty(name.to_string()))?;
        let document = self.document()?;
        Ok(match query {
            Query::FileData => document.to_text(),
            Query::FileInfo => document.file_info(),
            Query::SurfaceData => document.surface_data(0)?,
        })
    }

    fn reset(&mut self) {
        self.state = GeneratorState::Empty;
        self.data = None;
        self.titles.clear();
        self.clear_surface();
    }

    fn clear_surface(&mut self) {
        self.surface = None;
        self.coloring = None;
        self.contours = None;
        self.plane_grid = None;
    }

    fn require_surface(&self, operation: &'static str) -> Result<(), SurfaceError> {
        match self.state {
            GeneratorState::SurfaceReady | GeneratorState::ColorMapped => Ok(()),
            state => Err(SurfaceError::InvalidState {
                operation,
                state: state.name(),
            }),
        }
    }

    fn load(input: VolumeInput) -> Result<LoadedData, SurfaceError> {
        let text = match input {
            VolumeInput::Volume(volume) => {
                return Ok(LoadedData::Volume {
                    titles: Vec::new(),
                    volume,
                });
            }
            VolumeInput::Path(path) => {
                debug!("Reading volumetric data from {}", path.display());
                std::fs::read_to_string(&path)?
            }
            VolumeInput::Text(text) => text,
        };
        let format = VolumeFormat::sniff(&text);
        debug!("Input sniffed as {}", format);
        Ok(match format {
            VolumeFormat::Cube => {
                let (header, volume) = CubeReader::from_text(&text).read_all()?;
                LoadedData::Volume {
                    titles: header.titles,
                    volume,
                }
            }
            VolumeFormat::Apbs => {
                let (header, volume) = ApbsReader::from_text(&text).read_all()?;
                LoadedData::Volume {
                    titles: header.titles,
                    volume,
                }
            }
            VolumeFormat::Jvxl => {
                let (_, document) = JvxlReader::from_text(&text).read_all()?;
                LoadedData::Jvxl(document)
            }
        })
    }

    fn read_data(&mut self, input: VolumeInput) -> Result<(), SurfaceError> {
        let data = self.reporter.phase("Reading data", || Self::load(input))?;
        self.clear_surface();
        if let LoadedData::Volume { volume, .. } = &data {
            info!(
                "Read {}x{}x{} voxel grid",
                volume.counts()[0],
                volume.counts()[1],
                volume.counts()[2]
            );
        }
        self.data = Some(data);
        self.state = GeneratorState::DataRead;
        Ok(())
    }

    fn generate(&mut self) -> Result<(), SurfaceError> {
        let Some(data) = self.data.take() else {
            return Err(SurfaceError::InvalidState {
                operation: "generate a surface",
                state: self.state.name(),
            });
        };
        self.clear_surface();
        let result = match &data {
            LoadedData::Volume { volume, .. } => self.generate_from_volume(volume),
            LoadedData::Jvxl(document) => self.decode_document(document),
        };
        self.data = Some(data);
        result?;

        if let Some(surface) = &self.surface {
            let stats = surface.march.mesh.stats();
            info!(
                "Surface has {} vertices and {} triangles",
                stats.vertex_count, stats.triangle_count
            );
        }
        Ok(())
    }

    /// Runs `work` as a task with one step per x-slab of lattice cells.
    fn slab_task<T>(&self, counts: [usize; 3], work: impl FnOnce(&dyn Fn()) -> T) -> T {
        self.reporter.report(Progress::TaskStart {
            total_steps: counts[0].saturating_sub(1) as u64,
        });
        let result = work(&|| self.reporter.report(Progress::TaskIncrement));
        self.reporter.report(Progress::TaskFinish);
        result
    }

    fn march(&self, volume: &VolumeData) -> MarchResult {
        let cubes = MarchingCubes::new(
            self.config.cutoff,
            self.config.is_absolute,
            self.config.walk_order,
        );
        self.slab_task(volume.counts(), |tick| {
            cubes.march_volume_observed(volume, tick)
        })
    }

    fn generate_from_volume(&mut self, volume: &VolumeData) -> Result<(), SurfaceError> {
        if volume.is_empty() {
            warn!("Voxel grid has an empty axis; no surface generated");
        }
        if let Some(plane) = self.config.plane {
            return self.generate_plane(volume, plane);
        }

        let march = self.reporter.phase("Marching cubes", || self.march(volume));
        let kind = if self.config.is_absolute {
            SurfaceKind::Bicolor
        } else if self.config.contour_count.is_some() {
            SurfaceKind::Contoured
        } else {
            SurfaceKind::Plain
        };
        self.surface = Some(Surface {
            march,
            kind,
            cutoff: self.config.cutoff,
            lattice: volume.lattice(),
            walk_order: self.config.walk_order,
        });
        self.state = GeneratorState::SurfaceReady;

        if self.config.is_absolute || self.config.color_mode != ColorMode::Value {
            self.apply_coloring(None, None);
        }
        Ok(())
    }

    /// A slice through the grid, colored by the data it cuts.
    fn generate_plane(&mut self, volume: &VolumeData, plane: Plane) -> Result<(), SurfaceError> {
        let field = volume.with_plane(plane);
        let march = self.reporter.phase("Slicing plane", || {
            MarchingCubes::new(0.0, false, self.config.walk_order).march_volume(&field)
        });
        let contourable = self.config.contour_count.is_some();
        self.surface = Some(Surface {
            march,
            kind: SurfaceKind::Plane { plane, contourable },
            cutoff: 0.0,
            lattice: volume.lattice(),
            walk_order: self.config.walk_order,
        });
        self.state = GeneratorState::SurfaceReady;

        if let Some(count) = self.config.contour_count {
            let squares = MarchingSquares::new(count, PLANE_GRID_RESOLUTION);
            if let Some((grid, contours)) = squares.contour_plane(volume, volume, Some(&plane)) {
                self.contours = Some(contours);
                self.plane_grid = Some(grid);
            }
        }
        let mapped = self.mapped_values(|point| volume.interpolated_value_at(point));
        self.apply_coloring(Some(mapped), None);
        Ok(())
    }

    fn decode_document(&mut self, document: &JvxlDocument) -> Result<(), SurfaceError> {
        let encoded = document.surface(self.surface_index)?;
        let definition = &encoded.definition;
        let header = &document.header;
        let walk_order = encoded.walk_order;
        if walk_order != self.config.walk_order {
            debug!("Decoding with the file's {:?} lattice walk", walk_order);
        }
        let lattice = Lattice {
            origin: header.origin,
            vectors: header.vectors,
            counts: header.counts,
        };

        let (mut march, kind) = match definition.plane {
            Some(plane) if definition.is_plane() => {
                let field = VolumeData::plane_field(
                    lattice.origin,
                    lattice.vectors,
                    lattice.counts,
                    plane,
                );
                let march = MarchingCubes::new(0.0, false, walk_order).march_volume(&field);
                let contourable = definition.param2 == -2;
                (march, SurfaceKind::Plane { plane, contourable })
            }
            _ => {
                let cubes =
                    MarchingCubes::new(definition.cutoff, definition.is_bicolor(), walk_order);
                let march = self.reporter.phase("Decoding surface", || {
                    self.slab_task(lattice.counts, |tick| {
                        cubes.decode_observed(&lattice, encoded, &document.edge_encoding, tick)
                    })
                })?;
                let kind = if definition.is_bicolor() {
                    SurfaceKind::Bicolor
                } else if definition.is_contoured() {
                    SurfaceKind::Contoured
                } else {
                    SurfaceKind::Plain
                };
                (march, kind)
            }
        };

        let colors = if definition.is_color_mapped() {
            let values =
                encoded.color_values(&document.color_encoding, march.mesh.vertex_count())?;
            march.mesh.set_values(values.clone());
            if definition.is_bicolor() {
                let dropped = march.mesh.retain_sign_consistent();
                debug!("Sign filter dropped {} decoded triangles", dropped);
            }
            Some((values, (definition.value_red, definition.value_blue)))
        } else {
            None
        };

        self.surface = Some(Surface {
            march,
            kind,
            cutoff: definition.cutoff,
            lattice,
            walk_order,
        });
        self.state = GeneratorState::SurfaceReady;

        if let Some((values, range)) = colors {
            let mode = if definition.is_bicolor() {
                ColorMode::Sign
            } else {
                ColorMode::Value
            };
            self.apply_decoded_coloring(values, range, mode);
        }
        Ok(())
    }

    fn mapped_values(&self, sample: impl Fn(&nalgebra::Point3<f64>) -> f32) -> Vec<f32> {
        self.mesh()
            .map(|mesh| mesh.vertices().iter().map(sample).collect())
            .unwrap_or_default()
    }

    fn colorer(&self, mode: ColorMode, range: Option<(f32, f32)>) -> MeshColorer {
        let bands = if self.config.color_contours {
            self.config.contour_count
        } else {
            None
        };
        let phase_center = self
            .surface
            .as_ref()
            .map(|s| {
                let far = s.lattice.point_at(
                    s.lattice.counts[0].saturating_sub(1),
                    s.lattice.counts[1].saturating_sub(1),
                    s.lattice.counts[2].saturating_sub(1),
                );
                nalgebra::center(&s.lattice.origin, &far)
            })
            .unwrap_or_else(nalgebra::Point3::origin);
        MeshColorer {
            mode,
            range,
            palette_size: self.config.palette_size,
            bands,
            phase_center,
        }
    }

    /// Colors the surface. Absolute surfaces are always colored by the sign of their own data;
    /// a reader's sign filter runs on exactly that map.
    fn apply_coloring(&mut self, mapped: Option<Vec<f32>>, range: Option<(f32, f32)>) {
        let mut mode = self.config.color_mode;
        let mut mapped = mapped;
        let absolute = self
            .surface
            .as_ref()
            .is_some_and(|s| s.kind == SurfaceKind::Bicolor);
        if absolute && (mode != ColorMode::Sign || mapped.is_some()) {
            if mode != ColorMode::Value || mapped.is_some() {
                warn!("Absolute surfaces are colored by data sign; {} coloring ignored", mode);
            }
            mode = ColorMode::Sign;
            mapped = None;
        }
        let colorer = self.colorer(mode, range.or(self.config.color_range));
        let mapped = match (&self.plane_grid, self.config.color_contours) {
            (Some(grid), true) => Some(self.mapped_values(|p| grid.interpolated_pixel_value(p))),
            _ => mapped,
        };
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let mapping = colorer.apply(&mut surface.march.mesh, mapped);
        self.coloring = Some(mapping);
        self.state = GeneratorState::ColorMapped;
        self.contour_surface();
    }

    fn apply_decoded_coloring(&mut self, values: Vec<f32>, range: (f32, f32), mode: ColorMode) {
        let colorer = self.colorer(ColorMode::Value, Some(range));
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let mut mapping = colorer.apply(&mut surface.march.mesh, Some(values));
        mapping.bicolor = mode == ColorMode::Sign;
        self.coloring = Some(mapping);
        self.state = GeneratorState::ColorMapped;
    }

    /// Contour lines over the colored values of a volumetric surface.
    fn contour_surface(&mut self) {
        let (Some(count), Some(surface)) = (self.config.contour_count, &self.surface) else {
            return;
        };
        if matches!(surface.kind, SurfaceKind::Plane { .. }) {
            return;
        }
        self.contours = MarchingSquares::new(count, PLANE_GRID_RESOLUTION)
            .contour_mesh(&surface.march.mesh);
    }

    fn map_color(&mut self, input: Option<VolumeInput>) -> Result<(), SurfaceError> {
        self.require_surface("map colors")?;
        let Some(input) = input else {
            self.apply_coloring(None, None);
            return Ok(());
        };

        match self.reporter.phase("Reading color data", || Self::load(input))? {
            LoadedData::Volume { volume, .. } => {
                let mapped = self.mapped_values(|point| volume.interpolated_value_at(point));
                self.apply_coloring(Some(mapped), None);
            }
            LoadedData::Jvxl(document) => {
                let encoded = document.surface(self.surface_index)?;
                if !encoded.definition.is_color_mapped() {
                    error!("JVXL color source has no color data to map; surface left unchanged");
                    return Ok(());
                }
                let vertex_count = self.mesh().map_or(0, Mesh::vertex_count);
                let values = encoded.color_values(&document.color_encoding, vertex_count)?;
                let range = (encoded.definition.value_red, encoded.definition.value_blue);
                self.apply_coloring(Some(values), Some(range));
            }
        }
        Ok(())
    }

    fn header(&self) -> Option<VolumeHeader> {
        let surface = self.surface.as_ref()?;
        let lattice = &surface.lattice;
        let titles = if self.titles.is_empty() {
            match &self.data {
                Some(LoadedData::Volume { titles, .. }) => titles.clone(),
                Some(LoadedData::Jvxl(document)) => document.header.titles.clone(),
                None => Vec::new(),
            }
        } else {
            self.titles.clone()
        };
        Some(VolumeHeader {
            titles,
            atom_count: -2,
            origin: lattice.origin,
            vectors: lattice.vectors,
            counts: lattice.counts,
            units: LengthUnit::Angstrom,
        })
    }

    fn info_line(mesh: &Mesh) -> String {
        format!(
            "molsurf: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        )
    }

    /// The JVXL encoding of the current surface.
    pub fn document(&self) -> Result<JvxlDocument, SurfaceError> {
        self.require_surface("encode the surface")?;
        let (Some(surface), Some(header)) = (self.surface.as_ref(), self.header()) else {
            return Err(SurfaceError::InvalidState {
                operation: "encode the surface",
                state: self.state.name(),
            });
        };
        let fractions = self.coloring.as_ref().map(ColorMapping::fractions);
        let colors = match (&self.coloring, &fractions) {
            (Some(mapping), Some(fractions)) => Some(ColorChannel {
                fractions,
                precision: self.config.precision_color,
                range: mapping.range,
            }),
            _ => None,
        };
        let encoder = SurfaceEncoder {
            kind: surface.kind,
            cutoff: surface.cutoff,
            run_lengths: &surface.march.run_lengths,
            edge_fractions: &surface.march.edge_fractions,
            colors,
            walk_order: surface.walk_order,
            info: Self::info_line(&surface.march.mesh),
        };
        let encoded = self.reporter.phase("Encoding JVXL", || {
            encoder.encode(&self.config.edge_encoding, &self.config.color_encoding)
        });
        let mut document = JvxlDocument::new(
            header,
            self.config.edge_encoding,
            self.config.color_encoding,
        );
        document.surfaces.push(encoded);
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::coloring::{BICOLOR_VALUE, Phase};
    use crate::engine::config::SurfaceConfigBuilder;
    use nalgebra::{Point3, Vector3};

    fn grid(counts: [usize; 3], f: impl Fn(usize, usize, usize) -> f32) -> VolumeData {
        let mut values = Vec::new();
        for i in 0..counts[0] {
            for j in 0..counts[1] {
                for k in 0..counts[2] {
                    values.push(f(i, j, k));
                }
            }
        }
        VolumeData::new(
            Point3::origin(),
            [Vector3::x(), Vector3::y(), Vector3::z()],
            counts,
            values,
        )
        .unwrap()
    }

    fn spike() -> VolumeData {
        grid([3, 3, 3], |i, j, k| {
            if (i, j, k) == (1, 1, 1) { 10.0 } else { 0.0 }
        })
    }

    fn config(cutoff: f32) -> SurfaceConfig {
        SurfaceConfigBuilder::new().cutoff(cutoff).build().unwrap()
    }

    #[test]
    fn generates_closed_surface_around_spike() {
        let mut generator = SurfaceGenerator::new(config(5.0));
        let mesh = generator.generate_from(VolumeInput::Volume(spike())).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.triangle_count(), 8);
        assert_eq!(generator.state(), GeneratorState::SurfaceReady);
    }

    #[test]
    fn queries_require_a_surface() {
        let generator = SurfaceGenerator::new(config(5.0));
        assert!(matches!(
            generator.get_property("jvxlFileData"),
            Err(SurfaceError::InvalidState { .. })
        ));
        assert!(matches!(
            generator.get_property("volumeData"),
            Err(SurfaceError::UnknownProperty(_))
        ));
    }

    #[test]
    fn map_color_before_generate_is_rejected() {
        let mut generator = SurfaceGenerator::new(config(5.0));
        generator
            .set_property(SurfaceProperty::ReadData(VolumeInput::Volume(spike())))
            .unwrap();
        assert_eq!(generator.state(), GeneratorState::DataRead);
        let result = generator.set_property(SurfaceProperty::MapColor(None));
        assert!(matches!(result, Err(SurfaceError::InvalidState { .. })));
    }

    #[test]
    fn jvxl_output_decodes_to_same_mesh() {
        let mut generator = SurfaceGenerator::new(config(5.0));
        generator.generate_from(VolumeInput::Volume(spike())).unwrap();
        let text = generator.get_property("jvxlFileData").unwrap();
        assert!(text.starts_with("#JVXL"));

        let mut decoder = SurfaceGenerator::new(SurfaceConfig::default());
        let decoded = decoder.generate_from(VolumeInput::Text(text)).unwrap();
        let original = generator.mesh().unwrap();
        assert_eq!(decoded.vertex_count(), original.vertex_count());
        assert_eq!(decoded.triangle_count(), original.triangle_count());
        for (a, b) in decoded.vertices().iter().zip(original.vertices()) {
            assert!((a - b).norm() < 1.0 / 90.0);
        }
    }

    #[test]
    fn absolute_surface_round_trips_as_bicolor() {
        let data = grid([5, 5, 5], |i, _, _| i as f32 - 2.0);
        let config = SurfaceConfigBuilder::new()
            .cutoff(0.5)
            .absolute(true)
            .build()
            .unwrap();
        let mut generator = SurfaceGenerator::new(config);
        generator.generate_from(VolumeInput::Volume(data)).unwrap();
        assert_eq!(generator.state(), GeneratorState::ColorMapped);
        let coloring = generator.coloring().unwrap();
        assert!(coloring.bicolor);
        assert!(coloring.values.iter().all(|v| v.abs() == BICOLOR_VALUE));

        let document = generator.document().unwrap();
        assert!(document.surfaces[0].definition.is_bicolor());

        let mut decoder = SurfaceGenerator::new(SurfaceConfig::default());
        let decoded = decoder
            .generate_from(VolumeInput::Text(document.to_text()))
            .unwrap();
        let original = generator.mesh().unwrap();
        assert_eq!(decoded.vertex_count(), original.vertex_count());
        assert_eq!(decoded.triangle_count(), original.triangle_count());
        assert!(decoder.coloring().unwrap().bicolor);
    }

    #[test]
    fn marching_reports_a_step_per_slab() {
        use std::sync::{Arc, Mutex};
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            sink.lock().unwrap().push(event);
        }));
        let mut generator = SurfaceGenerator::with_reporter(config(5.0), reporter);
        generator.generate_from(VolumeInput::Volume(spike())).unwrap();

        let events = events.lock().unwrap();
        let steps = events
            .iter()
            .filter(|e| matches!(e, Progress::TaskIncrement))
            .count();
        assert_eq!(steps, 2);
        assert!(events.iter().any(|e| matches!(e, Progress::TaskStart { total_steps: 2 })));
    }

    #[test]
    fn phase_colored_surface_is_not_written_as_bicolor() {
        let config = SurfaceConfigBuilder::new()
            .cutoff(5.0)
            .color_mode(ColorMode::Phase(Phase::X))
            .build()
            .unwrap();
        let mut generator = SurfaceGenerator::new(config);
        generator.generate_from(VolumeInput::Volume(spike())).unwrap();
        assert!(generator.coloring().unwrap().bicolor);

        let document = generator.document().unwrap();
        assert!(!document.surfaces[0].definition.is_bicolor());
        let mut decoder = SurfaceGenerator::new(SurfaceConfig::default());
        let decoded = decoder
            .generate_from(VolumeInput::Text(document.to_text()))
            .unwrap();
        assert_eq!(decoded.triangle_count(), 8);
    }

    #[test]
    fn absolute_surface_keeps_sign_coloring_when_mapped() {
        let data = grid([5, 5, 5], |i, _, _| i as f32 - 2.0);
        let config = SurfaceConfigBuilder::new()
            .cutoff(0.5)
            .absolute(true)
            .build()
            .unwrap();
        let mut generator = SurfaceGenerator::new(config);
        generator.generate_from(VolumeInput::Volume(data)).unwrap();
        let ramp = grid([5, 5, 5], |_, j, _| j as f32 * 10.0);
        generator
            .set_property(SurfaceProperty::MapColor(Some(VolumeInput::Volume(ramp))))
            .unwrap();
        let coloring = generator.coloring().unwrap();
        assert!(coloring.bicolor);
        assert_eq!(coloring.range, (-1.0, 1.0));
        assert!(generator.document().unwrap().surfaces[0].definition.is_bicolor());
    }

    #[test]
    fn maps_color_from_second_volume() {
        let mut generator = SurfaceGenerator::new(config(5.0));
        generator.generate_from(VolumeInput::Volume(spike())).unwrap();
        let ramp = grid([3, 3, 3], |i, _, _| i as f32);
        generator
            .set_property(SurfaceProperty::MapColor(Some(VolumeInput::Volume(ramp))))
            .unwrap();
        assert_eq!(generator.state(), GeneratorState::ColorMapped);
        let mesh = generator.mesh().unwrap();
        let (min, max) = mesh.value_range().unwrap();
        assert!((min - 0.5).abs() < 1e-5);
        assert!((max - 1.5).abs() < 1e-5);
        assert_eq!(mesh.color_indices().unwrap().len(), 6);

        let document = generator.document().unwrap();
        let definition = &document.surfaces[0].definition;
        assert!(definition.is_color_mapped());
        assert_eq!((definition.value_red, definition.value_blue), (0.5, 1.5));
    }

    #[test]
    fn colorless_jvxl_color_source_is_ignored() {
        let mut generator = SurfaceGenerator::new(config(5.0));
        generator.generate_from(VolumeInput::Volume(spike())).unwrap();
        let text = generator.get_property("jvxlFileData").unwrap();
        generator
            .set_property(SurfaceProperty::MapColor(Some(VolumeInput::Text(text))))
            .unwrap();
        assert_eq!(generator.state(), GeneratorState::SurfaceReady);
        assert!(generator.coloring().is_none());
    }

    #[test]
    fn contoured_plane_is_colored_by_the_data_it_cuts() {
        let ramp = grid([5, 5, 5], |i, _, _| i as f32);
        let plane = Plane::new(&Point3::new(0.0, 0.0, 2.5), &Vector3::z()).unwrap();
        let config = SurfaceConfigBuilder::new()
            .plane(plane)
            .contours(3)
            .build()
            .unwrap();
        let mut generator = SurfaceGenerator::new(config);
        generator.generate_from(VolumeInput::Volume(ramp)).unwrap();
        assert_eq!(generator.state(), GeneratorState::ColorMapped);
        assert!(!generator.contours().unwrap().is_empty());
        assert!(generator.plane_grid().is_some());

        let document = generator.document().unwrap();
        let definition = &document.surfaces[0].definition;
        assert_eq!((definition.param1, definition.param2), (-1, -2));
        assert!(definition.is_precision_color());

        let mut decoder = SurfaceGenerator::new(SurfaceConfig::default());
        let decoded = decoder
            .generate_from(VolumeInput::Text(document.to_text()))
            .unwrap();
        assert_eq!(
            decoded.vertex_count(),
            generator.mesh().unwrap().vertex_count()
        );
        assert_eq!(decoder.state(), GeneratorState::ColorMapped);
    }

    #[test]
    fn reads_cube_text() {
        let cube = "\
spike
cube
    0    0.000000    0.000000    0.000000 ANGSTROMS
    3    1.000000    0.000000    0.000000
    3    0.000000    1.000000    0.000000
    3    0.000000    0.000000    1.000000
 0 0 0 0 0 0 0 0 0
 0 0 0 0 10 0 0 0 0
 0 0 0 0 0 0 0 0 0
";
        let mut generator = SurfaceGenerator::new(config(5.0));
        let mesh = generator
            .generate_from(VolumeInput::Text(cube.to_string()))
            .unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        let info = generator.get_property("jvxlFileInfo").unwrap();
        assert!(info.lines().nth(1).unwrap().contains("spike"));
    }

    #[test]
    fn init_discards_the_surface() {
        let mut generator = SurfaceGenerator::new(config(5.0));
        generator.generate_from(VolumeInput::Volume(spike())).unwrap();
        generator.set_property(SurfaceProperty::Init).unwrap();
        assert_eq!(generator.state(), GeneratorState::Empty);
        assert!(generator.mesh().is_none());
    }
}
