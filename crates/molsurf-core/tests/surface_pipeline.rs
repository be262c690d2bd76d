mod common;

use molsurf::core::io::traits::VolumetricSource;
use molsurf::core::jvxl::error::JvxlError;
use molsurf::core::jvxl::reader::JvxlReader;
use molsurf::core::models::volume::Lattice;
use molsurf::engine::coloring::{ColorMode, Phase};
use molsurf::engine::config::{SurfaceConfig, SurfaceConfigBuilder, WalkOrder};
use molsurf::engine::error::SurfaceError;
use molsurf::engine::marching_cubes::MarchingCubes;
use molsurf::engine::surface_sets::label_surface_sets;
use molsurf::workflows::surface::{GeneratorState, SurfaceGenerator, SurfaceProperty, VolumeInput};
use std::collections::HashSet;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn sphere_survives_jvxl_text_round_trip() {
    let volume = common::gaussian_sphere(10);
    let config = SurfaceConfigBuilder::new().cutoff(0.5).build().unwrap();
    let mut generator = SurfaceGenerator::new(config);
    generator
        .generate_from(VolumeInput::Volume(volume.clone()))
        .unwrap();
    let text = generator.get_property("jvxlFileData").unwrap();

    let (header, document) = JvxlReader::from_text(&text).read_all().unwrap();
    let lattice = Lattice {
        origin: header.origin,
        vectors: header.vectors,
        counts: header.counts,
    };
    let decoder = MarchingCubes::new(0.5, false, WalkOrder::Ascending);
    let decoded = decoder
        .decode(&lattice, document.surface(0).unwrap(), &document.edge_encoding)
        .unwrap();

    let original = generator.mesh().unwrap();
    assert_eq!(decoded.mesh.vertex_count(), original.vertex_count());
    assert_eq!(decoded.mesh.triangle_count(), original.triangle_count());
    for (a, b) in decoded.mesh.vertices().iter().zip(original.vertices()) {
        assert!((a - b).norm() <= 1.0 / 90.0 + 1e-6, "{a} vs {b}");
    }
}

#[test]
fn one_vertex_per_crossing_edge() {
    let volume = common::gaussian_sphere(9);
    let result = MarchingCubes::new(0.5, false, WalkOrder::Ascending).march_volume(&volume);
    assert_eq!(result.mesh.vertex_count(), result.edge_fractions.len());

    let distinct: HashSet<_> = result
        .mesh
        .vertices()
        .iter()
        .map(|p| {
            (
                (p.x * 1e4).round() as i64,
                (p.y * 1e4).round() as i64,
                (p.z * 1e4).round() as i64,
            )
        })
        .collect();
    assert_eq!(distinct.len(), result.mesh.vertex_count());
}

fn sphere_jvxl(cutoff: f32) -> String {
    let config = SurfaceConfigBuilder::new().cutoff(cutoff).build().unwrap();
    let mut generator = SurfaceGenerator::new(config);
    generator
        .generate_from(VolumeInput::Volume(common::gaussian_sphere(10)))
        .unwrap();
    generator.get_property("jvxlFileData").unwrap()
}

fn centroid_x(mesh: &molsurf::core::models::mesh::Mesh) -> f64 {
    mesh.vertices().iter().map(|p| p.x).sum::<f64>() / mesh.vertex_count() as f64
}

#[test]
fn descending_walk_decodes_with_default_config() {
    let volume = common::grid([8, 8, 8], |x, y, z| {
        let r2 = (x - 2.0).powi(2) + (y - 3.5).powi(2) + (z - 3.5).powi(2);
        (-r2 / 4.0).exp() as f32
    });
    let config = SurfaceConfig {
        cutoff: 0.4,
        walk_order: WalkOrder::Descending,
        ..Default::default()
    };
    let mut generator = SurfaceGenerator::new(config);
    generator.generate_from(VolumeInput::Volume(volume)).unwrap();
    let text = generator.get_property("jvxlFileData").unwrap();
    assert!(text.contains("# walk=descending"));

    let mut decoder = SurfaceGenerator::new(SurfaceConfig::default());
    let decoded = decoder.generate_from(VolumeInput::Text(text)).unwrap();
    let original = generator.mesh().unwrap();
    assert_eq!(decoded.vertex_count(), original.vertex_count());
    assert_eq!(decoded.triangles(), original.triangles());
    assert!((centroid_x(decoded) - centroid_x(original)).abs() < 1e-2);
    for (a, b) in decoded.vertices().iter().zip(original.vertices()) {
        assert!((a - b).norm() <= 1.0 / 90.0 + 1e-6, "{a} vs {b}");
    }

    let reencoded = decoder.get_property("jvxlSurfaceData").unwrap();
    assert!(reencoded.contains("# walk=descending"));
}

#[test]
fn sign_and_phase_colored_surfaces_keep_every_triangle() {
    for mode in [ColorMode::Sign, ColorMode::Phase(Phase::X)] {
        let config = SurfaceConfigBuilder::new()
            .cutoff(0.5)
            .color_mode(mode)
            .build()
            .unwrap();
        let mut generator = SurfaceGenerator::new(config);
        generator
            .generate_from(VolumeInput::Volume(common::gaussian_sphere(10)))
            .unwrap();
        let document = generator.document().unwrap();
        let definition = &document.surfaces[0].definition;
        assert!(definition.is_color_mapped());
        assert!(!definition.is_bicolor(), "{mode} surface written as bicolor");

        let mut decoder = SurfaceGenerator::new(SurfaceConfig::default());
        let decoded = decoder
            .generate_from(VolumeInput::Text(document.to_text()))
            .unwrap();
        let original = generator.mesh().unwrap();
        assert_eq!(decoded.triangle_count(), original.triangle_count(), "{mode}");
        assert_eq!(decoded.vertex_count(), original.vertex_count(), "{mode}");
    }
}

/// Rewrites integer parameter `index` (1-based, after the cutoff) of the first definition line.
fn with_definition_param(text: &str, index: usize, value: &str) -> String {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let mut tokens: Vec<&str> = lines[10].split_whitespace().collect();
    tokens[index] = value;
    lines[10] = tokens.join(" ");
    lines.join("\n") + "\n"
}

#[test]
fn definition_counts_must_agree_with_surface_data() {
    let text = sphere_jvxl(0.5);
    assert!(JvxlReader::from_text(&text).read_all().is_ok());

    let runs = with_definition_param(&text, 1, "999");
    assert!(matches!(
        JvxlReader::from_text(&runs).read_all(),
        Err(JvxlError::RunCountMismatch { expected: 999, .. })
    ));

    let edges = with_definition_param(&text, 2, "12345");
    assert!(matches!(
        JvxlReader::from_text(&edges).read_all(),
        Err(JvxlError::EdgeCountMismatch {
            expected: 12345,
            ..
        })
    ));

    let mut decoder = SurfaceGenerator::new(SurfaceConfig::default());
    assert!(matches!(
        decoder.set_property(SurfaceProperty::ReadData(VolumeInput::Text(edges))),
        Err(SurfaceError::Jvxl {
            source: JvxlError::EdgeCountMismatch { .. }
        })
    ));
}

#[test]
fn absolute_orbital_has_no_mixed_sign_triangles() {
    let volume = common::p_orbital(12);
    let result = MarchingCubes::new(0.1, true, WalkOrder::Ascending).march_volume(&volume);
    let mesh = &result.mesh;
    assert!(mesh.triangle_count() > 0);
    assert!(mesh.values().iter().any(|v| *v > 0.0));
    assert!(mesh.values().iter().any(|v| *v < 0.0));
    for triangle in mesh.triangles() {
        let signs: Vec<f32> = triangle
            .vertices
            .iter()
            .map(|&v| mesh.values()[v as usize])
            .collect();
        let positive = signs.iter().any(|v| *v > 0.0);
        let negative = signs.iter().any(|v| *v < 0.0);
        assert!(!(positive && negative));
    }
}

#[test]
fn spike_surface_is_closed_and_connected() {
    let result = MarchingCubes::new(5.0, false, WalkOrder::Ascending).march_volume(&common::spike());
    let mut mesh = result.mesh;
    assert_eq!(mesh.boundary_edge_count(), 0);
    assert_eq!(mesh.triangle_count() % 2, 0);

    let summary = label_surface_sets(&mut mesh);
    assert_eq!(summary.set_count, 1);
    assert!(!summary.coalesced);
    assert!(mesh.vertex_sets().unwrap().iter().all(|&id| id == 0));

    let stats = mesh.stats();
    assert_eq!(stats.boundary_edges, 0);
    assert!(stats.area > 0.0);
}

#[test]
fn empty_lattice_yields_empty_surface() {
    let volume = common::grid([1, 1, 1], |_, _, _| 1.0);
    let mut generator = SurfaceGenerator::new(SurfaceConfig::default());
    let mesh = generator.generate_from(VolumeInput::Volume(volume)).unwrap();
    assert!(mesh.is_empty());
    assert_eq!(generator.state(), GeneratorState::SurfaceReady);
}

#[test]
fn reads_cube_file_from_disk() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "title\nsecond\n    0 0.0 0.0 0.0 ANGSTROMS\n    3 1.0 0.0 0.0\n    3 0.0 1.0 0.0\n    3 0.0 0.0 1.0\n"
    )
    .unwrap();
    for index in 0..27 {
        write!(file, "{} ", if index == 13 { 10.0 } else { 0.0 }).unwrap();
    }
    writeln!(file).unwrap();

    let config = SurfaceConfigBuilder::new().cutoff(5.0).build().unwrap();
    let mut generator = SurfaceGenerator::new(config);
    generator
        .set_property(SurfaceProperty::ReadData(VolumeInput::Path(
            file.path().to_path_buf(),
        )))
        .unwrap();
    generator.set_property(SurfaceProperty::Generate).unwrap();
    assert_eq!(generator.mesh().unwrap().vertex_count(), 6);
}
