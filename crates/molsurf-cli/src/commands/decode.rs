use crate::cli::DecodeArgs;
use crate::error::{CliError, Result};
use molsurf::{
    engine::{
        config::SurfaceConfig,
        surface_sets::label_surface_sets,
    },
    workflows::surface::{SurfaceGenerator, SurfaceProperty, VolumeInput},
};
use std::fmt::Write;
use tracing::info;

pub fn run(args: DecodeArgs) -> Result<()> {
    print!("{}", summarize(&args)?);
    Ok(())
}

/// Decodes the requested surface and renders a plain-text report of it.
pub fn summarize(args: &DecodeArgs) -> Result<String> {
    // run lengths and edges are replayed in the walk order the file records
    let mut generator = SurfaceGenerator::new(SurfaceConfig::default());
    generator.set_property(SurfaceProperty::SurfaceIndex(args.surface))?;

    info!("Decoding surface {} of {:?}", args.surface, &args.input);
    generator
        .set_property(SurfaceProperty::ReadData(VolumeInput::Path(
            args.input.clone(),
        )))
        .map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;
    generator.set_property(SurfaceProperty::Generate)?;

    let mut report = String::new();
    let info = generator.get_property("jvxlFileInfo")?;
    for title in info.lines().skip(1).take(2).filter(|l| !l.is_empty()) {
        let _ = writeln!(report, "Title:          {}", title);
    }

    let mesh = generator.mesh().ok_or_else(|| {
        CliError::Other(anyhow::anyhow!("decoder produced no surface"))
    })?;
    let stats = mesh.stats();
    let _ = writeln!(report, "Vertices:       {}", stats.vertex_count);
    let _ = writeln!(report, "Triangles:      {}", stats.triangle_count);
    let _ = writeln!(report, "Area:           {:.4}", stats.area);
    let _ = writeln!(report, "Boundary edges: {}", stats.boundary_edges);

    if let Some(coloring) = generator.coloring() {
        let (red, blue) = coloring.range;
        let _ = writeln!(
            report,
            "Color range:    {} to {}{}",
            red,
            blue,
            if coloring.bicolor { " (bicolor)" } else { "" }
        );
    }
    if let Some(contours) = generator.contours() {
        let _ = writeln!(report, "Contour levels: {}", contours.levels.len());
    }

    if args.sets {
        let mut labeled = mesh.clone();
        let summary = label_surface_sets(&mut labeled);
        let _ = writeln!(
            report,
            "Surface sets:   {}{}",
            summary.set_count,
            if summary.coalesced { " (coalesced)" } else { "" }
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use molsurf::engine::config::SurfaceConfigBuilder;
    use tempfile::tempdir;

    fn decode_args(input: &std::path::Path, extra: &[&str]) -> DecodeArgs {
        let mut args = vec!["molsurf", "decode", "-i", input.to_str().unwrap()];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Decode(args) => args,
            _ => panic!("Expected 'decode' subcommand"),
        }
    }

    fn spike_jvxl() -> String {
        let cube = "\
spike
test
    0    0.000000    0.000000    0.000000 ANGSTROMS
    3    1.000000    0.000000    0.000000
    3    0.000000    1.000000    0.000000
    3    0.000000    0.000000    1.000000
 0 0 0 0 0 0 0 0 0
 0 0 0 0 10 0 0 0 0
 0 0 0 0 0 0 0 0 0
";
        let config = SurfaceConfigBuilder::new().cutoff(5.0).build().unwrap();
        let mut generator = SurfaceGenerator::new(config);
        generator
            .set_property(SurfaceProperty::Title("octahedron".to_string()))
            .unwrap();
        generator
            .generate_from(VolumeInput::Text(cube.to_string()))
            .unwrap();
        generator.get_property("jvxlFileData").unwrap()
    }

    #[test]
    fn reports_decoded_mesh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spike.jvxl");
        std::fs::write(&path, spike_jvxl()).unwrap();

        let report = summarize(&decode_args(&path, &["--sets"])).unwrap();
        assert!(report.contains("Title:          octahedron"));
        assert!(report.contains("Vertices:       6"));
        assert!(report.contains("Triangles:      8"));
        assert!(report.contains("Boundary edges: 0"));
        assert!(report.contains("Surface sets:   1"));
    }

    #[test]
    fn missing_surface_index_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spike.jvxl");
        std::fs::write(&path, spike_jvxl()).unwrap();

        assert!(summarize(&decode_args(&path, &["--surface", "3"])).is_err());
    }
}
