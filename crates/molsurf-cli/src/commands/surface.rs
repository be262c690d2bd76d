use crate::cli::SurfaceArgs;
use crate::config::PartialConfig;
use crate::config::models::SurfaceJob;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use molsurf::{
    engine::progress::ProgressReporter,
    workflows::surface::{SurfaceGenerator, SurfaceProperty, VolumeInput},
};
use std::path::Path;
use tracing::{info, warn};

pub fn run(args: SurfaceArgs) -> Result<()> {
    let partial_config = PartialConfig::load(args.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let core_config = partial_config.merge_surface_args(&args)?;
    let job = SurfaceJob::new(&args, core_config);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let text = generate(&job, reporter)?;

    match &job.output_path {
        Some(path) => {
            std::fs::write(path, &text)?;
            println!("✓ JVXL surface written to: {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn read_error(path: &Path) -> impl FnOnce(molsurf::engine::error::SurfaceError) -> CliError + '_ {
    move |e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    }
}

/// Runs the generator for `job` and returns the JVXL document text.
pub fn generate(job: &SurfaceJob, reporter: ProgressReporter<'_>) -> Result<String> {
    let mut generator = SurfaceGenerator::with_reporter(job.core_config.clone(), reporter);
    for title in &job.titles {
        generator.set_property(SurfaceProperty::Title(title.clone()))?;
    }

    info!("Loading volumetric data from {:?}", &job.input_path);
    generator
        .set_property(SurfaceProperty::ReadData(VolumeInput::Path(
            job.input_path.clone(),
        )))
        .map_err(read_error(&job.input_path))?;
    generator.set_property(SurfaceProperty::Generate)?;

    if let Some(source) = &job.color_source {
        info!("Mapping color from {:?}", source);
        generator
            .set_property(SurfaceProperty::MapColor(Some(VolumeInput::Path(
                source.clone(),
            ))))
            .map_err(read_error(source))?;
    }

    if let Some(mesh) = generator.mesh() {
        let stats = mesh.stats();
        if stats.triangle_count == 0 {
            warn!("The cutoff produced an empty surface.");
        }
        info!(
            "Surface has {} vertices, {} triangles, area {:.3} A^2, {} boundary edges.",
            stats.vertex_count, stats.triangle_count, stats.area, stats.boundary_edges
        );
    }
    Ok(generator.get_property("jvxlFileData")?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use molsurf::engine::config::SurfaceConfigBuilder;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const SPIKE_CUBE: &str = "\
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

    fn job(input: PathBuf, color_source: Option<PathBuf>) -> SurfaceJob {
        SurfaceJob {
            input_path: input,
            output_path: None,
            color_source,
            titles: vec!["spike density".to_string()],
            core_config: SurfaceConfigBuilder::new().cutoff(5.0).build().unwrap(),
        }
    }

    #[test]
    fn writes_jvxl_for_cube_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("spike.cube");
        std::fs::write(&input, SPIKE_CUBE).unwrap();

        let text = generate(&job(input, None), ProgressReporter::new()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("#JVXL"));
        assert_eq!(lines.next(), Some("spike density"));
        assert!(text.contains("Jmol voxel format version 1.1"));
    }

    #[test]
    fn color_source_adds_color_data() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("spike.cube");
        std::fs::write(&input, SPIKE_CUBE).unwrap();

        let plain = generate(&job(input.clone(), None), ProgressReporter::new()).unwrap();
        let colored =
            generate(&job(input.clone(), Some(input)), ProgressReporter::new()).unwrap();
        assert!(colored.len() > plain.len());
    }

    #[test]
    fn missing_input_is_reported_with_its_path() {
        let path = PathBuf::from("/nonexistent/density.cube");
        let result = generate(&job(path.clone(), None), ProgressReporter::new());
        match result {
            Err(CliError::FileParsing { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("Expected a file parsing error, got {:?}", other.err()),
        }
    }
}
