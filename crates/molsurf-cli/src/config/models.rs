use crate::cli::SurfaceArgs;
use molsurf::engine::config as core_config;
use std::path::PathBuf;

/// A fully resolved `surface` invocation.
pub struct SurfaceJob {
    pub input_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub color_source: Option<PathBuf>,
    pub titles: Vec<String>,
    pub core_config: core_config::SurfaceConfig,
}

impl SurfaceJob {
    pub fn new(args: &SurfaceArgs, core_config: core_config::SurfaceConfig) -> Self {
        Self {
            input_path: args.input.clone(),
            output_path: args.output.clone(),
            color_source: args.map_color.clone(),
            titles: args.title.iter().take(2).cloned().collect(),
            core_config,
        }
    }
}
