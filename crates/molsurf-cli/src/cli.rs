use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "molsurf contributors",
    version,
    about = "molsurf CLI - Isosurfaces with compact JVXL encoding, and protein secondary-structure assignment.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an isosurface from CUBE, OpenDX or JVXL data and write it as JVXL.
    Surface(SurfaceArgs),
    /// Decode a JVXL file and summarize the surface it holds.
    Decode(DecodeArgs),
    /// Assign helices, sheets and turns to the chains of a PDB file.
    Structure(StructureArgs),
}

/// Arguments for the `surface` subcommand.
#[derive(Args, Debug)]
pub struct SurfaceArgs {
    // --- Core Arguments ---
    /// Path to the volumetric input (CUBE, APBS OpenDX or JVXL; detected from content).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the JVXL output. Written to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Title line stored in the JVXL header. Can be used twice.
    #[arg(short, long, value_name = "TEXT")]
    pub title: Vec<String>,

    // --- Surface Overrides ---
    /// Override the isosurface cutoff.
    #[arg(long, value_name = "FLOAT", allow_hyphen_values = true)]
    pub cutoff: Option<f32>,

    /// Treat the cutoff as |value| >= cutoff, for signed data such as orbitals.
    #[arg(long)]
    pub absolute: bool,

    /// Walk the lattice from the last x plane to the first.
    #[arg(long)]
    pub descending: bool,

    /// Slice the data with the plane a*x + b*y + c*z + d = 0 instead of building an isosurface.
    #[arg(long, value_name = "A,B,C,D", allow_hyphen_values = true)]
    pub plane: Option<String>,

    /// Number of evenly spaced contour levels.
    #[arg(long, value_name = "INT")]
    pub contours: Option<usize>,

    /// Quantize colors into contour bands.
    #[arg(long, requires = "contours")]
    pub color_contours: bool,

    // --- Color Overrides ---
    /// Color mode: 'value', 'sign', 'sets' or 'phase:<s|x|y|z|xy|yz|xz|x2-y2|z2>'.
    #[arg(long, value_name = "MODE")]
    pub color_mode: Option<String>,

    /// Values mapped to the red and blue ends of the palette.
    #[arg(long, value_name = "RED,BLUE", allow_hyphen_values = true)]
    pub color_range: Option<String>,

    /// Color the surface by a second volumetric data set.
    #[arg(long, value_name = "PATH")]
    pub map_color: Option<PathBuf>,

    /// Write two characters per color value.
    #[arg(long)]
    pub precision_color: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S surface.cutoff=0.05
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `decode` subcommand.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Path to the JVXL file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Which surface of a multi-surface file to decode.
    #[arg(short, long, default_value_t = 0, value_name = "INT")]
    pub surface: usize,

    /// Also label connected pieces of the decoded surface.
    #[arg(long)]
    pub sets: bool,
}

/// Arguments for the `structure` subcommand.
#[derive(Args, Debug)]
pub struct StructureArgs {
    /// Path to the input PDB file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Classify from alpha-carbon torsions only, skipping the hydrogen-bond tier.
    #[arg(long)]
    pub no_hbonds: bool,

    /// Override the alpha-carbon distance beyond which no hydrogen bond is considered.
    #[arg(long, value_name = "FLOAT")]
    pub hbond_ca_cutoff: Option<f64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S structure.helix-pitch=3
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
