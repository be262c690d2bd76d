//! # Core Module
//!
//! Fundamental data structures and codecs shared by the surface and structure pipelines.
//!
//! - **Models** ([`models`]) - Voxel grids, triangle meshes, polymer backbones and structure segments
//! - **File I/O** ([`io`]) - CUBE and APBS/OpenDX volumetric readers, file sniffing, PDB backbones
//! - **JVXL** ([`jvxl`]) - Edge/color fraction characters, run-length compression, documents
//! - **Utilities** ([`utils`]) - Geometry helpers (torsion angles, plane bases)

pub mod io;
pub mod jvxl;
pub mod models;
pub mod utils;
