//! # Engine Module
//!
//! The algorithms behind surface generation and structure assignment.
//!
//! ## Overview
//!
//! A scalar field becomes a triangulated isosurface through [`marching_cubes`], which also
//! records the inside/outside run lengths and edge fractions the JVXL encoding needs; the same
//! walk replays an encoded surface without the original grid. Planes and surfaces are
//! contoured by [`marching_squares`], colored by [`coloring`], and split into connected pieces
//! by [`surface_sets`]. The [`structure`] classifier tags backbone residues as helix, sheet or
//! turn.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Surface and structure parameters with validating builders
//! - **Progress Monitoring** ([`progress`]) - Callback-based phase and task reporting
//! - **Error Handling** ([`error`]) - Generator-level errors wrapping reader and codec failures
//!
//! ## Key Capabilities
//!
//! - **Shared-vertex marching cubes** with one vertex per crossing edge
//! - **Signed orbital surfaces** that never draw a triangle across the nodal boundary
//! - **Parallel hydrogen-bond scans** behind the `parallel` feature

pub mod coloring;
pub mod config;
pub mod error;
pub mod marching_cubes;
pub mod marching_squares;
pub(crate) mod mc_tables;
pub mod progress;
pub mod structure;
pub mod surface_sets;
