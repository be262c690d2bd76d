//! # Core Models Module
//!
//! Data structures handed between the readers, the surface engine and the structure
//! classifier.
//!
//! - [`volume`] - Voxel grid on a general affine lattice, with an optional synthetic plane field
//! - [`mesh`] - Triangulated surface with per-vertex values, colors and surface-set ids
//! - [`backbone`] - Polymer backbone capability consumed by the structure classifier
//! - [`structure`] - Secondary-structure segment types

pub mod backbone;
pub mod mesh;
pub mod structure;
pub mod volume;
