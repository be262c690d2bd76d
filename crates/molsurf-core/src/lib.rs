//! # molsurf Core Library
//!
//! Isosurface extraction from volumetric scalar data with the compact JVXL encoding, and
//! secondary-structure assignment for polymer backbones.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`VolumeData`, `Mesh`, polymer
//!   backbones), file readers for volumetric formats, and the JVXL text codec.
//!
//! - **[`engine`]: The Algorithms.** Marching cubes and marching squares, mesh coloring,
//!   connected-surface labeling, and the two-tier secondary-structure classifier.
//!
//! - **[`workflows`]: The Public API.** The property-driven `SurfaceGenerator` session and the
//!   structure assignment entry point that publishes segments back onto a backbone.

pub mod core;
pub mod engine;
pub mod workflows;
