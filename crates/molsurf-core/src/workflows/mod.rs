//! # Workflows Module
//!
//! Top-level entry points that tie readers, algorithms and encoders together.
//!
//! ## Overview
//!
//! Workflows are what callers normally reach for. They own progress reporting and logging,
//! validate the order of operations, and return results in the form downstream consumers
//! (renderers, file writers) expect.
//!
//! - **Surface Workflow** ([`surface`]) - The property-driven [`surface::SurfaceGenerator`]
//!   session: read CUBE, OpenDX or JVXL data, generate or decode a surface, color it, and
//!   query its JVXL encoding.
//! - **Structure Workflow** ([`structure`]) - Secondary-structure assignment that writes
//!   segments back onto a polymer backbone.

pub mod structure;
pub mod surface;
