//! # JVXL
//!
//! The compact text encoding of isosurfaces. A surface is stored as run lengths of
//! inside/outside lattice points, one character per edge crossing, and optionally one or two
//! characters per vertex for color, so a reader can rebuild the mesh without the original grid.
//!
//! - [`codec`] - Fraction characters and the `~` run-length text compressor
//! - [`definition`] - The packed mode parameters of a surface's definition line
//! - [`document`] - Whole documents: header, surfaces, text output
//! - [`reader`] - Parsing JVXL text back into a [`document::JvxlDocument`]
//! - [`writer`] - Assembling a surface block from marching-cubes output

pub mod codec;
pub mod definition;
pub mod document;
pub mod error;
pub mod reader;
pub mod writer;

pub use error::JvxlError;
