//! Volumetric and structure file input.
//!
//! Volumetric formats share one [`traits::VolumetricSource`] capability. The concrete reader is
//! chosen by [`sniff::VolumeFormat::sniff`] rather than by inspecting file extensions.

pub mod apbs;
pub mod cube;
pub mod pdb;
pub mod sniff;
pub mod traits;
