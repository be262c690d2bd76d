pub mod decode;
pub mod structure;
pub mod surface;
