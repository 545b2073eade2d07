/// BVM model container decoder
pub mod bvm;
/// Per-frame vertex streams and final model assembly
pub mod geometry;
/// Renderer-facing model types
pub mod model;
/// Animation sequences and frame flattening
pub mod sequence;
