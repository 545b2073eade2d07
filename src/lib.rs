/// Binary reading primitives and skin resolution shared by the decoders
pub mod data;
/// Error definitions
pub mod error;
/// BVM models: decoding, animation frames and mesh assembly
pub mod models;
/// Format detection for model and texture files
pub mod sniff;
/// BTF textures
pub mod textures;

#[cfg(feature = "vfs")]
pub use vfs;
