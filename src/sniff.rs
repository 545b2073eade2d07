//! Picks the decoder for a file from its extension and header.

use std::fmt;
use std::path::Path;

use crate::data::cursor::BinCursor;
use crate::models::bvm;
use crate::textures::btf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AssetKind {
    Model,
    Texture,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Model => f.write_str("BVM model"),
            AssetKind::Texture => f.write_str("BTF texture"),
        }
    }
}

/// Returns the kind of asset `data` holds, if any decoder accepts it.
pub fn sniff(path: &Path, data: &[u8]) -> Option<AssetKind> {
    let cursor = BinCursor::new(data);
    if bvm::can_parse(path, &cursor) {
        Some(AssetKind::Model)
    } else if btf::can_parse(path, &cursor) {
        Some(AssetKind::Texture)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::textures::btf::tests::indexed_texture;

    fn model_header(version: i32) -> Vec<u8> {
        let mut data = bvm::BVM_IDENT.to_le_bytes().to_vec();
        data.extend_from_slice(&version.to_le_bytes());
        data
    }

    #[test]
    fn detects_models_and_textures() {
        assert_eq!(sniff(Path::new("tank.bvm"), &model_header(3)), Some(AssetKind::Model));
        assert_eq!(sniff(Path::new("tank.bvm"), &model_header(1)), Some(AssetKind::Model));
        assert_eq!(
            sniff(Path::new("hull.btf"), &indexed_texture(1, 1, 1, None)),
            Some(AssetKind::Texture)
        );
    }

    #[test]
    fn extension_must_match_content() {
        assert_eq!(sniff(Path::new("tank.btf"), &model_header(3)), None);
        assert_eq!(sniff(Path::new("hull.bvm"), &indexed_texture(1, 1, 1, None)), None);
        assert_eq!(sniff(Path::new("tank"), &model_header(3)), None);
    }

    #[test]
    fn rejects_newer_or_short_files() {
        assert_eq!(sniff(Path::new("tank.bvm"), &model_header(4)), None);
        assert_eq!(sniff(Path::new("tank.bvm"), &[]), None);
    }
}
