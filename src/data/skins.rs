//! Skin resolution for model surfaces.
//!
//! Model decoders only know skin paths such as `textures/models/foo.btf`.
//! Turning those into textures is delegated to a [`SkinResolver`] so the
//! decoders stay independent of where assets live.

use std::sync::Arc;

use crate::textures::TextureAsset;

/// A resolved skin. `texture` is `None` when the skin could not be loaded;
/// the surface keeps its slot so skin indices stay stable.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub texture: Option<Arc<TextureAsset>>,
}

impl Material {
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            texture: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.texture.is_some()
    }
}

pub trait SkinResolver {
    /// Never fails: a skin that cannot be loaded yields an unresolved material.
    fn resolve(&self, name: &str) -> Material;
}

/// Resolver that records skin names without loading anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnresolvedSkins;

impl SkinResolver for UnresolvedSkins {
    fn resolve(&self, name: &str) -> Material {
        Material::unresolved(name)
    }
}

#[cfg(feature = "vfs")]
pub use vfs_resolver::VfsSkinResolver;

#[cfg(feature = "vfs")]
mod vfs_resolver {
    use std::io::Read;
    use std::sync::Arc;

    use rootcause::prelude::*;
    use tracing::{debug, warn};
    use vfs::VfsPath;

    use super::{Material, SkinResolver};
    use crate::data::cursor::BinCursor;
    use crate::textures::{TextureAsset, btf};

    /// Loads `.btf` skins from a virtual filesystem.
    ///
    /// Model skins are stored bottom-up, so textures are flipped vertically
    /// unless disabled with [`VfsSkinResolver::with_vertical_flip`].
    #[derive(Debug, Clone)]
    pub struct VfsSkinResolver {
        root: VfsPath,
        vertical_flip: bool,
    }

    impl VfsSkinResolver {
        pub fn new(root: VfsPath) -> Self {
            Self {
                root,
                vertical_flip: true,
            }
        }

        pub fn with_vertical_flip(mut self, vertical_flip: bool) -> Self {
            self.vertical_flip = vertical_flip;
            self
        }

        /// Read and decode one skin.
        pub fn load(&self, name: &str) -> Result<TextureAsset, Report> {
            let is_btf = name
                .rsplit_once('.')
                .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(btf::EXTENSION));
            if !is_btf {
                bail!("unsupported skin format: {name}");
            }

            let mut data = Vec::new();
            self.root
                .join(name)
                .context("VFS path error")?
                .open_file()
                .context_with(|| format!("Could not open skin {name}"))?
                .read_to_end(&mut data)
                .context_with(|| format!("Could not read skin {name}"))?;

            let mut cursor = BinCursor::new(&data);
            let texture = btf::decode_texture(&mut cursor, self.vertical_flip)
                .context_with(|| format!("Failed to decode skin {name}"))?;
            Ok(texture)
        }
    }

    impl SkinResolver for VfsSkinResolver {
        fn resolve(&self, name: &str) -> Material {
            match self.load(name) {
                Ok(texture) => {
                    debug!("loaded skin {name} ({}x{})", texture.width, texture.height);
                    Material {
                        name: name.to_string(),
                        texture: Some(Arc::new(texture)),
                    }
                }
                Err(report) => {
                    warn!("unable to load skin {name}: {report}");
                    Material::unresolved(name)
                }
            }
        }
    }
}

#[cfg(all(test, feature = "vfs"))]
mod tests {
    use std::io::Write;

    use vfs::{MemoryFS, VfsPath};

    use super::*;
    use crate::textures::btf::tests::indexed_texture;

    fn memory_root() -> VfsPath {
        VfsPath::new(MemoryFS::new())
    }

    #[test]
    fn resolves_btf_skin_from_vfs() {
        let root = memory_root();
        root.join("textures/models").unwrap().create_dir_all().unwrap();
        let bytes = indexed_texture(2, 2, 1, None);
        root.join("textures/models/hull.btf")
            .unwrap()
            .create_file()
            .unwrap()
            .write_all(&bytes)
            .unwrap();

        let resolver = VfsSkinResolver::new(root);
        let material = resolver.resolve("textures/models/hull.btf");
        assert!(material.is_resolved());
        let texture = material.texture.unwrap();
        assert_eq!((texture.width, texture.height), (2, 2));
    }

    #[test]
    fn missing_skin_is_unresolved() {
        let resolver = VfsSkinResolver::new(memory_root());
        let material = resolver.resolve("textures/models/missing.btf");
        assert_eq!(material.name, "textures/models/missing.btf");
        assert!(!material.is_resolved());
    }

    #[test]
    fn non_btf_skin_is_unresolved() {
        let resolver = VfsSkinResolver::new(memory_root());
        assert!(resolver.load("textures/models/hull.png").is_err());
    }
}
