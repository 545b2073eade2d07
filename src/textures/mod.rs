/// Decoder for the BTF texture container
pub mod btf;

use bon::Builder;

use crate::data::Version;

/// Bytes per pixel of the only pixel layout BTF currently stores.
pub const BYTES_PER_PIXEL: usize = 4;

/// Stand-in average colour for decoded textures; BTF does not store one.
pub const AVERAGE_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelFormat {
    Rgba8,
}

/// Compression kinds a BTF texinfo block can declare. Only `None` is decodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Dxt1,
    Dxt5,
    Bc4,
    Bc5,
}

impl Compression {
    pub fn from_raw(raw: i16) -> Option<Self> {
        Some(match raw {
            0 => Compression::None,
            1 => Compression::Dxt1,
            2 => Compression::Dxt5,
            3 => Compression::Bc4,
            4 => Compression::Bc5,
            _ => return None,
        })
    }
}

/// Pixel formats a texinfo block can declare. Only `Rgba` is written today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredFormat {
    Rgba,
    Rgb,
    Argb,
}

impl StoredFormat {
    pub fn from_raw(raw: i16) -> Option<Self> {
        Some(match raw {
            0 => StoredFormat::Rgba,
            1 => StoredFormat::Rgb,
            2 => StoredFormat::Argb,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnimationKind {
    None,
    Sequence,
    Random,
    Sprite,
}

impl AnimationKind {
    pub fn from_raw(raw: i16) -> Option<Self> {
        Some(match raw {
            0 => AnimationKind::None,
            1 => AnimationKind::Sequence,
            2 => AnimationKind::Random,
            3 => AnimationKind::Sprite,
            _ => return None,
        })
    }
}

/// Game surface properties embedded in a texture's metadata block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmbeddedDefaults {
    pub surface_flags: i32,
    pub contents: i32,
    /// Stored as a float on disk, truncated here.
    pub light_value: i32,
    pub emissive: bool,
    pub surface_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpriteProperties {
    pub orientation: i32,
    pub render_type: i32,
}

/// A decoded texture with a single mip level.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct TextureAsset {
    pub width: u32,
    pub height: u32,
    pub version: Version,
    #[builder(default = PixelFormat::Rgba8)]
    pub format: PixelFormat,
    pub animation: Option<AnimationKind>,
    pub frame_count: usize,
    #[builder(default = AVERAGE_COLOR)]
    pub average_color: [f32; 4],
    pub embedded_defaults: Option<EmbeddedDefaults>,
    pub sprite: Option<SpriteProperties>,
    /// `width * height * 4` bytes, RGBA.
    pub pixels: Vec<u8>,
}

/// Reverses the row order of an RGBA image in place.
///
/// Rows beyond the end of `pixels` are ignored.
pub fn flip_vertical(pixels: &mut [u8], width: usize, height: usize) {
    let row = width * BYTES_PER_PIXEL;
    if row == 0 {
        return;
    }
    let rows = (pixels.len() / row).min(height);
    for y in 0..rows / 2 {
        let (top, bottom) = pixels.split_at_mut((rows - 1 - y) * row);
        top[y * row..(y + 1) * row].swap_with_slice(&mut bottom[..row]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_rows(width: usize, height: usize) -> Vec<u8> {
        (0..height)
            .flat_map(|y| std::iter::repeat_n(y as u8, width * BYTES_PER_PIXEL))
            .collect()
    }

    #[test]
    fn flip_reverses_rows() {
        let (width, height) = (3, 5);
        let mut pixels = numbered_rows(width, height);
        flip_vertical(&mut pixels, width, height);
        let row = width * BYTES_PER_PIXEL;
        for y in 0..height {
            assert!(pixels[y * row..(y + 1) * row].iter().all(|&b| b as usize == height - 1 - y));
        }
    }

    #[test]
    fn flip_twice_is_identity() {
        let original: Vec<u8> = (0..2 * 4 * 4).map(|i| i as u8).collect();
        let mut pixels = original.clone();
        flip_vertical(&mut pixels, 2, 4);
        assert_ne!(pixels, original);
        flip_vertical(&mut pixels, 2, 4);
        assert_eq!(pixels, original);
    }

    #[test]
    fn flip_single_row_is_noop() {
        let mut pixels = vec![1, 2, 3, 4, 5, 6, 7, 8];
        flip_vertical(&mut pixels, 2, 1);
        assert_eq!(pixels, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn raw_tags() {
        assert_eq!(Compression::from_raw(0), Some(Compression::None));
        assert_eq!(Compression::from_raw(4), Some(Compression::Bc5));
        assert_eq!(Compression::from_raw(9), None);
        assert_eq!(StoredFormat::from_raw(2), Some(StoredFormat::Argb));
        assert_eq!(AnimationKind::from_raw(3), Some(AnimationKind::Sprite));
        assert_eq!(AnimationKind::from_raw(-1), None);
    }
}
