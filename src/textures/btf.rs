//! Decoder for BTF (`BITF`) textures.
//!
//! Every revision starts with the same 8-byte header (ident, major, minor)
//! and a 16-byte texinfo block. What follows depends on the revision:
//!
//! - **Legacy** (0.0 - 0.8): inline metadata size and type tag, the metadata
//!   payload, then the frame block.
//! - **Sequential** (0.9+): frame data size and metadata size, the metadata
//!   block, then the frame block.
//! - **Indexed** (1.0): (size, offset) pairs for frame data and metadata; both
//!   sections are seeked to.
//!
//! Only the first frame is decoded, as uncompressed RGBA.

use std::path::Path;

use tracing::{debug, warn};

use crate::data::Version;
use crate::data::cursor::{BinCursor, Exhausted};
use crate::data::parser_utils::{fourcc, ident};
use crate::error::{ErrorKind, IResult, IdentBlock, failure_from_kind};
use crate::textures::{
    AnimationKind, BYTES_PER_PIXEL, Compression, EmbeddedDefaults, SpriteProperties,
    StoredFormat, TextureAsset, flip_vertical,
};

pub const BTF_IDENT: u32 = ident(b"BITF");
pub const FRAME_IDENT: u32 = ident(b"FRAM");

/// Game surface properties metadata.
pub const META_GAME: u32 = ident(b"QMTA");
/// Sprite properties metadata.
pub const META_SPRITE: u32 = ident(b"SPMT");

pub const EXTENSION: &str = "btf";

/// Newest version this decoder reads.
pub const HIGHEST_VERSION: Version = Version::new(1, 0);

/// First 0.x minor version using the sequential layout.
const SEQUENTIAL_MINOR: i16 = 9;

pub const MAX_TEXTURE_NAME: usize = 64;
const FRAME_HASH_LEN: usize = 20;
const FRAME_RESERVED_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureRevision {
    Legacy,
    Sequential,
    Indexed,
}

impl TextureRevision {
    /// Picks the revision for a header version.
    ///
    /// 0.x files are accepted whatever their minor version. 1.x files are
    /// compared on the packed `major * 100 + minor * 10` form, so 1.1 is
    /// rejected.
    pub fn for_version(version: Version) -> Result<Self, ErrorKind> {
        match version.major {
            0 if version.minor >= SEQUENTIAL_MINOR => Ok(TextureRevision::Sequential),
            0 if version.minor >= 0 => Ok(TextureRevision::Legacy),
            1.. if version.packed() <= HIGHEST_VERSION.packed() => Ok(TextureRevision::Indexed),
            _ => Err(ErrorKind::UnsupportedVersion {
                format: "BTF",
                major: version.major as i32,
                minor: version.minor as i32,
            }),
        }
    }
}

/// The fixed texinfo fields shared by all revisions.
#[derive(Debug, Clone, Copy)]
struct TexInfo {
    width: i32,
    height: i32,
    compression: i16,
    format: i16,
    animation: i16,
    frame_count: i16,
}

impl TexInfo {
    fn read(cursor: &mut BinCursor<'_>) -> Result<TexInfo, Exhausted> {
        Ok(TexInfo {
            width: cursor.read_i32()?,
            height: cursor.read_i32()?,
            compression: cursor.read_i16()?,
            format: cursor.read_i16()?,
            animation: cursor.read_i16()?,
            frame_count: cursor.read_i16()?,
        })
    }

    /// Byte length of one uncompressed RGBA frame.
    fn frame_len(&self) -> Result<usize, ErrorKind> {
        let invalid = || ErrorKind::InvalidDimensions {
            width: self.width,
            height: self.height,
        };
        let width = usize::try_from(self.width).map_err(|_| invalid())?;
        let height = usize::try_from(self.height).map_err(|_| invalid())?;
        width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(invalid)
    }

    fn check_decodable(&self) -> Result<(), ErrorKind> {
        if Compression::from_raw(self.compression) != Some(Compression::None) {
            return Err(ErrorKind::UnsupportedCompression(self.compression));
        }
        if StoredFormat::from_raw(self.format) != Some(StoredFormat::Rgba) {
            return Err(ErrorKind::UnsupportedPixelFormat(self.format));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Metadata {
    defaults: Option<EmbeddedDefaults>,
    sprite: Option<SpriteProperties>,
}

/// Interprets a metadata payload whose type tag has already been read.
fn read_metadata(cursor: &mut BinCursor<'_>, tag: u32) -> Result<Metadata, Exhausted> {
    let mut metadata = Metadata::default();
    match tag {
        META_GAME => {
            let surface_flags = cursor.read_i32()?;
            let contents = cursor.read_i32()?;
            let value = cursor.read_f32()?;
            let emissive = cursor.read_i16()? != 0;
            let surface_type = cursor.read_fixed_string(MAX_TEXTURE_NAME)?;
            let alternate_count = cursor.read_i16()?.max(0) as usize;
            for _ in 0..alternate_count {
                cursor.skip(MAX_TEXTURE_NAME)?;
            }
            metadata.defaults = Some(EmbeddedDefaults {
                surface_flags,
                contents,
                light_value: value as i32,
                emissive,
                surface_type,
            });
        }
        META_SPRITE => {
            // Per-frame intervals follow; only the first frame is decoded.
            metadata.sprite = Some(SpriteProperties {
                orientation: cursor.read_i32()?,
                render_type: cursor.read_i32()?,
            });
        }
        other => debug!("skipping unknown BTF metadata type {}", fourcc(other)),
    }
    Ok(metadata)
}

fn missing_frame_data() -> ErrorKind {
    ErrorKind::MissingFrames("no frame data".to_string())
}

/// Reads whatever sits between texinfo and the frame block, leaving the
/// cursor at the frame block.
fn read_sections(
    cursor: &mut BinCursor<'_>,
    revision: TextureRevision,
) -> Result<Metadata, ErrorKind> {
    match revision {
        TextureRevision::Legacy => {
            let metadata_size = cursor.read_size("metadata size")?;
            let tag = cursor.read_u32()?;
            let payload_start = cursor.position();
            let mut metadata = Metadata::default();
            if metadata_size > 0 {
                metadata = read_metadata(cursor, tag)?;
            }
            cursor.seek(payload_start.saturating_add(metadata_size))?;
            Ok(metadata)
        }
        TextureRevision::Sequential => {
            let frame_data_size = cursor.read_size("frame data size")?;
            let metadata_size = cursor.read_size("metadata size")?;
            if frame_data_size == 0 {
                return Err(missing_frame_data());
            }
            let block_start = cursor.position();
            let mut metadata = Metadata::default();
            if metadata_size > 0 {
                let tag = cursor.read_u32()?;
                metadata = read_metadata(cursor, tag)?;
            }
            cursor.seek(block_start.saturating_add(metadata_size))?;
            Ok(metadata)
        }
        TextureRevision::Indexed => {
            let frame_data_size = cursor.read_size("frame data size")?;
            let frame_data_offset = cursor.read_size("frame data offset")?;
            let metadata_size = cursor.read_size("metadata size")?;
            let metadata_offset = cursor.read_size("metadata offset")?;
            if frame_data_size == 0 {
                return Err(missing_frame_data());
            }
            let mut metadata = Metadata::default();
            if metadata_size > 0 {
                cursor.seek(metadata_offset)?;
                let tag = cursor.read_u32()?;
                metadata = read_metadata(cursor, tag)?;
            }
            cursor.seek(frame_data_offset)?;
            Ok(metadata)
        }
    }
}

/// Reads the frame header and returns the first frame's pixels.
fn read_first_frame<'a>(cursor: &mut BinCursor<'a>, len: usize) -> Result<&'a [u8], ErrorKind> {
    let frame_ident = cursor.read_u32()?;
    if frame_ident != FRAME_IDENT {
        return Err(ErrorKind::UnknownIdent {
            block: IdentBlock::TextureFrame,
            found: frame_ident,
        });
    }
    cursor.skip(FRAME_HASH_LEN + FRAME_RESERVED_LEN)?;
    Ok(cursor.read_bytes(len)?)
}

fn read_header(cursor: &mut BinCursor<'_>) -> Result<Version, ErrorKind> {
    let found = cursor.read_u32()?;
    if found != BTF_IDENT {
        return Err(ErrorKind::UnknownIdent {
            block: IdentBlock::Texture,
            found,
        });
    }
    let major = cursor.read_i16()?;
    let minor = cursor.read_i16()?;
    Ok(Version::new(major, minor))
}

fn decode(cursor: &mut BinCursor<'_>, vertical_flip: bool) -> Result<TextureAsset, ErrorKind> {
    let version = read_header(cursor)?;
    let revision = TextureRevision::for_version(version)?;
    debug!("BTF {version} uses the {revision:?} layout");

    let info = TexInfo::read(cursor)?;
    if info.frame_count <= 0 {
        return Err(ErrorKind::MissingFrames(format!(
            "declared frame count {}",
            info.frame_count
        )));
    }
    let frame_len = info.frame_len()?;
    info.check_decodable()?;

    let metadata = read_sections(cursor, revision)?;
    let mut pixels = read_first_frame(cursor, frame_len)?.to_vec();

    let (width, height) = (info.width as u32, info.height as u32);
    if vertical_flip {
        flip_vertical(&mut pixels, width as usize, height as usize);
    }

    Ok(TextureAsset::builder()
        .width(width)
        .height(height)
        .version(version)
        .maybe_animation(AnimationKind::from_raw(info.animation))
        .frame_count(info.frame_count as usize)
        .maybe_embedded_defaults(metadata.defaults)
        .maybe_sprite(metadata.sprite)
        .pixels(pixels)
        .build())
}

/// Decode a BTF texture starting at the cursor's position.
///
/// `vertical_flip` reverses the row order after decoding; model skins are
/// stored bottom-up.
pub fn decode_texture(cursor: &mut BinCursor<'_>, vertical_flip: bool) -> IResult<TextureAsset> {
    decode(cursor, vertical_flip).map_err(|kind| {
        warn!("failed to decode BTF texture: {kind}");
        failure_from_kind(kind)
    })
}

/// Whether `path` looks like a BTF texture this decoder can read.
///
/// Peeks at a copy of `cursor`; the caller's position is unchanged.
pub fn can_parse(path: &Path, cursor: &BinCursor<'_>) -> bool {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EXTENSION));
    if !has_extension {
        return false;
    }

    let mut reader = cursor.clone();
    read_header(&mut reader)
        .and_then(TextureRevision::for_version)
        .is_ok()
}
