//! Decoder for BVM (`BIVM`) vertex models.
//!
//! Three revisions exist on disk:
//!
//! - **v1**: a single static mesh with one skin, read front to back.
//! - **v2**: sequences followed by submeshes, each carrying its base pose and
//!   then one position/normal block per flat frame, read front to back.
//! - **v3**: a header table of (count, offset) pairs. Submesh descriptors
//!   point at their skins, UVs, indices and animation data, which may be laid
//!   out in any order.
//!
//! All revisions decode into [`SubmeshGeometry`] and are turned into a
//! [`Model`] by [`assemble`].

use std::path::Path;

use tracing::{debug, warn};

use crate::data::cursor::{BinCursor, Exhausted};
use crate::data::parser_utils::ident;
use crate::data::skins::SkinResolver;
use crate::error::{ErrorKind, IResult, IdentBlock, failure_from_kind};
use crate::models::geometry::{SubmeshGeometry, Triangle, assemble};
use crate::models::model::Model;
use crate::models::sequence::{
    FlatFrame, Sequence, flatten, frame_scale, frame_total, read_sequences,
};

pub const BVM_IDENT: u32 = ident(b"BIVM");
pub const SUBMESH_IDENT: u32 = ident(b"SMSH");
pub const SKIN_IDENT: u32 = ident(b"SMSK");

pub const MAX_NAME_LEN: usize = 64;

/// Newest model version this decoder reads.
pub const CURRENT_VERSION: i32 = 3;

pub const EXTENSION: &str = "bvm";

/// Where skin paths are rooted, relative to the game data directory.
const SKIN_DIR: &str = "textures/models";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvmVersion {
    V1,
    V2,
    /// Version 3, and any older number that is not 1 or 2.
    Current,
}

impl BvmVersion {
    pub fn from_raw(version: i32) -> Result<Self, ErrorKind> {
        match version {
            1 => Ok(BvmVersion::V1),
            2 => Ok(BvmVersion::V2),
            v if v <= CURRENT_VERSION => Ok(BvmVersion::Current),
            v => Err(ErrorKind::UnsupportedVersion {
                format: "BVM",
                major: v,
                minor: 0,
            }),
        }
    }
}

/// Skin path for a diffuse texture name.
pub fn skin_path(diffuse: &str) -> String {
    format!("{SKIN_DIR}/{diffuse}.{}", crate::textures::btf::EXTENSION)
}

/// Model-space transform applied to every position at decode time.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Transform {
    origin: [f32; 3],
    scale: f32,
}

impl Transform {
    fn read(cursor: &mut BinCursor<'_>) -> Result<Transform, Exhausted> {
        let origin = cursor.read_vec3()?;
        let scale = cursor.read_f32()?;
        Ok(Transform { origin, scale })
    }

    /// `(raw + origin) * (scale * sequence_scale)`
    fn apply(&self, raw: [f32; 3], sequence_scale: f32) -> [f32; 3] {
        let scale = self.scale * sequence_scale;
        [
            (raw[0] + self.origin[0]) * scale,
            (raw[1] + self.origin[1]) * scale,
            (raw[2] + self.origin[2]) * scale,
        ]
    }
}

// ---------------------------------------------------------------------------
// Shared block readers
// ---------------------------------------------------------------------------

fn expect_ident(cursor: &mut BinCursor<'_>, expected: u32, block: IdentBlock) -> Result<(), ErrorKind> {
    let found = cursor.read_u32()?;
    if found != expected {
        return Err(ErrorKind::UnknownIdent { block, found });
    }
    Ok(())
}

/// Reads the diffuse, interior and emission names plus the emission scale.
/// Only the diffuse name is used.
fn read_texture_names(cursor: &mut BinCursor<'_>) -> Result<String, Exhausted> {
    let diffuse = cursor.read_fixed_string(MAX_NAME_LEN)?;
    let _interior = cursor.read_fixed_string(MAX_NAME_LEN)?;
    let _emission = cursor.read_fixed_string(MAX_NAME_LEN)?;
    let _emission_scale = cursor.read_f32()?;
    Ok(diffuse)
}

/// Reads `count` `SMSK` blocks into skin paths.
fn read_skin_chain(cursor: &mut BinCursor<'_>, count: usize) -> Result<Vec<String>, ErrorKind> {
    let mut skins = Vec::with_capacity(count.min(cursor.remaining()));
    for _ in 0..count {
        expect_ident(cursor, SKIN_IDENT, IdentBlock::Skin)?;
        skins.push(skin_path(&read_texture_names(cursor)?));
    }
    Ok(skins)
}

/// How a revision stores the corners of each triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Winding {
    /// `i32` indices, kept in stored order.
    Stored,
    /// `u32` indices with the second and third corner swapped.
    Swapped,
}

fn read_stored_index(
    cursor: &mut BinCursor<'_>,
    surface: &str,
    vertex_count: usize,
) -> Result<usize, ErrorKind> {
    let index = cursor.read_i32()?;
    usize::try_from(index).map_err(|_| ErrorKind::IndexOutOfRange {
        surface: surface.to_string(),
        index: index as i64,
        vertex_count,
    })
}

/// Reads `index_count` indices as triangles. A trailing partial triangle is
/// read whole. Negative stored indices fail with `IndexOutOfRange`.
fn read_triangles(
    cursor: &mut BinCursor<'_>,
    surface: &str,
    index_count: usize,
    vertex_count: usize,
    winding: Winding,
) -> Result<Vec<Triangle>, ErrorKind> {
    let count = index_count.div_ceil(3);
    let mut triangles = Vec::with_capacity(count.min(cursor.remaining()));
    for _ in 0..count {
        let triangle = match winding {
            Winding::Stored => [
                read_stored_index(cursor, surface, vertex_count)?,
                read_stored_index(cursor, surface, vertex_count)?,
                read_stored_index(cursor, surface, vertex_count)?,
            ],
            Winding::Swapped => {
                let a = cursor.read_size_u32()?;
                let c = cursor.read_size_u32()?;
                let b = cursor.read_size_u32()?;
                [a, b, c]
            }
        };
        triangles.push(Triangle { vertices: triangle });
    }
    Ok(triangles)
}

/// Frame geometry is stored after the sequence table, one block per flat frame,
/// so a declared frame total larger than the data left to hold it is corrupt.
fn check_frame_budget(sequences: &[Sequence], available: usize) -> Result<(), ErrorKind> {
    let total = frame_total(sequences);
    if total > available {
        return Err(ErrorKind::TruncatedData(format!(
            "{total} frames declared with only {available} bytes of data"
        )));
    }
    Ok(())
}

/// Reads one position + normal block per flat frame, in flat-frame order.
fn read_frame_blocks(
    cursor: &mut BinCursor<'_>,
    submesh: &mut SubmeshGeometry,
    sequences: &[Sequence],
    flat: &[FlatFrame],
    transform: &Transform,
    vertex_count: usize,
) -> Result<(), Exhausted> {
    for (index, frame) in flat.iter().enumerate() {
        let scale = frame_scale(sequences, frame);
        let mut positions = Vec::with_capacity(vertex_count.min(cursor.remaining()));
        let mut normals = Vec::with_capacity(vertex_count.min(cursor.remaining()));
        for _ in 0..vertex_count {
            positions.push(transform.apply(cursor.read_vec3()?, scale));
            normals.push(cursor.read_vec3()?);
        }
        submesh.positions[index] = positions;
        submesh.normals[index] = normals;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Revision decoders
// ---------------------------------------------------------------------------

fn decode_v1(
    cursor: &mut BinCursor<'_>,
    name: &str,
    skins: &dyn SkinResolver,
) -> Result<Model, ErrorKind> {
    let diffuse = read_texture_names(cursor)?;
    let transform = Transform::read(cursor)?;
    let vertex_count = cursor.read_size("vertex count")?;
    let index_count = cursor.read_size("index count")?;
    let _flags = cursor.read_i32()?;
    let _sequence_count = cursor.read_i32()?;

    let sequences = [Sequence::static_pose()];
    let flat = flatten(&sequences);

    let mut submesh = SubmeshGeometry::new(name, flat.len());
    submesh.skins.push(skin_path(&diffuse));
    submesh.triangles = read_triangles(cursor, name, index_count, vertex_count, Winding::Stored)?;

    let capacity = vertex_count.min(cursor.remaining());
    let mut positions = Vec::with_capacity(capacity);
    let mut normals = Vec::with_capacity(capacity);
    submesh.uvs.reserve(capacity);
    for _ in 0..vertex_count {
        positions.push(transform.apply(cursor.read_vec3()?, 1.0));
        normals.push(cursor.read_vec3()?);
        submesh.uvs.push(cursor.read_vec2()?);
    }
    submesh.positions[0] = positions;
    submesh.normals[0] = normals;

    assemble(name, &flat, vec![submesh], skins)
}

fn decode_v2(
    cursor: &mut BinCursor<'_>,
    name: &str,
    skins: &dyn SkinResolver,
) -> Result<Model, ErrorKind> {
    let transform = Transform::read(cursor)?;
    let submesh_count = cursor.read_size("submesh count")?;
    let sequence_count = cursor.read_size("sequence count")?;
    let _flags = cursor.read_i32()?;

    let sequences = read_sequences(cursor, sequence_count)?;
    if sequence_count > 0 {
        check_frame_budget(&sequences, cursor.remaining())?;
    }
    let flat = flatten(&sequences);
    debug!(
        "BVM v2: {submesh_count} submeshes, {} sequences, {} frames",
        sequences.len(),
        flat.len()
    );

    let mut submeshes = Vec::with_capacity(submesh_count.min(cursor.remaining()));
    for index in 0..submesh_count {
        expect_ident(cursor, SUBMESH_IDENT, IdentBlock::Submesh)?;
        let diffuse = read_texture_names(cursor)?;
        let index_count = cursor.read_size("index count")?;
        let vertex_count = cursor.read_size("vertex count")?;
        let skin_count = cursor.read_size("skin count")?;

        let mut submesh = SubmeshGeometry::new(format!("submesh_{index}"), flat.len());
        submesh.skins.push(skin_path(&diffuse));
        submesh.skins.extend(read_skin_chain(cursor, skin_count)?);
        submesh.triangles = read_triangles(
            cursor,
            &submesh.name,
            index_count,
            vertex_count,
            Winding::Stored,
        )?;

        let capacity = vertex_count.min(cursor.remaining());
        let mut base_positions = Vec::with_capacity(capacity);
        let mut base_normals = Vec::with_capacity(capacity);
        submesh.uvs.reserve(capacity);
        for _ in 0..vertex_count {
            base_positions.push(transform.apply(cursor.read_vec3()?, 1.0));
            base_normals.push(cursor.read_vec3()?);
            submesh.uvs.push(cursor.read_vec2()?);
        }

        if sequence_count == 0 {
            submesh.positions[0] = base_positions;
            submesh.normals[0] = base_normals;
        } else {
            read_frame_blocks(cursor, &mut submesh, &sequences, &flat, &transform, vertex_count)?;
        }
        submeshes.push(submesh);
    }

    assemble(name, &flat, submeshes, skins)
}

/// One 32-byte v3 submesh table entry.
#[derive(Debug, Clone, Copy)]
struct SubmeshDescriptor {
    skin_count: usize,
    skin_offset: usize,
    vertex_count: usize,
    uv_offset: usize,
    index_count: usize,
    index_offset: usize,
    animation_offset: usize,
}

impl SubmeshDescriptor {
    fn read(cursor: &mut BinCursor<'_>) -> Result<SubmeshDescriptor, ErrorKind> {
        expect_ident(cursor, SUBMESH_IDENT, IdentBlock::Submesh)?;
        Ok(SubmeshDescriptor {
            skin_count: cursor.read_size("skin count")?,
            skin_offset: cursor.read_size("skin offset")?,
            vertex_count: cursor.read_size("vertex count")?,
            uv_offset: cursor.read_size("uv offset")?,
            index_count: cursor.read_size("index count")?,
            index_offset: cursor.read_size("index offset")?,
            animation_offset: cursor.read_size("animation offset")?,
        })
    }
}

fn decode_current(
    cursor: &mut BinCursor<'_>,
    name: &str,
    skins: &dyn SkinResolver,
) -> Result<Model, ErrorKind> {
    let transform = Transform::read(cursor)?;
    let _flags = cursor.read_i32()?;
    let _mins = cursor.read_vec3()?;
    let _maxs = cursor.read_vec3()?;
    let sequence_count = cursor.read_size("sequence count")?;
    let sequence_offset = cursor.read_size("sequence offset")?;
    let submesh_count = cursor.read_size("submesh count")?;
    let submesh_offset = cursor.read_size("submesh offset")?;
    let _metadata_size = cursor.read_i32()?;
    let _metadata_offset = cursor.read_i32()?;

    if sequence_count > 0 {
        cursor.seek(sequence_offset)?;
    }
    let sequences = read_sequences(cursor, sequence_count)?;
    if sequence_count > 0 {
        // sections may sit anywhere, so the whole buffer is the budget
        check_frame_budget(&sequences, cursor.len())?;
    }
    let flat = flatten(&sequences);
    debug!(
        "BVM v3: {submesh_count} submeshes, {} sequences, {} frames",
        sequences.len(),
        flat.len()
    );

    let mut descriptors = Vec::with_capacity(submesh_count.min(cursor.remaining()));
    if submesh_count > 0 {
        cursor.seek(submesh_offset)?;
    }
    for _ in 0..submesh_count {
        descriptors.push(SubmeshDescriptor::read(cursor)?);
    }

    let mut submeshes = Vec::with_capacity(descriptors.len());
    for (index, desc) in descriptors.iter().enumerate() {
        let mut submesh = SubmeshGeometry::new(format!("submesh_{index}"), flat.len());

        if desc.skin_count > 0 {
            cursor.seek(desc.skin_offset)?;
            submesh.skins = read_skin_chain(cursor, desc.skin_count)?;
        }

        cursor.seek(desc.uv_offset)?;
        submesh.uvs.reserve(desc.vertex_count.min(cursor.remaining()));
        for _ in 0..desc.vertex_count {
            submesh.uvs.push(cursor.read_vec2()?);
        }

        cursor.seek(desc.index_offset)?;
        submesh.triangles = read_triangles(
            cursor,
            &submesh.name,
            desc.index_count,
            desc.vertex_count,
            Winding::Swapped,
        )?;

        cursor.seek(desc.animation_offset)?;
        read_frame_blocks(cursor, &mut submesh, &sequences, &flat, &transform, desc.vertex_count)?;

        submeshes.push(submesh);
    }

    assemble(name, &flat, submeshes, skins)
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Reads the ident and version, returning the raw version number.
fn read_header(cursor: &mut BinCursor<'_>) -> Result<i32, ErrorKind> {
    expect_ident(cursor, BVM_IDENT, IdentBlock::Model)?;
    Ok(cursor.read_i32()?)
}

fn decode(
    cursor: &mut BinCursor<'_>,
    name: &str,
    skins: &dyn SkinResolver,
) -> Result<Model, ErrorKind> {
    let raw_version = read_header(cursor)?;
    let version = BvmVersion::from_raw(raw_version)?;
    debug!("decoding BVM model {name}, version {raw_version} ({version:?})");

    match version {
        BvmVersion::V1 => decode_v1(cursor, name, skins),
        BvmVersion::V2 => decode_v2(cursor, name, skins),
        BvmVersion::Current => decode_current(cursor, name, skins),
    }
}

/// Decode a BVM model starting at the cursor's position.
///
/// `name` becomes the model name (and the surface name for v1 files). Skin
/// paths are handed to `skins`; unresolvable skins do not fail the decode.
pub fn decode_model(
    cursor: &mut BinCursor<'_>,
    name: &str,
    skins: &dyn SkinResolver,
) -> IResult<Model> {
    decode(cursor, name, skins).map_err(|kind| {
        warn!("failed to decode BVM model {name}: {kind}");
        failure_from_kind(kind)
    })
}

/// Whether `path` looks like a BVM model this decoder can read.
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
    read_header(&mut reader).is_ok_and(|version| version <= CURRENT_VERSION)
}
