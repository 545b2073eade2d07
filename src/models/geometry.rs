//! Turns per-submesh, per-frame vertex data into renderer vertex streams.
//!
//! All BVM revisions decode into [`SubmeshGeometry`] first. Frame bounds need
//! every submesh's contribution, so meshes are only emitted once all
//! submeshes have been read and the frame list exists.

use tracing::debug;

use crate::data::skins::SkinResolver;
use crate::error::ErrorKind;
use crate::models::model::{
    BoundsBuilder, Frame, FrameMesh, IndexRange, Model, ModelVertex, Orientation, PitchType,
    PrimType, Surface,
};
use crate::models::sequence::FlatFrame;

/// Three indices into a submesh's per-frame vertex arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub vertices: [usize; 3],
}

/// Fully materialized geometry of one submesh.
#[derive(Debug, Clone, Default)]
pub struct SubmeshGeometry {
    pub name: String,
    /// Skin paths; the submesh's own diffuse first where the revision has one.
    pub skins: Vec<String>,
    pub triangles: Vec<Triangle>,
    /// Texture coordinates, shared by every frame.
    pub uvs: Vec<[f32; 2]>,
    /// Transformed positions, indexed by flat frame.
    pub positions: Vec<Vec<[f32; 3]>>,
    /// Normals, indexed by flat frame.
    pub normals: Vec<Vec<[f32; 3]>>,
}

impl SubmeshGeometry {
    pub fn new(name: impl Into<String>, frame_count: usize) -> Self {
        Self {
            name: name.into(),
            positions: vec![Vec::new(); frame_count],
            normals: vec![Vec::new(); frame_count],
            ..Default::default()
        }
    }

    /// Builds the vertex stream for one frame, three vertices per triangle.
    pub fn frame_vertices(&self, frame: usize) -> Result<Vec<ModelVertex>, ErrorKind> {
        let empty = Vec::new();
        let positions = self.positions.get(frame).unwrap_or(&empty);
        let normals = self.normals.get(frame).unwrap_or(&empty);

        let mut vertices = Vec::with_capacity(self.triangles.len() * 3);
        for triangle in &self.triangles {
            for &index in &triangle.vertices {
                let (Some(position), Some(normal), Some(uv)) =
                    (positions.get(index), normals.get(index), self.uvs.get(index))
                else {
                    return Err(ErrorKind::IndexOutOfRange {
                        surface: self.name.clone(),
                        index: index as i64,
                        vertex_count: positions.len().min(self.uvs.len()),
                    });
                };
                vertices.push(ModelVertex {
                    position: *position,
                    normal: *normal,
                    uv: *uv,
                });
            }
        }
        Ok(vertices)
    }
}

/// Builds the final model: frames with union bounds, then one mesh per (surface, frame).
pub fn assemble(
    name: &str,
    flat_frames: &[FlatFrame],
    submeshes: Vec<SubmeshGeometry>,
    skins: &dyn SkinResolver,
) -> Result<Model, ErrorKind> {
    let mut frame_bounds = vec![BoundsBuilder::default(); flat_frames.len()];
    for submesh in &submeshes {
        for (bounds, positions) in frame_bounds.iter_mut().zip(&submesh.positions) {
            bounds.extend(positions);
        }
    }

    let frames: Vec<Frame> = flat_frames
        .iter()
        .zip(&frame_bounds)
        .map(|(flat, bounds)| Frame {
            name: flat.name.clone(),
            bounds: bounds.bounds(),
        })
        .collect();

    let mut surfaces = Vec::with_capacity(submeshes.len());
    for submesh in submeshes {
        let range = IndexRange {
            prim: PrimType::Triangles,
            offset: 0,
            count: submesh.triangles.len() * 3,
        };

        let mut meshes = Vec::with_capacity(frames.len());
        for frame in 0..frames.len() {
            meshes.push(FrameMesh {
                frame,
                vertices: submesh.frame_vertices(frame)?,
                ranges: vec![range],
            });
        }

        let materials = submesh.skins.iter().map(|skin| skins.resolve(skin)).collect();
        debug!(
            "surface {}: {} triangles, {} skins, {} frames",
            submesh.name,
            submesh.triangles.len(),
            submesh.skins.len(),
            meshes.len()
        );
        surfaces.push(Surface {
            name: submesh.name,
            skins: materials,
            meshes,
        });
    }

    Ok(Model {
        name: name.to_string(),
        pitch: PitchType::Normal,
        orientation: Orientation::Oriented,
        surfaces,
        frames,
    })
}
