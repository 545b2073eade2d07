//! The decoded, renderer-facing model shared by every BVM revision.

use crate::data::skins::Material;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    pub fn contains(&self, point: [f32; 3]) -> bool {
        (0..3).all(|i| self.min[i] <= point[i] && point[i] <= self.max[i])
    }

    pub fn size(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

/// Accumulates points into a [`BoundingBox`].
#[derive(Debug, Clone, Default)]
pub struct BoundsBuilder {
    bounds: Option<BoundingBox>,
}

impl BoundsBuilder {
    pub fn add(&mut self, point: [f32; 3]) {
        match &mut self.bounds {
            Some(b) => {
                for i in 0..3 {
                    b.min[i] = b.min[i].min(point[i]);
                    b.max[i] = b.max[i].max(point[i]);
                }
            }
            None => {
                self.bounds = Some(BoundingBox {
                    min: point,
                    max: point,
                })
            }
        }
    }

    pub fn extend<'a>(&mut self, points: impl IntoIterator<Item = &'a [f32; 3]>) {
        for p in points {
            self.add(*p);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    /// The accumulated box, or a zero-sized box at the origin if nothing was added.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PitchType {
    Normal,
    MdlInverted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    ViewPlaneParallelUpright,
    FacingUpright,
    ViewPlaneParallel,
    Oriented,
    ViewPlaneParallelOriented,
}

/// A named animation frame with the bounds of every surface at that frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    pub name: String,
    pub bounds: BoundingBox,
}

/// A renderer vertex: transformed position, untouched normal, texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimType {
    Triangles,
}

/// A run of vertices drawn with one primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexRange {
    pub prim: PrimType,
    pub offset: usize,
    pub count: usize,
}

/// Vertex stream of one surface at one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMesh {
    /// Index into [`Model::frames`].
    pub frame: usize,
    pub vertices: Vec<ModelVertex>,
    pub ranges: Vec<IndexRange>,
}

/// An independently skinned group of triangles with one mesh per frame.
#[derive(Debug, Clone)]
pub struct Surface {
    pub name: String,
    pub skins: Vec<Material>,
    pub meshes: Vec<FrameMesh>,
}

impl Surface {
    pub fn mesh(&self, frame: usize) -> Option<&FrameMesh> {
        self.meshes.iter().find(|m| m.frame == frame)
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub pitch: PitchType,
    pub orientation: Orientation,
    pub surfaces: Vec<Surface>,
    pub frames: Vec<Frame>,
}

impl Model {
    pub fn frame(&self, name: &str) -> Option<(usize, &Frame)> {
        self.frames.iter().enumerate().find(|(_, f)| f.name == name)
    }
}
