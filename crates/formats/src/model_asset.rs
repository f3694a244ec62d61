//! Model asset documents: a named mesh with parallel position/normal arrays.
//!
//! ```json
//! {
//!   "name": "cube",
//!   "dataArrays": { "position": [x, y, z, ...], "normal": [x, y, z, ...] },
//!   "meshes": [ { "indices": [0, 1, 2, ...] } ]
//! }
//! ```
//!
//! Only the first mesh is honored; additional meshes are ignored.

use std::fmt;

use serde::de::{Deserializer, IgnoredAny, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::error::Category;

/// One interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl ModelVertex {
    pub const FLOATS: usize = 6;
    /// Byte stride between consecutive vertices.
    pub const STRIDE: usize = size_of::<Self>();
    pub const POSITION_OFFSET: usize = std::mem::offset_of!(Self, position);
    pub const NORMAL_OFFSET: usize = std::mem::offset_of!(Self, normal);
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed model document: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("invalid model document: {0}")]
    Invalid(#[source] serde_json::Error),
    #[error(
        "there should be as many normals as vertex positions: {positions} positions, {normals} normals"
    )]
    MismatchedArrays { positions: usize, normals: usize },
    #[error("vertex arrays must hold xyz triples, got {len} values")]
    NotTriples { len: usize },
    #[error("model document has no meshes")]
    NoMesh,
    #[error("index {index} at slot {slot} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        slot: usize,
        index: u32,
        vertex_count: usize,
    },
}

impl DecodeError {
    fn from_json(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Data => DecodeError::Invalid(err),
            Category::Io | Category::Syntax | Category::Eof => DecodeError::Malformed(err),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelDocument {
    name: String,
    data_arrays: DataArrays,
    meshes: Meshes,
}

#[derive(Debug, Deserialize)]
struct DataArrays {
    position: Vec<f32>,
    normal: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct MeshDocument {
    indices: Vec<u32>,
}

/// The `meshes` array: the first element is decoded, the rest are skipped
/// unread apart from being counted.
#[derive(Debug)]
struct Meshes {
    first: Option<MeshDocument>,
    count: usize,
}

impl<'de> Deserialize<'de> for Meshes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MeshesVisitor;

        impl<'de> Visitor<'de> for MeshesVisitor {
            type Value = Meshes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array of meshes")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Meshes, A::Error> {
                let first = seq.next_element::<MeshDocument>()?;
                let mut count = usize::from(first.is_some());
                while seq.next_element::<IgnoredAny>()?.is_some() {
                    count += 1;
                }
                Ok(Meshes { first, count })
            }
        }

        deserializer.deserialize_seq(MeshesVisitor)
    }
}

/// Geometry ready for upload: interleaved vertices plus a `u32` index list.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedModel {
    name: String,
    vertices: Vec<ModelVertex>,
    indices: Vec<u32>,
}

impl DecodedModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[ModelVertex] {
        &self.vertices
    }

    /// Interleaved `position.xyz, normal.xyz` floats, six per vertex.
    pub fn vertex_data(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Axis-aligned bounds of the vertex positions, `None` for an empty mesh.
    pub fn position_bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = self.vertices.first()?.position;
        let bounds = self.vertices.iter().fold((first, first), |(mut lo, mut hi), v| {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(v.position[axis]);
                hi[axis] = hi[axis].max(v.position[axis]);
            }
            (lo, hi)
        });
        Some(bounds)
    }

    fn from_document(doc: ModelDocument) -> Result<Self, DecodeError> {
        let DataArrays { position, normal } = doc.data_arrays;
        if position.len() != normal.len() {
            return Err(DecodeError::MismatchedArrays {
                positions: position.len(),
                normals: normal.len(),
            });
        }
        if position.len() % 3 != 0 {
            return Err(DecodeError::NotTriples {
                len: position.len(),
            });
        }

        let mesh_count = doc.meshes.count;
        let mesh = doc.meshes.first.ok_or(DecodeError::NoMesh)?;
        if mesh_count > 1 {
            tracing::debug!(
                model = %doc.name,
                ignored = mesh_count - 1,
                "model has several meshes, only the first is used"
            );
        }

        let vertices: Vec<ModelVertex> = position
            .chunks_exact(3)
            .zip(normal.chunks_exact(3))
            .map(|(p, n)| ModelVertex {
                position: [p[0], p[1], p[2]],
                normal: [n[0], n[1], n[2]],
            })
            .collect();

        if let Some((slot, &index)) = mesh
            .indices
            .iter()
            .enumerate()
            .find(|(_, i)| **i as usize >= vertices.len())
        {
            return Err(DecodeError::IndexOutOfRange {
                slot,
                index,
                vertex_count: vertices.len(),
            });
        }

        Ok(Self {
            name: doc.name,
            vertices,
            indices: mesh.indices,
        })
    }
}

/// Decode a model document. Either the whole model decodes or an error is returned.
pub fn decode_model(text: &str) -> Result<DecodedModel, DecodeError> {
    let doc: ModelDocument = serde_json::from_str(text).map_err(DecodeError::from_json)?;
    DecodedModel::from_document(doc)
}

pub fn decode_model_bytes(bytes: &[u8]) -> Result<DecodedModel, DecodeError> {
    let doc: ModelDocument = serde_json::from_slice(bytes).map_err(DecodeError::from_json)?;
    DecodedModel::from_document(doc)
}
