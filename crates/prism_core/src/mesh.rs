//! Triangle mesh storage.
//!
//! Faces reference a shared pool of positions, normals and texture
//! coordinates by 0-based index. A face corner may omit its UV or normal
//! index, mirroring the `v`, `v/vt`, `v//vn` and `v/vt/vn` corner forms of the
//! scene format.

use prism_math::{Vec2, Vec3};

/// One corner of a face: indices into the mesh's attribute pools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FaceVertex {
    pub position: usize,
    pub uv: Option<usize>,
    pub normal: Option<usize>,
}

impl FaceVertex {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            uv: None,
            normal: None,
        }
    }

    pub fn with_uv(mut self, uv: usize) -> Self {
        self.uv = Some(uv);
        self
    }

    pub fn with_normal(mut self, normal: usize) -> Self {
        self.normal = Some(normal);
        self
    }
}

/// A triangle with its bound material, texture and normal map.
#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    pub vertices: [FaceVertex; 3],

    /// Index into `Scene::materials`
    pub material: usize,

    /// Index into `Scene::textures`
    pub texture: Option<usize>,

    /// Index into `Scene::normal_maps`
    pub normal_map: Option<usize>,
}

impl Face {
    pub fn new(vertices: [FaceVertex; 3], material: usize) -> Self {
        Self {
            vertices,
            material,
            texture: None,
            normal_map: None,
        }
    }

    /// True when every corner carries a texture coordinate.
    pub fn has_uvs(&self) -> bool {
        self.vertices.iter().all(|v| v.uv.is_some())
    }

    /// True when every corner carries a vertex normal.
    pub fn has_normals(&self) -> bool {
        self.vertices.iter().all(|v| v.normal.is_some())
    }
}

/// Shared vertex pools plus the faces that index them.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    /// Vertex positions (`v`)
    pub positions: Vec<Vec3>,

    /// Vertex normals (`vn`)
    pub normals: Vec<Vec3>,

    /// Texture coordinates (`vt`)
    pub uvs: Vec<Vec2>,

    pub faces: Vec<Face>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Corner positions of a face.
    pub fn face_positions(&self, face: &Face) -> [Vec3; 3] {
        face.vertices.map(|v| self.positions[v.position])
    }

    /// Corner texture coordinates, if every corner has one.
    pub fn face_uvs(&self, face: &Face) -> Option<[Vec2; 3]> {
        let [a, b, c] = face.vertices;
        Some([
            self.uvs[a.uv?],
            self.uvs[b.uv?],
            self.uvs[c.uv?],
        ])
    }

    /// Corner normals, if every corner has one.
    pub fn face_normals(&self, face: &Face) -> Option<[Vec3; 3]> {
        let [a, b, c] = face.vertices;
        Some([
            self.normals[a.normal?],
            self.normals[b.normal?],
            self.normals[c.normal?],
        ])
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}
