//! Topological (B-Rep-like) shapes and their holder.
//!
//! The holder carries the line/point display settings specific to shapes and
//! an explicit mesh cache. The cache is filled on first [`ObjectTopoShapeHolder::mesh`]
//! call and dropped whenever the shape is replaced or edited.

use std::sync::Arc;

use glam::Vec3;

use crate::viewport::mesh::{FaceId, TriMesh};
use crate::viewport::picking::Aabb;

/// Face of a shape, carried as its own triangulation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TopoFace {
    pub triangulation: TriMesh,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TopoShape {
    pub faces: Vec<TopoFace>,
    pub edges: Vec<Vec<Vec3>>,
    pub vertices: Vec<Vec3>,
}

impl TopoShape {
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn bounding_box(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        for face in &self.faces {
            aabb = aabb.union(&face.triangulation.bounding_box());
        }
        for edge in &self.edges {
            aabb = aabb.union(&Aabb::from_points(edge));
        }
        aabb.union(&Aabb::from_points(&self.vertices))
    }
}

/// Triangle → shape face lookup for a cached mesh
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriToTopoFaceMap(Vec<u32>);

impl TriToTopoFaceMap {
    pub fn topo_face(&self, tri: FaceId) -> Option<usize> {
        self.0.get(tri.0 as usize).map(|&f| f as usize)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
struct MeshCache {
    mesh: Option<Arc<TriMesh>>,
    face_map: TriToTopoFaceMap,
}

#[derive(Clone, Debug)]
pub struct ObjectTopoShapeHolder {
    shape: TopoShape,
    cache: MeshCache,
    line_width: f32,
    point_size: f32,
    needs_redraw: bool,
}

impl ObjectTopoShapeHolder {
    pub fn new(shape: TopoShape) -> Self {
        Self {
            shape,
            cache: MeshCache::default(),
            line_width: 1.0,
            point_size: 5.0,
            needs_redraw: false,
        }
    }

    pub fn shape(&self) -> &TopoShape {
        &self.shape
    }

    pub fn set_shape(&mut self, shape: TopoShape) {
        self.shape = shape;
        self.invalidate_mesh();
    }

    /// Mutable access to the shape; drops the cached mesh.
    pub fn shape_mut(&mut self) -> &mut TopoShape {
        self.invalidate_mesh();
        &mut self.shape
    }

    fn invalidate_mesh(&mut self) {
        self.cache = MeshCache::default();
        self.needs_redraw = true;
    }

    pub fn has_cached_mesh(&self) -> bool {
        self.cache.mesh.is_some()
    }

    /// Cached mesh if it was already extracted
    pub fn cached_mesh(&self) -> Option<&Arc<TriMesh>> {
        self.cache.mesh.as_ref()
    }

    /// Single triangle mesh of all faces, extracted on demand.
    /// Returns None for a shape without faces.
    pub fn mesh(&mut self) -> Option<Arc<TriMesh>> {
        if self.cache.mesh.is_none() {
            self.extract_mesh();
        }
        self.cache.mesh.clone()
    }

    pub fn face_of_triangle(&mut self, tri: FaceId) -> Option<usize> {
        self.mesh()?;
        self.cache.face_map.topo_face(tri)
    }

    fn extract_mesh(&mut self) {
        if self.shape.faces.is_empty() {
            return;
        }
        let mut mesh = TriMesh::default();
        let mut map = Vec::new();
        for (i, face) in self.shape.faces.iter().enumerate() {
            mesh.append(&face.triangulation);
            map.extend(std::iter::repeat_n(i as u32, face.triangulation.triangle_count()));
        }
        tracing::debug!(
            "Extracted mesh from shape: {} faces, {} triangles",
            self.shape.faces.len(),
            mesh.triangle_count()
        );
        self.cache = MeshCache {
            mesh: Some(Arc::new(mesh)),
            face_map: TriToTopoFaceMap(map),
        };
    }

    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    pub fn set_line_width(&mut self, width: f32) {
        if self.line_width == width {
            return;
        }
        self.line_width = width;
        self.needs_redraw = true;
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    pub fn set_point_size(&mut self, size: f32) {
        if self.point_size == size {
            return;
        }
        self.point_size = size;
        self.needs_redraw = true;
    }

    pub fn redraw_flag(&self) -> bool {
        self.needs_redraw
    }

    pub fn reset_redraw_flag(&mut self) {
        self.needs_redraw = false;
    }
}
