//! Read-only geometry adapter handed to the rendering context.
//!
//! Nodes are addressed `0..node_count`, elements (triangles)
//! `0..element_count` and links (segments) `0..link_count`.

use std::ops::Range;
use std::sync::Arc;

use glam::Vec3;

use crate::scene::{PointCloud, Polyline, TopoShape};
use crate::viewport::mesh::{FaceId, TriMesh, VertId};
use crate::viewport::picking::Aabb;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeomType {
    Node,
    Face,
}

#[derive(Clone, Debug, Default)]
pub struct MeshDataSource {
    mesh: Arc<TriMesh>,
    links: Vec<[u32; 2]>,
    node_normals: Vec<Vec3>,
    /// Links are feature edges shown on demand instead of the triangle
    /// wireframe
    feature_edges: bool,
    /// Nodes drawn as points; None means all of them
    point_nodes: Option<Range<u32>>,
}

impl MeshDataSource {
    pub fn from_mesh(mesh: Arc<TriMesh>) -> Self {
        let node_normals = mesh.vertex_normals();
        Self {
            mesh,
            node_normals,
            ..Self::default()
        }
    }

    /// Face triangulation followed by the shape's edge polylines and its
    /// vertices. Triangle and corner ids match `faces`; edge points and
    /// shape vertices are appended after the triangulation nodes.
    pub fn from_shape(faces: Option<Arc<TriMesh>>, shape: &TopoShape) -> Self {
        let (mut points, triangles, node_normals) = match &faces {
            Some(mesh) => (mesh.points.clone(), mesh.triangles.clone(), mesh.vertex_normals()),
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        let mut links = Vec::new();
        for edge in &shape.edges {
            let first = points.len() as u32;
            points.extend_from_slice(edge);
            links.extend((1..edge.len() as u32).map(|i| [first + i - 1, first + i]));
        }

        let vertices_start = points.len() as u32;
        points.extend_from_slice(&shape.vertices);
        let vertices_end = points.len() as u32;

        Self {
            mesh: Arc::new(TriMesh::new(points, triangles)),
            links,
            node_normals,
            feature_edges: true,
            point_nodes: Some(vertices_start..vertices_end),
        }
    }

    /// Nodes only; normals come from the cloud when it has them
    pub fn from_points(cloud: &PointCloud) -> Self {
        Self {
            mesh: Arc::new(TriMesh::new(cloud.points.clone(), Vec::new())),
            node_normals: cloud.normals.clone(),
            ..Self::default()
        }
    }

    pub fn from_polyline(line: &Polyline) -> Self {
        Self {
            mesh: Arc::new(TriMesh::new(line.points.clone(), Vec::new())),
            links: line.segments(),
            ..Self::default()
        }
    }

    pub fn mesh(&self) -> &Arc<TriMesh> {
        &self.mesh
    }

    pub fn node_count(&self) -> usize {
        self.mesh.point_count()
    }

    pub fn element_count(&self) -> usize {
        self.mesh.triangle_count()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn all_nodes(&self) -> Range<u32> {
        0..self.node_count() as u32
    }

    pub fn all_elements(&self) -> Range<u32> {
        0..self.element_count() as u32
    }

    pub fn links(&self) -> &[[u32; 2]] {
        &self.links
    }

    /// Whether the links are feature edges, drawn only when edges are shown
    pub fn has_feature_edges(&self) -> bool {
        self.feature_edges
    }

    /// Nodes drawn when the drawer displays nodes
    pub fn point_nodes(&self) -> Range<u32> {
        self.point_nodes.clone().unwrap_or_else(|| self.all_nodes())
    }

    pub fn node(&self, id: VertId) -> Option<Vec3> {
        self.mesh.points.get(id.0 as usize).copied()
    }

    /// Flat coordinates: 9 for an element, 3 for a node
    pub fn geom(&self, id: u32, is_element: bool) -> Option<Vec<f32>> {
        if is_element {
            let tri = self.mesh.triangle(FaceId(id))?;
            Some(tri.iter().flat_map(|p| p.to_array()).collect())
        } else {
            self.node(VertId(id)).map(|p| p.to_array().to_vec())
        }
    }

    pub fn geom_type(&self, id: u32, is_element: bool) -> Option<GeomType> {
        if is_element {
            ((id as usize) < self.element_count()).then_some(GeomType::Face)
        } else {
            ((id as usize) < self.node_count()).then_some(GeomType::Node)
        }
    }

    pub fn nodes_by_element(&self, id: u32) -> Option<[u32; 3]> {
        self.mesh.tri_vertices(FaceId(id))
    }

    /// Unit face normal
    pub fn normal(&self, face: u32) -> Option<Vec3> {
        self.mesh.normal(FaceId(face))
    }

    /// Normal of the `rank`-th corner (0..3) of a face
    pub fn node_normal(&self, rank: usize, face: u32) -> Option<Vec3> {
        if rank >= 3 {
            return None;
        }
        let verts = self.nodes_by_element(face)?;
        self.node_normals.get(verts[rank] as usize).copied()
    }

    /// Three normals for a face: per corner when `nodal`, else the face
    /// normal repeated
    pub fn normals_by_element(&self, face: u32, nodal: bool) -> Option<[Vec3; 3]> {
        if nodal {
            Some([
                self.node_normal(0, face)?,
                self.node_normal(1, face)?,
                self.node_normal(2, face)?,
            ])
        } else {
            self.normal(face).map(|n| [n; 3])
        }
    }

    /// Stored normal of a node, if the source has one
    pub fn point_normal(&self, id: VertId) -> Option<Vec3> {
        self.node_normals.get(id.0 as usize).copied()
    }

    pub fn bounding_box(&self) -> Aabb {
        self.mesh.bounding_box()
    }
}
