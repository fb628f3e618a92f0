//! Factory functions for test data: meshes, scene objects and scene
//! descriptions.

use glam::Vec3;
use shared::*;

use crate::scene::{ObjectKind, ObjectTopoShapeHolder, PointCloud, Polyline, SceneObject, TopoFace, TopoShape};
use crate::viewport::mesh::{self, TriMesh};

// ── Meshes ──────────────────────────────────────────────────────

/// Square of side `size` in the XY plane, centered at the origin,
/// facing +Z. Corners go (-,-) (+,-) (+,+) (-,+).
pub fn quad_mesh(size: f32) -> TriMesh {
    let h = size * 0.5;
    TriMesh::new(
        vec![
            Vec3::new(-h, -h, 0.0),
            Vec3::new(h, -h, 0.0),
            Vec3::new(h, h, 0.0),
            Vec3::new(-h, h, 0.0),
        ],
        vec![[0, 1, 2], [0, 2, 3]],
    )
}

/// Right triangle with legs of length `size` along +X and +Y, facing +Z.
pub fn triangle_mesh(size: f32) -> TriMesh {
    TriMesh::new(
        vec![Vec3::ZERO, Vec3::new(size, 0.0, 0.0), Vec3::new(0.0, size, 0.0)],
        vec![[0, 1, 2]],
    )
}

pub fn cube_mesh(size: f32) -> TriMesh {
    mesh::cube(size, size, size)
}

// ── Scene objects ───────────────────────────────────────────────

pub fn mesh_object(name: &str, mesh: TriMesh) -> SceneObject {
    SceneObject::new(name, ObjectKind::mesh(mesh))
}

pub fn quad_object(name: &str, size: f32) -> SceneObject {
    mesh_object(name, quad_mesh(size))
}

pub fn cube_object(name: &str, size: f32) -> SceneObject {
    mesh_object(name, cube_mesh(size))
}

pub fn group_object(name: &str) -> SceneObject {
    SceneObject::new(name, ObjectKind::Group)
}

pub fn points_object(name: &str, points: Vec<Vec3>) -> SceneObject {
    SceneObject::new(name, ObjectKind::Points(PointCloud::new(points)))
}

pub fn polyline_object(name: &str, points: Vec<Vec3>, closed: bool) -> SceneObject {
    SceneObject::new(name, ObjectKind::Lines(Polyline::new(points, closed)))
}

/// Shape with two faces: the unit quad at z = 0 and a triangle at z = 1.
pub fn two_face_shape() -> TopoShape {
    let mut upper = triangle_mesh(1.0);
    for p in &mut upper.points {
        p.z = 1.0;
    }
    TopoShape {
        faces: vec![
            TopoFace {
                triangulation: quad_mesh(1.0),
            },
            TopoFace { triangulation: upper },
        ],
        edges: vec![vec![Vec3::ZERO, Vec3::Z]],
        vertices: vec![Vec3::ZERO, Vec3::Z],
    }
}

pub fn shape_object(name: &str) -> SceneObject {
    SceneObject::new(name, ObjectKind::TopoShape(ObjectTopoShapeHolder::new(two_face_shape())))
}

// ── Scene descriptions ──────────────────────────────────────────

pub fn cube_desc(name: &str, w: f64, h: f64, d: f64) -> ObjectDescription {
    ObjectDescription::new(
        name,
        Geometry::Primitive {
            primitive: Primitive::Cube {
                width: w,
                height: h,
                depth: d,
            },
        },
    )
}

pub fn cube_desc_at(name: &str, size: f64, pos: [f64; 3]) -> ObjectDescription {
    ObjectDescription {
        transform: Transform::translation(pos),
        ..cube_desc(name, size, size, size)
    }
}

pub fn sphere_desc(name: &str, r: f64) -> ObjectDescription {
    ObjectDescription::new(
        name,
        Geometry::Primitive {
            primitive: Primitive::Sphere { radius: r },
        },
    )
}

pub fn group_desc(name: &str, children: Vec<ObjectDescription>) -> ObjectDescription {
    ObjectDescription {
        children,
        ..ObjectDescription::new(name, Geometry::Group)
    }
}

pub fn scene_desc(objects: Vec<ObjectDescription>) -> SceneDescription {
    SceneDescription {
        version: SCENE_FORMAT_VERSION,
        objects,
    }
}
