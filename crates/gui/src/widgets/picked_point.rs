//! Representation-independent locations on a target object.

use glam::Vec3;

use crate::render::{PickElement, PickHit};
use crate::scene::{Capabilities, EdgePoint, ObjectKind, SceneObject};
use crate::viewport::mesh::{MeshTriPoint, VertId};

/// Location on a target: a mesh face, a polyline segment or a cloud vertex
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum PickedPoint {
    #[default]
    None,
    Mesh(MeshTriPoint),
    Edge(EdgePoint),
    Vertex(VertId),
}

impl PickedPoint {
    pub fn is_none(&self) -> bool {
        matches!(self, PickedPoint::None)
    }
}

/// Raw pick result in the object's local coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointOnObject {
    pub point: Vec3,
    pub element: Option<PickElement>,
}

impl PointOnObject {
    pub fn at(point: Vec3) -> Self {
        Self { point, element: None }
    }
}

impl From<&PickHit> for PointOnObject {
    fn from(hit: &PickHit) -> Self {
        Self {
            point: hit.local_point,
            element: Some(hit.element),
        }
    }
}

/// Turn a raw pick into a location on `object`. Without an element the
/// nearest vertex or segment point is used; meshes need a face.
pub fn to_picked_point(object: &SceneObject, pick: &PointOnObject) -> PickedPoint {
    if object.capabilities().contains(Capabilities::TRIANGLE_MESH) {
        return match pick.element {
            Some(PickElement::Face { face, bary }) => PickedPoint::Mesh(MeshTriPoint::new(face, bary)),
            _ => PickedPoint::None,
        };
    }
    match object.kind() {
        ObjectKind::Points(cloud) => match pick.element {
            Some(PickElement::Node(v)) => PickedPoint::Vertex(v),
            _ => cloud
                .points
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.distance_squared(pick.point)
                        .total_cmp(&b.distance_squared(pick.point))
                })
                .map_or(PickedPoint::None, |(i, _)| PickedPoint::Vertex(VertId(i as u32))),
        },
        ObjectKind::Lines(line) => match pick.element {
            Some(PickElement::Link { segment, t }) => PickedPoint::Edge(EdgePoint { segment, t }),
            _ => line
                .closest_point(pick.point)
                .map_or(PickedPoint::None, PickedPoint::Edge),
        },
        _ => PickedPoint::None,
    }
}

/// Local coordinates of a picked point on `object`
pub fn find_coords(object: &mut SceneObject, picked: &PickedPoint) -> Option<Vec3> {
    match picked {
        PickedPoint::None => None,
        PickedPoint::Mesh(mtp) => object.triangle_mesh()?.tri_point(mtp),
        PickedPoint::Edge(ep) => object.polyline()?.edge_point(ep),
        PickedPoint::Vertex(v) => match object.kind() {
            ObjectKind::Points(cloud) => cloud.point(*v),
            _ => object.triangle_mesh()?.points.get(v.0 as usize).copied(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{PointCloud, Polyline};
    use crate::viewport::mesh::{FaceId, TriMesh};

    #[test]
    fn test_mesh_pick_requires_face() {
        let mut tri = SceneObject::new(
            "tri",
            ObjectKind::mesh(TriMesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![[0, 1, 2]])),
        );
        assert_eq!(to_picked_point(&tri, &PointOnObject::at(Vec3::ZERO)), PickedPoint::None);

        let pick = PointOnObject {
            point: Vec3::new(0.25, 0.25, 0.0),
            element: Some(PickElement::Face {
                face: FaceId(0),
                bary: [0.5, 0.25, 0.25],
            }),
        };
        let picked = to_picked_point(&tri, &pick);
        let p = find_coords(&mut tri, &picked).unwrap();
        assert!((p - Vec3::new(0.25, 0.25, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_cloud_falls_back_to_nearest_vertex() {
        let mut cloud = SceneObject::new(
            "cloud",
            ObjectKind::Points(PointCloud::new(vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)])),
        );
        let picked = to_picked_point(&cloud, &PointOnObject::at(Vec3::new(1.8, 0.1, 0.0)));
        assert_eq!(picked, PickedPoint::Vertex(VertId(1)));
        assert_eq!(find_coords(&mut cloud, &picked), Some(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_polyline_edge_point() {
        let mut line = SceneObject::new(
            "line",
            ObjectKind::Lines(Polyline::new(vec![Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)], false)),
        );
        let picked = to_picked_point(&line, &PointOnObject::at(Vec3::new(1.0, 1.0, 0.0)));
        assert_eq!(find_coords(&mut line, &picked), Some(Vec3::new(1.0, 0.0, 0.0)));
    }
}
