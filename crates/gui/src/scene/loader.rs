//! Building a scene tree from the JSON scene description.

use std::path::Path;

use glam::{Affine3A, EulerRot, Quat, Vec3};
use shared::{Geometry, ObjectDescription, Primitive, SceneDescription, Transform, SCENE_FORMAT_VERSION};

use super::{
    ObjectId, ObjectKind, ObjectTopoShapeHolder, PointCloud, Polyline, SceneObject, SceneTree,
    TopoFace, TopoShape, ViewportMask, VisualProperty,
};
use crate::error::{Error, Result};
use crate::viewport::mesh::{self, TriMesh};

const SEGMENTS: u32 = 32;

pub fn transform_to_affine(t: &Transform) -> Affine3A {
    let rotation = Quat::from_euler(
        EulerRot::XYZ,
        (t.rotation[0] as f32).to_radians(),
        (t.rotation[1] as f32).to_radians(),
        (t.rotation[2] as f32).to_radians(),
    );
    Affine3A::from_scale_rotation_translation(
        Vec3::new(t.scale[0] as f32, t.scale[1] as f32, t.scale[2] as f32),
        rotation,
        Vec3::new(t.position[0] as f32, t.position[1] as f32, t.position[2] as f32),
    )
}

fn points(src: &[[f32; 3]]) -> Vec<Vec3> {
    src.iter().map(|p| Vec3::from_array(*p)).collect()
}

fn checked_mesh(name: &str, points_src: &[[f32; 3]], triangles: &[[u32; 3]]) -> Result<TriMesh> {
    let mesh = TriMesh::new(points(points_src), triangles.to_vec());
    mesh.validate().map_err(|reason| Error::InvalidGeometry {
        name: name.to_string(),
        reason,
    })?;
    Ok(mesh)
}

fn primitive_mesh(primitive: &Primitive) -> TriMesh {
    match *primitive {
        Primitive::Cube { width, height, depth } => {
            mesh::cube(width as f32, height as f32, depth as f32)
        }
        Primitive::Cylinder { radius, height } => {
            mesh::cylinder(radius as f32, height as f32, SEGMENTS)
        }
        Primitive::Sphere { radius } => mesh::sphere(radius as f32, SEGMENTS / 2, SEGMENTS),
        Primitive::Cone { radius, height } => mesh::cone(radius as f32, height as f32, SEGMENTS),
    }
}

fn object_kind(desc: &ObjectDescription) -> Result<ObjectKind> {
    let kind = match &desc.geometry {
        Geometry::Group => ObjectKind::Group,
        Geometry::Primitive { primitive } => ObjectKind::mesh(primitive_mesh(primitive)),
        Geometry::Mesh { mesh } => {
            ObjectKind::mesh(checked_mesh(&desc.name, &mesh.points, &mesh.triangles)?)
        }
        Geometry::Points { points: pts, normals } => {
            ObjectKind::Points(PointCloud::new(points(pts)).with_normals(points(normals)))
        }
        Geometry::Polyline { points: pts, closed } => {
            ObjectKind::Lines(Polyline::new(points(pts), *closed))
        }
        Geometry::Shape { faces, edges, vertices } => {
            let faces = faces
                .iter()
                .map(|f| {
                    checked_mesh(&desc.name, &f.points, &f.triangles)
                        .map(|triangulation| TopoFace { triangulation })
                })
                .collect::<Result<Vec<_>>>()?;
            ObjectKind::TopoShape(ObjectTopoShapeHolder::new(TopoShape {
                faces,
                edges: edges.iter().map(|e| points(e)).collect(),
                vertices: points(vertices),
            }))
        }
    };
    Ok(kind)
}

impl SceneTree {
    pub fn from_description(desc: &SceneDescription) -> Result<Self> {
        if desc.version > SCENE_FORMAT_VERSION {
            return Err(Error::UnsupportedVersion(desc.version));
        }
        let mut tree = SceneTree::new();
        for object in &desc.objects {
            tree.add_description(None, object)?;
        }
        tracing::info!("Loaded scene ({} objects)", tree.len());
        Ok(tree)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let desc: SceneDescription = serde_json::from_str(&json)?;
        Self::from_description(&desc)
    }

    /// Add one described object and its children
    pub fn add_description(
        &mut self,
        parent: Option<ObjectId>,
        desc: &ObjectDescription,
    ) -> Result<ObjectId> {
        let mut object = SceneObject::new(desc.name.clone(), object_kind(desc)?)
            .with_xf(transform_to_affine(&desc.transform));
        object.set_visible(desc.visible, ViewportMask::ALL);
        object.select(desc.selected);

        let visual = object.visual_mut();
        if let Some(color) = desc.color {
            visual.set_front_color(color, false, None);
        }
        visual.set_property(VisualProperty::Edges, desc.show_edges, ViewportMask::ALL);
        visual.set_property(VisualProperty::Points, desc.show_points, ViewportMask::ALL);
        visual.set_property(VisualProperty::FlatShading, desc.flat_shading, ViewportMask::ALL);

        let id = self.add(parent, object)?;
        for child in &desc.children {
            self.add_description(Some(id), child)?;
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ViewportId;

    const SCENE: &str = r#"{
        "version": 1,
        "objects": [
            {
                "name": "part",
                "geometry": {"type": "primitive", "primitive": {"type": "cube", "width": 1.0, "height": 1.0, "depth": 1.0}},
                "transform": {"position": [1.0, 0.0, 0.0], "rotation": [0.0, 0.0, 0.0], "scale": [2.0, 2.0, 2.0]},
                "show_edges": true,
                "children": [
                    {"name": "cloud", "geometry": {"type": "points", "points": [[0,0,0],[1,0,0]]}, "visible": false}
                ]
            },
            {
                "name": "tri",
                "geometry": {"type": "mesh", "points": [[0,0,0],[1,0,0],[0,1,0]], "triangles": [[0,1,2]]},
                "color": {"r": 10, "g": 20, "b": 30, "a": 255}
            }
        ]
    }"#;

    #[test]
    fn test_load_scene_description() {
        let desc: SceneDescription = serde_json::from_str(SCENE).unwrap();
        let tree = SceneTree::from_description(&desc).unwrap();
        assert_eq!(tree.len(), 3);

        let roots = tree.roots().to_vec();
        let part = tree.get(roots[0]).unwrap();
        assert_eq!(part.name(), "part");
        assert!(part.visual().property(VisualProperty::Edges, ViewportId::MAIN));
        assert_eq!(part.xf().transform_point3(Vec3::ZERO), Vec3::X);

        let cloud = part.children()[0];
        assert!(!tree.is_visible(cloud, ViewportId::MAIN));
        assert_eq!(tree.get(cloud).unwrap().point_cloud().unwrap().points.len(), 2);

        let tri = tree.get(roots[1]).unwrap();
        assert_eq!(
            tri.visual().front_color(false, ViewportId::MAIN),
            shared::Color::rgb(10, 20, 30)
        );
    }

    #[test]
    fn test_bad_triangle_index_is_rejected() {
        let mut desc = SceneDescription::new();
        desc.objects.push(ObjectDescription::new(
            "broken",
            Geometry::Mesh {
                mesh: shared::MeshDescription {
                    points: vec![[0.0; 3]],
                    triangles: vec![[0, 1, 2]],
                },
            },
        ));
        assert!(matches!(
            SceneTree::from_description(&desc),
            Err(Error::InvalidGeometry { name, .. }) if name == "broken"
        ));
    }

    #[test]
    fn test_future_version_is_rejected() {
        let desc = SceneDescription {
            version: SCENE_FORMAT_VERSION + 1,
            objects: Vec::new(),
        };
        assert!(matches!(
            SceneTree::from_description(&desc),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_transform_rotation_degrees() {
        let t = Transform {
            rotation: [0.0, 0.0, 90.0],
            ..Transform::new()
        };
        let p = transform_to_affine(&t).transform_point3(Vec3::X);
        assert!((p - Vec3::Y).length() < 1e-6);
    }
}
