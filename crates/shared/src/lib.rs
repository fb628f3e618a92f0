use serde::{Deserialize, Serialize};

/// Текущая версия формата файла сцены
pub const SCENE_FORMAT_VERSION: u32 = 1;

/// Тип примитива
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Primitive {
    Cube {
        width: f64,
        height: f64,
        depth: f64,
    },
    Cylinder {
        radius: f64,
        height: f64,
    },
    Sphere {
        radius: f64,
    },
    Cone {
        radius: f64,
        height: f64,
    },
}

/// Трансформация объекта (углы поворота в градусах, порядок XYZ)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
}

impl Transform {
    pub fn new() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }

    pub fn translation(position: [f64; 3]) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    pub fn uniform_scale(scale: f64) -> Self {
        Self {
            scale: [scale; 3],
            ..Self::new()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// Цвет RGBA, 8 бит на канал
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Компоненты в диапазоне 0..1
    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

/// Треугольная сетка в локальных координатах объекта
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MeshDescription {
    pub points: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

/// Грань топологической формы: собственная триангуляция
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ShapeFaceDescription {
    pub points: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

/// Геометрия объекта сцены
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Primitive {
        primitive: Primitive,
    },
    Mesh {
        #[serde(flatten)]
        mesh: MeshDescription,
    },
    Points {
        points: Vec<[f32; 3]>,
        #[serde(default)]
        normals: Vec<[f32; 3]>,
    },
    Polyline {
        points: Vec<[f32; 3]>,
        #[serde(default)]
        closed: bool,
    },
    Shape {
        faces: Vec<ShapeFaceDescription>,
        #[serde(default)]
        edges: Vec<Vec<[f32; 3]>>,
        #[serde(default)]
        vertices: Vec<[f32; 3]>,
    },
    /// Узел-группа без собственной геометрии
    Group,
}

fn default_true() -> bool {
    true
}

/// Описание объекта сцены (дети принадлежат родителю)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescription {
    pub name: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub show_edges: bool,
    #[serde(default)]
    pub show_points: bool,
    #[serde(default)]
    pub flat_shading: bool,
    #[serde(default)]
    pub children: Vec<ObjectDescription>,
}

impl ObjectDescription {
    pub fn new(name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            name: name.into(),
            geometry,
            transform: Transform::new(),
            visible: true,
            selected: false,
            color: None,
            show_edges: false,
            show_points: false,
            flat_shading: false,
            children: Vec::new(),
        }
    }

    /// Общее число объектов в поддереве, включая сам объект
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(|c| c.count()).sum::<usize>()
    }
}

/// Полное описание сцены
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub objects: Vec<ObjectDescription>,
}

fn default_version() -> u32 {
    SCENE_FORMAT_VERSION
}

impl SceneDescription {
    pub fn new() -> Self {
        Self {
            version: SCENE_FORMAT_VERSION,
            objects: Vec::new(),
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.iter().map(|o| o.count()).sum()
    }
}

impl Default for SceneDescription {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<T: Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug>(val: &T) {
        let json = serde_json::to_string(val).expect("serialize");
        let back: T = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(*val, back);
    }

    // --- Primitive ---

    #[test]
    fn test_primitive_cube_serde() {
        let p = Primitive::Cube { width: 2.0, height: 3.0, depth: 1.5 };
        roundtrip(&p);
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains(r#""type":"cube""#));
    }

    // --- Geometry ---

    #[test]
    fn test_geometry_mesh_is_flattened() {
        let g = Geometry::Mesh {
            mesh: MeshDescription {
                points: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                triangles: vec![[0, 1, 2]],
            },
        };
        let json = serde_json::to_string(&g).unwrap();
        assert!(json.contains(r#""type":"mesh""#));
        assert!(json.contains(r#""triangles":[[0,1,2]]"#));
        roundtrip(&g);
    }

    #[test]
    fn test_points_normals_default_empty() {
        let json = r#"{"type":"points","points":[[1.0,2.0,3.0]]}"#;
        let g: Geometry = serde_json::from_str(json).unwrap();
        match g {
            Geometry::Points { points, normals } => {
                assert_eq!(points.len(), 1);
                assert!(normals.is_empty());
            }
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    // --- ObjectDescription ---

    #[test]
    fn test_object_defaults() {
        let json = r#"{"name":"a","geometry":{"type":"group"}}"#;
        let o: ObjectDescription = serde_json::from_str(json).unwrap();
        assert!(o.visible);
        assert!(!o.selected);
        assert_eq!(o.transform, Transform::new());
        assert!(o.color.is_none());
    }

    #[test]
    fn test_object_count_includes_children() {
        let mut root = ObjectDescription::new("root", Geometry::Group);
        let mut child = ObjectDescription::new("child", Geometry::Group);
        child.children.push(ObjectDescription::new("leaf", Geometry::Group));
        root.children.push(child);
        assert_eq!(root.count(), 3);

        let scene = SceneDescription {
            version: SCENE_FORMAT_VERSION,
            objects: vec![root, ObjectDescription::new("other", Geometry::Group)],
        };
        assert_eq!(scene.object_count(), 4);
    }

    #[test]
    fn test_scene_version_defaults() {
        let scene: SceneDescription = serde_json::from_str("{}").unwrap();
        assert_eq!(scene.version, SCENE_FORMAT_VERSION);
        assert!(scene.objects.is_empty());
    }

    #[test]
    fn test_color_to_f32() {
        let c = Color::rgba(255, 0, 51, 255);
        let f = c.to_f32();
        assert_eq!(f[0], 1.0);
        assert_eq!(f[1], 0.0);
        assert!((f[2] - 0.2).abs() < 1e-6);
        roundtrip(&c);
    }
}
