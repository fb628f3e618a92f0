use glam::Vec3;

use super::picking::Aabb;

/// Triangle index into [`TriMesh::triangles`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(pub u32);

/// Vertex index into [`TriMesh::points`] or a point cloud
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertId(pub u32);

/// Indexed triangle mesh in object-local coordinates
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriMesh {
    pub points: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

/// Point on a triangle: face plus barycentric weights of its three corners
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshTriPoint {
    pub face: FaceId,
    pub bary: [f32; 3],
}

const BARY_EPS: f32 = 1e-6;

impl MeshTriPoint {
    pub fn new(face: FaceId, bary: [f32; 3]) -> Self {
        Self { face, bary }
    }

    /// Corner `k` of the face
    pub fn corner(face: FaceId, k: usize) -> Self {
        let mut bary = [0.0; 3];
        bary[k % 3] = 1.0;
        Self { face, bary }
    }

    pub fn face_center(face: FaceId) -> Self {
        Self {
            face,
            bary: [1.0 / 3.0; 3],
        }
    }

    /// Point on edge `k` (from corner `k` to corner `k + 1`) at parameter `t`
    pub fn on_edge_at(face: FaceId, k: usize, t: f32) -> Self {
        let mut bary = [0.0; 3];
        bary[k % 3] = 1.0 - t;
        bary[(k + 1) % 3] = t;
        Self { face, bary }
    }

    /// Index of the edge this point lies on, if any
    pub fn on_edge(&self) -> Option<usize> {
        (0..3).find(|&k| self.bary[(k + 2) % 3].abs() <= BARY_EPS)
    }

    /// Index of the corner this point coincides with, if any
    pub fn in_vertex(&self) -> Option<usize> {
        (0..3).find(|&k| (self.bary[k] - 1.0).abs() <= BARY_EPS)
    }
}

impl TriMesh {
    pub fn new(points: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self { points, triangles }
    }

    /// Check that every triangle references existing points
    pub fn validate(&self) -> Result<(), String> {
        let n = self.points.len() as u32;
        for (i, tri) in self.triangles.iter().enumerate() {
            if tri.iter().any(|&v| v >= n) {
                return Err(format!("triangle {i} references a vertex out of range (have {n})"));
            }
        }
        Ok(())
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn tri_vertices(&self, face: FaceId) -> Option<[u32; 3]> {
        self.triangles.get(face.0 as usize).copied()
    }

    pub fn triangle(&self, face: FaceId) -> Option<[Vec3; 3]> {
        let [a, b, c] = self.tri_vertices(face)?;
        Some([
            *self.points.get(a as usize)?,
            *self.points.get(b as usize)?,
            *self.points.get(c as usize)?,
        ])
    }

    pub fn tri_center(&self, face: FaceId) -> Option<Vec3> {
        let [a, b, c] = self.triangle(face)?;
        Some((a + b + c) / 3.0)
    }

    /// Unnormalized face normal with length equal to twice the face area
    pub fn dir_dbl_area(&self, face: FaceId) -> Option<Vec3> {
        let [a, b, c] = self.triangle(face)?;
        Some((b - a).cross(c - a))
    }

    pub fn normal(&self, face: FaceId) -> Option<Vec3> {
        self.dir_dbl_area(face).map(|n| n.normalize_or_zero())
    }

    /// Area-weighted vertex normals
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.points.len()];
        for (i, tri) in self.triangles.iter().enumerate() {
            if let Some(n) = self.dir_dbl_area(FaceId(i as u32)) {
                for &v in tri {
                    if let Some(slot) = normals.get_mut(v as usize) {
                        *slot += n;
                    }
                }
            }
        }
        for n in &mut normals {
            *n = n.normalize_or_zero();
        }
        normals
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(&self.points)
    }

    pub fn tri_point(&self, p: &MeshTriPoint) -> Option<Vec3> {
        let [a, b, c] = self.triangle(p.face)?;
        Some(a * p.bary[0] + b * p.bary[1] + c * p.bary[2])
    }

    /// Barycentric location of `p` projected onto the face plane
    pub fn to_tri_point(&self, face: FaceId, p: Vec3) -> Option<MeshTriPoint> {
        let [a, b, c] = self.triangle(face)?;
        let v0 = b - a;
        let v1 = c - a;
        let v2 = p - a;
        let d00 = v0.dot(v0);
        let d01 = v0.dot(v1);
        let d11 = v1.dot(v1);
        let d20 = v2.dot(v0);
        let d21 = v2.dot(v1);
        let denom = d00 * d11 - d01 * d01;
        if denom.abs() <= f32::EPSILON {
            return Some(MeshTriPoint::corner(face, 0));
        }
        let v = (d11 * d20 - d01 * d21) / denom;
        let w = (d00 * d21 - d01 * d20) / denom;
        Some(MeshTriPoint::new(face, [1.0 - v - w, v, w]))
    }

    /// Append another mesh, offsetting its indices
    pub fn append(&mut self, other: &TriMesh) {
        let offset = self.points.len() as u32;
        self.points.extend_from_slice(&other.points);
        self.triangles.extend(
            other
                .triangles
                .iter()
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
    }
}

/// Lines mesh: interleaved [pos.x, pos.y, pos.z, r, g, b, a]
pub struct LineMeshData {
    /// 7 floats per vertex: position(3) + color(4)
    pub vertices: Vec<f32>,
}

// ── Primitive generation ─────────────────────────────────────

pub fn cube(w: f32, h: f32, d: f32) -> TriMesh {
    let hw = w * 0.5;
    let hh = h * 0.5;
    let hd = d * 0.5;

    let faces: [[Vec3; 4]; 6] = [
        // Front (+Z)
        [Vec3::new(-hw, -hh, hd), Vec3::new(hw, -hh, hd), Vec3::new(hw, hh, hd), Vec3::new(-hw, hh, hd)],
        // Back (-Z)
        [Vec3::new(hw, -hh, -hd), Vec3::new(-hw, -hh, -hd), Vec3::new(-hw, hh, -hd), Vec3::new(hw, hh, -hd)],
        // Right (+X)
        [Vec3::new(hw, -hh, hd), Vec3::new(hw, -hh, -hd), Vec3::new(hw, hh, -hd), Vec3::new(hw, hh, hd)],
        // Left (-X)
        [Vec3::new(-hw, -hh, -hd), Vec3::new(-hw, -hh, hd), Vec3::new(-hw, hh, hd), Vec3::new(-hw, hh, -hd)],
        // Top (+Y)
        [Vec3::new(-hw, hh, hd), Vec3::new(hw, hh, hd), Vec3::new(hw, hh, -hd), Vec3::new(-hw, hh, -hd)],
        // Bottom (-Y)
        [Vec3::new(-hw, -hh, -hd), Vec3::new(hw, -hh, -hd), Vec3::new(hw, -hh, hd), Vec3::new(-hw, -hh, hd)],
    ];

    let mut mesh = TriMesh::default();
    for quad in &faces {
        let base = mesh.points.len() as u32;
        mesh.points.extend_from_slice(quad);
        mesh.triangles.push([base, base + 1, base + 2]);
        mesh.triangles.push([base, base + 2, base + 3]);
    }
    mesh
}

pub fn cylinder(radius: f32, height: f32, segments: u32) -> TriMesh {
    let hh = height * 0.5;
    let mut mesh = TriMesh::default();

    // Side faces
    for i in 0..segments {
        let a0 = (i as f32) * std::f32::consts::TAU / segments as f32;
        let a1 = ((i + 1) as f32) * std::f32::consts::TAU / segments as f32;

        let base = mesh.points.len() as u32;
        mesh.points.push(Vec3::new(radius * a0.cos(), -hh, radius * a0.sin()));
        mesh.points.push(Vec3::new(radius * a1.cos(), -hh, radius * a1.sin()));
        mesh.points.push(Vec3::new(radius * a1.cos(), hh, radius * a1.sin()));
        mesh.points.push(Vec3::new(radius * a0.cos(), hh, radius * a0.sin()));

        mesh.triangles.push([base, base + 2, base + 1]);
        mesh.triangles.push([base, base + 3, base + 2]);
    }

    add_cap(&mut mesh, radius, hh, segments, false);
    add_cap(&mut mesh, radius, -hh, segments, true);

    mesh
}

/// UV sphere; vertices on the seam and poles are duplicated
pub fn sphere(radius: f32, rings: u32, sectors: u32) -> TriMesh {
    let mut mesh = TriMesh::default();

    for r in 0..=rings {
        let phi = std::f32::consts::PI * r as f32 / rings as f32;
        let sp = phi.sin();
        let cp = phi.cos();

        for s in 0..=sectors {
            let theta = std::f32::consts::TAU * s as f32 / sectors as f32;
            mesh.points
                .push(Vec3::new(sp * theta.cos(), cp, sp * theta.sin()) * radius);
        }
    }

    for r in 0..rings {
        for s in 0..sectors {
            let i0 = r * (sectors + 1) + s;
            let i1 = i0 + 1;
            let i2 = i0 + sectors + 1;
            let i3 = i2 + 1;
            mesh.triangles.push([i0, i1, i2]);
            mesh.triangles.push([i1, i3, i2]);
        }
    }

    mesh
}

pub fn cone(radius: f32, height: f32, segments: u32) -> TriMesh {
    let hh = height * 0.5;
    let mut mesh = TriMesh::default();

    let apex = mesh.points.len() as u32;
    mesh.points.push(Vec3::new(0.0, hh, 0.0));
    let ring = mesh.points.len() as u32;
    for i in 0..segments {
        let a = (i as f32) * std::f32::consts::TAU / segments as f32;
        mesh.points.push(Vec3::new(radius * a.cos(), -hh, radius * a.sin()));
    }
    for i in 0..segments {
        let next = (i + 1) % segments;
        mesh.triangles.push([apex, ring + next, ring + i]);
    }

    add_cap(&mut mesh, radius, -hh, segments, true);

    mesh
}

// ── Grid and axes ────────────────────────────────────────────

pub fn grid(range: i32, cell_size: f32, opacity: f32) -> LineMeshData {
    let mut vertices = Vec::new();
    let grid_color = [0.25_f32, 0.25, 0.25, opacity];
    let origin_color_x = [0.5_f32, 0.2, 0.2, opacity * 0.7];
    let origin_color_z = [0.2_f32, 0.2, 0.5, opacity * 0.7];

    let extent = range as f32 * cell_size;

    for i in -range..=range {
        let f = i as f32 * cell_size;
        let color = if i == 0 { origin_color_z } else { grid_color };
        // Line along Z
        push_line_vert(&mut vertices, Vec3::new(f, 0.0, -extent), color);
        push_line_vert(&mut vertices, Vec3::new(f, 0.0, extent), color);

        let color = if i == 0 { origin_color_x } else { grid_color };
        // Line along X
        push_line_vert(&mut vertices, Vec3::new(-extent, 0.0, f), color);
        push_line_vert(&mut vertices, Vec3::new(extent, 0.0, f), color);
    }

    LineMeshData { vertices }
}

pub fn axes(length: f32) -> LineMeshData {
    let mut vertices = Vec::new();
    let r = [0.9_f32, 0.2, 0.2, 1.0];
    let g = [0.2_f32, 0.8, 0.2, 1.0];
    let b = [0.2_f32, 0.3, 0.9, 1.0];

    push_line_vert(&mut vertices, Vec3::ZERO, r);
    push_line_vert(&mut vertices, Vec3::X * length, r);
    push_line_vert(&mut vertices, Vec3::ZERO, g);
    push_line_vert(&mut vertices, Vec3::Y * length, g);
    push_line_vert(&mut vertices, Vec3::ZERO, b);
    push_line_vert(&mut vertices, Vec3::Z * length, b);

    LineMeshData { vertices }
}

// ── Helpers ──────────────────────────────────────────────────

pub fn push_line_vert(v: &mut Vec<f32>, p: Vec3, c: [f32; 4]) {
    v.extend_from_slice(&[p.x, p.y, p.z, c[0], c[1], c[2], c[3]]);
}

fn add_cap(mesh: &mut TriMesh, radius: f32, y: f32, segments: u32, facing_down: bool) {
    let center = mesh.points.len() as u32;
    mesh.points.push(Vec3::new(0.0, y, 0.0));

    for i in 0..segments {
        let angle = (i as f32) * std::f32::consts::TAU / segments as f32;
        mesh.points
            .push(Vec3::new(radius * angle.cos(), y, radius * angle.sin()));
    }

    for i in 0..segments {
        let next = (i + 1) % segments;
        if facing_down {
            mesh.triangles.push([center, center + 1 + i, center + 1 + next]);
        } else {
            mesh.triangles.push([center, center + 1 + next, center + 1 + i]);
        }
    }
}
