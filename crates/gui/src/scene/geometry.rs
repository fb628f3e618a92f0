//! Point clouds and polylines held by scene objects.

use glam::Vec3;

use crate::viewport::mesh::VertId;
use crate::viewport::picking::{closest_on_segment, Aabb};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<Vec3>,
    /// Optional per-point normals; may be shorter than `points`
    pub normals: Vec<Vec3>,
}

impl PointCloud {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self {
            points,
            normals: Vec::new(),
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    pub fn point(&self, v: VertId) -> Option<Vec3> {
        self.points.get(v.0 as usize).copied()
    }

    /// Stored normal of a point, if the cloud has one for that index
    pub fn normal(&self, v: VertId) -> Option<Vec3> {
        self.normals.get(v.0 as usize).copied()
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(&self.points)
    }
}

/// Point on a polyline: segment index and parameter along it
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgePoint {
    pub segment: u32,
    pub t: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polyline {
    pub points: Vec<Vec3>,
    pub closed: bool,
}

impl Polyline {
    pub fn new(points: Vec<Vec3>, closed: bool) -> Self {
        Self { points, closed }
    }

    /// Vertex index pairs of every segment
    pub fn segments(&self) -> Vec<[u32; 2]> {
        let n = self.points.len() as u32;
        if n < 2 {
            return Vec::new();
        }
        let mut segs: Vec<[u32; 2]> = (0..n - 1).map(|i| [i, i + 1]).collect();
        if self.closed && n > 2 {
            segs.push([n - 1, 0]);
        }
        segs
    }

    pub fn segment_count(&self) -> usize {
        self.segments().len()
    }

    pub fn edge_point(&self, p: &EdgePoint) -> Option<Vec3> {
        let [a, b] = *self.segments().get(p.segment as usize)?;
        let a = self.points[a as usize];
        let b = self.points[b as usize];
        Some(a.lerp(b, p.t))
    }

    /// Closest point over all segments
    pub fn closest_point(&self, p: Vec3) -> Option<EdgePoint> {
        let mut best: Option<(EdgePoint, f32)> = None;
        for (i, [a, b]) in self.segments().into_iter().enumerate() {
            let a = self.points[a as usize];
            let b = self.points[b as usize];
            let t = closest_on_segment(p, a, b);
            let d = a.lerp(b, t).distance_squared(p);
            if best.as_ref().is_none_or(|(_, bd)| d < *bd) {
                best = Some((EdgePoint { segment: i as u32, t }, d));
            }
        }
        best.map(|(ep, _)| ep)
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(closed: bool) -> Polyline {
        Polyline::new(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::Y,
            ],
            closed,
        )
    }

    #[test]
    fn test_segments_open_and_closed() {
        assert_eq!(square(false).segment_count(), 3);
        assert_eq!(square(true).segments().last(), Some(&[3, 0]));
        assert!(Polyline::new(vec![Vec3::ZERO], true).segments().is_empty());
    }

    #[test]
    fn test_closest_point_on_closing_segment() {
        let line = square(true);
        let ep = line.closest_point(Vec3::new(-0.5, 0.5, 0.0)).unwrap();
        assert_eq!(ep.segment, 3);
        let p = line.edge_point(&ep).unwrap();
        assert!((p - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_point_cloud_missing_normal() {
        let cloud = PointCloud::new(vec![Vec3::ZERO, Vec3::X]).with_normals(vec![Vec3::Z]);
        assert_eq!(cloud.normal(VertId(0)), Some(Vec3::Z));
        assert_eq!(cloud.normal(VertId(1)), None);
        assert_eq!(cloud.point(VertId(1)), Some(Vec3::X));
    }
}
