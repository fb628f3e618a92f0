use glam::{Mat4, Vec2, Vec3, Vec4};

use super::picking::{Aabb, Ray};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

/// Arc-ball camera for 3D viewport.
///
/// Screen positions are in pixels relative to the viewport's top-left
/// corner; `size` is the viewport size in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcBallCamera {
    /// Horizontal rotation angle (radians)
    pub yaw: f32,
    /// Vertical rotation angle (radians)
    pub pitch: f32,
    /// Distance from target
    pub distance: f32,
    /// Camera target point
    pub target: Vec3,
    /// Vertical field of view (radians)
    pub fov: f32,
    pub projection: Projection,
}

impl Default for ArcBallCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl ArcBallCamera {
    pub fn new() -> Self {
        Self {
            yaw: 0.6,
            pitch: 0.4,
            distance: 6.0,
            target: Vec3::ZERO,
            fov: 45.0_f32.to_radians(),
            projection: Projection::Perspective,
        }
    }

    /// Looking down -Z at the origin
    pub fn front() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            ..Self::new()
        }
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx.to_radians();
        self.pitch = (self.pitch + dy.to_radians()).clamp(-1.5, 1.5);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance * (1.0 - delta)).clamp(1e-3, 1e5);
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        let right = self.right_vector();
        let up = self.up_vector();
        let offset = right * dx + up * dy;
        self.target += offset;
    }

    /// Camera position in world space
    pub fn eye_position(&self) -> Vec3 {
        let cy = self.yaw.cos();
        let sy = self.yaw.sin();
        let cp = self.pitch.cos();
        let sp = self.pitch.sin();

        self.target
            + Vec3::new(
                self.distance * cp * sy,
                self.distance * sp,
                self.distance * cp * cy,
            )
    }

    /// Unit vector from the eye towards the target
    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye_position()).normalize_or_zero()
    }

    /// View matrix (world -> camera)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye_position(), self.target, Vec3::Y)
    }

    /// Half height of the view volume at the target distance
    fn half_height(&self) -> f32 {
        self.distance * (self.fov * 0.5).tan()
    }

    /// Projection matrix (camera -> clip)
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let near = self.distance * 0.01;
        let far = self.distance * 100.0;
        match self.projection {
            Projection::Perspective => Mat4::perspective_rh_gl(self.fov, aspect, near, far),
            Projection::Orthographic => {
                let hh = self.half_height();
                let hw = hh * aspect;
                Mat4::orthographic_rh_gl(-hw, hw, -hh, hh, -far, far)
            }
        }
    }

    /// Combined view-projection matrix
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    pub fn right_vector(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize_or_zero()
    }

    pub fn up_vector(&self) -> Vec3 {
        self.right_vector().cross(self.forward()).normalize_or_zero()
    }

    /// Project a 3D point to viewport pixel coordinates
    pub fn project(&self, point: Vec3, size: Vec2) -> Option<Vec2> {
        let vp = self.view_projection(aspect(size));
        let p = vp * point.extend(1.0);
        if p.w <= 0.0 {
            return None;
        }
        let ndc = p.truncate() / p.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * size.x,
            (1.0 - ndc.y) * 0.5 * size.y,
        ))
    }

    /// Cast a ray from a viewport pixel into the 3D scene
    pub fn screen_ray(&self, pos: Vec2, size: Vec2) -> Ray {
        // Screen → NDC
        let ndc_x = pos.x / size.x * 2.0 - 1.0;
        let ndc_y = 1.0 - pos.y / size.y * 2.0;

        // Inverse view-projection
        let vp_inv = self.view_projection(aspect(size)).inverse();

        // Unproject near and far points
        let near_world = vp_inv * Vec4::new(ndc_x, ndc_y, -1.0, 1.0);
        let far_world = vp_inv * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);

        let near = near_world.truncate() / near_world.w;
        let far = far_world.truncate() / far_world.w;

        let direction = (far - near).normalize_or_zero();

        match self.projection {
            Projection::Perspective => Ray {
                origin: self.eye_position(),
                direction,
            },
            Projection::Orthographic => Ray {
                origin: near,
                direction,
            },
        }
    }

    /// World-space length covered by one pixel at `point`
    pub fn pixel_size_at(&self, point: Vec3, size: Vec2) -> f32 {
        let height = size.y.max(1.0);
        match self.projection {
            Projection::Perspective => {
                let depth = (point - self.eye_position()).dot(self.forward()).max(1e-6);
                2.0 * depth * (self.fov * 0.5).tan() / height
            }
            Projection::Orthographic => 2.0 * self.half_height() / height,
        }
    }

    /// Point under a viewport pixel on the plane through the target that
    /// faces the camera
    pub fn view_plane_point(&self, pos: Vec2, size: Vec2) -> Vec3 {
        let ray = self.screen_ray(pos, size);
        let n = self.forward();
        let denom = ray.direction.dot(n);
        if denom.abs() < 1e-9 {
            return self.target;
        }
        let t = (self.target - ray.origin).dot(n) / denom;
        ray.at(t)
    }

    /// Center on `bounds` and move back until its bounding sphere fits.
    /// `margin` is a fraction of the radius.
    pub fn fit(&mut self, bounds: &Aabb, margin: f32, size: Vec2) {
        if bounds.is_empty() {
            return;
        }
        let radius = (bounds.diagonal() * 0.5).max(1e-3) * (1.0 + margin);
        let half_v = self.fov * 0.5;
        let half_h = (half_v.tan() * aspect(size)).atan();
        let half = half_v.min(half_h);
        self.target = bounds.center();
        self.distance = match self.projection {
            Projection::Perspective => radius / half.sin(),
            Projection::Orthographic => radius / half.tan(),
        };
    }
}

fn aspect(size: Vec2) -> f32 {
    if size.y > 0.0 {
        size.x / size.y
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: Vec2 = Vec2::new(800.0, 600.0);

    #[test]
    fn test_front_camera_looks_down_negative_z() {
        let cam = ArcBallCamera::front();
        assert!((cam.eye_position() - Vec3::new(0.0, 0.0, 6.0)).length() < 1e-5);
        assert!((cam.forward() - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_project_target_to_center() {
        let cam = ArcBallCamera::new();
        let p = cam.project(cam.target, SIZE).unwrap();
        assert!((p - SIZE * 0.5).length() < 1e-3);
    }

    #[test]
    fn test_screen_ray_through_projected_point() {
        for projection in [Projection::Perspective, Projection::Orthographic] {
            let cam = ArcBallCamera {
                projection,
                ..ArcBallCamera::new()
            };
            let world = Vec3::new(0.5, -0.3, 0.2);
            let screen = cam.project(world, SIZE).unwrap();
            let ray = cam.screen_ray(screen, SIZE);
            let to_point = world - ray.origin;
            let off_axis = to_point - ray.direction * to_point.dot(ray.direction);
            assert!(off_axis.length() < 1e-3, "{projection:?}: {off_axis:?}");
        }
    }

    #[test]
    fn test_pixel_size_orthographic_is_constant() {
        let cam = ArcBallCamera {
            projection: Projection::Orthographic,
            ..ArcBallCamera::front()
        };
        let a = cam.pixel_size_at(Vec3::ZERO, SIZE);
        let b = cam.pixel_size_at(Vec3::new(0.0, 0.0, -3.0), SIZE);
        assert!((a - b).abs() < 1e-7);
        let expected = 2.0 * 6.0 * (cam.fov * 0.5).tan() / 600.0;
        assert!((a - expected).abs() < 1e-6);
    }

    #[test]
    fn test_pixel_size_perspective_grows_with_depth() {
        let cam = ArcBallCamera::front();
        let near = cam.pixel_size_at(Vec3::ZERO, SIZE);
        let far = cam.pixel_size_at(Vec3::new(0.0, 0.0, -6.0), SIZE);
        assert!((far / near - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_fit_centers_and_contains() {
        let mut cam = ArcBallCamera::new();
        let bounds = Aabb::from_points(&[Vec3::new(10.0, 10.0, 10.0), Vec3::new(12.0, 12.0, 12.0)]);
        cam.fit(&bounds, 0.01, SIZE);
        assert!((cam.target - Vec3::splat(11.0)).length() < 1e-5);
        for corner in [bounds.min, bounds.max] {
            let p = cam.project(corner, SIZE).unwrap();
            assert!(p.x >= 0.0 && p.x <= SIZE.x && p.y >= 0.0 && p.y <= SIZE.y);
        }
    }

    #[test]
    fn test_view_plane_point_at_center_is_target() {
        let cam = ArcBallCamera::new();
        let p = cam.view_plane_point(SIZE * 0.5, SIZE);
        assert!((p - cam.target).length() < 1e-3);
    }
}
