//! Draggable marker constrained to the surface of a target object.
//!
//! States: idle (no target) → bound → hovered ⇄ bound → dragging → bound.
//! The marker is an ancillary child sphere of the target; its transform
//! holds the center (target-local) and the radius.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use glam::{Affine3A, Quat, Vec3};
use shared::Color;

use super::picked_point::{find_coords, to_picked_point, PickedPoint, PointOnObject};
use crate::input::{ConnectPosition, InputListener, Key, Modifiers, MouseButton};
use crate::render::PickElement;
use crate::scene::{ObjectId, ObjectKind, SceneObject, SceneTree};
use crate::signal::Connection;
use crate::viewer::ViewerCx;
use crate::viewport::mesh::{MeshTriPoint, TriMesh};
use crate::viewport::picking::closest_on_segment;

/// Router group of the widget; listeners in lower groups see events first
pub const WIDGET_GROUP: i32 = 10;
pub const MARKER_NAME: &str = "Pick Sphere";
const DEFAULT_PIXEL_RADIUS: f32 = 5.0;
const METRICAL_RADIUS_RATIO: f32 = 5e-3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PositionType {
    /// Anywhere on a face
    #[default]
    Faces,
    FaceCenters,
    Edges,
    EdgeCenters,
    Verts,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RadiusSizeType {
    /// World units of the target
    #[default]
    Metrical,
    /// Screen pixels
    Pixel,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Parameters {
    pub position_type: PositionType,
    pub radius_size_type: RadiusSizeType,
    /// Values <= 0 pick a default for the size type
    pub radius: f32,
    pub base_color: Color,
    pub hovered_color: Color,
    pub active_color: Color,
    /// Modifiers that may be held when a drag starts
    pub custom_modifiers: Modifiers,
    pub pick_in_back_face_object: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            position_type: PositionType::Faces,
            radius_size_type: RadiusSizeType::Metrical,
            radius: 0.0,
            base_color: Color::rgb(60, 110, 230),
            hovered_color: Color::rgb(90, 200, 250),
            active_color: Color::rgb(255, 60, 60),
            custom_modifiers: Modifiers::empty(),
            pick_in_back_face_object: true,
        }
    }
}

pub type PointCallback = Box<dyn FnMut(&PickedPoint)>;

#[derive(Default)]
struct Callbacks {
    start_move: Option<PointCallback>,
    on_move: Option<PointCallback>,
    end_move: Option<PointCallback>,
    abort_move: Option<PointCallback>,
}

pub struct SurfacePointWidget {
    self_ref: Weak<RefCell<SurfacePointWidget>>,
    target: Option<ObjectId>,
    marker: Option<ObjectId>,
    current: PickedPoint,
    center: Vec3,
    radius: f32,
    params: Parameters,
    on_move: bool,
    hovered: bool,
    auto_hover: bool,
    target_xf_changed: Rc<Cell<bool>>,
    connections: Vec<Connection>,
    callbacks: Callbacks,
}

impl SurfacePointWidget {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new_cyclic(|self_ref| {
            RefCell::new(Self {
                self_ref: self_ref.clone(),
                target: None,
                marker: None,
                current: PickedPoint::None,
                center: Vec3::ZERO,
                radius: 0.0,
                params: Parameters::default(),
                on_move: false,
                hovered: false,
                auto_hover: true,
                target_xf_changed: Rc::new(Cell::new(false)),
                connections: Vec::new(),
                callbacks: Callbacks::default(),
            })
        })
    }

    // ── Lifecycle ────────────────────────────────────────────

    /// Attach to `target` at `start`. Any previous binding is reset first.
    pub fn create(&mut self, cx: &mut ViewerCx<'_>, target: ObjectId, start: PickedPoint) -> PickedPoint {
        self.reset(cx.scene);
        let Some(target_obj) = cx.scene.get(target) else {
            tracing::warn!("Surface point target {} does not exist", target.short());
            self.current = PickedPoint::None;
            return self.current;
        };

        let flag = self.target_xf_changed.clone();
        let xf_connection = target_obj.world_xf_changed().connect(move |_| flag.set(true));

        let marker = SceneObject::new(MARKER_NAME, ObjectKind::unit_sphere()).with_ancillary(true);
        let marker = match cx.scene.add(Some(target), marker) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("Failed to attach pick marker: {e}");
                self.current = PickedPoint::None;
                return self.current;
            }
        };

        self.target = Some(target);
        self.marker = Some(marker);
        self.current = start;
        self.set_sphere_color(cx.scene);
        self.update_position_and_radius(cx);

        self.connections.push(xf_connection);
        let listener: Weak<RefCell<dyn InputListener>> = self.self_ref.clone();
        self.connections
            .push(cx.router.connect(WIDGET_GROUP, ConnectPosition::Front, listener));

        tracing::debug!("Surface point widget bound to {}", target.short());
        self.current
    }

    /// Like [`Self::create`], from a raw pick on the target.
    pub fn create_from_pick(&mut self, cx: &mut ViewerCx<'_>, target: ObjectId, start: &PointOnObject) -> PickedPoint {
        let picked = match cx.scene.get(target) {
            Some(object) => to_picked_point(object, start),
            None => PickedPoint::None,
        };
        self.create(cx, target, picked)
    }

    /// Detach the marker and forget the target, parameters and callbacks.
    /// Does nothing when idle.
    pub fn reset(&mut self, scene: &mut SceneTree) {
        let Some(marker) = self.marker.take() else {
            return;
        };
        self.connections.clear();
        scene.remove(marker);

        self.target = None;
        self.current = PickedPoint::None;
        self.center = Vec3::ZERO;
        self.radius = 0.0;
        self.params = Parameters::default();
        self.on_move = false;
        self.hovered = false;
        self.auto_hover = true;
        self.target_xf_changed.set(false);
        self.callbacks = Callbacks::default();
    }

    // ── Accessors ────────────────────────────────────────────

    pub fn target(&self) -> Option<ObjectId> {
        self.target
    }

    pub fn marker(&self) -> Option<ObjectId> {
        self.marker
    }

    pub fn current_position(&self) -> &PickedPoint {
        &self.current
    }

    /// Marker center in the target's coordinates
    pub fn local_coordinates(&self) -> Option<Vec3> {
        self.marker.map(|_| self.center)
    }

    /// Marker radius in the target's coordinates
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn is_on_move(&self) -> bool {
        self.on_move
    }

    pub fn auto_hover(&self) -> bool {
        self.auto_hover
    }

    pub fn set_auto_hover(&mut self, on: bool) {
        self.auto_hover = on;
    }

    pub fn set_start_move_callback(&mut self, f: impl FnMut(&PickedPoint) + 'static) {
        self.callbacks.start_move = Some(Box::new(f));
    }

    pub fn set_on_move_callback(&mut self, f: impl FnMut(&PickedPoint) + 'static) {
        self.callbacks.on_move = Some(Box::new(f));
    }

    pub fn set_end_move_callback(&mut self, f: impl FnMut(&PickedPoint) + 'static) {
        self.callbacks.end_move = Some(Box::new(f));
    }

    pub fn set_abort_move_callback(&mut self, f: impl FnMut(&PickedPoint) + 'static) {
        self.callbacks.abort_move = Some(Box::new(f));
    }

    // ── Parameters and position ──────────────────────────────

    pub fn set_parameters(&mut self, cx: &mut ViewerCx<'_>, params: Parameters) {
        let resnap = params.position_type != self.params.position_type
            || params.radius != self.params.radius
            || params.radius_size_type != self.params.radius_size_type;
        self.params = params;
        if self.marker.is_some() && resnap {
            self.update_position_and_radius(cx);
        }
        self.set_sphere_color(cx.scene);
    }

    pub fn set_base_color(&mut self, scene: &mut SceneTree, color: Color) {
        if self.params.base_color == color {
            return;
        }
        self.params.base_color = color;
        self.set_sphere_color(scene);
    }

    pub fn set_hovered(&mut self, scene: &mut SceneTree, on: bool) {
        if !self.on_move && self.hovered != on {
            self.hovered = on;
            self.set_sphere_color(scene);
        }
    }

    /// Move to `pos`, snapping it per the position type.
    pub fn update_current_position(&mut self, cx: &mut ViewerCx<'_>, pos: PickedPoint) {
        self.current = pos;
        if self.marker.is_some() {
            self.update_position_and_radius(cx);
        }
    }

    /// Move to `pos` exactly as given.
    pub fn set_current_position(&mut self, cx: &mut ViewerCx<'_>, pos: PickedPoint) {
        self.current = pos;
        let coords = self
            .target
            .and_then(|t| cx.scene.get_mut(t))
            .and_then(|target| find_coords(target, &self.current));
        if let Some(center) = coords {
            self.center = center;
            self.set_point_radius(cx);
        }
    }

    // ── Dragging ─────────────────────────────────────────────

    pub fn start_dragging(&mut self, scene: &mut SceneTree) {
        let Some(marker) = self.marker else {
            return;
        };
        if self.on_move {
            tracing::warn!("Surface point drag already in progress");
            return;
        }
        if let Some(obj) = scene.get_mut(marker) {
            obj.set_pickable(false);
        }
        self.on_move = true;
        self.set_sphere_color(scene);
        if let Some(cb) = self.callbacks.start_move.as_mut() {
            cb(&self.current);
        }
    }

    fn finish_dragging(&mut self, scene: &mut SceneTree, aborted: bool) {
        self.on_move = false;
        if let Some(obj) = self.marker.and_then(|m| scene.get_mut(m)) {
            obj.set_pickable(true);
        }
        self.set_sphere_color(scene);
        let cb = if aborted {
            self.callbacks.abort_move.as_mut()
        } else {
            self.callbacks.end_move.as_mut()
        };
        if let Some(cb) = cb {
            cb(&self.current);
        }
    }

    /// Cancel a drag in progress; fires the abort callback instead of end.
    pub fn abort_dragging(&mut self, scene: &mut SceneTree) {
        if self.on_move {
            self.finish_dragging(scene, true);
        }
    }

    // ── Internals ────────────────────────────────────────────

    fn set_sphere_color(&self, scene: &mut SceneTree) {
        let Some(marker) = self.marker.and_then(|m| scene.get_mut(m)) else {
            return;
        };
        let color = if self.on_move {
            self.params.active_color
        } else if self.hovered {
            self.params.hovered_color
        } else {
            self.params.base_color
        };
        let visual = marker.visual_mut();
        visual.set_front_color(color, false, None);
        visual.set_back_color(color, None);
    }

    fn update_position_and_radius(&mut self, cx: &mut ViewerCx<'_>) {
        let Some(target) = self.target.and_then(|t| cx.scene.get_mut(t)) else {
            return;
        };
        if let (PickedPoint::Mesh(mtp), Some(mesh)) = (self.current, target.triangle_mesh()) {
            if let Some(snapped) = snap(&mesh, mtp, self.params.position_type) {
                self.current = PickedPoint::Mesh(snapped);
            }
        }
        if let Some(center) = find_coords(target, &self.current) {
            self.center = center;
            self.set_point_radius(cx);
        }
    }

    fn set_point_radius(&mut self, cx: &mut ViewerCx<'_>) {
        let Some(target) = self.target else {
            return;
        };
        let radius = match self.params.radius_size_type {
            RadiusSizeType::Metrical => {
                if self.params.radius > 0.0 {
                    self.params.radius
                } else {
                    cx.scene
                        .get(target)
                        .map_or(0.0, |t| t.bounding_box().diagonal() * METRICAL_RADIUS_RATIO)
                }
            }
            RadiusSizeType::Pixel => {
                let Some(world_xf) = cx.scene.world_xf(target) else {
                    return;
                };
                let Some(pixel) = cx.pixel_size_at(world_xf.transform_point3(self.center)) else {
                    return;
                };
                let (scale, _, _) = world_xf.to_scale_rotation_translation();
                let target_scale = (scale.x + scale.y + scale.z) / 3.0;
                let radius = if self.params.radius > 0.0 {
                    self.params.radius
                } else {
                    DEFAULT_PIXEL_RADIUS
                };
                radius * pixel / target_scale * cx.ui_scale
            }
        };
        self.radius = radius;
        self.place_marker(cx.scene);
    }

    fn place_marker(&self, scene: &mut SceneTree) {
        if let Some(marker) = self.marker {
            let xf = Affine3A::from_scale_rotation_translation(Vec3::splat(self.radius), Quat::IDENTITY, self.center);
            scene.set_xf(marker, xf);
        }
    }

    /// Whether a pick on `object` hits the side of the surface facing away
    /// from `eye`. Points without a stored normal never count.
    pub fn is_pick_into_back_face(scene: &mut SceneTree, object: ObjectId, pick: &PointOnObject, eye: Vec3) -> bool {
        let Some(xf) = scene.world_xf(object) else {
            return false;
        };
        let Some(obj) = scene.get_mut(object) else {
            return false;
        };
        let normal = match pick.element {
            Some(PickElement::Face { face, .. }) => obj.triangle_mesh().and_then(|m| m.dir_dbl_area(face)),
            Some(PickElement::Node(v)) => obj.point_cloud().and_then(|c| c.normal(v)),
            _ => None,
        };
        let Some(normal) = normal else {
            return false;
        };
        let world_point = xf.transform_point3(pick.point);
        xf.transform_vector3(normal).dot(eye - world_point) < 0.0
    }
}

/// Snap a face point per `position_type`. None when the face is missing.
pub fn snap(mesh: &TriMesh, mtp: MeshTriPoint, position_type: PositionType) -> Option<MeshTriPoint> {
    let face = mtp.face;
    let corners = mesh.triangle(face)?;
    let p = mesh.tri_point(&mtp)?;

    let nearest_edge = || {
        (0..3)
            .map(|k| {
                let (a, b) = (corners[k], corners[(k + 1) % 3]);
                let t = closest_on_segment(p, a, b);
                (k, t, a.lerp(b, t).distance_squared(p))
            })
            .min_by(|x, y| x.2.total_cmp(&y.2))
    };

    let snapped = match position_type {
        PositionType::Faces => mtp,
        PositionType::FaceCenters => MeshTriPoint::face_center(face),
        PositionType::Edges => {
            if mtp.on_edge().is_some() {
                mtp
            } else {
                let (k, t, _) = nearest_edge()?;
                MeshTriPoint::on_edge_at(face, k, t)
            }
        }
        PositionType::EdgeCenters => {
            let (k, _, _) = nearest_edge()?;
            MeshTriPoint::on_edge_at(face, k, 0.5)
        }
        PositionType::Verts => {
            if mtp.in_vertex().is_some() {
                mtp
            } else {
                let k = (0..3).min_by(|&a, &b| {
                    corners[a]
                        .distance_squared(p)
                        .total_cmp(&corners[b].distance_squared(p))
                })?;
                MeshTriPoint::corner(face, k)
            }
        }
    };
    Some(snapped)
}

impl InputListener for SurfacePointWidget {
    fn on_mouse_down(&mut self, cx: &mut ViewerCx<'_>, button: MouseButton, mods: Modifiers) -> bool {
        if button != MouseButton::Left || !self.hovered {
            return false;
        }
        if !mods.is_empty() && !self.params.custom_modifiers.contains(mods) {
            return false;
        }
        self.start_dragging(cx.scene);
        true
    }

    fn on_mouse_up(&mut self, cx: &mut ViewerCx<'_>, button: MouseButton, _mods: Modifiers) -> bool {
        if button != MouseButton::Left || !self.on_move {
            return false;
        }
        self.finish_dragging(cx.scene, false);
        true
    }

    fn on_mouse_move(&mut self, cx: &mut ViewerCx<'_>, _x: f32, _y: f32) -> bool {
        if self.on_move {
            let Some((object, pick)) = cx.pick_render_object() else {
                return false;
            };
            if Some(object) != self.target {
                return false;
            }
            if !self.params.pick_in_back_face_object {
                let eye = cx.camera_eye().unwrap_or(Vec3::ZERO);
                if Self::is_pick_into_back_face(cx.scene, object, &pick, eye) {
                    return false;
                }
            }
            self.current = match cx.scene.get(object) {
                Some(obj) => to_picked_point(obj, &pick),
                None => return false,
            };
            self.update_position_and_radius(cx);
            if let Some(cb) = self.callbacks.on_move.as_mut() {
                cb(&self.current);
            }
            return true;
        }

        if !self.auto_hover || self.marker.is_none() {
            return false;
        }
        let picked = cx.pick_render_object().map(|(object, _)| object);
        let on_marker = picked.is_some() && picked == self.marker;
        self.set_hovered(cx.scene, on_marker);
        false
    }

    fn on_key_down(&mut self, cx: &mut ViewerCx<'_>, key: Key, _mods: Modifiers) -> bool {
        if key == Key::Escape && self.on_move {
            self.abort_dragging(cx.scene);
            return true;
        }
        false
    }

    fn on_focus_lost(&mut self, cx: &mut ViewerCx<'_>) {
        self.abort_dragging(cx.scene);
    }

    fn on_pre_draw(&mut self, cx: &mut ViewerCx<'_>) {
        if self.marker.is_none() {
            return;
        }
        if let Some(target) = self.target.filter(|t| !cx.scene.contains(*t)) {
            // The marker went with its parent.
            tracing::debug!("Surface point target {} left the scene", target.short());
            self.reset(cx.scene);
            return;
        }
        let xf_changed = self.target_xf_changed.replace(false);
        if self.params.radius_size_type == RadiusSizeType::Pixel || xf_changed {
            self.set_point_radius(cx);
        }
    }
}

impl std::fmt::Debug for SurfacePointWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfacePointWidget")
            .field("target", &self.target)
            .field("current", &self.current)
            .field("on_move", &self.on_move)
            .field("hovered", &self.hovered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::mesh::FaceId;

    fn triangle() -> TriMesh {
        TriMesh::new(
            vec![Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, 3.0, 0.0)],
            vec![[0, 1, 2]],
        )
    }

    fn near_corner_1() -> MeshTriPoint {
        MeshTriPoint::new(FaceId(0), [0.2, 0.7, 0.1])
    }

    #[test]
    fn test_snap_faces_keeps_point() {
        let mtp = near_corner_1();
        assert_eq!(snap(&triangle(), mtp, PositionType::Faces), Some(mtp));
    }

    #[test]
    fn test_snap_face_center() {
        let mesh = triangle();
        let snapped = snap(&mesh, near_corner_1(), PositionType::FaceCenters).unwrap();
        let p = mesh.tri_point(&snapped).unwrap();
        assert!((p - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_snap_nearest_vertex() {
        let mesh = triangle();
        let snapped = snap(&mesh, near_corner_1(), PositionType::Verts).unwrap();
        assert_eq!(snapped.in_vertex(), Some(1));
    }

    #[test]
    fn test_snap_edges_projects_onto_nearest_edge() {
        let mesh = triangle();
        // (2.1, 0.3) is closest to the bottom edge, corner 0 → corner 1
        let snapped = snap(&mesh, near_corner_1(), PositionType::Edges).unwrap();
        assert_eq!(snapped.on_edge(), Some(0));
        let p = mesh.tri_point(&snapped).unwrap();
        assert!((p - Vec3::new(2.1, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_snap_edge_center() {
        let mesh = triangle();
        let snapped = snap(&mesh, near_corner_1(), PositionType::EdgeCenters).unwrap();
        let p = mesh.tri_point(&snapped).unwrap();
        assert!((p - Vec3::new(1.5, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_point_already_on_edge_is_kept() {
        let on_edge = MeshTriPoint::on_edge_at(FaceId(0), 1, 0.25);
        assert_eq!(snap(&triangle(), on_edge, PositionType::Edges), Some(on_edge));
    }

    #[test]
    fn test_reset_idle_is_noop() {
        let widget = SurfacePointWidget::new();
        let mut scene = SceneTree::new();
        widget.borrow_mut().reset(&mut scene);
        assert!(widget.borrow().marker().is_none());
        assert!(scene.is_empty());
    }
}
