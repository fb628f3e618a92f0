//! Integration tests for the surface point widget.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use glam::{Affine3A, Quat, Vec3};
use meshview_gui_lib::fixtures;
use meshview_gui_lib::harness::TestHarness;
use meshview_gui_lib::input::{Key, Modifiers, MouseButton};
use meshview_gui_lib::render::PickElement;
use meshview_gui_lib::scene::{ObjectId, ObjectKind, PointCloud, SceneObject};
use meshview_gui_lib::viewport::mesh::{FaceId, MeshTriPoint, VertId};
use meshview_gui_lib::widgets::{
    Parameters, PickedPoint, PointOnObject, PositionType, RadiusSizeType, SurfacePointWidget,
};

type Widget = Rc<RefCell<SurfacePointWidget>>;
type Log = Rc<RefCell<Vec<&'static str>>>;

/// Quad of side 2 at the origin; face 0 is the lower-right triangle.
fn setup(xf: Affine3A) -> (TestHarness, ObjectId) {
    let mut h = TestHarness::new();
    let target = h.add(fixtures::quad_object("target", 2.0).with_xf(xf)).unwrap();
    h.settle(5);
    (h, target)
}

fn face0_point() -> PickedPoint {
    PickedPoint::Mesh(MeshTriPoint::new(FaceId(0), [0.2, 0.7, 0.1]))
}

fn attach(h: &mut TestHarness, target: ObjectId, start: PickedPoint, params: Parameters) -> Widget {
    let widget = SurfacePointWidget::new();
    {
        let mut cx = h.cx();
        let mut w = widget.borrow_mut();
        w.create(&mut cx, target, start);
        w.set_parameters(&mut cx, params);
    }
    h.settle(5);
    widget
}

fn record(widget: &Widget) -> Log {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let mut w = widget.borrow_mut();
    let l = log.clone();
    w.set_start_move_callback(move |_| l.borrow_mut().push("start"));
    let l = log.clone();
    w.set_on_move_callback(move |_| l.borrow_mut().push("move"));
    let l = log.clone();
    w.set_end_move_callback(move |_| l.borrow_mut().push("end"));
    let l = log.clone();
    w.set_abort_move_callback(move |_| l.borrow_mut().push("abort"));
    log
}

fn big_marker() -> Parameters {
    Parameters {
        radius: 0.2,
        ..Parameters::default()
    }
}

fn local(widget: &Widget) -> Vec3 {
    widget.borrow().local_coordinates().unwrap()
}

/// Hover the marker and press the left button on it.
fn grab(h: &mut TestHarness, widget: &Widget) {
    let marker = widget.borrow().marker().unwrap();
    let center = h.scene().world_xf(marker).unwrap().transform_point3(Vec3::ZERO);
    assert!(h.move_to(center));
    assert!(widget.borrow().is_hovered());
    assert!(h.press(MouseButton::Left, Modifiers::empty()));
    assert!(widget.borrow().is_on_move());
}

// ── Lifecycle ────────────────────────────────────────────────

#[test]
fn test_create_attaches_marker_child() {
    let (mut h, target) = setup(Affine3A::IDENTITY);
    let widget = attach(&mut h, target, face0_point(), Parameters::default());

    let marker = widget.borrow().marker().unwrap();
    let marker_obj = h.scene().get(marker).unwrap();
    assert_eq!(marker_obj.parent(), Some(target));
    assert!(marker_obj.is_ancillary());
    assert_eq!(marker_obj.name(), "Pick Sphere");
    assert_eq!(h.viewer.router().listener_count(), 1);
    assert!(h.is_displayed(marker));

    // Metrical default: 0.5% of the bounding box diagonal
    assert_relative_eq!(widget.borrow().radius(), 8f32.sqrt() * 5e-3, epsilon = 1e-6);
}

#[test]
fn test_reset_detaches_everything() {
    let (mut h, target) = setup(Affine3A::IDENTITY);
    let widget = attach(&mut h, target, face0_point(), big_marker());
    let marker = widget.borrow().marker().unwrap();

    widget.borrow_mut().reset(h.scene_mut());
    assert!(h.scene().get(marker).is_none());
    assert_eq!(h.viewer.router().listener_count(), 0);
    assert!(widget.borrow().current_position().is_none());
    assert_eq!(*widget.borrow().parameters(), Parameters::default());

    h.frame();
    assert_eq!(h.viewer.view().bound_count(), 1);
}

#[test]
fn test_reset_when_idle_is_silent() {
    let (mut h, _target) = setup(Affine3A::IDENTITY);
    let widget = SurfacePointWidget::new();
    let log = record(&widget);
    let version = h.scene().version();

    widget.borrow_mut().reset(h.scene_mut());
    assert_eq!(h.scene().version(), version);
    assert!(log.borrow().is_empty());
    assert_eq!(h.viewer.router().listener_count(), 0);
}

#[test]
fn test_removed_target_detaches_widget() {
    let (mut h, target) = setup(Affine3A::IDENTITY);
    let widget = attach(&mut h, target, face0_point(), big_marker());
    let marker = widget.borrow().marker().unwrap();

    h.scene_mut().remove(target);
    assert!(h.scene().get(marker).is_none());
    h.frame();

    let w = widget.borrow();
    assert!(w.marker().is_none());
    assert!(w.target().is_none());
    assert!(w.current_position().is_none());
    assert!(!w.is_hovered());
    drop(w);
    assert_eq!(h.viewer.router().listener_count(), 0);

    h.settle(5);
    assert_eq!(h.viewer.view().bound_count(), 0);
}

// ── Snapping ─────────────────────────────────────────────────

#[test]
fn test_face_centers_snap_to_centroid() {
    let (mut h, target) = setup(Affine3A::IDENTITY);
    let params = Parameters {
        position_type: PositionType::FaceCenters,
        ..big_marker()
    };
    let widget = attach(&mut h, target, face0_point(), params);

    // Face 0 is (-1,-1) (1,-1) (1,1)
    let c = local(&widget);
    assert_relative_eq!(c.x, 1.0 / 3.0, epsilon = 1e-5);
    assert_relative_eq!(c.y, -1.0 / 3.0, epsilon = 1e-5);
    assert_eq!(
        *widget.borrow().current_position(),
        PickedPoint::Mesh(MeshTriPoint::face_center(FaceId(0)))
    );
}

#[test]
fn test_verts_snap_to_nearest_corner() {
    let (mut h, target) = setup(Affine3A::IDENTITY);
    let params = Parameters {
        position_type: PositionType::Verts,
        ..big_marker()
    };
    let widget = attach(&mut h, target, face0_point(), params);
    assert_eq!(local(&widget), Vec3::new(1.0, -1.0, 0.0));
}

#[test]
fn test_set_current_position_does_not_snap() {
    let (mut h, target) = setup(Affine3A::IDENTITY);
    let params = Parameters {
        position_type: PositionType::Verts,
        ..big_marker()
    };
    let widget = attach(&mut h, target, face0_point(), params);

    let exact = MeshTriPoint::new(FaceId(0), [0.5, 0.25, 0.25]);
    {
        let mut cx = h.cx();
        widget.borrow_mut().set_current_position(&mut cx, PickedPoint::Mesh(exact));
    }
    assert_eq!(*widget.borrow().current_position(), PickedPoint::Mesh(exact));

    {
        let mut cx = h.cx();
        widget.borrow_mut().update_current_position(&mut cx, PickedPoint::Mesh(exact));
    }
    assert!(matches!(
        widget.borrow().current_position(),
        PickedPoint::Mesh(p) if p.in_vertex().is_some()
    ));
}

// ── Radius ───────────────────────────────────────────────────

#[test]
fn test_pixel_radius_halves_when_target_scales_up() {
    let (mut h, target) = setup(Affine3A::IDENTITY);
    let params = Parameters {
        radius_size_type: RadiusSizeType::Pixel,
        radius: 5.0,
        ..Parameters::default()
    };
    let widget = attach(&mut h, target, face0_point(), params);
    let r1 = widget.borrow().radius();
    assert!(r1 > 0.0);

    h.scene_mut().set_xf(target, Affine3A::from_scale(Vec3::splat(2.0)));
    h.frame();
    let r2 = widget.borrow().radius();
    assert_relative_eq!(r2, r1 * 0.5, max_relative = 1e-4);
}

#[test]
fn test_pixel_radius_follows_ui_scale() {
    let (mut h, target) = setup(Affine3A::IDENTITY);
    let params = Parameters {
        radius_size_type: RadiusSizeType::Pixel,
        ..Parameters::default()
    };
    let widget = attach(&mut h, target, face0_point(), params);
    let r1 = widget.borrow().radius();

    h.viewer.set_ui_scale(2.0);
    h.frame();
    assert_relative_eq!(widget.borrow().radius(), r1 * 2.0, max_relative = 1e-4);
}

// ── Dragging ─────────────────────────────────────────────────

#[test]
fn test_drag_lifecycle() {
    let (mut h, target) = setup(Affine3A::IDENTITY);
    let widget = attach(&mut h, target, face0_point(), big_marker());
    let log = record(&widget);
    let marker = widget.borrow().marker().unwrap();

    grab(&mut h, &widget);
    assert!(!h.scene().get(marker).unwrap().is_pickable());

    assert!(h.move_to(Vec3::new(-0.5, 0.5, 0.0)));
    h.frame();
    let c = local(&widget);
    assert_relative_eq!(c.x, -0.5, epsilon = 1e-3);
    assert_relative_eq!(c.y, 0.5, epsilon = 1e-3);
    assert!(matches!(
        widget.borrow().current_position(),
        PickedPoint::Mesh(p) if p.face == FaceId(1)
    ));

    assert!(h.release(MouseButton::Left, Modifiers::empty()));
    assert!(!widget.borrow().is_on_move());
    assert!(h.scene().get(marker).unwrap().is_pickable());
    assert_eq!(*log.borrow(), vec!["start", "move", "end"]);
}

#[test]
fn test_escape_aborts_drag() {
    let (mut h, target) = setup(Affine3A::IDENTITY);
    let widget = attach(&mut h, target, face0_point(), big_marker());
    let log = record(&widget);
    let marker = widget.borrow().marker().unwrap();

    grab(&mut h, &widget);
    assert!(h.viewer.key_down(Key::Escape, Modifiers::empty()));
    assert!(!widget.borrow().is_on_move());
    assert!(h.scene().get(marker).unwrap().is_pickable());
    assert_eq!(*log.borrow(), vec!["start", "abort"]);

    // Nothing left to end
    h.release(MouseButton::Left, Modifiers::empty());
    assert_eq!(*log.borrow(), vec!["start", "abort"]);
}

#[test]
fn test_focus_loss_aborts_drag() {
    let (mut h, target) = setup(Affine3A::IDENTITY);
    let widget = attach(&mut h, target, face0_point(), big_marker());
    let log = record(&widget);

    grab(&mut h, &widget);
    h.viewer.set_focus(false);
    assert!(!widget.borrow().is_on_move());
    assert_eq!(*log.borrow(), vec!["start", "abort"]);
}

#[test]
fn test_modifier_outside_custom_set_blocks_drag() {
    let (mut h, target) = setup(Affine3A::IDENTITY);
    let params = Parameters {
        custom_modifiers: Modifiers::SHIFT,
        ..big_marker()
    };
    let widget = attach(&mut h, target, face0_point(), params);
    let marker = widget.borrow().marker().unwrap();
    let center = h.scene().world_xf(marker).unwrap().transform_point3(Vec3::ZERO);
    h.move_to(center);
    assert!(widget.borrow().is_hovered());

    h.press(MouseButton::Left, Modifiers::CTRL | Modifiers::SHIFT);
    assert!(!widget.borrow().is_on_move());
    h.release(MouseButton::Left, Modifiers::CTRL | Modifiers::SHIFT);

    h.press(MouseButton::Left, Modifiers::SHIFT);
    assert!(widget.borrow().is_on_move());
}

#[test]
fn test_hover_follows_cursor() {
    let (mut h, target) = setup(Affine3A::IDENTITY);
    let widget = attach(&mut h, target, face0_point(), big_marker());
    let marker = widget.borrow().marker().unwrap();
    let center = h.scene().world_xf(marker).unwrap().transform_point3(Vec3::ZERO);

    h.move_to(center);
    assert!(widget.borrow().is_hovered());
    h.move_to(Vec3::new(-0.7, 0.7, 0.0));
    assert!(!widget.borrow().is_hovered());

    widget.borrow_mut().set_auto_hover(false);
    h.move_to(center);
    assert!(!widget.borrow().is_hovered());
}

// ── Back faces ───────────────────────────────────────────────

#[test]
fn test_back_face_pick_detection() {
    let (mut h, target) = setup(Affine3A::IDENTITY);
    let pick = PointOnObject {
        point: Vec3::ZERO,
        element: Some(PickElement::Face {
            face: FaceId(0),
            bary: [1.0 / 3.0; 3],
        }),
    };
    let scene = h.scene_mut();
    assert!(!SurfacePointWidget::is_pick_into_back_face(scene, target, &pick, Vec3::new(0.0, 0.0, 5.0)));
    assert!(SurfacePointWidget::is_pick_into_back_face(scene, target, &pick, Vec3::new(0.0, 0.0, -5.0)));
    assert!(!SurfacePointWidget::is_pick_into_back_face(scene, target, &PointOnObject::at(Vec3::ZERO), Vec3::Z));
}

#[test]
fn test_cloud_back_face_uses_point_normal() {
    let mut h = TestHarness::new();
    let cloud = PointCloud::new(vec![Vec3::ZERO, Vec3::X]).with_normals(vec![Vec3::Z]);
    let id = h.add(SceneObject::new("cloud", ObjectKind::Points(cloud))).unwrap();
    h.settle(5);

    let node = |v: u32, point: Vec3| PointOnObject {
        point,
        element: Some(PickElement::Node(VertId(v))),
    };
    let with_normal = node(0, Vec3::ZERO);
    let without_normal = node(1, Vec3::X);
    let scene = h.scene_mut();
    assert!(SurfacePointWidget::is_pick_into_back_face(scene, id, &with_normal, Vec3::new(0.0, 0.0, -5.0)));
    assert!(!SurfacePointWidget::is_pick_into_back_face(scene, id, &with_normal, Vec3::new(0.0, 0.0, 5.0)));
    assert!(!SurfacePointWidget::is_pick_into_back_face(scene, id, &without_normal, Vec3::new(1.0, 0.0, -5.0)));
}

#[test]
fn test_drag_rejects_back_face_when_disabled() {
    // Turned around: the camera at +Z sees the back of the quad
    let flipped = Affine3A::from_quat(Quat::from_rotation_y(std::f32::consts::PI));
    let (mut h, target) = setup(flipped);
    let params = Parameters {
        pick_in_back_face_object: false,
        ..big_marker()
    };
    let widget = attach(&mut h, target, face0_point(), params);
    let log = record(&widget);
    let before = *widget.borrow().current_position();

    grab(&mut h, &widget);
    h.move_to(Vec3::new(0.5, 0.5, 0.0));
    assert_eq!(*widget.borrow().current_position(), before);
    assert_eq!(*log.borrow(), vec!["start"]);

    // Allowing back faces lets the same move through
    h.release(MouseButton::Left, Modifiers::empty());
    {
        let mut cx = h.cx();
        let mut w = widget.borrow_mut();
        let params = Parameters {
            pick_in_back_face_object: true,
            ..*w.parameters()
        };
        w.set_parameters(&mut cx, params);
    }
    grab(&mut h, &widget);
    h.move_to(Vec3::new(0.5, 0.5, 0.0));
    assert_ne!(*widget.borrow().current_position(), before);
}
