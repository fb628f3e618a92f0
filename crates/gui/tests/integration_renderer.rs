//! Integration tests for per-object renderers and scene loading.

use glam::{Affine3A, Vec3};
use meshview_gui_lib::fixtures;
use meshview_gui_lib::harness::TestHarness;
use meshview_gui_lib::render::{DrawerBool, DrawerColor, DrawerFloat, Presentation, RenderContext, Renderable};
use meshview_gui_lib::scene::{ObjectId, ObjectKind, SceneTree, ViewportMask, VisualProperty};
use meshview_gui_lib::viewport::mesh::FaceId;
use shared::{Color, Geometry, ObjectDescription, ShapeFaceDescription};

fn presentation(h: &TestHarness, id: ObjectId) -> Presentation {
    let handle = h.handle_of(id).unwrap();
    h.context()
        .unwrap()
        .presentations()
        .into_iter()
        .find(|p| p.handle == handle)
        .unwrap()
}

fn settled_quad(h: &mut TestHarness) -> ObjectId {
    let id = h.add(fixtures::quad_object("q", 1.0)).unwrap();
    h.settle(5);
    id
}

// ── Attribute sync ───────────────────────────────────────────

#[test]
fn test_color_change_writes_one_attribute() {
    let mut h = TestHarness::new();
    let id = settled_quad(&mut h);
    let before = h.stats();
    let red = Color::rgb(255, 0, 0);

    h.scene_mut()
        .get_mut(id)
        .unwrap()
        .visual_mut()
        .set_front_color(red, false, None);
    h.frame();

    let after = h.stats();
    assert_eq!(after.attribute_writes, before.attribute_writes + 1);
    assert_eq!(after.redisplays, before.redisplays + 1);
    let handle = h.handle_of(id).unwrap();
    assert_eq!(h.context().unwrap().drawer_color(handle, DrawerColor::Interior), Some(red));
}

#[test]
fn test_unchanged_values_are_not_written() {
    let mut h = TestHarness::new();
    let id = settled_quad(&mut h);
    let before = h.stats();

    // Touching the property set without changing a value
    let visual = h.scene_mut().get_mut(id).unwrap().visual_mut();
    let current = visual.back_color(meshview_gui_lib::scene::ViewportId::MAIN);
    visual.set_back_color(current, None);
    h.frame();

    assert_eq!(h.stats().attribute_writes, before.attribute_writes);
}

#[test]
fn test_flat_shading_disables_smooth_shading() {
    let mut h = TestHarness::new();
    let id = settled_quad(&mut h);
    let handle = h.handle_of(id).unwrap();
    assert_eq!(h.context().unwrap().drawer_bool(handle, DrawerBool::SmoothShading), Some(true));

    let obj = h.scene_mut().get_mut(id).unwrap();
    obj.visual_mut().set_property(VisualProperty::FlatShading, true, ViewportMask::ALL);
    obj.visual_mut().set_property(VisualProperty::Edges, true, ViewportMask::ALL);
    h.frame();

    let ctx = h.context().unwrap();
    assert_eq!(ctx.drawer_bool(handle, DrawerBool::SmoothShading), Some(false));
    assert_eq!(ctx.drawer_bool(handle, DrawerBool::ShowEdges), Some(true));
    assert_eq!(ctx.drawer_bool(handle, DrawerBool::DisplayNodes), Some(false));
}

// ── Transform and geometry ───────────────────────────────────

#[test]
fn test_parent_move_updates_child_location() {
    let mut h = TestHarness::new();
    let group = h.add(fixtures::group_object("g")).unwrap();
    let child_xf = Affine3A::from_translation(Vec3::new(0.0, 1.0, 0.0));
    let child = h
        .add_child(group, fixtures::quad_object("c", 1.0).with_xf(child_xf))
        .unwrap();
    h.settle(5);
    assert_eq!(presentation(&h, child).location, child_xf);

    let parent_xf = Affine3A::from_translation(Vec3::new(2.0, 0.0, 0.0));
    h.scene_mut().set_xf(group, parent_xf);
    h.frame();
    assert_eq!(presentation(&h, child).location, parent_xf * child_xf);
}

#[test]
fn test_geometry_change_replaces_data_source() {
    let mut h = TestHarness::new();
    let id = settled_quad(&mut h);
    let before = presentation(&h, id);
    assert_eq!(before.data_source.element_count(), 2);

    *h.scene_mut().get_mut(id).unwrap().kind_mut() = ObjectKind::mesh(fixtures::cube_mesh(1.0));
    h.frame();

    let after = presentation(&h, id);
    assert_eq!(after.data_source.element_count(), 12);
    assert_eq!(after.revision, before.revision + 1);
    assert_eq!(h.handle_of(id), Some(before.handle));
}

#[test]
fn test_group_gets_no_renderable() {
    let mut h = TestHarness::new();
    let group = h.add(fixtures::group_object("g")).unwrap();
    h.frame();
    assert!(h.handle_of(group).is_none());
    assert_eq!(h.stats().displays, 0);
}

#[test]
fn test_points_and_polyline_render() {
    let mut h = TestHarness::new();
    let cloud = h
        .add(fixtures::points_object("p", vec![Vec3::ZERO, Vec3::X, Vec3::Y]))
        .unwrap();
    let line = h
        .add(fixtures::polyline_object("l", vec![Vec3::ZERO, Vec3::X, Vec3::Y], true))
        .unwrap();
    h.frame();

    let p = presentation(&h, cloud);
    assert_eq!(p.data_source.node_count(), 3);
    assert_eq!(p.data_source.element_count(), 0);
    let l = presentation(&h, line);
    assert_eq!(l.data_source.link_count(), 3);
}

// ── Topo shapes ──────────────────────────────────────────────

#[test]
fn test_shape_mesh_cache_follows_edits() {
    let mut h = TestHarness::new();
    let id = h.add(fixtures::shape_object("s")).unwrap();
    assert!(!h.scene().get(id).unwrap().topo_shape().unwrap().has_cached_mesh());

    h.frame();
    assert!(h.scene().get(id).unwrap().topo_shape().unwrap().has_cached_mesh());
    let before = presentation(&h, id);
    assert_eq!(before.data_source.element_count(), 3);
    {
        let holder = h.scene_mut().get_mut(id).unwrap().topo_shape_mut().unwrap();
        assert_eq!(holder.face_of_triangle(FaceId(2)), Some(1));
        holder.shape_mut().faces.pop();
        assert!(!holder.has_cached_mesh());
    }

    h.frame();
    let after = presentation(&h, id);
    assert_eq!(after.data_source.element_count(), 2);
    assert_eq!(after.revision, before.revision + 1);
    let holder = h.scene_mut().get_mut(id).unwrap().topo_shape_mut().unwrap();
    assert_eq!(holder.face_of_triangle(FaceId(2)), None);
}

#[test]
fn test_loaded_shape_edges_are_links() {
    let quad = ShapeFaceDescription {
        points: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        triangles: vec![[0, 1, 2], [0, 2, 3]],
    };
    let desc = fixtures::scene_desc(vec![ObjectDescription::new(
        "plate",
        Geometry::Shape {
            faces: vec![quad],
            edges: vec![vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]]],
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
        },
    )]);
    let mut h = TestHarness::new();
    h.viewer.set_scene(SceneTree::from_description(&desc).unwrap());
    h.settle(5);

    let id = h.scene().roots()[0];
    let p = presentation(&h, id);
    assert_eq!(p.data_source.element_count(), 2);
    assert_eq!(p.data_source.links(), &[[4, 5], [5, 6]]);
    assert!(p.data_source.has_feature_edges());
    assert_eq!(p.data_source.point_nodes(), 7..9);
}

#[test]
fn test_shape_line_width_and_point_size_reach_drawer() {
    let mut h = TestHarness::new();
    let id = h.add(fixtures::shape_object("s")).unwrap();
    h.settle(5);
    let handle = h.handle_of(id).unwrap();
    assert_eq!(h.context().unwrap().drawer_float(handle, DrawerFloat::LineWidth), Some(1.0));

    let obj = h.scene_mut().get_mut(id).unwrap();
    obj.set_shape_line_width(2.5);
    obj.set_shape_point_size(9.0);
    h.frame();

    let p = presentation(&h, id);
    assert_eq!(p.attributes.line_width, 2.5);
    assert_eq!(p.attributes.point_size, 9.0);
}

// ── Scene loading ────────────────────────────────────────────

#[test]
fn test_loaded_scene_is_displayed() {
    let mut hidden = fixtures::sphere_desc("hidden", 0.5);
    hidden.visible = false;
    let desc = fixtures::scene_desc(vec![
        fixtures::cube_desc_at("a", 1.0, [-2.0, 0.0, 0.0]),
        fixtures::group_desc("g", vec![fixtures::sphere_desc("b", 0.5), hidden]),
    ]);
    let scene = SceneTree::from_description(&desc).unwrap();
    assert_eq!(scene.len(), 4);

    let mut h = TestHarness::new();
    h.viewer.set_scene(scene);
    h.settle(5);

    let by_name = |h: &TestHarness, name: &str| {
        h.scene()
            .live_objects()
            .into_iter()
            .find(|id| h.scene().get(*id).is_some_and(|o| o.name() == name))
            .unwrap()
    };
    let a = by_name(&h, "a");
    assert!(h.is_displayed(a));
    assert!(h.is_displayed(by_name(&h, "b")));
    assert!(!h.is_displayed(by_name(&h, "hidden")));
    assert_eq!(
        presentation(&h, a).location,
        Affine3A::from_translation(Vec3::new(-2.0, 0.0, 0.0))
    );
}

#[test]
fn test_replacing_scene_removes_old_renderables() {
    let mut h = TestHarness::new();
    let old = settled_quad(&mut h);
    let old_handle = h.handle_of(old).unwrap();

    let desc = fixtures::scene_desc(vec![fixtures::cube_desc("c", 1.0, 1.0, 1.0)]);
    h.viewer.set_scene(SceneTree::from_description(&desc).unwrap());
    h.settle(5);

    assert!(!h.context().unwrap().contains(old_handle));
    assert_eq!(h.viewer.view().bound_count(), 1);
    assert_eq!(h.viewer.renderer_count(), 1);
}

#[test]
fn test_swapping_scene_back_reuses_bound_renderable() {
    let mut h = TestHarness::new();
    let a = settled_quad(&mut h);
    let handle = h.handle_of(a).unwrap();

    let old = h.viewer.set_scene(SceneTree::new());
    h.viewer.set_scene(old);
    h.settle(5);

    assert_eq!(h.handle_of(a), Some(handle));
    assert_eq!(h.viewer.view().bound_count(), 1);
    assert_eq!(h.viewer.view().stray_count(), 0);
    assert_eq!(h.context().unwrap().presentations().len(), 1);

    h.scene_mut().set_visible(a, false, ViewportMask::ALL);
    h.settle(5);
    assert!(h.context().unwrap().presentations().is_empty());
}

#[test]
fn test_hidden_object_hides_its_strays() {
    let mut h = TestHarness::new();
    let a = settled_quad(&mut h);

    // A second renderable for an already bound object
    let source = h.context().unwrap().renderable(h.handle_of(a).unwrap()).unwrap().data_source.clone();
    let extra = h
        .viewer
        .view_mut()
        .context_mut()
        .unwrap()
        .create(Renderable::new("extra", source));
    assert!(h.viewer.view_mut().add_object(extra, a, false));
    assert_eq!(h.viewer.view().stray_count(), 1);
    assert_eq!(h.context().unwrap().presentations().len(), 2);

    h.scene_mut().set_visible(a, false, ViewportMask::ALL);
    h.settle(5);
    assert!(h.context().unwrap().presentations().is_empty());

    h.scene_mut().set_visible(a, true, ViewportMask::ALL);
    h.settle(5);
    assert_eq!(h.context().unwrap().presentations().len(), 2);
}
