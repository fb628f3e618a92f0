use std::sync::Arc;

use bitflags::bitflags;
use glam::{Affine3A, Vec3};

use super::geometry::{PointCloud, Polyline};
use super::topo_shape::ObjectTopoShapeHolder;
use super::viewports::{ViewportId, ViewportMask};
use super::visual::VisualizationPropertySet;
use crate::signal::Signal;
use crate::viewport::mesh::{self, TriMesh};
use crate::viewport::picking::Aabb;

/// Unique identity of a scene object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(uuid::Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// First 8 hex digits, for labels and logs
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Categories of object data changed since the renderer last looked
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u32 {
        const GEOMETRY = 1 << 0;
        const TRANSFORM = 1 << 1;
        const PROPERTIES = 1 << 2;
    }
}

bitflags! {
    /// What an object's geometry can provide to renderers and widgets
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const TRIANGLE_MESH = 1 << 0;
        const POINT_CLOUD = 1 << 1;
        const POLYLINE = 1 << 2;
        const TOPOLOGY = 1 << 3;
    }
}

/// Geometry carried by a scene object
#[derive(Clone, Debug)]
pub enum ObjectKind {
    Group,
    Mesh(Arc<TriMesh>),
    Points(PointCloud),
    Lines(Polyline),
    TopoShape(ObjectTopoShapeHolder),
    /// Unit sphere; center and radius live in the object's transform
    Sphere(Arc<TriMesh>),
}

impl ObjectKind {
    pub fn mesh(mesh: TriMesh) -> Self {
        ObjectKind::Mesh(Arc::new(mesh))
    }

    pub fn unit_sphere() -> Self {
        ObjectKind::Sphere(Arc::new(mesh::sphere(1.0, 12, 24)))
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            ObjectKind::Group => Capabilities::empty(),
            ObjectKind::Mesh(_) | ObjectKind::Sphere(_) => Capabilities::TRIANGLE_MESH,
            ObjectKind::Points(_) => Capabilities::POINT_CLOUD,
            ObjectKind::Lines(_) => Capabilities::POLYLINE,
            ObjectKind::TopoShape(_) => Capabilities::TOPOLOGY | Capabilities::TRIANGLE_MESH,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectKind::Group => "Group",
            ObjectKind::Mesh(_) => "Mesh",
            ObjectKind::Points(_) => "Points",
            ObjectKind::Lines(_) => "Polyline",
            ObjectKind::TopoShape(_) => "Shape",
            ObjectKind::Sphere(_) => "Sphere",
        }
    }
}

/// Application-level scene node. Created detached, then owned by a
/// [`SceneTree`](super::SceneTree).
pub struct SceneObject {
    id: ObjectId,
    name: String,
    pub(super) parent: Option<ObjectId>,
    pub(super) children: Vec<ObjectId>,
    kind: ObjectKind,
    xf: Affine3A,
    visibility: ViewportMask,
    selected: bool,
    ancillary: bool,
    pickable: bool,
    dirty: DirtyFlags,
    visual: VisualizationPropertySet,
    world_xf_changed: Signal<()>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.into(),
            parent: None,
            children: Vec::new(),
            kind,
            xf: Affine3A::IDENTITY,
            visibility: ViewportMask::ALL,
            selected: false,
            ancillary: false,
            pickable: true,
            dirty: DirtyFlags::all(),
            visual: VisualizationPropertySet::default(),
            world_xf_changed: Signal::new(),
        }
    }

    pub fn with_xf(mut self, xf: Affine3A) -> Self {
        self.xf = xf;
        self
    }

    pub fn with_ancillary(mut self, ancillary: bool) -> Self {
        self.ancillary = ancillary;
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Mutable geometry access; marks the geometry dirty
    pub fn kind_mut(&mut self) -> &mut ObjectKind {
        self.dirty |= DirtyFlags::GEOMETRY;
        &mut self.kind
    }

    pub fn capabilities(&self) -> Capabilities {
        self.kind.capabilities()
    }

    /// Local transform (relative to the parent)
    pub fn xf(&self) -> Affine3A {
        self.xf
    }

    pub(super) fn set_local_xf(&mut self, xf: Affine3A) {
        self.xf = xf;
    }

    pub fn is_visible(&self, viewport: ViewportId) -> bool {
        self.visibility.contains(viewport)
    }

    pub fn visibility_mask(&self) -> ViewportMask {
        self.visibility
    }

    pub fn set_visible(&mut self, on: bool, viewports: ViewportMask) {
        self.visibility.set(viewports, on);
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Returns whether the state changed. Selection changes the front color,
    /// so a change also requests a redraw.
    pub fn select(&mut self, on: bool) -> bool {
        if self.selected == on {
            return false;
        }
        self.selected = on;
        self.visual.set_redraw_flag();
        true
    }

    pub fn is_ancillary(&self) -> bool {
        self.ancillary
    }

    pub fn set_ancillary(&mut self, ancillary: bool) {
        self.ancillary = ancillary;
    }

    pub fn is_pickable(&self) -> bool {
        self.pickable
    }

    pub fn set_pickable(&mut self, pickable: bool) {
        self.pickable = pickable;
    }

    pub fn dirty_flags(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn mark_dirty(&mut self, flags: DirtyFlags) {
        self.dirty |= flags;
    }

    pub fn reset_dirty(&mut self) {
        self.dirty = DirtyFlags::empty();
    }

    pub fn visual(&self) -> &VisualizationPropertySet {
        &self.visual
    }

    /// Mutable visual properties; marks the properties dirty
    pub fn visual_mut(&mut self) -> &mut VisualizationPropertySet {
        self.dirty |= DirtyFlags::PROPERTIES;
        &mut self.visual
    }

    /// Redraw requested by the property set or by a topo-shape edit
    pub fn redraw_requested(&self) -> bool {
        self.visual.redraw_flag() || self.topo_shape().is_some_and(|h| h.redraw_flag())
    }

    pub fn reset_redraw_flag(&mut self) {
        self.visual.reset_redraw_flag();
        if let ObjectKind::TopoShape(h) = &mut self.kind {
            h.reset_redraw_flag();
        }
    }

    /// Fires after this object's world transform changed, whether through
    /// its own transform or an ancestor's
    pub fn world_xf_changed(&self) -> &Signal<()> {
        &self.world_xf_changed
    }

    // ── Geometry capabilities ─────────────────────────────────

    /// Triangle mesh, extracting it from a shape if needed
    pub fn triangle_mesh(&mut self) -> Option<Arc<TriMesh>> {
        match &mut self.kind {
            ObjectKind::Mesh(m) | ObjectKind::Sphere(m) => Some(m.clone()),
            ObjectKind::TopoShape(holder) => holder.mesh(),
            _ => None,
        }
    }

    /// Triangle mesh if it is available without extraction
    pub fn mesh(&self) -> Option<&Arc<TriMesh>> {
        match &self.kind {
            ObjectKind::Mesh(m) | ObjectKind::Sphere(m) => Some(m),
            ObjectKind::TopoShape(holder) => holder.cached_mesh(),
            _ => None,
        }
    }

    pub fn point_cloud(&self) -> Option<&PointCloud> {
        match &self.kind {
            ObjectKind::Points(p) => Some(p),
            _ => None,
        }
    }

    pub fn polyline(&self) -> Option<&Polyline> {
        match &self.kind {
            ObjectKind::Lines(l) => Some(l),
            _ => None,
        }
    }

    pub fn topo_shape(&self) -> Option<&ObjectTopoShapeHolder> {
        match &self.kind {
            ObjectKind::TopoShape(h) => Some(h),
            _ => None,
        }
    }

    /// Mutable shape holder; marks geometry dirty
    pub fn topo_shape_mut(&mut self) -> Option<&mut ObjectTopoShapeHolder> {
        match self.kind_mut() {
            ObjectKind::TopoShape(h) => Some(h),
            _ => None,
        }
    }

    /// Line width of a shape's edges; ignored for other kinds
    pub fn set_shape_line_width(&mut self, width: f32) {
        if let ObjectKind::TopoShape(h) = &mut self.kind {
            h.set_line_width(width);
        }
    }

    /// Point size of a shape's vertices; ignored for other kinds
    pub fn set_shape_point_size(&mut self, size: f32) {
        if let ObjectKind::TopoShape(h) = &mut self.kind {
            h.set_point_size(size);
        }
    }

    /// Local bounding box of the geometry
    pub fn bounding_box(&self) -> Aabb {
        match &self.kind {
            ObjectKind::Group => Aabb::empty(),
            ObjectKind::Mesh(m) | ObjectKind::Sphere(m) => m.bounding_box(),
            ObjectKind::Points(p) => p.bounding_box(),
            ObjectKind::Lines(l) => l.bounding_box(),
            ObjectKind::TopoShape(h) => h.shape().bounding_box(),
        }
    }

    /// Center and radius of a sphere object, read back from its transform
    pub fn sphere_params(&self) -> Option<(Vec3, f32)> {
        match self.kind {
            ObjectKind::Sphere(_) => Some((self.xf.translation.into(), self.xf.matrix3.x_axis.length())),
            _ => None,
        }
    }
}

impl std::fmt::Debug for SceneObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind.type_name())
            .field("selected", &self.selected)
            .field("ancillary", &self.ancillary)
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_object_is_fully_dirty_and_visible() {
        let obj = SceneObject::new("a", ObjectKind::Group);
        assert_eq!(obj.dirty_flags(), DirtyFlags::all());
        assert!(obj.is_visible(ViewportId::MAIN));
        assert!(obj.is_pickable());
        assert!(!obj.is_ancillary());
    }

    #[test]
    fn test_select_reports_change_and_requests_redraw() {
        let mut obj = SceneObject::new("a", ObjectKind::Group);
        obj.reset_redraw_flag();
        assert!(obj.select(true));
        assert!(obj.redraw_requested());
        obj.reset_redraw_flag();
        assert!(!obj.select(true));
        assert!(!obj.redraw_requested());
    }

    #[test]
    fn test_mutable_access_marks_dirty() {
        let mut obj = SceneObject::new("a", ObjectKind::mesh(mesh::cube(1.0, 1.0, 1.0)));
        obj.reset_dirty();
        obj.visual_mut();
        assert_eq!(obj.dirty_flags(), DirtyFlags::PROPERTIES);
        obj.kind_mut();
        assert!(obj.dirty_flags().contains(DirtyFlags::GEOMETRY));
    }

    #[test]
    fn test_capabilities() {
        assert_eq!(ObjectKind::Group.capabilities(), Capabilities::empty());
        assert!(ObjectKind::unit_sphere()
            .capabilities()
            .contains(Capabilities::TRIANGLE_MESH));
        assert!(ObjectKind::Points(PointCloud::default())
            .capabilities()
            .contains(Capabilities::POINT_CLOUD));
    }

    #[test]
    fn test_sphere_params_from_transform() {
        let obj = SceneObject::new("s", ObjectKind::unit_sphere()).with_xf(
            Affine3A::from_scale_rotation_translation(
                Vec3::splat(0.25),
                glam::Quat::IDENTITY,
                Vec3::new(1.0, 2.0, 3.0),
            ),
        );
        let (center, radius) = obj.sphere_params().unwrap();
        assert_eq!(center, Vec3::new(1.0, 2.0, 3.0));
        assert!((radius - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_short_id() {
        assert_eq!(ObjectId::new().short().len(), 8);
    }
}
