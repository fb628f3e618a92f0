//! Contract between the view controller and whatever keeps the display
//! list, the selection set and the camera.
//!
//! The controller only ever talks to a `dyn RenderContext`; the desktop
//! binary and the tests both drive [`super::InteractiveContext`].

use std::sync::Arc;

use glam::{Affine3A, Vec2, Vec3};
use shared::Color;

use super::data_source::MeshDataSource;
use crate::scene::SceneColors;
use crate::viewport::camera::ArcBallCamera;
use crate::viewport::mesh::{FaceId, VertId};

slotmap::new_key_type! {
    /// Key of a renderable inside a rendering context
    pub struct RenderableHandle;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Shaded,
    Wireframe,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawerBool {
    ShowEdges,
    DisplayNodes,
    SmoothShading,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawerColor {
    Interior,
    BackInterior,
    Edge,
    Node,
}

/// Sizes of line and point primitives, in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawerFloat {
    LineWidth,
    PointSize,
}

/// Draw attributes of one renderable
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawerAttributes {
    pub show_edges: bool,
    pub display_nodes: bool,
    pub smooth_shading: bool,
    pub interior: Color,
    pub back_interior: Color,
    pub edge: Color,
    pub node: Color,
    pub line_width: f32,
    pub point_size: f32,
}

impl Default for DrawerAttributes {
    fn default() -> Self {
        Self {
            show_edges: false,
            display_nodes: false,
            smooth_shading: true,
            interior: SceneColors::UNSELECTED_MESH,
            back_interior: SceneColors::BACK_FACES,
            edge: SceneColors::EDGES,
            node: SceneColors::POINTS,
            line_width: 1.0,
            point_size: 5.0,
        }
    }
}

impl DrawerAttributes {
    pub fn bool(&self, attr: DrawerBool) -> bool {
        match attr {
            DrawerBool::ShowEdges => self.show_edges,
            DrawerBool::DisplayNodes => self.display_nodes,
            DrawerBool::SmoothShading => self.smooth_shading,
        }
    }

    pub fn set_bool(&mut self, attr: DrawerBool, value: bool) {
        match attr {
            DrawerBool::ShowEdges => self.show_edges = value,
            DrawerBool::DisplayNodes => self.display_nodes = value,
            DrawerBool::SmoothShading => self.smooth_shading = value,
        }
    }

    pub fn color(&self, attr: DrawerColor) -> Color {
        match attr {
            DrawerColor::Interior => self.interior,
            DrawerColor::BackInterior => self.back_interior,
            DrawerColor::Edge => self.edge,
            DrawerColor::Node => self.node,
        }
    }

    pub fn set_color(&mut self, attr: DrawerColor, value: Color) {
        match attr {
            DrawerColor::Interior => self.interior = value,
            DrawerColor::BackInterior => self.back_interior = value,
            DrawerColor::Edge => self.edge = value,
            DrawerColor::Node => self.node = value,
        }
    }

    pub fn float(&self, attr: DrawerFloat) -> f32 {
        match attr {
            DrawerFloat::LineWidth => self.line_width,
            DrawerFloat::PointSize => self.point_size,
        }
    }

    pub fn set_float(&mut self, attr: DrawerFloat, value: f32) {
        match attr {
            DrawerFloat::LineWidth => self.line_width = value,
            DrawerFloat::PointSize => self.point_size = value,
        }
    }
}

/// Something the context can draw and pick
#[derive(Clone, Debug)]
pub struct Renderable {
    pub name: String,
    pub data_source: Arc<MeshDataSource>,
    pub location: Affine3A,
    pub display_mode: DisplayMode,
    pub attributes: DrawerAttributes,
}

impl Renderable {
    pub fn new(name: impl Into<String>, data_source: Arc<MeshDataSource>) -> Self {
        Self {
            name: name.into(),
            data_source,
            location: Affine3A::IDENTITY,
            display_mode: DisplayMode::Shaded,
            attributes: DrawerAttributes::default(),
        }
    }

    pub fn with_location(mut self, location: Affine3A) -> Self {
        self.location = location;
        self
    }
}

/// Which element of a renderable a pick landed on
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PickElement {
    Face { face: FaceId, bary: [f32; 3] },
    Node(VertId),
    Link { segment: u32, t: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickHit {
    pub handle: RenderableHandle,
    /// Distance along the view ray
    pub distance: f32,
    pub world_point: Vec3,
    /// Same point in the renderable's own coordinates
    pub local_point: Vec3,
    pub element: PickElement,
}

/// Running counts of context mutations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextStats {
    pub displays: u64,
    pub erases: u64,
    pub removes: u64,
    pub redisplays: u64,
    pub selection_changes: u64,
    pub attribute_writes: u64,
}

impl ContextStats {
    pub fn mutations(&self) -> u64 {
        self.displays
            + self.erases
            + self.removes
            + self.redisplays
            + self.selection_changes
            + self.attribute_writes
    }
}

/// Snapshot of one displayed renderable, detached from the context so it
/// can cross into a paint callback
#[derive(Clone, Debug)]
pub struct Presentation {
    pub handle: RenderableHandle,
    pub data_source: Arc<MeshDataSource>,
    pub location: Affine3A,
    pub display_mode: DisplayMode,
    pub attributes: DrawerAttributes,
    pub selected: bool,
    /// Bumped whenever the data source is replaced
    pub revision: u64,
}

pub trait RenderContext {
    /// Take ownership of a renderable; it is not displayed yet.
    fn create(&mut self, renderable: Renderable) -> RenderableHandle;

    fn contains(&self, handle: RenderableHandle) -> bool;

    fn renderable(&self, handle: RenderableHandle) -> Option<&Renderable>;

    /// Show a renderable; `activate_selection` makes it selectable by clicks.
    fn display(&mut self, handle: RenderableHandle, activate_selection: bool) -> bool;

    /// Hide without destroying. Erasing also drops it from the selection.
    fn erase(&mut self, handle: RenderableHandle) -> bool;

    /// Destroy a renderable.
    fn remove(&mut self, handle: RenderableHandle) -> bool;

    /// Rebuild the presentation after attribute or data changes.
    fn redisplay(&mut self, handle: RenderableHandle);

    fn is_displayed(&self, handle: RenderableHandle) -> bool;

    fn is_selected(&self, handle: RenderableHandle) -> bool;

    fn add_or_remove_selected(&mut self, handle: RenderableHandle);

    fn selected(&self) -> Vec<RenderableHandle>;

    fn clear_selected(&mut self);

    fn drawer_bool(&self, handle: RenderableHandle, attr: DrawerBool) -> Option<bool>;

    fn set_drawer_bool(&mut self, handle: RenderableHandle, attr: DrawerBool, value: bool);

    fn drawer_color(&self, handle: RenderableHandle, attr: DrawerColor) -> Option<Color>;

    fn set_drawer_color(&mut self, handle: RenderableHandle, attr: DrawerColor, value: Color);

    fn drawer_float(&self, handle: RenderableHandle, attr: DrawerFloat) -> Option<f32>;

    fn set_drawer_float(&mut self, handle: RenderableHandle, attr: DrawerFloat, value: f32);

    fn location(&self, handle: RenderableHandle) -> Option<Affine3A>;

    fn set_location(&mut self, handle: RenderableHandle, location: Affine3A);

    fn set_data_source(&mut self, handle: RenderableHandle, data_source: Arc<MeshDataSource>);

    /// Every displayed renderable under a viewport pixel, nearest first.
    fn pick_all(&self, screen: Vec2) -> Vec<PickHit>;

    /// Click selection. `toggle` adds or removes the hit instead of
    /// replacing the selection. Returns whether the selection changed.
    fn select_at(&mut self, screen: Vec2, toggle: bool) -> bool;

    fn camera(&self) -> &ArcBallCamera;

    fn camera_mut(&mut self) -> &mut ArcBallCamera;

    fn view_size(&self) -> Vec2;

    fn resize(&mut self, size: Vec2);

    /// Frame the displayed renderables (or only the selected ones when any
    /// are selected and `selected_only` is set).
    fn fit_all(&mut self, margin: f32, selected_only: bool);

    fn invalidate(&mut self);

    /// Invalidate only the overlay layer (highlight, camera moves)
    fn invalidate_immediate(&mut self);

    /// Returns and clears the pending redraw request.
    fn take_invalidated(&mut self) -> bool;

    fn stats(&self) -> ContextStats;

    fn presentations(&self) -> Vec<Presentation>;
}
