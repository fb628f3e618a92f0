//! Headless test harness: a [`Viewer`] over an [`InteractiveContext`]
//! with a fixed window, plus helpers to drive frames and the mouse.

use glam::{Vec2, Vec3};

use crate::input::{Modifiers, MouseButton};
use crate::render::{ContextStats, InteractiveContext, RenderContext, RenderableHandle, ViewportRect};
use crate::scene::{ObjectId, SceneObject, SceneTree};
use crate::viewer::{Viewer, ViewerConfig, ViewerCx};
use crate::viewport::camera::{ArcBallCamera, Projection};

/// Window size used by [`TestHarness::new`]
pub const DEFAULT_SIZE: Vec2 = Vec2::new(800.0, 600.0);

pub struct TestHarness {
    pub viewer: Viewer,
    size: Vec2,
}

impl TestHarness {
    /// Focused viewer with an orthographic camera looking down -Z.
    pub fn new() -> Self {
        Self::with_config(ViewerConfig::default())
    }

    pub fn with_config(config: ViewerConfig) -> Self {
        let size = DEFAULT_SIZE;
        let camera = ArcBallCamera {
            projection: Projection::Orthographic,
            ..ArcBallCamera::front()
        };
        let mut viewer = Viewer::new(config);
        viewer.initialize(Box::new(InteractiveContext::new(size).with_camera(camera)));
        viewer.set_focus(true);
        let mut harness = Self { viewer, size };
        harness.frame();
        harness
    }

    /// Viewer without a render context
    pub fn uninitialized() -> Self {
        let mut viewer = Viewer::new(ViewerConfig::default());
        viewer.set_focus(true);
        Self {
            viewer,
            size: DEFAULT_SIZE,
        }
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    // ── Scene ─────────────────────────────────────────────────

    pub fn scene(&self) -> &SceneTree {
        self.viewer.scene()
    }

    pub fn scene_mut(&mut self) -> &mut SceneTree {
        self.viewer.scene_mut()
    }

    /// Add a top-level object; returns its id, or None if the tree refused it.
    pub fn add(&mut self, object: SceneObject) -> Option<ObjectId> {
        self.scene_mut().add(None, object).ok()
    }

    pub fn add_child(&mut self, parent: ObjectId, object: SceneObject) -> Option<ObjectId> {
        self.scene_mut().add(Some(parent), object).ok()
    }

    // ── Frames ────────────────────────────────────────────────

    /// Run one frame over the whole window.
    pub fn frame(&mut self) -> bool {
        let size = self.size;
        self.viewer.frame(ViewportRect::from_size(size), size, 1.0)
    }

    /// Run frames until nothing changes, at most `max` of them.
    pub fn settle(&mut self, max: usize) -> usize {
        for n in 1..=max {
            if !self.frame() {
                return n;
            }
        }
        max
    }

    // ── Render state ──────────────────────────────────────────

    pub fn context(&self) -> Option<&dyn RenderContext> {
        self.viewer.view().context()
    }

    pub fn stats(&self) -> ContextStats {
        self.context().map(|c| c.stats()).unwrap_or_default()
    }

    pub fn handle_of(&self, object: ObjectId) -> Option<RenderableHandle> {
        self.viewer.view().interactive_object(object).ok()
    }

    pub fn is_displayed(&self, object: ObjectId) -> bool {
        match (self.handle_of(object), self.context()) {
            (Some(h), Some(c)) => c.is_displayed(h),
            _ => false,
        }
    }

    pub fn is_natively_selected(&self, object: ObjectId) -> bool {
        match (self.handle_of(object), self.context()) {
            (Some(h), Some(c)) => c.is_selected(h),
            _ => false,
        }
    }

    /// Pixel position of a world point with the current camera
    pub fn screen_of(&self, world: Vec3) -> Option<Vec2> {
        let context = self.context()?;
        context.camera().project(world, context.view_size())
    }

    // ── Mouse ─────────────────────────────────────────────────

    pub fn move_mouse(&mut self, pos: Vec2) -> bool {
        self.viewer.mouse_move(pos.x, pos.y)
    }

    /// Move the cursor over a world point; false if it is off-screen.
    pub fn move_to(&mut self, world: Vec3) -> bool {
        match self.screen_of(world) {
            Some(pos) => {
                self.move_mouse(pos);
                true
            }
            None => false,
        }
    }

    pub fn press(&mut self, button: MouseButton, mods: Modifiers) -> bool {
        self.viewer.mouse_down(button, mods)
    }

    pub fn release(&mut self, button: MouseButton, mods: Modifiers) -> bool {
        self.viewer.mouse_up(button, mods)
    }

    /// Left click at a pixel, then run a frame so the click is applied.
    pub fn click(&mut self, pos: Vec2, mods: Modifiers) {
        self.move_mouse(pos);
        self.press(MouseButton::Left, mods);
        self.release(MouseButton::Left, mods);
        self.frame();
    }

    pub fn cx(&mut self) -> ViewerCx<'_> {
        self.viewer.cx()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_new_harness_empty() {
        let h = TestHarness::new();
        assert!(h.scene().is_empty());
        assert!(h.context().is_some());
        assert_eq!(h.stats(), ContextStats::default());
    }

    #[test]
    fn test_added_object_is_displayed_after_frame() {
        let mut h = TestHarness::new();
        let id = h.add(fixtures::quad_object("q", 1.0)).unwrap();
        assert!(!h.is_displayed(id));
        h.frame();
        assert!(h.is_displayed(id));
        assert_eq!(h.viewer.renderer_count(), 1);
    }

    #[test]
    fn test_fitted_object_projects_to_center() {
        let mut h = TestHarness::new();
        h.add(fixtures::quad_object("q", 1.0)).unwrap();
        h.frame();
        let center = h.screen_of(Vec3::ZERO).unwrap();
        assert!((center - h.size() * 0.5).length() < 1e-2);
    }

    #[test]
    fn test_uninitialized_harness_renders_nothing() {
        let mut h = TestHarness::uninitialized();
        let id = h.add(fixtures::quad_object("q", 1.0)).unwrap();
        assert!(!h.frame());
        assert!(h.handle_of(id).is_none());
    }
}
