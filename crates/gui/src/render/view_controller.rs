//! Owner of the rendering context and the object/renderable binding.
//!
//! Frame order is `pre_draw` → `flush_view_events` → (objects render) →
//! `post_draw`. The last step reconciles the context with the scene tree,
//! so anything mutated earlier in the frame is visible to it.

use std::collections::{HashMap, HashSet};

use glam::{Vec2, Vec3};

use super::context::{PickHit, RenderContext, RenderableHandle};
use super::object_map::ObjectRenderableMap;
use crate::error::{Error, Result};
use crate::input::{Modifiers, MouseButton};
use crate::scene::{ObjectId, SceneTree, ViewportId};
use crate::signal::Signal;
use crate::viewport::camera::{ArcBallCamera, Projection};

/// Margin used whenever the view is refit after a change
pub const FIT_MARGIN: f32 = 0.01;
/// Pixels the cursor has to travel before a press turns into a drag
pub const DRAG_THRESHOLD: f32 = 3.0;
const ROTATE_SPEED: f32 = 0.5;
const ZOOM_SPEED: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DragPhase {
    Start,
    Confirmed,
    Update,
    Stop,
    Abort,
}

/// Viewport rectangle in framebuffer pixels, origin at the bottom-left
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ViewportRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl ViewportRect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_size(size: Vec2) -> Self {
        Self::new(Vec2::ZERO, size)
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ObjectDrag {
    Idle,
    /// Ctrl-press on a selected object, waiting for the cursor to move
    Armed,
    Active,
}

#[derive(Debug)]
struct ViewInput {
    pressed: Option<(MouseButton, Modifiers)>,
    press_pos: Vec2,
    last_pos: Vec2,
    moved: bool,
    rotate: Vec2,
    pan: Vec2,
    zoom: f32,
    click: Option<(Vec2, bool)>,
    object_drag: ObjectDrag,
    drag_events: Vec<DragPhase>,
}

impl Default for ViewInput {
    fn default() -> Self {
        Self {
            pressed: None,
            press_pos: Vec2::ZERO,
            last_pos: Vec2::ZERO,
            moved: false,
            rotate: Vec2::ZERO,
            pan: Vec2::ZERO,
            zoom: 0.0,
            click: None,
            object_drag: ObjectDrag::Idle,
            drag_events: Vec::new(),
        }
    }
}

impl ViewInput {
    /// Drop gestures in progress. The cursor position and drag phases not
    /// yet flushed survive.
    fn reset(&mut self) {
        let last_pos = self.last_pos;
        let drag_events = std::mem::take(&mut self.drag_events);
        *self = Self {
            last_pos,
            drag_events,
            ..Self::default()
        };
    }
}

pub struct ViewController {
    context: Option<Box<dyn RenderContext>>,
    map: ObjectRenderableMap,
    /// Renderables displayed for an object that was already bound
    strays: HashMap<ObjectId, Vec<RenderableHandle>>,
    /// Bound renderables added with selection disabled
    unselectable: HashSet<RenderableHandle>,
    viewport: ViewportId,
    rect: ViewportRect,
    framebuffer: Vec2,
    scale_factor: f32,
    focus: bool,
    input: ViewInput,
    mouse_world: Vec3,
    selection_changed: Signal<()>,
    drag: Signal<DragPhase>,
    /// Per-frame calls without a context are reported once
    warned_uninitialized: bool,
}

impl Default for ViewController {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewController {
    pub fn new() -> Self {
        Self {
            context: None,
            map: ObjectRenderableMap::new(),
            strays: HashMap::new(),
            unselectable: HashSet::new(),
            viewport: ViewportId::MAIN,
            rect: ViewportRect::default(),
            framebuffer: Vec2::ZERO,
            scale_factor: 1.0,
            focus: false,
            input: ViewInput::default(),
            mouse_world: Vec3::ZERO,
            selection_changed: Signal::new(),
            drag: Signal::new(),
            warned_uninitialized: false,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────

    pub fn initialize(&mut self, context: Box<dyn RenderContext>) {
        if self.context.is_some() {
            tracing::warn!("View controller already initialized, replacing context");
            self.shutdown();
        }
        self.context = Some(context);
        self.warned_uninitialized = false;
        tracing::info!("View controller initialized");
    }

    /// Remove every mapped renderable and give the context back.
    pub fn shutdown(&mut self) -> Option<Box<dyn RenderContext>> {
        let mut context = self.context.take()?;
        for (handle, _) in self.map.iter() {
            context.remove(handle);
        }
        for handle in self.strays.values().flatten() {
            context.remove(*handle);
        }
        self.map.clear();
        self.strays.clear();
        self.unselectable.clear();
        self.input.reset();
        tracing::info!("View controller shut down");
        Some(context)
    }

    fn report_uninitialized(&mut self, op: &str) {
        if !self.warned_uninitialized {
            tracing::error!("{op}: rendering context is not initialized");
            self.warned_uninitialized = true;
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    pub fn context(&self) -> Option<&dyn RenderContext> {
        self.context.as_deref()
    }

    pub fn context_mut(&mut self) -> Option<&mut (dyn RenderContext + 'static)> {
        self.context.as_deref_mut()
    }

    pub fn viewport(&self) -> ViewportId {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: ViewportId) {
        self.viewport = viewport;
    }

    pub fn camera(&self) -> Option<&ArcBallCamera> {
        self.context.as_ref().map(|c| c.camera())
    }

    pub fn selection_changed(&self) -> &Signal<()> {
        &self.selection_changed
    }

    pub fn drag(&self) -> &Signal<DragPhase> {
        &self.drag
    }

    // ── Binding ──────────────────────────────────────────────

    /// Bind a renderable to a scene object and display it.
    pub fn add_object(&mut self, handle: RenderableHandle, object: ObjectId, disable_selection: bool) -> bool {
        let Some(context) = self.context.as_mut() else {
            tracing::error!("add_object: rendering context is not initialized");
            return false;
        };
        if !context.contains(handle) {
            tracing::warn!("add_object: renderable {:?} does not belong to the context", handle);
            return false;
        }
        if context.is_displayed(handle) {
            tracing::warn!("Cannot add a renderable that is already displayed");
            return false;
        }

        context.display(handle, !disable_selection);

        match self.map.renderable_for(object) {
            Some(existing) if existing == handle => {
                tracing::debug!("Re-displaying renderable of object {}", object.short());
            }
            Some(_) => {
                tracing::warn!("Cannot bind renderable to object {}: already bound", object.short());
                self.strays.entry(object).or_default().push(handle);
            }
            None => {
                if let Some(other) = self.map.object_for(handle) {
                    tracing::warn!("Renderable {:?} is already bound to object {}", handle, other.short());
                } else {
                    tracing::debug!("Binding renderable {:?} to object {}", handle, object.short());
                    self.map.bind(handle, object);
                    if disable_selection {
                        self.unselectable.insert(handle);
                    }
                }
            }
        }

        context.fit_all(FIT_MARGIN, false);
        context.invalidate();
        true
    }

    /// Display a helper renderable that belongs to no scene object.
    pub fn add_auxiliary(&mut self, handle: RenderableHandle) {
        let Some(context) = self.context.as_mut() else {
            tracing::error!("add_auxiliary: rendering context is not initialized");
            return;
        };
        if !context.is_displayed(handle) {
            context.display(handle, false);
            context.invalidate();
        }
    }

    pub fn interactive_object(&self, object: ObjectId) -> Result<RenderableHandle> {
        self.map
            .renderable_for(object)
            .ok_or(Error::ObjectNotFound(object))
    }

    pub fn object_for(&self, handle: RenderableHandle) -> Option<ObjectId> {
        self.map.object_for(handle)
    }

    pub fn bound_count(&self) -> usize {
        self.map.len()
    }

    pub fn stray_count(&self) -> usize {
        self.strays.values().map(Vec::len).sum()
    }

    // ── Reconciliation ───────────────────────────────────────

    /// Make the context's display and selection state match the scene.
    /// Returns whether anything changed.
    pub fn reconcile(&mut self, scene: &SceneTree) -> bool {
        let Some(context) = self.context.as_mut() else {
            self.report_uninitialized("reconcile");
            return false;
        };
        if self.map.is_empty() && self.strays.is_empty() {
            return false;
        }

        let mut need_redraw = false;
        let mut visited: HashSet<RenderableHandle> = HashSet::new();
        let live: HashSet<ObjectId> = scene.live_objects().into_iter().collect();

        for &id in &live {
            let Some(handle) = self.map.renderable_for(id) else {
                tracing::trace!("No renderable bound to object {}", id.short());
                continue;
            };
            visited.insert(handle);

            let visible = scene.is_visible(id, self.viewport);
            if context.is_displayed(handle) != visible {
                if visible {
                    context.display(handle, !self.unselectable.contains(&handle));
                } else {
                    context.erase(handle);
                }
                need_redraw = true;
            }

            for &stray in self.strays.get(&id).into_iter().flatten() {
                if context.is_displayed(stray) != visible {
                    if visible {
                        context.display(stray, false);
                    } else {
                        context.erase(stray);
                    }
                    need_redraw = true;
                }
            }

            let selected = scene.get(id).is_some_and(|o| o.is_selected());
            if visible && context.is_selected(handle) != selected {
                context.add_or_remove_selected(handle);
                need_redraw = true;
            }
        }

        let orphans: Vec<RenderableHandle> = self
            .map
            .iter()
            .filter(|(h, _)| !visited.contains(h))
            .map(|(h, _)| h)
            .collect();
        for handle in orphans {
            tracing::debug!("Removing renderable {:?}", handle);
            context.remove(handle);
            self.map.unbind_handle(handle);
            self.unselectable.remove(&handle);
            need_redraw = true;
        }

        let gone: Vec<ObjectId> = self
            .strays
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        for id in gone {
            for handle in self.strays.remove(&id).unwrap_or_default() {
                context.remove(handle);
                need_redraw = true;
            }
        }

        need_redraw
    }

    /// Native selection is authoritative: copy it into the scene.
    pub fn on_native_selection_changed(&mut self, scene: &mut SceneTree) {
        let Some(context) = self.context.as_ref() else {
            tracing::error!("on_native_selection_changed: rendering context is not initialized");
            return;
        };
        for (handle, id) in self.map.iter() {
            let selected = context.is_selected(handle);
            if let Some(object) = scene.get_mut(id) {
                if object.select(selected) {
                    // The context already shows the highlight.
                    object.reset_redraw_flag();
                }
            }
        }
        self.selection_changed.emit(&());
    }

    pub fn on_object_drag_state_changed(&self, phase: DragPhase) {
        tracing::debug!("Object drag {:?}", phase);
        self.drag.emit(&phase);
    }

    // ── Frame ────────────────────────────────────────────────

    pub fn pre_draw(&mut self, rect: ViewportRect, framebuffer: Vec2, scale_factor: f32) {
        self.rect = rect;
        self.framebuffer = framebuffer;
        let Some(context) = self.context.as_mut() else {
            self.report_uninitialized("pre_draw");
            return;
        };

        let size = rect.size();
        if size.x > 0.0 && size.y > 0.0 && size != context.view_size() {
            context.resize(size);
            context.invalidate();
        }
        if (self.scale_factor - scale_factor).abs() > 1e-4 {
            self.scale_factor = scale_factor;
            context.invalidate();
        }
    }

    /// Apply queued camera gestures, click selection and drag phases.
    pub fn flush_view_events(&mut self, scene: &mut SceneTree) {
        let Some(context) = self.context.as_mut() else {
            self.input.reset();
            self.report_uninitialized("flush_view_events");
            return;
        };

        let rotate = std::mem::take(&mut self.input.rotate);
        let pan = std::mem::take(&mut self.input.pan);
        let zoom = std::mem::take(&mut self.input.zoom);
        let mut camera_moved = false;
        if rotate != Vec2::ZERO {
            context.camera_mut().rotate(rotate.x * ROTATE_SPEED, rotate.y * ROTATE_SPEED);
            camera_moved = true;
        }
        if pan != Vec2::ZERO {
            let size = context.view_size();
            let target = context.camera().target;
            let pixel = context.camera().pixel_size_at(target, size);
            context.camera_mut().pan(-pan.x * pixel, pan.y * pixel);
            camera_moved = true;
        }
        if zoom != 0.0 {
            context.camera_mut().zoom(zoom * ZOOM_SPEED);
            camera_moved = true;
        }
        if camera_moved {
            context.invalidate_immediate();
        }

        let selection_changed = match self.input.click.take() {
            Some((pos, toggle)) => context.select_at(pos, toggle),
            None => false,
        };
        if selection_changed {
            self.on_native_selection_changed(scene);
        }

        for phase in std::mem::take(&mut self.input.drag_events) {
            self.on_object_drag_state_changed(phase);
        }
    }

    pub fn post_draw(&mut self, scene: &SceneTree) -> bool {
        let need_redraw = self.reconcile(scene);
        if need_redraw {
            self.force_invalidate();
        }
        need_redraw
    }

    // ── Input ────────────────────────────────────────────────

    pub fn set_render_window_focus(&mut self, focus: bool) {
        if self.focus && !focus {
            if self.input.object_drag == ObjectDrag::Active {
                self.input.drag_events.push(DragPhase::Abort);
            }
            self.input.reset();
        }
        self.focus = focus;
    }

    pub fn has_focus(&self) -> bool {
        self.focus
    }

    pub fn on_mouse_down(&mut self, button: MouseButton, mods: Modifiers) -> bool {
        if !self.focus {
            return false;
        }
        self.input.pressed = Some((button, mods));
        self.input.press_pos = self.input.last_pos;
        self.input.moved = false;

        if button == MouseButton::Left && mods.contains(Modifiers::CTRL) {
            let on_selected = self.context.as_ref().is_some_and(|c| {
                c.pick_all(self.input.last_pos)
                    .first()
                    .is_some_and(|hit| c.is_selected(hit.handle))
            });
            if on_selected {
                self.input.object_drag = ObjectDrag::Armed;
            }
        }
        true
    }

    pub fn on_mouse_up(&mut self, button: MouseButton, mods: Modifiers) -> bool {
        if !self.focus {
            return false;
        }
        if let Some((pressed, _)) = self.input.pressed {
            if pressed == button {
                match self.input.object_drag {
                    ObjectDrag::Active => self.input.drag_events.push(DragPhase::Stop),
                    _ if !self.input.moved && button == MouseButton::Left => {
                        self.input.click = Some((self.input.last_pos, mods.contains(Modifiers::SHIFT)));
                    }
                    _ => {}
                }
                self.input.pressed = None;
                self.input.object_drag = ObjectDrag::Idle;
            }
        }
        true
    }

    /// `x`, `y` are framebuffer pixels with the origin at the top-left.
    pub fn on_mouse_move(&mut self, x: f32, y: f32) -> bool {
        if !self.focus {
            self.input.reset();
            return false;
        }
        let pos = self.adjust_mouse_position(x, y);
        let delta = pos - self.input.last_pos;
        self.input.last_pos = pos;

        if let Some(context) = self.context.as_ref() {
            self.mouse_world = match context.pick_all(pos).first() {
                Some(hit) => hit.world_point,
                None => context.camera().view_plane_point(pos, context.view_size()),
            };
        }

        let Some((button, _)) = self.input.pressed else {
            return true;
        };
        if !self.input.moved && pos.distance(self.input.press_pos) > DRAG_THRESHOLD {
            self.input.moved = true;
            // Movement before the threshold still counts towards the gesture.
            let total = pos - self.input.press_pos;
            if self.input.object_drag == ObjectDrag::Armed {
                self.input.object_drag = ObjectDrag::Active;
                self.input.drag_events.push(DragPhase::Start);
                self.input.drag_events.push(DragPhase::Confirmed);
                return true;
            }
            self.queue_gesture(button, total);
            return true;
        }
        if self.input.moved {
            match self.input.object_drag {
                ObjectDrag::Active => self.input.drag_events.push(DragPhase::Update),
                _ => self.queue_gesture(button, delta),
            }
        }
        true
    }

    fn queue_gesture(&mut self, button: MouseButton, delta: Vec2) {
        match button {
            MouseButton::Left => self.input.rotate += delta,
            MouseButton::Middle => self.input.pan += delta,
            MouseButton::Right => {}
        }
    }

    pub fn on_mouse_scroll(&mut self, delta: f32) -> bool {
        if !self.focus {
            return false;
        }
        self.input.zoom += delta;
        true
    }

    /// Framebuffer pixel to viewport-local pixel.
    pub fn adjust_mouse_position(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(x - self.rect.min.x, y + self.rect.max.y - self.framebuffer.y)
    }

    pub fn is_mouse_in_viewport(&self, x: f32, y: f32) -> bool {
        let flipped = self.framebuffer.y - y;
        x >= self.rect.min.x
            && x <= self.rect.max.x
            && flipped >= self.rect.min.y
            && flipped <= self.rect.max.y
    }

    /// Viewport-local cursor position from the last move event
    pub fn mouse_pos(&self) -> Vec2 {
        self.input.last_pos
    }

    /// World point under the cursor: the picked surface, else the view plane
    /// through the camera target.
    pub fn mouse_position_in_view(&self) -> Vec3 {
        self.mouse_world
    }

    pub fn pick_all(&self, pos: Vec2) -> Vec<PickHit> {
        self.context
            .as_ref()
            .map(|c| c.pick_all(pos))
            .unwrap_or_default()
    }

    // ── View ─────────────────────────────────────────────────

    pub fn fit_all(&mut self, selected_only: bool, margin: f32) {
        let Some(context) = self.context.as_mut() else {
            self.report_uninitialized("fit_all");
            return;
        };
        context.fit_all(margin.clamp(0.0, 1.0), selected_only);
        context.invalidate();
    }

    pub fn clear_selection(&mut self) {
        let Some(context) = self.context.as_mut() else {
            self.report_uninitialized("clear_selection");
            return;
        };
        context.clear_selected();
        context.invalidate_immediate();
    }

    pub fn set_projection(&mut self, projection: Projection) {
        let Some(context) = self.context.as_mut() else {
            self.report_uninitialized("set_projection");
            return;
        };
        context.camera_mut().projection = projection;
        context.fit_all(FIT_MARGIN, false);
        context.invalidate();
    }

    pub fn force_invalidate(&mut self) {
        let Some(context) = self.context.as_mut() else {
            self.report_uninitialized("force_invalidate");
            return;
        };
        context.invalidate();
    }

    pub fn force_invalidate_immediate(&mut self) {
        let Some(context) = self.context.as_mut() else {
            self.report_uninitialized("force_invalidate_immediate");
            return;
        };
        context.invalidate_immediate();
    }
}

impl std::fmt::Debug for ViewController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewController")
            .field("initialized", &self.context.is_some())
            .field("bound", &self.map.len())
            .field("viewport", &self.viewport)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::render::{InteractiveContext, MeshDataSource, Renderable};
    use crate::viewport::mesh;

    fn initialized() -> ViewController {
        let mut view = ViewController::new();
        view.initialize(Box::new(InteractiveContext::new(Vec2::new(800.0, 600.0))));
        view
    }

    fn create(view: &mut ViewController) -> RenderableHandle {
        let source = MeshDataSource::from_mesh(Arc::new(mesh::cube(1.0, 1.0, 1.0)));
        view.context_mut()
            .unwrap()
            .create(Renderable::new("cube", Arc::new(source)))
    }

    #[test]
    fn test_uninitialized_add_fails() {
        let mut view = ViewController::new();
        assert!(!view.is_initialized());
        let mut other = initialized();
        let handle = create(&mut other);
        assert!(!view.add_object(handle, ObjectId::new(), false));
    }

    #[test]
    fn test_uninitialized_frame_calls_are_reported_once() {
        let mut view = ViewController::new();
        assert!(!view.reconcile(&SceneTree::new()));
        assert!(view.warned_uninitialized);
        view.pre_draw(ViewportRect::default(), Vec2::ZERO, 1.0);
        view.fit_all(false, 0.1);
        assert!(view.warned_uninitialized);

        view.initialize(Box::new(InteractiveContext::new(Vec2::new(640.0, 480.0))));
        assert!(!view.warned_uninitialized);
    }

    #[test]
    fn test_interactive_object_not_found() {
        let view = initialized();
        let id = ObjectId::new();
        assert!(matches!(view.interactive_object(id), Err(Error::ObjectNotFound(x)) if x == id));
    }

    #[test]
    fn test_add_binds_and_displays() {
        let mut view = initialized();
        let handle = create(&mut view);
        let id = ObjectId::new();
        assert!(view.add_object(handle, id, false));
        assert_eq!(view.interactive_object(id).unwrap(), handle);
        assert_eq!(view.object_for(handle), Some(id));
        assert!(view.context().unwrap().is_displayed(handle));
        assert!(!view.add_object(handle, id, false));
    }

    #[test]
    fn test_adjust_mouse_position() {
        let mut view = initialized();
        view.pre_draw(
            ViewportRect::new(Vec2::new(100.0, 50.0), Vec2::new(900.0, 650.0)),
            Vec2::new(1000.0, 700.0),
            1.0,
        );
        // Top-left corner of the viewport in top-left framebuffer coordinates
        assert_eq!(view.adjust_mouse_position(100.0, 50.0), Vec2::new(0.0, 0.0));
        assert_eq!(view.adjust_mouse_position(500.0, 350.0), Vec2::new(400.0, 300.0));
        assert!(view.is_mouse_in_viewport(500.0, 350.0));
        assert!(!view.is_mouse_in_viewport(50.0, 350.0));
        assert_eq!(view.context().unwrap().view_size(), Vec2::new(800.0, 600.0));
    }

    #[test]
    fn test_input_requires_focus() {
        let mut view = initialized();
        assert!(!view.on_mouse_down(MouseButton::Left, Modifiers::empty()));
        assert!(!view.on_mouse_scroll(1.0));
        view.set_render_window_focus(true);
        assert!(view.on_mouse_down(MouseButton::Left, Modifiers::empty()));
        assert!(view.on_mouse_up(MouseButton::Left, Modifiers::empty()));
    }

    #[test]
    fn test_scroll_zooms_on_flush() {
        let mut view = initialized();
        let mut scene = SceneTree::new();
        view.set_render_window_focus(true);
        let before = view.camera().unwrap().distance;
        view.on_mouse_scroll(1.0);
        view.flush_view_events(&mut scene);
        assert!(view.camera().unwrap().distance < before);
    }

    #[test]
    fn test_shutdown_removes_bound_renderables() {
        let mut view = initialized();
        let handle = create(&mut view);
        view.add_object(handle, ObjectId::new(), false);
        let context = view.shutdown().unwrap();
        assert!(!context.contains(handle));
        assert_eq!(view.bound_count(), 0);
        assert!(view.shutdown().is_none());
    }
}
