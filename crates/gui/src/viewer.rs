//! Frame driver tying the scene, the view controller, per-object renderers
//! and input listeners together.

use std::collections::HashMap;

use glam::{Vec2, Vec3};

use crate::gpu::GpuCapabilities;
use crate::input::{InputListener, InputRouter, Key, Modifiers, MouseButton};
use crate::render::{RenderContext, RenderInteractiveMeshObject, RenderParams, ViewController, ViewportRect};
use crate::scene::{ObjectId, SceneTree, ViewportId};
use crate::settings::UnitSettings;
use crate::widgets::PointOnObject;

#[derive(Debug)]
pub struct ViewerConfig {
    pub viewport: ViewportId,
    /// Multiplier for pixel-sized widgets
    pub ui_scale: f32,
    pub units: UnitSettings,
    pub gpu: GpuCapabilities,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportId::MAIN,
            ui_scale: 1.0,
            units: UnitSettings::default(),
            gpu: GpuCapabilities::unavailable(),
        }
    }
}

/// Borrowed view of the viewer handed to input listeners.
pub struct ViewerCx<'a> {
    pub scene: &'a mut SceneTree,
    pub view: &'a mut ViewController,
    pub router: &'a InputRouter,
    /// Cursor in viewport pixels, top-left origin
    pub mouse_pos: Vec2,
    pub ui_scale: f32,
}

impl ViewerCx<'_> {
    /// Nearest pickable, visible scene object under the cursor.
    pub fn pick_render_object(&self) -> Option<(ObjectId, PointOnObject)> {
        let viewport = self.view.viewport();
        self.view.pick_all(self.mouse_pos).iter().find_map(|hit| {
            let object = self.view.object_for(hit.handle)?;
            let pickable = self.scene.get(object).is_some_and(|o| o.is_pickable());
            (pickable && self.scene.is_visible(object, viewport)).then(|| (object, PointOnObject::from(hit)))
        })
    }

    pub fn camera_eye(&self) -> Option<Vec3> {
        self.view.camera().map(|c| c.eye_position())
    }

    /// World size of one screen pixel at `point`
    pub fn pixel_size_at(&self, point: Vec3) -> Option<f32> {
        let context = self.view.context()?;
        Some(context.camera().pixel_size_at(point, context.view_size()))
    }
}

pub struct Viewer {
    scene: SceneTree,
    view: ViewController,
    renderers: HashMap<ObjectId, RenderInteractiveMeshObject>,
    router: InputRouter,
    units: UnitSettings,
    gpu: GpuCapabilities,
    params: RenderParams,
    ui_scale: f32,
    mouse_pos: Vec2,
    frame_count: u64,
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        let mut view = ViewController::new();
        view.set_viewport(config.viewport);
        tracing::info!(
            "Viewer created (viewport {}, gpu {})",
            config.viewport.index(),
            if config.gpu.is_available() { "available" } else { "unavailable" }
        );
        Self {
            scene: SceneTree::new(),
            view,
            renderers: HashMap::new(),
            router: InputRouter::new(),
            units: config.units,
            gpu: config.gpu,
            params: RenderParams {
                viewport: config.viewport,
            },
            ui_scale: config.ui_scale,
            mouse_pos: Vec2::ZERO,
            frame_count: 0,
        }
    }

    pub fn initialize(&mut self, context: Box<dyn RenderContext>) {
        self.view.initialize(context);
    }

    // ── Accessors ────────────────────────────────────────────

    pub fn scene(&self) -> &SceneTree {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneTree {
        &mut self.scene
    }

    /// Swap in a new scene. Renderers of the old one are dropped and their
    /// renderables removed at the next reconcile.
    pub fn set_scene(&mut self, scene: SceneTree) -> SceneTree {
        self.renderers.clear();
        tracing::info!("Scene replaced ({} objects)", scene.len());
        std::mem::replace(&mut self.scene, scene)
    }

    pub fn view(&self) -> &ViewController {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewController {
        &mut self.view
    }

    pub fn router(&self) -> &InputRouter {
        &self.router
    }

    pub fn units(&self) -> &UnitSettings {
        &self.units
    }

    pub fn units_mut(&mut self) -> &mut UnitSettings {
        &mut self.units
    }

    pub fn gpu(&self) -> &GpuCapabilities {
        &self.gpu
    }

    pub fn renderer(&self, object: ObjectId) -> Option<&RenderInteractiveMeshObject> {
        self.renderers.get(&object)
    }

    pub fn renderer_count(&self) -> usize {
        self.renderers.len()
    }

    pub fn ui_scale(&self) -> f32 {
        self.ui_scale
    }

    pub fn set_ui_scale(&mut self, scale: f32) {
        self.ui_scale = scale.max(0.1);
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn mouse_pos(&self) -> Vec2 {
        self.mouse_pos
    }

    /// Context for driving widgets outside of input dispatch
    pub fn cx(&mut self) -> ViewerCx<'_> {
        ViewerCx {
            scene: &mut self.scene,
            view: &mut self.view,
            router: &self.router,
            mouse_pos: self.mouse_pos,
            ui_scale: self.ui_scale,
        }
    }

    // ── Frame ────────────────────────────────────────────────

    /// Run one frame. Returns true when the reconcile step changed what is
    /// displayed and another frame should follow.
    pub fn frame(&mut self, rect: ViewportRect, framebuffer: Vec2, scale_factor: f32) -> bool {
        self.frame_count += 1;

        self.view.pre_draw(rect, framebuffer, scale_factor);
        {
            let mut cx = ViewerCx {
                scene: &mut self.scene,
                view: &mut self.view,
                router: &self.router,
                mouse_pos: self.mouse_pos,
                ui_scale: self.ui_scale,
            };
            self.router.broadcast(|l| l.on_pre_draw(&mut cx));
        }

        self.view.flush_view_events(&mut self.scene);
        self.render_objects();
        self.view.post_draw(&self.scene)
    }

    fn render_objects(&mut self) {
        let scene = &mut self.scene;
        self.renderers.retain(|id, _| scene.contains(*id));

        for id in scene.live_objects() {
            if !scene.is_visible(id, self.params.viewport) {
                continue;
            }
            let Some(world_xf) = scene.world_xf(id) else {
                continue;
            };
            let Some(object) = scene.get_mut(id) else {
                continue;
            };
            let renderer = self
                .renderers
                .entry(id)
                .or_insert_with(|| RenderInteractiveMeshObject::new(object));
            renderer.render(object, world_xf, &mut self.view, &self.params);
        }
    }

    // ── Input ────────────────────────────────────────────────

    pub fn mouse_down(&mut self, button: MouseButton, mods: Modifiers) -> bool {
        if self.dispatch(|l, cx| l.on_mouse_down(cx, button, mods)) {
            return true;
        }
        self.view.on_mouse_down(button, mods)
    }

    pub fn mouse_up(&mut self, button: MouseButton, mods: Modifiers) -> bool {
        if self.dispatch(|l, cx| l.on_mouse_up(cx, button, mods)) {
            return true;
        }
        self.view.on_mouse_up(button, mods)
    }

    /// `x`, `y` are framebuffer pixels with the origin at the top-left.
    pub fn mouse_move(&mut self, x: f32, y: f32) -> bool {
        self.mouse_pos = self.view.adjust_mouse_position(x, y);
        if self.dispatch(|l, cx| l.on_mouse_move(cx, x, y)) {
            return true;
        }
        self.view.on_mouse_move(x, y)
    }

    pub fn mouse_scroll(&mut self, delta: f32) -> bool {
        if self.dispatch(|l, cx| l.on_mouse_scroll(cx, delta)) {
            return true;
        }
        self.view.on_mouse_scroll(delta)
    }

    pub fn key_down(&mut self, key: Key, mods: Modifiers) -> bool {
        self.dispatch(|l, cx| l.on_key_down(cx, key, mods))
    }

    pub fn set_focus(&mut self, focus: bool) {
        if !focus && self.view.has_focus() {
            let mut cx = ViewerCx {
                scene: &mut self.scene,
                view: &mut self.view,
                router: &self.router,
                mouse_pos: self.mouse_pos,
                ui_scale: self.ui_scale,
            };
            self.router.broadcast(|l| l.on_focus_lost(&mut cx));
        }
        self.view.set_render_window_focus(focus);
    }

    fn dispatch(&mut self, mut f: impl FnMut(&mut dyn InputListener, &mut ViewerCx<'_>) -> bool) -> bool {
        let mut cx = ViewerCx {
            scene: &mut self.scene,
            view: &mut self.view,
            router: &self.router,
            mouse_pos: self.mouse_pos,
            ui_scale: self.ui_scale,
        };
        self.router.dispatch(|l| f(l, &mut cx))
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.renderers.clear();
        self.view.shutdown();
    }
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("objects", &self.scene.len())
            .field("renderers", &self.renderers.len())
            .field("view", &self.view)
            .field("listeners", &self.router.listener_count())
            .field("frame_count", &self.frame_count)
            .finish()
    }
}
