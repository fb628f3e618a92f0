//! 3D viewport panel: feeds egui input to the [`Viewer`] and paints its
//! presentations with OpenGL

mod gl_renderer;
pub use meshview_gui_lib::viewport::{camera, mesh, picking};

use std::sync::{Arc, Mutex};

use egui::Ui;
use glam::Vec2;

use camera::ArcBallCamera;
use gl_renderer::{FrameParams, GlRenderer};
use meshview_gui_lib::input::{Key, Modifiers, MouseButton};
use meshview_gui_lib::render::{RenderContext, ViewportRect};
use meshview_gui_lib::settings::AppSettings;
use meshview_gui_lib::viewer::Viewer;

/// Events the panel reports back to the app
#[derive(Default)]
pub struct ViewportResponse {
    /// Primary click without a drag, in viewport-local pixels
    pub clicked_at: Option<Vec2>,
}

/// 3D viewport panel with OpenGL rendering
pub struct ViewportPanel {
    gl_renderer: Option<Arc<Mutex<GlRenderer>>>,
    had_focus: bool,
}

impl ViewportPanel {
    pub fn new() -> Self {
        Self {
            gl_renderer: None,
            had_focus: false,
        }
    }

    /// Initialize GL renderer (must be called with a GL context)
    pub fn init_gl(&mut self, gl: &glow::Context) {
        match GlRenderer::new(gl) {
            Ok(renderer) => self.gl_renderer = Some(Arc::new(Mutex::new(renderer))),
            Err(e) => tracing::error!("GL renderer unavailable: {e}"),
        }
    }

    pub fn destroy(&mut self, gl: &glow::Context) {
        if let Some(renderer) = self.gl_renderer.take() {
            if let Ok(mut r) = renderer.lock() {
                r.destroy(gl);
            }
        }
    }

    pub fn show(&mut self, ui: &mut Ui, viewer: &mut Viewer, settings: &AppSettings) -> ViewportResponse {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());

        let ppp = ui.ctx().pixels_per_point();
        let framebuffer = Vec2::new(ui.ctx().screen_rect().width(), ui.ctx().screen_rect().height()) * ppp;
        let view_rect = ViewportRect::new(
            Vec2::new(rect.left() * ppp, framebuffer.y - rect.bottom() * ppp),
            Vec2::new(rect.right() * ppp, framebuffer.y - rect.top() * ppp),
        );

        // ── Focus ────────────────────────────────────────────
        let focus = ui.input(|i| i.focused) && (response.hovered() || response.dragged());
        if focus != self.had_focus {
            viewer.set_focus(focus);
            self.had_focus = focus;
        }

        // ── Input ────────────────────────────────────────────
        let mut out = ViewportResponse::default();
        if focus {
            self.forward_input(ui, viewer, ppp);
            if response.clicked() {
                out.clicked_at = response
                    .interact_pointer_pos()
                    .map(|p| Vec2::new((p.x - rect.left()) * ppp, (p.y - rect.top()) * ppp));
            }
        }

        // ── Frame ────────────────────────────────────────────
        viewer.set_ui_scale(settings.ui.scale);
        if viewer.frame(view_rect, framebuffer, ppp) {
            ui.ctx().request_repaint();
        }

        if !ui.is_rect_visible(rect) {
            return out;
        }

        self.render_gl(ui, rect, viewer, settings);
        self.draw_overlays(ui, rect, viewer);
        out
    }

    fn forward_input(&mut self, ui: &Ui, viewer: &mut Viewer, ppp: f32) {
        let events = ui.input(|i| i.events.clone());
        for event in events {
            match event {
                egui::Event::PointerMoved(pos) => {
                    viewer.mouse_move(pos.x * ppp, pos.y * ppp);
                }
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    modifiers,
                } => {
                    let Some(button) = map_button(button) else {
                        continue;
                    };
                    viewer.mouse_move(pos.x * ppp, pos.y * ppp);
                    let mods = map_modifiers(modifiers);
                    if pressed {
                        viewer.mouse_down(button, mods);
                    } else {
                        viewer.mouse_up(button, mods);
                    }
                }
                egui::Event::MouseWheel { delta, .. } => {
                    viewer.mouse_scroll(delta.y);
                }
                egui::Event::Key {
                    key,
                    pressed: true,
                    modifiers,
                    ..
                } => {
                    if let Some(key) = map_key(key) {
                        viewer.key_down(key, map_modifiers(modifiers));
                    }
                }
                _ => {}
            }
        }
    }

    fn render_gl(&self, ui: &mut Ui, rect: egui::Rect, viewer: &Viewer, settings: &AppSettings) {
        let Some(gl_renderer) = &self.gl_renderer else {
            ui.painter().rect_filled(rect, 0.0, background(settings));
            return;
        };
        let Some(context) = viewer.view().context() else {
            return;
        };

        let renderer = gl_renderer.clone();
        let camera: ArcBallCamera = *context.camera();
        let presentations = context.presentations();
        let grid_settings = settings.grid.clone();
        let axes_settings = settings.axes.clone();
        let bg_color = settings.viewport.background_color;

        let callback = egui::PaintCallback {
            rect,
            callback: Arc::new(eframe::egui_glow::CallbackFn::new(move |info, painter| {
                let gl = painter.gl();
                let clip = info.clip_rect_in_pixels();
                let params = FrameParams {
                    viewport: [
                        clip.left_px as f32,
                        clip.from_bottom_px as f32,
                        clip.width_px as f32,
                        clip.height_px as f32,
                    ],
                    grid_visible: grid_settings.visible,
                    axes_visible: axes_settings.visible,
                    bg_color,
                };

                let Ok(mut r) = renderer.lock() else {
                    return;
                };
                let synced = r
                    .update_grid(gl, &grid_settings)
                    .and_then(|_| r.update_axes(gl, &axes_settings))
                    .and_then(|_| r.sync(gl, &presentations));
                if let Err(e) = synced {
                    tracing::error!("GL upload failed: {e}");
                }
                r.paint(gl, &camera, &params, &presentations);
            })),
        };
        ui.painter().add(callback);
    }

    fn draw_overlays(&self, ui: &mut Ui, rect: egui::Rect, viewer: &Viewer) {
        let painter = ui.painter_at(rect);
        let Some(context) = viewer.view().context() else {
            return;
        };
        let camera = context.camera();
        let size = Vec2::new(rect.width(), rect.height());

        // Axis labels
        let labels = [
            (glam::Vec3::X * 1.6, "X", egui::Color32::from_rgb(220, 70, 70)),
            (glam::Vec3::Y * 1.6, "Y", egui::Color32::from_rgb(70, 200, 70)),
            (glam::Vec3::Z * 1.6, "Z", egui::Color32::from_rgb(70, 110, 220)),
        ];
        for (pos, label, color) in labels {
            if let Some(screen) = camera.project(pos, size) {
                let screen = rect.min + egui::vec2(screen.x, screen.y);
                if rect.contains(screen) {
                    painter.text(screen, egui::Align2::LEFT_BOTTOM, label, egui::FontId::monospace(12.0), color);
                }
            }
        }

        // Camera info
        let overlay_rect = egui::Rect::from_min_size(
            egui::pos2(rect.right() - 140.0, rect.top() + 4.0),
            egui::vec2(136.0, 44.0),
        );
        painter.rect_filled(overlay_rect, 4.0, egui::Color32::from_rgba_premultiplied(0, 0, 0, 140));
        painter.text(
            overlay_rect.min + egui::vec2(6.0, 4.0),
            egui::Align2::LEFT_TOP,
            format!(
                "Dist: {:.1}\nYaw: {:.0}  Pitch: {:.0}",
                camera.distance,
                camera.yaw.to_degrees(),
                camera.pitch.to_degrees(),
            ),
            egui::FontId::monospace(10.0),
            egui::Color32::from_rgb(160, 160, 170),
        );

        if viewer.scene().is_empty() {
            painter.text(
                egui::pos2(rect.center().x, rect.bottom() - 20.0),
                egui::Align2::CENTER_BOTTOM,
                "Drag to rotate, middle-drag to pan, scroll to zoom",
                egui::FontId::proportional(11.0),
                egui::Color32::from_rgb(100, 100, 110),
            );
        }
    }
}

fn background(settings: &AppSettings) -> egui::Color32 {
    let [r, g, b] = settings.viewport.background_color;
    egui::Color32::from_rgb(r, g, b)
}

fn map_button(button: egui::PointerButton) -> Option<MouseButton> {
    match button {
        egui::PointerButton::Primary => Some(MouseButton::Left),
        egui::PointerButton::Secondary => Some(MouseButton::Right),
        egui::PointerButton::Middle => Some(MouseButton::Middle),
        _ => None,
    }
}

fn map_modifiers(m: egui::Modifiers) -> Modifiers {
    let mut mods = Modifiers::empty();
    mods.set(Modifiers::SHIFT, m.shift);
    mods.set(Modifiers::CTRL, m.ctrl);
    mods.set(Modifiers::ALT, m.alt);
    mods.set(Modifiers::SUPER, m.mac_cmd);
    mods
}

fn map_key(key: egui::Key) -> Option<Key> {
    match key {
        egui::Key::Escape => Some(Key::Escape),
        egui::Key::Delete => Some(Key::Delete),
        egui::Key::Enter => Some(Key::Enter),
        other => {
            let mut chars = other.name().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(Key::Char(c.to_ascii_lowercase())),
                _ => None,
            }
        }
    }
}
