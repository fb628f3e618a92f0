//! Main application module

mod keyboard;
mod menus;
mod styles;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use eframe::egui;
use glam::Vec2;

use meshview_gui_lib::gpu::{GpuCapabilities, GpuVersions};
use meshview_gui_lib::render::InteractiveContext;
use meshview_gui_lib::scene::{Capabilities, SceneTree};
use meshview_gui_lib::settings::AppSettings;
use meshview_gui_lib::viewer::{Viewer, ViewerConfig};
use meshview_gui_lib::widgets::SurfacePointWidget;

use crate::ui::{properties, scene_tree, status_bar};
use crate::viewport::ViewportPanel;

/// Which side panels are shown
pub struct PanelVisibility {
    pub scene_tree: bool,
    pub properties: bool,
}

impl Default for PanelVisibility {
    fn default() -> Self {
        Self {
            scene_tree: true,
            properties: true,
        }
    }
}

/// Main application
pub struct MeshViewApp {
    viewer: Viewer,
    settings: AppSettings,
    viewport: ViewportPanel,
    panels: PanelVisibility,
    show_settings_window: bool,
    /// Click-to-place surface point mode
    picking_point: bool,
    point_widget: Rc<RefCell<SurfacePointWidget>>,
    scene_path: Option<PathBuf>,
    status_message: Option<String>,
    last_font_size: f32,
}

impl MeshViewApp {
    pub fn new(cc: &eframe::CreationContext<'_>, initial_scene: Option<(PathBuf, SceneTree)>) -> Self {
        let settings = AppSettings::load();
        styles::configure_styles(&cc.egui_ctx, &settings.ui);

        let gpu = match cc.gl.as_ref() {
            Some(gl) => {
                use glow::HasContext;
                let version = gl.version();
                GpuCapabilities::new(GpuVersions {
                    max_driver: version.major * 10 + version.minor,
                    ..GpuVersions::default()
                })
            }
            None => GpuCapabilities::unavailable(),
        };

        let config = ViewerConfig {
            ui_scale: settings.ui.scale,
            units: settings.units.clone(),
            gpu,
            ..ViewerConfig::default()
        };
        let mut viewer = Viewer::new(config);
        let mut context = InteractiveContext::new(Vec2::new(800.0, 600.0));
        context.set_pick_tolerance(settings.viewport.pick_tolerance);
        viewer.initialize(Box::new(context));

        let mut scene_path = None;
        if let Some((path, scene)) = initial_scene {
            viewer.set_scene(scene);
            scene_path = Some(path);
        }

        let mut viewport = ViewportPanel::new();
        if let Some(gl) = cc.gl.as_ref() {
            viewport.init_gl(gl);
        }

        let last_font_size = settings.ui.font_size;
        Self {
            viewer,
            settings,
            viewport,
            panels: PanelVisibility::default(),
            show_settings_window: false,
            picking_point: false,
            point_widget: SurfacePointWidget::new(),
            scene_path,
            status_message: None,
            last_font_size,
        }
    }

    /// Replace the scene with the one stored at `path`.
    pub fn open_scene(&mut self, path: &Path) {
        self.clear_point();
        match SceneTree::load_file(path) {
            Ok(scene) => {
                tracing::info!("Loaded scene from {} ({} objects)", path.display(), scene.len());
                self.viewer.set_scene(scene);
                self.viewer.view_mut().fit_all(false, 0.1);
                self.scene_path = Some(path.to_path_buf());
                self.status_message = None;
            }
            Err(e) => {
                tracing::error!("Failed to load scene {}: {e}", path.display());
                self.status_message = Some(format!("Cannot open {}: {e}", path.display()));
            }
        }
    }

    pub fn new_scene(&mut self) {
        self.clear_point();
        self.viewer.set_scene(SceneTree::new());
        self.scene_path = None;
    }

    /// Drop the surface point marker, if any
    pub fn clear_point(&mut self) {
        self.point_widget.borrow_mut().reset(self.viewer.scene_mut());
    }

    /// Place the surface point on whatever mesh is under the cursor.
    fn place_point(&mut self) {
        let placed = {
            let mut cx = self.viewer.cx();
            let target = cx.pick_render_object().filter(|(object, _)| {
                cx.scene.get(*object).is_some_and(|o| {
                    !o.is_ancillary() && o.capabilities().contains(Capabilities::TRIANGLE_MESH)
                })
            });
            let Some((object, pick)) = target else {
                return;
            };
            let Ok(mut widget) = self.point_widget.try_borrow_mut() else {
                return;
            };
            widget.create_from_pick(&mut cx, object, &pick);
            widget.local_coordinates()
        };

        if let Some(local) = placed {
            let units = self.viewer.units();
            self.status_message = Some(format!(
                "Point at {}, {}, {}",
                units.format_length(local.x as f64),
                units.format_length(local.y as f64),
                units.format_length(local.z as f64),
            ));
        }
    }
}

impl eframe::App for MeshViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.settings.ui.font_size != self.last_font_size {
            styles::apply_font_size(ctx, self.settings.ui.font_size);
            self.last_font_size = self.settings.ui.font_size;
        }

        keyboard::handle_keyboard(ctx, self);

        // ── Menu bar ──────────────────────────────────────────
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                menus::file_menu(ui, self);
                menus::edit_menu(ui, self);
                menus::view_menu(ui, self);
                menus::settings_menu(ui, self);
            });
        });

        // ── Settings window ──────────────────────────────────
        menus::settings_window(ctx, self);

        // ── Status bar ───────────────────────────────────────
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(22.0)
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::symmetric(8, 2)))
            .show(ctx, |ui| {
                status_bar::show(ui, &self.viewer, self.picking_point, self.status_message.as_deref());
            });

        // ── Left panel: Scene tree ───────────────────────────
        let viewport_id = self.viewer.view().viewport();
        if self.panels.scene_tree {
            egui::SidePanel::left("scene_tree")
                .default_width(210.0)
                .width_range(140.0..=400.0)
                .resizable(true)
                .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::same(6)))
                .show(ctx, |ui| {
                    scene_tree::show(ui, self.viewer.scene_mut(), viewport_id);
                });
        }

        // ── Right panel: Properties ──────────────────────────
        if self.panels.properties {
            egui::SidePanel::right("right_panel")
                .default_width(290.0)
                .width_range(200.0..=500.0)
                .resizable(true)
                .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::same(6)))
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical().id_salt("props_scroll").show(ui, |ui| {
                        let units = self.viewer.units().clone();
                        properties::show(ui, self.viewer.scene_mut(), &units, viewport_id);
                    });
                });
        }

        // ── Central panel: 3D viewport ───────────────────────
        let response = egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.viewport.show(ui, &mut self.viewer, &self.settings))
            .inner;

        if self.picking_point && response.clicked_at.is_some() && !self.point_widget.borrow().is_on_move() {
            self.place_point();
        }
    }

    fn on_exit(&mut self, gl: Option<&glow::Context>) {
        self.clear_point();
        self.settings.units = self.viewer.units().clone();
        self.settings.save();
        if let Some(gl) = gl {
            self.viewport.destroy(gl);
        }
    }
}
