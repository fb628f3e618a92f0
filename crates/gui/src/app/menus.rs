//! Application menu bar and settings window

use eframe::egui;

use meshview_gui_lib::settings::{AppSettings, DegreesMode, LengthUnit, UnitSettings};
use meshview_gui_lib::viewport::camera::Projection;

use super::MeshViewApp;

/// Ask for a scene file and open it
pub fn open_dialog(app: &mut MeshViewApp) {
    if let Some(path) = rfd::FileDialog::new()
        .set_title("Open scene")
        .add_filter("JSON", &["json"])
        .pick_file()
    {
        app.open_scene(&path);
    }
}

/// Show the file menu
pub fn file_menu(ui: &mut egui::Ui, app: &mut MeshViewApp) {
    ui.menu_button("File", |ui| {
        if ui.button("New").clicked() {
            app.new_scene();
            ui.close_menu();
        }
        if ui.button("Open…").clicked() {
            ui.close_menu();
            open_dialog(app);
        }
        if ui
            .add_enabled(app.scene_path.is_some(), egui::Button::new("Reload"))
            .clicked()
        {
            if let Some(path) = app.scene_path.clone() {
                app.open_scene(&path);
            }
            ui.close_menu();
        }
        ui.separator();
        if ui.button("Quit").clicked() {
            ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
        }
    });
}

/// Show the edit menu
pub fn edit_menu(ui: &mut egui::Ui, app: &mut MeshViewApp) {
    ui.menu_button("Edit", |ui| {
        let has_selection = !app.viewer.scene().selected().is_empty();
        if ui
            .add_enabled(has_selection, egui::Button::new("Delete"))
            .clicked()
        {
            let scene = app.viewer.scene_mut();
            for id in scene.selected() {
                scene.remove(id);
            }
            ui.close_menu();
        }
        ui.separator();
        if ui.button("Select all").clicked() {
            let scene = app.viewer.scene_mut();
            for id in scene.live_objects() {
                if scene.get(id).is_some_and(|o| !o.is_ancillary()) {
                    scene.select(id, true);
                }
            }
            ui.close_menu();
        }
        if ui.button("Deselect all").clicked() {
            app.viewer.scene_mut().deselect_all();
            ui.close_menu();
        }
        ui.separator();
        let has_point = app.point_widget.borrow().marker().is_some();
        if ui
            .add_enabled(has_point, egui::Button::new("Clear surface point"))
            .clicked()
        {
            app.clear_point();
            app.status_message = None;
            ui.close_menu();
        }
    });
}

/// Show the view menu
pub fn view_menu(ui: &mut egui::Ui, app: &mut MeshViewApp) {
    ui.menu_button("View", |ui| {
        ui.checkbox(&mut app.panels.scene_tree, "Scene tree");
        ui.checkbox(&mut app.panels.properties, "Properties");
        ui.separator();
        if ui.button("Fit all").clicked() {
            app.viewer.view_mut().fit_all(false, 0.1);
            ui.close_menu();
        }
        let has_selection = !app.viewer.scene().selected().is_empty();
        if ui
            .add_enabled(has_selection, egui::Button::new("Fit selected"))
            .clicked()
        {
            app.viewer.view_mut().fit_all(true, 0.1);
            ui.close_menu();
        }
        ui.separator();
        let current = app.viewer.view().camera().map(|c| c.projection);
        for (projection, label) in [
            (Projection::Perspective, "Perspective"),
            (Projection::Orthographic, "Orthographic"),
        ] {
            if ui.radio(current == Some(projection), label).clicked() {
                app.viewer.view_mut().set_projection(projection);
                ui.close_menu();
            }
        }
        ui.separator();
        ui.checkbox(&mut app.picking_point, "Place surface point (P)");
    });
}

/// Show the settings menu
pub fn settings_menu(ui: &mut egui::Ui, app: &mut MeshViewApp) {
    ui.menu_button("Settings", |ui| {
        if ui.button("Preferences…").clicked() {
            app.show_settings_window = true;
            ui.close_menu();
        }
    });
}

/// Show the settings window
pub fn settings_window(ctx: &egui::Context, app: &mut MeshViewApp) {
    let mut open = app.show_settings_window;
    egui::Window::new("Preferences")
        .open(&mut open)
        .resizable(true)
        .default_width(400.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                show_unit_settings(ui, app.viewer.units_mut());
                show_grid_settings(ui, &mut app.settings);
                show_axes_settings(ui, &mut app.settings);
                show_viewport_settings(ui, &mut app.settings);
                show_ui_settings(ui, &mut app.settings);
                show_settings_buttons(ui, app);
            });
        });
    app.show_settings_window = app.show_settings_window && open;
}

fn show_unit_settings(ui: &mut egui::Ui, units: &mut UnitSettings) {
    ui.heading("Units");
    ui.horizontal(|ui| {
        ui.label("Length:");
        let current = units.ui_length_unit();
        let mut selected = current;
        egui::ComboBox::from_id_salt("length_unit_combo")
            .selected_text(current.map_or("No units", |u| u.display_name()))
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut selected, None, "No units");
                for unit in LengthUnit::all() {
                    ui.selectable_value(&mut selected, Some(*unit), unit.display_name());
                }
            });
        if selected != current {
            units.set_ui_length_unit(selected, true);
        }
    });

    ui.horizontal(|ui| {
        ui.label("Angles:");
        let current = units.degrees_mode();
        let mut selected = current;
        egui::ComboBox::from_id_salt("degrees_mode_combo")
            .selected_text(current.display_name())
            .show_ui(ui, |ui| {
                for mode in [
                    DegreesMode::Degrees,
                    DegreesMode::DegreesMinutes,
                    DegreesMode::DegreesMinutesSeconds,
                ] {
                    ui.selectable_value(&mut selected, mode, mode.display_name());
                }
            });
        if selected != current {
            units.set_degrees_mode(selected, true);
        }
    });

    egui::Grid::new("precision_grid").num_columns(2).show(ui, |ui| {
        ui.label("Length precision:");
        ui.add(egui::DragValue::new(&mut units.length_precision).range(0..=9));
        ui.end_row();
        ui.label("Angle precision:");
        ui.add(egui::DragValue::new(&mut units.angle_precision).range(0..=9));
        ui.end_row();
        ui.label("Ratio precision:");
        ui.add(egui::DragValue::new(&mut units.ratio_precision).range(0..=9));
        ui.end_row();
    });

    ui.checkbox(&mut units.show_leading_zero, "Leading zero");
    let mut grouped = units.thousands_separator.is_some();
    if ui.checkbox(&mut grouped, "Group thousands").changed() {
        units.thousands_separator = grouped.then_some(' ');
    }

    ui.weak(format!(
        "{}   {}   {}",
        units.format_length(1234.5678),
        units.format_angle(std::f64::consts::FRAC_PI_6 + 0.001),
        units.format_ratio(0.4567),
    ));
    ui.add_space(10.0);
}

fn show_grid_settings(ui: &mut egui::Ui, settings: &mut AppSettings) {
    ui.heading("Grid");
    ui.checkbox(&mut settings.grid.visible, "Visible");

    ui.horizontal(|ui| {
        ui.label("Cell size:");
        ui.add(
            egui::DragValue::new(&mut settings.grid.size)
                .speed(0.1)
                .range(0.1..=100.0),
        );
    });

    ui.horizontal(|ui| {
        ui.label("Range:");
        ui.add(egui::DragValue::new(&mut settings.grid.range).speed(1).range(1..=50));
    });

    ui.horizontal(|ui| {
        ui.label("Opacity:");
        ui.add(egui::Slider::new(&mut settings.grid.opacity, 0.0..=1.0));
    });
    ui.add_space(10.0);
}

fn show_axes_settings(ui: &mut egui::Ui, settings: &mut AppSettings) {
    ui.heading("Axes");
    ui.checkbox(&mut settings.axes.visible, "Visible");
    ui.horizontal(|ui| {
        ui.label("Length:");
        ui.add(
            egui::DragValue::new(&mut settings.axes.length)
                .speed(0.1)
                .range(0.1..=10.0),
        );
    });
    ui.add_space(10.0);
}

fn show_viewport_settings(ui: &mut egui::Ui, settings: &mut AppSettings) {
    ui.heading("Viewport");
    ui.horizontal(|ui| {
        ui.label("Background:");
        let [r, g, b] = settings.viewport.background_color;
        let mut color = egui::Color32::from_rgb(r, g, b);
        if ui.color_edit_button_srgba(&mut color).changed() {
            settings.viewport.background_color = [color.r(), color.g(), color.b()];
        }
    });

    ui.horizontal(|ui| {
        ui.label("Pick tolerance:");
        ui.add(
            egui::DragValue::new(&mut settings.viewport.pick_tolerance)
                .speed(0.5)
                .range(0.0..=30.0)
                .suffix(" px"),
        );
    })
    .response
    .on_hover_text("Applies after restart");

    ui.checkbox(&mut settings.viewport.antialiasing, "Antialiasing");
    ui.add_space(10.0);
}

fn show_ui_settings(ui: &mut egui::Ui, settings: &mut AppSettings) {
    ui.heading("Interface");
    ui.horizontal(|ui| {
        ui.label("Font size:");
        ui.add(
            egui::DragValue::new(&mut settings.ui.font_size)
                .speed(0.5)
                .range(8.0..=24.0)
                .suffix(" pt"),
        );
    });
    ui.horizontal(|ui| {
        ui.label("Widget scale:");
        ui.add(
            egui::DragValue::new(&mut settings.ui.scale)
                .speed(0.05)
                .range(0.5..=4.0),
        );
    });
    ui.add_space(10.0);
}

fn show_settings_buttons(ui: &mut egui::Ui, app: &mut MeshViewApp) {
    ui.separator();
    ui.horizontal(|ui| {
        if ui.button("Apply").clicked() {
            app.settings.units = app.viewer.units().clone();
            app.settings.save();
        }
        if ui.button("Reset to defaults").clicked() {
            app.settings = AppSettings::default();
            app.viewer.units_mut().reset_to_defaults();
        }
        if ui.button("Close").clicked() {
            app.show_settings_window = false;
        }
    });
}
