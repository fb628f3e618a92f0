use egui::Ui;

use meshview_gui_lib::render::RenderContext;
use meshview_gui_lib::viewer::Viewer;

pub fn show(ui: &mut Ui, viewer: &Viewer, picking_point: bool, message: Option<&str>) {
    ui.horizontal(|ui| {
        let scene = viewer.scene();
        ui.weak(format!("Objects: {}", scene.len()));
        ui.separator();

        let selected = scene.selected().len();
        if selected > 0 {
            ui.label(format!("Selected: {selected}"));
        } else {
            ui.weak("Ready");
        }

        if let Some(message) = message {
            ui.separator();
            ui.colored_label(egui::Color32::from_rgb(255, 200, 100), message);
        }

        if picking_point {
            ui.separator();
            ui.colored_label(egui::Color32::YELLOW, "Point pick: click a surface, Esc to cancel a drag");
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let gpu = if viewer.gpu().is_available() { "GPU" } else { "CPU" };
            ui.weak(gpu);
            ui.separator();
            if let Some(context) = viewer.view().context() {
                ui.weak(format!("Displayed: {}", context.presentations().len()));
            }
            ui.separator();
            let world = viewer.view().mouse_position_in_view();
            let units = viewer.units();
            ui.monospace(format!(
                "{}  {}  {}",
                units.format_length(world.x as f64),
                units.format_length(world.y as f64),
                units.format_length(world.z as f64),
            ));
        });
    });
}
