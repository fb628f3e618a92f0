//! Properties panel for the primary selected object

use egui::Ui;
use shared::Color;

use meshview_gui_lib::scene::{ObjectId, SceneObject, SceneTree, ViewportId, VisualProperty};
use meshview_gui_lib::settings::UnitSettings;

pub fn show(ui: &mut Ui, scene: &mut SceneTree, units: &UnitSettings, viewport: ViewportId) {
    ui.heading("Properties");
    ui.separator();

    let Some(id) = scene.selected().first().copied() else {
        ui.add_space(10.0);
        ui.vertical_centered(|ui| {
            ui.weak("Select an object");
            ui.weak("to view its properties");
        });
        return;
    };

    let world_xf = scene.world_xf(id);
    let Some(object) = scene.get_mut(id) else {
        ui.weak("Object not found");
        return;
    };

    ui.horizontal(|ui| {
        ui.strong(format!("[{}]", object.kind().type_name()));
        ui.strong(object.name());
    });
    ui.add_space(4.0);

    show_info(ui, id, object, units, world_xf.map(|xf| glam::Vec3::from(xf.translation)));
    ui.add_space(8.0);
    show_display(ui, object, viewport);
}

fn show_info(ui: &mut Ui, id: ObjectId, object: &mut SceneObject, units: &UnitSettings, position: Option<glam::Vec3>) {
    egui::CollapsingHeader::new("Object")
        .id_salt("object_info")
        .default_open(true)
        .show(ui, |ui| {
            egui::Grid::new("object_props")
                .num_columns(2)
                .spacing([8.0, 4.0])
                .show(ui, |ui| {
                    ui.label("ID:");
                    ui.monospace(id.short());
                    ui.end_row();

                    if let Some(mesh) = object.triangle_mesh() {
                        ui.label("Triangles:");
                        ui.label(format!("{}", mesh.triangle_count()));
                        ui.end_row();
                        ui.label("Vertices:");
                        ui.label(format!("{}", mesh.point_count()));
                        ui.end_row();
                    }
                    if let Some(holder) = object.topo_shape() {
                        let shape = holder.shape();
                        ui.label("Faces / edges:");
                        ui.label(format!("{} / {}", shape.face_count(), shape.edge_count()));
                        ui.end_row();
                    }

                    let size = object.bounding_box().size();
                    ui.label("Size:");
                    ui.label(format!(
                        "{} × {} × {}",
                        units.format_length(size.x as f64),
                        units.format_length(size.y as f64),
                        units.format_length(size.z as f64),
                    ));
                    ui.end_row();

                    if let Some(p) = position {
                        ui.label("Position:");
                        ui.label(format!(
                            "{}, {}, {}",
                            units.format_length(p.x as f64),
                            units.format_length(p.y as f64),
                            units.format_length(p.z as f64),
                        ));
                        ui.end_row();
                    }
                });
        });
}

fn show_display(ui: &mut Ui, object: &mut SceneObject, viewport: ViewportId) {
    egui::CollapsingHeader::new("Display")
        .id_salt("object_display")
        .default_open(true)
        .show(ui, |ui| {
            let visual = object.visual_mut();

            ui.horizontal(|ui| {
                ui.label("Color:");
                let mut color = to_egui(visual.front_color(false, viewport));
                if ui.color_edit_button_srgba(&mut color).changed() {
                    visual.set_front_color(from_egui(color), false, Some(viewport));
                }
            });
            ui.horizontal(|ui| {
                ui.label("Back faces:");
                let mut color = to_egui(visual.back_color(viewport));
                if ui.color_edit_button_srgba(&mut color).changed() {
                    visual.set_back_color(from_egui(color), Some(viewport));
                }
            });

            for (prop, label) in [
                (VisualProperty::Edges, "Show edges"),
                (VisualProperty::Points, "Show points"),
                (VisualProperty::FlatShading, "Flat shading"),
            ] {
                let mut on = visual.property(prop, viewport);
                if ui.checkbox(&mut on, label).changed() {
                    visual.set_property(prop, on, viewport.mask());
                }
            }

            let Some((mut line_width, mut point_size)) =
                object.topo_shape().map(|h| (h.line_width(), h.point_size()))
            else {
                return;
            };
            ui.horizontal(|ui| {
                ui.label("Line width:");
                let response = ui.add(egui::DragValue::new(&mut line_width).speed(0.1).range(0.5..=10.0).suffix(" px"));
                if response.changed() {
                    object.set_shape_line_width(line_width);
                }
            });
            ui.horizontal(|ui| {
                ui.label("Point size:");
                let response = ui.add(egui::DragValue::new(&mut point_size).speed(0.2).range(1.0..=20.0).suffix(" px"));
                if response.changed() {
                    object.set_shape_point_size(point_size);
                }
            });
        });
}

fn to_egui(c: Color) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

fn from_egui(c: egui::Color32) -> Color {
    let [r, g, b, a] = c.to_srgba_unmultiplied();
    Color::rgba(r, g, b, a)
}
