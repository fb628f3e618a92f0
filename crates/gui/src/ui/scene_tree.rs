//! Scene tree panel: objects and their children

use egui::Ui;

use meshview_gui_lib::scene::{ObjectId, SceneTree, ViewportId, ViewportMask};

/// What the user asked for in the tree this frame
enum TreeAction {
    Select(ObjectId, bool),
    SetVisible(ObjectId, bool, ViewportMask),
    Remove(ObjectId),
}

pub fn show(ui: &mut Ui, scene: &mut SceneTree, viewport: ViewportId) {
    ui.horizontal(|ui| {
        ui.heading("Scene");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.weak(format!("({})", scene.len()));
        });
    });
    ui.separator();

    if scene.is_empty() {
        ui.add_space(20.0);
        ui.vertical_centered(|ui| {
            ui.weak("No objects");
            ui.weak("File → Open to load a scene");
        });
        return;
    }

    let mut actions = Vec::new();
    egui::ScrollArea::vertical()
        .id_salt("scene_tree_scroll")
        .show(ui, |ui| {
            for &root in scene.roots() {
                show_node(ui, scene, root, viewport, &mut actions);
            }
        });

    for action in actions {
        match action {
            TreeAction::Select(id, toggle) => {
                if toggle {
                    let on = scene.get(id).is_some_and(|o| !o.is_selected());
                    scene.select(id, on);
                } else {
                    scene.deselect_all();
                    scene.select(id, true);
                }
            }
            TreeAction::SetVisible(id, on, mask) => {
                scene.set_visible(id, on, mask);
            }
            TreeAction::Remove(id) => {
                let removed = scene.remove(id);
                tracing::info!("Removed {} object(s)", removed.len());
            }
        }
    }
}

fn show_node(ui: &mut Ui, scene: &SceneTree, id: ObjectId, viewport: ViewportId, actions: &mut Vec<TreeAction>) {
    let Some(object) = scene.get(id) else {
        return;
    };
    // Widget markers and other helpers stay out of the tree
    if object.is_ancillary() {
        return;
    }

    let visible = object.is_visible(viewport);
    let selected = object.is_selected();
    let label_color = if !visible {
        egui::Color32::from_rgb(100, 100, 100)
    } else if selected {
        egui::Color32::from_rgb(100, 200, 255)
    } else {
        egui::Color32::from_rgb(200, 200, 200)
    };

    let sel_frame = if selected {
        egui::Frame::NONE
            .fill(egui::Color32::from_rgba_premultiplied(40, 80, 140, 180))
            .corner_radius(3.0)
            .inner_margin(egui::Margin::symmetric(2, 1))
    } else {
        egui::Frame::NONE
    };

    let label = egui::RichText::new(format!("[{}] {}", object.kind().type_name(), object.name())).color(label_color);
    let children: Vec<ObjectId> = object.children().to_vec();

    let response = sel_frame
        .show(ui, |ui| {
            if children.is_empty() {
                ui.add(egui::Label::new(label).sense(egui::Sense::click()))
            } else {
                egui::CollapsingHeader::new(label)
                    .id_salt(id)
                    .default_open(true)
                    .show(ui, |ui| {
                        for child in &children {
                            show_node(ui, scene, *child, viewport, actions);
                        }
                    })
                    .header_response
            }
        })
        .inner;

    if response.clicked() {
        let toggle = ui.input(|i| i.modifiers.command || i.modifiers.shift);
        actions.push(TreeAction::Select(id, toggle));
    }

    response.context_menu(|ui| {
        let (text, on) = if visible { ("Hide", false) } else { ("Show", true) };
        if ui.button(text).clicked() {
            actions.push(TreeAction::SetVisible(id, on, viewport.mask()));
            ui.close_menu();
        }
        if ui.button("Show everywhere").clicked() {
            actions.push(TreeAction::SetVisible(id, true, ViewportMask::ALL));
            ui.close_menu();
        }
        ui.separator();
        if ui
            .button(egui::RichText::new("Delete").color(egui::Color32::from_rgb(220, 80, 80)))
            .clicked()
        {
            actions.push(TreeAction::Remove(id));
            ui.close_menu();
        }
    });
}
