//! Keyboard shortcut handling

use eframe::egui;

use super::MeshViewApp;

pub fn handle_keyboard(ctx: &egui::Context, app: &mut MeshViewApp) {
    // Don't handle shortcuts when a text field is focused
    if ctx.memory(|m| m.focused().is_some()) {
        return;
    }

    let (open, select_all, delete, fit, escape, pick) = ctx.input(|i| {
        (
            i.modifiers.command && i.key_pressed(egui::Key::O),
            i.modifiers.command && i.key_pressed(egui::Key::A),
            i.key_pressed(egui::Key::Delete),
            i.key_pressed(egui::Key::F) && !i.modifiers.command,
            i.key_pressed(egui::Key::Escape),
            i.key_pressed(egui::Key::P) && !i.modifiers.command,
        )
    });

    if open {
        super::menus::open_dialog(app);
    }
    if select_all {
        let scene = app.viewer.scene_mut();
        for id in scene.live_objects() {
            if scene.get(id).is_some_and(|o| !o.is_ancillary()) {
                scene.select(id, true);
            }
        }
    }
    if delete {
        let scene = app.viewer.scene_mut();
        for id in scene.selected() {
            scene.remove(id);
        }
    }
    if fit {
        let selected_only = !app.viewer.scene().selected().is_empty();
        app.viewer.view_mut().fit_all(selected_only, 0.1);
    }
    // A drag in progress takes Escape through the viewer's listeners
    if escape && !app.point_widget.borrow().is_on_move() {
        if app.picking_point {
            app.picking_point = false;
            app.clear_point();
        } else {
            app.viewer.scene_mut().deselect_all();
        }
    }
    if pick {
        app.picking_point = !app.picking_point;
    }
}
