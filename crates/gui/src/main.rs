mod app;
mod ui;
mod viewport;

use std::path::PathBuf;

use app::MeshViewApp;
use meshview_gui_lib::scene::SceneTree;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meshview=info,meshview_gui_lib=info".into()),
        )
        .init();

    let initial_scene = parse_scene_arg();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("MeshView")
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        "meshview",
        native_options,
        Box::new(move |cc| Ok(Box::new(MeshViewApp::new(cc, initial_scene)))),
    ) {
        tracing::error!("Failed to start application: {e}");
    }
}

/// `--scene <path>` loads a scene description at startup
fn parse_scene_arg() -> Option<(PathBuf, SceneTree)> {
    let args: Vec<String> = std::env::args().collect();
    let pos = args.iter().position(|a| a == "--scene")?;
    let path = PathBuf::from(args.get(pos + 1)?);
    match SceneTree::load_file(&path) {
        Ok(scene) => {
            tracing::info!("Loaded scene from {} ({} objects)", path.display(), scene.len());
            Some((path, scene))
        }
        Err(e) => {
            tracing::error!("Failed to load scene {}: {e}", path.display());
            None
        }
    }
}
