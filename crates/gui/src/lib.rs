// Library crate: scene, render synchronization, widgets and the headless
// viewer, shared by the desktop binary and the integration tests.
// GUI-specific modules (app, ui, GL painting) remain in the binary crate.

pub mod error;
pub mod fixtures;
pub mod gpu;
pub mod harness;
pub mod input;
pub mod render;
pub mod scene;
pub mod settings;
pub mod signal;
pub mod viewer;
pub mod widgets;

/// Camera, mesh and picking math. The binary's `viewport` module re-exports
/// these next to its GL renderer.
pub mod viewport {
    pub mod camera;
    pub mod mesh;
    pub mod picking;
}

pub use error::{Error, Result};
