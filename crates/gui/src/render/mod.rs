//! Scene-to-renderer glue: the rendering context contract, its in-process
//! implementation, the view controller and per-object renderers.

pub mod context;
pub mod data_source;
pub mod interactive;
pub mod mesh_object;
pub mod object_map;
pub mod view_controller;

pub use context::{
    ContextStats, DisplayMode, DrawerAttributes, DrawerBool, DrawerColor, DrawerFloat, PickElement, PickHit,
    Presentation, RenderContext, Renderable, RenderableHandle,
};
pub use data_source::{GeomType, MeshDataSource};
pub use interactive::InteractiveContext;
pub use mesh_object::{RenderInteractiveMeshObject, RenderParams};
pub use object_map::ObjectRenderableMap;
pub use view_controller::{DragPhase, ViewController, ViewportRect};
