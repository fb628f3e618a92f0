//! Per-object renderer: one renderable per scene object, created lazily and
//! kept in sync with the object's dirty flags and visual properties.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use glam::Affine3A;
use shared::Color;

use super::context::{DrawerBool, DrawerColor, DrawerFloat, RenderContext, Renderable, RenderableHandle};
use super::data_source::MeshDataSource;
use super::view_controller::ViewController;
use crate::scene::{DirtyFlags, ObjectId, ObjectKind, SceneObject, ViewportId, VisualProperty};
use crate::signal::Connection;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderParams {
    pub viewport: ViewportId,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            viewport: ViewportId::MAIN,
        }
    }
}

/// Build the data source matching an object's geometry, if it has any.
pub fn data_source_for(object: &mut SceneObject) -> Option<MeshDataSource> {
    let mesh = object.triangle_mesh();
    match object.kind() {
        ObjectKind::TopoShape(holder) => {
            let source = MeshDataSource::from_shape(mesh, holder.shape());
            (source.node_count() > 0).then_some(source)
        }
        ObjectKind::Points(cloud) => Some(MeshDataSource::from_points(cloud)),
        ObjectKind::Lines(line) => Some(MeshDataSource::from_polyline(line)),
        _ => mesh.map(MeshDataSource::from_mesh),
    }
}

pub struct RenderInteractiveMeshObject {
    object: ObjectId,
    handle: Option<RenderableHandle>,
    registered: bool,
    location_dirty: Rc<Cell<bool>>,
    _xf_changed: Connection,
}

impl RenderInteractiveMeshObject {
    pub fn new(object: &SceneObject) -> Self {
        let location_dirty = Rc::new(Cell::new(false));
        let flag = location_dirty.clone();
        let xf_changed = object.world_xf_changed().connect(move |_| flag.set(true));
        Self {
            object: object.id(),
            handle: None,
            registered: false,
            location_dirty,
            _xf_changed: xf_changed,
        }
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn handle(&self) -> Option<RenderableHandle> {
        self.handle
    }

    /// Returns false when the controller is not ready yet; dirty flags are
    /// consumed either way.
    pub fn render(
        &mut self,
        object: &mut SceneObject,
        world_xf: Affine3A,
        view: &mut ViewController,
        params: &RenderParams,
    ) -> bool {
        if !view.is_initialized() {
            object.reset_dirty();
            return false;
        }
        if self.handle.is_none() {
            self.adopt_bound(object, view);
        }
        let Some(context) = view.context_mut() else {
            object.reset_dirty();
            return false;
        };
        let mut dirty = object.dirty_flags();

        let handle = match self.handle.filter(|h| context.contains(*h)) {
            Some(handle) => handle,
            None => {
                let Some(source) = data_source_for(object) else {
                    object.reset_dirty();
                    return false;
                };
                let renderable = Renderable::new(object.name(), Arc::new(source)).with_location(world_xf);
                let handle = context.create(renderable);
                self.handle = Some(handle);
                self.registered = false;
                self.location_dirty.set(false);
                dirty.remove(DirtyFlags::GEOMETRY);
                handle
            }
        };

        let needs_redisplay = self.sync_properties(object, dirty, world_xf, context, handle, params.viewport);

        if !self.registered {
            let disable_selection = object.is_ancillary();
            self.registered = view.add_object(handle, object.id(), disable_selection)
                || view.context().is_some_and(|c| c.is_displayed(handle));
        } else if needs_redisplay {
            if let Some(context) = view.context_mut() {
                context.redisplay(handle);
            }
        }
        true
    }

    /// Take over the renderable already bound to the object, e.g. after the
    /// scene was swapped out and back in. Everything is resynced.
    fn adopt_bound(&mut self, object: &mut SceneObject, view: &ViewController) {
        let Ok(bound) = view.interactive_object(object.id()) else {
            return;
        };
        if !view.context().is_some_and(|c| c.contains(bound)) {
            return;
        }
        tracing::debug!("Adopting renderable {:?} of '{}'", bound, object.name());
        self.handle = Some(bound);
        self.registered = true;
        self.location_dirty.set(true);
        object.mark_dirty(DirtyFlags::GEOMETRY | DirtyFlags::PROPERTIES);
    }

    fn sync_properties(
        &self,
        object: &mut SceneObject,
        dirty: DirtyFlags,
        world_xf: Affine3A,
        context: &mut dyn RenderContext,
        handle: RenderableHandle,
        viewport: ViewportId,
    ) -> bool {
        object.reset_dirty();
        let mut needs_redisplay = false;

        if dirty.contains(DirtyFlags::GEOMETRY) {
            if let Some(source) = data_source_for(object) {
                tracing::debug!("Geometry of '{}' changed, replacing data source", object.name());
                context.set_data_source(handle, Arc::new(source));
                needs_redisplay = true;
            }
        }

        if self.location_dirty.replace(false) || dirty.contains(DirtyFlags::TRANSFORM) {
            if context.location(handle) != Some(world_xf) {
                context.set_location(handle, world_xf);
                context.invalidate();
            }
        }

        if object.redraw_requested() || dirty.contains(DirtyFlags::PROPERTIES) {
            needs_redisplay = true;
            let visual = object.visual();
            let bools = [
                (DrawerBool::ShowEdges, visual.property(VisualProperty::Edges, viewport)),
                (DrawerBool::DisplayNodes, visual.property(VisualProperty::Points, viewport)),
                (DrawerBool::SmoothShading, !visual.property(VisualProperty::FlatShading, viewport)),
            ];
            for (attr, value) in bools {
                if context.drawer_bool(handle, attr) != Some(value) {
                    context.set_drawer_bool(handle, attr, value);
                }
            }

            let colors: [(DrawerColor, Color); 4] = [
                (DrawerColor::Interior, visual.front_color(false, viewport)),
                (DrawerColor::BackInterior, visual.back_color(viewport)),
                (DrawerColor::Edge, visual.edges_color(viewport)),
                (DrawerColor::Node, visual.points_color(viewport)),
            ];
            for (attr, value) in colors {
                if context.drawer_color(handle, attr) != Some(value) {
                    context.set_drawer_color(handle, attr, value);
                }
            }

            if let Some(holder) = object.topo_shape() {
                let sizes = [
                    (DrawerFloat::LineWidth, holder.line_width()),
                    (DrawerFloat::PointSize, holder.point_size()),
                ];
                for (attr, value) in sizes {
                    if context.drawer_float(handle, attr) != Some(value) {
                        context.set_drawer_float(handle, attr, value);
                    }
                }
            }
            object.reset_redraw_flag();
        }

        needs_redisplay
    }

    pub fn heap_bytes(&self) -> usize {
        0
    }

    pub fn gl_bytes(&self) -> usize {
        0
    }
}

impl std::fmt::Debug for RenderInteractiveMeshObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderInteractiveMeshObject")
            .field("object", &self.object)
            .field("handle", &self.handle)
            .field("registered", &self.registered)
            .finish()
    }
}
