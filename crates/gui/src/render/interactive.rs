//! In-process rendering context: display list, selection set, camera and
//! CPU ray picking.

use std::sync::Arc;

use glam::{Affine3A, Vec2, Vec3};
use shared::Color;
use slotmap::SlotMap;

use super::context::{
    ContextStats, DrawerBool, DrawerColor, DrawerFloat, PickElement, PickHit, Presentation, RenderContext,
    Renderable, RenderableHandle,
};
use super::data_source::MeshDataSource;
use crate::viewport::camera::ArcBallCamera;
use crate::viewport::mesh::VertId;
use crate::viewport::picking::{pick_triangle, Aabb, Ray};

/// Screen distance in pixels within which nodes and links are hit
pub const DEFAULT_PICK_TOLERANCE: f32 = 6.0;

struct Entry {
    renderable: Renderable,
    displayed: bool,
    selectable: bool,
    revision: u64,
}

pub struct InteractiveContext {
    entries: SlotMap<RenderableHandle, Entry>,
    /// Selection in the order it was made
    selected: Vec<RenderableHandle>,
    camera: ArcBallCamera,
    size: Vec2,
    invalidated: bool,
    stats: ContextStats,
    pick_tolerance: f32,
}

impl InteractiveContext {
    pub fn new(size: Vec2) -> Self {
        Self {
            entries: SlotMap::with_key(),
            selected: Vec::new(),
            camera: ArcBallCamera::new(),
            size,
            invalidated: true,
            stats: ContextStats::default(),
            pick_tolerance: DEFAULT_PICK_TOLERANCE,
        }
    }

    pub fn with_camera(mut self, camera: ArcBallCamera) -> Self {
        self.camera = camera;
        self
    }

    pub fn set_pick_tolerance(&mut self, pixels: f32) {
        self.pick_tolerance = pixels.max(0.0);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn displayed_count(&self) -> usize {
        self.entries.values().filter(|e| e.displayed).count()
    }

    fn world_bounds(&self, handles: impl Iterator<Item = RenderableHandle>) -> Aabb {
        handles
            .filter_map(|h| self.entries.get(h))
            .filter(|e| e.displayed)
            .fold(Aabb::empty(), |acc, e| {
                let local = e.renderable.data_source.bounding_box();
                acc.union(&local.transformed(&e.renderable.location))
            })
    }

    fn pick_entry(&self, handle: RenderableHandle, entry: &Entry, ray: &Ray, screen: Vec2) -> Option<PickHit> {
        let location = entry.renderable.location;
        let source = &entry.renderable.data_source;
        let local_ray = ray.transformed(&location.inverse());

        if source.element_count() > 0 {
            let hit = pick_triangle(&local_ray, source.mesh())?;
            let local_point = local_ray.at(hit.distance);
            return Some(PickHit {
                handle,
                distance: hit.distance,
                world_point: ray.at(hit.distance),
                local_point,
                element: PickElement::Face {
                    face: hit.face,
                    bary: hit.bary,
                },
            });
        }

        if source.link_count() > 0 {
            return self.pick_link(handle, source, &location, ray, screen);
        }
        self.pick_node(handle, source, &location, ray, screen)
    }

    fn pick_node(
        &self,
        handle: RenderableHandle,
        source: &MeshDataSource,
        location: &Affine3A,
        ray: &Ray,
        screen: Vec2,
    ) -> Option<PickHit> {
        let mut best: Option<(f32, PickHit)> = None;
        for (i, &local) in source.mesh().points.iter().enumerate() {
            let world = location.transform_point3(local);
            let Some(projected) = self.camera.project(world, self.size) else {
                continue;
            };
            let screen_dist = projected.distance(screen);
            if screen_dist > self.pick_tolerance {
                continue;
            }
            let distance = (world - ray.origin).dot(ray.direction);
            let better = best
                .as_ref()
                .is_none_or(|(d, hit)| screen_dist < *d || (screen_dist == *d && distance < hit.distance));
            if better {
                best = Some((
                    screen_dist,
                    PickHit {
                        handle,
                        distance,
                        world_point: world,
                        local_point: local,
                        element: PickElement::Node(VertId(i as u32)),
                    },
                ));
            }
        }
        best.map(|(_, hit)| hit)
    }

    fn pick_link(
        &self,
        handle: RenderableHandle,
        source: &MeshDataSource,
        location: &Affine3A,
        ray: &Ray,
        screen: Vec2,
    ) -> Option<PickHit> {
        let points = &source.mesh().points;
        let mut best: Option<(f32, PickHit)> = None;
        for (segment, &[a, b]) in source.links().iter().enumerate() {
            let (Some(&la), Some(&lb)) = (points.get(a as usize), points.get(b as usize)) else {
                continue;
            };
            let wa = location.transform_point3(la);
            let wb = location.transform_point3(lb);
            let (Some(sa), Some(sb)) = (
                self.camera.project(wa, self.size),
                self.camera.project(wb, self.size),
            ) else {
                continue;
            };
            let t = closest_on_screen_segment(screen, sa, sb);
            let screen_dist = sa.lerp(sb, t).distance(screen);
            if screen_dist > self.pick_tolerance {
                continue;
            }
            if best.as_ref().is_none_or(|(d, _)| screen_dist < *d) {
                let world = wa.lerp(wb, t);
                best = Some((
                    screen_dist,
                    PickHit {
                        handle,
                        distance: (world - ray.origin).dot(ray.direction),
                        world_point: world,
                        local_point: la.lerp(lb, t),
                        element: PickElement::Link {
                            segment: segment as u32,
                            t,
                        },
                    },
                ));
            }
        }
        best.map(|(_, hit)| hit)
    }
}

fn closest_on_screen_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f32::EPSILON {
        return 0.0;
    }
    ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
}

impl RenderContext for InteractiveContext {
    fn create(&mut self, renderable: Renderable) -> RenderableHandle {
        let handle = self.entries.insert(Entry {
            renderable,
            displayed: false,
            selectable: false,
            revision: 0,
        });
        tracing::debug!("Created renderable {:?}", handle);
        handle
    }

    fn contains(&self, handle: RenderableHandle) -> bool {
        self.entries.contains_key(handle)
    }

    fn renderable(&self, handle: RenderableHandle) -> Option<&Renderable> {
        self.entries.get(handle).map(|e| &e.renderable)
    }

    fn display(&mut self, handle: RenderableHandle, activate_selection: bool) -> bool {
        let Some(entry) = self.entries.get_mut(handle) else {
            return false;
        };
        entry.displayed = true;
        entry.selectable = activate_selection;
        self.stats.displays += 1;
        true
    }

    fn erase(&mut self, handle: RenderableHandle) -> bool {
        let Some(entry) = self.entries.get_mut(handle) else {
            return false;
        };
        entry.displayed = false;
        self.selected.retain(|h| *h != handle);
        self.stats.erases += 1;
        true
    }

    fn remove(&mut self, handle: RenderableHandle) -> bool {
        if self.entries.remove(handle).is_none() {
            return false;
        }
        self.selected.retain(|h| *h != handle);
        self.stats.removes += 1;
        true
    }

    fn redisplay(&mut self, handle: RenderableHandle) {
        if self.entries.contains_key(handle) {
            self.stats.redisplays += 1;
            self.invalidated = true;
        }
    }

    fn is_displayed(&self, handle: RenderableHandle) -> bool {
        self.entries.get(handle).is_some_and(|e| e.displayed)
    }

    fn is_selected(&self, handle: RenderableHandle) -> bool {
        self.selected.contains(&handle)
    }

    fn add_or_remove_selected(&mut self, handle: RenderableHandle) {
        if !self.entries.contains_key(handle) {
            return;
        }
        if let Some(pos) = self.selected.iter().position(|h| *h == handle) {
            self.selected.remove(pos);
        } else {
            self.selected.push(handle);
        }
        self.stats.selection_changes += 1;
    }

    fn selected(&self) -> Vec<RenderableHandle> {
        self.selected.clone()
    }

    fn clear_selected(&mut self) {
        if !self.selected.is_empty() {
            self.selected.clear();
            self.stats.selection_changes += 1;
        }
    }

    fn drawer_bool(&self, handle: RenderableHandle, attr: DrawerBool) -> Option<bool> {
        self.entries.get(handle).map(|e| e.renderable.attributes.bool(attr))
    }

    fn set_drawer_bool(&mut self, handle: RenderableHandle, attr: DrawerBool, value: bool) {
        if let Some(entry) = self.entries.get_mut(handle) {
            entry.renderable.attributes.set_bool(attr, value);
            self.stats.attribute_writes += 1;
        }
    }

    fn drawer_color(&self, handle: RenderableHandle, attr: DrawerColor) -> Option<Color> {
        self.entries.get(handle).map(|e| e.renderable.attributes.color(attr))
    }

    fn set_drawer_color(&mut self, handle: RenderableHandle, attr: DrawerColor, value: Color) {
        if let Some(entry) = self.entries.get_mut(handle) {
            entry.renderable.attributes.set_color(attr, value);
            self.stats.attribute_writes += 1;
        }
    }

    fn drawer_float(&self, handle: RenderableHandle, attr: DrawerFloat) -> Option<f32> {
        self.entries.get(handle).map(|e| e.renderable.attributes.float(attr))
    }

    fn set_drawer_float(&mut self, handle: RenderableHandle, attr: DrawerFloat, value: f32) {
        if let Some(entry) = self.entries.get_mut(handle) {
            entry.renderable.attributes.set_float(attr, value);
            self.stats.attribute_writes += 1;
        }
    }

    fn location(&self, handle: RenderableHandle) -> Option<Affine3A> {
        self.entries.get(handle).map(|e| e.renderable.location)
    }

    fn set_location(&mut self, handle: RenderableHandle, location: Affine3A) {
        if let Some(entry) = self.entries.get_mut(handle) {
            entry.renderable.location = location;
        }
    }

    fn set_data_source(&mut self, handle: RenderableHandle, data_source: Arc<MeshDataSource>) {
        if let Some(entry) = self.entries.get_mut(handle) {
            entry.renderable.data_source = data_source;
            entry.revision += 1;
        }
    }

    fn pick_all(&self, screen: Vec2) -> Vec<PickHit> {
        let ray = self.camera.screen_ray(screen, self.size);
        let mut hits: Vec<PickHit> = self
            .entries
            .iter()
            .filter(|(_, e)| e.displayed)
            .filter_map(|(h, e)| self.pick_entry(h, e, &ray, screen))
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn select_at(&mut self, screen: Vec2, toggle: bool) -> bool {
        let hit = self
            .pick_all(screen)
            .into_iter()
            .find(|hit| self.entries.get(hit.handle).is_some_and(|e| e.selectable));

        let Some(hit) = hit else {
            if toggle || self.selected.is_empty() {
                return false;
            }
            self.clear_selected();
            self.invalidated = true;
            return true;
        };

        if toggle {
            self.add_or_remove_selected(hit.handle);
        } else if self.selected == [hit.handle] {
            return false;
        } else {
            self.selected.clear();
            self.selected.push(hit.handle);
            self.stats.selection_changes += 1;
        }
        self.invalidated = true;
        true
    }

    fn camera(&self) -> &ArcBallCamera {
        &self.camera
    }

    fn camera_mut(&mut self) -> &mut ArcBallCamera {
        &mut self.camera
    }

    fn view_size(&self) -> Vec2 {
        self.size
    }

    fn resize(&mut self, size: Vec2) {
        self.size = size;
    }

    fn fit_all(&mut self, margin: f32, selected_only: bool) {
        let mut bounds = Aabb::empty();
        if selected_only {
            bounds = self.world_bounds(self.selected.iter().copied());
        }
        if bounds.is_empty() {
            bounds = self.world_bounds(self.entries.keys());
        }
        if bounds.is_empty() {
            return;
        }
        self.camera.fit(&bounds, margin.clamp(0.0, 1.0), self.size);
    }

    fn invalidate(&mut self) {
        self.invalidated = true;
    }

    fn invalidate_immediate(&mut self) {
        self.invalidated = true;
    }

    fn take_invalidated(&mut self) -> bool {
        std::mem::take(&mut self.invalidated)
    }

    fn stats(&self) -> ContextStats {
        self.stats
    }

    fn presentations(&self) -> Vec<Presentation> {
        self.entries
            .iter()
            .filter(|(_, e)| e.displayed)
            .map(|(handle, e)| Presentation {
                handle,
                data_source: e.renderable.data_source.clone(),
                location: e.renderable.location,
                display_mode: e.renderable.display_mode,
                attributes: e.renderable.attributes,
                selected: self.selected.contains(&handle),
                revision: e.revision,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::mesh::{self, TriMesh};

    fn context() -> InteractiveContext {
        InteractiveContext::new(Vec2::new(800.0, 600.0)).with_camera(ArcBallCamera::front())
    }

    fn cube_renderable(at: Vec3) -> Renderable {
        let source = MeshDataSource::from_mesh(Arc::new(mesh::cube(1.0, 1.0, 1.0)));
        Renderable::new("cube", Arc::new(source)).with_location(Affine3A::from_translation(at))
    }

    fn center(ctx: &InteractiveContext) -> Vec2 {
        ctx.view_size() * 0.5
    }

    #[test]
    fn test_pick_front_face_first() {
        let mut ctx = context();
        let near = ctx.create(cube_renderable(Vec3::new(0.0, 0.0, 1.0)));
        let far = ctx.create(cube_renderable(Vec3::new(0.0, 0.0, -2.0)));
        ctx.display(near, true);
        ctx.display(far, true);

        let hits = ctx.pick_all(center(&ctx));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].handle, near);
        assert!((hits[0].world_point.z - 1.5).abs() < 1e-4);
        assert!((hits[0].local_point.z - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_hidden_renderable_is_not_picked() {
        let mut ctx = context();
        let h = ctx.create(cube_renderable(Vec3::ZERO));
        assert!(ctx.pick_all(center(&ctx)).is_empty());
        ctx.display(h, true);
        ctx.erase(h);
        assert!(ctx.pick_all(center(&ctx)).is_empty());
    }

    #[test]
    fn test_select_at_replaces_and_toggles() {
        let mut ctx = context();
        let h = ctx.create(cube_renderable(Vec3::ZERO));
        ctx.display(h, true);

        assert!(ctx.select_at(center(&ctx), false));
        assert!(ctx.is_selected(h));
        assert!(!ctx.select_at(center(&ctx), false));
        assert!(ctx.select_at(center(&ctx), true));
        assert!(!ctx.is_selected(h));

        ctx.add_or_remove_selected(h);
        assert!(ctx.select_at(Vec2::new(5.0, 5.0), false));
        assert!(ctx.selected().is_empty());
    }

    #[test]
    fn test_unselectable_renderable_is_skipped_by_clicks() {
        let mut ctx = context();
        let h = ctx.create(cube_renderable(Vec3::ZERO));
        ctx.display(h, false);
        assert_eq!(ctx.pick_all(center(&ctx)).len(), 1);
        assert!(!ctx.select_at(center(&ctx), false));
    }

    #[test]
    fn test_erase_drops_selection() {
        let mut ctx = context();
        let h = ctx.create(cube_renderable(Vec3::ZERO));
        ctx.display(h, true);
        ctx.add_or_remove_selected(h);
        ctx.erase(h);
        assert!(!ctx.is_selected(h));
        assert!(!ctx.is_displayed(h));
    }

    #[test]
    fn test_node_pick_within_tolerance() {
        let mut ctx = context();
        let cloud = TriMesh::new(vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)], Vec::new());
        let h = ctx.create(Renderable::new(
            "cloud",
            Arc::new(MeshDataSource::from_mesh(Arc::new(cloud))),
        ));
        ctx.display(h, true);

        let hits = ctx.pick_all(center(&ctx) + Vec2::new(3.0, 0.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].element, PickElement::Node(VertId(0)));
        assert!(ctx.pick_all(center(&ctx) + Vec2::new(0.0, 40.0)).is_empty());
    }

    #[test]
    fn test_fit_all_centers_on_displayed() {
        let mut ctx = context();
        let h = ctx.create(cube_renderable(Vec3::new(10.0, 0.0, 0.0)));
        ctx.display(h, true);
        ctx.fit_all(0.01, false);
        assert!((ctx.camera().target - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_stats_count_mutations() {
        let mut ctx = context();
        let h = ctx.create(cube_renderable(Vec3::ZERO));
        ctx.display(h, true);
        ctx.set_drawer_bool(h, DrawerBool::ShowEdges, true);
        ctx.redisplay(h);
        ctx.remove(h);
        let stats = ctx.stats();
        assert_eq!(stats.displays, 1);
        assert_eq!(stats.attribute_writes, 1);
        assert_eq!(stats.redisplays, 1);
        assert_eq!(stats.removes, 1);
        assert_eq!(stats.mutations(), 4);
        assert!(!ctx.contains(h));
    }
}
