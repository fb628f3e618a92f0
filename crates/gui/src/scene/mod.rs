//! Scene tree: parent-owned objects, world transforms and notifications.

pub mod geometry;
mod loader;
mod object;
pub mod topo_shape;
pub mod viewports;
pub mod visual;

use std::collections::HashMap;

use glam::Affine3A;

pub use geometry::{EdgePoint, PointCloud, Polyline};
pub use object::{Capabilities, DirtyFlags, ObjectId, ObjectKind, SceneObject};
pub use topo_shape::{ObjectTopoShapeHolder, TopoFace, TopoShape};
pub use viewports::{ViewportId, ViewportMask, ViewportProperty};
pub use visual::{SceneColors, VisualProperty, VisualizationPropertySet};

use crate::error::{Error, Result};

#[derive(Default)]
pub struct SceneTree {
    objects: HashMap<ObjectId, SceneObject>,
    roots: Vec<ObjectId>,
    /// Bumped on every structural or transform change
    version: u64,
}

impl SceneTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    /// Insert `object` under `parent` (or at the top level).
    pub fn add(&mut self, parent: Option<ObjectId>, mut object: SceneObject) -> Result<ObjectId> {
        let id = object.id();
        match parent {
            Some(pid) => {
                let p = self.objects.get_mut(&pid).ok_or(Error::ObjectNotFound(pid))?;
                p.children.push(id);
            }
            None => self.roots.push(id),
        }
        object.parent = parent;
        self.objects.insert(id, object);
        self.version += 1;
        Ok(id)
    }

    /// Remove an object together with its subtree; returns the removed ids.
    pub fn remove(&mut self, id: ObjectId) -> Vec<ObjectId> {
        let Some(parent) = self.objects.get(&id).map(|o| o.parent) else {
            return Vec::new();
        };
        match parent {
            Some(pid) => {
                if let Some(p) = self.objects.get_mut(&pid) {
                    p.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }

        let removed = self.subtree(id);
        for rid in &removed {
            self.objects.remove(rid);
        }
        self.version += 1;
        removed
    }

    /// Drop every object
    pub fn clear(&mut self) {
        self.objects.clear();
        self.roots.clear();
        self.version += 1;
    }

    /// Ids of `id` and all its descendants, depth-first
    pub fn subtree(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(obj) = self.objects.get(&current) {
                out.push(current);
                stack.extend(obj.children.iter().rev().copied());
            }
        }
        out
    }

    /// Every object in the tree, depth-first, ancillary ones included
    pub fn live_objects(&self) -> Vec<ObjectId> {
        let mut out = Vec::with_capacity(self.objects.len());
        for root in &self.roots {
            out.extend(self.subtree(*root));
        }
        out
    }

    pub fn world_xf(&self, id: ObjectId) -> Option<Affine3A> {
        let obj = self.objects.get(&id)?;
        let mut xf = obj.xf();
        let mut parent = obj.parent();
        while let Some(pid) = parent {
            let p = self.objects.get(&pid)?;
            xf = p.xf() * xf;
            parent = p.parent();
        }
        Some(xf)
    }

    /// Set the local transform and notify the whole subtree
    pub fn set_xf(&mut self, id: ObjectId, xf: Affine3A) -> bool {
        match self.objects.get_mut(&id) {
            Some(obj) if obj.xf() == xf => return true,
            Some(obj) => obj.set_local_xf(xf),
            None => return false,
        }
        self.version += 1;
        for sid in self.subtree(id) {
            if let Some(obj) = self.objects.get_mut(&sid) {
                obj.mark_dirty(DirtyFlags::TRANSFORM);
                obj.world_xf_changed().emit(&());
            }
        }
        true
    }

    /// Visible in `viewport` together with all its ancestors
    pub fn is_visible(&self, id: ObjectId, viewport: ViewportId) -> bool {
        let mut current = Some(id);
        while let Some(cid) = current {
            match self.objects.get(&cid) {
                Some(obj) if obj.is_visible(viewport) => current = obj.parent(),
                _ => return false,
            }
        }
        true
    }

    pub fn set_visible(&mut self, id: ObjectId, on: bool, viewports: ViewportMask) -> bool {
        match self.objects.get_mut(&id) {
            Some(obj) => {
                obj.set_visible(on, viewports);
                true
            }
            None => false,
        }
    }

    pub fn select(&mut self, id: ObjectId, on: bool) -> bool {
        self.objects.get_mut(&id).is_some_and(|o| o.select(on))
    }

    /// Selected objects in tree order
    pub fn selected(&self) -> Vec<ObjectId> {
        self.live_objects()
            .into_iter()
            .filter(|id| self.objects.get(id).is_some_and(|o| o.is_selected()))
            .collect()
    }

    pub fn deselect_all(&mut self) {
        for obj in self.objects.values_mut() {
            obj.select(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use glam::Vec3;

    use super::*;

    fn group(name: &str) -> SceneObject {
        SceneObject::new(name, ObjectKind::Group)
    }

    #[test]
    fn test_add_under_missing_parent_fails() {
        let mut tree = SceneTree::new();
        let missing = ObjectId::new();
        assert!(matches!(
            tree.add(Some(missing), group("a")),
            Err(Error::ObjectNotFound(id)) if id == missing
        ));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_remove_takes_subtree() {
        let mut tree = SceneTree::new();
        let a = tree.add(None, group("a")).unwrap();
        let b = tree.add(Some(a), group("b")).unwrap();
        let c = tree.add(Some(b), group("c")).unwrap();
        let d = tree.add(None, group("d")).unwrap();

        let removed = tree.remove(b);
        assert_eq!(removed, vec![b, c]);
        assert_eq!(tree.live_objects(), vec![a, d]);
        assert!(tree.get(a).unwrap().children().is_empty());
        assert!(tree.remove(b).is_empty());
    }

    #[test]
    fn test_live_objects_depth_first() {
        let mut tree = SceneTree::new();
        let a = tree.add(None, group("a")).unwrap();
        let b = tree.add(Some(a), group("b")).unwrap();
        let c = tree.add(Some(a), group("c").with_ancillary(true)).unwrap();
        let d = tree.add(None, group("d")).unwrap();
        assert_eq!(tree.live_objects(), vec![a, b, c, d]);
    }

    #[test]
    fn test_world_xf_composes_parents() {
        let mut tree = SceneTree::new();
        let a = tree.add(None, group("a")).unwrap();
        let b = tree.add(Some(a), group("b")).unwrap();
        tree.set_xf(a, Affine3A::from_translation(Vec3::X));
        tree.set_xf(b, Affine3A::from_scale(Vec3::splat(2.0)));
        let p = tree.world_xf(b).unwrap().transform_point3(Vec3::ONE);
        assert_eq!(p, Vec3::new(3.0, 2.0, 2.0));
    }

    #[test]
    fn test_set_xf_notifies_descendants() {
        let mut tree = SceneTree::new();
        let a = tree.add(None, group("a")).unwrap();
        let b = tree.add(Some(a), group("b")).unwrap();
        tree.get_mut(b).unwrap().reset_dirty();

        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let _conn = tree.get(b).unwrap().world_xf_changed().connect(move |_| h.set(h.get() + 1));

        tree.set_xf(a, Affine3A::from_translation(Vec3::Y));
        assert_eq!(hits.get(), 1);
        assert!(tree.get(b).unwrap().dirty_flags().contains(DirtyFlags::TRANSFORM));

        // Same transform again: no notification
        tree.set_xf(a, Affine3A::from_translation(Vec3::Y));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_visibility_follows_ancestors() {
        let mut tree = SceneTree::new();
        let a = tree.add(None, group("a")).unwrap();
        let b = tree.add(Some(a), group("b")).unwrap();
        assert!(tree.is_visible(b, ViewportId::MAIN));
        tree.set_visible(a, false, ViewportMask::ALL);
        assert!(!tree.is_visible(b, ViewportId::MAIN));
        assert!(tree.get(b).unwrap().is_visible(ViewportId::MAIN));
    }

    #[test]
    fn test_selection_listing() {
        let mut tree = SceneTree::new();
        let a = tree.add(None, group("a")).unwrap();
        let b = tree.add(None, group("b")).unwrap();
        assert!(tree.select(b, true));
        assert_eq!(tree.selected(), vec![b]);
        tree.select(a, true);
        tree.deselect_all();
        assert!(tree.selected().is_empty());
    }
}
