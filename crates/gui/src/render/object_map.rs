use std::collections::HashMap;

use super::context::RenderableHandle;
use crate::scene::ObjectId;

/// One-to-one binding between scene objects and renderables, kept as two
/// hash maps updated together.
#[derive(Debug, Default)]
pub struct ObjectRenderableMap {
    by_handle: HashMap<RenderableHandle, ObjectId>,
    by_object: HashMap<ObjectId, RenderableHandle>,
}

impl ObjectRenderableMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind both directions. Refuses when either side is already bound.
    pub fn bind(&mut self, handle: RenderableHandle, object: ObjectId) -> bool {
        if self.by_handle.contains_key(&handle) || self.by_object.contains_key(&object) {
            return false;
        }
        self.by_handle.insert(handle, object);
        self.by_object.insert(object, handle);
        true
    }

    pub fn unbind_handle(&mut self, handle: RenderableHandle) -> Option<ObjectId> {
        let object = self.by_handle.remove(&handle)?;
        self.by_object.remove(&object);
        Some(object)
    }

    pub fn unbind_object(&mut self, object: ObjectId) -> Option<RenderableHandle> {
        let handle = self.by_object.remove(&object)?;
        self.by_handle.remove(&handle);
        Some(handle)
    }

    pub fn renderable_for(&self, object: ObjectId) -> Option<RenderableHandle> {
        self.by_object.get(&object).copied()
    }

    pub fn object_for(&self, handle: RenderableHandle) -> Option<ObjectId> {
        self.by_handle.get(&handle).copied()
    }

    pub fn is_object_bound(&self, object: ObjectId) -> bool {
        self.by_object.contains_key(&object)
    }

    pub fn is_handle_bound(&self, handle: RenderableHandle) -> bool {
        self.by_handle.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RenderableHandle, ObjectId)> + '_ {
        self.by_handle.iter().map(|(h, o)| (*h, *o))
    }

    pub fn clear(&mut self) {
        self.by_handle.clear();
        self.by_object.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn handles(n: usize) -> Vec<RenderableHandle> {
        let mut keys: SlotMap<RenderableHandle, ()> = SlotMap::with_key();
        (0..n).map(|_| keys.insert(())).collect()
    }

    #[test]
    fn test_bind_is_one_to_one() {
        let h = handles(2);
        let a = ObjectId::new();
        let b = ObjectId::new();
        let mut map = ObjectRenderableMap::new();

        assert!(map.bind(h[0], a));
        assert!(!map.bind(h[1], a));
        assert!(!map.bind(h[0], b));
        assert!(map.bind(h[1], b));
        assert_eq!(map.len(), 2);
        assert_eq!(map.renderable_for(a), Some(h[0]));
        assert_eq!(map.object_for(h[1]), Some(b));
    }

    #[test]
    fn test_unbind_clears_both_directions() {
        let h = handles(1);
        let a = ObjectId::new();
        let mut map = ObjectRenderableMap::new();
        map.bind(h[0], a);

        assert_eq!(map.unbind_handle(h[0]), Some(a));
        assert!(!map.is_object_bound(a));
        assert!(!map.is_handle_bound(h[0]));
        assert!(map.is_empty());
        assert_eq!(map.unbind_object(a), None);
    }
}
