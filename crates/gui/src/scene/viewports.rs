//! Per-viewport keys, masks and properties.

/// One of up to 32 concurrently rendered views of the scene
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewportId(u8);

impl ViewportId {
    pub const MAIN: ViewportId = ViewportId(0);
    pub const MAX: u8 = 32;

    pub fn new(index: u8) -> Option<Self> {
        (index < Self::MAX).then_some(Self(index))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn mask(self) -> ViewportMask {
        ViewportMask(1 << self.0)
    }
}

impl Default for ViewportId {
    fn default() -> Self {
        Self::MAIN
    }
}

/// Set of viewports, one bit per [`ViewportId`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ViewportMask(u32);

impl ViewportMask {
    pub const NONE: ViewportMask = ViewportMask(0);
    pub const ALL: ViewportMask = ViewportMask(u32::MAX);

    pub fn contains(self, id: ViewportId) -> bool {
        self.0 & id.mask().0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Set or clear every viewport in `viewports`
    pub fn set(&mut self, viewports: ViewportMask, on: bool) {
        if on {
            self.0 |= viewports.0;
        } else {
            self.0 &= !viewports.0;
        }
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl From<ViewportId> for ViewportMask {
    fn from(id: ViewportId) -> Self {
        id.mask()
    }
}

/// Value with per-viewport overrides on top of a default
#[derive(Clone, Debug, PartialEq)]
pub struct ViewportProperty<T> {
    default: T,
    overrides: Vec<(ViewportId, T)>,
}

impl<T: Clone + PartialEq> ViewportProperty<T> {
    pub fn new(default: T) -> Self {
        Self {
            default,
            overrides: Vec::new(),
        }
    }

    pub fn get(&self, id: ViewportId) -> &T {
        self.overrides
            .iter()
            .find(|(vp, _)| *vp == id)
            .map(|(_, v)| v)
            .unwrap_or(&self.default)
    }

    /// With `None` the default changes and all overrides are dropped.
    /// Returns whether the visible value changed.
    pub fn set(&mut self, value: T, id: Option<ViewportId>) -> bool {
        match id {
            None => {
                let changed = self.default != value || !self.overrides.is_empty();
                self.default = value;
                self.overrides.clear();
                changed
            }
            Some(id) => {
                if *self.get(id) == value {
                    return false;
                }
                match self.overrides.iter_mut().find(|(vp, _)| *vp == id) {
                    Some((_, v)) => *v = value,
                    None => self.overrides.push((id, value)),
                }
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_id_bounds() {
        assert!(ViewportId::new(31).is_some());
        assert!(ViewportId::new(32).is_none());
    }

    #[test]
    fn test_mask_set_and_contains() {
        let second = ViewportId::new(1).unwrap();
        let mut mask = ViewportMask::ALL;
        mask.set(second.into(), false);
        assert!(mask.contains(ViewportId::MAIN));
        assert!(!mask.contains(second));
        mask.set(ViewportMask::ALL, false);
        assert!(mask.is_empty());
    }

    #[test]
    fn test_property_override_and_reset() {
        let second = ViewportId::new(1).unwrap();
        let mut p = ViewportProperty::new(1);
        assert!(p.set(2, Some(second)));
        assert!(!p.set(2, Some(second)));
        assert_eq!(*p.get(second), 2);
        assert_eq!(*p.get(ViewportId::MAIN), 1);

        assert!(p.set(1, None));
        assert_eq!(*p.get(second), 1);
        assert!(!p.set(1, None));
    }
}
