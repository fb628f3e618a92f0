//! Mouse and keyboard routing.
//!
//! Listeners are held weakly and called in ascending group order; within a
//! group, front connections run before back ones. The first listener that
//! returns `true` consumes the event. Whatever nobody consumes falls back to
//! the view controller (see [`crate::viewer::Viewer`]).

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use bitflags::bitflags;

use crate::signal::Connection;
use crate::viewer::ViewerCx;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
        const SUPER = 1 << 3;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Delete,
    Enter,
    Char(char),
}

pub trait InputListener {
    fn on_mouse_down(&mut self, _cx: &mut ViewerCx<'_>, _button: MouseButton, _mods: Modifiers) -> bool {
        false
    }

    fn on_mouse_up(&mut self, _cx: &mut ViewerCx<'_>, _button: MouseButton, _mods: Modifiers) -> bool {
        false
    }

    /// `x`, `y` are framebuffer pixels; `cx.mouse_pos` is already in
    /// viewport coordinates.
    fn on_mouse_move(&mut self, _cx: &mut ViewerCx<'_>, _x: f32, _y: f32) -> bool {
        false
    }

    fn on_mouse_scroll(&mut self, _cx: &mut ViewerCx<'_>, _delta: f32) -> bool {
        false
    }

    fn on_key_down(&mut self, _cx: &mut ViewerCx<'_>, _key: Key, _mods: Modifiers) -> bool {
        false
    }

    fn on_focus_lost(&mut self, _cx: &mut ViewerCx<'_>) {}

    fn on_pre_draw(&mut self, _cx: &mut ViewerCx<'_>) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectPosition {
    Front,
    #[default]
    Back,
}

type ListenerRef = Weak<RefCell<dyn InputListener>>;

struct Entry {
    id: u64,
    group: i32,
    listener: ListenerRef,
}

#[derive(Default)]
pub struct InputRouter {
    entries: Rc<RefCell<Vec<Entry>>>,
    next_id: Cell<u64>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, group: i32, position: ConnectPosition, listener: ListenerRef) -> Connection {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        {
            let mut entries = self.entries.borrow_mut();
            let index = match position {
                ConnectPosition::Front => entries.iter().position(|e| e.group >= group),
                ConnectPosition::Back => entries.iter().position(|e| e.group > group),
            }
            .unwrap_or(entries.len());
            entries.insert(index, Entry { id, group, listener });
        }
        tracing::debug!("Input listener {} connected to group {}", id, group);

        let weak = Rc::downgrade(&self.entries);
        Connection::new(move || {
            if let Some(entries) = weak.upgrade() {
                entries.borrow_mut().retain(|e| e.id != id);
            }
        })
    }

    pub fn listener_count(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.listener.strong_count() > 0)
            .count()
    }

    fn snapshot(&self) -> Vec<Rc<RefCell<dyn InputListener>>> {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|e| e.listener.strong_count() > 0);
        entries.iter().filter_map(|e| e.listener.upgrade()).collect()
    }

    /// Call listeners in order until one consumes the event.
    pub fn dispatch(&self, mut f: impl FnMut(&mut dyn InputListener) -> bool) -> bool {
        for listener in self.snapshot() {
            // A listener that is already running does not see nested events.
            let Ok(mut listener) = listener.try_borrow_mut() else {
                continue;
            };
            if f(&mut *listener) {
                return true;
            }
        }
        false
    }

    /// Call every listener.
    pub fn broadcast(&self, mut f: impl FnMut(&mut dyn InputListener)) {
        for listener in self.snapshot() {
            if let Ok(mut listener) = listener.try_borrow_mut() {
                f(&mut *listener);
            }
        }
    }
}

impl std::fmt::Debug for InputRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputRouter")
            .field("listeners", &self.entries.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        name: &'static str,
        consume: bool,
    }

    impl InputListener for Probe {}

    fn probe(name: &'static str, consume: bool) -> Rc<RefCell<Probe>> {
        Rc::new(RefCell::new(Probe { name, consume }))
    }

    fn weak(p: &Rc<RefCell<Probe>>) -> ListenerRef {
        let rc: Rc<RefCell<dyn InputListener>> = p.clone();
        Rc::downgrade(&rc)
    }

    /// Dispatch and record which probes saw the event, in order
    fn run(router: &InputRouter, probes: &[&Rc<RefCell<Probe>>]) -> (bool, Vec<&'static str>) {
        let known: Vec<(*mut (), &'static str, bool)> = probes
            .iter()
            .map(|p| {
                let b = p.borrow();
                (p.as_ptr() as *mut (), b.name, b.consume)
            })
            .collect();
        let mut log = Vec::new();
        let consumed = router.dispatch(|listener| {
            let ptr = listener as *mut _ as *mut ();
            match known.iter().find(|(p, _, _)| *p == ptr) {
                Some((_, name, consume)) => {
                    log.push(*name);
                    *consume
                }
                None => false,
            }
        });
        (consumed, log)
    }

    #[test]
    fn test_group_and_position_order() {
        let low = probe("low", false);
        let back = probe("back", false);
        let front = probe("front", false);
        let router = InputRouter::new();

        let _c1 = router.connect(10, ConnectPosition::Back, weak(&back));
        let _c2 = router.connect(10, ConnectPosition::Front, weak(&front));
        let _c3 = router.connect(0, ConnectPosition::Back, weak(&low));

        let (consumed, log) = run(&router, &[&low, &back, &front]);
        assert!(!consumed);
        assert_eq!(log, vec!["low", "front", "back"]);
    }

    #[test]
    fn test_first_consumer_stops_dispatch() {
        let a = probe("a", true);
        let b = probe("b", false);
        let router = InputRouter::new();
        let _ca = router.connect(0, ConnectPosition::Back, weak(&a));
        let _cb = router.connect(0, ConnectPosition::Back, weak(&b));

        let (consumed, log) = run(&router, &[&a, &b]);
        assert!(consumed);
        assert_eq!(log, vec!["a"]);
    }

    #[test]
    fn test_connection_drop_and_dead_listener() {
        let a = probe("a", false);
        let b = probe("b", false);
        let router = InputRouter::new();
        let ca = router.connect(0, ConnectPosition::Back, weak(&a));
        let _cb = router.connect(0, ConnectPosition::Back, weak(&b));
        assert_eq!(router.listener_count(), 2);

        drop(ca);
        assert_eq!(router.listener_count(), 1);
        drop(b);
        assert_eq!(router.listener_count(), 0);
        assert!(!router.dispatch(|_| true));
    }
}
