//! Observer lists with subscriber-owned connection tokens.
//!
//! A [`Signal`] keeps its slots behind an `Rc`; every `connect` hands back a
//! [`Connection`] that removes the slot when dropped or disconnected. The
//! token only holds a weak reference, so dropping the emitter first is fine.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Slot<T> = Rc<RefCell<dyn FnMut(&T)>>;

struct Slots<T> {
    next_id: u64,
    entries: Vec<(u64, Slot<T>)>,
}

pub struct Signal<T> {
    slots: Rc<RefCell<Slots<T>>>,
}

impl<T: 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            slots: Rc::new(RefCell::new(Slots {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Append a slot; it stays connected as long as the returned token lives.
    pub fn connect(&self, slot: impl FnMut(&T) + 'static) -> Connection {
        let id = {
            let mut slots = self.slots.borrow_mut();
            let id = slots.next_id;
            slots.next_id += 1;
            let slot: Slot<T> = Rc::new(RefCell::new(slot));
            slots.entries.push((id, slot));
            id
        };

        let weak: Weak<RefCell<Slots<T>>> = Rc::downgrade(&self.slots);
        Connection::new(move || {
            if let Some(slots) = weak.upgrade() {
                slots.borrow_mut().entries.retain(|(slot_id, _)| *slot_id != id);
            }
        })
    }

    /// Call every connected slot in connection order.
    ///
    /// Slots may connect or disconnect while the signal is being emitted;
    /// the set of slots called is the one present when `emit` started.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Slot<T>> = self
            .slots
            .borrow()
            .entries
            .iter()
            .map(|(_, slot)| slot.clone())
            .collect();
        for slot in snapshot {
            // A slot re-entering itself is skipped rather than panicking.
            if let Ok(mut f) = slot.try_borrow_mut() {
                f(value);
            }
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.borrow().entries.len()
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.slots.borrow().entries.len())
            .finish()
    }
}

/// Scoped subscription token. Dropping it disconnects.
pub struct Connection {
    disconnect: Option<Box<dyn FnOnce()>>,
}

impl Connection {
    pub(crate) fn new(disconnect: impl FnOnce() + 'static) -> Self {
        Self {
            disconnect: Some(Box::new(disconnect)),
        }
    }

    pub fn disconnect(&mut self) {
        if let Some(f) = self.disconnect.take() {
            f();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.disconnect.is_some()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_emit_reaches_connected_slots_in_order() {
        let signal = Signal::<i32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = log.clone();
        let _c1 = signal.connect(move |v| l1.borrow_mut().push(("a", *v)));
        let l2 = log.clone();
        let _c2 = signal.connect(move |v| l2.borrow_mut().push(("b", *v)));

        signal.emit(&7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_drop_token_disconnects() {
        let signal = Signal::<()>::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let conn = signal.connect(move |_| h.set(h.get() + 1));

        signal.emit(&());
        drop(conn);
        signal.emit(&());

        assert_eq!(hits.get(), 1);
        assert_eq!(signal.slot_count(), 0);
    }

    #[test]
    fn test_token_outlives_signal() {
        let signal = Signal::<()>::new();
        let mut conn = signal.connect(|_| {});
        drop(signal);
        conn.disconnect();
        assert!(!conn.is_connected());
    }

    #[test]
    fn test_disconnect_during_emit() {
        let signal = Rc::new(Signal::<()>::new());
        let hits = Rc::new(Cell::new(0));
        let slot_conn: Rc<RefCell<Option<Connection>>> = Rc::new(RefCell::new(None));

        let h = hits.clone();
        let sc = slot_conn.clone();
        let conn = signal.connect(move |_| {
            h.set(h.get() + 1);
            sc.borrow_mut().take();
        });
        *slot_conn.borrow_mut() = Some(conn);

        signal.emit(&());
        signal.emit(&());
        assert_eq!(hits.get(), 1);
    }
}
