//! Domain events and a synchronous publish/subscribe bus.
//!
//! The bus is an explicit object (not a module-level singleton) so each game,
//! and each test, owns its own instance. Delivery is synchronous and in
//! registration order. Handlers that panic are not caught: the panic unwinds
//! into whoever called `emit`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Value, json};

use crate::clock::Clock;
use crate::game::PlayerSide;

pub const CHOP: &str = "chop";
pub const HIT: &str = "hit";
pub const GAME_OVER: &str = "gameOver";
pub const TIMER_WARNING: &str = "timerWarning";
pub const RESET: &str = "reset";
pub const DEBUG_TOGGLE: &str = "debugToggle";

/// Something that happened during a transition, published for audio and other observers.
#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Chop { side: PlayerSide, score: u32 },
    Hit { side: PlayerSide },
    GameOver { score: u32 },
    TimerWarning { time_remaining: f64 },
    Reset,
    DebugToggle { enabled: bool },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::Chop { .. } => CHOP,
            DomainEvent::Hit { .. } => HIT,
            DomainEvent::GameOver { .. } => GAME_OVER,
            DomainEvent::TimerWarning { .. } => TIMER_WARNING,
            DomainEvent::Reset => RESET,
            DomainEvent::DebugToggle { .. } => DEBUG_TOGGLE,
        }
    }

    pub fn payload(&self) -> Option<Value> {
        match self {
            DomainEvent::Chop { side, score } => Some(json!({ "side": side, "score": score })),
            DomainEvent::Hit { side } => Some(json!({ "side": side })),
            DomainEvent::GameOver { score } => Some(json!({ "score": score })),
            DomainEvent::TimerWarning { time_remaining } => {
                Some(json!({ "timeRemaining": time_remaining }))
            }
            DomainEvent::Reset => None,
            DomainEvent::DebugToggle { enabled } => Some(json!({ "enabled": enabled })),
        }
    }
}

/// Handle returned by every `subscribe`. Dropping it leaves the handler registered.
pub struct Subscription {
    remove: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(remove: impl FnOnce() + 'static) -> Self {
        Self { remove: Some(Box::new(remove)) }
    }

    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

type Handler<T> = Rc<dyn Fn(&T)>;

struct Slots<T: ?Sized> {
    next_id: u64,
    entries: Vec<(u64, Handler<T>)>,
}

/// Ordered list of handlers shared with the subscriptions that can remove them.
pub struct HandlerList<T> {
    inner: Rc<RefCell<Slots<T>>>,
}

impl<T> Clone for HandlerList<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: 'static> Default for HandlerList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> HandlerList<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Slots { next_id: 0, entries: Vec::new() })),
        }
    }

    pub fn add(&self, handler: impl Fn(&T) + 'static) -> Subscription {
        let id = {
            let mut slots = self.inner.borrow_mut();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.entries.push((id, Rc::new(handler)));
            id
        };
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().entries.retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    /// Calls every handler registered at the time of the call. Handlers may
    /// subscribe or unsubscribe re-entrantly; changes apply to the next notify.
    pub fn notify(&self, value: &T) -> usize {
        let handlers: Vec<Handler<T>> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        for handler in &handlers {
            handler(value);
        }
        handlers.len()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().entries.clear();
    }
}

/// What bus handlers receive.
#[derive(Clone, Debug, PartialEq)]
pub struct BusEvent {
    pub event_type: String,
    pub timestamp: f64,
    pub data: Option<Value>,
}

/// Publish/subscribe registry keyed by event name. Names are free-form; the
/// domain events use the constants in this module.
pub struct EventBus {
    clock: Rc<dyn Clock>,
    lists: RefCell<HashMap<String, HandlerList<BusEvent>>>,
}

impl EventBus {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            lists: RefCell::new(HashMap::new()),
        }
    }

    pub fn subscribe(
        &self,
        event_type: &str,
        handler: impl Fn(&BusEvent) + 'static,
    ) -> Subscription {
        let list = self
            .lists
            .borrow_mut()
            .entry(event_type.to_owned())
            .or_default()
            .clone();
        list.add(handler)
    }

    /// Delivers to the handlers of `event_type`; returns how many were called.
    pub fn emit(&self, event_type: &str, data: Option<Value>) -> usize {
        let list = self.lists.borrow().get(event_type).cloned();
        let Some(list) = list else {
            return 0;
        };
        let event = BusEvent {
            event_type: event_type.to_owned(),
            timestamp: self.clock.now_ms(),
            data,
        };
        list.notify(&event)
    }

    pub fn emit_domain(&self, event: &DomainEvent) -> usize {
        self.emit(event.name(), event.payload())
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.lists
            .borrow()
            .get(event_type)
            .map(HandlerList::len)
            .unwrap_or(0)
    }

    /// Drops every handler. Outstanding subscriptions become no-ops.
    pub fn clear(&self) {
        let mut lists = self.lists.borrow_mut();
        for list in lists.values() {
            list.clear();
        }
        lists.clear();
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lists = self.lists.borrow();
        let mut counts: Vec<(&String, usize)> = lists.iter().map(|(k, v)| (k, v.len())).collect();
        counts.sort();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::cell::RefCell;

    fn bus_at(ms: f64) -> (Rc<ManualClock>, EventBus) {
        let clock = Rc::new(ManualClock::new(ms));
        let bus = EventBus::new(clock.clone());
        (clock, bus)
    }

    #[test]
    fn delivers_in_registration_order_with_timestamp() {
        let (clock, bus) = bus_at(42.0);
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let log = log.clone();
            bus.subscribe(CHOP, move |e| {
                log.borrow_mut().push((tag, e.timestamp, e.data.clone()));
            });
        }
        clock.set(50.0);
        let delivered = bus.emit(CHOP, Some(json!({ "score": 3 })));
        assert_eq!(delivered, 3);
        let log = log.borrow();
        assert_eq!(log.iter().map(|(t, _, _)| *t).collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(log.iter().all(|(_, ts, data)| *ts == 50.0 && data == &Some(json!({ "score": 3 }))));
    }

    #[test]
    fn handlers_only_see_their_type() {
        let (_, bus) = bus_at(0.0);
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        bus.subscribe(HIT, move |_| *h.borrow_mut() += 1);
        assert_eq!(bus.emit(CHOP, None), 0);
        assert_eq!(bus.emit("somethingElse", None), 0);
        bus.emit(HIT, None);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let (_, bus) = bus_at(0.0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s1 = seen.clone();
        let first = bus.subscribe(GAME_OVER, move |_| s1.borrow_mut().push(1));
        let s2 = seen.clone();
        let _second = bus.subscribe(GAME_OVER, move |_| s2.borrow_mut().push(2));
        first.unsubscribe();
        bus.emit(GAME_OVER, None);
        assert_eq!(*seen.borrow(), vec![2]);
        assert_eq!(bus.handler_count(GAME_OVER), 1);
    }

    #[test]
    fn clear_removes_everything_and_old_handles_are_harmless() {
        let (_, bus) = bus_at(0.0);
        let sub = bus.subscribe(CHOP, |_| {});
        bus.subscribe(HIT, |_| {});
        bus.clear();
        assert_eq!(bus.handler_count(CHOP), 0);
        assert_eq!(bus.handler_count(HIT), 0);
        sub.unsubscribe();
        assert_eq!(bus.emit(CHOP, None), 0);
    }

    #[test]
    fn handler_may_subscribe_during_emit() {
        let bus = Rc::new(bus_at(0.0).1);
        let inner_bus = bus.clone();
        bus.subscribe(RESET, move |_| {
            inner_bus.subscribe(RESET, |_| {});
        });
        assert_eq!(bus.emit(RESET, None), 1);
        assert_eq!(bus.handler_count(RESET), 2);
    }

    #[test]
    #[should_panic(expected = "handler blew up")]
    fn handler_panics_propagate_to_emitter() {
        let (_, bus) = bus_at(0.0);
        bus.subscribe(HIT, |_| panic!("handler blew up"));
        bus.emit(HIT, None);
    }

    #[test]
    fn domain_event_names_and_payloads() {
        let chop = DomainEvent::Chop { side: PlayerSide::Right, score: 4 };
        assert_eq!(chop.name(), "chop");
        assert_eq!(chop.payload(), Some(json!({ "side": "right", "score": 4 })));
        assert_eq!(DomainEvent::Reset.payload(), None);
        assert_eq!(DomainEvent::TimerWarning { time_remaining: 2.9 }.name(), "timerWarning");
    }
}
