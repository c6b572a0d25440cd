// Holds the live snapshot and serialises every transition through `dispatch`.

use std::rc::Rc;

use tracing::{info, trace};

use super::commands::{Command, CommandContext};
use super::tree::BranchGenerator;
use super::GameState;
use crate::clock::Clock;
use crate::events::{DomainEvent, EventBus, HandlerList, Subscription};

/// What machine listeners receive, in order: every event of a transition, then
/// exactly one `StateChanged`.
#[derive(Clone, Debug)]
pub enum Notification {
    Event(DomainEvent),
    StateChanged(Rc<GameState>),
}

pub struct GameStateMachine {
    state: Rc<GameState>,
    generator: BranchGenerator,
    clock: Rc<dyn Clock>,
    bus: Option<Rc<EventBus>>,
    listeners: HandlerList<Notification>,
    next_animation_id: u64,
}

impl GameStateMachine {
    pub fn new(generator: BranchGenerator, clock: Rc<dyn Clock>) -> Self {
        Self {
            state: Rc::new(GameState::initial()),
            generator,
            clock,
            bus: None,
            listeners: HandlerList::new(),
            next_animation_id: 0,
        }
    }

    /// Also publish every domain event by name on `bus`.
    pub fn with_event_bus(mut self, bus: Rc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn state(&self) -> Rc<GameState> {
        self.state.clone()
    }

    pub fn subscribe(&self, listener: impl Fn(&Notification) + 'static) -> Subscription {
        self.listeners.add(listener)
    }

    /// Runs `command` against the current snapshot, swaps in the result and
    /// notifies. Returns the new current snapshot.
    pub fn dispatch(&mut self, command: Command) -> Rc<GameState> {
        let now_ms = self.clock.now_ms();
        let transition = {
            let mut ctx = CommandContext {
                generator: &mut self.generator,
                now_ms,
                next_animation_id: &mut self.next_animation_id,
            };
            command.execute(&self.state, &mut ctx)
        };
        let changed = !Rc::ptr_eq(&transition.state, &self.state);
        trace!(
            command = command.name(),
            changed,
            events = transition.events.len(),
            "dispatch"
        );
        if transition.state.game_over && !self.state.game_over {
            info!(score = transition.state.score, "round over");
        }
        self.state = transition.state;

        for event in transition.events {
            if let Some(bus) = &self.bus {
                bus.emit_domain(&event);
            }
            self.listeners.notify(&Notification::Event(event));
        }
        self.listeners
            .notify(&Notification::StateChanged(self.state.clone()));
        self.state.clone()
    }

    /// Reinitialises without going through a command. Listeners still get `StateChanged`.
    pub fn reset(&mut self) -> Rc<GameState> {
        self.state = Rc::new(GameState::initial());
        self.listeners
            .notify(&Notification::StateChanged(self.state.clone()));
        self.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::{CHOP, GAME_OVER, HIT};
    use crate::game::tree::{FixedRandom, PlayerSide};
    use std::cell::RefCell;

    fn machine() -> (Rc<ManualClock>, GameStateMachine) {
        let clock = Rc::new(ManualClock::new(500.0));
        let m = GameStateMachine::new(BranchGenerator::new(FixedRandom(0.8)), clock.clone());
        (clock, m)
    }

    fn describe(n: &Notification) -> String {
        match n {
            Notification::Event(e) => e.name().to_owned(),
            Notification::StateChanged(s) => format!("state:{}", s.score),
        }
    }

    #[test]
    fn events_precede_single_state_change() {
        let (_, mut m) = machine();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        m.subscribe(move |n| l.borrow_mut().push(describe(n)));
        // Opening trunk with empty refills: the third chop must dodge a left branch.
        m.dispatch(Command::Chop(PlayerSide::Left));
        m.dispatch(Command::Chop(PlayerSide::Left));
        m.dispatch(Command::Chop(PlayerSide::Right));
        let log = log.borrow();
        assert_eq!(
            *log,
            vec!["chop", "state:1", "chop", "state:2", "chop", "state:3"]
        );
    }

    #[test]
    fn collision_notifies_hit_then_game_over_then_state() {
        let (_, mut m) = machine();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        m.subscribe(move |n| l.borrow_mut().push(describe(n)));
        m.dispatch(Command::Chop(PlayerSide::Left));
        m.dispatch(Command::Chop(PlayerSide::Left));
        let s = m.dispatch(Command::Chop(PlayerSide::Left));
        assert!(s.game_over);
        assert_eq!(log.borrow()[4..].to_vec(), vec!["hit", "gameOver", "state:2"]);
    }

    #[test]
    fn collision_publishes_hit_before_game_over_on_bus() {
        let (clock, m) = machine();
        let bus = Rc::new(EventBus::new(clock.clone()));
        let mut m = m.with_event_bus(bus.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));
        for name in [CHOP, HIT, GAME_OVER] {
            let seen = seen.clone();
            bus.subscribe(name, move |e| seen.borrow_mut().push(e.event_type.clone()));
        }
        let s = m.dispatch(Command::Chop(PlayerSide::Right));
        assert!(s.game_over);
        assert_eq!(*seen.borrow(), vec!["hit".to_owned(), "gameOver".to_owned()]);
    }

    #[test]
    fn noop_dispatch_still_notifies_state() {
        let (_, mut m) = machine();
        m.dispatch(Command::Chop(PlayerSide::Right));
        let before = m.state();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        m.subscribe(move |_| *c.borrow_mut() += 1);
        let after = m.dispatch(Command::Chop(PlayerSide::Left));
        assert!(Rc::ptr_eq(&before, &after));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn animation_start_time_comes_from_clock() {
        let (clock, mut m) = machine();
        clock.set(1_234.0);
        let s = m.dispatch(Command::Chop(PlayerSide::Left));
        assert_eq!(s.animated_segments[0].start_time, 1_234.0);
    }

    #[test]
    fn machine_reset_bypasses_commands_but_notifies() {
        let (clock, m) = machine();
        let bus = Rc::new(EventBus::new(clock));
        let mut m = m.with_event_bus(bus.clone());
        let resets = Rc::new(RefCell::new(0));
        let r = resets.clone();
        bus.subscribe(crate::events::RESET, move |_| *r.borrow_mut() += 1);
        let states = Rc::new(RefCell::new(0));
        let s = states.clone();
        m.subscribe(move |n| {
            if matches!(n, Notification::StateChanged(_)) {
                *s.borrow_mut() += 1;
            }
        });
        m.dispatch(Command::Chop(PlayerSide::Left));
        let fresh = m.reset();
        assert_eq!(*fresh, GameState::initial());
        assert_eq!(*states.borrow(), 2);
        assert_eq!(*resets.borrow(), 0);
    }
}
