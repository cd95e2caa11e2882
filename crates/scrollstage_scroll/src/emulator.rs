//! Smooth scroll emulation
//!
//! [`ScrollEmulator`] keeps a target scroll offset fed by wheel input and
//! eases an animated offset toward it every frame, writing the result to the
//! document's native scroll position. The registry reads the animated
//! offset through [`EmulatorHandle`], which implements [`ScrollerProxy`].
//!
//! Smoothing is frame-rate independent: with `lerp = 0.12`, each 60Hz frame
//! covers 12% of the remaining distance, and other frame rates damp by the
//! equivalent exponential factor.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use scrollstage_core::{Document, ScrollConfig};

use crate::registry::ScrollerProxy;

/// Animation state of the emulator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmulatorState {
    /// At rest on the target
    #[default]
    Idle,
    /// Easing toward the target
    Smoothing,
    /// Input ignored until started again
    Stopped,
}

/// Inputs that move the emulator between states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmulatorInput {
    Target,
    Settled,
    Stop,
    Start,
}

impl EmulatorState {
    /// Next state for an input, or `None` when the input is ignored
    pub fn on_event(&self, input: EmulatorInput) -> Option<Self> {
        match (self, input) {
            (EmulatorState::Idle, EmulatorInput::Target) => Some(EmulatorState::Smoothing),
            (EmulatorState::Smoothing, EmulatorInput::Settled) => Some(EmulatorState::Idle),
            (EmulatorState::Idle | EmulatorState::Smoothing, EmulatorInput::Stop) => {
                Some(EmulatorState::Stopped)
            }
            (EmulatorState::Stopped, EmulatorInput::Start) => Some(EmulatorState::Idle),
            _ => None,
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, EmulatorState::Stopped)
    }
}

/// Payload of a scroll notification
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollEvent {
    pub scroll: f32,
    /// Pixels per second
    pub velocity: f32,
    /// `1` scrolling down, `-1` up, `0` at rest
    pub direction: i8,
}

/// Lerp-smoothed scroll position
#[derive(Debug, Clone)]
pub struct ScrollEmulator {
    options: ScrollConfig,
    state: EmulatorState,
    animated: f32,
    target: f32,
    limit: f32,
    velocity: f32,
    direction: i8,
}

impl ScrollEmulator {
    pub fn new(options: ScrollConfig) -> Self {
        Self {
            options,
            state: EmulatorState::Idle,
            animated: 0.0,
            target: 0.0,
            limit: 0.0,
            velocity: 0.0,
            direction: 0,
        }
    }

    /// Create an emulator sized to `doc` and synced to its scroll offset
    pub fn attach(options: ScrollConfig, doc: &dyn Document) -> Self {
        let mut emulator = Self::new(options);
        emulator.resize(doc);
        emulator.animated = doc.scroll_y();
        emulator.target = emulator.animated;
        emulator
    }

    pub fn options(&self) -> &ScrollConfig {
        &self.options
    }

    pub fn state(&self) -> EmulatorState {
        self.state
    }

    /// Current animated offset
    pub fn scroll(&self) -> f32 {
        if self.options.infinite && self.limit > 0.0 {
            self.animated.rem_euclid(self.limit)
        } else {
            self.animated
        }
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn limit(&self) -> f32 {
        self.limit
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn is_stopped(&self) -> bool {
        self.state.is_stopped()
    }

    pub fn is_smoothing(&self) -> bool {
        self.state == EmulatorState::Smoothing
    }

    fn transition(&mut self, input: EmulatorInput) {
        if let Some(next) = self.state.on_event(input) {
            trace!(from = ?self.state, to = ?next, ?input, "emulator state");
            self.state = next;
        }
    }

    fn clamp(&self, offset: f32) -> f32 {
        if self.options.infinite {
            offset
        } else {
            offset.clamp(0.0, self.limit)
        }
    }

    /// Resume accepting input
    pub fn start(&mut self) {
        self.transition(EmulatorInput::Start);
    }

    /// Freeze at the current position and ignore input
    pub fn stop(&mut self) {
        self.target = self.animated;
        self.velocity = 0.0;
        self.direction = 0;
        self.transition(EmulatorInput::Stop);
    }

    /// Re-measure the scroll limit from the document
    pub fn resize(&mut self, doc: &dyn Document) {
        self.limit = doc.max_scroll();
        self.target = self.clamp(self.target);
        self.animated = self.clamp(self.animated);
        debug!(limit = self.limit, "emulator resized");
    }

    /// Wheel input; ignored while stopped
    pub fn wheel(&mut self, delta: f32) {
        if self.is_stopped() {
            return;
        }
        let target = self.clamp(self.target + delta * self.options.wheel_multiplier);
        if self.options.smooth_wheel {
            self.set_target(target);
        } else {
            self.jump(target);
        }
    }

    /// Ease toward `offset`; ignored while stopped
    pub fn scroll_to(&mut self, offset: f32) {
        if self.is_stopped() {
            return;
        }
        let target = self.clamp(offset);
        self.set_target(target);
    }

    /// Move to `offset` immediately, even while stopped
    pub fn jump_to(&mut self, offset: f32) {
        let target = self.clamp(offset);
        self.jump(target);
    }

    /// Adopt a native scroll offset changed by someone else
    ///
    /// Ignored while smoothing, since the emulator itself writes the native
    /// offset every frame.
    pub fn sync_native(&mut self, offset: f32) {
        if self.is_smoothing() {
            return;
        }
        self.animated = offset;
        self.target = offset;
    }

    fn set_target(&mut self, target: f32) {
        self.target = target;
        if (self.target - self.animated).abs() > f32::EPSILON {
            self.transition(EmulatorInput::Target);
        }
    }

    fn jump(&mut self, target: f32) {
        self.direction = direction_of(target - self.animated);
        self.animated = target;
        self.target = target;
        self.velocity = 0.0;
        self.transition(EmulatorInput::Settled);
    }

    /// Advance one frame by `dt` seconds
    ///
    /// Writes the native scroll offset and returns an event when the animated
    /// offset moved.
    pub fn raf(&mut self, doc: &mut dyn Document, dt: f32) -> Option<ScrollEvent> {
        if self.state != EmulatorState::Smoothing || dt <= 0.0 {
            return None;
        }

        let previous = self.animated;
        let factor = 1.0 - (-self.options.lerp * 60.0 * dt).exp();
        self.animated += (self.target - self.animated) * factor;
        if (self.target - self.animated).abs() < 0.5 {
            self.animated = self.target;
            self.transition(EmulatorInput::Settled);
        }

        let moved = self.animated - previous;
        self.velocity = moved / dt;
        self.direction = direction_of(moved);
        doc.set_scroll_y(self.scroll());

        Some(ScrollEvent {
            scroll: self.scroll(),
            velocity: self.velocity,
            direction: self.direction,
        })
    }
}

fn direction_of(delta: f32) -> i8 {
    if delta > 0.0 {
        1
    } else if delta < 0.0 {
        -1
    } else {
        0
    }
}

// ============================================================================
// Shared handle
// ============================================================================

type Listener = Box<dyn FnMut(&ScrollEvent)>;

/// Identifies a scroll listener registered with [`EmulatorHandle::on_scroll`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Shared {
    emulator: RefCell<ScrollEmulator>,
    /// A slot is empty while its listener runs
    listeners: RefCell<Vec<(ListenerId, Option<Listener>)>>,
    next_listener: Cell<u64>,
}

/// Shared, clonable access to a [`ScrollEmulator`]
#[derive(Clone)]
pub struct EmulatorHandle {
    shared: Rc<Shared>,
}

impl EmulatorHandle {
    pub fn new(emulator: ScrollEmulator) -> Self {
        Self {
            shared: Rc::new(Shared {
                emulator: RefCell::new(emulator),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
            }),
        }
    }

    /// Run `f` with the emulator borrowed mutably
    pub fn with<R>(&self, f: impl FnOnce(&mut ScrollEmulator) -> R) -> R {
        f(&mut self.shared.emulator.borrow_mut())
    }

    pub fn scroll(&self) -> f32 {
        self.shared.emulator.borrow().scroll()
    }

    pub fn state(&self) -> EmulatorState {
        self.shared.emulator.borrow().state()
    }

    pub fn start(&self) {
        self.with(ScrollEmulator::start);
    }

    pub fn stop(&self) {
        self.with(ScrollEmulator::stop);
    }

    pub fn resize(&self, doc: &dyn Document) {
        self.with(|emulator| emulator.resize(doc));
    }

    pub fn wheel(&self, delta: f32) {
        self.with(|emulator| emulator.wheel(delta));
    }

    pub fn scroll_to(&self, offset: f32) {
        self.with(|emulator| emulator.scroll_to(offset));
    }

    pub fn jump_to(&self, offset: f32) {
        self.with(|emulator| emulator.jump_to(offset));
    }

    pub fn sync_native(&self, offset: f32) {
        self.with(|emulator| emulator.sync_native(offset));
    }

    /// Subscribe to scroll events
    pub fn on_scroll(&self, listener: impl FnMut(&ScrollEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.shared.next_listener.get());
        self.shared.next_listener.set(id.0 + 1);
        self.shared
            .listeners
            .borrow_mut()
            .push((id, Some(Box::new(listener))));
        id
    }

    /// Unsubscribe a listener, also from inside a running dispatch
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.shared.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener, _)| *listener != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.borrow().len()
    }

    /// Advance one frame and notify listeners
    ///
    /// Neither the emulator nor the listener list is borrowed while a
    /// listener runs, so listeners may read the emulator, subscribe further
    /// listeners or unsubscribe any listener, themselves included. Listeners
    /// subscribed during dispatch first run on the next frame; listeners
    /// removed during dispatch do not run again.
    pub fn raf(&self, doc: &mut dyn Document, dt: f32) -> Option<ScrollEvent> {
        let event = self.with(|emulator| emulator.raf(doc, dt))?;

        let ids: Vec<ListenerId> = self
            .shared
            .listeners
            .borrow()
            .iter()
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            let Some(mut listener) = self.take_listener(id) else {
                continue;
            };
            listener(&event);
            let mut listeners = self.shared.listeners.borrow_mut();
            if let Some((_, slot)) = listeners.iter_mut().find(|(slot_id, _)| *slot_id == id) {
                *slot = Some(listener);
            }
        }

        Some(event)
    }

    fn take_listener(&self, id: ListenerId) -> Option<Listener> {
        self.shared
            .listeners
            .borrow_mut()
            .iter_mut()
            .find(|(slot_id, _)| *slot_id == id)
            .and_then(|(_, slot)| slot.take())
    }
}

impl ScrollerProxy for EmulatorHandle {
    fn scroll_top(&self) -> f32 {
        self.scroll()
    }

    fn set_scroll_top(&self, value: f32) {
        self.scroll_to(value);
    }
}

impl fmt::Debug for EmulatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatorHandle")
            .field("emulator", &*self.shared.emulator.borrow())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollstage_core::{MemoryDocument, NodeSpec};

    const FRAME: f32 = 1.0 / 60.0;

    fn tall_doc() -> MemoryDocument {
        let mut doc = MemoryDocument::new(1280.0, 800.0);
        let body = doc.body();
        doc.append(body, &NodeSpec::div().height(4000.0)).unwrap();
        doc
    }

    #[test]
    fn test_state_transitions() {
        let state = EmulatorState::Idle;
        assert_eq!(state.on_event(EmulatorInput::Target), Some(EmulatorState::Smoothing));
        assert_eq!(state.on_event(EmulatorInput::Start), None);
        assert_eq!(
            EmulatorState::Smoothing.on_event(EmulatorInput::Stop),
            Some(EmulatorState::Stopped)
        );
        assert_eq!(EmulatorState::Stopped.on_event(EmulatorInput::Target), None);
    }

    #[test]
    fn test_first_frame_covers_lerp_fraction() {
        let mut doc = tall_doc();
        let mut emulator = ScrollEmulator::attach(ScrollConfig::default(), &doc);
        assert_eq!(emulator.limit(), 3200.0);

        emulator.wheel(100.0);
        let event = emulator.raf(&mut doc, FRAME).unwrap();
        // 1 - e^-0.12 of the distance, about 11.3px
        assert!((event.scroll - 11.308).abs() < 0.01);
        assert_eq!(event.direction, 1);
        assert_eq!(doc.scroll_y(), event.scroll);
    }

    #[test]
    fn test_settles_on_target() {
        let mut doc = tall_doc();
        let mut emulator = ScrollEmulator::attach(ScrollConfig::default(), &doc);
        emulator.wheel(500.0);
        for _ in 0..240 {
            emulator.raf(&mut doc, FRAME);
        }
        assert_eq!(emulator.scroll(), 500.0);
        assert_eq!(emulator.state(), EmulatorState::Idle);
        assert!(emulator.raf(&mut doc, FRAME).is_none());
    }

    #[test]
    fn test_wheel_is_clamped_and_multiplied() {
        let doc = tall_doc();
        let options = ScrollConfig {
            wheel_multiplier: 2.0,
            ..ScrollConfig::default()
        };
        let mut emulator = ScrollEmulator::attach(options, &doc);
        emulator.wheel(100.0);
        assert_eq!(emulator.target(), 200.0);
        emulator.wheel(-1000.0);
        assert_eq!(emulator.target(), 0.0);
        emulator.wheel(10_000.0);
        assert_eq!(emulator.target(), 3200.0);
    }

    #[test]
    fn test_stop_ignores_input_until_started() {
        let mut doc = tall_doc();
        let mut emulator = ScrollEmulator::attach(ScrollConfig::default(), &doc);
        emulator.stop();
        emulator.wheel(300.0);
        emulator.scroll_to(300.0);
        assert!(emulator.raf(&mut doc, FRAME).is_none());
        assert_eq!(emulator.target(), 0.0);

        emulator.jump_to(120.0);
        assert_eq!(emulator.scroll(), 120.0);
        assert!(emulator.is_stopped());

        emulator.start();
        emulator.scroll_to(200.0);
        assert!(emulator.raf(&mut doc, FRAME).is_some());
    }

    #[test]
    fn test_without_smooth_wheel_jumps() {
        let doc = tall_doc();
        let options = ScrollConfig {
            smooth_wheel: false,
            ..ScrollConfig::default()
        };
        let mut emulator = ScrollEmulator::attach(options, &doc);
        emulator.wheel(250.0);
        assert_eq!(emulator.scroll(), 250.0);
        assert_eq!(emulator.state(), EmulatorState::Idle);
    }

    #[test]
    fn test_handle_dispatches_listeners() {
        let mut doc = tall_doc();
        let handle = EmulatorHandle::new(ScrollEmulator::attach(ScrollConfig::default(), &doc));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let reader = handle.clone();
        let id = handle.on_scroll(move |event| {
            // the emulator is readable from inside a listener
            assert_eq!(reader.scroll(), event.scroll);
            sink.borrow_mut().push(event.scroll);
        });

        handle.wheel(50.0);
        handle.raf(&mut doc, FRAME);
        handle.raf(&mut doc, FRAME);
        assert_eq!(seen.borrow().len(), 2);

        assert!(handle.off(id));
        handle.raf(&mut doc, FRAME);
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(ScrollerProxy::scroll_top(&handle), handle.scroll());
    }

    #[test]
    fn test_listener_can_unsubscribe_itself() {
        let mut doc = tall_doc();
        let handle = EmulatorHandle::new(ScrollEmulator::attach(ScrollConfig::default(), &doc));
        let calls = Rc::new(Cell::new(0));
        let own_id = Rc::new(Cell::new(None::<ListenerId>));

        let counter = Rc::clone(&calls);
        let slot = Rc::clone(&own_id);
        let remover = handle.clone();
        let id = handle.on_scroll(move |_| {
            counter.set(counter.get() + 1);
            if let Some(id) = slot.get() {
                assert!(remover.off(id));
            }
        });
        own_id.set(Some(id));

        handle.wheel(200.0);
        assert!(handle.raf(&mut doc, FRAME).is_some());
        assert_eq!(calls.get(), 1);
        assert_eq!(handle.listener_count(), 0);

        assert!(handle.raf(&mut doc, FRAME).is_some());
        assert_eq!(calls.get(), 1);
        assert!(!handle.off(id));
    }

    #[test]
    fn test_listener_can_unsubscribe_a_later_listener() {
        let mut doc = tall_doc();
        let handle = EmulatorHandle::new(ScrollEmulator::attach(ScrollConfig::default(), &doc));
        let later_calls = Rc::new(Cell::new(0));
        let later_id = Rc::new(Cell::new(None::<ListenerId>));

        let slot = Rc::clone(&later_id);
        let remover = handle.clone();
        handle.on_scroll(move |_| {
            if let Some(id) = slot.take() {
                remover.off(id);
            }
        });
        let counter = Rc::clone(&later_calls);
        let added = handle.on_scroll(move |_| counter.set(counter.get() + 1));
        later_id.set(Some(added));

        handle.wheel(200.0);
        handle.raf(&mut doc, FRAME);
        handle.raf(&mut doc, FRAME);
        assert_eq!(later_calls.get(), 0);
        assert_eq!(handle.listener_count(), 1);
    }

    #[test]
    fn test_listener_added_during_dispatch_runs_next_frame() {
        let mut doc = tall_doc();
        let handle = EmulatorHandle::new(ScrollEmulator::attach(ScrollConfig::default(), &doc));
        let added_calls = Rc::new(Cell::new(0));

        let counter = Rc::clone(&added_calls);
        let subscriber = handle.clone();
        let armed = Rc::new(Cell::new(true));
        handle.on_scroll(move |_| {
            if armed.replace(false) {
                let counter = Rc::clone(&counter);
                subscriber.on_scroll(move |_| counter.set(counter.get() + 1));
            }
        });

        handle.wheel(200.0);
        handle.raf(&mut doc, FRAME);
        assert_eq!(added_calls.get(), 0);
        assert_eq!(handle.listener_count(), 2);
        handle.raf(&mut doc, FRAME);
        assert_eq!(added_calls.get(), 1);
    }
}
