//! Process-wide scroll state
//!
//! The dark flag belongs to the theme switcher and the smooth-scroll flag to
//! the scroll emulator adapter; the stacking engine only reads the viewport
//! height. Hosts are single-threaded, so the state is shared through
//! `Rc<RefCell<_>>` and cloned into trigger callbacks.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use serde::Serialize;

/// Snapshot of the global scroll state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GlobalScrollState {
    pub dark_mode_active: bool,
    pub smooth_scroll_enabled: bool,
    pub last_measured_viewport_height: f32,
}

/// Shared handle to [`GlobalScrollState`]
#[derive(Debug, Clone, Default)]
pub struct SharedScrollState(Rc<RefCell<GlobalScrollState>>);

impl SharedScrollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> GlobalScrollState {
        *self.0.borrow()
    }

    pub fn borrow(&self) -> Ref<'_, GlobalScrollState> {
        self.0.borrow()
    }

    pub fn dark_mode_active(&self) -> bool {
        self.0.borrow().dark_mode_active
    }

    /// Returns true if the flag changed
    pub fn set_dark_mode(&self, active: bool) -> bool {
        let mut state = self.0.borrow_mut();
        let changed = state.dark_mode_active != active;
        state.dark_mode_active = active;
        changed
    }

    pub fn set_smooth_scroll(&self, enabled: bool) {
        self.0.borrow_mut().smooth_scroll_enabled = enabled;
    }

    pub fn set_viewport_height(&self, height: f32) {
        self.0.borrow_mut().last_measured_viewport_height = height;
    }

    pub fn viewport_height(&self) -> f32 {
        self.0.borrow().last_measured_viewport_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_handles_see_updates() {
        let state = SharedScrollState::new();
        let other = state.clone();

        assert!(state.set_dark_mode(true));
        assert!(!state.set_dark_mode(true));
        assert!(other.dark_mode_active());

        other.set_viewport_height(800.0);
        assert_eq!(state.get().last_measured_viewport_height, 800.0);
    }
}
