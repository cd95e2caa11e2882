//! Scrollstage Scroll
//!
//! Scroll position plumbing for the effects:
//!
//! - **Scroll Emulator**: lerp-smoothed scrolling driven by wheel input and
//!   a frame callback, shared through [`EmulatorHandle`]
//! - **Trigger Registry**: boundary-crossing callbacks with pinning,
//!   progress reporting and per-subsystem teardown
//! - **Debouncer**: trailing-edge coalescing for resize bursts

pub mod debounce;
pub mod emulator;
pub mod error;
pub mod registry;

pub use debounce::Debouncer;
pub use emulator::{EmulatorHandle, EmulatorInput, EmulatorState, ListenerId, ScrollEmulator, ScrollEvent};
pub use error::ScrollError;
pub use registry::{
    Anchor, BoundaryRule, Crossing, Offset, RegistryStats, ScrollDirection, ScrollerProxy,
    Subsystem, TriggerCallback, TriggerContext, TriggerId, TriggerRegistry, TriggerSpec,
    TriggerState,
};
