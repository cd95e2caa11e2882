//! Stage snapshot for hosts and scenario runs

use serde::Serialize;

use scrollstage_core::{DeviceClass, GlobalScrollState};
use scrollstage_effects::{ImageHeightStatus, StackingOutcome, ThemeOutcome, TrackedImage};
use scrollstage_scroll::RegistryStats;

use crate::transition::{TransitionPhase, TransitionStats};

/// Live triggers per subsystem
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TriggerCounts {
    pub stacking: usize,
    pub theme: usize,
    pub page: usize,
}

/// Snapshot returned by [`Stage::report`](crate::Stage::report)
#[derive(Clone, Debug, Serialize)]
pub struct StageReport {
    pub path: String,
    pub device: DeviceClass,
    pub phase: TransitionPhase,
    pub booted: bool,
    pub scroll: f32,
    pub state: GlobalScrollState,
    pub triggers: TriggerCounts,
    pub registry: RegistryStats,
    pub transitions: TransitionStats,
    pub stacking: Option<StackingOutcome>,
    pub theme: Option<ThemeOutcome>,
    pub images: Option<ImageHeightStatus>,
    pub stack: Vec<TrackedImage>,
    /// Debounced resizes that reached a rebuild
    pub resize_rebuilds: u32,
    /// Lifecycle steps dropped by superseding navigations
    pub dropped_steps: u32,
}
