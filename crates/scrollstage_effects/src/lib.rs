//! Scrollstage Effects
//!
//! Scroll-driven effects built on the trigger registry:
//!
//! - **Stacking Engine**: images pin as they reach the viewport centre and
//!   pile up with small random rotations
//! - **Theme Switcher**: toggles the dark body class from marker sections
//! - **Image Heights**: collapsed stack wrappers adopt their image's height
//!   once every stack image has loaded
//! - **Nav** and **Hero Background**: small page-chrome effects
//!
//! Every effect receives its collaborators through an [`EffectCx`], so it
//! can be driven by the stage or directly from a test.

pub mod hero_bg;
pub mod image_heights;
pub mod nav;
pub mod stacking;
pub mod theme;

use scrollstage_animation::{Animator, Easing};
use scrollstage_core::{DeviceClass, Document, Selectors, SharedScrollState, StageConfig};
use scrollstage_scroll::TriggerRegistry;
use tracing::warn;

pub use hero_bg::HeroBackground;
pub use image_heights::{ensure_image_heights, ImageHeightStatus};
pub use nav::{is_project_path, update_body_class, update_nav_state, PROJECT_CLASS, SCROLLED_CLASS};
pub use stacking::{
    end_offset, StackState, StackTransition, StackingEngine, StackingOutcome, TrackedImage,
    PINNED_CLASS,
};
pub use theme::{should_stay_dark, ThemeOutcome, ThemeSwitcher, DARK_CLASS};

/// Collaborators an effect works against
pub struct EffectCx<'a> {
    pub document: &'a mut dyn Document,
    pub registry: &'a mut TriggerRegistry,
    pub animator: &'a mut Animator,
    pub config: &'a StageConfig,
    pub selectors: &'a Selectors,
    pub device: DeviceClass,
    pub state: &'a SharedScrollState,
}

/// Parse a configured easing name, warning and falling back on error
pub fn ease_or(name: &str, fallback: Easing) -> Easing {
    match Easing::parse(name) {
        Ok(easing) => easing,
        Err(err) => {
            warn!(%err, name, "unknown easing, using fallback");
            fallback
        }
    }
}
