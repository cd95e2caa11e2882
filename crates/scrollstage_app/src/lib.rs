//! Scrollstage App
//!
//! The stage lifecycle on top of the scroll effects:
//!
//! - **Stage**: boot, frame loop, debounced resize and observer rebuilds
//! - **Transitions**: leave/enter choreography with an overlap policy
//! - **Page Enter**: fade, height and per-character hero reveals
//! - **Loader**: the boot counter
//!
//! # Example
//!
//! ```rust
//! use scrollstage_app::Stage;
//! use scrollstage_core::{Document, Environment, MemoryDocument, NodeSpec, PageSpec, StageConfig};
//!
//! let mut doc = MemoryDocument::new(1280.0, 800.0);
//! doc.mount_page(&PageSpec::new("/").node(NodeSpec::div().height(2400.0))).unwrap();
//!
//! let mut stage = Stage::new(doc, StageConfig::default(), &Environment::default()).unwrap();
//! stage.boot();
//! stage.run_until_settled(1.0 / 60.0, 600);
//! assert!(stage.is_booted());
//! ```

pub mod enter;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod report;
pub mod stage;
pub mod transition;

pub use enter::{page_enter_timeline, READY_CLASS, RESIZE_MARKER};
pub use error::{Result, StageError};
pub use loader::{loader_timeline, Loader};
pub use pipeline::{Pipeline, Step};
pub use report::{StageReport, TriggerCounts};
pub use stage::Stage;
pub use transition::{
    leave_timeline, Admission, NavigationOutcome, TransitionController, TransitionInput,
    TransitionPhase, TransitionStats,
};
