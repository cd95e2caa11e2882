//! Scrollstage Core
//!
//! Foundational pieces shared by the scroll effects and page transitions:
//!
//! - **Device Classification**: desktop vs mobile from the user agent
//! - **Document Model**: the [`Document`] trait hosts implement, plus a
//!   headless [`MemoryDocument`] with block-flow layout
//! - **Selectors**: the CSS subset used to find markers and wrappers
//! - **Configuration**: [`StageConfig`], loadable from TOML
//! - **Global State**: dark mode, smooth scroll and viewport height
//! - **Rotation Sources**: injectable randomness for the stacking effect
//!
//! # Example
//!
//! ```rust
//! use scrollstage_core::{query_all, Document, MemoryDocument, NodeSpec, PageSpec, Selector};
//!
//! let mut doc = MemoryDocument::new(1280.0, 800.0);
//! doc.mount_page(
//!     &PageSpec::new("/").node(NodeSpec::div().class("images-stack").children([
//!         NodeSpec::div().class("image-wrap").height(300.0),
//!         NodeSpec::div().class("image-wrap").height(300.0),
//!     ])),
//! )
//! .unwrap();
//!
//! let wraps = query_all(&doc, &Selector::parse(".images-stack .image-wrap").unwrap());
//! assert_eq!(wraps.len(), 2);
//! assert_eq!(doc.rect(wraps[1]).unwrap().top, 300.0);
//! ```

pub mod config;
pub mod device;
pub mod document;
pub mod error;
pub mod memory;
pub mod page;
pub mod rotation;
pub mod selector;
pub mod state;
pub mod text;

pub use config::{
    AnimationConfig, NavigationConfig, OverlapPolicy, ScrollConfig, SelectorConfig, Selectors,
    StackingConfig, StageConfig, TimingConfig,
};
pub use device::{DeviceClass, Environment};
pub use document::{props, query, query_all, query_within, Document, ElementId, Rect};
pub use error::{ConfigError, CoreError, Result, SelectorError};
pub use memory::MemoryDocument;
pub use page::{ImageSpec, NodeSpec, PageSpec};
pub use rotation::{FixedRotations, RandomRotation, RotationSource};
pub use selector::Selector;
pub use state::{GlobalScrollState, SharedScrollState};
pub use text::{split_chars, CHAR_CLASS};
