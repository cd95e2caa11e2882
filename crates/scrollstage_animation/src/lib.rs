//! Scrollstage Animation
//!
//! Tween and timeline playback over a [`Document`](scrollstage_core::Document).
//!
//! # Features
//!
//! - **Easing**: power, sine, expo, back and elastic curves, parsed from names
//!   like `power4.out` or `elastic.out(1, 0.5)`
//! - **Tweens**: multi-property tweens with delay, stagger and `auto` height
//! - **Timelines**: labels, relative positions and markers
//! - **Animator**: a tick-driven scheduler with property-level overwrite
//!
//! # Example
//!
//! ```rust
//! use scrollstage_animation::{Animator, AnimatorEvent, Position, Timeline, TweenSpec};
//! use scrollstage_core::{props, Document, MemoryDocument, NodeSpec};
//!
//! let mut doc = MemoryDocument::new(1280.0, 800.0);
//! let body = doc.body();
//! let el = doc.append(body, &NodeSpec::div().height(200.0)).unwrap();
//!
//! let mut tl = Timeline::new();
//! tl.to(&[el], TweenSpec::new(0.5).from_to(props::OPACITY, 0.0, 1.0), Position::End);
//!
//! let mut animator = Animator::new();
//! let id = animator.play(&mut doc, tl);
//! let events = animator.tick(&mut doc, 1.0);
//! assert_eq!(events, vec![AnimatorEvent::TimelineComplete(id)]);
//! assert_eq!(doc.style(el, props::OPACITY), Some(1.0));
//! ```

pub mod animator;
pub mod easing;
pub mod error;
pub mod timeline;
pub mod tween;

pub use animator::{Animator, AnimatorEvent, TimelineId, TweenId};
pub use easing::{EaseDirection, Easing};
pub use error::{AnimationError, EasingError};
pub use timeline::{Position, Timeline};
pub use tween::{resting_value, PropertyTween, TweenSpec, TweenValue};
