//! Image stacking
//!
//! Each `.image-wrap` inside the stack container pins when its centre meets
//! the viewport centre and stays pinned until the container's bottom passes
//! the end boundary. Pinned images pile up: the most recently pinned one is
//! on top, and each gets a small rotation sampled once per pass.
//!
//! Per-image state machine:
//!
//! ```text
//! unpinned --enter / enter-back--> pinned
//! pinned   --leave-back----------> unpinned
//! ```
//!
//! Leaving forward keeps the image pinned, so the pile survives scrolling
//! past the stack.

use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, trace};

use scrollstage_animation::{Animator, EaseDirection, Easing, TweenSpec};
use scrollstage_core::{
    props, query, query_all, Document, ElementId, RandomRotation, RotationSource, StackingConfig,
};
use scrollstage_scroll::{
    Anchor, BoundaryRule, Crossing, Offset, Subsystem, TriggerContext, TriggerSpec,
};

use crate::{ease_or, EffectCx};

/// Default class carried by pinned images, see `stacking.pinned_class`
pub const PINNED_CLASS: &str = "--pinned";

const PIN_STYLES: [&str; 3] = [props::TRANSFORM, props::ROTATION, props::Z_ORDER];

const PIN_EASE: Easing = Easing::Elastic {
    amplitude: 1.0,
    period: 0.5,
    direction: EaseDirection::Out,
};

/// Distance between the container's bottom and the viewport centre at which
/// the stack releases, also reserved as container padding
pub fn end_offset(viewport_height: f32, stack_offset: f32) -> f32 {
    viewport_height * stack_offset
}

/// Book-keeping for one stacked image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedImage {
    #[serde(skip)]
    pub element: ElementId,
    /// Document order within the stack
    pub index: usize,
    /// Degrees, sampled once per stacking pass
    pub assigned_rotation: f32,
    pub pinned: bool,
    /// Position from the top of the pile, newest is 0
    pub stack_order: Option<usize>,
}

/// Effect of a crossing on a single image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackTransition {
    Pinned,
    Unpinned,
}

/// Pin state of every image in the current stack
#[derive(Debug, Clone, Default)]
pub struct StackState {
    images: Vec<TrackedImage>,
    /// Pinned image indices, most recent first
    order: VecDeque<usize>,
}

impl StackState {
    pub fn new(images: Vec<TrackedImage>) -> Self {
        let mut state = Self {
            images,
            order: VecDeque::new(),
        };
        for image in &mut state.images {
            image.pinned = false;
            image.stack_order = None;
        }
        state
    }

    /// Apply a trigger crossing for image `index`
    pub fn on_crossing(&mut self, index: usize, crossing: Crossing) -> Option<StackTransition> {
        match crossing {
            Crossing::Enter | Crossing::EnterBack => self.pin(index).then_some(StackTransition::Pinned),
            Crossing::LeaveBack => self.unpin(index).then_some(StackTransition::Unpinned),
            Crossing::Leave => None,
        }
    }

    /// Pin an image; false when unknown or already pinned
    pub fn pin(&mut self, index: usize) -> bool {
        match self.images.get_mut(index) {
            Some(image) if !image.pinned => image.pinned = true,
            _ => return false,
        }
        self.order.push_front(index);
        self.reorder();
        true
    }

    /// Unpin an image; false when unknown or not pinned
    pub fn unpin(&mut self, index: usize) -> bool {
        match self.images.get_mut(index) {
            Some(image) if image.pinned => {
                image.pinned = false;
                image.stack_order = None;
            }
            _ => return false,
        }
        self.order.retain(|&i| i != index);
        self.reorder();
        true
    }

    fn reorder(&mut self) {
        for (position, &index) in self.order.iter().enumerate() {
            self.images[index].stack_order = Some(position);
        }
    }

    pub fn images(&self) -> &[TrackedImage] {
        &self.images
    }

    pub fn image(&self, index: usize) -> Option<&TrackedImage> {
        self.images.get(index)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn pinned_count(&self) -> usize {
        self.order.len()
    }

    pub fn stack_order(&self, index: usize) -> Option<usize> {
        self.images.get(index).and_then(|image| image.stack_order)
    }

    /// Whether the pinned images' orders are exactly `0..pinned_count`
    pub fn is_dense(&self) -> bool {
        let mut seen = vec![false; self.order.len()];
        for image in &self.images {
            match (image.pinned, image.stack_order) {
                (true, Some(order)) if order < seen.len() && !seen[order] => seen[order] = true,
                (false, None) => {}
                _ => return false,
            }
        }
        seen.into_iter().all(|s| s)
    }

    /// Write `z-order` for every image: newest on top, unpinned cleared
    fn write_z_order(&self, doc: &mut dyn Document) {
        let count = self.order.len();
        for image in &self.images {
            match image.stack_order {
                Some(order) => doc.set_style(image.element, props::Z_ORDER, (count - order) as f32),
                None => doc.clear_style(image.element, props::Z_ORDER),
            }
        }
    }
}

/// Result of a stacking pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "outcome")]
pub enum StackingOutcome {
    /// Mobile devices get no stacking
    SkippedMobile,
    /// The page has no stack
    NoImages,
    /// Triggers were created; a forced refresh is due after the settle delay
    Initialized { images: usize },
}

/// Builds the stacking triggers for the current page
pub struct StackingEngine {
    state: Rc<RefCell<StackState>>,
    rotation: Box<dyn RotationSource>,
    pinned_class: Rc<str>,
}

impl StackingEngine {
    pub fn new(rotation: Box<dyn RotationSource>) -> Self {
        Self {
            state: Rc::new(RefCell::new(StackState::default())),
            rotation,
            pinned_class: Rc::from(PINNED_CLASS),
        }
    }

    /// Seeded rotations when the config fixes a seed, fresh entropy otherwise
    pub fn from_config(config: &StackingConfig) -> Self {
        let rotation = match config.rotation_seed {
            Some(seed) => RandomRotation::seeded(seed),
            None => RandomRotation::new(),
        };
        Self::new(Box::new(rotation))
    }

    pub fn state(&self) -> Ref<'_, StackState> {
        self.state.borrow()
    }

    /// Class applied to pinned wraps by the current pass
    pub fn pinned_class(&self) -> &str {
        &self.pinned_class
    }

    /// Unpin everything without rebuilding
    ///
    /// Call after tearing down the stacking triggers when no pass follows.
    /// Wraps no longer in the document are skipped.
    pub fn reset(&mut self, doc: &mut dyn Document, animator: &mut Animator) {
        let state = std::mem::take(&mut *self.state.borrow_mut());
        let mut cleared = 0;
        for image in state.images() {
            animator.kill_tweens_of(image.element);
            if !doc.contains(image.element) {
                continue;
            }
            for property in PIN_STYLES {
                doc.clear_style(image.element, property);
            }
            doc.remove_class(image.element, &self.pinned_class);
            cleared += 1;
        }
        debug!(tracked = state.len(), cleared, "stacking reset");
    }

    /// Tear down the previous pass and build triggers for the current stack
    pub fn init(&mut self, cx: &mut EffectCx<'_>) -> StackingOutcome {
        if cx.device.is_mobile() {
            debug!("stacking skipped on mobile");
            return StackingOutcome::SkippedMobile;
        }

        cx.registry.teardown(cx.document, Subsystem::Stacking);
        *self.state.borrow_mut() = StackState::default();

        let wraps = query_all(cx.document, &cx.selectors.stack_item);
        let Some(container) = query(cx.document, &cx.selectors.stack_container) else {
            debug!("no stack container");
            return StackingOutcome::NoImages;
        };
        if wraps.is_empty() {
            debug!("stack container has no images");
            return StackingOutcome::NoImages;
        }

        let previous_class = std::mem::replace(
            &mut self.pinned_class,
            Rc::from(cx.config.stacking.pinned_class.as_str()),
        );
        cx.document.clear_style(container, props::PADDING_BOTTOM);
        for &wrap in &wraps {
            cx.animator.kill_tweens_of(wrap);
            for property in PIN_STYLES {
                cx.document.clear_style(wrap, property);
            }
            cx.document.remove_class(wrap, &previous_class);
            cx.document.remove_class(wrap, &self.pinned_class);
        }
        cx.registry.refresh(cx.document, cx.animator, false);

        let config = &cx.config.stacking;
        let pin_ease = ease_or(&config.pin_ease, PIN_EASE);
        let unpin_ease = ease_or(&cx.config.animation.ease, Easing::POWER4_OUT);
        let stack_offset = config.stack_offset;

        self.rotation.begin_pass();
        let images: Vec<TrackedImage> = wraps
            .iter()
            .enumerate()
            .map(|(index, &element)| TrackedImage {
                element,
                index,
                assigned_rotation: self.rotation.sample(config.rotation_range),
                pinned: false,
                stack_order: None,
            })
            .collect();
        *self.state.borrow_mut() = StackState::new(images.clone());

        for image in &images {
            let end = BoundaryRule::new(Anchor::BOTTOM, Anchor::CENTER)
                .target(container)
                .offset(Offset::computed(move |doc: &dyn Document| {
                    end_offset(doc.viewport_height(), stack_offset)
                }));
            let spec = TriggerSpec::new(Subsystem::Stacking, image.element)
                .start(BoundaryRule::new(Anchor::CENTER, Anchor::CENTER))
                .end(end)
                .pin()
                .scrub()
                .on_enter(self.pin_handler(image.index, config.pin_duration, pin_ease))
                .on_enter_back(self.pin_handler(image.index, config.pin_duration, pin_ease))
                .on_leave_back(self.unpin_handler(image.index, config.unpin_duration, unpin_ease));
            cx.registry.create(cx.document, spec);
        }

        let viewport_height = match cx.state.viewport_height() {
            height if height > 0.0 => height,
            _ => cx.document.viewport_height(),
        };
        let padding = end_offset(viewport_height, stack_offset);
        cx.document.set_style(container, props::PADDING_BOTTOM, padding);

        debug!(images = images.len(), padding, "stacking initialized");
        StackingOutcome::Initialized { images: images.len() }
    }

    fn pin_handler(
        &self,
        index: usize,
        duration: f32,
        easing: Easing,
    ) -> impl FnMut(&mut TriggerContext<'_>) + 'static {
        let state = Rc::clone(&self.state);
        let class = Rc::clone(&self.pinned_class);
        move |cx: &mut TriggerContext<'_>| {
            let mut state = state.borrow_mut();
            if !state.pin(index) {
                return;
            }
            let Some(rotation) = state.image(index).map(|image| image.assigned_rotation) else {
                return;
            };
            cx.animator.tween(
                cx.document,
                cx.element,
                TweenSpec::new(duration)
                    .from_to(props::ROTATION, 0.0, rotation)
                    .ease(easing),
            );
            cx.document.add_class(cx.element, &class);
            state.write_z_order(cx.document);
            trace!(index, rotation, pinned = state.pinned_count(), "image pinned");
        }
    }

    fn unpin_handler(
        &self,
        index: usize,
        duration: f32,
        easing: Easing,
    ) -> impl FnMut(&mut TriggerContext<'_>) + 'static {
        let state = Rc::clone(&self.state);
        let class = Rc::clone(&self.pinned_class);
        move |cx: &mut TriggerContext<'_>| {
            let mut state = state.borrow_mut();
            if !state.unpin(index) {
                return;
            }
            cx.animator.tween(
                cx.document,
                cx.element,
                TweenSpec::new(duration).to(props::ROTATION, 0.0).ease(easing),
            );
            cx.document.remove_class(cx.element, &class);
            state.write_z_order(cx.document);
            trace!(index, pinned = state.pinned_count(), "image unpinned");
        }
    }
}

impl fmt::Debug for StackingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackingEngine")
            .field("state", &self.state.borrow())
            .field("pinned_class", &self.pinned_class)
            .finish_non_exhaustive()
    }
}
