//! Scroll trigger registry
//!
//! A trigger watches one element and fires callbacks as the scroll position
//! crosses its start and end boundaries:
//!
//! ```text
//!            start                     end
//!   Before ────┼──────── Active ────────┼──── After
//!          on_enter ─▶              on_leave ─▶
//!       ◀─ on_leave_back          ◀─ on_enter_back
//! ```
//!
//! Boundaries are measured from layout when the trigger is created and on
//! every [`refresh`](TriggerRegistry::refresh). Triggers are tagged with the
//! [`Subsystem`] that owns them so each subsystem can tear down its own
//! triggers before rebuilding them.
//!
//! The registry reads the scroll position through a [`ScrollerProxy`] when
//! one is installed (the smooth scroll emulator on desktop), otherwise from
//! the document's native scroll offset.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, multispace0, multispace1, one_of},
    combinator::{all_consuming, map, opt, value},
    number::complete::float,
    sequence::{delimited, pair, terminated, tuple},
    IResult,
};
use serde::Serialize;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use tracing::{debug, trace};

use scrollstage_animation::Animator;
use scrollstage_core::{props, Document, ElementId};

use crate::error::ScrollError;

new_key_type! {
    /// Handle to a registered trigger
    pub struct TriggerId;
}

/// Owner of a group of triggers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Subsystem {
    Stacking,
    Theme,
    Page,
}

/// Source of the scroll position when smooth scrolling is active
pub trait ScrollerProxy {
    fn scroll_top(&self) -> f32;

    /// Request a scroll to `value`
    fn set_scroll_top(&self, value: f32);
}

// ============================================================================
// Boundaries
// ============================================================================

/// A point along an element or the viewport
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Anchor {
    /// Fraction of the size: 0 top, 0.5 center, 1 bottom
    Fraction(f32),
    /// Pixels from the top
    Px(f32),
}

impl Anchor {
    pub const TOP: Anchor = Anchor::Fraction(0.0);
    pub const CENTER: Anchor = Anchor::Fraction(0.5);
    pub const BOTTOM: Anchor = Anchor::Fraction(1.0);

    pub fn resolve(&self, size: f32) -> f32 {
        match *self {
            Anchor::Fraction(fraction) => size * fraction,
            Anchor::Px(px) => px,
        }
    }
}

/// Viewport offset of a boundary, in pixels
#[derive(Clone)]
pub enum Offset {
    Px(f32),
    /// Recomputed on forced refreshes
    Computed(Rc<dyn Fn(&dyn Document) -> f32>),
}

impl Offset {
    pub fn computed(f: impl Fn(&dyn Document) -> f32 + 'static) -> Self {
        Offset::Computed(Rc::new(f))
    }
}

impl fmt::Debug for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Px(px) => f.debug_tuple("Px").field(px).finish(),
            Offset::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Where a boundary sits: "element anchor meets viewport anchor"
///
/// The scroll offset of the boundary is
/// `element_top + element_anchor + element_offset - (viewport_anchor + offset)`.
#[derive(Clone, Debug)]
pub struct BoundaryRule {
    pub element_anchor: Anchor,
    pub element_offset: f32,
    pub viewport_anchor: Anchor,
    pub offset: Offset,
    /// Measure against this element instead of the trigger element
    pub target: Option<ElementId>,
}

impl BoundaryRule {
    pub fn new(element_anchor: Anchor, viewport_anchor: Anchor) -> Self {
        Self {
            element_anchor,
            element_offset: 0.0,
            viewport_anchor,
            offset: Offset::Px(0.0),
            target: None,
        }
    }

    /// Parse rules like `top 50%`, `center center` or `bottom center+=400`
    pub fn parse(input: &str) -> Result<Self, ScrollError> {
        all_consuming(delimited(multispace0, rule, multispace0))(input)
            .map(|(_, rule)| rule)
            .map_err(|_| ScrollError::Boundary(input.to_string()))
    }

    pub fn offset(mut self, offset: Offset) -> Self {
        self.offset = offset;
        self
    }

    pub fn target(mut self, el: ElementId) -> Self {
        self.target = Some(el);
        self
    }

    /// Resolve to a scroll offset
    ///
    /// Computed offsets are evaluated when `force` is set or nothing is
    /// cached yet.
    fn resolve(
        &self,
        doc: &dyn Document,
        trigger: ElementId,
        cached: &mut Option<f32>,
        force: bool,
    ) -> Option<f32> {
        let rect = doc.rect(self.target.unwrap_or(trigger))?;
        let offset = match &self.offset {
            Offset::Px(px) => *px,
            Offset::Computed(f) => match *cached {
                Some(value) if !force => value,
                _ => {
                    let value = f(doc);
                    *cached = Some(value);
                    value
                }
            },
        };
        Some(
            rect.top + self.element_anchor.resolve(rect.height) + self.element_offset
                - (self.viewport_anchor.resolve(doc.viewport_height()) + offset),
        )
    }
}

impl FromStr for BoundaryRule {
    type Err = ScrollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn keyword(input: &str) -> IResult<&str, Anchor> {
    alt((
        value(Anchor::TOP, tag("top")),
        value(Anchor::CENTER, tag("center")),
        value(Anchor::BOTTOM, tag("bottom")),
    ))(input)
}

fn anchor(input: &str) -> IResult<&str, Anchor> {
    alt((
        keyword,
        map(terminated(float, char('%')), |pct| Anchor::Fraction(pct / 100.0)),
        map(terminated(float, opt(tag("px"))), Anchor::Px),
    ))(input)
}

/// `+=x` / `-=x`
fn relative(input: &str) -> IResult<&str, f32> {
    map(
        tuple((one_of("+-"), char('='), float, opt(tag("px")))),
        |(sign, _, value, _)| if sign == '-' { -value } else { value },
    )(input)
}

fn rule(input: &str) -> IResult<&str, BoundaryRule> {
    map(
        tuple((
            pair(anchor, opt(relative)),
            multispace1,
            pair(anchor, opt(relative)),
        )),
        |((element_anchor, element_offset), _, (viewport_anchor, offset))| BoundaryRule {
            element_anchor,
            element_offset: element_offset.unwrap_or_default(),
            viewport_anchor,
            offset: Offset::Px(offset.unwrap_or_default()),
            target: None,
        },
    )(input)
}

// ============================================================================
// Trigger state
// ============================================================================

/// Position of the scroll relative to a trigger's range
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerState {
    #[default]
    Before,
    Active,
    After,
}

/// A boundary crossing, named after the callback it fires
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Crossing {
    Enter,
    Leave,
    EnterBack,
    LeaveBack,
}

impl TriggerState {
    /// State for `scroll` within `[start, end]`
    pub fn at(scroll: f32, start: f32, end: f32) -> Self {
        if scroll <= start {
            TriggerState::Before
        } else if scroll >= end {
            TriggerState::After
        } else {
            TriggerState::Active
        }
    }

    /// Crossings implied by moving to `next`, in firing order
    ///
    /// Jumping over the whole range fires both crossings.
    pub fn crossings(self, next: TriggerState) -> &'static [Crossing] {
        use TriggerState::*;
        match (self, next) {
            (Before, Active) => &[Crossing::Enter],
            (Before, After) => &[Crossing::Enter, Crossing::Leave],
            (Active, After) => &[Crossing::Leave],
            (After, Active) => &[Crossing::EnterBack],
            (After, Before) => &[Crossing::EnterBack, Crossing::LeaveBack],
            (Active, Before) => &[Crossing::LeaveBack],
            _ => &[],
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TriggerState::Active)
    }
}

/// Direction of the scroll movement that caused an update
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScrollDirection {
    #[default]
    Forward,
    Backward,
}

// ============================================================================
// Callbacks
// ============================================================================

/// What a trigger callback can reach
pub struct TriggerContext<'a> {
    pub document: &'a mut dyn Document,
    pub animator: &'a mut Animator,
    pub trigger: TriggerId,
    pub element: ElementId,
    /// Progress through the range, in `[0, 1]`
    pub progress: f32,
    pub direction: ScrollDirection,
}

pub type TriggerCallback = Box<dyn FnMut(&mut TriggerContext<'_>)>;

#[derive(Default)]
struct TriggerCallbacks {
    on_enter: Option<TriggerCallback>,
    on_leave: Option<TriggerCallback>,
    on_enter_back: Option<TriggerCallback>,
    on_leave_back: Option<TriggerCallback>,
    on_update: Option<TriggerCallback>,
}

impl TriggerCallbacks {
    fn for_crossing(&mut self, crossing: Crossing) -> Option<&mut TriggerCallback> {
        match crossing {
            Crossing::Enter => self.on_enter.as_mut(),
            Crossing::Leave => self.on_leave.as_mut(),
            Crossing::EnterBack => self.on_enter_back.as_mut(),
            Crossing::LeaveBack => self.on_leave_back.as_mut(),
        }
    }
}

/// Everything needed to create a trigger
pub struct TriggerSpec {
    subsystem: Subsystem,
    element: ElementId,
    start: BoundaryRule,
    end: BoundaryRule,
    pin: bool,
    scrub: bool,
    callbacks: TriggerCallbacks,
}

impl TriggerSpec {
    /// A trigger on `element`, active from `top bottom` to `bottom top`
    pub fn new(subsystem: Subsystem, element: ElementId) -> Self {
        Self {
            subsystem,
            element,
            start: BoundaryRule::new(Anchor::TOP, Anchor::BOTTOM),
            end: BoundaryRule::new(Anchor::BOTTOM, Anchor::TOP),
            pin: false,
            scrub: false,
            callbacks: TriggerCallbacks::default(),
        }
    }

    pub fn start(mut self, rule: BoundaryRule) -> Self {
        self.start = rule;
        self
    }

    pub fn end(mut self, rule: BoundaryRule) -> Self {
        self.end = rule;
        self
    }

    /// Hold the element in place while active
    pub fn pin(mut self) -> Self {
        self.pin = true;
        self
    }

    /// Report progress to the element's `scroll-progress` style
    pub fn scrub(mut self) -> Self {
        self.scrub = true;
        self
    }

    pub fn on_enter(mut self, f: impl FnMut(&mut TriggerContext<'_>) + 'static) -> Self {
        self.callbacks.on_enter = Some(Box::new(f));
        self
    }

    pub fn on_leave(mut self, f: impl FnMut(&mut TriggerContext<'_>) + 'static) -> Self {
        self.callbacks.on_leave = Some(Box::new(f));
        self
    }

    pub fn on_enter_back(mut self, f: impl FnMut(&mut TriggerContext<'_>) + 'static) -> Self {
        self.callbacks.on_enter_back = Some(Box::new(f));
        self
    }

    pub fn on_leave_back(mut self, f: impl FnMut(&mut TriggerContext<'_>) + 'static) -> Self {
        self.callbacks.on_leave_back = Some(Box::new(f));
        self
    }

    /// Called whenever progress changes
    pub fn on_update(mut self, f: impl FnMut(&mut TriggerContext<'_>) + 'static) -> Self {
        self.callbacks.on_update = Some(Box::new(f));
        self
    }
}

struct Trigger {
    subsystem: Subsystem,
    element: ElementId,
    start_rule: BoundaryRule,
    end_rule: BoundaryRule,
    pin: bool,
    scrub: bool,
    callbacks: TriggerCallbacks,
    start: f32,
    end: f32,
    start_offset: Option<f32>,
    end_offset: Option<f32>,
    measured: bool,
    state: TriggerState,
    progress: f32,
    pin_offset: Option<f32>,
}

impl Trigger {
    fn measure(&mut self, doc: &dyn Document, force: bool) -> bool {
        let start = self
            .start_rule
            .resolve(doc, self.element, &mut self.start_offset, force);
        let end = self
            .end_rule
            .resolve(doc, self.element, &mut self.end_offset, force);
        match (start, end) {
            (Some(start), Some(end)) => {
                self.start = start;
                self.end = end.max(start);
                self.measured = true;
            }
            _ => self.measured = false,
        }
        self.measured
    }

    fn progress_at(&self, scroll: f32) -> f32 {
        let span = self.end - self.start;
        if span <= 0.0 {
            if scroll > self.start {
                1.0
            } else {
                0.0
            }
        } else {
            ((scroll - self.start) / span).clamp(0.0, 1.0)
        }
    }

    fn revert(&self, doc: &mut dyn Document) {
        if self.pin && self.pin_offset.is_some() {
            doc.clear_style(self.element, props::TRANSLATE_Y);
        }
        if self.scrub {
            doc.clear_style(self.element, props::SCROLL_PROGRESS);
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Counters for diagnostics and tests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub created: u32,
    pub destroyed: u32,
    pub refreshes: u32,
    pub forced_refreshes: u32,
    pub callbacks_fired: u32,
}

/// All live scroll triggers
#[derive(Default)]
pub struct TriggerRegistry {
    triggers: SlotMap<TriggerId, Trigger>,
    /// Creation order
    order: Vec<TriggerId>,
    proxy: Option<Rc<dyn ScrollerProxy>>,
    last_scroll: Option<f32>,
    stats: RegistryStats,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route scroll reads and writes through `proxy`
    pub fn set_scroller_proxy(&mut self, proxy: Option<Rc<dyn ScrollerProxy>>) {
        self.proxy = proxy;
    }

    pub fn has_scroller_proxy(&self) -> bool {
        self.proxy.is_some()
    }

    /// Scroll position the triggers are evaluated against
    pub fn scroll_position(&self, doc: &dyn Document) -> f32 {
        match &self.proxy {
            Some(proxy) => proxy.scroll_top(),
            None => doc.scroll_y(),
        }
    }

    /// Scroll the page, through the proxy when one is installed
    pub fn scroll_to(&self, doc: &mut dyn Document, offset: f32) {
        match &self.proxy {
            Some(proxy) => proxy.set_scroll_top(offset),
            None => doc.set_scroll_y(offset),
        }
    }

    /// Register a trigger; `None` when its element is not in the document
    ///
    /// Boundaries are measured right away. Callbacks fire from the next
    /// [`update`](Self::update) or [`refresh`](Self::refresh).
    pub fn create(&mut self, doc: &dyn Document, spec: TriggerSpec) -> Option<TriggerId> {
        if !doc.contains(spec.element) {
            debug!(subsystem = ?spec.subsystem, "trigger element missing, skipped");
            return None;
        }

        let mut trigger = Trigger {
            subsystem: spec.subsystem,
            element: spec.element,
            start_rule: spec.start,
            end_rule: spec.end,
            pin: spec.pin,
            scrub: spec.scrub,
            callbacks: spec.callbacks,
            start: 0.0,
            end: 0.0,
            start_offset: None,
            end_offset: None,
            measured: false,
            state: TriggerState::Before,
            progress: 0.0,
            pin_offset: None,
        };
        if !trigger.measure(doc, true) {
            debug!(subsystem = ?spec.subsystem, "trigger boundary element missing, skipped");
            return None;
        }

        let (start, end) = (trigger.start, trigger.end);
        let id = self.triggers.insert(trigger);
        self.order.push(id);
        self.stats.created += 1;
        trace!(?id, subsystem = ?spec.subsystem, start, end, "trigger created");
        Some(id)
    }

    /// Destroy the triggers owned by `subsystem`, reverting pins
    pub fn teardown(&mut self, doc: &mut dyn Document, subsystem: Subsystem) -> usize {
        self.destroy_where(doc, |trigger| trigger.subsystem == subsystem)
    }

    /// Destroy every trigger; safe to call repeatedly
    pub fn teardown_all(&mut self, doc: &mut dyn Document) -> usize {
        self.destroy_where(doc, |_| true)
    }

    fn destroy_where(&mut self, doc: &mut dyn Document, mut predicate: impl FnMut(&Trigger) -> bool) -> usize {
        let doomed: Vec<TriggerId> = self
            .order
            .iter()
            .copied()
            .filter(|id| self.triggers.get(*id).is_some_and(&mut predicate))
            .collect();
        for id in &doomed {
            if let Some(trigger) = self.triggers.remove(*id) {
                if doc.contains(trigger.element) {
                    trigger.revert(doc);
                }
            }
        }
        self.order.retain(|id| self.triggers.contains_key(*id));
        self.stats.destroyed += doomed.len() as u32;
        if !doomed.is_empty() {
            debug!(count = doomed.len(), remaining = self.order.len(), "triggers destroyed");
        }
        doomed.len()
    }

    /// Re-measure every trigger, then reconcile against the current position
    ///
    /// A forced refresh also re-evaluates computed offsets.
    pub fn refresh(&mut self, doc: &mut dyn Document, animator: &mut Animator, force: bool) {
        self.stats.refreshes += 1;
        if force {
            self.stats.forced_refreshes += 1;
        }
        for trigger in self.triggers.values_mut() {
            trigger.measure(doc, force);
        }
        debug!(triggers = self.order.len(), force, "triggers refreshed");
        self.update(doc, animator);
    }

    /// Evaluate every trigger at the current scroll position
    pub fn update(&mut self, doc: &mut dyn Document, animator: &mut Animator) {
        let scroll = self.scroll_position(doc);
        let direction = match self.last_scroll {
            Some(previous) if scroll < previous => ScrollDirection::Backward,
            _ => ScrollDirection::Forward,
        };
        self.last_scroll = Some(scroll);

        let ordered: SmallVec<[TriggerId; 16]> = match direction {
            ScrollDirection::Forward => self.order.iter().copied().collect(),
            ScrollDirection::Backward => self.order.iter().rev().copied().collect(),
        };

        for id in ordered {
            let Some(trigger) = self.triggers.get_mut(id) else {
                continue;
            };
            if !trigger.measured || !doc.contains(trigger.element) {
                continue;
            }

            let next = TriggerState::at(scroll, trigger.start, trigger.end);
            let crossings = trigger.state.crossings(next);
            trigger.state = next;
            let progress = trigger.progress_at(scroll);
            let progress_changed = progress != trigger.progress;
            trigger.progress = progress;

            let element = trigger.element;
            let mut cx = TriggerContext {
                document: &mut *doc,
                animator: &mut *animator,
                trigger: id,
                element,
                progress,
                direction,
            };

            for &crossing in crossings {
                if let Some(callback) = trigger.callbacks.for_crossing(crossing) {
                    trace!(?id, ?crossing, scroll, "trigger crossing");
                    callback(&mut cx);
                    self.stats.callbacks_fired += 1;
                }
            }

            if progress_changed {
                if trigger.scrub {
                    cx.document.set_style(element, props::SCROLL_PROGRESS, progress);
                }
                if let Some(callback) = trigger.callbacks.on_update.as_mut() {
                    callback(&mut cx);
                }
            }

            if trigger.pin {
                let offset = (scroll - trigger.start).clamp(0.0, trigger.end - trigger.start);
                if trigger.pin_offset != Some(offset) {
                    cx.document.set_style(element, props::TRANSLATE_Y, offset);
                    trigger.pin_offset = Some(offset);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of triggers owned by `subsystem`
    pub fn count(&self, subsystem: Subsystem) -> usize {
        self.triggers
            .values()
            .filter(|t| t.subsystem == subsystem)
            .count()
    }

    /// Triggers owned by `subsystem`, in creation order
    pub fn ids(&self, subsystem: Subsystem) -> Vec<TriggerId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.triggers.get(*id).is_some_and(|t| t.subsystem == subsystem))
            .collect()
    }

    /// Measured `(start, end)` scroll offsets
    pub fn bounds(&self, id: TriggerId) -> Option<(f32, f32)> {
        self.triggers.get(id).map(|t| (t.start, t.end))
    }

    pub fn state(&self, id: TriggerId) -> Option<TriggerState> {
        self.triggers.get(id).map(|t| t.state)
    }

    pub fn element(&self, id: TriggerId) -> Option<ElementId> {
        self.triggers.get(id).map(|t| t.element)
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats
    }
}

impl fmt::Debug for TriggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerRegistry")
            .field("triggers", &self.order.len())
            .field("proxy", &self.proxy.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}
