//! Page transitions
//!
//! A navigation moves through three phases:
//!
//! ```text
//! Idle --Navigate--> Leaving --LeaveComplete--> Entering --EnterComplete--> Idle
//! ```
//!
//! The leave phase plays the overlay/drawer timeline over the outgoing page
//! and only completes on that timeline's completion signal. The enter phase
//! swaps the page in, resets scroll and replays the page-enter animations;
//! observers are rebuilt strictly after those finish.

use serde::Serialize;
use tracing::{debug, info, warn};

use scrollstage_animation::{Easing, Position, Timeline, TweenSpec};
use scrollstage_core::{props, query_all, AnimationConfig, Document, OverlapPolicy, Selectors};
use scrollstage_effects::ease_or;

/// Phase of the current navigation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionPhase {
    #[default]
    Idle,
    Leaving,
    Entering,
}

/// Inputs that move a navigation between phases
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionInput {
    Navigate,
    LeaveComplete,
    EnterComplete,
    /// The incoming page could not be mounted
    Abort,
}

impl TransitionPhase {
    /// Next phase for an input, or `None` when the input is ignored
    ///
    /// `Navigate` outside `Idle` restarts the leave phase; whether that is
    /// allowed is up to the overlap policy.
    pub fn on_event(&self, input: TransitionInput) -> Option<Self> {
        match (self, input) {
            (_, TransitionInput::Navigate) => Some(TransitionPhase::Leaving),
            (TransitionPhase::Leaving, TransitionInput::LeaveComplete) => {
                Some(TransitionPhase::Entering)
            }
            (TransitionPhase::Entering, TransitionInput::EnterComplete) => {
                Some(TransitionPhase::Idle)
            }
            (TransitionPhase::Leaving | TransitionPhase::Entering, TransitionInput::Abort) => {
                Some(TransitionPhase::Idle)
            }
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TransitionPhase::Idle)
    }
}

/// Answer to a navigation request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "outcome")]
pub enum NavigationOutcome {
    Started { generation: u64 },
    /// Started after abandoning the navigation in flight
    Superseded { generation: u64 },
    /// Refused because another navigation is in flight
    Refused,
    /// Refused because the stage has not finished booting
    NotReady,
}

impl NavigationOutcome {
    pub fn is_started(&self) -> bool {
        matches!(
            self,
            NavigationOutcome::Started { .. } | NavigationOutcome::Superseded { .. }
        )
    }
}

/// Counters reported by the controller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TransitionStats {
    pub started: u32,
    pub completed: u32,
    pub refused: u32,
    pub superseded: u32,
    pub aborted: u32,
}

/// Navigation phase tracking under an overlap policy
#[derive(Debug, Clone, Default)]
pub struct TransitionController {
    phase: TransitionPhase,
    policy: OverlapPolicy,
    stats: TransitionStats,
}

/// What the stage should do with a navigation request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Start,
    Supersede,
    Refuse,
}

impl TransitionController {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn stats(&self) -> TransitionStats {
        self.stats
    }

    fn transition(&mut self, input: TransitionInput) -> bool {
        match self.phase.on_event(input) {
            Some(next) => {
                debug!(from = ?self.phase, to = ?next, ?input, "transition phase");
                self.phase = next;
                true
            }
            None => false,
        }
    }

    /// Decide on a navigation request and enter the leave phase if admitted
    pub fn request(&mut self, path: &str) -> Admission {
        let admission = match (self.phase, self.policy) {
            (TransitionPhase::Idle, _) => Admission::Start,
            (_, OverlapPolicy::Supersede) => Admission::Supersede,
            (_, OverlapPolicy::Ignore) => Admission::Refuse,
        };
        match admission {
            Admission::Refuse => {
                warn!(path, phase = ?self.phase, "navigation refused while another is in flight");
                self.stats.refused += 1;
            }
            Admission::Supersede => {
                info!(path, phase = ?self.phase, "navigation supersedes the one in flight");
                self.stats.superseded += 1;
                self.stats.started += 1;
                self.transition(TransitionInput::Navigate);
            }
            Admission::Start => {
                info!(path, "navigation started");
                self.stats.started += 1;
                self.transition(TransitionInput::Navigate);
            }
        }
        admission
    }

    pub fn leave_complete(&mut self) -> bool {
        self.transition(TransitionInput::LeaveComplete)
    }

    pub fn enter_complete(&mut self) -> bool {
        let done = self.transition(TransitionInput::EnterComplete);
        if done {
            self.stats.completed += 1;
        }
        done
    }

    pub fn abort(&mut self) -> bool {
        let aborted = self.transition(TransitionInput::Abort);
        if aborted {
            self.stats.aborted += 1;
        }
        aborted
    }
}

/// Overlay fades in, the outgoing page shrinks and rounds its corners and
/// the drawer slides up, all in parallel
pub fn leave_timeline(doc: &dyn Document, selectors: &Selectors, config: &AnimationConfig) -> Timeline {
    let ease = ease_or(&config.ease, Easing::POWER4_OUT);
    let overlay = query_all(doc, &selectors.overlay);
    let drawer = query_all(doc, &selectors.drawer);
    let container: Vec<_> = doc.container().into_iter().collect();

    let mut tl = Timeline::new();
    tl.to(
        &overlay,
        TweenSpec::new(config.dur).to(props::OPACITY, 0.8).ease(ease),
        Position::End,
    )
    .to(
        &container,
        TweenSpec::new(config.dur)
            .to(props::SCALE, config.scale_amount)
            .to(props::BORDER_RADIUS, config.border_radius)
            .ease(ease),
        Position::PreviousStart(0.0),
    )
    .to(
        &drawer,
        TweenSpec::new(config.dur).to(props::Y_PERCENT, 0.0).ease(ease),
        Position::PreviousStart(0.0),
    );
    tl
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollstage_animation::{Animator, AnimatorEvent};
    use scrollstage_core::{MemoryDocument, NodeSpec, PageSpec, StageConfig};

    #[test]
    fn test_phase_transitions() {
        let phase = TransitionPhase::Idle;
        assert_eq!(phase.on_event(TransitionInput::LeaveComplete), None);
        let phase = phase.on_event(TransitionInput::Navigate).unwrap();
        assert_eq!(phase, TransitionPhase::Leaving);
        assert_eq!(phase.on_event(TransitionInput::EnterComplete), None);
        let phase = phase.on_event(TransitionInput::LeaveComplete).unwrap();
        assert_eq!(phase, TransitionPhase::Entering);
        assert_eq!(
            phase.on_event(TransitionInput::EnterComplete),
            Some(TransitionPhase::Idle)
        );
        assert_eq!(TransitionPhase::Idle.on_event(TransitionInput::Abort), None);
    }

    #[test]
    fn test_ignore_policy_refuses_overlap() {
        let mut controller = TransitionController::new(OverlapPolicy::Ignore);
        assert_eq!(controller.request("/a"), Admission::Start);
        assert_eq!(controller.request("/b"), Admission::Refuse);
        assert_eq!(controller.phase(), TransitionPhase::Leaving);
        assert_eq!(controller.stats().refused, 1);

        controller.leave_complete();
        controller.enter_complete();
        assert!(controller.phase().is_idle());
        assert_eq!(controller.request("/b"), Admission::Start);
    }

    #[test]
    fn test_supersede_policy_restarts_leave() {
        let mut controller = TransitionController::new(OverlapPolicy::Supersede);
        controller.request("/a");
        controller.leave_complete();
        assert_eq!(controller.request("/b"), Admission::Supersede);
        assert_eq!(controller.phase(), TransitionPhase::Leaving);
        assert_eq!(controller.stats().superseded, 1);
    }

    #[test]
    fn test_leave_timeline_runs_in_parallel() {
        let config = StageConfig::default();
        let selectors = config.selectors.compile().unwrap();
        let mut doc = MemoryDocument::new(1280.0, 800.0).with_chrome([
            NodeSpec::div().class("overlay"),
            NodeSpec::div().class("white-drawer"),
        ]);
        let page = doc.mount_page(&PageSpec::new("/")).unwrap();

        let tl = leave_timeline(&doc, &selectors, &config.animation);
        assert!((tl.duration() - config.animation.dur).abs() < 1e-6);
        assert_eq!(tl.len(), 3);

        let mut animator = Animator::new();
        let id = animator.play(&mut doc, tl);
        let events = animator.tick(&mut doc, 1.0);
        assert_eq!(events, vec![AnimatorEvent::TimelineComplete(id)]);
        assert_eq!(doc.style(page, props::SCALE), Some(0.95));
        assert_eq!(doc.style(page, props::BORDER_RADIUS), Some(12.0));
    }
}
