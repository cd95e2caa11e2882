//! Boot loader
//!
//! A percentage counter climbs 0 → 30 → 60 → 90 → 100, then the loader
//! collapses while the counter shrinks and fades. The counter value is
//! tweened as a style property of the number element and mirrored into its
//! text every frame.

use tracing::{debug, warn};

use scrollstage_animation::{Animator, Easing, Position, Timeline, TimelineId, TweenSpec};
use scrollstage_core::{props, query, AnimationConfig, Document, ElementId, Selectors};
use scrollstage_effects::ease_or;

/// Style property carrying the counter value
pub const PROGRESS: &str = "loader-progress";

const STEPS: [(f32, f32); 4] = [(30.0, 0.5), (60.0, 1.0), (90.0, 1.5), (100.0, 0.3)];

/// A running loader
#[derive(Debug, Clone)]
pub struct Loader {
    timeline: TimelineId,
    number: Option<ElementId>,
    shown: Option<i32>,
}

impl Loader {
    /// Start the loader, or `None` when the page has none
    pub fn start(
        doc: &mut dyn Document,
        animator: &mut Animator,
        selectors: &Selectors,
        config: &AnimationConfig,
    ) -> Option<Self> {
        let Some(loader) = query(doc, &selectors.loader) else {
            debug!("no loader on the page");
            return None;
        };
        let number = query(doc, &selectors.loader_number);
        let timeline = loader_timeline(loader, number, config);
        let duration = timeline.duration();
        let timeline = animator.play(doc, timeline);
        debug!(duration, "loader started");

        let mut running = Self {
            timeline,
            number,
            shown: None,
        };
        running.sync(doc);
        Some(running)
    }

    pub fn timeline(&self) -> TimelineId {
        self.timeline
    }

    /// Last value written to the counter
    pub fn shown(&self) -> Option<i32> {
        self.shown
    }

    /// Mirror the counter value into the number's text
    pub fn sync(&mut self, doc: &mut dyn Document) {
        let Some(number) = self.number else {
            return;
        };
        let value = doc.style(number, PROGRESS).unwrap_or(0.0).round() as i32;
        if self.shown == Some(value) {
            return;
        }
        match doc.set_text(number, &value.to_string()) {
            Ok(()) => self.shown = Some(value),
            Err(err) => {
                warn!(%err, "loader number detached");
                self.number = None;
            }
        }
    }
}

/// Counter steps, then the `fadeOut` label where the loader collapses and
/// the number shrinks away in parallel
pub fn loader_timeline(loader: ElementId, number: Option<ElementId>, config: &AnimationConfig) -> Timeline {
    let ease = ease_or(&config.ease, Easing::POWER4_OUT);
    let number: Vec<ElementId> = number.into_iter().collect();

    let mut tl = Timeline::new();
    tl.set(&number, &[(PROGRESS, 0.0)], Position::End);
    for (value, duration) in STEPS {
        tl.to(&number, TweenSpec::new(duration).to(PROGRESS, value).ease(ease), Position::End);
    }
    let counted: f32 = STEPS.iter().map(|(_, duration)| duration).sum();
    tl.add_label("fadeOut", Position::Absolute(counted));
    tl.to(
        &[loader],
        TweenSpec::new(1.0).to(props::HEIGHT, 0.0).ease(ease),
        Position::label("fadeOut"),
    )
    .to(
        &number,
        TweenSpec::new(1.0)
            .to(props::SCALE, 0.4)
            .to(props::OPACITY, 0.0)
            .ease(ease),
        Position::label("fadeOut"),
    );
    tl
}
