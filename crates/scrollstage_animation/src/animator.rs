//! Animator
//!
//! Owns every running tween and timeline and advances them from the host's
//! frame loop. The animator never reads a clock; callers pass the elapsed
//! time to [`Animator::tick`], which keeps playback deterministic under test.
//!
//! Starting a tween takes over the properties it touches: any other tween
//! driving the same property of the same element stops driving it.

use rustc_hash::FxHashSet;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use tracing::trace;

use scrollstage_core::{Document, ElementId};

use crate::timeline::{Timeline, TimelineAction, TimelineEntry};
use crate::tween::{Tween, TweenSpec};

new_key_type! {
    /// Handle to a running tween
    pub struct TweenId;
    /// Handle to a running timeline
    pub struct TimelineId;
}

/// Something that happened during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum AnimatorEvent {
    /// A standalone tween reached its end
    TweenComplete(TweenId),
    /// A timeline reached its end and all of its tweens finished
    TimelineComplete(TimelineId),
    /// Playback crossed a named marker
    Marker { timeline: TimelineId, name: String },
}

struct TweenSlot {
    tween: Tween,
    owner: Option<TimelineId>,
}

struct RunningTimeline {
    entries: Vec<TimelineEntry>,
    next: usize,
    elapsed: f32,
    duration: f32,
}

impl RunningTimeline {
    fn exhausted(&self) -> bool {
        self.next >= self.entries.len() && self.elapsed >= self.duration
    }
}

/// Drives tweens and timelines against a [`Document`]
#[derive(Default)]
pub struct Animator {
    tweens: SlotMap<TweenId, TweenSlot>,
    timelines: SlotMap<TimelineId, RunningTimeline>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a tween on one element
    ///
    /// Explicit start values are rendered immediately.
    pub fn tween(&mut self, doc: &mut dyn Document, target: ElementId, spec: TweenSpec) -> TweenId {
        self.spawn(doc, target, spec, None)
    }

    /// Start a tween on several elements, delaying each by the spec's stagger
    pub fn tween_all(
        &mut self,
        doc: &mut dyn Document,
        targets: &[ElementId],
        spec: TweenSpec,
    ) -> SmallVec<[TweenId; 4]> {
        targets
            .iter()
            .enumerate()
            .map(|(i, &target)| {
                let spec = spec.clone().delay(spec.delay + spec.stagger * i as f32);
                self.spawn(doc, target, spec, None)
            })
            .collect()
    }

    /// Set properties instantly, taking them over from running tweens
    pub fn set(&mut self, doc: &mut dyn Document, target: ElementId, props: &[(&'static str, f32)]) {
        for &(property, value) in props {
            self.overwrite(target, property);
            doc.set_style(target, property, value);
        }
    }

    /// Start playing a timeline
    pub fn play(&mut self, doc: &mut dyn Document, timeline: Timeline) -> TimelineId {
        let (entries, duration) = timeline.into_sorted_entries();

        // Explicit start values render up front, once per target and property
        let mut rendered: FxHashSet<(ElementId, &'static str)> = FxHashSet::default();
        for entry in &entries {
            if let TimelineAction::Tween(target, spec) = &entry.action {
                for prop in &spec.props {
                    if rendered.insert((*target, prop.property)) {
                        if let Some(from) = prop.from {
                            doc.set_style(*target, prop.property, from);
                        }
                    }
                }
            }
        }

        let id = self.timelines.insert(RunningTimeline {
            entries,
            next: 0,
            elapsed: 0.0,
            duration,
        });
        trace!(?id, duration, "timeline started");
        id
    }

    /// Advance everything by `dt` seconds
    pub fn tick(&mut self, doc: &mut dyn Document, dt: f32) -> Vec<AnimatorEvent> {
        let dt = dt.max(0.0);
        let mut events = Vec::new();
        let mut fresh: FxHashSet<TweenId> = FxHashSet::default();

        // Fire due timeline entries; tweens they spawn catch up on their own lateness
        let timeline_ids: Vec<TimelineId> = self.timelines.keys().collect();
        for timeline_id in timeline_ids {
            let due = match self.timelines.get_mut(timeline_id) {
                Some(running) => {
                    running.elapsed += dt;
                    let start = running.next;
                    while running.next < running.entries.len()
                        && running.entries[running.next].at <= running.elapsed
                    {
                        running.next += 1;
                    }
                    let elapsed = running.elapsed;
                    running.entries[start..running.next]
                        .iter()
                        .map(|entry| (elapsed - entry.at, entry.action.clone()))
                        .collect::<Vec<_>>()
                }
                None => continue,
            };

            for (lateness, action) in due {
                match action {
                    TimelineAction::Tween(target, spec) => {
                        let id = self.spawn(doc, target, spec, Some(timeline_id));
                        fresh.insert(id);
                        if let Some(slot) = self.tweens.get_mut(id) {
                            if slot.tween.tick(doc, lateness) {
                                self.tweens.remove(id);
                            }
                        }
                    }
                    TimelineAction::Set(target, props) => self.set(doc, target, &props),
                    TimelineAction::AddClass(target, class) => {
                        if doc.contains(target) {
                            doc.add_class(target, &class);
                        }
                    }
                    TimelineAction::Marker(name) => events.push(AnimatorEvent::Marker {
                        timeline: timeline_id,
                        name,
                    }),
                }
            }
        }

        let mut finished: SmallVec<[(TweenId, Option<TimelineId>); 8]> = SmallVec::new();
        for (id, slot) in self.tweens.iter_mut() {
            if fresh.contains(&id) {
                continue;
            }
            if slot.tween.tick(doc, dt) {
                finished.push((id, slot.owner));
            }
        }
        for (id, owner) in finished {
            self.tweens.remove(id);
            if owner.is_none() {
                events.push(AnimatorEvent::TweenComplete(id));
            }
        }

        let completed: Vec<TimelineId> = self
            .timelines
            .iter()
            .filter(|(id, running)| running.exhausted() && !self.has_children(*id))
            .map(|(id, _)| id)
            .collect();
        for id in completed {
            self.timelines.remove(id);
            trace!(?id, "timeline complete");
            events.push(AnimatorEvent::TimelineComplete(id));
        }

        events
    }

    /// Whether the timeline is still running
    pub fn is_playing(&self, id: TimelineId) -> bool {
        self.timelines.contains_key(id)
    }

    pub fn is_tween_active(&self, id: TweenId) -> bool {
        self.tweens.contains_key(id)
    }

    /// Playback position of a running timeline, in `[0, 1]`
    pub fn progress(&self, id: TimelineId) -> Option<f32> {
        self.timelines.get(id).map(|running| {
            if running.duration <= 0.0 {
                1.0
            } else {
                (running.elapsed / running.duration).min(1.0)
            }
        })
    }

    /// Stop a timeline and every tween it started; no completion event fires
    pub fn kill_timeline(&mut self, id: TimelineId) -> bool {
        let existed = self.timelines.remove(id).is_some();
        self.tweens.retain(|_, slot| slot.owner != Some(id));
        existed
    }

    pub fn kill_tween(&mut self, id: TweenId) -> bool {
        self.tweens.remove(id).is_some()
    }

    /// Stop every tween driving `target`
    pub fn kill_tweens_of(&mut self, target: ElementId) -> usize {
        let before = self.tweens.len();
        self.tweens.retain(|_, slot| slot.tween.target != target);
        before - self.tweens.len()
    }

    /// Whether any tween is currently driving `target`
    pub fn is_tweening(&self, target: ElementId) -> bool {
        self.tweens.values().any(|slot| slot.tween.target == target)
    }

    pub fn tween_count(&self) -> usize {
        self.tweens.len()
    }

    pub fn timeline_count(&self) -> usize {
        self.timelines.len()
    }

    pub fn is_idle(&self) -> bool {
        self.tweens.is_empty() && self.timelines.is_empty()
    }

    fn has_children(&self, timeline: TimelineId) -> bool {
        self.tweens.values().any(|slot| slot.owner == Some(timeline))
    }

    fn spawn(
        &mut self,
        doc: &mut dyn Document,
        target: ElementId,
        spec: TweenSpec,
        owner: Option<TimelineId>,
    ) -> TweenId {
        for prop in &spec.props {
            self.overwrite(target, prop.property);
        }
        let tween = Tween::new(target, spec);
        if owner.is_none() {
            tween.render_from(doc);
        }
        self.tweens.insert(TweenSlot { tween, owner })
    }

    fn overwrite(&mut self, target: ElementId, property: &str) {
        let mut emptied: SmallVec<[TweenId; 4]> = SmallVec::new();
        for (id, slot) in self.tweens.iter_mut() {
            if slot.tween.target == target && slot.tween.touches(property) && slot.tween.release(property) {
                emptied.push(id);
            }
        }
        for id in emptied {
            self.tweens.remove(id);
        }
    }
}

impl std::fmt::Debug for Animator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animator")
            .field("tweens", &self.tweens.len())
            .field("timelines", &self.timelines.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Position;
    use scrollstage_core::{props, MemoryDocument, NodeSpec};

    fn doc_with(n: usize) -> (MemoryDocument, Vec<ElementId>) {
        let mut doc = MemoryDocument::new(800.0, 600.0);
        let body = doc.body();
        let els = (0..n)
            .map(|_| doc.append(body, &NodeSpec::div().height(100.0)).unwrap())
            .collect();
        (doc, els)
    }

    fn run(animator: &mut Animator, doc: &mut MemoryDocument, seconds: f32) -> Vec<AnimatorEvent> {
        let mut events = Vec::new();
        let steps = (seconds / 0.01).round() as usize;
        for _ in 0..steps {
            events.extend(animator.tick(doc, 0.01));
        }
        events
    }

    #[test]
    fn test_standalone_tween_completes() {
        let (mut doc, els) = doc_with(1);
        let mut animator = Animator::new();
        let id = animator.tween(&mut doc, els[0], TweenSpec::new(0.5).from_to(props::OPACITY, 0.0, 1.0));
        assert_eq!(doc.style(els[0], props::OPACITY), Some(0.0));

        let events = run(&mut animator, &mut doc, 0.6);
        assert_eq!(events, vec![AnimatorEvent::TweenComplete(id)]);
        assert_eq!(doc.style(els[0], props::OPACITY), Some(1.0));
        assert!(animator.is_idle());
    }

    #[test]
    fn test_overwrite_takes_property() {
        let (mut doc, els) = doc_with(1);
        let mut animator = Animator::new();
        let first = animator.tween(
            &mut doc,
            els[0],
            TweenSpec::new(1.0).to(props::ROTATION, 90.0).to(props::SCALE, 0.5),
        );
        animator.tick(&mut doc, 0.5);
        let second = animator.tween(&mut doc, els[0], TweenSpec::new(0.2).to(props::ROTATION, 0.0));

        run(&mut animator, &mut doc, 0.3);
        assert!(!animator.is_tween_active(second));
        // the first tween keeps driving scale only
        assert!(animator.is_tween_active(first));
        assert_eq!(doc.style(els[0], props::ROTATION), Some(0.0));

        animator.set(&mut doc, els[0], &[(props::SCALE, 1.0)]);
        assert!(!animator.is_tween_active(first));
        run(&mut animator, &mut doc, 0.5);
        assert_eq!(doc.style(els[0], props::SCALE), Some(1.0));
    }

    #[test]
    fn test_timeline_markers_and_completion() {
        let (mut doc, els) = doc_with(2);
        let mut animator = Animator::new();
        let mut tl = Timeline::new();
        tl.add_label("start", Position::End)
            .to(&els, TweenSpec::new(0.4).stagger(0.1).from_to(props::OPACITY, 0.0, 1.0), Position::label("start"))
            .add_class(&els[..1], "ready", Position::End)
            .marker("resize", Position::FromEnd(0.1));
        let id = animator.play(&mut doc, tl);

        // from values render before the first tick
        assert_eq!(doc.style(els[1], props::OPACITY), Some(0.0));

        let events = run(&mut animator, &mut doc, 0.55);
        assert!(events.is_empty());
        assert!(doc.has_class(els[0], "ready"));

        let events = run(&mut animator, &mut doc, 0.2);
        assert_eq!(
            events,
            vec![
                AnimatorEvent::Marker {
                    timeline: id,
                    name: "resize".into()
                },
                AnimatorEvent::TimelineComplete(id),
            ]
        );
        assert!(!animator.is_playing(id));
        assert_eq!(doc.style(els[1], props::OPACITY), Some(1.0));
    }

    #[test]
    fn test_large_tick_catches_up() {
        let (mut doc, els) = doc_with(1);
        let mut animator = Animator::new();
        let mut tl = Timeline::new();
        tl.to(&els, TweenSpec::new(0.5).to(props::TRANSLATE_Y, 100.0), Position::End)
            .to(&els, TweenSpec::new(0.5).to(props::TRANSLATE_Y, 0.0), Position::End);
        let id = animator.play(&mut doc, tl);

        let events = animator.tick(&mut doc, 2.0);
        assert_eq!(events, vec![AnimatorEvent::TimelineComplete(id)]);
        assert_eq!(doc.style(els[0], props::TRANSLATE_Y), Some(0.0));
    }

    #[test]
    fn test_kill_timeline_is_silent() {
        let (mut doc, els) = doc_with(1);
        let mut animator = Animator::new();
        let mut tl = Timeline::new();
        tl.to(&els, TweenSpec::new(1.0).to(props::OPACITY, 0.0), Position::End);
        let id = animator.play(&mut doc, tl);
        animator.tick(&mut doc, 0.2);
        assert_eq!(animator.tween_count(), 1);

        assert!(animator.kill_timeline(id));
        assert!(animator.is_idle());
        assert!(run(&mut animator, &mut doc, 1.0).is_empty());
    }

    #[test]
    fn test_tween_all_staggers() {
        let (mut doc, els) = doc_with(3);
        let mut animator = Animator::new();
        animator.tween_all(&mut doc, &els, TweenSpec::new(0.1).stagger(0.1).to(props::OPACITY, 0.0));
        animator.tick(&mut doc, 0.15);
        assert_eq!(doc.style(els[0], props::OPACITY), Some(0.0));
        assert!(doc.style(els[1], props::OPACITY).unwrap() > 0.0);
        assert_eq!(doc.style(els[2], props::OPACITY), None);
    }
}
