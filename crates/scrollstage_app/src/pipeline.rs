//! Ordered lifecycle steps
//!
//! A [`Pipeline`] holds the steps the stage still has to run, in order. A
//! step only runs once every step ahead of it has completed. Two kinds of
//! step block:
//!
//! - [`Step::Settle`] waits a fixed delay, measured from when it reaches the
//!   front of the queue
//! - [`Step::AwaitTimeline`] waits until a timeline stops playing
//!
//! Steps carry the generation they were queued under. Starting a new
//! generation drops everything queued under older ones, which is how a
//! superseded navigation stops touching the page that replaced it.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, trace};

use scrollstage_animation::{Animator, TimelineId};

/// One lifecycle step
#[derive(Debug, Clone, PartialEq)]
pub enum Step<A> {
    Run(A),
    Settle(Duration),
    AwaitTimeline(TimelineId),
}

#[derive(Debug, Clone)]
struct Queued<A> {
    generation: u64,
    step: Step<A>,
}

/// Generation-tagged step queue
#[derive(Debug, Clone)]
pub struct Pipeline<A> {
    queue: VecDeque<Queued<A>>,
    generation: u64,
    settle_deadline: Option<Duration>,
    dropped: u32,
}

impl<A> Default for Pipeline<A> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            generation: 0,
            settle_deadline: None,
            dropped: 0,
        }
    }
}

impl<A> Pipeline<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new generation, dropping steps queued under older ones
    pub fn begin_generation(&mut self) -> u64 {
        self.generation += 1;
        let before = self.queue.len();
        let current = self.generation;
        self.queue.retain(|queued| queued.generation >= current);
        let dropped = before - self.queue.len();
        if dropped > 0 {
            self.settle_deadline = None;
            self.dropped += dropped as u32;
            debug!(dropped, generation = current, "stale lifecycle steps dropped");
        }
        current
    }

    /// Queue a step at the back
    pub fn push(&mut self, step: Step<A>) {
        self.queue.push_back(Queued {
            generation: self.generation,
            step,
        });
    }

    /// Queue steps ahead of everything else, keeping their order
    pub fn interpose(&mut self, steps: impl IntoIterator<Item = Step<A>>) {
        let steps: Vec<Step<A>> = steps.into_iter().collect();
        for step in steps.into_iter().rev() {
            self.queue.push_front(Queued {
                generation: self.generation,
                step,
            });
        }
    }

    /// Next action whose predecessors have all completed
    ///
    /// Returns `None` when the queue is empty or blocked.
    pub fn poll(&mut self, now: Duration, animator: &Animator) -> Option<A> {
        while let Some(queued) = self.queue.pop_front() {
            match queued.step {
                Step::Run(action) => return Some(action),
                Step::Settle(delay) => {
                    let deadline = *self.settle_deadline.get_or_insert(now + delay);
                    if now < deadline {
                        self.queue.push_front(Queued {
                            generation: queued.generation,
                            step: Step::Settle(delay),
                        });
                        return None;
                    }
                    trace!(?delay, "settled");
                    self.settle_deadline = None;
                }
                Step::AwaitTimeline(id) => {
                    if animator.is_playing(id) {
                        self.queue.push_front(Queued {
                            generation: queued.generation,
                            step: Step::AwaitTimeline(id),
                        });
                        return None;
                    }
                }
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Steps discarded by generation changes
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollstage_animation::{Position, Timeline, TweenSpec};
    use scrollstage_core::{props, Document, MemoryDocument, NodeSpec};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn drain(pipeline: &mut Pipeline<&'static str>, now: Duration, animator: &Animator) -> Vec<&'static str> {
        std::iter::from_fn(|| pipeline.poll(now, animator)).collect()
    }

    #[test]
    fn test_settle_blocks_until_deadline() {
        let animator = Animator::new();
        let mut pipeline = Pipeline::new();
        pipeline.push(Step::Run("stacking"));
        pipeline.push(Step::Settle(ms(100)));
        pipeline.push(Step::Run("theme"));

        assert_eq!(drain(&mut pipeline, ms(0), &animator), vec!["stacking"]);
        assert!(drain(&mut pipeline, ms(60), &animator).is_empty());
        assert_eq!(drain(&mut pipeline, ms(100), &animator), vec!["theme"]);
        assert!(pipeline.is_empty());
    }

    #[test]
    fn test_await_timeline() {
        let mut doc = MemoryDocument::new(1280.0, 800.0);
        let body = doc.body();
        let el = doc.append(body, &NodeSpec::div()).unwrap();
        let mut animator = Animator::new();
        let mut tl = Timeline::new();
        tl.to(&[el], TweenSpec::new(0.5).to(props::OPACITY, 0.0), Position::End);
        let id = animator.play(&mut doc, tl);

        let mut pipeline = Pipeline::new();
        pipeline.push(Step::AwaitTimeline(id));
        pipeline.push(Step::Run("after"));
        assert!(drain(&mut pipeline, ms(0), &animator).is_empty());

        animator.tick(&mut doc, 1.0);
        assert_eq!(drain(&mut pipeline, ms(0), &animator), vec!["after"]);
    }

    #[test]
    fn test_interpose_runs_first() {
        let animator = Animator::new();
        let mut pipeline = Pipeline::new();
        pipeline.push(Step::Run("last"));
        pipeline.interpose([Step::Run("first"), Step::Run("second")]);
        assert_eq!(drain(&mut pipeline, ms(0), &animator), vec!["first", "second", "last"]);
    }

    #[test]
    fn test_new_generation_drops_stale_steps() {
        let animator = Animator::new();
        let mut pipeline = Pipeline::new();
        pipeline.push(Step::Settle(ms(100)));
        pipeline.push(Step::Run("old"));
        assert!(drain(&mut pipeline, ms(0), &animator).is_empty());

        pipeline.begin_generation();
        pipeline.push(Step::Settle(ms(100)));
        pipeline.push(Step::Run("new"));
        assert_eq!(pipeline.dropped(), 2);

        // The new settle starts from scratch
        assert!(drain(&mut pipeline, ms(50), &animator).is_empty());
        assert!(drain(&mut pipeline, ms(120), &animator).is_empty());
        assert_eq!(drain(&mut pipeline, ms(150), &animator), vec!["new"]);
    }
}
