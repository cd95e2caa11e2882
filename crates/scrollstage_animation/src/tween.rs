//! Property tweens
//!
//! A tween drives one or more inline style properties of a single element
//! from their current (or given) values to targets over a duration.
//! Start values are resolved when the tween begins, after its delay, so
//! chained tweens pick up where earlier ones left the element.

use smallvec::SmallVec;

use scrollstage_core::{props, Document, ElementId};

use crate::easing::Easing;

/// End value of a tweened property
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TweenValue {
    Number(f32),
    /// The element's natural height; the explicit style is cleared on completion
    Auto,
}

impl From<f32> for TweenValue {
    fn from(value: f32) -> Self {
        TweenValue::Number(value)
    }
}

/// One property of a [`TweenSpec`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyTween {
    pub property: &'static str,
    pub from: Option<f32>,
    pub to: TweenValue,
}

/// Description of a tween, reusable across targets
#[derive(Debug, Clone, PartialEq)]
pub struct TweenSpec {
    pub props: SmallVec<[PropertyTween; 4]>,
    /// Seconds
    pub duration: f32,
    /// Seconds before the tween starts
    pub delay: f32,
    pub easing: Easing,
    /// Offset between consecutive targets when applied to several elements
    pub stagger: f32,
    /// Remove every tweened property from the inline style when done
    pub clear_props: bool,
}

impl TweenSpec {
    pub fn new(duration: f32) -> Self {
        Self {
            props: SmallVec::new(),
            duration: duration.max(0.0),
            delay: 0.0,
            easing: Easing::Linear,
            stagger: 0.0,
            clear_props: false,
        }
    }

    /// Tween `property` from its current value to `value`
    pub fn to(mut self, property: &'static str, value: impl Into<TweenValue>) -> Self {
        self.props.push(PropertyTween {
            property,
            from: None,
            to: value.into(),
        });
        self
    }

    /// Tween `property` between explicit values
    pub fn from_to(mut self, property: &'static str, from: f32, to: f32) -> Self {
        self.props.push(PropertyTween {
            property,
            from: Some(from),
            to: TweenValue::Number(to),
        });
        self
    }

    pub fn ease(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn delay(mut self, delay: f32) -> Self {
        self.delay = delay.max(0.0);
        self
    }

    pub fn stagger(mut self, stagger: f32) -> Self {
        self.stagger = stagger.max(0.0);
        self
    }

    pub fn clear_props(mut self) -> Self {
        self.clear_props = true;
        self
    }

    /// Delay plus duration
    pub fn total(&self) -> f32 {
        self.delay + self.duration
    }

    pub fn touches(&self, property: &str) -> bool {
        self.props.iter().any(|p| p.property == property)
    }
}

/// Value a property has when no inline style is set
pub fn resting_value(property: &str) -> f32 {
    match property {
        props::OPACITY | props::SCALE | props::VISIBILITY => 1.0,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveProperty {
    property: &'static str,
    from: f32,
    to: f32,
    auto: bool,
}

/// A running tween
#[derive(Debug, Clone)]
pub(crate) struct Tween {
    pub(crate) target: ElementId,
    spec: TweenSpec,
    active: SmallVec<[ActiveProperty; 4]>,
    elapsed: f32,
    started: bool,
}

impl Tween {
    pub(crate) fn new(target: ElementId, spec: TweenSpec) -> Self {
        Self {
            target,
            spec,
            active: SmallVec::new(),
            elapsed: 0.0,
            started: false,
        }
    }

    /// Apply explicit start values right away
    pub(crate) fn render_from(&self, doc: &mut dyn Document) {
        for prop in &self.spec.props {
            if let Some(from) = prop.from {
                doc.set_style(self.target, prop.property, from);
            }
        }
    }

    pub(crate) fn touches(&self, property: &str) -> bool {
        self.spec.touches(property)
    }

    /// Stop driving `property`; returns true when nothing is left to drive
    pub(crate) fn release(&mut self, property: &str) -> bool {
        self.spec.props.retain(|p| p.property != property);
        self.active.retain(|p| p.property != property);
        self.spec.props.is_empty()
    }

    fn start(&mut self, doc: &dyn Document) {
        self.started = true;
        self.active = self
            .spec
            .props
            .iter()
            .map(|prop| {
                let from = prop.from.unwrap_or_else(|| current_value(doc, self.target, prop.property));
                let (to, auto) = match prop.to {
                    TweenValue::Number(to) => (to, false),
                    TweenValue::Auto => (doc.natural_height(self.target).unwrap_or(from), true),
                };
                ActiveProperty {
                    property: prop.property,
                    from,
                    to,
                    auto,
                }
            })
            .collect();
    }

    /// Advance by `dt` seconds; returns true once finished
    pub(crate) fn tick(&mut self, doc: &mut dyn Document, dt: f32) -> bool {
        if !doc.contains(self.target) {
            return true;
        }

        self.elapsed += dt;
        if self.elapsed < self.spec.delay {
            return false;
        }
        if !self.started {
            self.start(doc);
        }

        let progress = if self.spec.duration <= 0.0 {
            1.0
        } else {
            ((self.elapsed - self.spec.delay) / self.spec.duration).min(1.0)
        };
        let eased = self.spec.easing.apply(progress);

        for prop in &self.active {
            let value = prop.from + (prop.to - prop.from) * eased;
            doc.set_style(self.target, prop.property, value);
        }

        if progress >= 1.0 {
            for prop in &self.active {
                if prop.auto || self.spec.clear_props {
                    doc.clear_style(self.target, prop.property);
                }
            }
            return true;
        }
        false
    }
}

fn current_value(doc: &dyn Document, el: ElementId, property: &str) -> f32 {
    if let Some(value) = doc.style(el, property) {
        return value;
    }
    if property == props::HEIGHT {
        if let Some(rect) = doc.rect(el) {
            return rect.height;
        }
    }
    resting_value(property)
}
