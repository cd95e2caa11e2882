//! Timelines
//!
//! A [`Timeline`] places tweens, instant sets, class changes and markers at
//! positions in seconds. Positions follow the familiar timeline notation:
//!
//! | Notation      | Meaning                                        |
//! |---------------|------------------------------------------------|
//! | *(none)*      | at the current end of the timeline             |
//! | `1.5`         | absolute time                                  |
//! | `+=0.1`       | 0.1s after the current end                     |
//! | `<`, `<0.2`   | relative to the start of the previous addition |
//! | `>`, `>-0.1`  | relative to the end of the previous addition   |
//! | `start+=0.3`  | relative to a label                            |
//!
//! Timelines are plain data; they start running when handed to
//! [`Animator::play`](crate::animator::Animator::play).

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use nom::{
    branch::alt,
    bytes::complete::take_while,
    character::complete::{char, one_of, satisfy},
    combinator::{all_consuming, map, opt, recognize},
    number::complete::float,
    sequence::{pair, preceded, tuple},
    IResult,
};
use smallvec::SmallVec;
use tracing::warn;

use scrollstage_core::ElementId;

use crate::error::AnimationError;
use crate::tween::TweenSpec;

/// Where an addition lands on a timeline
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Position {
    #[default]
    End,
    FromEnd(f32),
    Absolute(f32),
    PreviousStart(f32),
    PreviousEnd(f32),
    Label(String, f32),
}

impl Position {
    pub fn label(name: impl Into<String>) -> Self {
        Position::Label(name.into(), 0.0)
    }

    pub fn label_offset(name: impl Into<String>, offset: f32) -> Self {
        Position::Label(name.into(), offset)
    }

    /// Parse position notation
    pub fn parse(input: &str) -> Result<Self, AnimationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Position::End);
        }
        all_consuming(position)(trimmed)
            .map(|(_, pos)| pos)
            .map_err(|_| AnimationError::Position(input.to_string()))
    }
}

impl FromStr for Position {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn write_relative(f: &mut fmt::Formatter<'_>, offset: f32) -> fmt::Result {
    if offset < 0.0 {
        write!(f, "-={}", -offset)
    } else if offset > 0.0 {
        write!(f, "+={offset}")
    } else {
        Ok(())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::End => Ok(()),
            Position::FromEnd(offset) if *offset < 0.0 => write!(f, "-={}", -offset),
            Position::FromEnd(offset) => write!(f, "+={offset}"),
            Position::Absolute(at) => write!(f, "{at}"),
            Position::PreviousStart(offset) => {
                f.write_str("<")?;
                write_relative(f, *offset)
            }
            Position::PreviousEnd(offset) => {
                f.write_str(">")?;
                write_relative(f, *offset)
            }
            Position::Label(name, offset) => {
                f.write_str(name)?;
                write_relative(f, *offset)
            }
        }
    }
}

// ============================================================================
// Position grammar
// ============================================================================

/// `+=x` / `-=x`
fn relative(input: &str) -> IResult<&str, f32> {
    map(tuple((one_of("+-"), char('='), float)), |(sign, _, value)| {
        if sign == '-' {
            -value
        } else {
            value
        }
    })(input)
}

fn signed_offset(input: &str) -> IResult<&str, f32> {
    map(opt(alt((relative, float))), Option::unwrap_or_default)(input)
}

fn label_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn position(input: &str) -> IResult<&str, Position> {
    alt((
        map(relative, Position::FromEnd),
        map(preceded(char('<'), signed_offset), Position::PreviousStart),
        map(preceded(char('>'), signed_offset), Position::PreviousEnd),
        map(pair(label_name, opt(relative)), |(name, offset)| {
            Position::Label(name.to_string(), offset.unwrap_or_default())
        }),
        map(float, Position::Absolute),
    ))(input)
}

// ============================================================================
// Timeline
// ============================================================================

/// Something that happens at a point on a timeline
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TimelineAction {
    Tween(ElementId, TweenSpec),
    Set(ElementId, SmallVec<[(&'static str, f32); 4]>),
    AddClass(ElementId, String),
    Marker(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TimelineEntry {
    pub(crate) at: f32,
    pub(crate) action: TimelineAction,
}

/// A sequence of animations laid out in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
    labels: IndexMap<String, f32>,
    duration: f32,
    last_start: f32,
    last_end: f32,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total length in seconds
    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn label_time(&self, name: &str) -> Option<f32> {
        self.labels.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of scheduled actions (one per target for tweens)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn resolve(&self, position: &Position) -> f32 {
        let at = match position {
            Position::End => self.duration,
            Position::FromEnd(offset) => self.duration + offset,
            Position::Absolute(at) => *at,
            Position::PreviousStart(offset) => self.last_start + offset,
            Position::PreviousEnd(offset) => self.last_end + offset,
            Position::Label(name, offset) => match self.labels.get(name) {
                Some(at) => at + offset,
                None => {
                    warn!(label = %name, "timeline label not found, appending at end");
                    self.duration + offset
                }
            },
        };
        at.max(0.0)
    }

    fn record(&mut self, start: f32, end: f32) {
        self.last_start = start;
        self.last_end = end;
        self.duration = self.duration.max(end);
    }

    /// Name the resolved position
    pub fn add_label(&mut self, name: impl Into<String>, position: Position) -> &mut Self {
        let at = self.resolve(&position);
        self.labels.insert(name.into(), at);
        self.duration = self.duration.max(at);
        self
    }

    /// Tween every target, staggering consecutive targets by `spec.stagger`
    pub fn to(&mut self, targets: &[ElementId], spec: TweenSpec, position: Position) -> &mut Self {
        if targets.is_empty() {
            return self;
        }
        let start = self.resolve(&position);
        let mut end = start;
        for (i, &target) in targets.iter().enumerate() {
            let at = start + spec.stagger * i as f32;
            end = end.max(at + spec.total());
            self.entries.push(TimelineEntry {
                at,
                action: TimelineAction::Tween(target, spec.clone()),
            });
        }
        self.record(start, end);
        self
    }

    /// Set properties instantly
    pub fn set(
        &mut self,
        targets: &[ElementId],
        props: &[(&'static str, f32)],
        position: Position,
    ) -> &mut Self {
        let at = self.resolve(&position);
        for &target in targets {
            self.entries.push(TimelineEntry {
                at,
                action: TimelineAction::Set(target, props.iter().copied().collect()),
            });
        }
        self.record(at, at);
        self
    }

    /// Add a class instantly
    pub fn add_class(
        &mut self,
        targets: &[ElementId],
        class: impl Into<String>,
        position: Position,
    ) -> &mut Self {
        let at = self.resolve(&position);
        let class = class.into();
        for &target in targets {
            self.entries.push(TimelineEntry {
                at,
                action: TimelineAction::AddClass(target, class.clone()),
            });
        }
        self.record(at, at);
        self
    }

    /// Emit a named marker event when playback reaches the position
    pub fn marker(&mut self, name: impl Into<String>, position: Position) -> &mut Self {
        let at = self.resolve(&position);
        self.entries.push(TimelineEntry {
            at,
            action: TimelineAction::Marker(name.into()),
        });
        self.record(at, at);
        self
    }

    /// Entries ordered by time, insertion order kept among equal times
    pub(crate) fn into_sorted_entries(self) -> (Vec<TimelineEntry>, f32) {
        let mut entries = self.entries;
        entries.sort_by(|a, b| a.at.total_cmp(&b.at));
        (entries, self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tween::TweenSpec;
    use scrollstage_core::props;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<ElementId> {
        let mut map: SlotMap<ElementId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_parse_positions() {
        assert_eq!(Position::parse("").unwrap(), Position::End);
        assert_eq!(Position::parse("+=0.1").unwrap(), Position::FromEnd(0.1));
        assert_eq!(Position::parse("-=0.5").unwrap(), Position::FromEnd(-0.5));
        assert_eq!(Position::parse("<").unwrap(), Position::PreviousStart(0.0));
        assert_eq!(Position::parse("<0.2").unwrap(), Position::PreviousStart(0.2));
        assert_eq!(Position::parse(">").unwrap(), Position::PreviousEnd(0.0));
        assert_eq!(Position::parse("1.5").unwrap(), Position::Absolute(1.5));
        assert_eq!(Position::parse("start").unwrap(), Position::label("start"));
        assert_eq!(
            Position::parse("fadeOut+=0.3").unwrap(),
            Position::label_offset("fadeOut", 0.3)
        );
        assert!(Position::parse("start+").is_err());
    }

    #[test]
    fn test_sequencing_and_parallel() {
        let els = ids(3);
        let mut tl = Timeline::new();
        tl.to(&els[..1], TweenSpec::new(0.8).to(props::OPACITY, 0.8), Position::End)
            .to(&els[1..2], TweenSpec::new(0.8).to(props::SCALE, 0.95), Position::PreviousStart(0.0))
            .to(&els[2..], TweenSpec::new(0.8).to(props::Y_PERCENT, 0.0), Position::PreviousStart(0.0));
        assert!((tl.duration() - 0.8).abs() < 1e-6);

        tl.to(&els[..1], TweenSpec::new(0.5).to(props::OPACITY, 1.0), Position::End);
        assert!((tl.duration() - 1.3).abs() < 1e-6);
    }

    #[test]
    fn test_stagger_and_labels() {
        let els = ids(4);
        let mut tl = Timeline::new();
        tl.add_label("start", Position::End);
        tl.to(
            &els,
            TweenSpec::new(1.6).stagger(0.1).to(props::OPACITY, 1.0),
            Position::label("start"),
        );
        assert!((tl.duration() - 1.9).abs() < 1e-5);

        tl.marker("resize", Position::FromEnd(0.1));
        let (entries, duration) = tl.into_sorted_entries();
        assert!((duration - 2.0).abs() < 1e-5);
        assert_eq!(entries.len(), 5);
        assert!((entries[3].at - 0.3).abs() < 1e-6);
        assert!(matches!(entries[4].action, TimelineAction::Marker(ref name) if name == "resize"));
    }

    #[test]
    fn test_missing_label_appends() {
        let els = ids(1);
        let mut tl = Timeline::new();
        tl.to(&els, TweenSpec::new(1.0).to(props::OPACITY, 0.0), Position::End);
        tl.marker("late", Position::label_offset("nope", 0.5));
        assert!((tl.duration() - 1.5).abs() < 1e-6);
    }
}
