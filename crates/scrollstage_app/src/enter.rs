//! Page-enter animations
//!
//! Everything is placed on one master timeline around a `start` label:
//! fade groups, height reveals and per-character hero reveals all begin at
//! `start` (hero lines offset by their index), hero lines get the `ready`
//! class once the reveals finish, and a `resize` marker fires 0.1s later so
//! the scroll emulator can pick up the final page height.

use tracing::debug;

use scrollstage_animation::{Animator, Easing, Position, Timeline, TweenSpec, TweenValue};
use scrollstage_core::{
    props, query_all, query_within, split_chars, AnimationConfig, CoreError, Document, ElementId,
    Selectors, CHAR_CLASS,
};
use scrollstage_effects::ease_or;

/// Marker emitted when the emulator should re-measure
pub const RESIZE_MARKER: &str = "resize";

/// Class added to hero lines after their characters are revealed
pub const READY_CLASS: &str = "ready";

const START: &str = "start";

/// Apply initial states and build the master timeline for the current page
///
/// Hero text is split into character spans as a side effect.
pub fn page_enter_timeline(
    doc: &mut dyn Document,
    animator: &mut Animator,
    selectors: &Selectors,
    config: &AnimationConfig,
) -> Result<Timeline, CoreError> {
    let ease = ease_or(&config.ease, Easing::POWER4_OUT);
    let reveal = config.dur * 2.0;

    let fade = query_all(doc, &selectors.fade);
    let fade_title = query_all(doc, &selectors.fade_title);
    let fade_only = query_all(doc, &selectors.fade_only);
    let heights = query_all(doc, &selectors.height_reveal);
    let hero_lines = query_all(doc, &selectors.hero_line);

    for &el in fade.iter().chain(&fade_title).chain(&fade_only) {
        animator.set(doc, el, &[(props::VISIBILITY, 1.0), (props::OPACITY, 0.0)]);
    }
    for &el in &heights {
        animator.set(doc, el, &[(props::HEIGHT, 0.0), (props::OVERFLOW_HIDDEN, 1.0)]);
    }
    for &el in &fade {
        animator.set(doc, el, &[(props::TRANSLATE_Y, 30.0)]);
    }
    for &el in &hero_lines {
        animator.set(doc, el, &[(props::VISIBILITY, 1.0), (props::OPACITY, 1.0)]);
    }

    let mut tl = Timeline::new();
    tl.add_label(START, Position::End);
    tl.to(
        &fade,
        TweenSpec::new(reveal)
            .to(props::OPACITY, 1.0)
            .to(props::TRANSLATE_Y, 0.0)
            .ease(ease)
            .stagger(0.1),
        Position::label(START),
    );
    tl.to(
        &heights,
        TweenSpec::new(reveal).to(props::HEIGHT, TweenValue::Auto).ease(ease),
        Position::label(START),
    );
    tl.to(
        &fade_title,
        TweenSpec::new(reveal).to(props::OPACITY, 1.0).ease(ease).stagger(0.3),
        Position::label(START),
    );
    tl.to(
        &fade_only,
        TweenSpec::new(reveal).to(props::OPACITY, 1.0).ease(ease),
        Position::label(START),
    );

    let mut revealed = 0;
    for (index, &line) in hero_lines.iter().enumerate() {
        let line_delay = index as f32 * config.line_delay_factor;
        for text in hero_text(doc, line, selectors) {
            let chars = split_chars(doc, text)?;
            for &ch in &chars {
                animator.set(doc, ch, &[(props::Y_PERCENT, 100.0), (props::OPACITY, 0.0)]);
            }
            tl.to(
                &chars,
                TweenSpec::new(config.hero_dur)
                    .to(props::Y_PERCENT, 0.0)
                    .to(props::OPACITY, 1.0)
                    .ease(Easing::POWER4_OUT)
                    .stagger(config.hero_stagger)
                    .clear_props(),
                Position::label_offset(START, line_delay),
            );
            revealed += chars.len();
        }
    }
    if !hero_lines.is_empty() {
        tl.add_class(&hero_lines, READY_CLASS, Position::PreviousEnd(0.0));
    }
    tl.marker(RESIZE_MARKER, Position::FromEnd(0.1));

    debug!(
        fade = fade.len() + fade_title.len() + fade_only.len(),
        heights = heights.len(),
        hero_lines = hero_lines.len(),
        chars = revealed,
        duration = tl.duration(),
        "page enter timeline built"
    );
    Ok(tl)
}

/// Text elements of a hero line, excluding spans produced by a previous split
fn hero_text(doc: &dyn Document, line: ElementId, selectors: &Selectors) -> Vec<ElementId> {
    query_within(doc, line, &selectors.hero_text)
        .into_iter()
        .filter(|&el| !doc.has_class(el, CHAR_CLASS))
        .collect()
}
