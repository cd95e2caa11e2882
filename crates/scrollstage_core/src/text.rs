//! Character splitting
//!
//! Breaks an element's text into one inline `span.char` per grapheme so each
//! character can be animated on its own. The parent keeps no text of its
//! own afterwards; document flow is unchanged because the spans are inline.

use unicode_segmentation::UnicodeSegmentation;

use crate::document::{Document, ElementId};
use crate::error::CoreError;

/// Class given to every character span
pub const CHAR_CLASS: &str = "char";

/// Split `el`'s text into character spans
///
/// Splitting an element twice returns the spans from the first pass.
/// Whitespace graphemes are kept as spans so word spacing survives.
pub fn split_chars(doc: &mut dyn Document, el: ElementId) -> Result<Vec<ElementId>, CoreError> {
    if !doc.contains(el) {
        return Err(CoreError::UnknownElement(el));
    }

    let existing: Vec<ElementId> = doc
        .children(el)
        .into_iter()
        .filter(|child| doc.has_class(*child, CHAR_CLASS))
        .collect();
    if !existing.is_empty() {
        return Ok(existing);
    }

    let Some(text) = doc.text(el).map(str::to_owned) else {
        return Ok(Vec::new());
    };

    let mut chars = Vec::with_capacity(text.len());
    for grapheme in text.graphemes(true) {
        chars.push(doc.append_inline(el, "span", &[CHAR_CLASS], grapheme)?);
    }
    doc.set_text(el, "")?;
    Ok(chars)
}
