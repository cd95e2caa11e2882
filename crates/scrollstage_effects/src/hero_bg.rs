//! Pointer-following hero background
//!
//! The bubble element eases toward the pointer by a fixed fraction of the
//! remaining distance each frame and is translated by whole pixels.

use scrollstage_core::{props, query_all, Document, ElementId, Selector};

/// Fraction of the remaining distance covered per frame
const FOLLOW: f32 = 1.0 / 40.0;

#[derive(Debug, Clone, Default)]
pub struct HeroBackground {
    elements: Vec<ElementId>,
    current: (f32, f32),
    target: (f32, f32),
}

impl HeroBackground {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look the bubbles up on the current page
    pub fn attach(&mut self, doc: &dyn Document, selector: &Selector) -> usize {
        self.elements = query_all(doc, selector);
        self.elements.len()
    }

    pub fn is_attached(&self) -> bool {
        !self.elements.is_empty()
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.target = (x, y);
    }

    pub fn position(&self) -> (f32, f32) {
        self.current
    }

    /// Advance one frame and write the translation
    pub fn step(&mut self, doc: &mut dyn Document) {
        if self.elements.is_empty() {
            return;
        }
        self.current.0 += (self.target.0 - self.current.0) * FOLLOW;
        self.current.1 += (self.target.1 - self.current.1) * FOLLOW;
        let (x, y) = (self.current.0.round(), self.current.1.round());
        self.elements.retain(|&el| doc.contains(el));
        for &el in &self.elements {
            doc.set_style(el, props::TRANSLATE_X, x);
            doc.set_style(el, props::TRANSLATE_Y, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollstage_core::{MemoryDocument, NodeSpec, PageSpec};

    #[test]
    fn test_follows_pointer() {
        let mut doc = MemoryDocument::new(1280.0, 800.0);
        let page = doc
            .mount_page(&PageSpec::new("/").node(NodeSpec::div().class("gi")))
            .unwrap();
        let gi = doc.children(page)[0];

        let mut bg = HeroBackground::new();
        assert_eq!(bg.attach(&doc, &Selector::parse(".gi").unwrap()), 1);
        bg.pointer_move(400.0, 200.0);
        bg.step(&mut doc);
        let (x, y) = bg.position();
        assert!((x - 10.0).abs() < 1e-4 && (y - 5.0).abs() < 1e-4);
        assert_eq!(doc.style(gi, props::TRANSLATE_X), Some(10.0));

        for _ in 0..1000 {
            bg.step(&mut doc);
        }
        assert_eq!(doc.style(gi, props::TRANSLATE_X), Some(400.0));
        assert_eq!(doc.style(gi, props::TRANSLATE_Y), Some(200.0));
    }

    #[test]
    fn test_detached_is_inert() {
        let mut doc = MemoryDocument::new(1280.0, 800.0);
        let mut bg = HeroBackground::new();
        bg.pointer_move(100.0, 100.0);
        bg.step(&mut doc);
        assert_eq!(bg.position(), (0.0, 0.0));
    }
}
