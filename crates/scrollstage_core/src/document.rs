//! Host document abstraction
//!
//! The scroll effects never own DOM nodes. They hold [`ElementId`]s and go
//! through the [`Document`] trait for queries, layout measurement, inline
//! styles and classes. A browser host implements the trait over its DOM;
//! [`MemoryDocument`](crate::memory::MemoryDocument) implements it headlessly.

use slotmap::new_key_type;

use crate::error::CoreError;
use crate::page::PageSpec;
use crate::selector::Selector;

new_key_type! {
    /// Non-owning handle to an element in a [`Document`]
    pub struct ElementId;
}

/// Inline style property names shared by the effects and the animator
pub mod props {
    pub const OPACITY: &str = "opacity";
    pub const HEIGHT: &str = "height";
    pub const PADDING_BOTTOM: &str = "padding-bottom";
    pub const ROTATION: &str = "rotation";
    pub const SCALE: &str = "scale";
    pub const BORDER_RADIUS: &str = "border-radius";
    pub const TRANSLATE_X: &str = "translate-x";
    pub const TRANSLATE_Y: &str = "translate-y";
    /// Vertical offset as a percentage of the element's own height
    pub const Y_PERCENT: &str = "y-percent";
    pub const VISIBILITY: &str = "visibility";
    pub const OVERFLOW_HIDDEN: &str = "overflow-hidden";
    pub const Z_ORDER: &str = "z-order";
    pub const SCROLL_PROGRESS: &str = "scroll-progress";
    pub const TRANSFORM: &str = "transform";
}

/// Vertical layout box in document coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Point at `fraction` of the height (0 = top, 0.5 = center, 1 = bottom)
    pub fn at(&self, fraction: f32) -> f32 {
        self.top + self.height * fraction
    }
}

/// The host document
///
/// Layout queries ignore transforms: pinned elements are measured where the
/// flow puts them, not where a translate moves them.
pub trait Document {
    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// The document body
    fn body(&self) -> ElementId;

    /// Whether the element is still attached to the document
    fn contains(&self, el: ElementId) -> bool;

    fn parent(&self, el: ElementId) -> Option<ElementId>;

    fn children(&self, el: ElementId) -> Vec<ElementId>;

    fn tag(&self, el: ElementId) -> Option<&str>;

    fn attribute(&self, el: ElementId, name: &str) -> Option<&str>;

    fn text(&self, el: ElementId) -> Option<&str>;

    /// Append an inline element carrying `text` (used by the text splitter)
    fn append_inline(
        &mut self,
        parent: ElementId,
        tag: &str,
        classes: &[&str],
        text: &str,
    ) -> Result<ElementId, CoreError>;

    /// Replace an element's own text content
    fn set_text(&mut self, el: ElementId, text: &str) -> Result<(), CoreError>;

    // ------------------------------------------------------------------
    // Classes and inline styles
    // ------------------------------------------------------------------

    fn has_class(&self, el: ElementId, class: &str) -> bool;

    fn add_class(&mut self, el: ElementId, class: &str);

    fn remove_class(&mut self, el: ElementId, class: &str);

    fn style(&self, el: ElementId, property: &str) -> Option<f32>;

    fn set_style(&mut self, el: ElementId, property: &str, value: f32);

    fn clear_style(&mut self, el: ElementId, property: &str);

    // ------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------

    /// Layout box, or `None` when the element is detached
    fn rect(&self, el: ElementId) -> Option<Rect>;

    /// Height the element would have without an explicit `height` style
    fn natural_height(&self, el: ElementId) -> Option<f32>;

    fn viewport_height(&self) -> f32;

    fn viewport_width(&self) -> f32;

    fn document_height(&self) -> f32;

    /// Native scroll offset
    fn scroll_y(&self) -> f32;

    fn set_scroll_y(&mut self, y: f32);

    /// Largest reachable native scroll offset
    fn max_scroll(&self) -> f32 {
        (self.document_height() - self.viewport_height()).max(0.0)
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    /// Whether an image element has finished loading (or failed)
    fn image_complete(&self, el: ElementId) -> bool;

    // ------------------------------------------------------------------
    // Pages
    // ------------------------------------------------------------------

    /// Current location path
    fn path(&self) -> &str;

    /// The container holding the current page's content
    fn container(&self) -> Option<ElementId>;

    /// Replace the current page container with a freshly built one
    fn mount_page(&mut self, page: &PageSpec) -> Result<ElementId, CoreError>;
}

/// Query helper usable through `&dyn Document`
pub fn query_all(doc: &dyn Document, selector: &Selector) -> Vec<ElementId> {
    let mut found = Vec::new();
    let mut stack = vec![doc.body()];
    while let Some(el) = stack.pop() {
        if selector.matches(doc, el) {
            found.push(el);
        }
        let children = doc.children(el);
        stack.extend(children.into_iter().rev());
    }
    found
}

/// First match through `&dyn Document`
pub fn query(doc: &dyn Document, selector: &Selector) -> Option<ElementId> {
    query_all(doc, selector).into_iter().next()
}

/// Elements matching `selector` within `scope` (the scope itself excluded)
pub fn query_within(doc: &dyn Document, scope: ElementId, selector: &Selector) -> Vec<ElementId> {
    let mut found = Vec::new();
    let mut stack: Vec<ElementId> = doc.children(scope).into_iter().rev().collect();
    while let Some(el) = stack.pop() {
        if selector.matches(doc, el) {
            found.push(el);
        }
        stack.extend(doc.children(el).into_iter().rev());
    }
    found
}
