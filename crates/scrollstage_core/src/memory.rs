//! Headless document
//!
//! [`MemoryDocument`] keeps an element tree in a slotmap and lays it out as
//! a single vertical block flow: every block child starts where its previous
//! sibling ended, an element is as tall as its children (or its explicit
//! height), and `padding-bottom` adds to that. Inline elements (split text
//! characters) take no vertical space. This is enough geometry for trigger
//! boundaries to move when padding, heights or images change.

use std::cell::{Cell, RefCell};

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::document::{props, Document, ElementId, Rect};
use crate::error::CoreError;
use crate::page::{NodeSpec, PageSpec};

/// Attribute marking the transition container
pub const CONTAINER_ATTRIBUTE: &str = "data-barba";

#[derive(Debug, Clone)]
struct ImageState {
    height: f32,
    complete: bool,
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    classes: SmallVec<[String; 4]>,
    attributes: FxHashMap<String, String>,
    styles: FxHashMap<String, f32>,
    text: Option<String>,
    height: Option<f32>,
    image: Option<ImageState>,
    inline: bool,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            classes: SmallVec::new(),
            attributes: FxHashMap::default(),
            styles: FxHashMap::default(),
            text: None,
            height: None,
            image: None,
            inline: false,
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LayoutBox {
    rect: Rect,
    natural: f32,
}

/// In-memory [`Document`] implementation
#[derive(Debug)]
pub struct MemoryDocument {
    nodes: SlotMap<ElementId, Node>,
    body: ElementId,
    container: Option<ElementId>,
    path: String,
    viewport_width: f32,
    viewport_height: f32,
    scroll_y: f32,
    layout_dirty: Cell<bool>,
    layout: RefCell<FxHashMap<ElementId, LayoutBox>>,
}

impl MemoryDocument {
    /// Create an empty document with the given viewport size
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        let mut nodes = SlotMap::with_key();
        let body = nodes.insert(Node::new("body"));
        Self {
            nodes,
            body,
            container: None,
            path: "/".to_string(),
            viewport_width,
            viewport_height,
            scroll_y: 0.0,
            layout_dirty: Cell::new(true),
            layout: RefCell::new(FxHashMap::default()),
        }
    }

    /// Append persistent page chrome (nav, overlay, drawer) to the body
    pub fn with_chrome(mut self, chrome: impl IntoIterator<Item = NodeSpec>) -> Self {
        for spec in chrome {
            let body = self.body;
            self.build(body, &spec);
        }
        self
    }

    /// Append a subtree under `parent`
    pub fn append(&mut self, parent: ElementId, spec: &NodeSpec) -> Result<ElementId, CoreError> {
        if !self.nodes.contains_key(parent) {
            return Err(CoreError::UnknownElement(parent));
        }
        let id = self.build(parent, spec);
        self.invalidate();
        Ok(id)
    }

    /// Mark an image as loaded; returns false if it was already complete
    pub fn complete_image(&mut self, el: ElementId) -> bool {
        let changed = match self.nodes.get_mut(el).and_then(|n| n.image.as_mut()) {
            Some(image) if !image.complete => {
                image.complete = true;
                true
            }
            _ => false,
        };
        if changed {
            self.invalidate();
        }
        changed
    }

    /// Change the viewport size
    pub fn resize_viewport(&mut self, width: f32, height: f32) {
        self.viewport_width = width;
        self.viewport_height = height;
        self.scroll_y = self.scroll_y.min(self.max_scroll());
    }

    /// Classes on an element (empty when detached)
    pub fn classes(&self, el: ElementId) -> Vec<&str> {
        self.nodes
            .get(el)
            .map(|n| n.classes.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Number of attached elements, body included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn build(&mut self, parent: ElementId, spec: &NodeSpec) -> ElementId {
        let mut node = Node::new(&spec.tag);
        node.classes = spec.classes.iter().cloned().collect();
        node.attributes = spec.attributes.clone();
        node.text = spec.text.clone();
        node.height = spec.height;
        node.image = spec.image.map(|image| ImageState {
            height: image.height,
            complete: image.complete,
        });
        node.parent = Some(parent);
        let id = self.nodes.insert(node);
        self.nodes[parent].children.push(id);
        for child in &spec.children {
            self.build(id, child);
        }
        id
    }

    fn remove_subtree(&mut self, el: ElementId) {
        let mut stack = vec![el];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(id) {
                stack.extend(node.children);
            }
        }
    }

    fn invalidate(&self) {
        self.layout_dirty.set(true);
    }

    fn layout_box(&self, el: ElementId) -> Option<LayoutBox> {
        if self.layout_dirty.get() {
            let mut boxes = self.layout.borrow_mut();
            boxes.clear();
            self.layout_node(self.body, 0.0, &mut boxes);
            self.layout_dirty.set(false);
        }
        self.layout.borrow().get(&el).copied()
    }

    fn layout_node(&self, el: ElementId, top: f32, boxes: &mut FxHashMap<ElementId, LayoutBox>) -> f32 {
        let node = &self.nodes[el];
        let mut cursor = top;
        for &child in &node.children {
            if self.nodes[child].inline {
                boxes.insert(
                    child,
                    LayoutBox {
                        rect: Rect::new(top, 0.0),
                        natural: 0.0,
                    },
                );
                continue;
            }
            cursor += self.layout_node(child, cursor, boxes);
        }

        let natural = match (&node.image, node.height) {
            (Some(image), _) => {
                if image.complete {
                    image.height
                } else {
                    0.0
                }
            }
            (None, Some(height)) => height,
            (None, None) => cursor - top,
        };
        let height = node.styles.get(props::HEIGHT).copied().unwrap_or(natural)
            + node.styles.get(props::PADDING_BOTTOM).copied().unwrap_or(0.0);

        boxes.insert(
            el,
            LayoutBox {
                rect: Rect::new(top, height),
                natural,
            },
        );
        height
    }
}

impl Document for MemoryDocument {
    fn body(&self) -> ElementId {
        self.body
    }

    fn contains(&self, el: ElementId) -> bool {
        self.nodes.contains_key(el)
    }

    fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.nodes.get(el).and_then(|n| n.parent)
    }

    fn children(&self, el: ElementId) -> Vec<ElementId> {
        self.nodes
            .get(el)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn tag(&self, el: ElementId) -> Option<&str> {
        self.nodes.get(el).map(|n| n.tag.as_str())
    }

    fn attribute(&self, el: ElementId, name: &str) -> Option<&str> {
        self.nodes
            .get(el)
            .and_then(|n| n.attributes.get(name))
            .map(String::as_str)
    }

    fn text(&self, el: ElementId) -> Option<&str> {
        self.nodes.get(el).and_then(|n| n.text.as_deref())
    }

    fn append_inline(
        &mut self,
        parent: ElementId,
        tag: &str,
        classes: &[&str],
        text: &str,
    ) -> Result<ElementId, CoreError> {
        if !self.nodes.contains_key(parent) {
            return Err(CoreError::UnknownElement(parent));
        }
        let mut node = Node::new(tag);
        node.classes = classes.iter().map(|c| c.to_string()).collect();
        node.text = Some(text.to_string());
        node.inline = true;
        node.parent = Some(parent);
        let id = self.nodes.insert(node);
        self.nodes[parent].children.push(id);
        self.invalidate();
        Ok(id)
    }

    fn set_text(&mut self, el: ElementId, text: &str) -> Result<(), CoreError> {
        let node = self
            .nodes
            .get_mut(el)
            .ok_or(CoreError::UnknownElement(el))?;
        node.text = if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        };
        Ok(())
    }

    fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.nodes
            .get(el)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn add_class(&mut self, el: ElementId, class: &str) {
        if let Some(node) = self.nodes.get_mut(el) {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        }
    }

    fn remove_class(&mut self, el: ElementId, class: &str) {
        if let Some(node) = self.nodes.get_mut(el) {
            node.classes.retain(|c| c != class);
        }
    }

    fn style(&self, el: ElementId, property: &str) -> Option<f32> {
        self.nodes
            .get(el)
            .and_then(|n| n.styles.get(property))
            .copied()
    }

    fn set_style(&mut self, el: ElementId, property: &str, value: f32) {
        if let Some(node) = self.nodes.get_mut(el) {
            node.styles.insert(property.to_string(), value);
            if property == props::HEIGHT || property == props::PADDING_BOTTOM {
                self.invalidate();
            }
        }
    }

    fn clear_style(&mut self, el: ElementId, property: &str) {
        if let Some(node) = self.nodes.get_mut(el) {
            if node.styles.remove(property).is_some()
                && (property == props::HEIGHT || property == props::PADDING_BOTTOM)
            {
                self.invalidate();
            }
        }
    }

    fn rect(&self, el: ElementId) -> Option<Rect> {
        if !self.nodes.contains_key(el) {
            return None;
        }
        self.layout_box(el).map(|b| b.rect)
    }

    fn natural_height(&self, el: ElementId) -> Option<f32> {
        if !self.nodes.contains_key(el) {
            return None;
        }
        self.layout_box(el).map(|b| b.natural)
    }

    fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    fn document_height(&self) -> f32 {
        self.layout_box(self.body).map_or(0.0, |b| b.rect.height)
    }

    fn scroll_y(&self) -> f32 {
        self.scroll_y
    }

    fn set_scroll_y(&mut self, y: f32) {
        self.scroll_y = y.clamp(0.0, self.max_scroll());
    }

    fn image_complete(&self, el: ElementId) -> bool {
        self.nodes
            .get(el)
            .and_then(|n| n.image.as_ref())
            .map_or(true, |image| image.complete)
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn container(&self) -> Option<ElementId> {
        self.container.filter(|c| self.nodes.contains_key(*c))
    }

    fn mount_page(&mut self, page: &PageSpec) -> Result<ElementId, CoreError> {
        let spec = NodeSpec::div()
            .attr(CONTAINER_ATTRIBUTE, "container")
            .children(page.nodes.iter().cloned());
        let body = self.body;
        let id = self.build(body, &spec);

        // Take the old container's place in the flow
        if let Some(old) = self.container.take() {
            let children = &mut self.nodes[body].children;
            children.pop();
            if let Some(slot) = children.iter().position(|c| *c == old) {
                children[slot] = id;
            } else {
                children.push(id);
            }
            self.remove_subtree(old);
        }

        self.container = Some(id);
        self.path = page.path.clone();
        self.invalidate();
        debug!(path = %self.path, elements = self.nodes.len(), "mounted page");
        Ok(id)
    }
}
