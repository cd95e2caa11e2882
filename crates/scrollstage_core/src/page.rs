//! Page descriptions
//!
//! A page is the content swapped into the transition container on
//! navigation. Descriptions are plain data so hosts and scenario files can
//! build them from TOML or JSON.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// One element of a page
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NodeSpec {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attributes: FxHashMap<String, String>,
    /// Explicit layout height; children stack vertically when absent
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub text: Option<String>,
    /// Present on images: the height they take once loaded
    #[serde(default)]
    pub image: Option<ImageSpec>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

fn default_tag() -> String {
    "div".to_string()
}

/// Image payload of a [`NodeSpec`]
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ImageSpec {
    pub height: f32,
    /// Already decoded when the page mounts
    #[serde(default = "default_true")]
    pub complete: bool,
}

fn default_true() -> bool {
    true
}

impl NodeSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn div() -> Self {
        Self::new("div")
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn height(mut self, height: f32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn image(mut self, height: f32, complete: bool) -> Self {
        self.tag = "img".to_string();
        self.image = Some(ImageSpec { height, complete });
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.children.extend(children);
        self
    }
}

/// A whole page: its path and the container content
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PageSpec {
    pub path: String,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

impl PageSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            nodes: Vec::new(),
        }
    }

    pub fn node(mut self, node: NodeSpec) -> Self {
        self.nodes.push(node);
        self
    }
}
