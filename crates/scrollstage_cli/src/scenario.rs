//! Scenario files
//!
//! A scenario describes the document a stage starts on and a list of input
//! events to replay against it:
//!
//! ```toml
//! user_agent = "Mozilla/5.0 (Macintosh)"
//!
//! [page]
//! path = "/"
//!
//! [[page.nodes]]
//! height = 2400.0
//!
//! [[events]]
//! type = "settle"
//!
//! [[events]]
//! type = "wheel"
//! delta = 400.0
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use scrollstage_app::{NavigationOutcome, Stage, StageReport};
use scrollstage_core::{
    query_all, Document, Environment, MemoryDocument, NodeSpec, PageSpec, Selector, StageConfig,
};

const DEFAULT_DT: f32 = 1.0 / 60.0;
const DEFAULT_MAX_FRAMES: usize = 3600;

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15".to_string()
}

fn default_dt() -> f32 {
    DEFAULT_DT
}

fn default_max_frames() -> usize {
    DEFAULT_MAX_FRAMES
}

fn default_image_selector() -> String {
    "img".to_string()
}

/// Viewport size in CSS pixels
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

/// One replayed input
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    /// Run a fixed number of frames
    Frames {
        count: usize,
        #[serde(default = "default_dt")]
        dt: f32,
    },
    /// Run frames until nothing is pending
    Settle {
        #[serde(default = "default_max_frames")]
        max_frames: usize,
    },
    Wheel { delta: f32 },
    /// Native scroll to an offset
    Scroll { y: f32 },
    Resize { width: f32, height: f32 },
    /// Navigate to one of the scenario's pages
    Navigate { path: String },
    /// Finish loading every image matching `selector`
    ImageLoad {
        #[serde(default = "default_image_selector")]
        selector: String,
    },
    Pointer { x: f32, y: f32 },
}

/// A parsed scenario file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: StageConfig,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub viewport: Viewport,
    /// Persistent elements outside the page container
    #[serde(default)]
    pub chrome: Vec<NodeSpec>,
    /// The page the stage boots on
    pub page: PageSpec,
    /// Navigation targets, looked up by path
    #[serde(default)]
    pub pages: Vec<PageSpec>,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// What a run produced
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub frames: usize,
    pub navigations: Vec<NavigationOutcome>,
    pub stage: StageReport,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let scenario: Scenario = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario.check()?;
        Ok(scenario)
    }

    /// Validate the config and every navigation target
    pub fn check(&self) -> Result<()> {
        self.config.validate().context("Invalid stage config")?;
        for event in &self.events {
            match event {
                Event::Navigate { path } if self.target(path).is_none() => {
                    anyhow::bail!("Navigation to '{}' has no matching page", path);
                }
                Event::ImageLoad { selector } => {
                    Selector::parse(selector)
                        .with_context(|| format!("Invalid image selector '{}'", selector))?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn target(&self, path: &str) -> Option<&PageSpec> {
        self.pages.iter().find(|page| page.path == path)
    }

    /// Build the stage, boot it and replay every event
    pub fn run(&self) -> Result<RunReport> {
        let mut doc = MemoryDocument::new(self.viewport.width, self.viewport.height)
            .with_chrome(self.chrome.iter().cloned());
        doc.mount_page(&self.page)
            .with_context(|| format!("Failed to mount {}", self.page.path))?;

        let environment = Environment::new(self.user_agent.clone());
        let mut stage = Stage::new(doc, self.config.clone(), &environment)?;
        info!(device = ?stage.device(), path = %self.page.path, events = self.events.len(), "running scenario");
        stage.boot();

        let mut frames = 0;
        let mut navigations = Vec::new();
        for event in &self.events {
            debug!(?event, "event");
            match event {
                Event::Frames { count, dt } => {
                    for _ in 0..*count {
                        stage.frame(*dt);
                    }
                    frames += count;
                }
                Event::Settle { max_frames } => {
                    frames += stage.run_until_settled(DEFAULT_DT, *max_frames);
                }
                Event::Wheel { delta } => stage.wheel(*delta),
                Event::Scroll { y } => stage.native_scroll(*y),
                Event::Resize { width, height } => {
                    stage.document_mut().resize_viewport(*width, *height);
                    stage.resize();
                }
                Event::Navigate { path } => {
                    let page = self
                        .target(path)
                        .with_context(|| format!("Navigation to '{}' has no matching page", path))?;
                    navigations.push(stage.navigate(page.clone()));
                }
                Event::ImageLoad { selector } => {
                    let selector = Selector::parse(selector)?;
                    let images = query_all(stage.document(), &selector);
                    for image in images {
                        stage.document_mut().complete_image(image);
                    }
                    stage.image_loaded();
                }
                Event::Pointer { x, y } => stage.pointer_move(*x, *y),
            }
        }

        info!(frames, path = stage.document().path(), "scenario finished");
        Ok(RunReport {
            frames,
            navigations,
            stage: stage.report(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
        [page]
        path = "/"

        [[page.nodes]]
        height = 800.0

        [[page.nodes]]
        classes = ["images-stack"]

        [[page.nodes.children]]
        classes = ["image-wrap"]
        [[page.nodes.children.children]]
        tag = "img"
        image = { height = 600.0 }

        [[page.nodes.children]]
        classes = ["image-wrap"]
        [[page.nodes.children.children]]
        tag = "img"
        image = { height = 600.0 }

        [[page.nodes]]
        height = 1200.0

        [[pages]]
        path = "/about"

        [[pages.nodes]]
        height = 2000.0

        [[events]]
        type = "settle"

        [[events]]
        type = "navigate"
        path = "/about"

        [[events]]
        type = "settle"
    "#;

    #[test]
    fn test_parse_and_run() {
        let scenario: Scenario = toml::from_str(SCENARIO).unwrap();
        scenario.check().unwrap();
        assert_eq!(scenario.events.len(), 3);
        assert_eq!(scenario.viewport.height, 800.0);

        let report = scenario.run().unwrap();
        assert_eq!(report.navigations.len(), 1);
        assert!(report.navigations[0].is_started());
        assert_eq!(report.stage.path, "/about");
        assert_eq!(report.stage.transitions.completed, 1);
        assert!(serde_json::to_string(&report).is_ok());
    }

    #[test]
    fn test_unknown_navigation_target() {
        let mut scenario: Scenario = toml::from_str(SCENARIO).unwrap();
        scenario.pages.clear();
        assert!(scenario.check().is_err());
    }
}
