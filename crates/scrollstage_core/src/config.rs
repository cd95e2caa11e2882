//! Stage configuration
//!
//! Every option has a default matching the production site, so an empty
//! TOML file (or no file at all) yields a working configuration:
//!
//! ```toml
//! [animation]
//! dur = 0.8
//! ease = "power4.out"
//!
//! [stacking]
//! rotation_range = 5.0
//! stack_offset = 0.5
//!
//! [timing]
//! resize_debounce_ms = 250
//! settle_delay_ms = 100
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SelectorError};
use crate::selector::Selector;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StageConfig {
    pub animation: AnimationConfig,
    pub stacking: StackingConfig,
    pub scroll: ScrollConfig,
    pub timing: TimingConfig,
    pub navigation: NavigationConfig,
    pub selectors: SelectorConfig,
}

impl StageConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check value ranges and selector syntax
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("expected a non-negative number, got {value}"),
                })
            }
        }

        non_negative("animation.dur", self.animation.dur)?;
        non_negative("animation.hero_dur", self.animation.hero_dur)?;
        non_negative("animation.hero_stagger", self.animation.hero_stagger)?;
        non_negative("animation.line_delay_factor", self.animation.line_delay_factor)?;
        non_negative("animation.border_radius", self.animation.border_radius)?;
        non_negative("stacking.rotation_range", self.stacking.rotation_range)?;
        non_negative("stacking.stack_offset", self.stacking.stack_offset)?;
        non_negative("stacking.pin_duration", self.stacking.pin_duration)?;
        non_negative("stacking.unpin_duration", self.stacking.unpin_duration)?;
        non_negative("scroll.wheel_multiplier", self.scroll.wheel_multiplier)?;
        non_negative("scroll.nav_threshold", self.scroll.nav_threshold)?;

        if !(self.scroll.lerp > 0.0 && self.scroll.lerp <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "scroll.lerp",
                reason: format!("expected a value in (0, 1], got {}", self.scroll.lerp),
            });
        }

        let class = &self.stacking.pinned_class;
        if class.is_empty() || class.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                field: "stacking.pinned_class",
                reason: format!("expected a single class name, got {class:?}"),
            });
        }

        self.selectors.compile()?;
        Ok(())
    }
}

/// Durations and easings shared by the page animations
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Base duration in seconds
    pub dur: f32,
    /// Default easing curve name
    pub ease: String,
    /// Scale of the outgoing page during the leave sequence
    pub scale_amount: f32,
    /// Corner radius of the outgoing page, in px
    pub border_radius: f32,
    /// Delay between hero characters, in seconds
    pub hero_stagger: f32,
    /// Duration of a single hero character reveal
    pub hero_dur: f32,
    /// Extra delay per hero line index
    pub line_delay_factor: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            dur: 0.8,
            ease: "power4.out".to_string(),
            scale_amount: 0.95,
            border_radius: 12.0,
            hero_stagger: 0.01,
            hero_dur: 0.8,
            line_delay_factor: 0.1,
        }
    }
}

/// Image stacking effect options
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StackingConfig {
    /// Rotations are sampled from `[-rotation_range, rotation_range]` degrees
    pub rotation_range: f32,
    /// End offset as a fraction of the viewport height
    pub stack_offset: f32,
    pub pin_duration: f32,
    pub pin_ease: String,
    pub unpin_duration: f32,
    /// Fixed seed for rotation sampling; a fresh seed per pass when absent
    pub rotation_seed: Option<u64>,
    /// Class added to an image wrap while it is pinned
    pub pinned_class: String,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            rotation_range: 5.0,
            stack_offset: 0.5,
            pin_duration: 0.6,
            pin_ease: "elastic.out(1, 0.5)".to_string(),
            unpin_duration: 0.3,
            rotation_seed: None,
            pinned_class: "--pinned".to_string(),
        }
    }
}

/// Smooth scrolling options (desktop only)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Fraction of the remaining distance covered per 60Hz frame
    pub lerp: f32,
    pub wheel_multiplier: f32,
    pub smooth_wheel: bool,
    pub infinite: bool,
    /// Scroll offset past which the nav gets its scrolled class, in px
    pub nav_threshold: f32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            lerp: 0.12,
            wheel_multiplier: 1.0,
            smooth_wheel: true,
            infinite: false,
            nav_threshold: 32.0,
        }
    }
}

/// Debounce and settle delays
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    pub resize_debounce_ms: u64,
    pub settle_delay_ms: u64,
}

impl TimingConfig {
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            resize_debounce_ms: 250,
            settle_delay_ms: 100,
        }
    }
}

/// What to do with a navigation requested while another is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Refuse the new request; the in-flight navigation completes
    #[default]
    Ignore,
    /// Abandon the in-flight navigation and start the new one
    Supersede,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub overlap: OverlapPolicy,
}

/// Selectors for the elements the effects look for
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub stack_container: String,
    pub stack_item: String,
    pub stack_image: String,
    pub dark_marker: String,
    pub light_marker: String,
    pub nav: String,
    pub overlay: String,
    pub drawer: String,
    pub hero_line: String,
    pub hero_text: String,
    pub hero_bg: String,
    pub loader: String,
    pub loader_number: String,
    pub fade: String,
    pub fade_title: String,
    pub fade_only: String,
    pub height_reveal: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            stack_container: ".images-stack".to_string(),
            stack_item: ".images-stack .image-wrap".to_string(),
            stack_image: ".images-stack img".to_string(),
            dark_marker: r#"[data-theme="to-dark"]"#.to_string(),
            light_marker: r#"[data-theme="to-light"]"#.to_string(),
            nav: ".nav".to_string(),
            overlay: ".overlay".to_string(),
            drawer: ".white-drawer".to_string(),
            hero_line: ".hero-line".to_string(),
            hero_text: "h1, p, span".to_string(),
            hero_bg: ".gi".to_string(),
            loader: ".page-loader".to_string(),
            loader_number: ".loader-number".to_string(),
            fade: r#"[data-transition="fade"]"#.to_string(),
            fade_title: r#"[data-transition="fade-title"]"#.to_string(),
            fade_only: r#"[data-transition="fade-only"]"#.to_string(),
            height_reveal: r#"[data-transition="height"]"#.to_string(),
        }
    }
}

impl SelectorConfig {
    /// Parse every selector
    pub fn compile(&self) -> Result<Selectors, SelectorError> {
        Ok(Selectors {
            stack_container: Selector::parse(&self.stack_container)?,
            stack_item: Selector::parse(&self.stack_item)?,
            stack_image: Selector::parse(&self.stack_image)?,
            dark_marker: Selector::parse(&self.dark_marker)?,
            light_marker: Selector::parse(&self.light_marker)?,
            nav: Selector::parse(&self.nav)?,
            overlay: Selector::parse(&self.overlay)?,
            drawer: Selector::parse(&self.drawer)?,
            hero_line: Selector::parse(&self.hero_line)?,
            hero_text: Selector::parse(&self.hero_text)?,
            hero_bg: Selector::parse(&self.hero_bg)?,
            loader: Selector::parse(&self.loader)?,
            loader_number: Selector::parse(&self.loader_number)?,
            fade: Selector::parse(&self.fade)?,
            fade_title: Selector::parse(&self.fade_title)?,
            fade_only: Selector::parse(&self.fade_only)?,
            height_reveal: Selector::parse(&self.height_reveal)?,
        })
    }
}

/// Parsed form of [`SelectorConfig`]
#[derive(Debug, Clone)]
pub struct Selectors {
    pub stack_container: Selector,
    pub stack_item: Selector,
    pub stack_image: Selector,
    pub dark_marker: Selector,
    pub light_marker: Selector,
    pub nav: Selector,
    pub overlay: Selector,
    pub drawer: Selector,
    pub hero_line: Selector,
    /// Text elements inside a hero line that get split into characters
    pub hero_text: Selector,
    pub hero_bg: Selector,
    pub loader: Selector,
    pub loader_number: Selector,
    /// Page-enter reveal groups, keyed by `data-transition`
    pub fade: Selector,
    pub fade_title: Selector,
    pub fade_only: Selector,
    pub height_reveal: Selector,
}
