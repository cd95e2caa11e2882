//! Dark/light theme switching
//!
//! Sections marked `data-theme="to-dark"` turn the body dark while they
//! straddle the viewport's midline; `to-light` sections do the opposite.
//! A page with dark markers but no light ones stays dark after scrolling
//! past its last dark section.

use serde::Serialize;
use tracing::{debug, trace};

use scrollstage_core::{query_all, Document, ElementId, SharedScrollState};
use scrollstage_scroll::{Anchor, BoundaryRule, Subsystem, TriggerContext, TriggerSpec};

use crate::EffectCx;

/// Body class present while dark mode is active
pub const DARK_CLASS: &str = "is--dark";

/// Whether leaving a dark section should keep dark mode on
pub fn should_stay_dark(light_markers: usize) -> bool {
    light_markers == 0
}

/// Result of a theme pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "outcome")]
pub enum ThemeOutcome {
    NoMarkers,
    Initialized { dark: usize, light: usize },
}

/// Builds theme triggers and owns the dark flag
#[derive(Debug, Clone)]
pub struct ThemeSwitcher {
    state: SharedScrollState,
}

impl ThemeSwitcher {
    pub fn new(state: SharedScrollState) -> Self {
        Self { state }
    }

    /// Turn dark mode off without waiting for a trigger
    pub fn clear(&self, doc: &mut dyn Document) {
        apply(&self.state, doc, false);
    }

    pub fn init(&self, cx: &mut EffectCx<'_>) -> ThemeOutcome {
        cx.registry.teardown(cx.document, Subsystem::Theme);

        let dark = query_all(cx.document, &cx.selectors.dark_marker);
        let light = query_all(cx.document, &cx.selectors.light_marker);
        if dark.is_empty() && light.is_empty() {
            debug!("no theme markers");
            return ThemeOutcome::NoMarkers;
        }

        let stay_dark = should_stay_dark(light.len());
        for &section in &dark {
            let spec = marker_spec(section)
                .on_enter(self.setter(true))
                .on_enter_back(self.setter(true))
                .on_leave(self.setter(stay_dark))
                .on_leave_back(self.setter(false));
            cx.registry.create(cx.document, spec);
        }
        for &section in &light {
            let spec = marker_spec(section)
                .on_enter(self.setter(false))
                .on_enter_back(self.setter(false))
                .on_leave(self.setter(true))
                .on_leave_back(self.setter(true));
            cx.registry.create(cx.document, spec);
        }

        debug!(dark = dark.len(), light = light.len(), stay_dark, "theme initialized");
        ThemeOutcome::Initialized {
            dark: dark.len(),
            light: light.len(),
        }
    }

    fn setter(&self, active: bool) -> impl FnMut(&mut TriggerContext<'_>) + 'static {
        let state = self.state.clone();
        move |cx: &mut TriggerContext<'_>| apply(&state, cx.document, active)
    }
}

/// Active while the section straddles the viewport midline
fn marker_spec(section: ElementId) -> TriggerSpec {
    TriggerSpec::new(Subsystem::Theme, section)
        .start(BoundaryRule::new(Anchor::TOP, Anchor::Fraction(0.5)))
        .end(BoundaryRule::new(Anchor::BOTTOM, Anchor::Fraction(0.5)))
}

fn apply(state: &SharedScrollState, doc: &mut dyn Document, active: bool) {
    let body = doc.body();
    if active {
        doc.add_class(body, DARK_CLASS);
    } else {
        doc.remove_class(body, DARK_CLASS);
    }
    if state.set_dark_mode(active) {
        trace!(active, "dark mode changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use scrollstage_animation::Animator;
    use scrollstage_core::{DeviceClass, MemoryDocument, NodeSpec, PageSpec, StageConfig};
    use scrollstage_scroll::TriggerRegistry;

    fn marker(theme: &str) -> NodeSpec {
        NodeSpec::div().attr("data-theme", theme).height(400.0)
    }

    struct Harness {
        doc: MemoryDocument,
        registry: TriggerRegistry,
        animator: Animator,
        state: SharedScrollState,
    }

    impl Harness {
        /// 1000px spacer, then the sections, then a 2000px spacer
        fn new(sections: Vec<NodeSpec>) -> Self {
            let mut doc = MemoryDocument::new(1280.0, 800.0);
            let mut page = PageSpec::new("/").node(NodeSpec::div().height(1000.0));
            for section in sections {
                page = page.node(section);
            }
            doc.mount_page(&page.node(NodeSpec::div().height(2000.0)))
                .unwrap();
            Self {
                doc,
                registry: TriggerRegistry::new(),
                animator: Animator::new(),
                state: SharedScrollState::new(),
            }
        }

        fn init(&mut self) -> ThemeOutcome {
            let config = StageConfig::default();
            let selectors = config.selectors.compile().unwrap();
            let switcher = ThemeSwitcher::new(self.state.clone());
            let mut cx = EffectCx {
                document: &mut self.doc,
                registry: &mut self.registry,
                animator: &mut self.animator,
                config: &config,
                selectors: &selectors,
                device: DeviceClass::Desktop,
                state: &self.state,
            };
            switcher.init(&mut cx)
        }

        fn scroll(&mut self, y: f32) {
            self.doc.set_scroll_y(y);
            self.registry.update(&mut self.doc, &mut self.animator);
        }

        fn dark(&self) -> bool {
            let dark = self.state.dark_mode_active();
            assert_eq!(dark, self.doc.has_class(self.doc.body(), DARK_CLASS));
            dark
        }
    }

    #[test]
    fn test_should_stay_dark() {
        assert!(should_stay_dark(0));
        assert!(!should_stay_dark(2));
    }

    #[test]
    fn test_no_markers() {
        let mut harness = Harness::new(vec![NodeSpec::div().height(400.0)]);
        assert_eq!(harness.init(), ThemeOutcome::NoMarkers);
        assert!(harness.registry.is_empty());
    }

    #[test]
    fn test_sticky_dark_without_light_markers() {
        // Dark section spans 1000..1400, active for scroll 600..1000
        let mut harness = Harness::new(vec![marker("to-dark")]);
        assert_eq!(harness.init(), ThemeOutcome::Initialized { dark: 1, light: 0 });

        harness.scroll(700.0);
        assert!(harness.dark());
        harness.scroll(1200.0);
        assert!(harness.dark());
        harness.scroll(800.0);
        assert!(harness.dark());
        harness.scroll(100.0);
        assert!(!harness.dark());
    }

    #[test]
    fn test_light_marker_clears_after_dark() {
        let mut harness = Harness::new(vec![marker("to-dark"), marker("to-light")]);
        assert_eq!(harness.init(), ThemeOutcome::Initialized { dark: 1, light: 1 });

        harness.scroll(700.0);
        assert!(harness.dark());
        // Past the dark section, inside the light one
        harness.scroll(1100.0);
        assert!(!harness.dark());
        // Back into the dark section
        harness.scroll(900.0);
        assert!(harness.dark());
    }

    #[test]
    fn test_reinit_replaces_theme_triggers() {
        let mut harness = Harness::new(vec![marker("to-dark"), marker("to-light")]);
        harness.init();
        harness.init();
        assert_eq!(harness.registry.count(Subsystem::Theme), 2);
    }
}
