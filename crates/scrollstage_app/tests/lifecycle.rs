//! Stage lifecycle tests against the headless document

use scrollstage_app::{NavigationOutcome, Stage, TransitionPhase};
use scrollstage_core::{
    props, query, query_all, Document, Environment, FixedRotations, MemoryDocument, NodeSpec,
    OverlapPolicy, PageSpec, Selector, StageConfig,
};
use scrollstage_effects::{ImageHeightStatus, StackingOutcome, DARK_CLASS, PINNED_CLASS};
use scrollstage_scroll::Subsystem;

const DT: f32 = 1.0 / 60.0;
const SETTLE_FRAMES: usize = 1200;

fn desktop() -> Environment {
    Environment::new("Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15")
}

fn mobile() -> Environment {
    Environment::new("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Mobile/15E148")
}

fn sel(s: &str) -> Selector {
    Selector::parse(s).unwrap()
}

fn chrome() -> Vec<NodeSpec> {
    vec![
        NodeSpec::div().class("nav"),
        NodeSpec::div().class("overlay"),
        NodeSpec::div().class("white-drawer"),
        NodeSpec::div()
            .class("page-loader")
            .height(800.0)
            .child(NodeSpec::div().class("loader-number").text("0")),
    ]
}

/// Hero, a stack of three 600px images, then a dark section
fn stack_page(path: &str, loaded: bool) -> PageSpec {
    let wrap = || {
        NodeSpec::div()
            .class("image-wrap")
            .child(NodeSpec::new("img").image(600.0, loaded))
    };
    PageSpec::new(path)
        .node(NodeSpec::div().height(800.0))
        .node(NodeSpec::div().class("images-stack").children([wrap(), wrap(), wrap()]))
        .node(NodeSpec::div().attr("data-theme", "to-dark").height(1000.0))
        .node(NodeSpec::div().height(1000.0))
}

/// Dark section from 1000 to 2000, no stack
fn dark_page(path: &str) -> PageSpec {
    PageSpec::new(path)
        .node(NodeSpec::div().height(1000.0))
        .node(NodeSpec::div().attr("data-theme", "to-dark").height(1000.0))
        .node(NodeSpec::div().height(2000.0))
}

fn document(page: &PageSpec) -> MemoryDocument {
    let mut doc = MemoryDocument::new(1280.0, 800.0).with_chrome(chrome());
    doc.mount_page(page).unwrap();
    doc
}

fn stage_with(page: &PageSpec, config: StageConfig, environment: &Environment) -> Stage<MemoryDocument> {
    Stage::new(document(page), config, environment)
        .unwrap()
        .with_rotation_source(Box::new(FixedRotations::new([2.0, -3.0, 4.0])))
}

fn booted(page: &PageSpec, config: StageConfig, environment: &Environment) -> Stage<MemoryDocument> {
    let mut stage = stage_with(page, config, environment);
    stage.boot();
    stage.run_until_settled(DT, SETTLE_FRAMES);
    assert!(stage.is_booted());
    stage
}

fn frames(stage: &mut Stage<MemoryDocument>, count: usize) {
    for _ in 0..count {
        stage.frame(DT);
    }
}

fn triggers_on_live_elements(stage: &Stage<MemoryDocument>) -> bool {
    let registry = stage.registry();
    [Subsystem::Stacking, Subsystem::Theme, Subsystem::Page]
        .into_iter()
        .flat_map(|subsystem| registry.ids(subsystem))
        .all(|id| registry.element(id).is_some_and(|el| stage.document().contains(el)))
}

#[test]
fn test_boot_waits_for_loader() {
    let mut stage = stage_with(&stack_page("/", true), StageConfig::default(), &desktop());
    stage.boot();
    assert!(!stage.is_booted());
    assert!(stage.registry().is_empty());

    // The counter runs for 3.3s before the loader collapses
    frames(&mut stage, 60);
    assert!(!stage.is_booted());
    assert!(stage.registry().is_empty());

    stage.run_until_settled(DT, SETTLE_FRAMES);
    assert!(stage.is_booted());

    let doc = stage.document();
    let number = query(doc, &sel(".loader-number")).unwrap();
    assert_eq!(doc.text(number), Some("100"));
    let loader = query(doc, &sel(".page-loader")).unwrap();
    assert_eq!(doc.rect(loader).unwrap().height, 0.0);

    let report = stage.report();
    assert_eq!(report.triggers.stacking, 3);
    assert_eq!(report.triggers.theme, 1);
    assert_eq!(report.stacking, Some(StackingOutcome::Initialized { images: 3 }));
    assert!(report.state.smooth_scroll_enabled);
    assert!(stage.emulator().is_some());
}

#[test]
fn test_navigation_before_boot_is_not_ready() {
    let mut stage = stage_with(&dark_page("/"), StageConfig::default(), &desktop());
    assert_eq!(stage.navigate(dark_page("/about")), NavigationOutcome::NotReady);
    stage.boot();
    assert_eq!(stage.navigate(dark_page("/about")), NavigationOutcome::NotReady);
    assert_eq!(stage.document().path(), "/");
}

#[test]
fn test_navigation_rebuilds_observers_after_enter() {
    let mut stage = booted(&stack_page("/", true), StageConfig::default(), &desktop());
    assert!(!stage.registry().is_empty());

    let outcome = stage.navigate(dark_page("/about"));
    assert!(outcome.is_started());
    assert_eq!(stage.phase(), TransitionPhase::Leaving);

    let mut guard = 0;
    while stage.phase() == TransitionPhase::Leaving {
        assert_eq!(stage.document().path(), "/");
        stage.frame(DT);
        guard += 1;
        assert!(guard < SETTLE_FRAMES);
    }

    // Entering: the new page is in, nothing observes anything yet
    assert_eq!(stage.document().path(), "/about");
    while stage.phase() == TransitionPhase::Entering {
        assert!(stage.registry().is_empty());
        stage.frame(DT);
        guard += 1;
        assert!(guard < SETTLE_FRAMES);
    }

    stage.run_until_settled(DT, SETTLE_FRAMES);
    assert!(triggers_on_live_elements(&stage));

    let report = stage.report();
    assert_eq!(report.phase, TransitionPhase::Idle);
    assert_eq!(report.triggers.stacking, 0);
    assert_eq!(report.triggers.theme, 1);
    assert_eq!(report.stacking, Some(StackingOutcome::NoImages));
    assert_eq!(report.transitions.completed, 1);
    assert_eq!(report.scroll, 0.0);
}

#[test]
fn test_ignore_policy_refuses_overlap() {
    let mut stage = booted(&dark_page("/"), StageConfig::default(), &desktop());

    assert!(stage.navigate(dark_page("/a")).is_started());
    frames(&mut stage, 5);
    assert_eq!(stage.navigate(dark_page("/b")), NavigationOutcome::Refused);

    stage.run_until_settled(DT, SETTLE_FRAMES);
    let report = stage.report();
    assert_eq!(report.path, "/a");
    assert_eq!(report.transitions.refused, 1);
    assert_eq!(report.transitions.completed, 1);
}

#[test]
fn test_supersede_policy_drops_stale_steps() {
    let mut config = StageConfig::default();
    config.navigation.overlap = OverlapPolicy::Supersede;
    let mut stage = booted(&dark_page("/"), config, &desktop());

    let first = stage.navigate(dark_page("/a"));
    frames(&mut stage, 10);
    assert_eq!(stage.phase(), TransitionPhase::Leaving);

    let second = stage.navigate(dark_page("/b"));
    match (first, second) {
        (NavigationOutcome::Started { generation: a }, NavigationOutcome::Superseded { generation: b }) => {
            assert!(b > a)
        }
        other => panic!("unexpected outcomes {other:?}"),
    }

    stage.run_until_settled(DT, SETTLE_FRAMES);
    let report = stage.report();
    assert_eq!(report.path, "/b");
    assert!(report.dropped_steps > 0);
    assert_eq!(report.transitions.superseded, 1);
    assert_eq!(report.transitions.completed, 1);
    assert!(triggers_on_live_elements(&stage));
}

#[test]
fn test_resize_burst_refreshes_once() {
    let mut stage = booted(&dark_page("/"), StageConfig::default(), &desktop());
    let baseline = stage.registry().stats().forced_refreshes;

    for _ in 0..5 {
        stage.resize();
        stage.frame(0.02);
    }
    frames(&mut stage, 60);

    assert_eq!(stage.registry().stats().forced_refreshes, baseline + 1);
    assert_eq!(stage.report().resize_rebuilds, 1);
}

#[test]
fn test_resize_burst_on_stack_refreshes_once() {
    let mut stage = booted(&stack_page("/", true), StageConfig::default(), &desktop());
    assert!(matches!(stage.report().images, Some(ImageHeightStatus::Applied { .. })));
    let baseline = stage.registry().stats().forced_refreshes;

    for _ in 0..5 {
        stage.resize();
        stage.frame(0.02);
    }
    frames(&mut stage, 60);

    let report = stage.report();
    assert_eq!(report.registry.forced_refreshes, baseline + 1);
    assert_eq!(report.resize_rebuilds, 1);
    assert_eq!(report.triggers.stacking, 3);
    assert_eq!(report.stacking, Some(StackingOutcome::Initialized { images: 3 }));

    // The rebuilt triggers still pin
    stage.native_scroll(1400.0);
    stage.frame(DT);
    assert_eq!(stage.stack().pinned_count(), 2);
}

#[test]
fn test_mobile_has_no_stacking_or_smoothing() {
    let mut stage = booted(&stack_page("/", true), StageConfig::default(), &mobile());

    let report = stage.report();
    assert_eq!(report.triggers.stacking, 0);
    assert_eq!(report.triggers.theme, 1);
    assert_eq!(report.stacking, Some(StackingOutcome::SkippedMobile));
    assert!(!report.state.smooth_scroll_enabled);
    assert!(stage.emulator().is_none());

    stage.wheel(500.0);
    stage.frame(DT);
    assert_eq!(stage.document().scroll_y(), 500.0);
}

#[test]
fn test_stack_pins_while_scrolling() {
    let mut stage = booted(&stack_page("/", true), StageConfig::default(), &desktop());

    stage.native_scroll(1400.0);
    stage.frame(DT);
    {
        let stack = stage.stack();
        assert_eq!(stack.pinned_count(), 2);
        assert_eq!(stack.stack_order(1), Some(0));
        assert_eq!(stack.stack_order(0), Some(1));
        assert!(stack.is_dense());
    }
    let wraps = query_all(stage.document(), &sel(".image-wrap"));
    assert!(stage.document().has_class(wraps[0], PINNED_CLASS));
    assert!(!stage.document().has_class(wraps[2], PINNED_CLASS));

    stage.native_scroll(0.0);
    stage.frame(DT);
    assert_eq!(stage.stack().pinned_count(), 0);
}

#[test]
fn test_dark_mode_is_sticky_and_cleared_on_navigation() {
    let mut stage = booted(&dark_page("/"), StageConfig::default(), &desktop());
    let body = stage.document().body();

    stage.native_scroll(1000.0);
    stage.frame(DT);
    assert!(stage.state().dark_mode_active());
    assert!(stage.document().has_class(body, DARK_CLASS));

    // No light markers, so leaving forward keeps it dark
    stage.native_scroll(2500.0);
    stage.frame(DT);
    assert!(stage.state().dark_mode_active());

    stage.navigate(PageSpec::new("/plain").node(NodeSpec::div().height(2000.0)));
    stage.run_until_settled(DT, SETTLE_FRAMES);
    assert!(!stage.state().dark_mode_active());
    assert!(!stage.document().has_class(body, DARK_CLASS));
}

#[test]
fn test_refresh_without_stacking_fires_nothing() {
    let mut stage = booted(&stack_page("/", true), StageConfig::default(), &desktop());
    let fired = stage.registry().stats().callbacks_fired;

    stage.refresh_scroll_observers(false);
    let report = stage.report();
    assert_eq!(report.registry.callbacks_fired, fired);
    assert_eq!(report.triggers.stacking, 0);
    assert_eq!(report.triggers.theme, 1);
}

#[test]
fn test_image_heights_wait_for_loads() {
    let mut stage = booted(&stack_page("/", false), StageConfig::default(), &desktop());
    assert_eq!(stage.report().images, Some(ImageHeightStatus::Pending { loading: 3 }));
    let forced = stage.registry().stats().forced_refreshes;

    let images = query_all(stage.document(), &sel(".images-stack img"));
    for (i, &img) in images.iter().enumerate() {
        stage.document_mut().complete_image(img);
        stage.image_loaded();
        if i + 1 < images.len() {
            assert!(matches!(stage.report().images, Some(ImageHeightStatus::Pending { .. })));
        }
    }

    assert!(matches!(stage.report().images, Some(ImageHeightStatus::Applied { .. })));
    assert_eq!(stage.registry().stats().forced_refreshes, forced + 1);
}

#[test]
fn test_refresh_without_stacking_unpins_the_stack() {
    let mut stage = booted(&stack_page("/", true), StageConfig::default(), &desktop());
    stage.native_scroll(1400.0);
    stage.frame(DT);
    assert_eq!(stage.stack().pinned_count(), 2);
    let wraps = query_all(stage.document(), &sel(".image-wrap"));

    stage.refresh_scroll_observers(false);
    let report = stage.report();
    assert_eq!(report.triggers.stacking, 0);
    assert!(report.stack.iter().all(|image| !image.pinned));
    assert_eq!(report.stacking, None);
    for &wrap in &wraps {
        assert!(!stage.document().has_class(wrap, PINNED_CLASS));
        assert_eq!(stage.document().style(wrap, props::Z_ORDER), None);
        assert_eq!(stage.document().style(wrap, props::ROTATION), None);
    }

    stage.native_scroll(0.0);
    stage.frame(DT);
    assert_eq!(stage.stack().pinned_count(), 0);
    assert!(!stage.document().has_class(wraps[0], PINNED_CLASS));

    // A later rebuild starts from a clean stack
    stage.refresh_scroll_observers(true);
    frames(&mut stage, 30);
    stage.native_scroll(1400.0);
    stage.frame(DT);
    assert_eq!(stage.stack().pinned_count(), 2);
    assert!(stage.document().has_class(wraps[0], PINNED_CLASS));
}

#[test]
fn test_navigation_clears_the_pinned_stack() {
    let mut stage = booted(&stack_page("/", true), StageConfig::default(), &desktop());
    stage.native_scroll(1400.0);
    stage.frame(DT);
    assert_eq!(stage.stack().pinned_count(), 2);

    assert!(stage.navigate(dark_page("/about")).is_started());
    let mut guard = 0;
    while stage.phase() == TransitionPhase::Leaving {
        stage.frame(DT);
        guard += 1;
        assert!(guard < SETTLE_FRAMES);
    }
    assert!(stage.stack().is_empty());
    assert!(stage.report().stack.is_empty());

    stage.run_until_settled(DT, SETTLE_FRAMES);
    assert_eq!(stage.report().stacking, Some(StackingOutcome::NoImages));
}

#[test]
fn test_pinned_class_is_configurable() {
    let mut config = StageConfig::default();
    config.stacking.pinned_class = "is-stacked".to_string();
    let mut stage = booted(&stack_page("/", true), config, &desktop());

    stage.native_scroll(1400.0);
    stage.frame(DT);
    let wraps = query_all(stage.document(), &sel(".image-wrap"));
    assert!(stage.document().has_class(wraps[0], "is-stacked"));
    assert!(!stage.document().has_class(wraps[0], PINNED_CLASS));

    stage.native_scroll(0.0);
    stage.frame(DT);
    assert!(!stage.document().has_class(wraps[0], "is-stacked"));
}
