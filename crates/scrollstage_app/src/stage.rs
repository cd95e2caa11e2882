//! The stage
//!
//! [`Stage`] owns the document, the trigger registry, the animator and the
//! scroll emulator, and drives them from host input:
//!
//! - [`boot`](Stage::boot) runs the loader, then attaches smooth scrolling,
//!   builds the scroll observers and plays the page-enter animations
//! - [`navigate`](Stage::navigate) runs a page transition
//! - [`resize`](Stage::resize) is debounced into one forced refresh
//! - [`frame`](Stage::frame) advances scrolling, animations and any pending
//!   lifecycle steps
//!
//! Lifecycle work that has to wait (a timeline, the settle delay) is queued
//! in a [`Pipeline`] and runs from `frame`.

use std::cell::{Cell, Ref};
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, warn};

use scrollstage_animation::{Animator, AnimatorEvent, TimelineId};
use scrollstage_core::{
    props, query_all, DeviceClass, Document, Environment, PageSpec, RotationSource, Selectors,
    SharedScrollState, StageConfig,
};
use scrollstage_effects::{
    ensure_image_heights, update_body_class, update_nav_state, EffectCx, HeroBackground,
    ImageHeightStatus, StackState, StackingEngine, StackingOutcome, ThemeOutcome, ThemeSwitcher,
};
use scrollstage_scroll::{
    Debouncer, EmulatorHandle, ListenerId, ScrollEmulator, Subsystem, TriggerRegistry,
};

use crate::enter::{page_enter_timeline, RESIZE_MARKER};
use crate::error::Result;
use crate::loader::Loader;
use crate::pipeline::{Pipeline, Step};
use crate::report::{StageReport, TriggerCounts};
use crate::transition::{
    leave_timeline, Admission, NavigationOutcome, TransitionController, TransitionPhase,
};

/// Deferred lifecycle work
#[derive(Debug, Clone)]
enum Action {
    FinishBoot,
    Leave,
    Enter(PageSpec),
    ResumeScroll,
    AfterEnter,
    /// Runs once the settle delay has passed after an observer rebuild
    Settled { refresh: bool, theme: bool },
}

/// Everything the effects operate on
struct Host<D> {
    document: D,
    registry: TriggerRegistry,
    animator: Animator,
    config: StageConfig,
    selectors: Selectors,
    device: DeviceClass,
    state: SharedScrollState,
}

impl<D: Document> Host<D> {
    fn cx(&mut self) -> EffectCx<'_> {
        EffectCx {
            document: &mut self.document,
            registry: &mut self.registry,
            animator: &mut self.animator,
            config: &self.config,
            selectors: &self.selectors,
            device: self.device,
            state: &self.state,
        }
    }

    fn refresh(&mut self, force: bool) {
        self.registry.refresh(&mut self.document, &mut self.animator, force);
    }

    fn update(&mut self) {
        self.registry.update(&mut self.document, &mut self.animator);
    }

    /// Drawer below the fold, overlay transparent
    fn reset_chrome(&mut self) {
        for drawer in query_all(&self.document, &self.selectors.drawer) {
            self.animator.set(&mut self.document, drawer, &[(props::Y_PERCENT, 100.0)]);
        }
        for overlay in query_all(&self.document, &self.selectors.overlay) {
            self.animator.set(&mut self.document, overlay, &[(props::OPACITY, 0.0)]);
        }
    }
}

/// Page-transition choreography and scroll effects over a [`Document`]
pub struct Stage<D: Document> {
    host: Host<D>,
    emulator: Option<EmulatorHandle>,
    scroll_listener: Option<ListenerId>,
    scrolled: Rc<Cell<bool>>,
    last_scroll: f32,
    stacking: StackingEngine,
    theme: ThemeSwitcher,
    hero_bg: HeroBackground,
    loader: Option<Loader>,
    transition: TransitionController,
    transition_timeline: Option<TimelineId>,
    pipeline: Pipeline<Action>,
    resize: Debouncer,
    clock: Duration,
    booting: bool,
    booted: bool,
    images: Option<ImageHeightStatus>,
    stacking_outcome: Option<StackingOutcome>,
    theme_outcome: Option<ThemeOutcome>,
    resize_rebuilds: u32,
}

impl<D: Document> Stage<D> {
    /// Validate `config` and classify the device
    pub fn new(document: D, config: StageConfig, environment: &Environment) -> Result<Self> {
        config.validate()?;
        let selectors = config.selectors.compile()?;
        let device = environment.device();
        let state = SharedScrollState::new();
        state.set_viewport_height(document.viewport_height());

        let stacking = StackingEngine::from_config(&config.stacking);
        let theme = ThemeSwitcher::new(state.clone());
        let transition = TransitionController::new(config.navigation.overlap);
        let resize = Debouncer::new(config.timing.resize_debounce());
        info!(?device, path = document.path(), "stage created");

        Ok(Self {
            host: Host {
                document,
                registry: TriggerRegistry::new(),
                animator: Animator::new(),
                config,
                selectors,
                device,
                state,
            },
            emulator: None,
            scroll_listener: None,
            scrolled: Rc::new(Cell::new(false)),
            last_scroll: 0.0,
            stacking,
            theme,
            hero_bg: HeroBackground::new(),
            loader: None,
            transition,
            transition_timeline: None,
            pipeline: Pipeline::new(),
            resize,
            clock: Duration::ZERO,
            booting: false,
            booted: false,
            images: None,
            stacking_outcome: None,
            theme_outcome: None,
            resize_rebuilds: 0,
        })
    }

    /// Replace the stack rotation source
    pub fn with_rotation_source(mut self, rotation: Box<dyn RotationSource>) -> Self {
        self.stacking = StackingEngine::new(rotation);
        self
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start the loader; the rest of the boot runs once it finishes
    pub fn boot(&mut self) {
        if self.booting || self.booted {
            return;
        }
        self.booting = true;
        self.host.reset_chrome();

        let host = &mut self.host;
        self.loader = Loader::start(
            &mut host.document,
            &mut host.animator,
            &host.selectors,
            &host.config.animation,
        );
        if let Some(loader) = &self.loader {
            self.pipeline.push(Step::AwaitTimeline(loader.timeline()));
        }
        self.pipeline.push(Step::Run(Action::FinishBoot));
        self.pump();
    }

    fn finish_boot(&mut self) {
        if self.host.device.is_desktop() {
            let emulator = ScrollEmulator::attach(self.host.config.scroll.clone(), &self.host.document);
            self.emulator = Some(EmulatorHandle::new(emulator));
            self.host.state.set_smooth_scroll(true);
        } else {
            self.host.state.set_smooth_scroll(false);
            debug!("smooth scrolling disabled on mobile");
        }

        self.configure_scroll_observers();
        self.page_enter_animations();
        update_body_class(&mut self.host.document);
        self.hero_bg.attach(&self.host.document, &self.host.selectors.hero_bg);
        self.booting = false;
        self.booted = true;
        info!(path = self.host.document.path(), "stage booted");
    }

    /// Rebuild every observer for the current page
    ///
    /// Stacking triggers are built right away; the forced refresh and the
    /// theme markers follow after the settle delay.
    pub fn configure_scroll_observers(&mut self) {
        self.host.registry.teardown_all(&mut self.host.document);
        self.install_scroller_proxy();
        let outcome = self.build_stacking();
        self.host.refresh(false);
        self.schedule_settled(matches!(outcome, StackingOutcome::Initialized { .. }), true);
    }

    /// Tear down and refresh; optionally rebuild stacking too
    ///
    /// Without a rebuild the stack is unpinned, since no trigger is left to
    /// release it.
    pub fn refresh_scroll_observers(&mut self, rebuild_stacking: bool) {
        self.host.registry.teardown_all(&mut self.host.document);
        self.install_scroller_proxy();
        if rebuild_stacking {
            self.host.refresh(false);
            let outcome = self.build_stacking();
            self.schedule_settled(matches!(outcome, StackingOutcome::Initialized { .. }), true);
        } else {
            self.reset_stacking();
            self.host.refresh(false);
            self.init_theme();
        }
    }

    /// Rebuild the stacking triggers, then force a refresh after the settle
    /// delay
    pub fn init_stacking_effect(&mut self) -> StackingOutcome {
        let outcome = self.build_stacking();
        if matches!(outcome, StackingOutcome::Initialized { .. }) {
            self.schedule_settled(true, false);
        }
        outcome
    }

    /// Build and play the page-enter timeline for the current page
    pub fn page_enter_animations(&mut self) -> Option<TimelineId> {
        let host = &mut self.host;
        match page_enter_timeline(
            &mut host.document,
            &mut host.animator,
            &host.selectors,
            &host.config.animation,
        ) {
            Ok(timeline) => Some(host.animator.play(&mut host.document, timeline)),
            Err(err) => {
                warn!(%err, "page enter animations skipped");
                None
            }
        }
    }

    fn build_stacking(&mut self) -> StackingOutcome {
        self.host.state.set_viewport_height(self.host.document.viewport_height());
        let outcome = self.stacking.init(&mut self.host.cx());
        self.stacking_outcome = Some(outcome);
        if matches!(outcome, StackingOutcome::Initialized { .. }) {
            self.check_image_heights();
        }
        outcome
    }

    fn reset_stacking(&mut self) {
        self.stacking.reset(&mut self.host.document, &mut self.host.animator);
        self.stacking_outcome = None;
    }

    fn init_theme(&mut self) {
        let outcome = self.theme.init(&mut self.host.cx());
        self.theme_outcome = Some(outcome);
        self.host.update();
    }

    fn check_image_heights(&mut self) {
        if matches!(self.images, Some(ImageHeightStatus::Applied { .. })) {
            return;
        }
        self.images = Some(ensure_image_heights(&mut self.host.cx()));
    }

    fn schedule_settled(&mut self, refresh: bool, theme: bool) {
        self.pipeline.push(Step::Settle(self.host.config.timing.settle_delay()));
        self.pipeline.push(Step::Run(Action::Settled { refresh, theme }));
    }

    /// Route the registry through the emulator and listen for its scrolls
    fn install_scroller_proxy(&mut self) {
        let Some(emulator) = &self.emulator else {
            self.host.registry.set_scroller_proxy(None);
            return;
        };
        self.host.registry.set_scroller_proxy(Some(Rc::new(emulator.clone())));
        if let Some(listener) = self.scroll_listener.take() {
            emulator.off(listener);
        }
        let scrolled = Rc::clone(&self.scrolled);
        self.scroll_listener = Some(emulator.on_scroll(move |_| scrolled.set(true)));
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Transition to `page`
    pub fn navigate(&mut self, page: PageSpec) -> NavigationOutcome {
        if !self.booted {
            warn!(path = %page.path, "navigation before boot finished");
            return NavigationOutcome::NotReady;
        }

        let admission = self.transition.request(&page.path);
        if admission == Admission::Refuse {
            return NavigationOutcome::Refused;
        }
        if let Some(running) = self.transition_timeline.take() {
            self.host.animator.kill_timeline(running);
        }

        let generation = self.pipeline.begin_generation();
        self.pipeline.push(Step::Run(Action::Leave));
        self.pipeline.push(Step::Run(Action::Enter(page)));
        self.pump();

        match admission {
            Admission::Supersede => NavigationOutcome::Superseded { generation },
            _ => NavigationOutcome::Started { generation },
        }
    }

    fn leave(&mut self) {
        if let Some(emulator) = &self.emulator {
            emulator.stop();
        }
        let host = &mut self.host;
        let timeline = leave_timeline(&host.document, &host.selectors, &host.config.animation);
        let id = host.animator.play(&mut host.document, timeline);
        self.transition_timeline = Some(id);
        self.pipeline.interpose([Step::AwaitTimeline(id)]);
    }

    fn enter(&mut self, page: PageSpec) {
        self.transition.leave_complete();
        self.transition_timeline = None;

        // Nothing may observe the outgoing page past this point
        self.host.registry.teardown_all(&mut self.host.document);
        self.reset_stacking();
        self.theme.clear(&mut self.host.document);

        if let Err(err) = self.host.document.mount_page(&page) {
            warn!(path = %page.path, %err, "page mount failed, navigation aborted");
            self.transition.abort();
            self.host.reset_chrome();
            if let Some(emulator) = &self.emulator {
                emulator.start();
            }
            self.configure_scroll_observers();
            return;
        }
        update_body_class(&mut self.host.document);
        self.images = None;

        if let Some(emulator) = &self.emulator {
            emulator.stop();
            emulator.jump_to(0.0);
        }
        self.host.document.set_scroll_y(0.0);
        self.last_scroll = 0.0;
        self.host.reset_chrome();

        let enter = self.page_enter_animations();
        self.transition_timeline = enter;
        self.hero_bg.attach(&self.host.document, &self.host.selectors.hero_bg);

        let settle = self.host.config.timing.settle_delay();
        let mut steps = vec![Step::Settle(settle), Step::Run(Action::ResumeScroll)];
        steps.extend(enter.map(Step::AwaitTimeline));
        steps.push(Step::Run(Action::AfterEnter));
        self.pipeline.interpose(steps);
        debug!(path = %page.path, "page entered");
    }

    fn resume_scroll(&mut self) {
        if let Some(emulator) = &self.emulator {
            emulator.resize(&self.host.document);
            emulator.start();
        }
    }

    fn after_enter(&mut self) {
        self.transition_timeline = None;
        self.configure_scroll_observers();
        self.transition.enter_complete();
        info!(path = self.host.document.path(), "navigation complete");
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Viewport size changed; the rebuild runs once resizing stops
    pub fn resize(&mut self) {
        self.resize.signal(self.clock);
    }

    /// One forced refresh per burst: deferred to the settle step when
    /// stacking is rebuilt, immediate otherwise
    fn resize_settled(&mut self) {
        self.resize_rebuilds += 1;
        let height = self.host.document.viewport_height();
        self.host.state.set_viewport_height(height);
        if let Some(emulator) = &self.emulator {
            emulator.resize(&self.host.document);
        }
        let outcome = if self.booted && self.transition.phase().is_idle() {
            Some(self.init_stacking_effect())
        } else {
            None
        };
        if !matches!(outcome, Some(StackingOutcome::Initialized { .. })) {
            self.host.refresh(true);
        }
        debug!(height, ?outcome, "resize handled");
    }

    /// Wheel input; native scrolling when smooth scrolling is off
    pub fn wheel(&mut self, delta: f32) {
        match &self.emulator {
            Some(emulator) => emulator.wheel(delta),
            None => {
                let doc = &mut self.host.document;
                let y = (doc.scroll_y() + delta).clamp(0.0, doc.max_scroll());
                doc.set_scroll_y(y);
            }
        }
    }

    /// The host scrolled natively (scrollbar, keyboard, anchor)
    pub fn native_scroll(&mut self, y: f32) {
        let doc = &mut self.host.document;
        doc.set_scroll_y(y.clamp(0.0, doc.max_scroll()));
        if let Some(emulator) = &self.emulator {
            emulator.sync_native(doc.scroll_y());
        }
    }

    /// An image finished loading
    pub fn image_loaded(&mut self) {
        if matches!(self.stacking_outcome, Some(StackingOutcome::Initialized { .. })) {
            self.check_image_heights();
        }
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.hero_bg.pointer_move(x, y);
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Advance by `dt` seconds
    pub fn frame(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.clock += Duration::from_secs_f32(dt);

        if let Some(emulator) = &self.emulator {
            emulator.raf(&mut self.host.document, dt);
        }
        let scroll = self.host.document.scroll_y();
        if self.scrolled.replace(false) || scroll != self.last_scroll {
            self.last_scroll = scroll;
            self.host.update();
        }

        let events = self.host.animator.tick(&mut self.host.document, dt);
        for event in events {
            self.on_animator_event(event);
        }
        if let Some(loader) = &mut self.loader {
            loader.sync(&mut self.host.document);
        }

        if self.resize.check_timeout(self.clock) {
            self.resize_settled();
        }

        self.pump();

        let threshold = self.host.config.scroll.nav_threshold;
        update_nav_state(&mut self.host.document, &self.host.selectors.nav, threshold);
        self.hero_bg.step(&mut self.host.document);
    }

    /// Run frames of `dt` until nothing is pending, up to `max_frames`
    ///
    /// Returns the number of frames run.
    pub fn run_until_settled(&mut self, dt: f32, max_frames: usize) -> usize {
        for frame in 0..max_frames {
            if self.is_settled() {
                return frame;
            }
            self.frame(dt);
        }
        max_frames
    }

    fn on_animator_event(&mut self, event: AnimatorEvent) {
        match event {
            AnimatorEvent::Marker { name, .. } if name == RESIZE_MARKER => {
                if let Some(emulator) = &self.emulator {
                    emulator.resize(&self.host.document);
                }
            }
            AnimatorEvent::TimelineComplete(id) => {
                if self.loader.as_ref().is_some_and(|l| l.timeline() == id) {
                    if let Some(mut loader) = self.loader.take() {
                        loader.sync(&mut self.host.document);
                    }
                    debug!("loader finished");
                }
            }
            _ => {}
        }
    }

    fn pump(&mut self) {
        while let Some(action) = self.pipeline.poll(self.clock, &self.host.animator) {
            self.run(action);
        }
    }

    fn run(&mut self, action: Action) {
        debug!(?action, "lifecycle step");
        match action {
            Action::FinishBoot => self.finish_boot(),
            Action::Leave => self.leave(),
            Action::Enter(page) => self.enter(page),
            Action::ResumeScroll => self.resume_scroll(),
            Action::AfterEnter => self.after_enter(),
            Action::Settled { refresh, theme } => {
                if refresh {
                    self.host.refresh(true);
                }
                if theme {
                    self.init_theme();
                }
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn document(&self) -> &D {
        &self.host.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.host.document
    }

    pub fn registry(&self) -> &TriggerRegistry {
        &self.host.registry
    }

    pub fn animator(&self) -> &Animator {
        &self.host.animator
    }

    pub fn state(&self) -> &SharedScrollState {
        &self.host.state
    }

    pub fn config(&self) -> &StageConfig {
        &self.host.config
    }

    pub fn device(&self) -> DeviceClass {
        self.host.device
    }

    pub fn emulator(&self) -> Option<&EmulatorHandle> {
        self.emulator.as_ref()
    }

    pub fn stack(&self) -> Ref<'_, StackState> {
        self.stacking.state()
    }

    pub fn phase(&self) -> TransitionPhase {
        self.transition.phase()
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    /// Time elapsed over all frames
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// No queued steps, animations, smoothing or pending resize
    pub fn is_settled(&self) -> bool {
        self.pipeline.is_empty()
            && self.host.animator.is_idle()
            && !self.resize.is_pending()
            && !self
                .emulator
                .as_ref()
                .is_some_and(|emulator| emulator.with(|e| e.is_smoothing()))
    }

    pub fn report(&self) -> StageReport {
        let registry = &self.host.registry;
        StageReport {
            path: self.host.document.path().to_string(),
            device: self.host.device,
            phase: self.transition.phase(),
            booted: self.booted,
            scroll: self.host.document.scroll_y(),
            state: self.host.state.get(),
            triggers: TriggerCounts {
                stacking: registry.count(Subsystem::Stacking),
                theme: registry.count(Subsystem::Theme),
                page: registry.count(Subsystem::Page),
            },
            registry: registry.stats(),
            transitions: self.transition.stats(),
            stacking: self.stacking_outcome,
            theme: self.theme_outcome,
            images: self.images,
            stack: self.stacking.state().images().to_vec(),
            resize_rebuilds: self.resize_rebuilds,
            dropped_steps: self.pipeline.dropped(),
        }
    }
}
