use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use super::active::{ActiveSceneCell, ActiveSceneReader};
use super::config::{DispatcherConfig, SameScenePolicy};
use super::error::{HandlerError, HandlerResult, TransitionError};
use super::handlers::{HandlerKind, HandlerRegistry, LifecycleHandler};
use super::registry::{SceneName, SceneRegistry};

pub(crate) struct DispatcherInner {
    pub(crate) config: DispatcherConfig,
    pub(crate) scenes: RefCell<SceneRegistry>,
    pub(crate) handlers: RefCell<HandlerRegistry>,
    pub(crate) active: Rc<ActiveSceneCell>,
    depth: Cell<u32>,
    transitions_completed: Cell<u64>,
}

#[derive(Clone)]
pub struct SceneDispatcher {
    pub(crate) inner: Rc<DispatcherInner>,
}

/// Non-owning handle for handlers stored inside the dispatcher they drive.
#[derive(Clone)]
pub struct WeakSceneDispatcher {
    inner: Weak<DispatcherInner>,
}

impl SceneDispatcher {
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            inner: Rc::new(DispatcherInner {
                config,
                scenes: RefCell::new(SceneRegistry::default()),
                handlers: RefCell::new(HandlerRegistry::default()),
                active: Rc::new(ActiveSceneCell::default()),
                depth: Cell::new(0),
                transitions_completed: Cell::new(0),
            }),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakSceneDispatcher {
        WeakSceneDispatcher {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn scene_exists(&self, name: &str) -> bool {
        self.inner.scenes.borrow().exists(name)
    }

    pub fn scene_names(&self) -> Vec<SceneName> {
        self.inner.scenes.borrow().names().cloned().collect()
    }

    pub fn current_scene(&self) -> Option<SceneName> {
        self.inner.active.get()
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.inner.active.is(name)
    }

    pub fn active_reader(&self) -> ActiveSceneReader {
        ActiveSceneReader::new(Rc::clone(&self.inner.active))
    }

    pub fn handler_count(&self, name: &str, kind: HandlerKind) -> usize {
        self.inner.handlers.borrow().count(name, kind)
    }

    pub fn transition_depth(&self) -> u32 {
        self.inner.depth.get()
    }

    pub fn transitions_completed(&self) -> u64 {
        self.inner.transitions_completed.get()
    }

    pub fn register_setup<F>(&self, name: impl Into<SceneName>, handler: F)
    where
        F: Fn() -> HandlerResult + 'static,
    {
        self.register(name.into(), HandlerKind::Setup, Rc::new(handler));
    }

    pub fn register_cleanup<F>(&self, name: impl Into<SceneName>, handler: F)
    where
        F: Fn() -> HandlerResult + 'static,
    {
        self.register(name.into(), HandlerKind::Cleanup, Rc::new(handler));
    }

    /// Switches the active scene to `name`.
    ///
    /// The outgoing scene's cleanup handlers run first, in registration order,
    /// while [`current_scene`](Self::current_scene) still reports the outgoing
    /// scene. The active scene is then replaced, and only after that do the
    /// incoming scene's setup handlers run, again in registration order.
    /// Asking for the scene that is already active re-runs its cleanup and
    /// setup lists unless the dispatcher is configured with
    /// [`SameScenePolicy::Skip`].
    ///
    /// The first handler that fails stops its list and the error is returned;
    /// nothing is rolled back. A failing setup handler therefore leaves the new
    /// scene active with its setup only partly applied.
    ///
    /// Calling `transition_to` from inside a setup or cleanup handler is
    /// allowed. The nested transition runs immediately and completely,
    /// including cleanup of whatever scene is active at that moment, and then
    /// the outer list resumes with its remaining handlers. Nesting deeper than
    /// `max_transition_depth` fails with
    /// [`TransitionError::DepthLimitExceeded`].
    pub fn transition_to(&self, name: impl Into<SceneName>) -> Result<(), TransitionError> {
        let target = name.into();
        self.ensure_exists(&target);
        let limit = self.inner.config.effective_max_depth();
        let depth = self.inner.depth.get();
        if depth >= limit {
            warn!(scene = %target, depth, limit, "transition_depth_exceeded");
            return Err(TransitionError::DepthLimitExceeded { target, limit });
        }

        let _guard = DepthGuard::enter(&self.inner.depth);
        self.run_transition(target, depth + 1)
    }

    fn run_transition(&self, target: SceneName, depth: u32) -> Result<(), TransitionError> {
        let outgoing = self.inner.active.get();
        if outgoing.as_ref() == Some(&target) {
            if self.inner.config.same_scene == SameScenePolicy::Skip {
                debug!(scene = %target, depth, "scene_reentry_skipped");
                return Ok(());
            }
            debug!(scene = %target, depth, "scene_reentered");
        }

        if let Some(outgoing) = &outgoing {
            self.run_handlers(outgoing, HandlerKind::Cleanup)?;
        }

        let replaced = self.inner.active.replace(target.clone());
        info!(
            from = replaced.as_ref().map(SceneName::as_str).unwrap_or("none"),
            to = %target,
            depth,
            "scene_switched"
        );

        self.run_handlers(&target, HandlerKind::Setup)?;
        self.inner
            .transitions_completed
            .set(self.inner.transitions_completed.get().saturating_add(1));
        Ok(())
    }

    fn run_handlers(&self, scene: &SceneName, kind: HandlerKind) -> Result<(), TransitionError> {
        // Snapshot, then release the borrow: handlers may register handlers or
        // transition again.
        let handlers = self.inner.handlers.borrow().handlers(scene, kind);
        for (index, handler) in handlers.iter().enumerate() {
            if let Err(source) = handler() {
                warn!(
                    scene = %scene,
                    kind = %kind,
                    index,
                    error = %source,
                    "scene_handler_failed"
                );
                return Err(TransitionError::Handler {
                    scene: scene.clone(),
                    kind,
                    index,
                    source,
                });
            }
        }
        Ok(())
    }

    fn register(&self, name: SceneName, kind: HandlerKind, handler: LifecycleHandler) {
        self.ensure_exists(&name);
        let index = self
            .inner
            .handlers
            .borrow_mut()
            .register(&name, kind, handler);
        debug!(scene = %name, kind = %kind, index, "handler_registered");
    }

    pub(crate) fn ensure_exists(&self, name: &SceneName) {
        if self.inner.scenes.borrow_mut().ensure_exists(name) {
            debug!(scene = %name, "scene_created");
        }
    }
}

impl Default for SceneDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SceneDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneDispatcher")
            .field("current_scene", &self.current_scene())
            .field("scene_count", &self.inner.scenes.borrow().len())
            .field("depth", &self.inner.depth.get())
            .finish()
    }
}

impl WeakSceneDispatcher {
    pub fn upgrade(&self) -> Option<SceneDispatcher> {
        self.inner.upgrade().map(|inner| SceneDispatcher { inner })
    }

    /// Transition helper for use inside handlers; a dropped dispatcher is
    /// reported as [`HandlerError::DispatcherDropped`].
    pub fn transition_to(&self, name: impl Into<SceneName>) -> HandlerResult {
        let dispatcher = self.upgrade().ok_or(HandlerError::DispatcherDropped)?;
        dispatcher.transition_to(name)?;
        Ok(())
    }

    pub fn current_scene(&self) -> Option<SceneName> {
        self.upgrade().and_then(|dispatcher| dispatcher.current_scene())
    }
}

impl fmt::Debug for WeakSceneDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSceneDispatcher")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Keeps the nesting counter balanced on every exit path, unwinding included.
struct DepthGuard<'a> {
    depth: &'a Cell<u32>,
}

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<u32>) -> Self {
        depth.set(depth.get() + 1);
        Self { depth }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use super::*;

    type CallLog = Rc<RefCell<Vec<String>>>;

    fn new_log() -> CallLog {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn record(log: &CallLog, label: &str) -> impl Fn() -> HandlerResult + 'static {
        let log = Rc::clone(log);
        let label = label.to_string();
        move || {
            log.borrow_mut().push(label.clone());
            Ok(())
        }
    }

    fn entries(log: &CallLog) -> Vec<String> {
        log.borrow().clone()
    }

    #[test]
    fn registration_creates_scenes_before_any_transition() {
        let dispatcher = SceneDispatcher::new();
        dispatcher.register_setup("Menu", || Ok(()));
        dispatcher.register_cleanup("Credits", || Ok(()));

        assert!(dispatcher.scene_exists("Menu"));
        assert!(dispatcher.scene_exists("Credits"));
        assert!(!dispatcher.scene_exists("Play"));
        assert_eq!(dispatcher.current_scene(), None);
    }

    #[test]
    fn scene_exists_is_stable_without_mutation() {
        let dispatcher = SceneDispatcher::new();
        dispatcher.register_setup("Menu", || Ok(()));

        let first = (dispatcher.scene_exists("Menu"), dispatcher.scene_exists("Play"));
        let second = (dispatcher.scene_exists("Menu"), dispatcher.scene_exists("Play"));
        assert_eq!(first, second);
        assert_eq!(first, (true, false));
    }

    #[test]
    fn transition_creates_unknown_target() {
        let dispatcher = SceneDispatcher::new();
        dispatcher.transition_to("Play").expect("transition");

        assert!(dispatcher.scene_exists("Play"));
        assert_eq!(dispatcher.current_scene(), Some(SceneName::from("Play")));
    }

    #[test]
    fn transition_runs_outgoing_cleanup_then_incoming_setup() {
        let log = new_log();
        let dispatcher = SceneDispatcher::new();
        dispatcher.register_setup("A", record(&log, "A.setup"));
        dispatcher.register_cleanup("A", record(&log, "A.cleanup.1"));
        dispatcher.register_cleanup("A", record(&log, "A.cleanup.2"));
        dispatcher.register_setup("B", record(&log, "B.setup.1"));
        dispatcher.register_setup("B", record(&log, "B.setup.2"));
        dispatcher.register_cleanup("B", record(&log, "B.cleanup"));

        dispatcher.transition_to("A").expect("enter A");
        log.borrow_mut().clear();
        dispatcher.transition_to("B").expect("enter B");

        assert_eq!(
            entries(&log),
            vec!["A.cleanup.1", "A.cleanup.2", "B.setup.1", "B.setup.2"]
        );
    }

    #[test]
    fn cleanup_observes_outgoing_scene_and_setup_observes_incoming() {
        let seen = new_log();
        let dispatcher = SceneDispatcher::new();
        for (scene, kind) in [("A", HandlerKind::Cleanup), ("B", HandlerKind::Setup)] {
            let seen = Rc::clone(&seen);
            let weak = dispatcher.downgrade();
            let handler = move || {
                let current = weak.current_scene().map(|name| name.to_string());
                seen.borrow_mut()
                    .push(format!("{kind}:{}", current.unwrap_or_default()));
                Ok(())
            };
            match kind {
                HandlerKind::Setup => dispatcher.register_setup(scene, handler),
                HandlerKind::Cleanup => dispatcher.register_cleanup(scene, handler),
            }
        }

        dispatcher.transition_to("A").expect("enter A");
        dispatcher.transition_to("B").expect("enter B");

        assert_eq!(entries(&seen), vec!["cleanup:A", "setup:B"]);
    }

    #[test]
    fn current_scene_persists_until_next_transition() {
        let dispatcher = SceneDispatcher::new();
        dispatcher.transition_to("X").expect("enter X");

        for _ in 0..3 {
            assert_eq!(dispatcher.current_scene(), Some(SceneName::from("X")));
            assert!(dispatcher.is_current("X"));
        }
        dispatcher.register_setup("Y", || Ok(()));
        assert_eq!(dispatcher.current_scene(), Some(SceneName::from("X")));

        dispatcher.transition_to("Y").expect("enter Y");
        assert_eq!(dispatcher.current_scene(), Some(SceneName::from("Y")));
    }

    #[test]
    fn menu_to_play_scenario() {
        let score = Rc::new(Cell::new(99));
        let players = Rc::new(Cell::new(0));
        let menu_sprites = Rc::new(Cell::new(4));
        let log = new_log();
        let dispatcher = SceneDispatcher::new();
        {
            let score = Rc::clone(&score);
            let log = Rc::clone(&log);
            dispatcher.register_setup("Menu", move || {
                score.set(0);
                log.borrow_mut().push("menu.setup".to_string());
                Ok(())
            });
        }
        {
            let players = Rc::clone(&players);
            let log = Rc::clone(&log);
            dispatcher.register_setup("Play", move || {
                players.set(players.get() + 1);
                log.borrow_mut().push("play.setup".to_string());
                Ok(())
            });
        }
        {
            let menu_sprites = Rc::clone(&menu_sprites);
            let log = Rc::clone(&log);
            dispatcher.register_cleanup("Menu", move || {
                menu_sprites.set(0);
                log.borrow_mut().push("menu.cleanup".to_string());
                Ok(())
            });
        }

        dispatcher.transition_to("Menu").expect("enter Menu");
        assert_eq!(entries(&log), vec!["menu.setup"]);
        assert_eq!(score.get(), 0);
        assert_eq!(menu_sprites.get(), 4);

        dispatcher.transition_to("Play").expect("enter Play");
        assert_eq!(
            entries(&log),
            vec!["menu.setup", "menu.cleanup", "play.setup"]
        );
        assert_eq!(players.get(), 1);
        assert_eq!(menu_sprites.get(), 0);
        assert_eq!(dispatcher.current_scene(), Some(SceneName::from("Play")));
    }

    #[test]
    fn same_scene_transition_reruns_cleanup_and_setup_by_default() {
        let log = new_log();
        let dispatcher = SceneDispatcher::new();
        dispatcher.register_setup("Play", record(&log, "setup"));
        dispatcher.register_cleanup("Play", record(&log, "cleanup"));

        dispatcher.transition_to("Play").expect("enter");
        dispatcher.transition_to("Play").expect("re-enter");

        assert_eq!(entries(&log), vec!["setup", "cleanup", "setup"]);
        assert_eq!(dispatcher.transitions_completed(), 2);
    }

    #[test]
    fn same_scene_transition_can_be_skipped() {
        let log = new_log();
        let dispatcher = SceneDispatcher::with_config(DispatcherConfig {
            same_scene: SameScenePolicy::Skip,
            ..DispatcherConfig::default()
        });
        dispatcher.register_setup("Play", record(&log, "setup"));
        dispatcher.register_cleanup("Play", record(&log, "cleanup"));

        dispatcher.transition_to("Play").expect("enter");
        dispatcher.transition_to("Play").expect("re-enter");

        assert_eq!(entries(&log), vec!["setup"]);
        assert_eq!(dispatcher.transitions_completed(), 1);
    }

    #[test]
    fn failing_setup_stops_its_list_and_leaves_new_scene_active() {
        let log = new_log();
        let dispatcher = SceneDispatcher::new();
        dispatcher.register_setup("Play", record(&log, "setup.1"));
        dispatcher.register_setup("Play", || Err(HandlerError::failed("no spawn point")));
        dispatcher.register_setup("Play", record(&log, "setup.3"));

        let error = dispatcher.transition_to("Play").expect_err("setup fails");

        match error {
            TransitionError::Handler {
                scene, kind, index, ..
            } => {
                assert_eq!(scene, "Play");
                assert_eq!(kind, HandlerKind::Setup);
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(entries(&log), vec!["setup.1"]);
        assert_eq!(dispatcher.current_scene(), Some(SceneName::from("Play")));
        assert_eq!(dispatcher.transitions_completed(), 0);
        assert_eq!(dispatcher.transition_depth(), 0);
    }

    #[test]
    fn failing_cleanup_keeps_outgoing_scene_active() {
        let log = new_log();
        let dispatcher = SceneDispatcher::new();
        dispatcher.register_cleanup("Menu", || Err(HandlerError::failed("stuck")));
        dispatcher.register_cleanup("Menu", record(&log, "cleanup.2"));
        dispatcher.register_setup("Play", record(&log, "play.setup"));

        dispatcher.transition_to("Menu").expect("enter Menu");
        let error = dispatcher.transition_to("Play").expect_err("cleanup fails");

        assert!(matches!(
            error,
            TransitionError::Handler {
                kind: HandlerKind::Cleanup,
                index: 0,
                ..
            }
        ));
        assert!(log.borrow().is_empty());
        assert_eq!(dispatcher.current_scene(), Some(SceneName::from("Menu")));
    }

    #[test]
    fn nested_transition_completes_before_outer_list_resumes() {
        let log = new_log();
        let dispatcher = SceneDispatcher::new();
        dispatcher.register_cleanup("A", record(&log, "A.cleanup"));
        dispatcher.register_setup("B", record(&log, "B.setup.1"));
        {
            let log = Rc::clone(&log);
            let weak = dispatcher.downgrade();
            dispatcher.register_setup("B", move || {
                log.borrow_mut().push("B.setup.2 -> C".to_string());
                weak.transition_to("C")
            });
        }
        {
            let log = Rc::clone(&log);
            let weak = dispatcher.downgrade();
            dispatcher.register_setup("B", move || {
                let current = weak.current_scene().map(|name| name.to_string());
                log.borrow_mut()
                    .push(format!("B.setup.3 sees {}", current.unwrap_or_default()));
                Ok(())
            });
        }
        dispatcher.register_cleanup("B", record(&log, "B.cleanup"));
        dispatcher.register_cleanup("C", record(&log, "C.cleanup"));
        dispatcher.register_setup("C", record(&log, "C.setup"));

        dispatcher.transition_to("A").expect("enter A");
        dispatcher.transition_to("B").expect("enter B");

        assert_eq!(
            entries(&log),
            vec![
                "A.cleanup",
                "B.setup.1",
                "B.setup.2 -> C",
                "B.cleanup",
                "C.setup",
                "B.setup.3 sees C",
            ]
        );
        assert_eq!(dispatcher.current_scene(), Some(SceneName::from("C")));
        assert_eq!(dispatcher.transition_depth(), 0);
    }

    #[test]
    fn depth_is_visible_inside_handlers() {
        let depths = Rc::new(RefCell::new(Vec::new()));
        let dispatcher = SceneDispatcher::new();
        {
            let depths = Rc::clone(&depths);
            let weak = dispatcher.downgrade();
            dispatcher.register_setup("Outer", move || {
                let dispatcher = weak.upgrade().ok_or(HandlerError::DispatcherDropped)?;
                depths.borrow_mut().push(dispatcher.transition_depth());
                dispatcher.transition_to("Inner")?;
                Ok(())
            });
        }
        {
            let depths = Rc::clone(&depths);
            let weak = dispatcher.downgrade();
            dispatcher.register_setup("Inner", move || {
                let dispatcher = weak.upgrade().ok_or(HandlerError::DispatcherDropped)?;
                depths.borrow_mut().push(dispatcher.transition_depth());
                Ok(())
            });
        }

        dispatcher.transition_to("Outer").expect("enter Outer");
        assert_eq!(*depths.borrow(), vec![1, 2]);
        assert_eq!(dispatcher.transition_depth(), 0);
    }

    #[test]
    fn runaway_nesting_hits_the_depth_limit() {
        let entered = Rc::new(Cell::new(0u32));
        let dispatcher = SceneDispatcher::with_config(DispatcherConfig {
            max_transition_depth: 4,
            ..DispatcherConfig::default()
        });
        {
            let entered = Rc::clone(&entered);
            let weak = dispatcher.downgrade();
            dispatcher.register_setup("Loop", move || {
                entered.set(entered.get() + 1);
                weak.transition_to("Loop")
            });
        }

        let error = dispatcher.transition_to("Loop").expect_err("limit reached");

        assert_eq!(entered.get(), 4);
        assert_eq!(error.scene(), "Loop");
        let mut source: &dyn std::error::Error = &error;
        while let Some(next) = source.source() {
            source = next;
        }
        assert!(source.to_string().contains("nested transition limit of 4"));
        assert_eq!(dispatcher.transition_depth(), 0);
    }

    #[test]
    fn depth_limited_transition_still_creates_the_scene() {
        let dispatcher = SceneDispatcher::with_config(DispatcherConfig {
            max_transition_depth: 1,
            ..DispatcherConfig::default()
        });
        let weak = dispatcher.downgrade();
        dispatcher.register_setup("A", move || weak.transition_to("Z"));

        dispatcher.transition_to("A").expect_err("nested call over the limit");

        assert!(dispatcher.scene_exists("Z"));
        assert!(dispatcher.is_current("A"));
        assert_eq!(dispatcher.transition_depth(), 0);
    }

    #[test]
    fn handlers_registered_mid_list_run_from_next_invocation() {
        let log = new_log();
        let dispatcher = SceneDispatcher::new();
        {
            let log = Rc::clone(&log);
            let weak = dispatcher.downgrade();
            let registered = Rc::new(Cell::new(false));
            dispatcher.register_setup("Play", move || {
                log.borrow_mut().push("original".to_string());
                if !registered.replace(true) {
                    let dispatcher = weak.upgrade().ok_or(HandlerError::DispatcherDropped)?;
                    dispatcher.register_setup("Play", record(&log, "late"));
                }
                Ok(())
            });
        }

        dispatcher.transition_to("Play").expect("first entry");
        assert_eq!(entries(&log), vec!["original"]);

        dispatcher.transition_to("Play").expect("second entry");
        assert_eq!(entries(&log), vec!["original", "original", "late"]);
    }

    #[test]
    fn registering_for_one_scene_leaves_others_untouched() {
        let dispatcher = SceneDispatcher::new();
        dispatcher.register_setup("Menu", || Ok(()));
        let before = (
            dispatcher.handler_count("Menu", HandlerKind::Setup),
            dispatcher.handler_count("Menu", HandlerKind::Cleanup),
        );

        dispatcher.register_setup("Play", || Ok(()));
        dispatcher.register_cleanup("Play", || Ok(()));

        let after = (
            dispatcher.handler_count("Menu", HandlerKind::Setup),
            dispatcher.handler_count("Menu", HandlerKind::Cleanup),
        );
        assert_eq!(before, after);
        assert_eq!(before, (1, 0));
    }

    #[test]
    fn weak_handle_reports_dropped_dispatcher() {
        let weak = SceneDispatcher::new().downgrade();

        assert!(weak.upgrade().is_none());
        assert!(matches!(
            weak.transition_to("Menu"),
            Err(HandlerError::DispatcherDropped)
        ));
        assert_eq!(weak.current_scene(), None);
    }

    #[test]
    fn panicking_handler_does_not_leak_depth() {
        let dispatcher = SceneDispatcher::new();
        dispatcher.register_setup("Boom", || panic!("handler panicked"));

        let result = panic::catch_unwind(AssertUnwindSafe(|| dispatcher.transition_to("Boom")));

        assert!(result.is_err());
        assert_eq!(dispatcher.transition_depth(), 0);
        assert_eq!(dispatcher.current_scene(), Some(SceneName::from("Boom")));
    }

    #[test]
    fn clones_share_state() {
        let dispatcher = SceneDispatcher::new();
        let other = dispatcher.clone();
        other.transition_to("Menu").expect("enter");

        assert_eq!(dispatcher.current_scene(), Some(SceneName::from("Menu")));
        assert!(dispatcher.scene_exists("Menu"));
    }

    #[test]
    fn independent_dispatchers_do_not_interfere() {
        let first = SceneDispatcher::new();
        let second = SceneDispatcher::new();
        first.transition_to("Menu").expect("enter");

        assert_eq!(second.current_scene(), None);
        assert!(!second.scene_exists("Menu"));
    }
}
