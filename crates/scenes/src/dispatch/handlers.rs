use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use super::error::HandlerResult;
use super::registry::SceneName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    Setup,
    Cleanup,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::Setup => f.write_str("setup"),
            HandlerKind::Cleanup => f.write_str("cleanup"),
        }
    }
}

pub(crate) type LifecycleHandler = Rc<dyn Fn() -> HandlerResult>;

#[derive(Default)]
struct SceneHandlers {
    setup: Vec<LifecycleHandler>,
    cleanup: Vec<LifecycleHandler>,
    scoped_bindings: usize,
}

impl SceneHandlers {
    fn list(&self, kind: HandlerKind) -> &Vec<LifecycleHandler> {
        match kind {
            HandlerKind::Setup => &self.setup,
            HandlerKind::Cleanup => &self.cleanup,
        }
    }

    fn list_mut(&mut self, kind: HandlerKind) -> &mut Vec<LifecycleHandler> {
        match kind {
            HandlerKind::Setup => &mut self.setup,
            HandlerKind::Cleanup => &mut self.cleanup,
        }
    }
}

/// Callers hand out snapshots of a list rather than borrowing it, so a handler
/// that registers more handlers while its own list is running never observes
/// the list changing underneath it.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    scenes: HashMap<SceneName, SceneHandlers>,
}

impl HandlerRegistry {
    pub(crate) fn register(
        &mut self,
        scene: &SceneName,
        kind: HandlerKind,
        handler: LifecycleHandler,
    ) -> usize {
        let list = self.entry(scene).list_mut(kind);
        list.push(handler);
        list.len() - 1
    }

    pub(crate) fn record_scoped_binding(&mut self, scene: &SceneName) -> usize {
        let entry = self.entry(scene);
        entry.scoped_bindings += 1;
        entry.scoped_bindings
    }

    pub(crate) fn handlers(&self, scene: &SceneName, kind: HandlerKind) -> Vec<LifecycleHandler> {
        self.scenes
            .get(scene)
            .map(|handlers| handlers.list(kind).clone())
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, scene: &str, kind: HandlerKind) -> usize {
        self.scenes
            .get(scene)
            .map(|handlers| handlers.list(kind).len())
            .unwrap_or(0)
    }

    pub(crate) fn scoped_bindings(&self, scene: &str) -> usize {
        self.scenes
            .get(scene)
            .map(|handlers| handlers.scoped_bindings)
            .unwrap_or(0)
    }

    fn entry(&mut self, scene: &SceneName) -> &mut SceneHandlers {
        self.scenes.entry(scene.clone()).or_default()
    }
}
