use serde::Serialize;

use super::handlers::HandlerKind;
use super::transition::SceneDispatcher;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneSnapshot {
    pub name: String,
    pub setup_handlers: usize,
    pub cleanup_handlers: usize,
    pub scoped_bindings: usize,
}

/// Point-in-time view of a dispatcher for debug dumps. Scenes are listed in
/// name order so two dumps of the same state compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatcherSnapshot {
    pub current_scene: Option<String>,
    pub transitions_completed: u64,
    pub transition_depth: u32,
    pub scenes: Vec<SceneSnapshot>,
}

impl DispatcherSnapshot {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl SceneDispatcher {
    pub fn snapshot(&self) -> DispatcherSnapshot {
        let scenes = self.inner.scenes.borrow();
        let handlers = self.inner.handlers.borrow();
        DispatcherSnapshot {
            current_scene: self.current_scene().map(|name| name.to_string()),
            transitions_completed: self.transitions_completed(),
            transition_depth: self.transition_depth(),
            scenes: scenes
                .names()
                .map(|name| SceneSnapshot {
                    name: name.to_string(),
                    setup_handlers: handlers.count(name.as_str(), HandlerKind::Setup),
                    cleanup_handlers: handlers.count(name.as_str(), HandlerKind::Cleanup),
                    scoped_bindings: handlers.scoped_bindings(name.as_str()),
                })
                .collect(),
        }
    }
}
