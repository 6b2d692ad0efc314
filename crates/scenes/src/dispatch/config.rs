use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TRANSITION_DEPTH: u32 = 32;

/// What `transition_to` does when asked for the scene that is already active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameScenePolicy {
    #[default]
    Rerun,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Maximum number of `transition_to` calls allowed on the stack at once,
    /// counting the outermost call.
    pub max_transition_depth: u32,
    pub same_scene: SameScenePolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_transition_depth: DEFAULT_MAX_TRANSITION_DEPTH,
            same_scene: SameScenePolicy::Rerun,
        }
    }
}

impl DispatcherConfig {
    /// A zero depth would reject every transition, so it is raised to one.
    pub(crate) fn effective_max_depth(&self) -> u32 {
        self.max_transition_depth.max(1)
    }
}
