mod active;
mod config;
mod error;
mod handlers;
mod registry;
mod scoped;
mod snapshot;
mod source;
mod transition;

pub use active::{ActiveSceneCell, ActiveSceneReader, SceneGate};
pub use config::{DispatcherConfig, SameScenePolicy, DEFAULT_MAX_TRANSITION_DEPTH};
pub use error::{HandlerError, HandlerResult, TransitionError};
pub use handlers::HandlerKind;
pub use registry::SceneName;
pub use snapshot::{DispatcherSnapshot, SceneSnapshot};
pub use source::{EventHandler, EventSource, Subscribers};
pub use transition::{SceneDispatcher, WeakSceneDispatcher};
