pub mod dispatch;

pub use dispatch::{
    ActiveSceneCell, ActiveSceneReader, DispatcherConfig, DispatcherSnapshot, EventHandler,
    EventSource, HandlerError, HandlerKind, HandlerResult, SameScenePolicy, SceneDispatcher,
    SceneGate, SceneName, SceneSnapshot, Subscribers, TransitionError, WeakSceneDispatcher,
    DEFAULT_MAX_TRANSITION_DEPTH,
};
