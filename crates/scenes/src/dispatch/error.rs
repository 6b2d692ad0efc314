use std::error::Error as StdError;

use thiserror::Error;

use super::handlers::HandlerKind;
use super::registry::SceneName;

pub type HandlerResult = Result<(), HandlerError>;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),
    #[error("nested transition failed: {0}")]
    Transition(#[source] Box<TransitionError>),
    #[error("scene dispatcher was dropped")]
    DispatcherDropped,
    #[error(transparent)]
    Other(Box<dyn StdError + Send + Sync + 'static>),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn other(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(error))
    }
}

impl From<TransitionError> for HandlerError {
    fn from(error: TransitionError) -> Self {
        Self::Transition(Box::new(error))
    }
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("{kind} handler #{index} for scene '{scene}' failed: {source}")]
    Handler {
        scene: SceneName,
        kind: HandlerKind,
        index: usize,
        #[source]
        source: HandlerError,
    },
    #[error("transition to '{target}' exceeds the nested transition limit of {limit}")]
    DepthLimitExceeded { target: SceneName, limit: u32 },
}

impl TransitionError {
    pub fn scene(&self) -> &SceneName {
        match self {
            Self::Handler { scene, .. } => scene,
            Self::DepthLimitExceeded { target, .. } => target,
        }
    }
}
