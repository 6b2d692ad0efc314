use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a scene. Names are compared verbatim; no normalisation happens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneName(String);

impl SceneName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SceneName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&SceneName> for SceneName {
    fn from(value: &SceneName) -> Self {
        value.clone()
    }
}

impl AsRef<str> for SceneName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SceneName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SceneName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SceneName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Every scene that has ever been referenced. Entries are never removed, so a
/// name that exists once exists for the life of the owning dispatcher.
#[derive(Debug, Default)]
pub(crate) struct SceneRegistry {
    scenes: BTreeSet<SceneName>,
}

impl SceneRegistry {
    /// Returns `true` when the entry was created by this call.
    pub(crate) fn ensure_exists(&mut self, name: &SceneName) -> bool {
        if self.scenes.contains(name) {
            return false;
        }
        self.scenes.insert(name.clone())
    }

    pub(crate) fn exists(&self, name: &str) -> bool {
        self.scenes.contains(name)
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &SceneName> {
        self.scenes.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.scenes.len()
    }
}
