use std::cell::RefCell;
use std::rc::Rc;

use super::registry::SceneName;

/// Holds the current scene. Only the dispatcher that owns the cell can write
/// to it; everything else reads through [`ActiveSceneReader`].
#[derive(Debug, Default)]
pub struct ActiveSceneCell {
    current: RefCell<Option<SceneName>>,
}

impl ActiveSceneCell {
    pub fn get(&self) -> Option<SceneName> {
        self.current.borrow().clone()
    }

    pub fn is(&self, name: &str) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(|current| current.as_str() == name)
    }

    pub(crate) fn replace(&self, next: SceneName) -> Option<SceneName> {
        self.current.replace(Some(next))
    }
}

#[derive(Debug, Clone)]
pub struct ActiveSceneReader {
    cell: Rc<ActiveSceneCell>,
}

impl ActiveSceneReader {
    pub(crate) fn new(cell: Rc<ActiveSceneCell>) -> Self {
        Self { cell }
    }

    pub fn current(&self) -> Option<SceneName> {
        self.cell.get()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.cell.is(name)
    }
}

/// A scene identity paired with a reader. The gate is open exactly while its
/// scene is the active one; it is evaluated on every call, never cached.
#[derive(Debug, Clone)]
pub struct SceneGate {
    scene: SceneName,
    reader: ActiveSceneReader,
}

impl SceneGate {
    pub fn new(scene: SceneName, reader: ActiveSceneReader) -> Self {
        Self { scene, reader }
    }

    pub fn scene(&self) -> &SceneName {
        &self.scene
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_active(self.scene.as_str())
    }
}
