use tracing::debug;

use super::active::SceneGate;
use super::error::HandlerResult;
use super::registry::SceneName;
use super::source::{EventHandler, EventSource};
use super::transition::SceneDispatcher;

impl SceneDispatcher {
    pub fn gate(&self, name: impl Into<SceneName>) -> SceneGate {
        let scene = name.into();
        self.ensure_exists(&scene);
        SceneGate::new(scene, self.active_reader())
    }

    /// Binds `handler` to an external event source so that it only runs while
    /// `name` is the active scene.
    pub fn bind_scoped_event<E, S, H>(&self, name: impl Into<SceneName>, subscribe: S, handler: H)
    where
        E: ?Sized + 'static,
        S: FnOnce(EventHandler<E>),
        H: FnMut(&E) -> HandlerResult + 'static,
    {
        let gate = self.gate(name);
        let binding = self
            .inner
            .handlers
            .borrow_mut()
            .record_scoped_binding(gate.scene());
        debug!(scene = %gate.scene(), binding, "scoped_event_bound");

        let mut handler = handler;
        subscribe(Box::new(move |event: &E| {
            if gate.is_open() {
                handler(event)
            } else {
                Ok(())
            }
        }));
    }

    pub fn bind_scoped<E, Src, H>(&self, name: impl Into<SceneName>, source: &mut Src, handler: H)
    where
        E: ?Sized + 'static,
        Src: EventSource<E> + ?Sized,
        H: FnMut(&E) -> HandlerResult + 'static,
    {
        self.bind_scoped_event(name, |wrapped| source.subscribe(wrapped), handler);
    }

    pub fn scoped_binding_count(&self, name: &str) -> usize {
        self.inner.handlers.borrow().scoped_bindings(name)
    }
}
