use std::fmt;

use super::error::HandlerResult;

pub type EventHandler<E> = Box<dyn FnMut(&E) -> HandlerResult>;

/// Contract every external collaborator satisfies: accept a handler and call it
/// with the event payload each time the source's own condition fires.
pub trait EventSource<E: ?Sized> {
    fn subscribe(&mut self, handler: EventHandler<E>);
}

/// `emit` calls handlers in subscription order and stops at the first error,
/// returning it to whoever fired the event.
pub struct Subscribers<E: ?Sized> {
    handlers: Vec<EventHandler<E>>,
}

impl<E: ?Sized> Subscribers<E> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn emit(&mut self, event: &E) -> HandlerResult {
        for handler in &mut self.handlers {
            handler(event)?;
        }
        Ok(())
    }
}

impl<E: ?Sized> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> EventSource<E> for Subscribers<E> {
    fn subscribe(&mut self, handler: EventHandler<E>) {
        self.handlers.push(handler);
    }
}

impl<E: ?Sized> fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
