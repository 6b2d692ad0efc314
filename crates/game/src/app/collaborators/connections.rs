use std::collections::BTreeSet;
use std::fmt;

use scenes::{EventHandler, EventSource, HandlerResult, Subscribers};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub(crate) struct PlayerId(pub(crate) u8);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionEvent {
    Connected(PlayerId),
    Disconnected(PlayerId),
}

#[derive(Debug, Default)]
pub(crate) struct ConnectionTracker {
    connected: BTreeSet<PlayerId>,
    pending: Vec<ConnectionEvent>,
    subscribers: Subscribers<ConnectionEvent>,
}

impl ConnectionTracker {
    pub(crate) fn set_connected(&mut self, player: PlayerId, connected: bool) {
        let changed = if connected {
            self.connected.insert(player)
        } else {
            self.connected.remove(&player)
        };
        if changed {
            self.pending.push(if connected {
                ConnectionEvent::Connected(player)
            } else {
                ConnectionEvent::Disconnected(player)
            });
        }
    }

    pub(crate) fn connected(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.connected.iter().copied()
    }

    pub(crate) fn dispatch_pending(&mut self) -> HandlerResult {
        let pending = std::mem::take(&mut self.pending);
        for event in &pending {
            self.subscribers.emit(event)?;
        }
        Ok(())
    }
}

impl EventSource<ConnectionEvent> for ConnectionTracker {
    fn subscribe(&mut self, handler: EventHandler<ConnectionEvent>) {
        self.subscribers.subscribe(handler);
    }
}
