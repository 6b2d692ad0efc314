use std::collections::HashSet;

use scenes::{EventHandler, EventSource, HandlerResult, Subscribers};
use serde::Deserialize;

use super::connections::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Button {
    Start,
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ButtonEdge {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ButtonEvent {
    pub(crate) player: PlayerId,
    pub(crate) button: Button,
    pub(crate) edge: ButtonEdge,
}

/// Turns raw per-player button levels into press/release edges. Holding a
/// button never repeats its press edge; it has to be released first.
#[derive(Debug, Default)]
pub(crate) struct ButtonEdges {
    down: HashSet<(PlayerId, Button)>,
    pending: Vec<ButtonEvent>,
    subscribers: Subscribers<ButtonEvent>,
}

impl ButtonEdges {
    pub(crate) fn handle_button_state(
        &mut self,
        player: PlayerId,
        button: Button,
        is_pressed: bool,
    ) {
        let key = (player, button);
        let edge = if is_pressed {
            self.down.insert(key).then_some(ButtonEdge::Pressed)
        } else {
            self.down.remove(&key).then_some(ButtonEdge::Released)
        };
        if let Some(edge) = edge {
            self.pending.push(ButtonEvent {
                player,
                button,
                edge,
            });
        }
    }

    #[cfg(test)]
    pub(crate) fn is_down(&self, player: PlayerId, button: Button) -> bool {
        self.down.contains(&(player, button))
    }

    /// Delivers queued edges in arrival order. Edges queued after a failing
    /// handler are dropped with the failed batch.
    pub(crate) fn dispatch_pending(&mut self) -> HandlerResult {
        let pending = std::mem::take(&mut self.pending);
        for event in &pending {
            self.subscribers.emit(event)?;
        }
        Ok(())
    }
}

impl EventSource<ButtonEvent> for ButtonEdges {
    fn subscribe(&mut self, handler: EventHandler<ButtonEvent>) {
        self.subscribers.subscribe(handler);
    }
}
