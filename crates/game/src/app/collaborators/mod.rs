mod buttons;
mod clock;
mod connections;
mod counters;
mod sprites;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use scenes::{HandlerResult, SceneDispatcher, SceneName, Subscribers};

pub(crate) use buttons::{Button, ButtonEdge, ButtonEdges, ButtonEvent};
pub(crate) use clock::{FrameClock, FrameEvent, IntervalEvent, IntervalTimer, TickEvent, Ticker};
pub(crate) use connections::{ConnectionEvent, ConnectionTracker, PlayerId};
pub(crate) use counters::{CounterId, Counters, Direction, ThresholdEvent};
pub(crate) use sprites::{SpriteEvent, SpriteField, SpriteId, SpriteKind, Vec2};

#[derive(Debug)]
pub(crate) struct Arena {
    pub(crate) sprites: SpriteField,
    pub(crate) counters: Counters,
}

impl Arena {
    pub(crate) fn new(width: f32, height: f32) -> Self {
        Self {
            sprites: SpriteField::new(width, height),
            counters: Counters::default(),
        }
    }
}

pub(crate) type SharedArena = Rc<RefCell<Arena>>;

#[derive(Debug)]
pub(crate) struct EventHub {
    pub(crate) ticks: Ticker,
    pub(crate) frames: FrameClock,
    pub(crate) intervals: IntervalTimer,
    pub(crate) buttons: ButtonEdges,
    pub(crate) connections: ConnectionTracker,
    pub(crate) sprites: Subscribers<SpriteEvent>,
    pub(crate) thresholds: Subscribers<ThresholdEvent>,
}

impl EventHub {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            ticks: Ticker::default(),
            frames: FrameClock::default(),
            intervals: IntervalTimer::new(interval),
            buttons: ButtonEdges::default(),
            connections: ConnectionTracker::default(),
            sprites: Subscribers::new(),
            thresholds: Subscribers::new(),
        }
    }

    pub(crate) fn on_tick<H>(
        &mut self,
        dispatcher: &SceneDispatcher,
        scene: impl Into<SceneName>,
        handler: H,
    )
    where
        H: FnMut(&TickEvent) -> HandlerResult + 'static,
    {
        dispatcher.bind_scoped(scene, &mut self.ticks, handler);
    }

    pub(crate) fn on_frame<H>(
        &mut self,
        dispatcher: &SceneDispatcher,
        scene: impl Into<SceneName>,
        handler: H,
    )
    where
        H: FnMut(&FrameEvent) -> HandlerResult + 'static,
    {
        dispatcher.bind_scoped(scene, &mut self.frames, handler);
    }

    pub(crate) fn on_interval<H>(
        &mut self,
        dispatcher: &SceneDispatcher,
        scene: impl Into<SceneName>,
        handler: H,
    )
    where
        H: FnMut(&IntervalEvent) -> HandlerResult + 'static,
    {
        dispatcher.bind_scoped(scene, &mut self.intervals, handler);
    }

    pub(crate) fn on_button<H>(
        &mut self,
        dispatcher: &SceneDispatcher,
        scene: impl Into<SceneName>,
        handler: H,
    )
    where
        H: FnMut(&ButtonEvent) -> HandlerResult + 'static,
    {
        dispatcher.bind_scoped(scene, &mut self.buttons, handler);
    }

    pub(crate) fn on_connection<H>(
        &mut self,
        dispatcher: &SceneDispatcher,
        scene: impl Into<SceneName>,
        handler: H,
    )
    where
        H: FnMut(&ConnectionEvent) -> HandlerResult + 'static,
    {
        dispatcher.bind_scoped(scene, &mut self.connections, handler);
    }

    pub(crate) fn on_sprite_event<H>(
        &mut self,
        dispatcher: &SceneDispatcher,
        scene: impl Into<SceneName>,
        handler: H,
    )
    where
        H: FnMut(&SpriteEvent) -> HandlerResult + 'static,
    {
        dispatcher.bind_scoped(scene, &mut self.sprites, handler);
    }

    pub(crate) fn on_threshold<H>(
        &mut self,
        dispatcher: &SceneDispatcher,
        scene: impl Into<SceneName>,
        handler: H,
    )
    where
        H: FnMut(&ThresholdEvent) -> HandlerResult + 'static,
    {
        dispatcher.bind_scoped(scene, &mut self.thresholds, handler);
    }

    pub(crate) fn emit_sprite_events(&mut self, events: &[SpriteEvent]) -> HandlerResult {
        for event in events {
            self.sprites.emit(event)?;
        }
        Ok(())
    }

    pub(crate) fn emit_thresholds(&mut self, events: &[ThresholdEvent]) -> HandlerResult {
        for event in events {
            self.thresholds.emit(event)?;
        }
        Ok(())
    }
}
