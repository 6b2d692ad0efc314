use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use scenes::SceneDispatcher;
use tracing::{debug, info};

use super::collaborators::{
    Arena, Button, ButtonEdge, ButtonEvent, ConnectionEvent, CounterId, Direction, EventHub,
    FrameEvent, IntervalEvent, PlayerId, SharedArena, SpriteEvent, SpriteId, SpriteKind,
    ThresholdEvent, TickEvent, Vec2,
};
use super::config::LoopConfig;

pub(crate) const MENU: &str = "Menu";
pub(crate) const PLAY: &str = "Play";
pub(crate) const GAME_OVER: &str = "GameOver";

const PLAYER_SPEED_UNITS_PER_SECOND: f32 = 8.0;
const PLAYER_HALF_SIZE: f32 = 0.5;
const COIN_HALF_SIZE: f32 = 0.3;
const BANNER_HALF_SIZE: f32 = 1.0;
const DEFAULT_PLAYER: PlayerId = PlayerId(1);
const COIN_SEED: u64 = 0x5eed_cafe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Won,
    OutOfLives,
    OutOfTime,
}

impl Outcome {
    fn for_counter(counter: CounterId) -> Self {
        match counter {
            CounterId::Score => Self::Won,
            CounterId::Lives => Self::OutOfLives,
            CounterId::Countdown => Self::OutOfTime,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Rules {
    starting_lives: i64,
    score_goal: i64,
    play_time_limit_ticks: i64,
}

impl Rules {
    fn from_config(config: &LoopConfig) -> Self {
        Self {
            starting_lives: config.starting_lives,
            score_goal: config.score_goal,
            play_time_limit_ticks: config.play_time_limit_ticks,
        }
    }
}

#[derive(Debug)]
pub(crate) struct GameState {
    pub(crate) joined: BTreeSet<PlayerId>,
    pub(crate) player_sprites: BTreeMap<PlayerId, SpriteId>,
    pub(crate) outcome: Option<Outcome>,
    pub(crate) final_score: i64,
    pub(crate) frames_in_play: u64,
    pub(crate) rounds_played: u32,
    pub(crate) coins_spawned: u32,
    rng: SmallRng,
}

impl GameState {
    fn new(seed: u64) -> Self {
        Self {
            joined: BTreeSet::new(),
            player_sprites: BTreeMap::new(),
            outcome: None,
            final_score: 0,
            frames_in_play: 0,
            rounds_played: 0,
            coins_spawned: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Keeps a coin `margin` away from both walls; arenas too narrow for that
    /// get the centre line.
    fn coin_axis(&mut self, extent: f32, margin: f32) -> f32 {
        if extent - margin > margin {
            self.rng.random_range(margin..extent - margin)
        } else {
            extent * 0.5
        }
    }

    fn player_for_sprite(&self, id: SpriteId) -> Option<PlayerId> {
        self.player_sprites
            .iter()
            .find(|(_, sprite)| **sprite == id)
            .map(|(player, _)| *player)
    }
}

pub(crate) type SharedState = Rc<RefCell<GameState>>;

pub(crate) fn install(
    dispatcher: &SceneDispatcher,
    hub: &mut EventHub,
    arena: &SharedArena,
    config: &LoopConfig,
) -> SharedState {
    let state = Rc::new(RefCell::new(GameState::new(COIN_SEED)));
    let rules = Rules::from_config(config);
    install_menu(dispatcher, hub, arena, &state, rules);
    install_play(dispatcher, hub, arena, &state, rules);
    install_game_over(dispatcher, hub, arena, &state);
    state
}

fn install_menu(
    dispatcher: &SceneDispatcher,
    hub: &mut EventHub,
    arena: &SharedArena,
    state: &SharedState,
    rules: Rules,
) {
    {
        let arena = Rc::clone(arena);
        let state = Rc::clone(state);
        dispatcher.register_setup(MENU, move || {
            state.borrow_mut().outcome = None;
            let mut arena = arena.borrow_mut();
            arena
                .counters
                .define(CounterId::Score, 0, rules.score_goal, Direction::Rising);
            arena
                .counters
                .define(CounterId::Lives, rules.starting_lives, 0, Direction::Falling);
            let (width, height) = arena.sprites.bounds();
            arena.sprites.spawn(
                SpriteKind::Banner,
                Vec2::new(width * 0.5, height * 0.75),
                BANNER_HALF_SIZE,
            );
            Ok(())
        });
    }
    {
        let arena = Rc::clone(arena);
        dispatcher.register_cleanup(MENU, move || {
            arena
                .borrow_mut()
                .sprites
                .destroy_where(|sprite| sprite.kind == SpriteKind::Banner);
            Ok(())
        });
    }
    {
        let state = Rc::clone(state);
        hub.on_connection(dispatcher, MENU, move |event: &ConnectionEvent| {
            update_roster(&mut state.borrow_mut(), event);
            Ok(())
        });
    }
    let weak = dispatcher.downgrade();
    hub.on_button(dispatcher, MENU, move |event: &ButtonEvent| {
        if is_start_press(event) {
            return weak.transition_to(PLAY);
        }
        Ok(())
    });
}

fn install_play(
    dispatcher: &SceneDispatcher,
    hub: &mut EventHub,
    arena: &SharedArena,
    state: &SharedState,
    rules: Rules,
) {
    {
        let arena = Rc::clone(arena);
        let state = Rc::clone(state);
        dispatcher.register_setup(PLAY, move || {
            let mut state = state.borrow_mut();
            let players: Vec<PlayerId> = if state.joined.is_empty() {
                vec![DEFAULT_PLAYER]
            } else {
                state.joined.iter().copied().collect()
            };
            let mut arena = arena.borrow_mut();
            arena.counters.reset(CounterId::Score, 0);
            arena.counters.reset(CounterId::Lives, rules.starting_lives);
            arena.counters.define(
                CounterId::Countdown,
                rules.play_time_limit_ticks,
                0,
                Direction::Falling,
            );

            state.outcome = None;
            state.frames_in_play = 0;
            state.rounds_played += 1;
            state.player_sprites.clear();
            let (width, height) = arena.sprites.bounds();
            for (slot, player) in players.iter().enumerate() {
                let x = width * (slot + 1) as f32 / (players.len() + 1) as f32;
                let id = arena.sprites.spawn(
                    SpriteKind::Player(*player),
                    Vec2::new(x, height * 0.5),
                    PLAYER_HALF_SIZE,
                );
                state.player_sprites.insert(*player, id);
            }
            info!(
                round = state.rounds_played,
                players = players.len(),
                "round_started"
            );
            Ok(())
        });
    }
    {
        let arena = Rc::clone(arena);
        let state = Rc::clone(state);
        dispatcher.register_cleanup(PLAY, move || {
            let cleared = arena
                .borrow_mut()
                .sprites
                .destroy_where(|sprite| sprite.kind != SpriteKind::Banner);
            state.borrow_mut().player_sprites.clear();
            debug!(cleared, "play_sprites_cleared");
            Ok(())
        });
    }
    {
        let arena = Rc::clone(arena);
        hub.on_tick(dispatcher, PLAY, move |_: &TickEvent| {
            arena.borrow_mut().counters.add(CounterId::Countdown, -1);
            Ok(())
        });
    }
    {
        let state = Rc::clone(state);
        hub.on_frame(dispatcher, PLAY, move |_: &FrameEvent| {
            state.borrow_mut().frames_in_play += 1;
            Ok(())
        });
    }
    {
        let arena = Rc::clone(arena);
        let state = Rc::clone(state);
        hub.on_interval(dispatcher, PLAY, move |event: &IntervalEvent| {
            let mut arena = arena.borrow_mut();
            let (width, height) = arena.sprites.bounds();
            let mut state = state.borrow_mut();
            let margin = COIN_HALF_SIZE * 2.0;
            let x = state.coin_axis(width, margin);
            let y = state.coin_axis(height, margin);
            let coin = arena
                .sprites
                .spawn(SpriteKind::Coin, Vec2::new(x, y), COIN_HALF_SIZE);
            state.coins_spawned += 1;
            debug!(
                coin = coin.0,
                interval = event.count,
                spawned = state.coins_spawned,
                "coin_spawned"
            );
            Ok(())
        });
    }
    {
        let arena = Rc::clone(arena);
        let state = Rc::clone(state);
        hub.on_button(dispatcher, PLAY, move |event: &ButtonEvent| {
            let Some(sprite) = state.borrow().player_sprites.get(&event.player).copied() else {
                return Ok(());
            };
            steer(&mut arena.borrow_mut(), sprite, event.button, event.edge);
            Ok(())
        });
    }
    {
        let arena = Rc::clone(arena);
        let state = Rc::clone(state);
        hub.on_sprite_event(dispatcher, PLAY, move |event: &SpriteEvent| {
            let mut arena = arena.borrow_mut();
            match *event {
                SpriteEvent::Overlap(a, b) => {
                    let kinds = (
                        arena.sprites.get(a).map(|sprite| sprite.kind),
                        arena.sprites.get(b).map(|sprite| sprite.kind),
                    );
                    let pickup = match kinds {
                        (Some(SpriteKind::Player(player)), Some(SpriteKind::Coin)) => {
                            Some((player, b))
                        }
                        (Some(SpriteKind::Coin), Some(SpriteKind::Player(player))) => {
                            Some((player, a))
                        }
                        _ => None,
                    };
                    if let Some((player, coin)) = pickup {
                        if arena.sprites.destroy(coin) {
                            let score = arena.counters.add(CounterId::Score, 1);
                            info!(player = %player, score, "coin_collected");
                        }
                    }
                }
                SpriteEvent::BoundaryHit(id, wall) => {
                    if let Some(player) = state.borrow().player_for_sprite(id) {
                        let lives = arena.counters.add(CounterId::Lives, -1);
                        info!(player = %player, wall = ?wall, lives, "life_lost");
                    }
                }
                SpriteEvent::Destroyed(_) => {}
            }
            Ok(())
        });
    }
    {
        let arena = Rc::clone(arena);
        let state = Rc::clone(state);
        hub.on_connection(dispatcher, PLAY, move |event: &ConnectionEvent| {
            let mut state = state.borrow_mut();
            let mut arena = arena.borrow_mut();
            match *event {
                ConnectionEvent::Connected(player) => {
                    state.joined.insert(player);
                    if !state.player_sprites.contains_key(&player) {
                        let (width, height) = arena.sprites.bounds();
                        let id = arena.sprites.spawn(
                            SpriteKind::Player(player),
                            Vec2::new(width * 0.5, height * 0.5),
                            PLAYER_HALF_SIZE,
                        );
                        state.player_sprites.insert(player, id);
                        info!(player = %player, "player_dropped_in");
                    }
                }
                ConnectionEvent::Disconnected(player) => {
                    state.joined.remove(&player);
                    if let Some(id) = state.player_sprites.remove(&player) {
                        arena.sprites.destroy(id);
                        info!(player = %player, "player_dropped_out");
                    }
                }
            }
            Ok(())
        });
    }
    {
        let state = Rc::clone(state);
        let weak = dispatcher.downgrade();
        hub.on_threshold(dispatcher, PLAY, move |event: &ThresholdEvent| {
            {
                let mut state = state.borrow_mut();
                if state.outcome.is_some() {
                    return Ok(());
                }
                state.outcome = Some(Outcome::for_counter(event.counter));
            }
            weak.transition_to(GAME_OVER)
        });
    }
}

fn install_game_over(
    dispatcher: &SceneDispatcher,
    hub: &mut EventHub,
    arena: &SharedArena,
    state: &SharedState,
) {
    {
        let arena = Rc::clone(arena);
        let state = Rc::clone(state);
        dispatcher.register_setup(GAME_OVER, move || {
            let score = arena.borrow().counters.get(CounterId::Score).unwrap_or(0);
            let mut state = state.borrow_mut();
            state.final_score = score;
            info!(
                score = state.final_score,
                outcome = ?state.outcome,
                frames = state.frames_in_play,
                "game_over"
            );
            Ok(())
        });
    }
    {
        let state = Rc::clone(state);
        hub.on_connection(dispatcher, GAME_OVER, move |event: &ConnectionEvent| {
            update_roster(&mut state.borrow_mut(), event);
            Ok(())
        });
    }
    let weak = dispatcher.downgrade();
    hub.on_button(dispatcher, GAME_OVER, move |event: &ButtonEvent| {
        if is_start_press(event) {
            return weak.transition_to(MENU);
        }
        Ok(())
    });
}

fn update_roster(state: &mut GameState, event: &ConnectionEvent) {
    match *event {
        ConnectionEvent::Connected(player) => {
            state.joined.insert(player);
            info!(player = %player, joined = state.joined.len(), "player_joined");
        }
        ConnectionEvent::Disconnected(player) => {
            state.joined.remove(&player);
            info!(player = %player, joined = state.joined.len(), "player_left");
        }
    }
}

fn is_start_press(event: &ButtonEvent) -> bool {
    event.button == Button::Start && event.edge == ButtonEdge::Pressed
}

fn steer(arena: &mut Arena, sprite: SpriteId, button: Button, edge: ButtonEdge) {
    let Some(current) = arena.sprites.get(sprite).map(|sprite| sprite.velocity) else {
        return;
    };
    let speed = match edge {
        ButtonEdge::Pressed => PLAYER_SPEED_UNITS_PER_SECOND,
        ButtonEdge::Released => 0.0,
    };
    let velocity = match button {
        Button::Left => Vec2::new(-speed, current.y),
        Button::Right => Vec2::new(speed, current.y),
        Button::Down => Vec2::new(current.x, -speed),
        Button::Up => Vec2::new(current.x, speed),
        Button::Start => return,
    };
    arena.sprites.set_velocity(sprite, velocity);
}
