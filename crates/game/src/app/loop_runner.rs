use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

use scenes::{HandlerError, SceneDispatcher, SceneName, TransitionError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::bootstrap::AppWiring;
use super::collaborators::{Arena, CounterId, EventHub, SharedArena, SpriteKind};
use super::config::{ConfigError, LoopConfig, ScriptedAction, ScriptedInput};
use super::gameplay::{self, SharedState, MENU};

const FALLBACK_MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("scene transition failed: {0}")]
    Transition(#[from] TransitionError),
    #[error("event handler failed: {0}")]
    Handler(#[from] HandlerError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoopSummary {
    pub(crate) frames: u64,
    pub(crate) ticks: u64,
    pub(crate) clamped_frames: u64,
    pub(crate) transitions: u64,
    pub(crate) scene: Option<SceneName>,
    pub(crate) score: i64,
    pub(crate) rounds_played: u32,
    pub(crate) players_connected: usize,
    pub(crate) sprites_alive: usize,
    pub(crate) coins_alive: usize,
}

pub(crate) struct Simulation {
    dispatcher: SceneDispatcher,
    hub: EventHub,
    arena: SharedArena,
    state: SharedState,
    script: Vec<ScriptedInput>,
    cursor: usize,
    fixed_dt: Duration,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    accumulator: Duration,
    clamped_frames: u64,
}

impl Simulation {
    pub(crate) fn new(config: &LoopConfig) -> Self {
        let dispatcher = SceneDispatcher::with_config(config.dispatcher);
        let mut hub = EventHub::new(config.interval());
        let arena: SharedArena = Rc::new(RefCell::new(Arena::new(
            config.arena.width,
            config.arena.height,
        )));
        let state = gameplay::install(&dispatcher, &mut hub, &arena, config);

        let mut script = config.input_script.clone();
        script.sort_by_key(|input| input.tick);

        Self {
            dispatcher,
            hub,
            arena,
            state,
            script,
            cursor: 0,
            fixed_dt: fixed_step(config.target_tps),
            max_frame_delta: normalize_non_zero_duration(
                config.max_frame_delta(),
                FALLBACK_MAX_FRAME_DELTA,
            ),
            max_ticks_per_frame: config.max_ticks_per_frame.max(1),
            accumulator: Duration::ZERO,
            clamped_frames: 0,
        }
    }

    pub(crate) fn start(&mut self) -> Result<(), AppError> {
        self.dispatcher.transition_to(MENU)?;
        Ok(())
    }

    pub(crate) fn run_frame(&mut self, raw_frame_dt: Duration) -> Result<StepPlan, AppError> {
        let frame_dt = clamp_frame_delta(raw_frame_dt, self.max_frame_delta);
        let plan = plan_sim_steps(
            self.accumulator.saturating_add(frame_dt),
            self.fixed_dt,
            self.max_ticks_per_frame,
        );
        self.accumulator = plan.remaining_accumulator;
        if !plan.dropped_backlog.is_zero() {
            self.clamped_frames += 1;
            warn!(
                ticks = plan.ticks_to_run,
                dropped_backlog_ms = plan.dropped_backlog.as_millis() as u64,
                "sim_clamp_triggered"
            );
        }

        for _ in 0..plan.ticks_to_run {
            self.run_tick()?;
        }
        self.hub.frames.fire(frame_dt, plan.ticks_to_run)?;
        Ok(plan)
    }

    /// Scripted input, then button and connection edges, the tick itself,
    /// sprite movement, deferred destruction, intervals and finally counter
    /// thresholds.
    pub(crate) fn run_tick(&mut self) -> Result<(), AppError> {
        let tick = self.hub.ticks.next_tick();
        let dt_seconds = self.fixed_dt.as_secs_f32();
        self.apply_script(tick);

        self.hub.connections.dispatch_pending()?;
        self.hub.buttons.dispatch_pending()?;
        self.hub.ticks.fire(dt_seconds)?;

        let stepped = self.arena.borrow_mut().sprites.step(dt_seconds);
        self.hub.emit_sprite_events(&stepped)?;
        let destroyed = self.arena.borrow_mut().sprites.apply_pending();
        self.hub.emit_sprite_events(&destroyed)?;

        self.hub.intervals.advance(self.fixed_dt)?;

        let crossed = self.arena.borrow_mut().counters.take_pending();
        self.hub.emit_thresholds(&crossed)?;
        Ok(())
    }

    fn apply_script(&mut self, tick: u64) {
        while let Some(input) = self.script.get(self.cursor) {
            if input.tick > tick {
                break;
            }
            match input.action {
                ScriptedAction::Press { button } => {
                    self.hub.buttons.handle_button_state(input.player, button, true)
                }
                ScriptedAction::Release { button } => {
                    self.hub.buttons.handle_button_state(input.player, button, false)
                }
                ScriptedAction::Connect => self.hub.connections.set_connected(input.player, true),
                ScriptedAction::Disconnect => {
                    self.hub.connections.set_connected(input.player, false)
                }
            }
            self.cursor += 1;
        }
    }

    pub(crate) fn dispatcher(&self) -> &SceneDispatcher {
        &self.dispatcher
    }

    pub(crate) fn summary(&self) -> LoopSummary {
        let arena = self.arena.borrow();
        LoopSummary {
            frames: self.hub.frames.frames_fired(),
            ticks: self.hub.ticks.next_tick(),
            clamped_frames: self.clamped_frames,
            transitions: self.dispatcher.transitions_completed(),
            scene: self.dispatcher.current_scene(),
            score: arena.counters.get(CounterId::Score).unwrap_or(0),
            rounds_played: self.state.borrow().rounds_played,
            players_connected: self.hub.connections.connected().count(),
            sprites_alive: arena.sprites.len(),
            coins_alive: arena.sprites.count(|sprite| sprite.kind == SpriteKind::Coin),
        }
    }
}

pub(crate) fn run_loop(app: AppWiring) -> Result<LoopSummary, AppError> {
    let config = app.config;
    info!(
        target_tps = config.target_tps,
        frame_count = config.frame_count,
        frame_delta_ms = config.frame_delta_ms,
        max_ticks_per_frame = config.max_ticks_per_frame,
        max_transition_depth = config.dispatcher.max_transition_depth,
        same_scene = ?config.dispatcher.same_scene,
        "loop_config"
    );

    let mut sim = Simulation::new(&config);
    sim.start()?;
    for _ in 0..config.frame_count {
        sim.run_frame(config.frame_delta())?;
    }

    match sim.dispatcher().snapshot().to_json_pretty() {
        Ok(json) => debug!(snapshot = %json, "dispatcher_snapshot"),
        Err(err) => warn!(error = %err, "dispatcher_snapshot_failed"),
    }

    let summary = sim.summary();
    info!(
        frames = summary.frames,
        ticks = summary.ticks,
        clamped_frames = summary.clamped_frames,
        transitions = summary.transitions,
        scene = ?summary.scene.as_ref().map(SceneName::as_str),
        score = summary.score,
        rounds = summary.rounds_played,
        coins = summary.coins_alive,
        "loop_summary"
    );
    Ok(summary)
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    if let Err(err) = run_loop(app) {
        error!(error = %err, "demo_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn fixed_step(target_tps: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / u64::from(target_tps.max(1)))
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
