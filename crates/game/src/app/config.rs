use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use scenes::DispatcherConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::collaborators::{Button, PlayerId};

pub(crate) const CONFIG_PATH_ENV_VAR: &str = "SCENES_DEMO_CONFIG";
pub(crate) const FRAMES_ENV_VAR: &str = "SCENES_DEMO_FRAMES";
pub(crate) const TPS_ENV_VAR: &str = "SCENES_DEMO_TPS";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("read config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config '{}'{}: {source}", .path.display(), location_suffix(.at))]
    Parse {
        path: PathBuf,
        at: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

fn location_suffix(at: &str) -> String {
    if at.is_empty() || at == "." {
        String::new()
    } else {
        format!(" at {at}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct ArenaConfig {
    pub(crate) width: f32,
    pub(crate) height: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 16.0,
            height: 9.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum ScriptedAction {
    Press { button: Button },
    Release { button: Button },
    Connect,
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) struct ScriptedInput {
    pub(crate) tick: u64,
    pub(crate) player: PlayerId,
    pub(crate) action: ScriptedAction,
}

impl ScriptedInput {
    const fn new(tick: u64, player: u8, action: ScriptedAction) -> Self {
        Self {
            tick,
            player: PlayerId(player),
            action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct LoopConfig {
    pub(crate) target_tps: u32,
    pub(crate) max_frame_delta_ms: u64,
    pub(crate) max_ticks_per_frame: u32,
    pub(crate) frame_count: u64,
    pub(crate) frame_delta_ms: u64,
    /// Coin spawn period during Play. Zero disables coin spawns.
    pub(crate) interval_ms: u64,
    pub(crate) play_time_limit_ticks: i64,
    pub(crate) starting_lives: i64,
    pub(crate) score_goal: i64,
    pub(crate) arena: ArenaConfig,
    pub(crate) dispatcher: DispatcherConfig,
    pub(crate) input_script: Vec<ScriptedInput>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta_ms: 250,
            max_ticks_per_frame: 5,
            frame_count: 600,
            frame_delta_ms: 16,
            interval_ms: 1000,
            play_time_limit_ticks: 480,
            starting_lives: 3,
            score_goal: 5,
            arena: ArenaConfig::default(),
            dispatcher: DispatcherConfig::default(),
            input_script: default_input_script(),
        }
    }
}

impl LoopConfig {
    pub(crate) fn max_frame_delta(&self) -> Duration {
        Duration::from_millis(self.max_frame_delta_ms)
    }

    pub(crate) fn frame_delta(&self) -> Duration {
        Duration::from_millis(self.frame_delta_ms)
    }

    pub(crate) fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.target_tps == 0 {
            return Err(ConfigError::Invalid {
                field: "target_tps",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.max_ticks_per_frame == 0 {
            return Err(ConfigError::Invalid {
                field: "max_ticks_per_frame",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.starting_lives <= 0 {
            return Err(ConfigError::Invalid {
                field: "starting_lives",
                message: format!("expected at least 1, got {}", self.starting_lives),
            });
        }
        if !(self.arena.width > 1.0 && self.arena.height > 1.0) {
            return Err(ConfigError::Invalid {
                field: "arena",
                message: format!(
                    "expected both sides above 1.0, got {}x{}",
                    self.arena.width, self.arena.height
                ),
            });
        }
        Ok(())
    }
}

/// P1 joins, starts the game and steers right toward the wall.
fn default_input_script() -> Vec<ScriptedInput> {
    vec![
        ScriptedInput::new(0, 1, ScriptedAction::Connect),
        ScriptedInput::new(30, 1, ScriptedAction::Press { button: Button::Start }),
        ScriptedInput::new(35, 1, ScriptedAction::Release { button: Button::Start }),
        ScriptedInput::new(60, 1, ScriptedAction::Press { button: Button::Right }),
        ScriptedInput::new(120, 1, ScriptedAction::Release { button: Button::Right }),
        ScriptedInput::new(150, 1, ScriptedAction::Press { button: Button::Up }),
        ScriptedInput::new(200, 1, ScriptedAction::Release { button: Button::Up }),
    ]
}

/// Defaults, then the JSON file named by `SCENES_DEMO_CONFIG`, then the
/// per-field env overrides.
pub(crate) fn load_config() -> Result<LoopConfig, ConfigError> {
    let mut config = match env::var(CONFIG_PATH_ENV_VAR) {
        Ok(path) => {
            let config = load_config_file(Path::new(&path))?;
            info!(path = path.as_str(), "loop_config_loaded");
            config
        }
        Err(env::VarError::NotPresent) => LoopConfig::default(),
        Err(err) => {
            warn!(
                env_var = CONFIG_PATH_ENV_VAR,
                error = %err,
                "unable to read config path env var; using defaults"
            );
            LoopConfig::default()
        }
    };

    config.frame_count = resolve_override(
        FRAMES_ENV_VAR,
        env::var(FRAMES_ENV_VAR),
        config.frame_count,
    );
    config.target_tps = resolve_override(TPS_ENV_VAR, env::var(TPS_ENV_VAR), config.target_tps);
    config.validate()?;
    Ok(config)
}

pub(crate) fn load_config_file(path: &Path) -> Result<LoopConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_json(path, &raw)
}

fn parse_config_json(path: &Path, raw: &str) -> Result<LoopConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, LoopConfig>(&mut deserializer).map_err(|error| {
        let at = error.path().to_string();
        ConfigError::Parse {
            path: path.to_path_buf(),
            at,
            source: error.into_inner(),
        }
    })
}

fn resolve_override<T>(env_var: &'static str, raw: Result<String, env::VarError>, fallback: T) -> T
where
    T: FromStr + Copy,
{
    match raw {
        Ok(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    env_var,
                    value = value.as_str(),
                    "invalid env override value; falling back to config"
                );
                fallback
            }
        },
        Err(env::VarError::NotPresent) => fallback,
        Err(err) => {
            warn!(
                env_var,
                error = %err,
                "unable to read env override; falling back to config"
            );
            fallback
        }
    }
}
