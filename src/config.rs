//! Application-level configuration loading: discussion timing, live buffers and seed themes.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::timer::TimerSettings;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "EMOJI_GUESS_BACK_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Theme inserted into the catalog at startup.
pub struct ThemeSeed {
    /// Title players have to guess.
    pub title: String,
    /// Clue shown to the host.
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    timer: TimerSettings,
    connection_buffer: usize,
    themes: Vec<ThemeSeed>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        themes = app_config.themes.len(),
                        discussion = ?app_config.timer.duration,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Countdown settings for the discussion phase.
    pub fn timer(&self) -> TimerSettings {
        self.timer
    }

    /// Outbound frames a live connection may lag behind before eviction.
    pub fn connection_buffer(&self) -> usize {
        self.connection_buffer
    }

    /// Themes seeded into the catalog.
    pub fn themes(&self) -> &[ThemeSeed] {
        &self.themes
    }

    #[cfg(test)]
    pub(crate) fn with_connection_buffer(mut self, connection_buffer: usize) -> Self {
        self.connection_buffer = connection_buffer.max(1);
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    discussion_secs: u64,
    timer_start_delay_ms: u64,
    tick_interval_ms: u64,
    connection_buffer: usize,
    themes: Vec<RawTheme>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            discussion_secs: 300,
            timer_start_delay_ms: 5_000,
            tick_interval_ms: 1_000,
            connection_buffer: 256,
            themes: default_themes(),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let themes = if value.themes.is_empty() {
            warn!("config lists no themes; using built-in themes");
            default_themes()
        } else {
            value.themes
        };
        Self {
            timer: TimerSettings {
                duration: Duration::from_secs(value.discussion_secs),
                start_delay: Duration::from_millis(value.timer_start_delay_ms),
                tick: Duration::from_millis(value.tick_interval_ms.max(1)),
            },
            connection_buffer: value.connection_buffer.max(1),
            themes: themes.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single theme entry.
struct RawTheme {
    title: String,
    #[serde(default)]
    hint: String,
}

impl From<RawTheme> for ThemeSeed {
    fn from(value: RawTheme) -> Self {
        Self {
            title: value.title,
            hint: value.hint,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in theme catalog shipped with the binary.
fn default_themes() -> Vec<RawTheme> {
    [
        ("Mona Lisa", "A smile in the Louvre"),
        ("Titanic", "A ship, an iceberg and a door"),
        ("Harry Potter", "A scar shaped like lightning"),
        ("Romeo and Juliet", "Two families, one balcony"),
        ("Star Wars", "A galaxy far, far away"),
        ("The Little Prince", "A rose on a tiny planet"),
        ("Jurassic Park", "Life finds a way"),
        ("Snow White", "An apple and seven friends"),
    ]
    .into_iter()
    .map(|(title, hint)| RawTheme {
        title: title.into(),
        hint: hint.into(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_game_rules() {
        let config = AppConfig::default();
        assert_eq!(config.timer(), TimerSettings::default());
        assert_eq!(config.connection_buffer(), 256);
        assert!(!config.themes().is_empty());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"discussion_secs": 60, "themes": [{"title": "Tetris"}]}"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.timer().duration, Duration::from_secs(60));
        assert_eq!(config.timer().start_delay, Duration::from_secs(5));
        assert_eq!(
            config.themes(),
            &[ThemeSeed {
                title: "Tetris".into(),
                hint: String::new()
            }]
        );
    }

    #[test]
    fn zero_tick_is_clamped() {
        let raw: RawConfig = serde_json::from_str(r#"{"tick_interval_ms": 0}"#).unwrap();
        assert_eq!(AppConfig::from(raw).timer().tick, Duration::from_millis(1));
    }
}
