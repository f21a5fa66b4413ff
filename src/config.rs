//! Runtime settings.
//!
//! Everything has a default, so an empty `{}` file (or no file at all) is a
//! valid configuration. API keys can also come from the environment, which
//! wins over the file.

use crate::constants::*;
use crate::services::Location;
use crate::sprite_sheet::SheetLayout;
use crate::state::StateTimings;
use crate::tips::TipProducerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "desk-marten.json";

pub const OPENWEATHER_KEY_VAR: &str = "OPENWEATHER_API_KEY";
pub const NEWS_KEY_VAR: &str = "NEWS_API_KEY";
pub const GEMINI_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid settings in {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolTransport {
    /// Call the tools directly
    InProcess,
    /// Run `desk-marten serve` as a child process and talk JSON-RPC to it
    Stdio,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub openweather: Option<String>,
    pub news: Option<String>,
    pub gemini: Option<String>,
}

impl ApiKeys {
    /// Fill keys from environment variables through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let pick = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        if let Some(v) = pick(OPENWEATHER_KEY_VAR) {
            self.openweather = Some(v);
        }
        if let Some(v) = pick(NEWS_KEY_VAR) {
            self.news = Some(v);
        }
        if let Some(v) = pick(GEMINI_KEY_VAR) {
            self.gemini = Some(v);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TipSettings {
    pub enabled: bool,
    pub warmup_secs: u64,
    pub period_secs: u64,
    pub poll_secs: u64,
    pub transport: ToolTransport,
    pub location: Location,
    pub gemini_model: String,
}

impl Default for TipSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            warmup_secs: TIP_WARMUP_SECS,
            period_secs: TIP_PERIOD_SECS,
            poll_secs: TIP_POLL_SECS,
            transport: ToolTransport::InProcess,
            location: Location::default(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

impl TipSettings {
    pub fn producer_config(&self) -> TipProducerConfig {
        TipProducerConfig {
            warmup: Duration::from_secs(self.warmup_secs),
            // A zero period would spin
            period: Duration::from_secs(self.period_secs.max(1)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub assets_dir: PathBuf,
    pub awake_sheet: String,
    pub sleep_sheet: String,
    pub frame_count: u32,
    pub frame_size: u32,
    pub display_size: u32,
    pub start_asleep: bool,
    pub timings: StateTimings,
    /// Minimum time between animation frames (milliseconds)
    pub frame_interval_ms: u64,
    /// Walking speed (pixels per tick)
    pub move_speed: f32,
    /// Press-release pairs shorter than this are taps (seconds)
    pub tap_threshold_secs: f32,
    pub tips: TipSettings,
    pub api_keys: ApiKeys,
    /// Serve puffin profiling data on the default port
    pub profiling: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            awake_sheet: "american_marten.png".into(),
            sleep_sheet: "american_marten_sleep.png".into(),
            frame_count: SHEET_FRAME_COUNT,
            frame_size: SHEET_FRAME_SIZE,
            display_size: DISPLAY_FRAME_SIZE,
            start_asleep: true,
            timings: StateTimings::default(),
            frame_interval_ms: FRAME_INTERVAL_MS,
            move_speed: MOVE_SPEED,
            tap_threshold_secs: TAP_THRESHOLD_SECS,
            tips: TipSettings::default(),
            api_keys: ApiKeys::default(),
            profiling: false,
        }
    }
}

impl Settings {
    /// Load from `path`, or from `desk-marten.json` in the working directory
    /// if that exists, or fall back to defaults. Environment keys are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    tracing::debug!("no settings file, using defaults");
                    Self::default()
                }
            }
        };
        settings.api_keys.apply_env(|var| std::env::var(var).ok());
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.check().map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        tracing::info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Reject values the pet cannot run with
    pub fn check(&self) -> Result<(), String> {
        self.timings.check()?;
        for (name, value) in [
            ("frame_count", self.frame_count),
            ("frame_size", self.frame_size),
            ("display_size", self.display_size),
        ] {
            if value == 0 || value > MAX_FRAME_EDGE {
                return Err(format!("{name} must be between 1 and {MAX_FRAME_EDGE}"));
            }
        }
        if !(self.move_speed.is_finite() && (0.0..=MAX_MOVE_SPEED).contains(&self.move_speed)) {
            return Err(format!("move_speed must be between 0 and {MAX_MOVE_SPEED}"));
        }
        if !(self.tap_threshold_secs.is_finite()
            && (0.0..=MAX_TAP_THRESHOLD_SECS).contains(&self.tap_threshold_secs))
        {
            return Err(format!(
                "tap_threshold_secs must be between 0 and {MAX_TAP_THRESHOLD_SECS}"
            ));
        }
        Ok(())
    }

    pub fn sheet_layout(&self) -> SheetLayout {
        SheetLayout {
            frame_count: self.frame_count,
            frame_size: self.frame_size,
            display_size: self.display_size,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn tap_threshold(&self) -> Duration {
        let secs = self.tap_threshold_secs;
        if secs.is_finite() {
            Duration::from_secs_f32(secs.clamp(0.0, MAX_TAP_THRESHOLD_SECS))
        } else {
            Duration::from_secs_f32(TAP_THRESHOLD_SECS)
        }
    }

    pub fn awake_sheet_path(&self) -> PathBuf {
        self.assets_dir.join(&self.awake_sheet)
    }

    pub fn sleep_sheet_path(&self) -> PathBuf {
        self.assets_dir.join(&self.sleep_sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.tips.poll_interval(), Duration::from_secs(5));
        assert_eq!(settings.sheet_layout().display_size, 160);
        assert_eq!(settings.frame_interval(), Duration::from_millis(150));
        assert_eq!(settings.tap_threshold(), Duration::from_secs_f32(0.2));
    }

    #[test]
    fn test_partial_file_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "start_asleep": false,
                "move_speed": 3.5,
                "timings": {{"idle": {{"min_secs": 1.0, "max_secs": 2.0}}}},
                "tips": {{"transport": "stdio", "location": {{"lat": 51.5, "lon": -0.12}}}}
            }}"#
        )
        .unwrap();
        let settings = Settings::from_file(file.path()).unwrap();
        assert!(!settings.start_asleep);
        assert_eq!(settings.move_speed, 3.5);
        assert_eq!(settings.timings.idle.max_secs, 2.0);
        assert_eq!(settings.timings.moving, StateTimings::default().moving);
        assert_eq!(settings.tips.transport, ToolTransport::Stdio);
        assert_eq!(settings.tips.location.lat, 51.5);
        assert_eq!(settings.tips.period_secs, TIP_PERIOD_SECS);
    }

    #[test]
    fn test_bad_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));

        let missing = Settings::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }

    #[test]
    fn test_unusable_values_rejected_on_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"timings": {{"idle": {{"min_secs": -1.0, "max_secs": 2.0}}}}}}"#).unwrap();
        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("idle durations"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"frame_count": 0}}"#).unwrap();
        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("frame_count must be between 1"));
    }

    #[test]
    fn test_infinite_values_fail_check() {
        let settings = Settings {
            tap_threshold_secs: f32::INFINITY,
            ..Settings::default()
        };
        assert!(settings.check().unwrap_err().starts_with("tap_threshold_secs"));
        assert_eq!(settings.tap_threshold(), Duration::from_secs_f32(TAP_THRESHOLD_SECS));

        let settings = Settings {
            move_speed: f32::NAN,
            ..Settings::default()
        };
        assert!(settings.check().unwrap_err().starts_with("move_speed"));

        let settings = Settings {
            frame_count: MAX_FRAME_EDGE,
            frame_size: MAX_FRAME_EDGE,
            ..Settings::default()
        };
        assert!(settings.check().is_ok());
    }

    #[test]
    fn test_env_keys_override_file() {
        let mut keys = ApiKeys {
            openweather: Some("from-file".into()),
            news: Some("news-file".into()),
            gemini: None,
        };
        keys.apply_env(|var| match var {
            OPENWEATHER_KEY_VAR => Some("from-env".into()),
            NEWS_KEY_VAR => Some("  ".into()),
            GEMINI_KEY_VAR => Some("g".into()),
            _ => None,
        });
        assert_eq!(keys.openweather.as_deref(), Some("from-env"));
        assert_eq!(keys.news.as_deref(), Some("news-file"));
        assert_eq!(keys.gemini.as_deref(), Some("g"));
    }

    #[test]
    fn test_producer_config_never_zero_period() {
        let tips = TipSettings {
            period_secs: 0,
            ..TipSettings::default()
        };
        assert_eq!(tips.producer_config().period, Duration::from_secs(1));
    }
}
