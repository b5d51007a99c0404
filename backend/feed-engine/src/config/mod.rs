use crate::error::{FeedError, Result};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for the rotation seed bucket (one year)
pub const MAX_BUCKET_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub log_format: LogFormat,
    pub rotation: RotationConfig,
    pub home_playback: PlaybackConfig,
    pub explore_playback: PlaybackConfig,
    pub profile_playback: PlaybackConfig,
    pub view_ingest: ViewIngestConfig,
    pub content: ContentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RotationConfig {
    pub max_results: usize,
    pub horizon_hours: f64,
    pub noise_span: f64,
    pub like_weight: f64,
    pub comment_weight: f64,
    /// Every Nth slot of the home feed is sponsored
    pub boost_cadence: usize,
    pub bucket_hours: i64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            max_results: 48,
            horizon_hours: 100.0,
            noise_span: 20.0,
            like_weight: 1.0,
            comment_weight: 2.0,
            boost_cadence: 4,
            bucket_hours: 6,
        }
    }
}

impl RotationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.boost_cadence < 2 {
            return Err(FeedError::InvalidConfig(format!(
                "boost cadence must be at least 2 (got {})",
                self.boost_cadence
            )));
        }
        if !(1..=MAX_BUCKET_HOURS).contains(&self.bucket_hours) {
            return Err(FeedError::InvalidConfig(format!(
                "bucket hours must lie in [1, {}] (got {})",
                MAX_BUCKET_HOURS, self.bucket_hours
            )));
        }
        Ok(())
    }
}

/// Log output of the CLI: human-readable lines or one JSON object per event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Feed surfaces that mount a playback coordinator. Each gets its own
/// thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Home,
    Explore,
    Profile,
}

impl Surface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Home => "home",
            Surface::Explore => "explore",
            Surface::Profile => "profile",
        }
    }

    fn env_prefix(&self) -> &'static str {
        match self {
            Surface::Home => "PLAYBACK_HOME",
            Surface::Explore => "PLAYBACK_EXPLORE",
            Surface::Profile => "PLAYBACK_PROFILE",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Minimum visibility ratio for a candidate to start playing
    pub activation_threshold: f64,
    /// The playing element pauses once its ratio drops below this
    pub deactivation_threshold: f64,
    /// Container rescan and loop-clamp cadence
    pub tick_interval: Duration,
    pub controls_hide_delay: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 0.6,
            deactivation_threshold: 0.45,
            tick_interval: Duration::from_millis(16),
            controls_hide_delay: Duration::from_millis(2500),
        }
    }
}

impl PlaybackConfig {
    pub fn with_thresholds(mut self, activation: f64, deactivation: f64) -> Self {
        self.activation_threshold = activation;
        self.deactivation_threshold = deactivation;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let (act, deact) = (self.activation_threshold, self.deactivation_threshold);
        if !(0.0..=1.0).contains(&act) || !(0.0..=1.0).contains(&deact) {
            return Err(FeedError::InvalidConfig(format!(
                "thresholds must lie in [0, 1] (activation={}, deactivation={})",
                act, deact
            )));
        }
        if deact >= act {
            return Err(FeedError::InvalidConfig(format!(
                "deactivation threshold {} must be below activation threshold {}",
                deact, act
            )));
        }
        if self.tick_interval.is_zero() {
            return Err(FeedError::InvalidConfig(
                "tick interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewIngestConfig {
    /// Maximum view submissions per item per session
    pub cap_per_item: u32,
    pub submit_timeout: Duration,
}

impl Default for ViewIngestConfig {
    fn default() -> Self {
        Self {
            cap_per_item: 5,
            submit_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    pub page_size: u32,
    pub fetch_timeout: Duration,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            page_size: 60,
            fetch_timeout: Duration::from_secs(8),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = RotationConfig::default();
        let rotation = RotationConfig {
            max_results: env_or("ROTATION_MAX_RESULTS", defaults.max_results)?,
            horizon_hours: env_or("ROTATION_HORIZON_HOURS", defaults.horizon_hours)?,
            noise_span: env_or("ROTATION_NOISE_SPAN", defaults.noise_span)?,
            like_weight: env_or("ROTATION_LIKE_WEIGHT", defaults.like_weight)?,
            comment_weight: env_or("ROTATION_COMMENT_WEIGHT", defaults.comment_weight)?,
            boost_cadence: env_or("ROTATION_BOOST_CADENCE", defaults.boost_cadence)?,
            bucket_hours: env_or("ROTATION_BUCKET_HOURS", defaults.bucket_hours)?,
        };
        rotation.validate()?;

        let view_defaults = ViewIngestConfig::default();
        let view_ingest = ViewIngestConfig {
            cap_per_item: env_or("VIEW_CAP_PER_ITEM", view_defaults.cap_per_item)?,
            submit_timeout: Duration::from_millis(env_or(
                "VIEW_SUBMIT_TIMEOUT_MS",
                view_defaults.submit_timeout.as_millis() as u64,
            )?),
        };

        let content_defaults = ContentConfig::default();
        let content = ContentConfig {
            page_size: env_or("CONTENT_PAGE_SIZE", content_defaults.page_size)?,
            fetch_timeout: Duration::from_millis(env_or(
                "CONTENT_FETCH_TIMEOUT_MS",
                content_defaults.fetch_timeout.as_millis() as u64,
            )?),
        };

        Ok(Config {
            log_format: env_or("LOG_FORMAT", LogFormat::default())?,
            rotation,
            home_playback: playback_from_env(Surface::Home)?,
            explore_playback: playback_from_env(Surface::Explore)?,
            profile_playback: playback_from_env(Surface::Profile)?,
            view_ingest,
            content,
        })
    }

    pub fn playback_for(&self, surface: Surface) -> &PlaybackConfig {
        match surface {
            Surface::Home => &self.home_playback,
            Surface::Explore => &self.explore_playback,
            Surface::Profile => &self.profile_playback,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            rotation: RotationConfig::default(),
            home_playback: PlaybackConfig::default(),
            explore_playback: PlaybackConfig::default(),
            profile_playback: PlaybackConfig::default(),
            view_ingest: ViewIngestConfig::default(),
            content: ContentConfig::default(),
        }
    }
}

fn playback_from_env(surface: Surface) -> Result<PlaybackConfig> {
    let defaults = PlaybackConfig::default();
    let prefix = surface.env_prefix();

    let config = PlaybackConfig {
        activation_threshold: env_or(
            &format!("{}_ACTIVATION", prefix),
            defaults.activation_threshold,
        )?,
        deactivation_threshold: env_or(
            &format!("{}_DEACTIVATION", prefix),
            defaults.deactivation_threshold,
        )?,
        tick_interval: Duration::from_millis(env_or(
            "PLAYBACK_TICK_MS",
            defaults.tick_interval.as_millis() as u64,
        )?),
        controls_hide_delay: Duration::from_millis(env_or(
            "PLAYBACK_CONTROLS_HIDE_MS",
            defaults.controls_hide_delay.as_millis() as u64,
        )?),
    };
    config.validate()?;
    Ok(config)
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| {
            FeedError::InvalidConfig(format!("{} must be valid: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
}
