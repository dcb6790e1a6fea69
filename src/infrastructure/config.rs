// Engine configuration loaded from config/engine.toml and TVIEW__* environment variables
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub segments: SegmentSettings,
    #[serde(default)]
    pub viewport: ViewportSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistorySettings {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/xgds_plot".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedSettings {
    pub address: String,
    pub reconnect_delay_ms: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8001".to_string(),
            reconnect_delay_ms: 2_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SegmentSettings {
    pub min_segment_length_ms: f64,
    pub max_segment_length_ms: f64,
    /// Buckets per segment.
    pub segment_resolution: u32,
    /// Minimum number of buckets across a plot.
    pub min_display_resolution: u32,
    pub staleness_ms: f64,
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self {
            // 100 ms minimum sample interval * 512 buckets
            min_segment_length_ms: 51_200.0,
            // one year
            max_segment_length_ms: 31_536_000_000.0,
            segment_resolution: 512,
            min_display_resolution: 1024,
            staleness_ms: 5_000.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewportSettings {
    pub start_live: bool,
    pub default_width_ms: f64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            start_live: true,
            default_width_ms: 600_000.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerSettings {
    pub tick_ms: u64,
    pub live_buffer_capacity: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_ms: 200,
            live_buffer_capacity: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// `config/engine.{toml,yaml,json}` if present, overridden by `TVIEW__*`
/// environment variables (e.g. `TVIEW__HISTORY__BASE_URL`).
pub fn load_engine_config() -> anyhow::Result<EngineConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/engine").required(false))
        .add_source(
            config::Environment::with_prefix("TVIEW")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
