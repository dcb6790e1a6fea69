// Engine context: all caches, models and viewport state, plus event handling
use crate::application::clock_sync::{local_now_ms, ClockSync};
use crate::application::history_repository::{HistoryError, HistoryRepository};
use crate::application::renderer::{EngineStatus, SeriesSummary};
use crate::application::segment_cache::SegmentCache;
use crate::application::series_model::SeriesModel;
use crate::application::viewport_controller::{Gesture, ViewportController};
use crate::domain::feed::{FeedStatus, LiveMessage};
use crate::domain::segment::{SegmentKey, SegmentLevels};
use crate::domain::series::{parse_meta_document, SeriesMeta};
use crate::domain::telemetry::AggregateBucket;
use crate::domain::viewport::Viewport;
use crate::infrastructure::config::EngineConfig;
use anyhow::Context;
use futures::future::join_all;

/// Everything that can happen on the engine's single queue.
#[derive(Debug)]
pub enum EngineEvent {
    Live(LiveMessage),
    Feed(FeedStatus),
    SegmentFetched {
        key: SegmentKey,
        result: Result<Vec<AggregateBucket>, HistoryError>,
    },
    Gesture {
        plot: usize,
        gesture: Gesture,
    },
    SetLiveMode(bool),
    SetVisible {
        plot: usize,
        visible: bool,
    },
}

/// Plot `i` shows series `i`.
#[derive(Debug)]
pub struct EngineContext {
    pub clock: ClockSync,
    pub cache: SegmentCache,
    pub series: Vec<SeriesModel>,
    pub viewports: ViewportController,
    pub feed_status: FeedStatus,
}

impl EngineContext {
    pub fn new(metas: Vec<SeriesMeta>, clock: ClockSync, config: &EngineConfig) -> Self {
        let segments = &config.segments;
        let levels = SegmentLevels::new(
            segments.min_segment_length_ms,
            segments.max_segment_length_ms,
            segments.segment_resolution,
            segments.min_display_resolution,
        );
        let series: Vec<SeriesModel> = metas
            .into_iter()
            .map(|meta| SeriesModel::new(meta, config.scheduler.live_buffer_capacity))
            .collect();

        let viewports = ViewportController::new(
            series.len(),
            config.viewport.start_live,
            config.viewport.default_width_ms,
        )
        .with_width_limits(levels.min_width_ms(), levels.max_width_ms());

        Self {
            clock,
            cache: SegmentCache::new(levels, segments.staleness_ms),
            viewports,
            series,
            feed_status: FeedStatus::Connecting,
        }
    }

    /// Load metadata, measure clock skew and seed the historic range from
    /// the union of every series' stored history.
    pub async fn bootstrap(
        repository: &dyn HistoryRepository,
        config: &EngineConfig,
    ) -> anyhow::Result<Self> {
        let doc = repository
            .fetch_meta()
            .await
            .context("Failed to fetch series metadata")?;
        let metas = parse_meta_document(&doc).context("Invalid series metadata")?;
        tracing::info!("Loaded metadata for {} series", metas.len());

        let local_now = local_now_ms();
        let server_now = repository
            .fetch_server_time()
            .await
            .context("Failed to fetch server time")?;
        let clock = ClockSync::from_reading(server_now, local_now);

        let mut context = Self::new(metas, clock, config);

        let statuses = join_all(
            context
                .series
                .iter()
                .map(|s| repository.fetch_status(&s.meta().code)),
        )
        .await;

        let mut available: Option<Viewport> = None;
        for (series, status) in context.series.iter().zip(statuses) {
            match status {
                Ok(status) => {
                    if let (Some(min), Some(max)) = (status.min_time_ms, status.max_time_ms) {
                        let range = Viewport::new(min, max);
                        available = Some(available.map_or(range, |a| a.union(&range)));
                    }
                }
                Err(e) => {
                    tracing::warn!("No status for series {}: {}", series.meta().code, e);
                }
            }
        }
        if let Some(range) = available {
            tracing::debug!("Historic range seeded to [{}, {}]", range.min, range.max);
            context.viewports.seed_time_range(range);
        }

        Ok(context)
    }

    pub fn server_now(&self) -> f64 {
        self.clock.server_now()
    }

    pub fn handle_event(&mut self, event: EngineEvent, now_ms: f64) {
        match event {
            EngineEvent::Live(message) => self.handle_live(&message),
            EngineEvent::Feed(status) => {
                if status != self.feed_status {
                    tracing::info!("Live feed {:?}", status);
                }
                self.feed_status = status;
            }
            EngineEvent::SegmentFetched { key, result } => {
                let code = key.series_code.clone();
                if self.cache.store(key, result, now_ms) {
                    self.series
                        .iter_mut()
                        .filter(|s| s.meta().code == code)
                        .for_each(SeriesModel::mark_dirty);
                }
            }
            EngineEvent::Gesture { plot, gesture } => {
                self.viewports.apply_gesture(plot, gesture, now_ms);
            }
            EngineEvent::SetLiveMode(enabled) => self.viewports.set_live_mode(enabled),
            EngineEvent::SetVisible { plot, visible } => match self.series.get_mut(plot) {
                Some(series) => series.set_visible(visible),
                None => tracing::warn!("Visibility change for unknown plot {}", plot),
            },
        }
    }

    fn handle_live(&mut self, message: &LiveMessage) {
        for series in self
            .series
            .iter_mut()
            .filter(|s| s.meta().topic == message.topic)
        {
            if let Err(e) = series.add(&message.data.fields) {
                tracing::warn!(
                    "Dropping live record for {}: {}",
                    series.meta().code,
                    e
                );
            }
        }
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            feed: self.feed_status,
            live_mode: self.viewports.live_mode(),
            historic_range: self.viewports.plot_time_range(),
            clock_skew_ms: self.clock.skew_ms(),
            cached_segments: self.cache.len(),
            series: self
                .series
                .iter()
                .map(|s| SeriesSummary {
                    code: s.meta().code.clone(),
                    name: s.meta().name.clone(),
                    visible: s.is_visible(),
                    buffered: s.buffered(),
                })
                .collect(),
        }
    }
}
