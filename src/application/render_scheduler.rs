// Fixed-period tick driving fetches, recomputation and redraws
use crate::application::engine::{EngineContext, EngineEvent};
use crate::application::history_repository::HistoryRepository;
use crate::application::renderer::{PlotFrame, Renderer};
use crate::domain::segment::SegmentKey;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// One scheduler tick. Returns the segments that must be fetched.
pub fn tick<R: Renderer>(context: &mut EngineContext, now_ms: f64, renderer: &mut R) -> Vec<SegmentKey> {
    let live_mode = context.viewports.live_mode();
    if live_mode {
        context.viewports.follow_live(now_ms);
    }
    context.cache.set_check_for_new_data(live_mode);

    let mut fetches = Vec::new();
    for (plot, series) in context.series.iter_mut().enumerate() {
        if !series.is_visible() {
            continue;
        }
        let interval = context.viewports.active_interval(plot, now_ms);
        fetches.extend(context.cache.plan_fetches(&series.meta().code, &interval, now_ms));

        if series.is_dirty() || series.last_rendered() != Some(interval) {
            let data = series.recompute(&context.cache, &interval).clone();
            renderer.render(
                plot,
                PlotFrame {
                    series_code: series.meta().code.clone(),
                    name: series.meta().name.clone(),
                    raw: data.raw,
                    smooth: data.smooth,
                    axis: interval,
                },
            );
            context.viewports.mark_rendered(plot, interval);
        }
    }

    for series in context.series.iter_mut() {
        series.clear_dirty();
    }
    renderer.publish_status(context.status());
    fetches
}

/// Owns the engine context and runs the single event queue: live records,
/// fetch completions, gestures and the periodic tick are handled one at a
/// time, so no model state is ever shared across tasks.
pub struct RenderScheduler<R> {
    context: EngineContext,
    repository: Arc<dyn HistoryRepository>,
    renderer: R,
    events: mpsc::Sender<EngineEvent>,
    period: Duration,
}

impl<R: Renderer> RenderScheduler<R> {
    pub fn new(
        context: EngineContext,
        repository: Arc<dyn HistoryRepository>,
        renderer: R,
        events: mpsc::Sender<EngineEvent>,
        period: Duration,
    ) -> Self {
        Self {
            context,
            repository,
            renderer,
            events,
            period,
        }
    }

    pub async fn run(mut self, mut rx: mpsc::Receiver<EngineEvent>) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => {
                        let now = self.context.server_now();
                        self.context.handle_event(event, now);
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    let now = self.context.server_now();
                    for key in tick(&mut self.context, now, &mut self.renderer) {
                        self.spawn_fetch(key);
                    }
                }
            }
        }
        tracing::info!("Render scheduler stopped");
    }

    /// Fire-and-forget fetch; the completion is posted back to the queue
    /// together with the key it belongs to.
    fn spawn_fetch(&self, key: SegmentKey) {
        let repository = self.repository.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = repository.fetch_segment(&key).await;
            let _ = events.send(EngineEvent::SegmentFetched { key, result }).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::clock_sync::ClockSync;
    use crate::application::engine::tests::{two_series_meta, FakeRepository};
    use crate::application::renderer::EngineStatus;
    use crate::application::viewport_controller::Gesture;
    use crate::domain::feed::{LiveData, LiveMessage};
    use crate::domain::series::parse_meta_document;
    use crate::domain::telemetry::AggregateBucket;
    use crate::domain::viewport::Viewport;
    use crate::infrastructure::config::EngineConfig;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingRenderer {
        frames: Vec<(usize, PlotFrame)>,
        statuses: Vec<EngineStatus>,
    }

    impl Renderer for RecordingRenderer {
        fn render(&mut self, plot: usize, frame: PlotFrame) {
            self.frames.push((plot, frame));
        }

        fn publish_status(&mut self, status: EngineStatus) {
            self.statuses.push(status);
        }
    }

    fn context(start_live: bool) -> EngineContext {
        let mut config = EngineConfig::default();
        config.viewport.start_live = start_live;
        config.viewport.default_width_ms = 100_000.0;
        let metas = parse_meta_document(&two_series_meta()).unwrap();
        EngineContext::new(metas, ClockSync::new(0.0), &config)
    }

    fn live_record(t: f64, temp: f64) -> EngineEvent {
        EngineEvent::Live(LiveMessage {
            topic: "rover.data:".to_string(),
            data: LiveData {
                fields: json!({"timestamp": t, "temp": temp, "num": 1, "denom": 4})
                    .as_object()
                    .cloned()
                    .unwrap(),
            },
        })
    }

    #[test]
    fn test_first_tick_renders_and_requests_segments() {
        let mut context = context(true);
        let mut renderer = RecordingRenderer::default();
        let fetches = tick(&mut context, 1_000_000.0, &mut renderer);

        assert_eq!(renderer.frames.len(), 2);
        let (plot, frame) = &renderer.frames[0];
        assert_eq!(*plot, 0);
        assert_eq!(frame.axis, Viewport::new(900_000.0, 1_000_000.0));
        assert!(fetches.iter().any(|k| k.series_code == "temp"));
        assert!(fetches.iter().any(|k| k.series_code == "band"));
        assert_eq!(renderer.statuses.len(), 1);
    }

    #[test]
    fn test_idle_historic_tick_renders_nothing() {
        let mut context = context(false);
        context.viewports.seed_time_range(Viewport::new(0.0, 100_000.0));
        let mut renderer = RecordingRenderer::default();
        tick(&mut context, 1_000_000.0, &mut renderer);
        assert_eq!(renderer.frames.len(), 2);
        assert_eq!(renderer.frames[0].1.axis, Viewport::new(0.0, 100_000.0));

        renderer.frames.clear();
        let fetches = tick(&mut context, 1_000_200.0, &mut renderer);
        assert!(renderer.frames.is_empty());
        assert!(fetches.is_empty());
    }

    #[test]
    fn test_new_live_sample_rerenders_only_after_tick() {
        let mut context = context(false);
        let mut renderer = RecordingRenderer::default();
        tick(&mut context, 1_000_000.0, &mut renderer);
        renderer.frames.clear();

        context.handle_event(live_record(950_000.0, 21.5), 1_000_000.0);
        tick(&mut context, 1_000_000.0, &mut renderer);

        assert_eq!(renderer.frames.len(), 2);
        let temp = &renderer.frames[0].1;
        assert_eq!(temp.raw.len(), 1);
        assert_eq!(temp.raw[0].value, Some(21.5));
        assert_eq!(temp.smooth.as_ref().map(Vec::len), Some(1));
        let band = &renderer.frames[1].1;
        assert_eq!(band.raw[0].value, Some(0.25));
        assert!(band.smooth.is_none());
    }

    #[test]
    fn test_hidden_series_skipped() {
        let mut context = context(true);
        context.handle_event(EngineEvent::SetVisible { plot: 1, visible: false }, 0.0);
        let mut renderer = RecordingRenderer::default();
        let fetches = tick(&mut context, 1_000_000.0, &mut renderer);
        assert_eq!(renderer.frames.len(), 1);
        assert!(fetches.iter().all(|k| k.series_code == "temp"));
    }

    #[test]
    fn test_gesture_rerenders_all_plots_with_same_range() {
        let mut context = context(true);
        let mut renderer = RecordingRenderer::default();
        tick(&mut context, 1_000_000.0, &mut renderer);
        renderer.frames.clear();

        context.handle_event(
            EngineEvent::Gesture {
                plot: 1,
                gesture: Gesture::Zoom { pixel_delta: -30.0 },
            },
            1_000_000.0,
        );
        tick(&mut context, 1_000_200.0, &mut renderer);

        assert!(!context.viewports.live_mode());
        assert_eq!(renderer.frames.len(), 2);
        let expected = Viewport::new(850_000.0, 1_050_000.0);
        assert!(renderer.frames.iter().all(|(_, f)| f.axis == expected));
    }

    #[test]
    fn test_extreme_zoom_out_keeps_tick_bounded() {
        let mut context = context(true);
        let mut renderer = RecordingRenderer::default();
        tick(&mut context, 1_000_000.0, &mut renderer);

        context.handle_event(
            EngineEvent::Gesture {
                plot: 0,
                gesture: Gesture::Zoom {
                    pixel_delta: -40_000.0,
                },
            },
            1_000_000.0,
        );
        let fetches = tick(&mut context, 1_000_200.0, &mut renderer);

        let levels = context.cache.levels().clone();
        let range = context.viewports.range(0).unwrap();
        assert!(range.is_finite());
        assert_eq!(range.width(), levels.max_width_ms());
        assert!(fetches.iter().all(|k| k.level == levels.max_level - 1));
        // a handful of segments per series, not billions
        assert!(fetches.len() <= 2 * 4);

        context.handle_event(
            EngineEvent::Gesture {
                plot: 1,
                gesture: Gesture::Zoom {
                    pixel_delta: 40_000.0,
                },
            },
            1_000_200.0,
        );
        tick(&mut context, 1_000_400.0, &mut renderer);
        assert_eq!(context.viewports.range(0).unwrap().width(), levels.min_width_ms());
    }

    #[test]
    fn test_fetched_history_reaches_frame() {
        let mut context = context(false);
        context.viewports.seed_time_range(Viewport::new(0.0, 100_000.0));
        let mut renderer = RecordingRenderer::default();
        let fetches = tick(&mut context, 1_000_000.0, &mut renderer);
        let key = fetches
            .iter()
            .find(|k| k.series_code == "temp")
            .cloned()
            .unwrap();

        let time_ms = key.start_ms() + 10.0;
        context.handle_event(
            EngineEvent::SegmentFetched {
                key,
                result: Ok(vec![AggregateBucket {
                    time_ms,
                    count: 2,
                    sum: 8.0,
                    ratio: None,
                }]),
            },
            1_000_000.0,
        );
        renderer.frames.clear();
        tick(&mut context, 1_000_200.0, &mut renderer);

        assert_eq!(renderer.frames.len(), 1);
        assert_eq!(renderer.frames[0].1.raw[0].value, Some(4.0));
    }

    #[tokio::test]
    async fn test_scheduler_fetches_and_stores_segments() {
        let repository = Arc::new(FakeRepository::default());
        let (tx, rx) = mpsc::channel(64);
        let scheduler = RenderScheduler::new(
            context(true),
            repository.clone(),
            RecordingRenderer::default(),
            tx.clone(),
            Duration::from_millis(10),
        );
        let handle = tokio::spawn(scheduler.run(rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        let requests = repository.requests.lock().unwrap();
        assert!(!requests.is_empty());
        // in-flight and cached segments are not requested twice
        let mut unique = requests.clone();
        unique.sort_by_key(|k| (k.series_code.clone(), k.level, k.index));
        unique.dedup();
        assert_eq!(unique.len(), requests.len());
    }
}
