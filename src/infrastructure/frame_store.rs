// Renderer sink keeping the latest frame per plot for the HTTP layer
use crate::application::renderer::{EngineStatus, PlotFrame, Renderer};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Frames {
    plots: Vec<Option<PlotFrame>>,
    status: Option<EngineStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct FrameStore {
    inner: Arc<RwLock<Frames>>,
}

impl FrameStore {
    pub fn new(plot_count: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Frames {
                plots: vec![None; plot_count],
                status: None,
            })),
        }
    }

    // A panic while holding the lock leaves whole frames behind, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, Frames> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Frames> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn plot_count(&self) -> usize {
        self.read().plots.len()
    }

    pub fn frame(&self, plot: usize) -> Option<PlotFrame> {
        self.read().plots.get(plot).cloned().flatten()
    }

    pub fn frames(&self) -> Vec<Option<PlotFrame>> {
        self.read().plots.clone()
    }

    pub fn status(&self) -> Option<EngineStatus> {
        self.read().status.clone()
    }
}

impl Renderer for FrameStore {
    fn render(&mut self, plot: usize, frame: PlotFrame) {
        let mut frames = self.write();
        if plot >= frames.plots.len() {
            frames.plots.resize(plot + 1, None);
        }
        frames.plots[plot] = Some(frame);
    }

    fn publish_status(&mut self, status: EngineStatus) {
        self.write().status = Some(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feed::FeedStatus;
    use crate::domain::telemetry::PlotPoint;
    use crate::domain::viewport::Viewport;

    fn frame(code: &str) -> PlotFrame {
        PlotFrame {
            series_code: code.to_string(),
            name: code.to_string(),
            raw: vec![PlotPoint::new(1.0, 2.0)],
            smooth: None,
            axis: Viewport::new(0.0, 10.0),
        }
    }

    #[test]
    fn test_latest_frame_wins_and_is_shared() {
        let store = FrameStore::new(2);
        let mut sink = store.clone();
        assert_eq!(store.frame(0), None);

        sink.render(0, frame("a"));
        sink.render(0, frame("b"));
        assert_eq!(store.frame(0).map(|f| f.series_code), Some("b".to_string()));
        assert_eq!(store.frame(1), None);
        assert_eq!(store.frame(7), None);
    }

    #[test]
    fn test_status_published() {
        let store = FrameStore::new(0);
        let mut sink = store.clone();
        sink.publish_status(EngineStatus {
            feed: FeedStatus::Connected,
            live_mode: true,
            historic_range: None,
            clock_skew_ms: 0.0,
            cached_segments: 3,
            series: Vec::new(),
        });
        assert_eq!(store.status().map(|s| s.cached_segments), Some(3));
    }
}
