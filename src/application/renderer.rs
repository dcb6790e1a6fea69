// Boundary to the external chart renderer
use crate::domain::feed::FeedStatus;
use crate::domain::telemetry::PlotPoint;
use crate::domain::viewport::Viewport;
use serde::Serialize;

/// Everything the renderer needs to draw one plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotFrame {
    pub series_code: String,
    pub name: String,
    pub raw: Vec<PlotPoint>,
    pub smooth: Option<Vec<PlotPoint>>,
    pub axis: Viewport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub code: String,
    pub name: String,
    pub visible: bool,
    pub buffered: usize,
}

/// Connection indicator and mode shown next to the plots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub feed: FeedStatus,
    pub live_mode: bool,
    /// Range shared by the plots outside live mode.
    pub historic_range: Option<Viewport>,
    pub clock_skew_ms: f64,
    pub cached_segments: usize,
    pub series: Vec<SeriesSummary>,
}

pub trait Renderer: Send {
    fn render(&mut self, plot: usize, frame: PlotFrame);

    fn publish_status(&mut self, _status: EngineStatus) {}
}
