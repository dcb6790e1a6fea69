// Per-plot time ranges, live/historic mode and cross-plot synchronization
use crate::domain::viewport::Viewport;
use serde::Deserialize;

/// User gesture reported by the renderer for one plot. Pixel deltas of a
/// drag are cumulative since `DragStart`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Gesture {
    Pan { pixel_delta: f64, pixel_span: f64 },
    Zoom { pixel_delta: f64 },
    DragStart,
    Drag {
        pixel_delta: f64,
        pixel_span: f64,
        #[serde(default)]
        zoom: bool,
    },
    DragEnd,
}

#[derive(Debug, Clone, Default)]
struct PlotRange {
    range: Option<Viewport>,
    drag_origin: Option<Viewport>,
}

#[derive(Debug)]
pub struct ViewportController {
    plots: Vec<PlotRange>,
    live_mode: bool,
    /// Range new plots start with in historic mode.
    plot_time_range: Option<Viewport>,
    default_width_ms: f64,
    /// Bounds on the width a zoom gesture may produce.
    min_width_ms: f64,
    max_width_ms: f64,
}

impl ViewportController {
    pub fn new(plot_count: usize, live_mode: bool, default_width_ms: f64) -> Self {
        Self {
            plots: vec![PlotRange::default(); plot_count],
            live_mode,
            plot_time_range: None,
            default_width_ms,
            min_width_ms: 0.0,
            max_width_ms: f64::INFINITY,
        }
    }

    pub fn with_width_limits(mut self, min_width_ms: f64, max_width_ms: f64) -> Self {
        self.min_width_ms = min_width_ms;
        self.max_width_ms = max_width_ms.max(min_width_ms);
        self
    }

    pub fn plot_count(&self) -> usize {
        self.plots.len()
    }

    pub fn live_mode(&self) -> bool {
        self.live_mode
    }

    pub fn plot_time_range(&self) -> Option<Viewport> {
        self.plot_time_range
    }

    pub fn range(&self, plot: usize) -> Option<Viewport> {
        self.plots.get(plot).and_then(|p| p.range)
    }

    /// Initial shared range, e.g. the union of every series' stored history.
    pub fn seed_time_range(&mut self, range: Viewport) {
        self.plot_time_range = Some(range);
    }

    pub fn set_live_mode(&mut self, enabled: bool) {
        if self.live_mode && !enabled {
            if let Some(range) = self.plots.iter().find_map(|p| p.range) {
                self.plot_time_range = Some(range);
            }
        }
        if self.live_mode != enabled {
            tracing::info!("Live mode {}", if enabled { "on" } else { "off" });
        }
        self.live_mode = enabled;
    }

    /// Interval `plot` should load: its current range, or the starting range
    /// when it has not been rendered yet.
    pub fn active_interval(&self, plot: usize, now_ms: f64) -> Viewport {
        if let Some(range) = self.range(plot) {
            return range;
        }
        match self.plot_time_range {
            Some(shared) if !self.live_mode => shared,
            _ => Viewport::ending_at(now_ms, self.default_width_ms),
        }
    }

    /// Record the range a plot was first drawn with.
    pub fn mark_rendered(&mut self, plot: usize, range: Viewport) {
        if let Some(p) = self.plots.get_mut(plot) {
            p.range.get_or_insert(range);
        }
    }

    /// Re-pin every plot to `[now - width, now]`, keeping each plot's width.
    /// Returns the plots whose range moved.
    pub fn follow_live(&mut self, now_ms: f64) -> Vec<usize> {
        let default_width = self.default_width_ms;
        let mut changed = Vec::new();
        for (i, plot) in self.plots.iter_mut().enumerate() {
            let width = plot.range.map_or(default_width, |r| r.width());
            let next = Viewport::ending_at(now_ms, width);
            if plot.range != Some(next) {
                plot.range = Some(next);
                changed.push(i);
            }
        }
        changed
    }

    /// Apply a gesture on `plot`, leave live mode and copy the resulting range
    /// onto every other plot. Returns the plots whose range changed.
    pub fn apply_gesture(&mut self, plot: usize, gesture: Gesture, now_ms: f64) -> Vec<usize> {
        if plot >= self.plots.len() {
            tracing::warn!("Gesture for unknown plot {}", plot);
            return Vec::new();
        }
        let current = self.active_interval(plot, now_ms);
        let (min_width, max_width) = (self.min_width_ms, self.max_width_ms);
        let state = &mut self.plots[plot];

        let next = match gesture {
            Gesture::Pan {
                pixel_delta,
                pixel_span,
            } => current.panned(pixel_delta, pixel_span),
            Gesture::Zoom { pixel_delta } => {
                current.zoomed_within(pixel_delta, min_width, max_width)
            }
            Gesture::DragStart => {
                state.drag_origin = Some(current);
                current
            }
            Gesture::Drag {
                pixel_delta,
                pixel_span,
                zoom,
            } => {
                let origin = state.drag_origin.unwrap_or(current);
                if zoom {
                    origin.zoomed_within(pixel_delta, min_width, max_width)
                } else {
                    origin.panned(pixel_delta, pixel_span)
                }
            }
            Gesture::DragEnd => {
                state.drag_origin = None;
                current
            }
        };
        if !next.is_finite() {
            tracing::warn!("Ignoring gesture on plot {} producing {:?}", plot, next);
            return Vec::new();
        }

        let mut changed = Vec::new();
        if state.range != Some(next) {
            state.range = Some(next);
            changed.push(plot);
        }
        self.set_live_mode(false);
        changed.extend(self.sync_from(plot, next));
        changed
    }

    fn sync_from(&mut self, source: usize, range: Viewport) -> Vec<usize> {
        self.plot_time_range = Some(range);
        let mut changed = Vec::new();
        for (i, plot) in self.plots.iter_mut().enumerate() {
            if i != source && plot.range != Some(range) {
                plot.range = Some(range);
                changed.push(i);
            }
        }
        changed
    }
}
