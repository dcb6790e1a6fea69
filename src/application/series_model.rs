// Per-series model: live buffer + historical segments -> raw/smooth sequences
use crate::application::live_buffer::LiveBuffer;
use crate::application::segment_cache::SegmentCache;
use crate::application::smoothing::{causal_smooth, gap_threshold, insert_gaps};
use crate::domain::series::{RecordError, SeriesMeta, SmoothingConfig, ValueExtraction};
use crate::domain::telemetry::{PlotPoint, Terms, TimedTerms};
use crate::domain::viewport::Viewport;
use serde_json::{Map, Value};

/// Merged samples for one interval plus the resolution they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedData {
    pub samples: Vec<TimedTerms>,
    /// Bucket width of the historical part, if any history was used.
    pub bucket_width_ms: Option<f64>,
}

/// Historical buckets for `interval` followed by the live samples newer than
/// the last bucket, so each instant is sourced from exactly one of the two.
/// When any bucket only offers a plain value, live samples are reduced to
/// their value too so smoothing weighs both on the same scale.
pub fn collect_data(
    extraction: &dyn ValueExtraction,
    series_code: &str,
    buffer: &LiveBuffer<TimedTerms>,
    cache: &SegmentCache,
    interval: &Viewport,
) -> CollectedData {
    let covered = cache.buckets(series_code, interval);
    let last_historical = covered.buckets.last().map(|b| b.time_ms);
    let value_scale = covered.buckets.iter().any(|b| !extraction.bucket_has_sums(b));

    let mut samples: Vec<TimedTerms> = covered
        .buckets
        .iter()
        .filter_map(|b| extraction.from_bucket(b).map(|terms| TimedTerms::new(b.time_ms, terms)))
        .collect();

    samples.extend(
        buffer
            .iter()
            .filter(|s| s.time_ms >= interval.min)
            .filter(|s| last_historical.is_none_or(|t| s.time_ms > t))
            .map(|s| {
                if value_scale {
                    TimedTerms::new(s.time_ms, Terms::scalar(s.terms.value()))
                } else {
                    *s
                }
            }),
    );

    CollectedData {
        bucket_width_ms: last_historical.map(|_| cache.levels().bucket_width_ms(covered.level)),
        samples,
    }
}

/// Raw and smoothed point arrays, gap markers inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotData {
    pub raw: Vec<PlotPoint>,
    pub smooth: Option<Vec<PlotPoint>>,
}

pub fn plot_data(
    collected: &CollectedData,
    smoothing: Option<&SmoothingConfig>,
    max_continuous_data_gap_ms: Option<f64>,
) -> PlotData {
    let raw: Vec<PlotPoint> = collected.samples.iter().map(TimedTerms::to_point).collect();
    let smooth = smoothing.map(|s| causal_smooth(&collected.samples, s.sigma_ms));

    match gap_threshold(max_continuous_data_gap_ms, collected.bucket_width_ms) {
        Some(threshold) => PlotData {
            raw: insert_gaps(&raw, threshold),
            smooth: smooth.map(|points| insert_gaps(&points, threshold)),
        },
        None => PlotData { raw, smooth },
    }
}

#[derive(Debug)]
pub struct SeriesModel {
    meta: SeriesMeta,
    buffer: LiveBuffer<TimedTerms>,
    data: PlotData,
    dirty: bool,
    visible: bool,
    last_rendered: Option<Viewport>,
}

impl SeriesModel {
    pub fn new(meta: SeriesMeta, buffer_capacity: usize) -> Self {
        Self {
            visible: meta.show,
            meta,
            buffer: LiveBuffer::new(buffer_capacity),
            data: PlotData::default(),
            dirty: true,
            last_rendered: None,
        }
    }

    pub fn meta(&self) -> &SeriesMeta {
        &self.meta
    }

    /// Append a live record.
    pub fn add(&mut self, fields: &Map<String, Value>) -> Result<(), RecordError> {
        let (time_ms, terms) = self.meta.read_record(fields)?;
        self.add_sample(time_ms, terms);
        Ok(())
    }

    pub fn add_sample(&mut self, time_ms: f64, terms: Terms) {
        self.buffer.add(TimedTerms::new(time_ms, terms));
        self.dirty = true;
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn collect_data(&self, cache: &SegmentCache, interval: &Viewport) -> CollectedData {
        collect_data(
            self.meta.kind.extraction(),
            &self.meta.code,
            &self.buffer,
            cache,
            interval,
        )
    }

    /// Rebuild the raw/smooth sequences for `interval`.
    pub fn recompute(&mut self, cache: &SegmentCache, interval: &Viewport) -> &PlotData {
        let collected = self.collect_data(cache, interval);
        self.data = plot_data(
            &collected,
            self.meta.smoothing.as_ref(),
            self.meta.max_continuous_data_gap_ms,
        );
        self.last_rendered = Some(*interval);
        &self.data
    }

    pub fn last_rendered(&self) -> Option<Viewport> {
        self.last_rendered
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        if visible && !self.visible {
            self.dirty = true;
        }
        self.visible = visible;
    }
}
