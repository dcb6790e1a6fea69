// Telemetry data domain models
use serde::Serialize;

/// A single rendered point. `value == None` is a gap marker telling the
/// renderer to break the line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    pub time_ms: f64,
    pub value: Option<f64>,
}

impl PlotPoint {
    pub fn new(time_ms: f64, value: f64) -> Self {
        Self {
            time_ms,
            value: Some(value),
        }
    }

    pub fn gap(time_ms: f64) -> Self {
        Self {
            time_ms,
            value: None,
        }
    }
}

/// Numerator/denominator pair every value is reduced to before display and
/// smoothing. Scalars carry a denominator of exactly 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Terms {
    pub numerator: f64,
    pub denominator: f64,
}

impl Terms {
    pub fn scalar(value: f64) -> Self {
        Self {
            numerator: value,
            denominator: 1.0,
        }
    }

    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn value(&self) -> f64 {
        self.numerator / self.denominator
    }
}

/// A timestamped value, the unit both the live buffer and the merged raw
/// sequence are made of.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedTerms {
    pub time_ms: f64,
    pub terms: Terms,
}

impl TimedTerms {
    pub fn new(time_ms: f64, terms: Terms) -> Self {
        Self { time_ms, terms }
    }

    pub fn to_point(&self) -> PlotPoint {
        PlotPoint::new(self.time_ms, self.terms.value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioSums {
    pub numerator: f64,
    pub denominator: f64,
}

/// One historical aggregate bucket as served by the segment endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateBucket {
    pub time_ms: f64,
    pub count: u64,
    /// mean * count
    pub sum: f64,
    pub ratio: Option<RatioSums>,
}

impl AggregateBucket {
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        self.sum / self.count as f64
    }
}

/// Time range covered by the historical store for one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStatus {
    pub min_time_ms: Option<f64>,
    pub max_time_ms: Option<f64>,
}
