// Causal Gaussian smoothing and gap insertion
use crate::domain::telemetry::{PlotPoint, TimedTerms};

/// Gaussian weight for a sample `dt` ms before the query time.
pub fn weight(dt: f64, sigma_ms: f64) -> f64 {
    let x = dt / sigma_ms;
    (-(x * x)).exp()
}

/// Causally smooth `samples` (ascending by time).
///
/// Each output point at time `t` is `sum(w * num) / sum(w * denom)` over the
/// samples at or before `t` that lie within `2 * sigma`. The window start
/// only moves forward across the pass: a sample that falls out of the window
/// for one `t` is out for every later `t` too.
pub fn causal_smooth(samples: &[TimedTerms], sigma_ms: f64) -> Vec<PlotPoint> {
    if sigma_ms.is_nan() || sigma_ms <= 0.0 {
        return samples.iter().map(TimedTerms::to_point).collect();
    }

    let window = 2.0 * sigma_ms;
    let mut kernel_start = 0;
    let mut smoothed = Vec::with_capacity(samples.len());

    for (i, sample) in samples.iter().enumerate() {
        let t = sample.time_ms;
        while t - samples[kernel_start].time_ms > window {
            kernel_start += 1;
        }

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for candidate in &samples[kernel_start..=i] {
            let w = weight(t - candidate.time_ms, sigma_ms);
            numerator += w * candidate.terms.numerator;
            denominator += w * candidate.terms.denominator;
        }
        smoothed.push(PlotPoint::new(t, numerator / denominator));
    }

    smoothed
}

/// Gap threshold actually applied: the configured gap, widened to two bucket
/// widths when coarse aggregates are on screen.
pub fn gap_threshold(configured_ms: Option<f64>, bucket_width_ms: Option<f64>) -> Option<f64> {
    let configured = configured_ms?;
    Some(match bucket_width_ms {
        Some(width) => configured.max(2.0 * width),
        None => configured,
    })
}

/// Insert a null-valued point between neighbours further apart than
/// `threshold_ms` so the renderer breaks the line there.
pub fn insert_gaps(points: &[PlotPoint], threshold_ms: f64) -> Vec<PlotPoint> {
    let mut out = Vec::with_capacity(points.len());
    let mut previous: Option<f64> = None;
    for point in points {
        if let Some(prev) = previous {
            if point.time_ms - prev > threshold_ms {
                out.push(PlotPoint::gap((prev + point.time_ms) / 2.0));
            }
        }
        out.push(*point);
        previous = Some(point.time_ms);
    }
    out
}
