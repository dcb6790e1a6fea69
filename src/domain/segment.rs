// Historical segment addressing
use super::viewport::Viewport;
use std::ops::Range;

/// Identity of one historical segment: bucket width is `2^level` ms and
/// `index = floor(start / 2^level)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentKey {
    pub series_code: String,
    pub level: i32,
    pub index: i64,
}

impl SegmentKey {
    pub fn new(series_code: impl Into<String>, level: i32, index: i64) -> Self {
        Self {
            series_code: series_code.into(),
            level,
            index,
        }
    }

    pub fn start_ms(&self) -> f64 {
        self.index as f64 * segment_length_ms(self.level)
    }
}

pub fn segment_length_ms(level: i32) -> f64 {
    2f64.powi(level)
}

/// Resolution bounds and level selection derived from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentLevels {
    pub min_level: i32,
    pub max_level: i32,
    /// Buckets per segment.
    pub segment_resolution: u32,
    pub min_display_resolution: u32,
}

impl SegmentLevels {
    pub fn new(
        min_segment_length_ms: f64,
        max_segment_length_ms: f64,
        segment_resolution: u32,
        min_display_resolution: u32,
    ) -> Self {
        Self {
            min_level: min_segment_length_ms.log2().floor() as i32,
            max_level: max_segment_length_ms.log2().ceil() as i32 + 1,
            segment_resolution,
            min_display_resolution,
        }
    }

    pub fn min_segments_in_plot(&self) -> f64 {
        self.min_display_resolution as f64 / self.segment_resolution as f64
    }

    /// Pick the level for an interval so at least `min_segments_in_plot`
    /// segments span it, clamped to `[min_level, max_level - 1]`.
    pub fn level_for(&self, interval: &Viewport) -> i32 {
        let raw = (interval.width() / self.min_segments_in_plot()).log2().floor();
        self.clamp_level(raw)
    }

    pub fn clamp_level(&self, raw: f64) -> i32 {
        let top = self.max_level - 1;
        if raw.is_nan() || raw <= self.min_level as f64 {
            self.min_level
        } else if raw >= top as f64 {
            top
        } else {
            raw as i32
        }
    }

    /// Narrowest plot width that still maps onto `min_level`.
    pub fn min_width_ms(&self) -> f64 {
        segment_length_ms(self.min_level)
    }

    /// Widest plot width before the level clamp at `max_level - 1` kicks in.
    pub fn max_width_ms(&self) -> f64 {
        self.min_segments_in_plot() * segment_length_ms(self.max_level - 1)
    }

    /// Width of a single aggregate bucket at `level`.
    pub fn bucket_width_ms(&self, level: i32) -> f64 {
        segment_length_ms(level) / self.segment_resolution as f64
    }
}

/// Indices of every segment at `level` needed to cover `interval`. An
/// interval with a non-finite bound covers nothing.
pub fn segment_indices(level: i32, interval: &Viewport) -> Range<i64> {
    if !interval.is_finite() {
        return 0..0;
    }
    let length = segment_length_ms(level);
    let index_min = (interval.min / length).floor() as i64;
    let index_max = ((interval.max / length).ceil() as i64).saturating_add(1);
    index_min..index_max
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> SegmentLevels {
        // 2^10 ms up to 2^19 ms segments, two segments per plot
        SegmentLevels::new(1024.0, 524_288.0, 512, 1024)
    }

    #[test]
    fn test_level_bounds_from_lengths() {
        let levels = levels();
        assert_eq!(levels.min_level, 10);
        assert_eq!(levels.max_level, 20);
        assert_eq!(levels.min_segments_in_plot(), 2.0);

        let odd = SegmentLevels::new(1500.0, 600_000.0, 512, 1024);
        assert_eq!(odd.min_level, 10);
        assert_eq!(odd.max_level, 21);
    }

    #[test]
    fn test_level_clamps_to_max_minus_one() {
        let levels = levels();
        assert_eq!(levels.clamp_level(25.0), 19);
        // width / 2 = 2^25
        let wide = Viewport::new(0.0, 2f64.powi(26));
        assert_eq!(levels.level_for(&wide), 19);
    }

    #[test]
    fn test_level_clamps_to_min() {
        let levels = levels();
        assert_eq!(levels.level_for(&Viewport::new(0.0, 10.0)), 10);
        assert_eq!(levels.level_for(&Viewport::new(5.0, 5.0)), 10);
    }

    #[test]
    fn test_level_in_range() {
        let levels = levels();
        // width / 2 = 2^14 * 1.5 -> floor(log2) = 14
        let interval = Viewport::new(0.0, 2.0 * 1.5 * 2f64.powi(14));
        assert_eq!(levels.level_for(&interval), 14);
    }

    #[test]
    fn test_level_monotonic_in_width() {
        let levels = levels();
        let mut previous = i32::MIN;
        let mut width = 1.0;
        while width < 1e12 {
            let level = levels.level_for(&Viewport::new(1_000.0, 1_000.0 + width));
            assert!(level >= previous);
            assert!(level >= levels.min_level && level < levels.max_level);
            previous = level;
            width *= 1.37;
        }
    }

    #[test]
    fn test_segment_indices_cover_interval() {
        let interval = Viewport::new(1_500.0, 5_000.0);
        let range = segment_indices(10, &interval);
        assert_eq!(range, 1..6);
        let first = SegmentKey::new("x", 10, range.start);
        let last = SegmentKey::new("x", 10, range.end - 1);
        assert!(first.start_ms() <= interval.min);
        assert!(last.start_ms() + segment_length_ms(10) >= interval.max);
    }

    #[test]
    fn test_segment_indices_negative_times() {
        let range = segment_indices(10, &Viewport::new(-100.0, 100.0));
        assert_eq!(range, -1..2);
    }

    #[test]
    fn test_non_finite_interval_has_no_segments() {
        assert!(segment_indices(10, &Viewport::new(f64::NEG_INFINITY, f64::INFINITY)).is_empty());
        assert!(segment_indices(10, &Viewport::new(0.0, f64::NAN)).is_empty());
        let huge = segment_indices(0, &Viewport::new(0.0, f64::MAX));
        assert_eq!(huge.end, i64::MAX);
    }

    #[test]
    fn test_width_limits_match_level_clamp() {
        let levels = levels();
        assert_eq!(levels.min_width_ms(), 1024.0);
        assert_eq!(levels.max_width_ms(), 2.0 * 524_288.0);
        assert_eq!(levels.level_for(&Viewport::new(0.0, levels.min_width_ms())), 10);
        assert_eq!(levels.level_for(&Viewport::new(0.0, levels.max_width_ms())), 19);
    }

    #[test]
    fn test_bucket_width() {
        assert_eq!(levels().bucket_width_ms(19), 1024.0);
    }
}
