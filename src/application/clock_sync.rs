// Client/server clock skew
use chrono::Utc;

/// Offset between the local clock and the server clock, measured once at
/// startup. Drift of the local clock after that point is not corrected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSync {
    skew_ms: f64,
}

impl ClockSync {
    pub fn new(skew_ms: f64) -> Self {
        Self { skew_ms }
    }

    /// Build from a single server-time reading taken at `local_now_ms`.
    pub fn from_reading(server_now_ms: f64, local_now_ms: f64) -> Self {
        let clock = Self::new(server_now_ms - local_now_ms);
        tracing::info!("Clock skew established: {:.0} ms", clock.skew_ms);
        clock
    }

    pub fn skew_ms(&self) -> f64 {
        self.skew_ms
    }

    /// Server time corresponding to local time `local_ms`.
    pub fn server_time(&self, local_ms: f64) -> f64 {
        local_ms + self.skew_ms
    }

    pub fn server_now(&self) -> f64 {
        self.server_time(local_now_ms())
    }
}

pub fn local_now_ms() -> f64 {
    Utc::now().timestamp_millis() as f64
}
