//! Time windows bounding a scan.

use serde::{Deserialize, Serialize};

/// Inclusive time interval in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl ScanWindow {
    /// `[reference - width, reference]`.
    #[must_use]
    pub fn before(reference_ms: i64, width_ms: i64) -> Self {
        Self {
            start_ms: reference_ms.saturating_sub(width_ms),
            end_ms: reference_ms,
        }
    }

    /// `[reference - width, reference + width]`.
    #[must_use]
    pub fn around(reference_ms: i64, width_ms: i64) -> Self {
        Self {
            start_ms: reference_ms.saturating_sub(width_ms),
            end_ms: reference_ms.saturating_add(width_ms),
        }
    }

    /// Backward window from second-resolution inputs.
    #[must_use]
    pub fn before_secs(reference_secs: i64, width_secs: i64) -> Self {
        Self::before(
            reference_secs.saturating_mul(1000),
            width_secs.saturating_mul(1000),
        )
    }

    /// Symmetric window from second-resolution inputs.
    #[must_use]
    pub fn around_secs(reference_secs: i64, width_secs: i64) -> Self {
        Self::around(
            reference_secs.saturating_mul(1000),
            width_secs.saturating_mul(1000),
        )
    }

    /// No bounds at all.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            start_ms: i64::MIN,
            end_ms: i64::MAX,
        }
    }

    /// True when `timestamp_ms` lies within both bounds.
    #[must_use]
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        timestamp_ms >= self.start_ms && timestamp_ms <= self.end_ms
    }

    /// True when `timestamp_ms` lies before the lower bound.
    #[must_use]
    pub fn is_older(&self, timestamp_ms: i64) -> bool {
        timestamp_ms < self.start_ms
    }
}
