//! Windowed balance statistics and the alert threshold policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DataError;

/// Trailing lookback for the volatility window, in seconds (70 minutes).
pub const WINDOW_SECS: i64 = 14 * 60 * 5;

/// Absolute deviation from the window average, in percent, beyond which an alert fires.
pub const ALERT_THRESHOLD_PCT: f64 = 2.0;

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Seconds since the epoch, truncated to the start of the minute.
pub fn minute_timestamp(now: DateTime<Utc>) -> i64 {
    let secs = now.timestamp();
    secs - secs.rem_euclid(60)
}

/// Inclusive lower bound of the window ending at `now_minute`.
pub fn window_start(now_minute: i64) -> i64 {
    now_minute - WINDOW_SECS
}

/// Statistics over one window of net USDT balances.
///
/// `min`, `max` and `avg` describe the history (every sample except the
/// latest); `last` is the latest sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityStats {
    pub sum: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub last: f64,
    pub volatility_pct: f64,
}

impl VolatilityStats {
    /// Whether the latest value left the ±[`ALERT_THRESHOLD_PCT`] band.
    pub fn is_abnormal(&self) -> bool {
        self.volatility_pct < -ALERT_THRESHOLD_PCT || self.volatility_pct > ALERT_THRESHOLD_PCT
    }
}

/// Dispatch decision: abnormal volatility, or a forced report.
pub fn should_dispatch(stats: &VolatilityStats, force: bool) -> bool {
    force || stats.is_abnormal()
}

/// Compute window statistics from balances ordered oldest first.
///
/// The last element is split off as `last`; the rest is the history. Running
/// `min`/`max` are rounded each time they are reassigned while comparisons use
/// the unrounded sample, so a sample within half a cent of the current
/// extreme can still replace it. `sum` stays unrounded.
pub fn compute_volatility(values: &[f64]) -> Result<VolatilityStats, DataError> {
    let (last, history) = match values.split_last() {
        Some((last, history)) if !history.is_empty() => (round2(*last), history),
        _ => {
            return Err(DataError::InsufficientSamples {
                found: values.len(),
            })
        }
    };

    let mut max = round2(history[0]);
    let mut min = round2(history[0]);
    let mut sum = 0.0;

    for &value in history {
        if max < value {
            max = round2(value);
        }
        if min > value {
            min = round2(value);
        }
        sum += value;
    }

    let avg = round2(sum / history.len() as f64);
    if avg == 0.0 {
        return Err(DataError::ZeroAverage);
    }

    let volatility_pct = round2((last / avg - 1.0) * 100.0);

    Ok(VolatilityStats {
        sum,
        avg,
        min,
        max,
        last,
        volatility_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stats_with(volatility_pct: f64) -> VolatilityStats {
        VolatilityStats {
            sum: 0.0,
            avg: 100.0,
            min: 100.0,
            max: 100.0,
            last: 100.0,
            volatility_pct,
        }
    }

    #[test]
    fn test_window_is_seventy_minutes() {
        assert_eq!(WINDOW_SECS, 4200);
        assert_eq!(window_start(1_700_004_200), 1_700_000_000);
    }

    #[test]
    fn test_minute_timestamp_truncates_seconds() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 34, 56).unwrap();
        let ts = minute_timestamp(now);
        assert_eq!(ts % 60, 0);
        assert_eq!(ts, now.timestamp() - 56);
    }

    #[test]
    fn test_example_window_fires() {
        let stats = compute_volatility(&[100.0, 102.0, 98.0, 105.0]).unwrap();

        assert_eq!(stats.avg, 100.0);
        assert_eq!(stats.last, 105.0);
        assert_eq!(stats.max, 102.0);
        assert_eq!(stats.min, 98.0);
        assert_eq!(stats.sum, 300.0);
        assert_eq!(stats.volatility_pct, 5.0);
        assert!(should_dispatch(&stats, false));
    }

    #[test]
    fn test_min_avg_max_ordering_holds() {
        let windows: &[&[f64]] = &[
            &[10.0, 20.0],
            &[1234.567, 1234.561, 1250.0, 1199.994, 1210.0],
            &[99.999, 100.001, 100.004, 99.996, 101.0],
            &[5.0, 5.0, 5.0],
            &[0.333, 0.334, 0.335, 0.5],
        ];

        for window in windows {
            let stats = compute_volatility(window).unwrap();
            assert!(stats.min <= stats.avg, "{window:?}: {stats:?}");
            assert!(stats.avg <= stats.max, "{window:?}: {stats:?}");
        }
    }

    #[test]
    fn test_volatility_recomputes_from_avg_and_last() {
        let windows: &[&[f64]] = &[
            &[4321.12, 4330.5, 4299.99, 4410.07],
            &[1000.0, 990.0, 985.5],
            &[17.3, 17.31, 17.29, 17.0],
        ];

        for window in windows {
            let stats = compute_volatility(window).unwrap();
            assert_eq!(
                round2((stats.last / stats.avg - 1.0) * 100.0),
                stats.volatility_pct
            );
        }
    }

    #[test]
    fn test_running_extremes_round_on_assignment() {
        // 100.004 rounds to 100.0 as the initial max; 100.001 is still greater
        // than the rounded max so it replaces it, and rounds to 100.0 again.
        let stats = compute_volatility(&[100.004, 100.001, 50.0]).unwrap();
        assert_eq!(stats.max, 100.0);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.last, 50.0);
    }

    #[test]
    fn test_empty_window_is_an_error() {
        assert_eq!(
            compute_volatility(&[]).unwrap_err(),
            DataError::InsufficientSamples { found: 0 }
        );
    }

    #[test]
    fn test_single_sample_window_is_an_error() {
        assert_eq!(
            compute_volatility(&[1000.0]).unwrap_err(),
            DataError::InsufficientSamples { found: 1 }
        );
    }

    #[test]
    fn test_zero_average_is_an_error() {
        assert_eq!(
            compute_volatility(&[0.0, 0.0, 10.0]).unwrap_err(),
            DataError::ZeroAverage
        );
    }

    #[test]
    fn test_threshold_boundaries() {
        assert!(!should_dispatch(&stats_with(-2.0), false));
        assert!(!should_dispatch(&stats_with(2.0), false));
        assert!(!should_dispatch(&stats_with(0.0), false));
        assert!(should_dispatch(&stats_with(-2.01), false));
        assert!(should_dispatch(&stats_with(2.01), false));
    }

    #[test]
    fn test_force_always_dispatches() {
        assert!(should_dispatch(&stats_with(0.0), true));
        assert!(should_dispatch(&stats_with(2.0), true));
    }
}
