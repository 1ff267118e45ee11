// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Time window resolution for range queries.
//!
//! Callers supply `from`, `to` and `interval` as free-form strings, any of which may
//! be empty. [`TimeWindowResolver`] turns them into a validated [`TimeWindow`]:
//!
//! - timestamps: `now`, `now-<duration>`, RFC3339, or Unix seconds (`1700000000`, `1700000000.5`)
//! - durations: `<number><unit>` with units `ms`, `s`, `m`, `h`, `d`, `w`, or bare seconds
//!
//! Empty values fall back to [`TimeWindowDefaults`]: a lookback ending now and a step
//! that spreads the window over a fixed sample budget, clamped to a minimum step.
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use metrics_gateway::time_window::TimeWindowResolver;
//!
//! let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
//! let window = TimeWindowResolver::default()
//!     .resolve_at("now-1h", "now", "30s", now)
//!     .unwrap();
//! assert_eq!(window.step_seconds, 30);
//! assert_eq!((window.end - window.start).num_minutes(), 60);
//! ```

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_LOOKBACK_SECS, DEFAULT_MIN_STEP_SECS, DEFAULT_SAMPLE_BUDGET, TIME_NOW,
};
use crate::errors::{GatewayError, Result};

/// A validated query window.
///
/// Invariants: `start <= end` and `step_seconds > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step_seconds: u64,
}

/// Defaults applied when the caller leaves a parameter empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeWindowDefaults {
    /// Window length used when `from` is empty
    pub default_lookback_secs: u64,
    /// Number of samples a derived step aims for
    pub sample_budget: u32,
    /// Smallest step a derived interval may have
    pub min_step_secs: u64,
}

impl Default for TimeWindowDefaults {
    fn default() -> Self {
        Self {
            default_lookback_secs: DEFAULT_LOOKBACK_SECS,
            sample_budget: DEFAULT_SAMPLE_BUDGET,
            min_step_secs: DEFAULT_MIN_STEP_SECS,
        }
    }
}

/// Parses and validates query time ranges.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeWindowResolver {
    defaults: TimeWindowDefaults,
}

impl TimeWindowResolver {
    #[must_use]
    pub fn new(defaults: TimeWindowDefaults) -> Self {
        Self { defaults }
    }

    /// Resolve a window relative to the current instant.
    ///
    /// # Errors
    ///
    /// See [`TimeWindowResolver::resolve_at`].
    pub fn resolve(&self, from: &str, to: &str, interval: &str) -> Result<TimeWindow> {
        self.resolve_at(from, to, interval, Utc::now())
    }

    /// Resolve a window with `now` as the anchor for relative timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidTimeRange`] when a timestamp fails to parse or
    /// `end < start`, and [`GatewayError::InvalidInterval`] when the interval fails to
    /// parse or is not positive.
    pub fn resolve_at(
        &self,
        from: &str,
        to: &str,
        interval: &str,
        now: DateTime<Utc>,
    ) -> Result<TimeWindow> {
        let from = from.trim();
        let to = to.trim();
        let interval = interval.trim();

        let end = if to.is_empty() {
            now
        } else {
            parse_timestamp(to, now)?
        };
        let start = if from.is_empty() {
            end.checked_sub_signed(seconds(self.defaults.default_lookback_secs))
                .ok_or_else(|| GatewayError::invalid_time_range("default lookback out of range"))?
        } else {
            parse_timestamp(from, now)?
        };

        if end < start {
            return Err(GatewayError::invalid_time_range(format!(
                "end {} is before start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }

        let step_seconds = if interval.is_empty() {
            self.derive_step(start, end)
        } else {
            parse_step(interval)?
        };

        Ok(TimeWindow {
            start,
            end,
            step_seconds,
        })
    }

    /// Spread the window over the sample budget, rounded up to whole seconds.
    fn derive_step(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
        let window_secs = u64::try_from((end - start).num_seconds()).unwrap_or(0);
        let budget = u64::from(self.defaults.sample_budget.max(1));
        window_secs
            .div_ceil(budget)
            .max(self.defaults.min_step_secs)
            .max(1)
    }
}

fn seconds(secs: u64) -> TimeDelta {
    TimeDelta::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX)).unwrap_or(TimeDelta::MAX)
}

/// Parse an absolute or relative timestamp.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidTimeRange`] if the value is not understood.
pub fn parse_timestamp(value: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if value == TIME_NOW {
        return Ok(now);
    }

    if let Some(offset) = value.strip_prefix(TIME_NOW) {
        let (sign, duration) = match offset.split_at_checked(1) {
            Some(("-", rest)) => (-1, rest),
            Some(("+", rest)) => (1, rest),
            _ => {
                return Err(GatewayError::invalid_time_range(format!(
                    "could not parse relative timestamp '{value}'"
                )))
            }
        };
        let delta = parse_duration(duration).map_err(|reason| {
            GatewayError::invalid_time_range(format!("'{value}': {reason}"))
        })?;
        return now
            .checked_add_signed(delta * sign)
            .ok_or_else(|| GatewayError::invalid_time_range(format!("'{value}' out of range")));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(secs) = value.parse::<f64>() {
        if secs.is_finite() {
            #[allow(clippy::cast_possible_truncation)]
            let millis = (secs * 1000.0).round() as i64;
            if let chrono::LocalResult::Single(dt) = Utc.timestamp_millis_opt(millis) {
                return Ok(dt);
            }
        }
    }

    Err(GatewayError::invalid_time_range(format!(
        "could not parse timestamp '{value}': not 'now[-duration]', RFC3339 or Unix seconds"
    )))
}

/// Parse a step, which must be at least one second.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidInterval`] if the value does not parse or is not positive.
pub fn parse_step(value: &str) -> Result<u64> {
    let invalid = |reason: String| GatewayError::InvalidInterval {
        interval: value.to_string(),
        reason,
    };

    let delta = parse_duration(value).map_err(invalid)?;
    if delta <= TimeDelta::zero() {
        return Err(invalid("step must be greater than zero".to_string()));
    }

    // Sub-second steps round up so a positive interval never becomes zero.
    let millis = delta.num_milliseconds();
    u64::try_from((millis + 999) / 1000).map_err(|e| invalid(e.to_string()))
}

/// Parse a Prometheus-style duration (`90s`, `5m`, `1.5h`) or bare seconds.
///
/// A leading `-` yields a negative duration so callers can reject it explicitly.
fn parse_duration(value: &str) -> std::result::Result<TimeDelta, String> {
    let value = value.trim();
    let (negative, body) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    if body.is_empty() {
        return Err("empty duration".to_string());
    }

    let num_end = body
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(body.len());
    if num_end == 0 {
        return Err(format!("duration '{value}' must start with a number"));
    }

    let amount: f64 = body[..num_end]
        .parse()
        .map_err(|_| format!("invalid number in duration '{value}'"))?;
    let unit_millis = match &body[num_end..] {
        "ms" => 1.0,
        "s" | "" => 1_000.0,
        "m" => 60_000.0,
        "h" => 3_600_000.0,
        "d" => 86_400_000.0,
        "w" => 604_800_000.0,
        unit => return Err(format!("unknown duration unit '{unit}'")),
    };

    let millis = amount * unit_millis;
    if !millis.is_finite() || millis > 1e15 {
        return Err(format!("duration '{value}' out of range"));
    }
    #[allow(clippy::cast_possible_truncation)]
    let millis = millis.round() as i64;
    Ok(TimeDelta::milliseconds(if negative { -millis } else { millis }))
}
