// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Query and result types for remote metrics backends.
//!
//! The public types ([`QuerySpec`], [`Series`], [`Sample`]) are what the gateway hands
//! to its callers. The `Api*` types mirror the Prometheus HTTP API envelope and stay
//! private to the backend module.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scope::Scope;
use crate::time_window::TimeWindow;

/// Fully specified range query. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub scope: Scope,
    pub window: TimeWindow,
    /// Query-language expression (`PromQL`)
    pub expression: String,
}

/// One `(timestamp, value)` point of a series.
///
/// `value` is written as a Prometheus-style string (`"1"`, `"NaN"`, `"+Inf"`,
/// `"-Inf"`) since JSON numbers cannot carry non-finite values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(with = "sample_value")]
    pub value: f64,
}

mod sample_value {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_value(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_value(&raw).ok_or_else(|| de::Error::custom(format!("invalid sample value '{raw}'")))
    }

    pub(super) fn format_value(value: f64) -> String {
        if value.is_nan() {
            "NaN".to_string()
        } else if value == f64::INFINITY {
            "+Inf".to_string()
        } else if value == f64::NEG_INFINITY {
            "-Inf".to_string()
        } else {
            value.to_string()
        }
    }

    pub(super) fn parse_value(raw: &str) -> Option<f64> {
        raw.parse::<f64>().ok()
    }
}

/// A labeled time-series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub labels: BTreeMap<String, String>,
    pub samples: Vec<Sample>,
}

impl Series {
    /// Value of the `__name__` label, if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.labels
            .get(crate::constants::METRIC_NAME_LABEL)
            .map(String::as_str)
    }
}

/// Ordered result of a range query. Empty is a valid outcome.
pub type SeriesResult = Vec<Series>;

// ============================================================================
// Prometheus HTTP API wire types
// ============================================================================

/// Prometheus API response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiEnvelope<T> {
    pub status: String,
    pub data: Option<T>,
    #[serde(rename = "errorType", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Prometheus API error body, used to extract details from non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(rename = "errorType", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    /// `errorType: error`, or whichever half is present.
    pub fn detail(&self) -> String {
        match (&self.error_type, &self.error) {
            (Some(kind), Some(error)) => format!("{kind}: {error}"),
            (Some(only), None) | (None, Some(only)) => only.clone(),
            (None, None) => String::new(),
        }
    }
}

/// `data` of a range query response.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiRangeData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<ApiMatrixSeries>,
}

/// One series of a `matrix` result.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiMatrixSeries {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    /// `(unix seconds, value as string)`
    #[serde(default)]
    pub values: Vec<(f64, String)>,
}

impl ApiMatrixSeries {
    /// Convert into a [`Series`], parsing sample values.
    ///
    /// Prometheus encodes values as strings so `NaN` and `+Inf` survive JSON.
    pub fn into_series(self) -> Result<Series, String> {
        let samples = self
            .values
            .into_iter()
            .map(|(ts, raw)| {
                let value = sample_value::parse_value(&raw)
                    .ok_or_else(|| format!("invalid sample value '{raw}'"))?;
                #[allow(clippy::cast_possible_truncation)]
                let timestamp = (ts * 1000.0).round() as i64;
                Ok(Sample { timestamp, value })
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok(Series {
            labels: self.metric,
            samples,
        })
    }
}
