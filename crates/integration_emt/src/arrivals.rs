//! Arrivals payload and normalization
//!
//! The arrivals endpoint returns one `Arrive` record per approaching bus plus
//! a `StopInfo` block describing the lines serving the stop. Records are
//! normalized here: seconds become clamped minutes, the API's no-estimate
//! sentinel becomes [`Eta::Unknown`], and absent optional fields stay absent.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{ArrivalPrediction, Eta};

/// `estimateArrive` value the API uses when it has no estimate
pub const NO_ESTIMATE_SECONDS: i64 = 999_999;

/// Decoded `data` of an arrivals response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArrivalsPayload {
    /// Approaching buses
    #[serde(rename = "Arrive", default)]
    pub arrivals: Vec<RawArrival>,
    /// Stop description, including per-line headers and headways
    #[serde(rename = "StopInfo", default)]
    pub stop_info: Vec<RawStopInfo>,
}

impl ArrivalsPayload {
    /// Merge the entries of a multi-element `data` array
    #[must_use]
    pub fn merge(parts: Vec<Self>) -> Self {
        parts.into_iter().fold(Self::default(), |mut acc, part| {
            acc.arrivals.extend(part.arrivals);
            acc.stop_info.extend(part.stop_info);
            acc
        })
    }

    /// Stop name reported in the stop info block
    #[must_use]
    pub fn stop_name(&self) -> Option<String> {
        self.stop_info
            .iter()
            .find_map(|info| non_empty(info.stop_name.as_deref()))
    }

    fn line_info(&self, label: &str) -> Option<&RawLineInfo> {
        self.stop_info
            .iter()
            .flat_map(|info| info.lines.iter())
            .find(|line| line.label.as_deref() == Some(label))
    }
}

/// One approaching bus as sent by the API
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawArrival {
    /// Line label (string or number on the wire)
    #[serde(default)]
    pub line: Option<Value>,
    /// Stop id
    #[serde(default)]
    pub stop: Option<Value>,
    /// Destination header
    #[serde(default)]
    pub destination: Option<String>,
    /// Seconds until arrival
    #[serde(rename = "estimateArrive", default)]
    pub estimate_arrive: Option<Value>,
    /// Meters between bus and stop
    #[serde(rename = "DistanceBus", default)]
    pub distance_bus: Option<Value>,
}

/// Stop description block
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawStopInfo {
    /// Stop name
    #[serde(rename = "stopName", default)]
    pub stop_name: Option<String>,
    /// Lines serving the stop
    #[serde(default)]
    pub lines: Vec<RawLineInfo>,
}

/// Per-line details in the stop description
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawLineInfo {
    /// Line label
    #[serde(default)]
    pub label: Option<String>,
    /// Terminus of direction A
    #[serde(rename = "headerA", default)]
    pub header_a: Option<String>,
    /// Terminus of direction B
    #[serde(rename = "headerB", default)]
    pub header_b: Option<String>,
    /// Shortest scheduled headway in minutes
    #[serde(rename = "minFreq", default)]
    pub min_freq: Option<Value>,
    /// Longest scheduled headway in minutes
    #[serde(rename = "maxFreq", default)]
    pub max_freq: Option<Value>,
}

/// Convert a raw `estimateArrive` value to an ETA
///
/// Seconds are floored to whole minutes and capped by [`Eta::from_minutes`].
#[must_use]
pub fn eta_from_seconds(raw: Option<&Value>) -> Eta {
    match raw.and_then(as_i64) {
        Some(NO_ESTIMATE_SECONDS) | None => Eta::Unknown,
        Some(seconds) if seconds < 0 => Eta::Unknown,
        Some(seconds) => Eta::from_minutes(seconds / 60),
    }
}

/// Build predictions for `stop_id`, keeping only `line_filter` when given
#[must_use]
pub fn normalize(
    stop_id: &str,
    payload: &ArrivalsPayload,
    line_filter: Option<&str>,
) -> Vec<ArrivalPrediction> {
    payload
        .arrivals
        .iter()
        .filter_map(|raw| {
            let line = raw.line.as_ref().and_then(as_string)?;
            if line_filter.is_some_and(|wanted| wanted != line) {
                return None;
            }

            let line_info = payload.line_info(&line);
            let destination = non_empty(raw.destination.as_deref());
            let origin = line_info.and_then(|info| origin_for(info, destination.as_deref()));
            let frequency = line_info.and_then(frequency_for);

            Some(ArrivalPrediction {
                stop_id: raw
                    .stop
                    .as_ref()
                    .and_then(as_string)
                    .unwrap_or_else(|| stop_id.to_string()),
                line,
                minutes: eta_from_seconds(raw.estimate_arrive.as_ref()),
                destination,
                origin,
                distance_meters: raw
                    .distance_bus
                    .as_ref()
                    .and_then(as_i64)
                    .and_then(|d| u32::try_from(d).ok()),
                frequency,
            })
        })
        .collect()
}

/// The header opposite to the one the bus is heading for
fn origin_for(info: &RawLineInfo, destination: Option<&str>) -> Option<String> {
    let destination = destination?;
    let a = non_empty(info.header_a.as_deref());
    let b = non_empty(info.header_b.as_deref());
    let heads_to = |header: &Option<String>| {
        header
            .as_deref()
            .is_some_and(|h| h.eq_ignore_ascii_case(destination))
    };

    if heads_to(&b) {
        a
    } else if heads_to(&a) {
        b
    } else {
        None
    }
}

fn frequency_for(info: &RawLineInfo) -> Option<String> {
    let min = info.min_freq.as_ref().and_then(as_i64).filter(|m| *m > 0);
    let max = info.max_freq.as_ref().and_then(as_i64).filter(|m| *m > 0);
    match (min, max) {
        (Some(min), Some(max)) if min == max => Some(format!("{min} min")),
        (Some(min), Some(max)) => Some(format!("{min}-{max} min")),
        (Some(only), None) | (None, Some(only)) => Some(format!("{only} min")),
        (None, None) => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        #[allow(clippy::cast_possible_truncation)]
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(Some(s.as_str())),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
