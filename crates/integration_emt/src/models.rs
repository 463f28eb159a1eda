//! EMT data models
//!
//! Typed representations of stops and arrival predictions. Values are
//! produced fresh on every call and never mutated afterwards.

use std::fmt;

use serde::{Serialize, Serializer};

/// Largest ETA the client reports; the API treats anything beyond it as "far away"
pub const MAX_ETA_MINUTES: u8 = 45;

/// A physical bus stop found by a geographic search
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Stop {
    /// Stop identifier (stable across calls)
    pub id: String,
    /// Stop name
    pub name: String,
    /// Latitude (WGS84), absent when the record has no geometry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude (WGS84)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Distance from the query point in meters
    pub distance_meters: u32,
    /// Labels of the lines serving the stop
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<String>,
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}m", self.name, self.id, self.distance_meters)
    }
}

/// Estimated time until a bus reaches the stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Eta {
    /// Whole minutes, within `0..=MAX_ETA_MINUTES`
    Minutes(u8),
    /// The API has no estimate
    Unknown,
}

impl Eta {
    /// Build from a raw minute value
    ///
    /// Values above [`MAX_ETA_MINUTES`] are clamped; negative values are not
    /// a valid estimate and become [`Eta::Unknown`].
    #[must_use]
    pub fn from_minutes(minutes: i64) -> Self {
        if minutes < 0 {
            return Self::Unknown;
        }
        let capped = minutes.min(i64::from(MAX_ETA_MINUTES));
        u8::try_from(capped).map_or(Self::Unknown, Self::Minutes)
    }

    /// Minutes, if known
    #[must_use]
    pub const fn minutes(self) -> Option<u8> {
        match self {
            Self::Minutes(m) => Some(m),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(m) => write!(f, "{m} min"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for Eta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Minutes(m) => serializer.serialize_u8(*m),
            Self::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

/// A live arrival prediction for one bus at one stop
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ArrivalPrediction {
    /// Stop the prediction refers to
    pub stop_id: String,
    /// Line label (e.g. "27")
    pub line: String,
    /// Time until arrival
    pub minutes: Eta,
    /// Destination header of the bus
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Header the bus started from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Distance between the bus and the stop in meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<u32>,
    /// Scheduled headway, e.g. "8-12 min"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

impl fmt::Display for ArrivalPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.line, self.minutes)?;
        if let Some(destination) = &self.destination {
            write!(f, " → {destination}")?;
        }
        Ok(())
    }
}

/// Parameters for a nearby-arrivals lookup
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyQuery {
    /// Latitude of the query point
    pub latitude: f64,
    /// Longitude of the query point
    pub longitude: f64,
    /// Search radius in meters (config default when `None`)
    pub radius_meters: Option<u32>,
    /// Number of arrivals to return (config default when `None`)
    pub max_results: Option<u8>,
    /// Stops queried in addition to the ones found around the point
    pub extra_stops: Vec<String>,
}

impl NearbyQuery {
    /// Query around a point using configured defaults
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_meters: None,
            max_results: None,
            extra_stops: Vec::new(),
        }
    }

    /// Set the search radius
    #[must_use]
    pub fn with_radius(mut self, radius_meters: u32) -> Self {
        self.radius_meters = Some(radius_meters);
        self
    }

    /// Set the number of arrivals to return
    #[must_use]
    pub fn with_max_results(mut self, max_results: u8) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Add stops to query on top of the nearby ones
    #[must_use]
    pub fn with_extra_stops(mut self, stops: impl IntoIterator<Item = String>) -> Self {
        self.extra_stops.extend(stops);
        self
    }
}

/// An arrival found by a nearby lookup, with the stop it belongs to
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NearbyArrival {
    /// Stop name, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_name: Option<String>,
    /// Distance from the query point to the stop (None for extra stops)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_distance_meters: Option<u32>,
    /// The prediction itself
    #[serde(flatten)]
    pub arrival: ArrivalPrediction,
}
