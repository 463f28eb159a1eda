//! MobilityLabs HTTP transport
//!
//! One method per remote operation. Methods return the classified response
//! code alongside the decoded data and never interpret the code themselves;
//! retry decisions belong to [`crate::response_code::interpret`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
#[cfg(test)]
use mockall::automock;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::arrivals::{ArrivalsPayload, as_string};
use crate::config::EmtConfig;
use crate::credentials::Credentials;
use crate::error::EmtError;
use crate::geo::Coordinates;
use crate::models::Stop;
use crate::response_code::ResponseCode;

/// Response code, description and decoded `data` of one API call
///
/// `data` is only decoded for successful codes; other codes carry the
/// default value.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    /// Classified response code
    pub code: ResponseCode,
    /// Human readable description sent by the API
    pub description: String,
    /// Decoded payload
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Build a response (mainly for tests and alternative transports)
    pub fn new(code: ResponseCode, data: T) -> Self {
        Self {
            code,
            description: String::new(),
            data,
        }
    }
}

/// Which stops endpoint to query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopsEndpoint {
    /// Primary "stops around point" endpoint
    AroundPoint,
    /// Secondary "around stop" endpoint, used when the primary is disabled
    AroundStop,
}

impl StopsEndpoint {
    const fn path_segment(self) -> &'static str {
        match self {
            Self::AroundPoint => "arroundxy",
            Self::AroundStop => "arroundstop",
        }
    }
}

impl fmt::Display for StopsEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Raw MobilityLabs operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MobilityApi: Send + Sync {
    /// Log in; `data` holds the access token when the code is a success
    async fn login(
        &self,
        credentials: &Credentials,
    ) -> Result<ApiResponse<Option<String>>, EmtError>;

    /// Stops within `radius_meters` of a point
    async fn stops(
        &self,
        token: &str,
        endpoint: StopsEndpoint,
        latitude: f64,
        longitude: f64,
        radius_meters: u32,
    ) -> Result<ApiResponse<Vec<Stop>>, EmtError>;

    /// Arrival estimates for a stop
    async fn arrivals(
        &self,
        token: &str,
        stop_id: &str,
    ) -> Result<ApiResponse<ArrivalsPayload>, EmtError>;
}

/// reqwest-based MobilityLabs transport
#[derive(Debug, Clone)]
pub struct HttpMobilityApi {
    client: Client,
    config: EmtConfig,
}

impl HttpMobilityApi {
    /// Create a new transport
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &EmtConfig) -> Result<Self, EmtError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("emt-madrid/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EmtError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Send a request and decode the common envelope
    ///
    /// HTTP 429 is reported as [`ResponseCode::RateLimited`]; any other non-2xx
    /// status is a transport failure.
    async fn send(&self, request: RequestBuilder) -> Result<Envelope, EmtError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                EmtError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                }
            } else {
                EmtError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(Envelope {
                code: ResponseCode::RateLimited,
                description: format!("HTTP {status}"),
                data: Value::Null,
            });
        }

        if !status.is_success() {
            return Err(EmtError::Network(format!("HTTP {status}")));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                EmtError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                }
            } else {
                EmtError::Network(e.to_string())
            }
        })?;

        Envelope::parse(&body)
    }
}

#[async_trait]
impl MobilityApi for HttpMobilityApi {
    #[instrument(skip_all, fields(email = %credentials.email()))]
    async fn login(
        &self,
        credentials: &Credentials,
    ) -> Result<ApiResponse<Option<String>>, EmtError> {
        let request = self
            .client
            .get(self.url("/v2/mobilitylabs/user/login/"))
            .header("email", credentials.email())
            .header("password", credentials.password());

        debug!("Logging in");
        let envelope = self.send(request).await?;
        let records: Vec<LoginRecord> = envelope.decode_data()?;
        let token = records.into_iter().find_map(|r| r.access_token);

        Ok(ApiResponse {
            code: envelope.code,
            description: envelope.description,
            data: token,
        })
    }

    #[instrument(skip(self, token))]
    async fn stops(
        &self,
        token: &str,
        endpoint: StopsEndpoint,
        latitude: f64,
        longitude: f64,
        radius_meters: u32,
    ) -> Result<ApiResponse<Vec<Stop>>, EmtError> {
        let url = self.url(&format!(
            "/v2/transport/busemtmad/stops/{}/{longitude}/{latitude}/{radius_meters}/",
            endpoint.path_segment()
        ));

        debug!(?url, "Searching nearby stops");
        let envelope = self
            .send(self.client.get(&url).header("accessToken", token))
            .await?;

        let origin = Coordinates::new(latitude, longitude).ok();
        let raw: Vec<RawStop> = envelope.decode_data()?;
        let stops = raw
            .into_iter()
            .filter_map(|r| r.into_stop(origin.as_ref()))
            .collect();

        Ok(ApiResponse {
            code: envelope.code,
            description: envelope.description,
            data: stops,
        })
    }

    #[instrument(skip(self, token))]
    async fn arrivals(
        &self,
        token: &str,
        stop_id: &str,
    ) -> Result<ApiResponse<ArrivalsPayload>, EmtError> {
        let url = self.url(&format!("/v2/transport/busemtmad/stops/{stop_id}/arrives/"));
        let body = json!({
            "cultureInfo": self.config.culture_info,
            "Text_StopRequired_YN": "Y",
            "Text_EstimationsRequired_YN": "Y",
            "Text_IncidencesRequired_YN": "N",
            "DateTime_Referenced_Incidencies_YYYYMMDD": Utc::now().format("%Y%m%d").to_string(),
        });

        debug!(?url, "Fetching arrivals");
        let envelope = self
            .send(self.client.post(&url).header("accessToken", token).json(&body))
            .await?;

        let parts: Vec<ArrivalsPayload> = envelope.decode_data()?;

        Ok(ApiResponse {
            code: envelope.code,
            description: envelope.description,
            data: ArrivalsPayload::merge(parts),
        })
    }
}

// --- Raw API response types for deserialization ---

/// Envelope shared by every MobilityLabs response
#[derive(Debug, Deserialize)]
struct Envelope {
    code: ResponseCode,
    #[serde(default)]
    description: String,
    #[serde(default)]
    data: Value,
}

impl Envelope {
    fn parse(body: &str) -> Result<Self, EmtError> {
        serde_json::from_str(body).map_err(|e| EmtError::Parse(e.to_string()))
    }

    /// Decode `data` for successful codes, default otherwise
    ///
    /// Error responses put arbitrary shapes (strings, empty objects) into
    /// `data`, so only successful payloads are decoded.
    fn decode_data<T: DeserializeOwned + Default>(&self) -> Result<T, EmtError> {
        if !self.code.is_success() || self.data.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(self.data.clone()).map_err(|e| EmtError::Parse(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRecord {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStop {
    #[serde(alias = "stop", default)]
    stop_id: Option<Value>,
    stop_name: Option<String>,
    geometry: Option<RawGeometry>,
    #[serde(alias = "distance")]
    meters_to_point: Option<f64>,
    #[serde(default)]
    lines: Vec<RawStopLine>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    /// `[longitude, latitude]`
    #[serde(default)]
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct RawStopLine {
    label: Option<String>,
    line: Option<Value>,
}

impl RawStop {
    /// Convert to a typed stop
    ///
    /// Records without an id are dropped. When the API omits the distance it
    /// is computed from the stop geometry; records with neither are dropped.
    fn into_stop(self, origin: Option<&Coordinates>) -> Option<Stop> {
        let Some(id) = self.stop_id.as_ref().and_then(as_string) else {
            debug!("Dropping stop without id");
            return None;
        };

        let position = self.geometry.and_then(|g| match g.coordinates.as_slice() {
            [lon, lat, ..] => Coordinates::new(*lat, *lon).ok(),
            _ => None,
        });

        let distance = self.meters_to_point.or_else(|| {
            origin
                .zip(position.as_ref())
                .map(|(from, to)| from.distance_meters(to))
        });
        let Some(distance) = distance.filter(|d| d.is_finite() && *d >= 0.0) else {
            debug!(stop_id = %id, "Dropping stop without distance");
            return None;
        };

        let lines = self
            .lines
            .into_iter()
            .filter_map(|l| l.label.or_else(|| l.line.as_ref().and_then(as_string)))
            .collect();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let distance_meters = distance.round() as u32;

        Some(Stop {
            name: self.stop_name.unwrap_or_else(|| id.clone()),
            id,
            latitude: position.map(|p| p.latitude()),
            longitude: position.map(|p| p.longitude()),
            distance_meters,
            lines,
        })
    }
}
