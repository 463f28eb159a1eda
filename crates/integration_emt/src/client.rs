//! EMT Madrid client
//!
//! Stop lookup and arrival estimates on top of [`MobilityApi`]. Every
//! authenticated request goes through [`EmtClient::execute`], which fetches a
//! token from the [`TokenManager`], classifies the response code and applies
//! the retry decision: one reauthentication, one fallback and a bounded number
//! of backoff retries per call.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::api::{ApiResponse, HttpMobilityApi, MobilityApi, StopsEndpoint};
use crate::arrivals;
use crate::config::EmtConfig;
use crate::credentials::Credentials;
use crate::error::EmtError;
use crate::geo::Coordinates;
use crate::models::{ArrivalPrediction, NearbyArrival, NearbyQuery, Stop};
use crate::response_code::{Action, Attempts, Failure, interpret};
use crate::token::{Token, TokenManager};

/// Upper bound for `NearbyQuery::max_results`
const MAX_NEARBY_RESULTS: u8 = 20;

/// Endpoint a request is sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Primary,
    Fallback,
}

/// Successful end states of one call
enum Outcome<T> {
    Accepted(T),
    Disabled,
}

/// Arrivals of one stop plus the stop name the API reported
struct StopArrivals {
    stop_name: Option<String>,
    arrivals: Vec<ArrivalPrediction>,
}

/// EMT Madrid MobilityLabs client
///
/// Cheap to clone; clones share the token so they never log in twice.
#[derive(Clone)]
pub struct EmtClient {
    api: Arc<dyn MobilityApi>,
    tokens: Arc<TokenManager>,
    config: EmtConfig,
}

impl EmtClient {
    /// Create a client talking to the real API
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the config is invalid, the credentials are
    /// incomplete, or the HTTP client cannot be initialized.
    pub fn new(config: &EmtConfig, credentials: Credentials) -> Result<Self, EmtError> {
        config.validate().map_err(EmtError::Configuration)?;
        if !credentials.is_complete() {
            return Err(EmtError::Configuration(
                "email and password are required".to_string(),
            ));
        }

        let api = HttpMobilityApi::new(config)?;
        Ok(Self::with_api(Arc::new(api), config.clone(), credentials))
    }

    /// Create a client on top of any transport
    pub fn with_api(
        api: Arc<dyn MobilityApi>,
        config: EmtConfig,
        credentials: Credentials,
    ) -> Self {
        let tokens = Arc::new(TokenManager::new(Arc::clone(&api), credentials));
        Self {
            api,
            tokens,
            config,
        }
    }

    /// The token manager shared by all clones of this client
    #[must_use]
    pub fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    /// Client configuration
    #[must_use]
    pub const fn config(&self) -> &EmtConfig {
        &self.config
    }

    /// Find stops within `radius_meters` of a point
    ///
    /// The remote ordering is kept. An empty list is a valid result.
    ///
    /// # Errors
    ///
    /// Fails fast with `InvalidRadius` / `InvalidLocation` on bad input;
    /// otherwise returns the error the request loop settled on.
    #[instrument(skip(self))]
    pub async fn find_nearby_stops(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: u32,
    ) -> Result<Vec<Stop>, EmtError> {
        if !self.config.radius_in_range(radius_meters) {
            return Err(EmtError::InvalidRadius {
                radius: radius_meters,
                min: self.config.min_radius_meters,
                max: self.config.max_radius_meters,
            });
        }
        Coordinates::new(latitude, longitude)?;

        let outcome = self
            .execute("stops", true, move |token, route| async move {
                let endpoint = match route {
                    Route::Primary => StopsEndpoint::AroundPoint,
                    Route::Fallback => StopsEndpoint::AroundStop,
                };
                self.api
                    .stops(token.value(), endpoint, latitude, longitude, radius_meters)
                    .await
            })
            .await?;

        let stops = match outcome {
            Outcome::Accepted(stops) => stops,
            Outcome::Disabled => Vec::new(),
        };

        let found = stops.len();
        let stops: Vec<Stop> = stops
            .into_iter()
            .filter(|s| s.distance_meters <= radius_meters)
            .collect();
        debug!(found, kept = stops.len(), "Nearby stops resolved");

        Ok(stops)
    }

    /// Live arrival predictions for a stop
    ///
    /// A disabled stop yields an empty list. `line_filter` keeps only
    /// predictions whose line label matches exactly.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLocation` for an empty stop id; otherwise the error the
    /// request loop settled on.
    #[instrument(skip(self))]
    pub async fn get_arrivals(
        &self,
        stop_id: &str,
        line_filter: Option<&str>,
    ) -> Result<Vec<ArrivalPrediction>, EmtError> {
        self.fetch_stop_arrivals(stop_id, line_filter)
            .await
            .map(|stop| stop.arrivals)
    }

    /// Next arrivals at every stop around a point, soonest first
    ///
    /// Stops whose arrivals cannot be fetched are logged and skipped so one
    /// broken stop never hides the others. Arrivals of `extra_stops` are
    /// added unless the stop was already found nearby.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is invalid or the stop lookup fails.
    #[instrument(skip(self))]
    pub async fn nearby_arrivals(
        &self,
        query: &NearbyQuery,
    ) -> Result<Vec<NearbyArrival>, EmtError> {
        let radius = query
            .radius_meters
            .unwrap_or(self.config.default_radius_meters);
        let max_results = query.max_results.unwrap_or(self.config.max_results);
        if max_results == 0 || max_results > MAX_NEARBY_RESULTS {
            return Err(EmtError::Configuration(format!(
                "max_results must be between 1 and {MAX_NEARBY_RESULTS}"
            )));
        }

        let stops = self
            .find_nearby_stops(query.latitude, query.longitude, radius)
            .await?;

        let mut results = Vec::new();
        for stop in &stops {
            match self.fetch_stop_arrivals(&stop.id, None).await {
                Ok(found) => results.extend(found.arrivals.into_iter().map(|arrival| {
                    NearbyArrival {
                        stop_name: Some(stop.name.clone()),
                        stop_distance_meters: Some(stop.distance_meters),
                        arrival,
                    }
                })),
                Err(e) => warn!(stop_id = %stop.id, error = %e, "Skipping stop"),
            }
        }

        for stop_id in &query.extra_stops {
            if stops.iter().any(|s| &s.id == stop_id) {
                continue;
            }
            match self.fetch_stop_arrivals(stop_id, None).await {
                Ok(found) => {
                    let stop_name = found.stop_name;
                    results.extend(found.arrivals.into_iter().map(|arrival| NearbyArrival {
                        stop_name: stop_name.clone(),
                        stop_distance_meters: None,
                        arrival,
                    }));
                },
                Err(e) => warn!(stop_id = %stop_id, error = %e, "Skipping extra stop"),
            }
        }

        results.sort_by_key(|r| r.arrival.minutes);
        results.truncate(usize::from(max_results));
        debug!(count = results.len(), stops = stops.len(), "Nearby arrivals collected");

        Ok(results)
    }

    async fn fetch_stop_arrivals(
        &self,
        stop_id: &str,
        line_filter: Option<&str>,
    ) -> Result<StopArrivals, EmtError> {
        let stop_id = stop_id.trim();
        if stop_id.is_empty() {
            return Err(EmtError::InvalidLocation(
                "stop id must not be empty".to_string(),
            ));
        }
        if !stop_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EmtError::InvalidLocation(format!(
                "stop id must be numeric: {stop_id:?}"
            )));
        }

        let outcome = self
            .execute("arrivals", false, move |token, _route| async move {
                self.api.arrivals(token.value(), stop_id).await
            })
            .await?;

        match outcome {
            Outcome::Accepted(payload) => {
                let arrivals = arrivals::normalize(stop_id, &payload, line_filter);
                debug!(stop_id, count = arrivals.len(), "Arrivals parsed");
                Ok(StopArrivals {
                    stop_name: payload.stop_name(),
                    arrivals,
                })
            },
            Outcome::Disabled => {
                debug!(stop_id, "Stop disabled, no arrivals");
                Ok(StopArrivals {
                    stop_name: None,
                    arrivals: Vec::new(),
                })
            },
        }
    }

    /// Run one authenticated call to completion
    ///
    /// Retries are strictly sequential. Transport errors (including timeouts)
    /// are returned as they are and never retried here.
    async fn execute<T, F, Fut>(
        &self,
        operation: &str,
        fallback_available: bool,
        call: F,
    ) -> Result<Outcome<T>, EmtError>
    where
        F: Fn(Token, Route) -> Fut,
        Fut: Future<Output = Result<ApiResponse<T>, EmtError>>,
    {
        let mut attempts = Attempts::new(fallback_available);
        let mut route = Route::Primary;

        loop {
            let token = self.tokens.ensure_token().await?;
            let response = call(token.clone(), route).await?;

            match interpret(&response.code, &attempts, &self.config.backoff) {
                Action::Accept => return Ok(Outcome::Accepted(response.data)),
                Action::SkipDisabled => return Ok(Outcome::Disabled),
                Action::ReauthRetry => {
                    warn!(operation, ?route, "Token rejected, reauthenticating");
                    self.tokens.invalidate_if_current(&token).await;
                    attempts.reauthenticated = true;
                },
                Action::Fallback => {
                    warn!(operation, "Primary endpoint unavailable, using fallback");
                    attempts.fell_back = true;
                    route = Route::Fallback;
                },
                Action::BackoffRetry => {
                    let delay = self.config.backoff.delay_for(attempts.backoffs);
                    attempts.backoffs += 1;
                    #[allow(clippy::cast_possible_truncation)]
                    let delay_ms = delay.as_millis() as u64;
                    warn!(
                        operation,
                        attempt = attempts.backoffs,
                        delay_ms,
                        "Rate limited, waiting before retry"
                    );
                    sleep(delay).await;
                },
                Action::Fail(failure) => {
                    if failure == Failure::ReauthExhausted {
                        self.tokens.invalidate_if_current(&token).await;
                    }
                    return Err(failure_error(failure, operation, &attempts, response));
                },
            }
        }
    }
}

fn failure_error<T>(
    failure: Failure,
    operation: &str,
    attempts: &Attempts,
    response: ApiResponse<T>,
) -> EmtError {
    match failure {
        Failure::ReauthExhausted => EmtError::ReauthExhausted,
        Failure::EndpointUnavailable => EmtError::EndpointUnavailable {
            operation: operation.to_string(),
        },
        Failure::RateLimitExhausted => EmtError::RateLimitExhausted {
            attempts: attempts.backoffs,
        },
        Failure::Protocol => EmtError::Protocol {
            code: response.code.as_str().to_string(),
            description: response.description,
        },
    }
}

impl fmt::Debug for EmtClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmtClient")
            .field("tokens", &self.tokens)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
