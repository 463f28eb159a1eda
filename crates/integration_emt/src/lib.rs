//! EMT Madrid bus integration
//!
//! Nearby stop lookup and live arrival estimates via the
//! [MobilityLabs](https://mobilitylabs.emtmadrid.es) API of the Madrid
//! municipal bus operator.
//!
//! # Architecture
//!
//! [`MobilityApi`] is the raw transport, one method per remote operation,
//! implemented over HTTP by [`HttpMobilityApi`]. [`EmtClient`] sits on top of
//! it: the [`TokenManager`] owns the access token, and every response code is
//! classified by [`interpret`] into a single next step (accept, reauthenticate,
//! fall back, back off, skip or fail). Each step is bounded, so one call never
//! loops.
//!
//! # Example
//!
//! ```rust,ignore
//! use integration_emt::{Credentials, EmtClient, EmtConfig, NearbyQuery};
//!
//! let config = EmtConfig::default();
//! let client = EmtClient::new(&config, Credentials::new("me@example.com", "secret"))?;
//!
//! let stops = client.find_nearby_stops(40.4168, -3.7038, 300).await?;
//! let arrivals = client.get_arrivals(&stops[0].id, Some("27")).await?;
//!
//! let soonest = client
//!     .nearby_arrivals(&NearbyQuery::new(40.4168, -3.7038).with_max_results(3))
//!     .await?;
//! ```

mod api;
mod arrivals;
mod client;
mod config;
mod credentials;
mod error;
mod geo;
mod models;
mod response_code;
mod token;

pub use api::{ApiResponse, HttpMobilityApi, MobilityApi, StopsEndpoint};
pub use arrivals::{
    ArrivalsPayload, NO_ESTIMATE_SECONDS, RawArrival, RawLineInfo, RawStopInfo, eta_from_seconds,
    normalize,
};
pub use client::EmtClient;
pub use config::{BackoffConfig, EmtConfig};
pub use credentials::Credentials;
pub use error::EmtError;
pub use geo::Coordinates;
pub use models::{ArrivalPrediction, Eta, MAX_ETA_MINUTES, NearbyArrival, NearbyQuery, Stop};
pub use response_code::{Action, Attempts, Failure, ResponseCode, interpret};
pub use token::{Token, TokenManager};
