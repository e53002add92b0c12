//! Upstream places provider.
//!
//! [`PlacesProvider`] is the seam the geocoder calls through; the production
//! implementation is [`GoogleMapsClient`].

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::geocode::PlaceType;

mod google;

pub use google::{DEFAULT_BASE_URL, GoogleMapsClient};

/// Ordered provider result objects, passed through without interpretation.
pub type ResultArray = Vec<Map<String, Value>>;

/// A failed provider call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The provider answered, but with an error status. `payload` is its
    /// response body, returned to the client as-is.
    #[error("{message}")]
    Provider { message: String, payload: Value },

    /// The request never produced a usable answer (connect, TLS, timeout,
    /// undecodable body).
    #[error("{0}")]
    Transport(String),

    /// The provider reported success but the body lacks the expected array.
    #[error("{0}")]
    Malformed(String),
}

impl UpstreamError {
    /// The provider's structured error body, when it sent one.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Provider { payload, .. } => Some(payload),
            Self::Transport(_) | Self::Malformed(_) => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the API key.
        Self::Transport(err.without_url().to_string())
    }
}

/// Geocoding and autocomplete operations offered by the provider.
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    /// Resolves a provider place id to its address components.
    async fn reverse_geocode(&self, place_id: &str) -> Result<ResultArray, UpstreamError>;

    /// Resolves a free-form address.
    async fn geocode(&self, address: &str) -> Result<ResultArray, UpstreamError>;

    /// Predicts places for partial `input`.
    async fn autocomplete(
        &self,
        input: &str,
        types: PlaceType,
        session_token: &str,
    ) -> Result<ResultArray, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_provider_errors_carry_a_payload() {
        let provider = UpstreamError::Provider {
            message: "REQUEST_DENIED".into(),
            payload: json!({"status": "REQUEST_DENIED"}),
        };
        assert_eq!(provider.payload(), Some(&json!({"status": "REQUEST_DENIED"})));
        assert_eq!(provider.to_string(), "REQUEST_DENIED");

        let transport = UpstreamError::Transport("connection refused".into());
        assert!(transport.payload().is_none());
        assert_eq!(transport.to_string(), "connection refused");
    }
}
