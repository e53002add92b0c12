//! Google Maps Geocoding and Places Autocomplete over plain HTTPS.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::{PlacesProvider, ResultArray, UpstreamError};
use crate::geocode::PlaceType;

/// Base URL of the Maps web services.
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

// Provider statuses that mean the call went through. ZERO_RESULTS is an
// answer, not a failure.
const SUCCESS_STATUSES: [&str; 2] = ["OK", "ZERO_RESULTS"];

/// Google Maps implementation of [`PlacesProvider`].
pub struct GoogleMapsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GoogleMapsClient {
    /// Builds a client for `api_key`, talking to `base_url` or
    /// [`DEFAULT_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Fails only if the TLS backend cannot be initialized.
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("geoproxy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url,
        })
    }

    async fn call(
        &self,
        path: &str,
        params: &[(&str, &str)],
        field: &str,
    ) -> Result<ResultArray, UpstreamError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(path, "calling provider");

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.json::<Value>().await?;
        interpret(status, body, field)
    }
}

/// Turns a provider response into its result array or a structured failure.
fn interpret(http_status: StatusCode, body: Value, field: &str) -> Result<ResultArray, UpstreamError> {
    let status = body.get("status").and_then(Value::as_str).unwrap_or_default();

    if !http_status.is_success() || !SUCCESS_STATUSES.contains(&status) {
        let message = body
            .get("error_message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_owned)
            .or_else(|| (!status.is_empty()).then(|| status.to_owned()))
            .unwrap_or_else(|| format!("provider responded with HTTP {}", http_status.as_u16()));
        return Err(UpstreamError::Provider {
            message,
            payload: body,
        });
    }

    let Some(items) = body.get(field) else {
        return if status == "ZERO_RESULTS" {
            Ok(Vec::new())
        } else {
            Err(UpstreamError::Malformed(format!(
                "provider response has no `{field}` array"
            )))
        };
    };

    let Value::Array(items) = items else {
        return Err(UpstreamError::Malformed(format!(
            "provider `{field}` is not an array"
        )));
    };

    items
        .iter()
        .map(|item| match item {
            Value::Object(object) => Ok(object.clone()),
            _ => Err(UpstreamError::Malformed(format!(
                "provider `{field}` contains a non-object entry"
            ))),
        })
        .collect()
}

#[async_trait]
impl PlacesProvider for GoogleMapsClient {
    async fn reverse_geocode(&self, place_id: &str) -> Result<ResultArray, UpstreamError> {
        self.call("geocode/json", &[("place_id", place_id)], "results")
            .await
    }

    async fn geocode(&self, address: &str) -> Result<ResultArray, UpstreamError> {
        self.call("geocode/json", &[("address", address)], "results")
            .await
    }

    async fn autocomplete(
        &self,
        input: &str,
        types: PlaceType,
        session_token: &str,
    ) -> Result<ResultArray, UpstreamError> {
        self.call(
            "place/autocomplete/json",
            &[
                ("input", input),
                ("types", types.as_str()),
                ("sessiontoken", session_token),
            ],
            "predictions",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn ok_returns_named_array() {
        let body = json!({
            "status": "OK",
            "results": [{"place_id": "ChIJ", "formatted_address": "Paris, France"}]
        });
        let data = interpret(StatusCode::OK, body, "results").unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["formatted_address"], json!("Paris, France"));
    }

    #[test]
    fn predictions_field_for_autocomplete() {
        let body = json!({"status": "OK", "predictions": [{"description": "Lyon"}]});
        let data = interpret(StatusCode::OK, body, "predictions").unwrap();
        assert_eq!(data[0]["description"], json!("Lyon"));
    }

    #[test]
    fn zero_results_is_an_empty_success() {
        let body = json!({"status": "ZERO_RESULTS", "results": []});
        assert!(interpret(StatusCode::OK, body, "results").unwrap().is_empty());

        let bare = json!({"status": "ZERO_RESULTS"});
        assert!(interpret(StatusCode::OK, bare, "predictions").unwrap().is_empty());
    }

    #[test]
    fn error_status_keeps_payload_and_message() {
        let body = json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid.",
            "results": []
        });
        let err = interpret(StatusCode::OK, body.clone(), "results").unwrap_err();
        assert_eq!(err.to_string(), "The provided API key is invalid.");
        assert_eq!(err.payload(), Some(&body));
    }

    #[test]
    fn error_status_without_message_uses_status() {
        let body = json!({"status": "OVER_QUERY_LIMIT"});
        let err = interpret(StatusCode::OK, body, "results").unwrap_err();
        assert_eq!(err.to_string(), "OVER_QUERY_LIMIT");
    }

    #[test]
    fn http_failure_without_status_names_code() {
        let err = interpret(StatusCode::BAD_GATEWAY, json!({}), "results").unwrap_err();
        assert_eq!(err.to_string(), "provider responded with HTTP 502");
        assert!(err.payload().is_some());
    }

    #[test]
    fn malformed_success_has_no_payload() {
        let err = interpret(StatusCode::OK, json!({"status": "OK"}), "results").unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));
        assert!(err.payload().is_none());

        let err = interpret(StatusCode::OK, json!({"status": "OK", "results": [1]}), "results")
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GoogleMapsClient::new("key", Some("http://127.0.0.1:9/maps/api/".into())).unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:9/maps/api");
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_transport_error() {
        // Port 9 (discard) is closed on test hosts; the connect fails fast.
        let client = GoogleMapsClient::new("secret-key", Some("http://127.0.0.1:9".into())).unwrap();
        let err = client.geocode("paris").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)));
        assert!(!err.to_string().is_empty());
        assert!(!err.to_string().contains("secret-key"));
    }
}
