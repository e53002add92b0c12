//! Request and response validation.
//!
//! [`query_for`] turns a request into a normalized [`GeocodeQuery`] or names
//! the constraint it broke. [`check_success_body`] enforces the shape of a
//! `200` body: `{"status": "OK", "data": [ {…}, … ]}`.

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::Request;
use crate::geocode::envelope::STATUS_OK;
use crate::geocode::{Endpoint, GeocodeQuery, PlaceType};

/// A violated request or response constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("You need to send `{label}` as query parameter")]
    MissingParameter { label: &'static str },

    #[error("`{name}` must be one of: {allowed}")]
    InvalidParameter { name: &'static str, allowed: String },

    #[error("response body {0}")]
    ResponseShape(&'static str),
}

/// Extracts and normalizes the query for `endpoint` from `request`.
///
/// An empty value counts as missing. For autocomplete, an absent or empty
/// `types` falls back to `(cities)` and an absent or empty `sessiontoken` is
/// replaced by a fresh UUID v4.
///
/// # Errors
///
/// [`ValidationError::MissingParameter`] when the required parameter is
/// absent, [`ValidationError::InvalidParameter`] when `types` is not an
/// allowed place type.
pub fn query_for(endpoint: Endpoint, request: &Request) -> Result<GeocodeQuery, ValidationError> {
    let required = request
        .query_param(endpoint.required_param())
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingParameter {
            label: endpoint.required_param_label(),
        })?;

    Ok(match endpoint {
        Endpoint::ReverseGeocode => GeocodeQuery::reverse_geocode(required),
        Endpoint::Geocode => GeocodeQuery::geocode(required),
        Endpoint::Autocomplete => {
            let types = match non_empty(request, "types") {
                Some(raw) => raw.parse::<PlaceType>().map_err(|_| allowed_types_error())?,
                None => PlaceType::default(),
            };
            let session_token = non_empty(request, "sessiontoken")
                .map(str::to_owned)
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            GeocodeQuery::autocomplete(required, types, session_token)
        }
    })
}

fn non_empty<'a>(request: &'a Request, key: &str) -> Option<&'a str> {
    request.query_param(key).filter(|value| !value.is_empty())
}

fn allowed_types_error() -> ValidationError {
    let allowed = PlaceType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    ValidationError::InvalidParameter {
        name: "types",
        allowed,
    }
}

/// Checks that `body` is a well-formed success envelope.
///
/// # Errors
///
/// [`ValidationError::ResponseShape`] naming the first violated rule.
pub fn check_success_body(body: &Value) -> Result<(), ValidationError> {
    let Value::Object(fields) = body else {
        return Err(ValidationError::ResponseShape("must be an object"));
    };

    match fields.get("status") {
        Some(Value::String(status)) if status == STATUS_OK => {}
        Some(_) => return Err(ValidationError::ResponseShape("`status` must be \"OK\"")),
        None => return Err(ValidationError::ResponseShape("is missing `status`")),
    }

    match fields.get("data") {
        Some(Value::Array(items)) if items.iter().all(Value::is_object) => Ok(()),
        Some(Value::Array(_)) => Err(ValidationError::ResponseShape(
            "`data` must contain only objects",
        )),
        Some(_) => Err(ValidationError::ResponseShape("`data` must be an array")),
        None => Err(ValidationError::ResponseShape("is missing `data`")),
    }
}
