//! HTTP handlers for the three endpoints.
//!
//! All three share one flow: validate, look up through the [`Geocoder`],
//! wrap the outcome in an [`ApiResponse`]. Every failure is a `400`.

use std::sync::Arc;

use tracing::warn;

use super::envelope::ApiResponse;
use super::{Endpoint, Geocoder};
use crate::context::Context;
use crate::validation;
use crate::{Request, Response};

/// Router entry point for `endpoint`.
pub async fn handle(geocoder: Arc<Geocoder>, endpoint: Endpoint, ctx: Context) -> Response {
    respond(&geocoder, endpoint, ctx.request())
        .await
        .into_response()
}

/// Produces the [`ApiResponse`] for one request.
pub async fn respond(geocoder: &Geocoder, endpoint: Endpoint, request: &Request) -> ApiResponse {
    let query = match validation::query_for(endpoint, request) {
        Ok(query) => query,
        Err(e) => {
            warn!(%endpoint, error = %e, "rejected request");
            return ApiResponse::error(e.to_string());
        }
    };

    match geocoder.lookup(&query).await {
        Ok(data) => ApiResponse::Ok(data),
        Err(e) => {
            warn!(%endpoint, error = %e, payload = ?e.payload(), "provider call failed");
            ApiResponse::from_upstream(e)
        }
    }
}
