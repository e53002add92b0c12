//! Assembles the proxy's router: access log, CORS, and the three endpoints.

use std::sync::Arc;

use crate::context::Context;
use crate::geocode::{Endpoint, Geocoder, handlers};
use crate::middleware::LoggerMiddleware;
use crate::router::Router;
use crate::security::CorsMiddleware;

/// Builds the router serving every [`Endpoint`] with `geocoder`.
///
/// The access log is the outermost layer so it also records CORS preflights
/// and 404/405 answers.
pub fn router(geocoder: Arc<Geocoder>) -> Router {
    let mut router = Router::new();
    router.layer(LoggerMiddleware);
    router.layer(CorsMiddleware::new());

    for endpoint in Endpoint::ALL {
        let geocoder = Arc::clone(&geocoder);
        router.get(&endpoint.path(), move |ctx: Context| {
            handlers::handle(Arc::clone(&geocoder), endpoint, ctx)
        });
    }

    router
}
