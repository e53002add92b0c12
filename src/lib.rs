//! # geoproxy
//!
//! A caching HTTP proxy in front of the Google Maps geocoding and places APIs.
//!
//! Three read-only endpoints are exposed:
//!
//! - `GET /api/reverse-geocode?place_id=…`
//! - `GET /api/geocode?address=…`
//! - `GET /api/autocomplete?input=…&types=…&sessiontoken=…`
//!
//! Each one validates its query, consults the cache, calls the provider on a
//! miss, stores the result for 24 hours, and answers with
//! `{"status":"OK","data":[…]}` or a `400` error envelope.
//!
//! ## Wiring
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use geoproxy::app;
//! use geoproxy::cache::MemoryCache;
//! use geoproxy::geocode::Geocoder;
//! use geoproxy::server::Server;
//! use geoproxy::upstream::GoogleMapsClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = GoogleMapsClient::new("my-api-key", None)?;
//!     let geocoder = Geocoder::new(Arc::new(MemoryCache::new()), Arc::new(provider));
//!     let router = Arc::new(app::router(Arc::new(geocoder)));
//!
//!     let server = Server::bind("127.0.0.1:3000").await?;
//!     server.run(move |req| {
//!         let router = Arc::clone(&router);
//!         async move { router.route(req).await }
//!     }).await?;
//!     Ok(())
//! }
//! ```

// ── HTTP plumbing ─────────────────────────────────────────────────────────────
pub mod context;
pub mod http;
pub mod middleware;
pub mod router;
pub mod security;
pub mod server;

// ── Proxy ─────────────────────────────────────────────────────────────────────
pub mod app;
pub mod cache;
pub mod config;
pub mod geocode;
pub mod upstream;
pub mod validation;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use server::{Server, ServerError};
