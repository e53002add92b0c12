//! Per-request context handed through the middleware chain to the handler.

use tokio::time::Instant;

use crate::Request;

/// Per-request context.
///
/// Owns the parsed [`Request`] and records when the request entered the
/// pipeline, so the access log and handlers agree on elapsed time.
pub struct Context {
    request: Request,
    received_at: Instant,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            received_at: Instant::now(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Shorthand for [`Request::query_param`].
    pub fn query(&self, key: &str) -> Option<&str> {
        self.request.query_param(key)
    }

    pub fn received_at(&self) -> Instant {
        self.received_at
    }
}
