//! Cross-origin resource sharing for browser clients of the proxy.
//!
//! The proxy is public and read-only, so the policy is fully permissive:
//! every origin is accepted and every standard method is advertised.

use std::pin::Pin;

use crate::{
    Method, Response, StatusCode,
    context::Context,
    middleware::{Middleware, Next},
};

const ALLOWED_METHODS: &str = "GET, HEAD, PUT, POST, DELETE, PATCH";
const PREFLIGHT_MAX_AGE: &str = "3600";

/// Answers preflights and marks responses to cross-origin requests as
/// readable from any origin.
///
/// # Behavior
///
/// - No `Origin` header: the request passes through unmodified.
/// - `OPTIONS` with `Access-Control-Request-Method` (a preflight): answered
///   with `204 No Content` and the allow headers; the handler is **not** called.
///   Requested headers are echoed back in `Access-Control-Allow-Headers`.
/// - Anything else: the handler runs and `Access-Control-Allow-Origin: *` is
///   appended to its response.
///
/// # Examples
///
/// ```rust,no_run
/// use geoproxy::router::Router;
/// use geoproxy::security::CorsMiddleware;
///
/// let mut router = Router::new();
/// router.layer(CorsMiddleware::new());
/// ```
#[derive(Debug, Default)]
pub struct CorsMiddleware;

impl CorsMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for CorsMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin(async move {
            let headers = ctx.request().headers();
            if !headers.contains("origin") {
                return next.run(ctx).await;
            }

            let is_preflight = ctx.request().method() == &Method::Options
                && headers.contains("access-control-request-method");

            if is_preflight {
                let mut resp = Response::new(StatusCode::NoContent)
                    .header("Access-Control-Allow-Origin", "*")
                    .header("Access-Control-Allow-Methods", ALLOWED_METHODS)
                    .header("Access-Control-Max-Age", PREFLIGHT_MAX_AGE);
                if let Some(requested) = headers.get("access-control-request-headers") {
                    resp.add_header("Access-Control-Allow-Headers", requested);
                }
                return resp;
            }

            let mut resp = next.run(ctx).await;
            resp.add_header("Access-Control-Allow-Origin", "*");
            resp
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Request;
    use crate::router::Router;

    fn router() -> Router {
        let mut router = Router::new();
        router.layer(CorsMiddleware::new());
        router.get("/api/geocode", |_ctx| async { Response::new(StatusCode::Ok) });
        router
    }

    fn request(raw: &str) -> Request {
        Request::parse(raw.as_bytes()).unwrap().0
    }

    #[tokio::test]
    async fn no_origin_passes_through_untouched() {
        let res = router()
            .route(request("GET /api/geocode HTTP/1.1\r\n\r\n"))
            .await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert!(!res.headers().contains("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn actual_request_gets_wildcard_origin() {
        let res = router()
            .route(request(
                "GET /api/geocode HTTP/1.1\r\nOrigin: https://app.example\r\n\r\n",
            ))
            .await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.headers().get("access-control-allow-origin"), Some("*"));
    }

    #[tokio::test]
    async fn preflight_short_circuits() {
        let res = router()
            .route(request(
                "OPTIONS /api/geocode HTTP/1.1\r\n\
                 Origin: https://app.example\r\n\
                 Access-Control-Request-Method: GET\r\n\
                 Access-Control-Request-Headers: X-Requested-With\r\n\r\n",
            ))
            .await;
        assert_eq!(res.status(), StatusCode::NoContent);
        assert_eq!(res.headers().get("access-control-allow-origin"), Some("*"));
        assert_eq!(
            res.headers().get("access-control-allow-methods"),
            Some(ALLOWED_METHODS)
        );
        assert_eq!(
            res.headers().get("access-control-allow-headers"),
            Some("X-Requested-With")
        );
    }

    #[tokio::test]
    async fn plain_options_with_origin_reaches_router() {
        let res = router()
            .route(request(
                "OPTIONS /api/geocode HTTP/1.1\r\nOrigin: https://app.example\r\n\r\n",
            ))
            .await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.headers().get("allow"), Some("GET"));
        assert_eq!(res.headers().get("access-control-allow-origin"), Some("*"));
    }
}
