//! Exact-path routing behind a middleware stack.
//!
//! [`Router`] matches exact paths, with trailing slashes normalized on both the
//! registered pattern and the incoming path, so `/api/geocode/` and
//! `/api/geocode` are equivalent. Routes are matched in registration order.
//!
//! Every request first runs through the router's middleware layers (in the
//! order they were added) and only then reaches dispatch:
//!
//! | Situation                                   | Response                          |
//! |---------------------------------------------|-----------------------------------|
//! | path and method registered                  | the handler's response            |
//! | `HEAD` on a path with a `GET` route         | the `GET` response, without body  |
//! | path registered, `OPTIONS` not registered   | `200` with an `Allow` header      |
//! | path registered, other method               | `405` with an `Allow` header      |
//! | path unknown                                | `404 Not Found`                   |

use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::middleware::{Middleware, MiddlewareHandler, Next, from_middleware};
use crate::{Method, Request, Response, StatusCode};

/// A stored endpoint: shared between connection tasks, returns a boxed future.
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

/// Anything the router accepts as an endpoint: in practice an
/// `async` closure or function taking a [`Context`].
pub trait IntoHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(ctx))
    }
}

/// Erases a concrete async function into a [`Handler`].
pub fn boxed(handler: impl IntoHandler) -> Handler {
    Arc::new(move |ctx| handler.call(ctx))
}

fn normalize(path: &str) -> &str {
    if path != "/" && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    }
}

#[derive(Clone)]
struct Route {
    method: Method,
    path: String,
    handler: Handler,
}

impl Route {
    fn new(method: Method, path: &str, handler: Handler) -> Self {
        Self {
            method,
            path: normalize(path).to_owned(),
            handler,
        }
    }

    fn matches_path(&self, path: &str) -> bool {
        self.path == normalize(path)
    }
}

/// HTTP request router with a middleware stack in front of dispatch.
///
/// # Examples
///
/// ```rust,no_run
/// use geoproxy::{Response, StatusCode};
/// use geoproxy::middleware::LoggerMiddleware;
/// use geoproxy::router::Router;
///
/// let mut router = Router::new();
/// router.layer(LoggerMiddleware);
/// router.get("/ping", |_ctx| async { Response::new(StatusCode::Ok) });
/// ```
#[derive(Default)]
pub struct Router {
    routes: Arc<Vec<Route>>,
    middlewares: Vec<MiddlewareHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `GET` requests on `path`.
    pub fn get(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Get, path, handler);
    }

    /// Append a middleware layer. The first layer added is the outermost.
    pub fn layer<M>(&mut self, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(from_middleware(Arc::new(middleware)));
    }

    fn add_route(&mut self, method: Method, path: &str, handler: impl IntoHandler) {
        Arc::make_mut(&mut self.routes).push(Route::new(method, path, boxed(handler)));
    }

    /// Run `request` through the middleware stack and dispatch it.
    pub async fn route(&self, request: Request) -> Response {
        let ctx = Context::new(request);
        let next = Next::new(Arc::from(self.middlewares.clone()), self.dispatcher());
        next.run(ctx).await
    }

    // The innermost step of the chain: pick the route, or answer 404/405/OPTIONS.
    fn dispatcher(&self) -> Handler {
        let routes = Arc::clone(&self.routes);
        boxed(move |ctx: Context| {
            let routes = Arc::clone(&routes);
            async move { dispatch(&routes, ctx).await }
        })
    }
}

async fn dispatch(routes: &[Route], ctx: Context) -> Response {
    let method = ctx.request().method().clone();
    let on_path: Vec<&Route> = routes
        .iter()
        .filter(|route| route.matches_path(ctx.request().path()))
        .collect();

    if let Some(route) = on_path.iter().find(|route| route.method == method) {
        let handler = Arc::clone(&route.handler);
        return handler(ctx).await;
    }

    // HEAD is served by the GET handler, minus the body.
    if method == Method::Head {
        if let Some(route) = on_path.iter().find(|route| route.method == Method::Get) {
            let handler = Arc::clone(&route.handler);
            return handler(ctx).await.without_body();
        }
    }

    if on_path.is_empty() {
        return Response::new(StatusCode::NotFound).body("Not Found");
    }

    let allow = allowed_methods(&on_path).join(", ");

    if method == Method::Options {
        Response::new(StatusCode::Ok).header("Allow", allow)
    } else {
        Response::new(StatusCode::MethodNotAllowed)
            .header("Allow", allow)
            .body("Method Not Allowed")
    }
}

// Registered methods in order, with HEAD listed ahead of every GET.
fn allowed_methods<'a>(routes: &[&'a Route]) -> Vec<&'a str> {
    let mut allowed = Vec::new();
    for route in routes {
        if route.method == Method::Get && !allowed.contains(&"HEAD") {
            allowed.push("HEAD");
        }
        let name = route.method.as_str();
        if !allowed.contains(&name) {
            allowed.push(name);
        }
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(method: &str, path: &str) -> Request {
        let raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        req
    }

    fn ok_router() -> Router {
        let mut router = Router::new();
        router.get("/api/geocode", |_ctx| async { Response::new(StatusCode::Ok) });
        router
    }

    #[test]
    fn normalize_strips_trailing_slash_except_root() {
        assert_eq!(normalize("/api/geocode/"), "/api/geocode");
        assert_eq!(normalize("/api/geocode"), "/api/geocode");
        assert_eq!(normalize("/"), "/");
    }

    #[tokio::test]
    async fn registered_get_matches_with_query_and_trailing_slash() {
        let router = ok_router();
        let res = router
            .route(make_request("GET", "/api/geocode/?address=paris"))
            .await;
        assert_eq!(res.status(), StatusCode::Ok);
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let router = ok_router();
        let res = router.route(make_request("GET", "/api/elevation")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn wrong_method_is_405_with_allow() {
        let router = ok_router();
        let res = router.route(make_request("POST", "/api/geocode")).await;
        assert_eq!(res.status(), StatusCode::MethodNotAllowed);
        assert_eq!(res.headers().get("allow"), Some("HEAD, GET"));
    }

    #[tokio::test]
    async fn options_on_known_path_lists_methods() {
        let router = ok_router();
        let res = router.route(make_request("OPTIONS", "/api/geocode")).await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.headers().get("allow"), Some("HEAD, GET"));
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let mut router = ok_router();
        router.get("/api/geocode", |_ctx| async {
            Response::new(StatusCode::NoContent)
        });
        let res = router.route(make_request("GET", "/api/geocode")).await;
        assert_eq!(res.status(), StatusCode::Ok);
    }

    #[tokio::test]
    async fn handler_sees_query_params() {
        let mut router = Router::new();
        router.get("/echo", |ctx: Context| async move {
            let value = ctx.query("q").unwrap_or_default().to_owned();
            Response::new(StatusCode::Ok).body(value)
        });
        let res = router.route(make_request("GET", "/echo?q=lyon")).await;
        assert_eq!(res.body_ref(), b"lyon");
    }

    #[tokio::test]
    async fn head_runs_get_handler_without_body() {
        let mut router = Router::new();
        router.get("/echo", |ctx: Context| async move {
            let value = ctx.query("q").unwrap_or_default().to_owned();
            Response::new(StatusCode::Ok).body(value)
        });

        let res = router.route(make_request("HEAD", "/echo?q=lyon")).await;
        assert_eq!(res.status(), StatusCode::Ok);

        let wire = String::from_utf8(res.into_bytes().to_vec()).unwrap();
        assert!(wire.contains("Content-Length: 4\r\n"), "{wire}");
        assert!(wire.ends_with("\r\n\r\n"), "{wire}");
    }

    #[tokio::test]
    async fn head_on_unknown_path_is_404() {
        let router = ok_router();
        let res = router.route(make_request("HEAD", "/api/elevation")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }
}
