//! HTTP/1.1 protocol types and parsing.
//!
//! The proxy speaks a small slice of HTTP/1.1: [`Method`], [`StatusCode`],
//! [`Headers`], [`Request`], and [`Response`] cover everything the router,
//! middleware, and endpoint handlers need.

use std::fmt;

pub mod headers;
pub mod request;
pub mod response;

pub use headers::Headers;
pub use request::Request;
pub use response::Response;

/// A response status the proxy can emit.
///
/// ```
/// use geoproxy::http::StatusCode;
///
/// assert_eq!(StatusCode::BadRequest.as_u16(), 400);
/// assert_eq!(StatusCode::BadRequest.reason(), "Bad Request");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    NoContent,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    InternalServerError,
}

impl StatusCode {
    fn parts(self) -> (u16, &'static str) {
        match self {
            Self::Ok => (200, "OK"),
            Self::NoContent => (204, "No Content"),
            Self::BadRequest => (400, "Bad Request"),
            Self::NotFound => (404, "Not Found"),
            Self::MethodNotAllowed => (405, "Method Not Allowed"),
            Self::PayloadTooLarge => (413, "Payload Too Large"),
            Self::InternalServerError => (500, "Internal Server Error"),
        }
    }

    pub fn as_u16(self) -> u16 {
        self.parts().0
    }

    /// Reason phrase written on the status line.
    pub fn reason(self) -> &'static str {
        self.parts().1
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (code, reason) = self.parts();
        write!(f, "{code} {reason}")
    }
}

/// Request method.
///
/// Routes are registered for `GET`; `HEAD` and `OPTIONS` get dedicated
/// handling. Any other token is kept verbatim so the router can answer it
/// with `405`.
///
/// ```
/// use geoproxy::http::Method;
///
/// assert_eq!(Method::from("GET"), Method::Get);
/// assert_eq!(Method::from("PURGE").as_str(), "PURGE");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Options,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Other(token) => token,
        }
    }
}

impl From<&str> for Method {
    /// Method tokens are case-sensitive; `get` is not `GET`.
    fn from(token: &str) -> Self {
        match token {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
