//! Outgoing responses and their wire encoding.

use std::fmt::Write as _;

use bytes::{BufMut, BytesMut};
use serde::Serialize;
use tracing::error;

use super::{Headers, StatusCode};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// A response under construction.
///
/// Handlers build one with the consuming builder methods; middleware that
/// wraps a downstream response uses [`add_header`](Response::add_header).
///
/// ```
/// use geoproxy::http::{Response, StatusCode};
/// use serde_json::json;
///
/// let response = Response::json(StatusCode::Ok, &json!({"status": "OK", "data": []}));
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Type: application/json; charset=utf-8\r\n"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
    keep_alive: bool,
    head_only: bool,
}

impl Response {
    /// An empty-bodied response. Connections stay open unless told otherwise.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
            keep_alive: true,
            head_only: false,
        }
    }

    /// `value` serialized as a JSON body.
    ///
    /// A value that fails to serialize is logged and answered with a bare
    /// `500`.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status)
                .header("Content-Type", JSON_CONTENT_TYPE)
                .body_bytes(body),
            Err(e) => {
                error!(error = %e, "failed to serialize response body");
                Self::new(StatusCode::InternalServerError)
            }
        }
    }

    /// Adds a header; repeating a name keeps both values.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    #[must_use]
    pub fn body(self, body: impl Into<String>) -> Self {
        self.body_bytes(body.into())
    }

    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Answer to a `HEAD` request: headers, including `Content-Length`, are
    /// written as for the full response but the body is not.
    #[must_use]
    pub fn without_body(mut self) -> Self {
        self.head_only = true;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body_ref(&self) -> &[u8] {
        &self.body
    }

    /// Encodes status line, headers and body.
    ///
    /// `Connection` and `Content-Length` are always written; a non-empty body
    /// without a `Content-Type` is labelled as plain text.
    pub fn into_bytes(self) -> BytesMut {
        let mut head = format!("HTTP/1.1 {}\r\n", self.status);
        for (name, value) in self.headers.iter() {
            let _ = write!(head, "{name}: {value}\r\n");
        }
        if !self.body.is_empty() && !self.headers.contains("content-type") {
            let _ = write!(head, "Content-Type: {TEXT_CONTENT_TYPE}\r\n");
        }
        let connection = if self.keep_alive { "keep-alive" } else { "close" };
        let _ = write!(
            head,
            "Connection: {connection}\r\nContent-Length: {}\r\n\r\n",
            self.body.len()
        );

        let mut buf = BytesMut::with_capacity(head.len() + self.body.len());
        buf.put_slice(head.as_bytes());
        if !self.head_only {
            buf.put_slice(&self.body);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_string(bytes: BytesMut) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn json_body_sets_content_type_and_length() {
        let r = Response::json(StatusCode::Ok, &json!({"status": "OK"}));
        assert_eq!(r.body_ref(), br#"{"status":"OK"}"#);
        let s = to_string(r.into_bytes());
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Type: application/json; charset=utf-8\r\n"));
        assert!(s.contains("Content-Length: 15\r\n"));
        assert!(s.ends_with("\r\n\r\n{\"status\":\"OK\"}"));
    }

    #[test]
    fn text_body_defaults_to_plain() {
        let s = to_string(Response::new(StatusCode::NotFound).body("Not Found").into_bytes());
        assert!(s.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(s.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    }

    #[test]
    fn no_body_no_content_type() {
        let s = to_string(Response::new(StatusCode::NoContent).into_bytes());
        assert!(!s.contains("Content-Type"));
        assert!(s.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn connection_close() {
        let s = to_string(Response::new(StatusCode::Ok).keep_alive(false).into_bytes());
        assert!(s.contains("Connection: close\r\n"));
    }

    #[test]
    fn added_headers_are_visible() {
        let mut r = Response::new(StatusCode::Ok).header("Allow", "GET");
        r.add_header("Access-Control-Allow-Origin", "*");
        assert_eq!(r.headers().get("allow"), Some("GET"));
        assert_eq!(r.headers().get("access-control-allow-origin"), Some("*"));
    }

    #[test]
    fn head_response_keeps_length_but_drops_body() {
        let r = Response::json(StatusCode::Ok, &json!({"status": "OK"})).without_body();
        let s = to_string(r.into_bytes());
        assert!(s.contains("Content-Length: 15\r\n"));
        assert!(s.contains("Content-Type: application/json; charset=utf-8\r\n"));
        assert!(s.ends_with("\r\n\r\n"));
    }
}
