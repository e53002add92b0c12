//! Request heads, parsed with [`httparse`].

use std::collections::HashMap;

use thiserror::Error;

use super::{Headers, Method};

/// Header slots offered to httparse; a request with more is malformed.
const MAX_HEADERS: usize = 64;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request head is incomplete")]
    Incomplete,

    #[error("malformed request: {0}")]
    Parse(#[from] httparse::Error),

    #[error("request line has no {field}")]
    MissingField { field: &'static str },
}

/// A parsed request head.
///
/// Query parameters are percent-decoded once at parse time, so handlers see
/// `New York` for both `address=New%20York` and `address=New+York`.
///
/// ```
/// use geoproxy::http::request::Request;
///
/// let raw = b"GET /api/geocode?address=New%20York HTTP/1.1\r\nHost: localhost\r\n\r\n";
/// let (request, _head_len) = Request::parse(raw).unwrap();
///
/// assert_eq!(request.path(), "/api/geocode");
/// assert_eq!(request.query_param("address"), Some("New York"));
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    /// Request target exactly as sent.
    target: String,
    path_len: usize,
    minor_version: u8,
    headers: Headers,
    query: HashMap<String, String>,
}

impl Request {
    /// Parses the request head at the start of `buf`.
    ///
    /// Returns the request and the length of its head. A body, if the client
    /// sent one, starts at that offset and is left for the caller to skip;
    /// no endpoint reads it.
    ///
    /// # Errors
    ///
    /// [`RequestError::Incomplete`] until the blank line ending the head has
    /// arrived, [`RequestError::Parse`] for malformed input, and
    /// [`RequestError::MissingField`] if httparse leaves a field unset.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        let mut slots = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut head = httparse::Request::new(&mut slots);
        let httparse::Status::Complete(head_len) = head.parse(buf)? else {
            return Err(RequestError::Incomplete);
        };

        let missing = |field: &'static str| RequestError::MissingField { field };
        let method = head.method.map(Method::from).ok_or_else(|| missing("method"))?;
        let target = head.path.ok_or_else(|| missing("path"))?.to_owned();
        let minor_version = head.version.ok_or_else(|| missing("version"))?;

        // Headers with non-UTF-8 values are skipped.
        let headers = head
            .headers
            .iter()
            .filter_map(|h| Some((h.name, std::str::from_utf8(h.value).ok()?)))
            .collect();

        let (path_len, query) = match target.split_once('?') {
            Some((path, raw_query)) => (path.len(), decode_query(raw_query)),
            None => (target.len(), HashMap::new()),
        };

        let request = Self {
            method,
            target,
            path_len,
            minor_version,
            headers,
            query,
        };
        Ok((request, head_len))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The target up to, not including, the `?`.
    pub fn path(&self) -> &str {
        &self.target[..self.path_len]
    }

    /// Path and raw query string, as the client sent them.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Decoded value of query parameter `key`.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// `1` for HTTP/1.1, `0` for HTTP/1.0.
    pub fn minor_version(&self) -> u8 {
        self.minor_version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// HTTP/1.1 connections persist unless the client says `close`; HTTP/1.0
    /// ones only when it says `keep-alive`.
    pub fn is_keep_alive(&self) -> bool {
        match self.headers.get("connection") {
            Some(value) if self.minor_version == 0 => value.eq_ignore_ascii_case("keep-alive"),
            Some(value) => !value.eq_ignore_ascii_case("close"),
            None => self.minor_version == 1,
        }
    }

    pub fn content_length(&self) -> Option<usize> {
        self.headers.get("content-length")?.trim().parse().ok()
    }
}

// When a key repeats, the first occurrence is kept.
fn decode_query(raw: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        params
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let raw = b"GET /api/geocode HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let (req, offset) = Request::parse(raw).unwrap();
        assert_eq!(req.method(), &Method::Get);
        assert_eq!(req.path(), "/api/geocode");
        assert_eq!(req.minor_version(), 1);
        assert_eq!(req.headers().get("host"), Some("localhost"));
        assert_eq!(req.target(), "/api/geocode");
        assert_eq!(offset, raw.len());
    }

    #[test]
    fn query_params_are_percent_decoded() {
        let raw = b"GET /api/autocomplete?input=S%C3%A3o+Paulo&types=%28cities%29 HTTP/1.1\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        assert_eq!(req.query_param("input"), Some("São Paulo"));
        assert_eq!(req.query_param("types"), Some("(cities)"));
        assert_eq!(req.query_param("sessiontoken"), None);
    }

    #[test]
    fn empty_value_is_present_but_empty() {
        let raw = b"GET /api/geocode?address= HTTP/1.1\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        assert_eq!(req.query_param("address"), Some(""));
    }

    #[test]
    fn repeated_key_keeps_first() {
        let raw = b"GET /api/geocode?address=paris&address=rome HTTP/1.1\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        assert_eq!(req.query_param("address"), Some("paris"));
    }

    #[test]
    fn target_keeps_raw_query() {
        let raw = b"GET /api/geocode?address=New%20York HTTP/1.1\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        assert_eq!(req.target(), "/api/geocode?address=New%20York");
    }

    #[test]
    fn incomplete_request() {
        let raw = b"GET / HTTP/1.1\r\nHost:";
        assert!(matches!(Request::parse(raw), Err(RequestError::Incomplete)));
    }

    #[test]
    fn keep_alive_rules() {
        let (req, _) = Request::parse(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert!(req.is_keep_alive());

        let (req, _) = Request::parse(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap();
        assert!(!req.is_keep_alive());

        let (req, _) = Request::parse(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        assert!(!req.is_keep_alive());
    }

    #[test]
    fn content_length() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let (req, head_len) = Request::parse(raw).unwrap();
        assert_eq!(req.content_length(), Some(5));
        assert_eq!(&raw[head_len..], b"hello");
    }
}
