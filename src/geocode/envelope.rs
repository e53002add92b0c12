//! JSON bodies the proxy answers with.

use serde::Serialize;
use serde_json::Value;

use crate::http::{Response, StatusCode};
use crate::upstream::{ResultArray, UpstreamError};

/// Status string of every success body.
pub const STATUS_OK: &str = "OK";

/// What an endpoint answers.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// `200 {"status":"OK","data":[…]}`
    Ok(ResultArray),
    /// `400 {"error":{"message":"…"}}`
    Error { message: String },
    /// `400` with the provider's own error body.
    Provider(Value),
}

#[derive(Serialize)]
struct SuccessBody<'a> {
    status: &'static str,
    data: &'a ResultArray,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorMessage<'a>,
}

#[derive(Serialize)]
struct ErrorMessage<'a> {
    message: &'a str,
}

impl ApiResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Provider payload if there is one, else a generic envelope around the
    /// error's message.
    pub fn from_upstream(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Provider { payload, .. } => Self::Provider(payload),
            other => {
                let message = other.to_string();
                if message.is_empty() {
                    Self::error("upstream request failed")
                } else {
                    Self::error(message)
                }
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Ok(_) => StatusCode::Ok,
            Self::Error { .. } | Self::Provider(_) => StatusCode::BadRequest,
        }
    }

    /// The body as a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Ok(data) => serde_json::json!({ "status": STATUS_OK, "data": data }),
            Self::Error { message } => serde_json::json!({ "error": { "message": message } }),
            Self::Provider(payload) => payload.clone(),
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Ok(data) => Response::json(
                status,
                &SuccessBody {
                    status: STATUS_OK,
                    data,
                },
            ),
            Self::Error { message } => Response::json(
                status,
                &ErrorBody {
                    error: ErrorMessage { message },
                },
            ),
            Self::Provider(payload) => Response::json(status, payload),
        }
    }
}
