//! Response envelopes shared by every handler.

use core::fmt::{self, Display, Formatter};
use std::error::Error;

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::{json, to_string as to_json_string};

#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub status_code: StatusCode,
    pub payload: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub const fn created(payload: T) -> Self {
        Self {
            status_code: StatusCode::CREATED,
            payload,
        }
    }

    pub const fn ok(payload: T) -> Self {
        Self {
            status_code: StatusCode::OK,
            payload,
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response<Body> {
        let body = match to_json_string(&self.payload) {
            Ok(body) => body,
            Err(err) => {
                return ApiError {
                    status_code: StatusCode::INTERNAL_SERVER_ERROR,
                    message: format!("Failed to serialize response: {err}"),
                }
                .into_response();
            }
        };
        Response::builder()
            .status(self.status_code)
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

/// One human-readable error message; raw storage or IO detail never rides
/// along, it is logged server-side instead.
#[derive(Debug)]
pub struct ApiError {
    pub status_code: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status_code, self.message)
    }
}

impl Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response<Body> {
        let body = json!({ "error": self.message }).to_string();
        Response::builder()
            .status(self.status_code)
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

#[derive(Debug, Serialize)]
struct GetHealthResponse {
    data: HealthStatus,
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: String,
}

pub async fn health_check_handler() -> impl IntoResponse {
    ApiResponse::ok(GetHealthResponse {
        data: HealthStatus {
            status: "alive".to_owned(),
        },
    })
    .into_response()
}
