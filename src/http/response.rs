//! HTTP response building module
//!
//! Structured results are serialized as `{code, message, data?}` JSON;
//! record fetches return the stored bytes under the stored content type.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::store::Record;

pub type HttpResponse = Response<Full<Bytes>>;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Result envelope for every non-payload response
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub code: u16,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Every failure a request can end in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// Path or method rejected by validation
    Forbidden,
    /// `DELETE /`
    BulkDeleteForbidden,
    HomePageNotFound,
    DataNotFound,
    /// Storage failed while creating a record
    CreateFailed,
    /// Storage failed while overwriting a record
    UpdateFailed,
}

impl ApiError {
    pub const fn code(self) -> u16 {
        match self {
            Self::Forbidden => 4030,
            Self::BulkDeleteForbidden => 4031,
            Self::HomePageNotFound => 4040,
            Self::DataNotFound => 4041,
            Self::CreateFailed => 5000,
            Self::UpdateFailed => 5001,
        }
    }

    pub const fn status(self) -> StatusCode {
        match self {
            Self::Forbidden | Self::BulkDeleteForbidden => StatusCode::FORBIDDEN,
            Self::HomePageNotFound | Self::DataNotFound => StatusCode::NOT_FOUND,
            Self::CreateFailed | Self::UpdateFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::Forbidden | Self::BulkDeleteForbidden => "Forbidden",
            Self::HomePageNotFound => "Home page not found",
            Self::DataNotFound => "Data not exists",
            Self::CreateFailed | Self::UpdateFailed => "Something seems wrong",
        }
    }
}

/// Build JSON envelope response
pub fn json_response(status: StatusCode, body: &ApiResponse) -> HttpResponse {
    let json = match serde_json::to_string(body) {
        Ok(j) => j,
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::new()))
                .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())));
        }
    };

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// `200 {code: 0, message: "OK"}`, with the key in `data` when one was created
pub fn build_ok_response(data: Option<String>) -> HttpResponse {
    json_response(
        StatusCode::OK,
        &ApiResponse {
            code: 0,
            message: "OK",
            data,
        },
    )
}

pub fn build_error_response(error: ApiError) -> HttpResponse {
    json_response(
        error.status(),
        &ApiResponse {
            code: error.code(),
            message: error.message(),
            data: None,
        },
    )
}

/// Serve a stored record as-is under its own content type
pub fn build_payload_response(record: Record) -> HttpResponse {
    let content_type = HeaderValue::from_str(&record.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(Full::new(record.payload))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build generic HTML response
pub fn build_html_response(content: Bytes) -> HttpResponse {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html")
        .body(Full::new(content))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build OPTIONS (preflight) response
pub fn build_options_response() -> HttpResponse {
    Response::new(Full::new(Bytes::new()))
}

/// Add the CORS headers: every response allows any origin, and OPTIONS
/// requests additionally learn that `Content-Type` may be sent.
pub fn apply_cors(response: &mut HttpResponse, is_options: bool) {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    if is_options {
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        );
    }
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
