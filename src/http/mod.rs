//! HTTP protocol layer module
//!
//! Response building for the content server: the JSON result envelope,
//! raw payload responses and the CORS headers every response carries.

pub mod response;

// Re-export commonly used types
pub use response::{
    apply_cors, build_error_response, build_html_response, build_ok_response,
    build_options_response, build_payload_response, ApiError, ApiResponse, HttpResponse,
};
