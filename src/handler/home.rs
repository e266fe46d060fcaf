//! Home page serving
//!
//! `GET /` returns a static HTML file read fresh on every request.

use hyper::body::Bytes;
use std::path::Path;
use tokio::fs;

use crate::http::{self, ApiError, HttpResponse};

pub async fn serve_home_page(path: impl AsRef<Path>) -> HttpResponse {
    match fs::read(path.as_ref()).await {
        Ok(content) => http::build_html_response(Bytes::from(content)),
        Err(_) => http::build_error_response(ApiError::HomePageNotFound),
    }
}
