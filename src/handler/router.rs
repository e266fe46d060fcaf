//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for path and method
//! validation and dispatching to the content store.
//!
//! | Method  | Path     | Action                                   |
//! |---------|----------|------------------------------------------|
//! | OPTIONS | any      | 200, empty body                          |
//! | GET     | `/`      | home page                                |
//! | GET     | `/{key}` | stored payload under its content type    |
//! | POST    | `/`      | store body under a fresh key             |
//! | POST    | `/{key}` | overwrite an existing record             |
//! | DELETE  | `/`      | always forbidden                         |
//! | DELETE  | `/{key}` | remove the record                        |

use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, HeaderName, CONTENT_TYPE, REFERER, USER_AGENT};
use hyper::{Method, Request};
use std::convert::Infallible;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppState;
use crate::handler::body::{effective_content_type, read_capped_body};
use crate::handler::home;
use crate::http::{self, ApiError, HttpResponse};
use crate::logger::{self, AccessLogEntry};
use crate::store::{Record, StoreError};

/// What a validated path addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target<'a> {
    Root,
    Key(&'a str),
}

/// Request context encapsulating information needed for request processing
struct RequestContext<'a> {
    method: &'a Method,
    /// Request target as received, used in event log lines
    url: String,
    state: &'a AppState,
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<HttpResponse, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let path = parts.uri.path();
    let is_options = parts.method == Method::OPTIONS;

    let ctx = RequestContext {
        method: &parts.method,
        url: parts.uri.to_string(),
        state: &state,
    };

    let target = parse_target(path);
    let mut response = match target {
        Some(target) if is_allowed_method(&parts.method) => {
            let declared = parts.headers.get(CONTENT_TYPE).map(|v| v.as_bytes());
            dispatch(&ctx, target, declared, body).await
        }
        _ => {
            logger::log_warning(&format!("Rejected {} {path}", parts.method));
            http::build_error_response(ApiError::Forbidden)
        }
    };
    http::apply_cors(&mut response, is_options);

    if state.config.logging.access_log {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            parts.method.to_string(),
            path.to_string(),
        );
        entry.query = parts.uri.query().map(ToString::to_string);
        entry.http_version = format!("{:?}", parts.version)
            .trim_start_matches("HTTP/")
            .to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.referer = header_string(&parts.headers, &REFERER);
        entry.user_agent = header_string(&parts.headers, &USER_AGENT);
        entry.key = match target {
            Some(Target::Key(key)) => Some(key.to_string()),
            _ => None,
        };
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// `/` or `/` followed by ASCII alphanumerics only
fn parse_target(path: &str) -> Option<Target<'_>> {
    let rest = path.strip_prefix('/')?;
    if rest.is_empty() {
        Some(Target::Root)
    } else if rest.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Some(Target::Key(rest))
    } else {
        None
    }
}

fn is_allowed_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::POST | Method::DELETE | Method::OPTIONS
    )
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

async fn dispatch<B>(
    ctx: &RequestContext<'_>,
    target: Target<'_>,
    declared_content_type: Option<&[u8]>,
    body: B,
) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let storage = &ctx.state.config.storage;
    match (ctx.method, target) {
        (&Method::OPTIONS, _) => http::build_options_response(),
        (&Method::GET, Target::Root) => home::serve_home_page(&storage.home_page).await,
        (&Method::GET, Target::Key(key)) => read_record(ctx, key).await,
        (&Method::POST, target) => {
            let content_type = effective_content_type(declared_content_type);
            let Some(record) = read_capped_body(body, content_type, storage.max_body_size).await
            else {
                // the client is gone; nothing is stored
                return http::build_error_response(match target {
                    Target::Root => ApiError::CreateFailed,
                    Target::Key(_) => ApiError::UpdateFailed,
                });
            };
            match target {
                Target::Root => create_record(ctx, &record).await,
                Target::Key(key) => update_record(ctx, key, &record).await,
            }
        }
        (&Method::DELETE, Target::Root) => http::build_error_response(ApiError::BulkDeleteForbidden),
        (&Method::DELETE, Target::Key(key)) => delete_record(ctx, key).await,
        _ => http::build_error_response(ApiError::Forbidden),
    }
}

async fn read_record(ctx: &RequestContext<'_>, key: &str) -> HttpResponse {
    match ctx.state.store.read(key).await {
        Ok(record) => http::build_payload_response(record),
        Err(StoreError::Io(e)) => {
            logger::log_warning(&format!("Failed to read record {key}: {e}"));
            http::build_error_response(ApiError::DataNotFound)
        }
        Err(_) => http::build_error_response(ApiError::DataNotFound),
    }
}

/// Store under a fresh key, regenerating on collision with an existing record
async fn create_record(ctx: &RequestContext<'_>, record: &Record) -> HttpResponse {
    let state = ctx.state;
    let attempts = state.config.storage.key_attempts.max(1);

    for _ in 0..attempts {
        let key = state.keys.next_key();
        match state.store.create(&key, record).await {
            Ok(()) => {
                state.events.info(ctx.method.as_str(), &ctx.url, &format!("created {key}"));
                return http::build_ok_response(Some(key));
            }
            Err(StoreError::Exists) => {
                logger::log_warning(&format!("Key {key} already taken, regenerating"));
            }
            Err(e) => {
                report_storage_failure(ctx, &e);
                return http::build_error_response(ApiError::CreateFailed);
            }
        }
    }

    let message = format!("No free key after {attempts} attempts");
    logger::log_error(&message);
    state.events.error(ctx.method.as_str(), &ctx.url, &message);
    http::build_error_response(ApiError::CreateFailed)
}

async fn update_record(ctx: &RequestContext<'_>, key: &str, record: &Record) -> HttpResponse {
    let store = &ctx.state.store;
    if !store.exists(key).await {
        return http::build_error_response(ApiError::DataNotFound);
    }

    match store.replace(key, record).await {
        Ok(()) => http::build_ok_response(None),
        // deleted between the existence check and the write
        Err(StoreError::NotFound) => http::build_error_response(ApiError::DataNotFound),
        Err(e) => {
            report_storage_failure(ctx, &e);
            http::build_error_response(ApiError::UpdateFailed)
        }
    }
}

async fn delete_record(ctx: &RequestContext<'_>, key: &str) -> HttpResponse {
    match ctx.state.store.delete(key).await {
        Ok(()) => {
            ctx.state
                .events
                .info(ctx.method.as_str(), &ctx.url, &format!("deleted {key}"));
            http::build_ok_response(None)
        }
        Err(StoreError::Io(e)) => {
            logger::log_warning(&format!("Failed to delete record {key}: {e}"));
            http::build_error_response(ApiError::DataNotFound)
        }
        Err(_) => http::build_error_response(ApiError::DataNotFound),
    }
}

fn report_storage_failure(ctx: &RequestContext<'_>, error: &StoreError) {
    logger::log_error(&format!("{} {}: {error}", ctx.method, ctx.url));
    ctx.state
        .events
        .error(ctx.method.as_str(), &ctx.url, &error.to_string());
}
