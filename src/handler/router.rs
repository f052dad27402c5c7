//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, body size
//! check, dispatch to the fetch proxy or the static file responder, then
//! common headers and the access log line.

use crate::config::{AppState, Config};
use crate::handler::{fetch_proxy, static_files};
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, IF_NONE_MATCH, REFERER, USER_AGENT};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
}

/// Main entry point for HTTP request handling
///
/// Only GET and HEAD are served, so the request body is never read.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, _body) = req.into_parts();

    logger::log_headers_count(parts.headers.len(), state.config.logging.show_headers);

    let deadline = request_deadline(&state.config);
    let mut response = match tokio::time::timeout(deadline, dispatch(&parts, &state)).await {
        Ok(response) => response,
        Err(_) => {
            logger::log_warning(&format!(
                "{} {} not answered within {}s",
                parts.method,
                parts.uri.path(),
                deadline.as_secs()
            ));
            http::build_error_response(StatusCode::GATEWAY_TIMEOUT, "Request timed out")
        }
    };
    http::apply_common_headers(&mut response, &state.config.http);

    if state.access_log_enabled() {
        log_access(&parts, &response, peer_addr, started, &state);
    }

    Ok(response)
}

/// Upper bound on handling one request
///
/// `performance.write_timeout`, stretched so it always outlasts the
/// outbound fetch timeout and a slow remote still maps to its own error.
fn request_deadline(config: &Config) -> Duration {
    Duration::from_secs(
        config
            .performance
            .write_timeout
            .max(config.fetch.timeout_secs.saturating_add(1)),
    )
}

async fn dispatch(parts: &Parts, state: &AppState) -> Response<Full<Bytes>> {
    // 1. Check HTTP method
    if let Some(resp) = check_http_method(&parts.method, state.config.http.enable_cors) {
        return resp;
    }

    // 2. Check body size
    if let Some(resp) = check_body_size(parts, state.config.http.max_body_size) {
        return resp;
    }

    let ctx = RequestContext {
        path: parts.uri.path(),
        query: parts.uri.query(),
        is_head: parts.method == Method::HEAD,
        if_none_match: parts
            .headers
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok()),
    };

    // 3. Fetch proxy route (GET only), everything else is a file
    if ctx.path == state.config.fetch.route && !ctx.is_head {
        fetch_proxy::serve_fetch(&ctx, &state.fetcher).await
    } else {
        static_files::serve_static(&ctx, &state.config.static_files).await
    }
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(parts: &Parts, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let size = parts
        .headers
        .get(hyper::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()?;

    if size > max_body_size {
        logger::log_warning(&format!(
            "Request body too large: {size} bytes (max: {max_body_size})"
        ));
        return Some(http::build_413_response());
    }
    None
}

fn log_access(
    parts: &Parts,
    response: &Response<Full<Bytes>>,
    peer_addr: SocketAddr,
    started: Instant,
    state: &AppState,
) {
    let header = |name: HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = format!("{:?}", parts.version)
        .trim_start_matches("HTTP/")
        .to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, &state.config.logging.access_log_format);
}
