//! Fetch proxy route
//!
//! HTTP face of `crate::fetch`: runs the pipeline and converts its single
//! result into either the JSON envelope or one error response.

use crate::fetch::{self, FetchClient};
use crate::handler::router::RequestContext;
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

/// Serve `GET <fetch route>?url=<target>`
///
/// HEAD never reaches this handler, the router sends it to static files.
pub async fn serve_fetch(ctx: &RequestContext<'_>, client: &FetchClient) -> Response<Full<Bytes>> {
    let result = fetch::proxy_fetch(client, ctx.query)
        .await
        .and_then(|envelope| envelope.to_json());

    match result {
        Ok(json) => http::build_json_response(json),
        Err(e) => {
            let status = e.status();
            let message = format!("[Fetch] ?{} -> {status}: {e}", ctx.query.unwrap_or_default());
            if status.is_server_error() {
                logger::log_error(&message);
            } else {
                logger::log_warning(&message);
            }
            http::build_error_response(status, &e.to_string())
        }
    }
}
