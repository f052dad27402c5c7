//! Fetch proxy core
//!
//! Turns a raw `/fetch` query string into a JSON envelope carrying the
//! decoded remote body, or into exactly one `FetchError`.

pub mod charset;
mod client;
mod error;
pub mod guard;
pub mod target;

use serde::Serialize;

pub use charset::{charset_from_content_type, decode_body, DecodeOutcome};
pub use client::{FetchClient, FetchedPage};
pub use error::FetchError;
pub use target::{extract_target, resolve_target};

use crate::logger;

/// Success payload: `{"html": "<decoded text>"}`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FetchEnvelope {
    pub html: String,
}

impl FetchEnvelope {
    pub fn to_json(&self) -> Result<Vec<u8>, FetchError> {
        serde_json::to_vec(self).map_err(|e| FetchError::Unexpected(e.to_string()))
    }
}

/// Run the whole proxy pipeline for one request
///
/// Validation happens before the client is touched, so a missing `url`
/// never produces network traffic.
pub async fn proxy_fetch(
    client: &FetchClient,
    query: Option<&str>,
) -> Result<FetchEnvelope, FetchError> {
    let raw = extract_target(query)?;
    let target = resolve_target(&raw);
    logger::log_debug(&format!("[Fetch] GET {target}"));

    let page = client.fetch(&target).await?;
    let charset = page
        .content_type
        .as_deref()
        .and_then(charset_from_content_type);

    let outcome = decode_body(&page.body, charset);
    if outcome.used_replacement() {
        logger::log_warning(&format!(
            "[Fetch] {target}: charset '{}' unusable, decoded as UTF-8 with replacement",
            charset.unwrap_or("utf-8")
        ));
    }

    Ok(FetchEnvelope {
        html: outcome.into_text(),
    })
}
