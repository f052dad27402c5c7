//! Target URL extraction and scheme inference

use super::FetchError;

/// Query parameter carrying the target URL
pub const URL_PARAM: &str = "url";

/// Pull the target URL out of a raw query string
///
/// The first `url` occurrence wins. Absent and empty values are both
/// rejected before any network activity.
pub fn extract_target(query: Option<&str>) -> Result<String, FetchError> {
    let query = query.unwrap_or_default();
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(query).map_err(|_| FetchError::InvalidInput)?;

    pairs
        .into_iter()
        .find(|(key, _)| key == URL_PARAM)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
        .ok_or(FetchError::InvalidInput)
}

/// Prepend `https://` unless the target already names http or https
///
/// Only the scheme is inferred; the remainder is passed through untouched.
pub fn resolve_target(raw: &str) -> String {
    if has_http_scheme(raw) {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

fn has_http_scheme(raw: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        raw.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}
