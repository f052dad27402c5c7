//! Static file serving module
//!
//! Maps request paths under the configured root to files, with index file
//! lookup, traversal protection, MIME detection and `ETag` revalidation.

use crate::config::StaticFilesConfig;
use crate::handler::router::RequestContext;
use crate::http::{self, mime, ETag};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Serve a request path from the static root
pub async fn serve_static(
    ctx: &RequestContext<'_>,
    config: &StaticFilesConfig,
) -> Response<Full<Bytes>> {
    let Some(file_path) = resolve_path(&config.root, ctx.path, &config.index_files).await else {
        return http::build_404_response();
    };

    let content = match fs::read(&file_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path.display()
            ));
            return http::build_404_response();
        }
    };

    let etag = ETag::for_content(&content);
    if etag.matches(ctx.if_none_match) {
        return http::build_304_response(etag.as_str());
    }

    let content_type = mime::content_type_for(&file_path);
    http::build_file_response(content, content_type, etag.as_str(), ctx.is_head)
}

/// Turn a request path into a file inside `root`
///
/// Returns `None` for anything missing, anything with a `..` component
/// after percent-decoding, and anything whose canonical path escapes the
/// canonical root (symlinks included).
pub async fn resolve_path(root: &Path, request_path: &str, index_files: &[String]) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
    let relative = Path::new(decoded.trim_start_matches('/'));

    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        logger::log_warning(&format!("Path traversal attempt blocked: {request_path}"));
        return None;
    }

    let root_canonical = match fs::canonicalize(root).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static directory not found or inaccessible '{}': {e}",
                root.display()
            ));
            return None;
        }
    };

    let mut file_path = root_canonical.join(relative);
    if fs::metadata(&file_path).await.ok()?.is_dir() {
        file_path = find_index(&file_path, index_files).await?;
    }

    // File not found is common (404), no need to log at warning level
    let canonical = fs::canonicalize(&file_path).await.ok()?;
    if !canonical.starts_with(&root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {request_path} -> {}",
            canonical.display()
        ));
        return None;
    }

    Some(canonical)
}

async fn find_index(dir: &Path, index_files: &[String]) -> Option<PathBuf> {
    for name in index_files {
        let candidate = dir.join(name);
        if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
            return Some(candidate);
        }
    }
    None
}
