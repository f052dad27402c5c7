//! Request handler module
//!
//! Routes each request either to the fetch proxy or to the static file
//! responder.

pub mod fetch_proxy;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
