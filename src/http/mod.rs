//! HTTP protocol layer module
//!
//! Response builders, entity tags and MIME detection shared by the static
//! file responder and the fetch proxy.

pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use cache::ETag;
pub use response::{
    apply_common_headers, build_304_response, build_404_response, build_405_response,
    build_413_response, build_error_response, build_file_response, build_json_response,
    build_options_response,
};
