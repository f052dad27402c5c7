//! Local development server: static files plus a same-origin fetch proxy.
//!
//! `GET /fetch?url=<target>` fetches `target` server-side with browser-like
//! headers and answers `{"html": "<decoded body>"}`, so a page served from
//! here can read any remote document without tripping CORS. Every other
//! path is served from the static root.

pub mod config;
pub mod fetch;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use config::Config;
pub use server::Server;
