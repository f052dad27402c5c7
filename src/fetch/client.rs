//! Outbound HTTP client
//!
//! Issues the proxied GET with a browser-like header set. One client is
//! built at startup and shared by every request; it holds a connection
//! pool only, never response content.

use hyper::body::Bytes;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::{guard, FetchError};
use crate::config::FetchConfig;

/// A successfully received remote page, body fully buffered
#[derive(Debug)]
pub struct FetchedPage {
    pub content_type: Option<String>,
    pub body: Bytes,
}

pub struct FetchClient {
    http: Client,
    user_agent: String,
    accept: String,
    accept_language: String,
    block_private_hosts: bool,
}

impl FetchClient {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            user_agent: config.user_agent.clone(),
            accept: config.accept.clone(),
            accept_language: config.accept_language.clone(),
            block_private_hosts: config.block_private_hosts,
        })
    }

    /// GET `target` and buffer the whole body
    ///
    /// The configured timeout covers connect, headers and body. Non-2xx
    /// answers are returned as `RemoteHttp` without reading the body.
    pub async fn fetch(&self, target: &str) -> Result<FetchedPage, FetchError> {
        let url = Url::parse(target)
            .map_err(|e| FetchError::Unexpected(format!("Invalid URL '{target}': {e}")))?;

        if self.block_private_hosts {
            if let Some(host) = guard::private_host(&url) {
                return Err(FetchError::Blocked(host));
            }
        }

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, &self.accept)
            .header(ACCEPT_LANGUAGE, &self.accept_language)
            .send()
            .await
            .map_err(|e| FetchError::from_client(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::RemoteHttp(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_client(&e))?;

        Ok(FetchedPage { content_type, body })
    }
}
