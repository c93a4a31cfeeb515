//! HTTP transport with timeouts and cookie support
//!
//! The modem serves a self-signed certificate, so certificate verification
//! is disabled on this client. Requests are never retried; a failed call is
//! returned to the caller as is.

use crate::config::HttpConfig;
use crate::error::{ModemError, Result};
use crate::modem::Transport;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;

const SOAP_ACTION: &str = "SOAPAction";

pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    pub fn new(cfg: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("modem-logs/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );

        let client = Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(true)
            .timeout(Duration::from_secs(cfg.timeout))
            .connect_timeout(Duration::from_secs(cfg.connect_timeout))
            .default_headers(headers)
            .build()?;

        Ok(Self { inner: client })
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn post(&self, endpoint: &str, action: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        let resp = self
            .inner
            .post(endpoint)
            .header(SOAP_ACTION, action)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ModemError::Status {
                status,
                url: endpoint.to_string(),
                body: text.chars().take(200).collect(),
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }
}
