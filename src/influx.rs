//! InfluxDB v2 writer for projected points

use crate::config::{HttpConfig, InfluxConfig};
use crate::error::{ModemError, Result};
use crate::metrics::Point;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct BucketList {
    #[serde(default)]
    buckets: Vec<Named>,
}

#[derive(Debug, Deserialize)]
struct OrgList {
    #[serde(default)]
    orgs: Vec<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    id: String,
    name: String,
}

pub struct InfluxWriter {
    client: Client,
    config: InfluxConfig,
}

impl InfluxWriter {
    pub fn new(config: InfluxConfig, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(http.timeout))
            .connect_timeout(Duration::from_secs(http.connect_timeout))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create the configured bucket if the organization does not have it yet
    pub async fn ensure_bucket(&self) -> Result<()> {
        let resp = self
            .client
            .get(self.url("/api/v2/buckets"))
            .header(AUTHORIZATION, self.token_header())
            .query(&[("name", self.config.bucket.as_str())])
            .send()
            .await?;
        let list: BucketList = checked(resp, "list buckets").await?.json().await?;

        if list.buckets.iter().any(|b| b.name == self.config.bucket) {
            debug!("Bucket {} exists", self.config.bucket);
            return Ok(());
        }

        info!("Bucket {} not found, creating...", self.config.bucket);
        let resp = self
            .client
            .get(self.url("/api/v2/orgs"))
            .header(AUTHORIZATION, self.token_header())
            .query(&[("org", self.config.org.as_str())])
            .send()
            .await?;
        let orgs: OrgList = checked(resp, "find organization").await?.json().await?;
        let org = orgs
            .orgs
            .iter()
            .find(|o| o.name == self.config.org)
            .ok_or_else(|| ModemError::Sink(format!("organization {} not found", self.config.org)))?;

        let resp = self
            .client
            .post(self.url("/api/v2/buckets"))
            .header(AUTHORIZATION, self.token_header())
            .json(&json!({
                "orgID": org.id,
                "name": self.config.bucket,
                "retentionRules": [],
            }))
            .send()
            .await?;
        checked(resp, "create bucket").await?;

        info!("Bucket {} created", self.config.bucket);
        Ok(())
    }

    /// Write all points in one request
    pub async fn write(&self, points: &[Point]) -> Result<()> {
        let resp = self
            .client
            .post(self.url("/api/v2/write"))
            .header(AUTHORIZATION, self.token_header())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "ns"),
            ])
            .body(line_body(points))
            .send()
            .await?;
        checked(resp, "write points").await?;

        debug!("Wrote {} points to {}", points.len(), self.config.bucket);
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), path)
    }

    fn token_header(&self) -> String {
        format!("Token {}", self.config.token)
    }
}

fn line_body(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

async fn checked(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ModemError::Sink(format!("Failed to {}: {} - {}", what, status, body)))
}
