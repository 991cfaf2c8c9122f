//! DOI开放获取解析（Unpaywall）

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

pub const UNPAYWALL_API_BASE: &str = "https://api.unpaywall.org/v2";

/// DOI的开放获取状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenAccessStatus {
    Found { oa_status: String, url: String },
    NotFound,
}

impl fmt::Display for OpenAccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenAccessStatus::Found { oa_status, url } => write!(
                f,
                "Open access version found! Status: {}. URL: {}",
                oa_status, url
            ),
            OpenAccessStatus::NotFound => write!(f, "No open access version found for this DOI."),
        }
    }
}

/// DOI解析接口
#[async_trait]
pub trait DoiResolver: Send + Sync {
    async fn resolve(&self, doi: &str) -> Result<OpenAccessStatus>;
}

#[derive(Debug, Deserialize)]
struct UnpaywallRecord {
    #[serde(default)]
    is_oa: bool,
    #[serde(default)]
    oa_status: Option<String>,
    #[serde(default)]
    best_oa_location: Option<OaLocation>,
}

#[derive(Debug, Deserialize)]
struct OaLocation {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    url_for_pdf: Option<String>,
}

impl UnpaywallRecord {
    fn into_status(self) -> OpenAccessStatus {
        if !self.is_oa {
            return OpenAccessStatus::NotFound;
        }
        let url = self
            .best_oa_location
            .and_then(|location| location.url_for_pdf.or(location.url))
            .filter(|url| !url.trim().is_empty());
        match url {
            Some(url) => OpenAccessStatus::Found {
                oa_status: self.oa_status.unwrap_or_else(|| "unknown".to_string()),
                url,
            },
            None => OpenAccessStatus::NotFound,
        }
    }
}

/// Unpaywall客户端
pub struct UnpaywallClient {
    http: Client,
    base: String,
    email: String,
}

impl UnpaywallClient {
    pub fn new(email: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::with_base(UNPAYWALL_API_BASE, email, timeout)
    }

    pub fn with_base(base: &str, email: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("deepresearch-rs/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build Unpaywall HTTP client")?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            email: email.into(),
        })
    }
}

#[async_trait]
impl DoiResolver for UnpaywallClient {
    async fn resolve(&self, doi: &str) -> Result<OpenAccessStatus> {
        let resp = self
            .http
            .get(format!("{}/{}", self.base, doi))
            .query(&[("email", self.email.as_str())])
            .send()
            .await?;

        // Unpaywall对未收录的DOI返回404
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(OpenAccessStatus::NotFound);
        }
        if !resp.status().is_success() {
            return Err(anyhow!("Unpaywall API error: HTTP {}", resp.status()));
        }
        let record: UnpaywallRecord = resp
            .json()
            .await
            .with_context(|| format!("invalid Unpaywall response for {}", doi))?;
        Ok(record.into_status())
    }
}
