//! 全文下载

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// 论文全文下载接口
#[async_trait]
pub trait PaperFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("deepresearch-rs/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build download HTTP client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PaperFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to download {}", url))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("download of {} failed: HTTP {}", url, status));
        }
        let bytes = resp.bytes().await?;
        tracing::debug!("downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}
