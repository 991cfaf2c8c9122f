//! 文献管理（Zotero Web API）

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub const ZOTERO_API_BASE: &str = "https://api.zotero.org";

/// 待登记的文献信息，仅title与doi必填
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub doi: String,
    #[serde(default)]
    pub creators: Vec<String>,
    #[serde(default)]
    pub abstract_note: Option<String>,
    #[serde(default)]
    pub publication_title: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub pages: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl Citation {
    pub fn new(title: impl Into<String>, doi: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            doi: doi.into(),
            ..Default::default()
        }
    }

    /// 转换为Zotero的journalArticle条目
    fn to_item(&self) -> Value {
        let creators: Vec<Value> = self
            .creators
            .iter()
            .map(|name| serde_json::json!({"creatorType": "author", "name": name}))
            .collect();
        serde_json::json!({
            "itemType": "journalArticle",
            "title": self.title,
            "creators": creators,
            "abstractNote": self.abstract_note.clone().unwrap_or_default(),
            "publicationTitle": self.publication_title.clone().unwrap_or_default(),
            "volume": self.volume.clone().unwrap_or_default(),
            "issue": self.issue.clone().unwrap_or_default(),
            "pages": self.pages.clone().unwrap_or_default(),
            "date": self.date.clone().unwrap_or_default(),
            "DOI": self.doi,
        })
    }
}

/// 登记结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered { key: String },
    Rejected { detail: String },
    /// 未配置文献管理，未发出请求
    Disabled,
}

/// 文献管理接口
#[async_trait]
pub trait ReferenceManager: Send + Sync {
    async fn register(&self, citation: &Citation) -> Result<RegistrationOutcome>;
}

/// 未配置文献管理时使用
pub struct NoopReferenceManager;

#[async_trait]
impl ReferenceManager for NoopReferenceManager {
    async fn register(&self, _citation: &Citation) -> Result<RegistrationOutcome> {
        Ok(RegistrationOutcome::Disabled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryType {
    User,
    Group,
}

impl std::str::FromStr for LibraryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" | "users" => Ok(LibraryType::User),
            "group" | "groups" => Ok(LibraryType::Group),
            other => Err(format!("unknown Zotero library type: {}", other)),
        }
    }
}

impl LibraryType {
    fn path_segment(&self) -> &'static str {
        match self {
            LibraryType::User => "users",
            LibraryType::Group => "groups",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WriteResponse {
    #[serde(default)]
    successful: HashMap<String, Value>,
    #[serde(default)]
    success: HashMap<String, String>,
    #[serde(default)]
    failed: HashMap<String, Value>,
}

impl WriteResponse {
    fn into_outcome(self) -> RegistrationOutcome {
        let key = self
            .successful
            .get("0")
            .and_then(|item| item.get("key"))
            .and_then(|key| key.as_str())
            .map(str::to_string)
            .or_else(|| self.success.get("0").cloned());
        if let Some(key) = key {
            return RegistrationOutcome::Registered { key };
        }
        let detail = self
            .failed
            .get("0")
            .map(|failure| {
                failure
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| failure.to_string())
            })
            .unwrap_or_else(|| "Zotero accepted no items".to_string());
        RegistrationOutcome::Rejected { detail }
    }
}

/// Zotero客户端
pub struct ZoteroClient {
    http: Client,
    base: String,
    library_type: LibraryType,
    library_id: String,
    api_key: String,
}

impl ZoteroClient {
    pub fn new(
        library_type: LibraryType,
        library_id: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Self::with_base(ZOTERO_API_BASE, library_type, library_id, api_key, timeout)
    }

    pub fn with_base(
        base: &str,
        library_type: LibraryType,
        library_id: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("deepresearch-rs/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build Zotero HTTP client")?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            library_type,
            library_id: library_id.into(),
            api_key: api_key.into(),
        })
    }

    fn items_url(&self) -> String {
        format!(
            "{}/{}/{}/items",
            self.base,
            self.library_type.path_segment(),
            self.library_id
        )
    }
}

#[async_trait]
impl ReferenceManager for ZoteroClient {
    async fn register(&self, citation: &Citation) -> Result<RegistrationOutcome> {
        let resp = self
            .http
            .post(self.items_url())
            .header("Zotero-API-Key", &self.api_key)
            .header("Zotero-API-Version", "3")
            .json(&vec![citation.to_item()])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Ok(RegistrationOutcome::Rejected {
                detail: format!("HTTP {}: {}", status, body.trim()),
            });
        }
        let body: WriteResponse = resp
            .json()
            .await
            .context("invalid Zotero write response")?;
        Ok(body.into_outcome())
    }
}
