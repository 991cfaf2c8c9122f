use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, anyhow};

use crate::config::{Config, SearchSource};
use crate::llm::client::CompletionBackend;
use crate::llm::client::utils::evaluate_befitting_model;
use crate::llm::embedding::{Embedder, ProviderEmbedder};
use crate::store::{DocumentStore, InMemoryStore, PgVectorStore, TableName};
use crate::text::{PdfTextExtractor, RecursiveCharacterSplitter, TextExtractor};
use crate::tools::zotero::LibraryType;
use crate::tools::{
    ArxivClient, DoiResolver, HttpFetcher, NoopReferenceManager, PaperFetcher, PubmedClient,
    ReferenceManager, SearchBackend, UnpaywallClient, ZoteroClient,
};

/// 调研流程依赖的外部服务
#[derive(Clone)]
pub struct ResearchServices {
    pub llm: Arc<dyn CompletionBackend>,
    pub search: Arc<dyn SearchBackend>,
    pub resolver: Arc<dyn DoiResolver>,
    pub references: Arc<dyn ReferenceManager>,
    pub fetcher: Arc<dyn PaperFetcher>,
    pub extractor: Arc<dyn TextExtractor>,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn DocumentStore>,
}

impl ResearchServices {
    /// 按配置创建真实的服务客户端
    pub fn from_config(config: &Config, llm: Arc<dyn CompletionBackend>) -> Result<Self> {
        let timeout = Duration::from_secs(config.search.timeout_seconds);

        let search: Arc<dyn SearchBackend> = match config.search.source {
            SearchSource::Arxiv => Arc::new(ArxivClient::new(config.search.max_results, timeout)?),
            SearchSource::Pubmed => {
                Arc::new(PubmedClient::new(config.search.max_results, timeout)?)
            }
        };

        let references: Arc<dyn ReferenceManager> = if config.zotero.is_configured() {
            let library_type: LibraryType = config
                .zotero
                .library_type
                .parse()
                .map_err(|e: String| anyhow!(e))?;
            Arc::new(ZoteroClient::new(
                library_type,
                config.zotero.library_id.clone(),
                config.zotero.api_key.clone(),
                timeout,
            )?)
        } else {
            tracing::info!("Zotero credentials not configured, papers will not be registered");
            Arc::new(NoopReferenceManager)
        };

        let store: Arc<dyn DocumentStore> = if config.in_memory_store {
            Arc::new(InMemoryStore::with_dimensions(config.embedding.dimensions))
        } else {
            let table = TableName::new(&config.database.schema, &config.database.table)?;
            Arc::new(PgVectorStore::new(
                config.database.url.clone(),
                table,
                config.embedding.dimensions,
            ))
        };

        Ok(Self {
            llm,
            search,
            resolver: Arc::new(UnpaywallClient::new(config.unpaywall.email.clone(), timeout)?),
            references,
            fetcher: Arc::new(HttpFetcher::new(timeout)?),
            extractor: Arc::new(PdfTextExtractor),
            embedder: Arc::new(
                ProviderEmbedder::new(&config.embedding, config.embedding_api_key())
                    .context("failed to create embedding client")?,
            ),
            store,
        })
    }
}

/// 调研上下文，各阶段共享的只读环境
#[derive(Clone)]
pub struct ResearchContext {
    pub config: Config,
    pub services: ResearchServices,
    pub splitter: RecursiveCharacterSplitter,
    /// 提示词中使用的当前日期，如 "October 19, 2026"
    pub current_date: String,
}

impl ResearchContext {
    pub fn new(config: Config, services: ResearchServices) -> Result<Self> {
        let splitter = RecursiveCharacterSplitter::new(
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
        )?;
        Ok(Self {
            config,
            services,
            splitter,
            current_date: current_date(),
        })
    }

    /// 固定提示词中的日期
    pub fn with_current_date(mut self, date: impl Into<String>) -> Self {
        self.current_date = date.into();
        self
    }

    /// 为一次请求选择主模型与备选模型
    pub fn select_models(
        &self,
        prefer_powerful: bool,
        system_prompt: &str,
        user_prompt: &str,
    ) -> (String, Option<String>) {
        evaluate_befitting_model(&self.config.llm, prefer_powerful, system_prompt, user_prompt)
    }
}

pub fn current_date() -> String {
    chrono::Local::now().format("%B %d, %Y").to_string()
}
