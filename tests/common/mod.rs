//! 集成测试使用的脚本化外部服务

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use tempfile::TempDir;

use deepresearch_rs::Config;
use deepresearch_rs::generator::context::{ResearchContext, ResearchServices};
use deepresearch_rs::llm::client::{CompletionBackend, CompletionRequest};
use deepresearch_rs::llm::embedding::Embedder;
use deepresearch_rs::store::{EMBEDDING_DIMENSIONS, InMemoryStore};
use deepresearch_rs::text::PlainTextExtractor;
use deepresearch_rs::tools::{
    Citation, DoiResolver, OpenAccessStatus, PaperFetcher, ReferenceManager,
    RegistrationOutcome, SearchBackend, SearchResponse,
};

pub const FINAL_REPORT: &str = "Final Report";
pub const PAPER_BODY: &str = "fake pdf content";

pub fn queries_json(queries: &[&str]) -> String {
    serde_json::json!({"query": queries, "rationale": "test"}).to_string()
}

pub fn sufficient_json() -> String {
    r#"{"is_sufficient": true, "knowledge_gap": "", "follow_up_queries": []}"#.to_string()
}

pub fn insufficient_json(follow_ups: &[&str]) -> String {
    serde_json::json!({
        "is_sufficient": false,
        "knowledge_gap": "more info",
        "follow_up_queries": follow_ups,
    })
    .to_string()
}

/// 按顺序返回预设回复的模型
#[derive(Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted response left"))
    }
}

/// 每个检索词返回一篇带DOI的摘要，可指定失败的检索词
#[derive(Default)]
pub struct ScriptedSearch {
    pub queries: Mutex<Vec<String>>,
    pub failing_query: Option<String>,
    pub fixed_results: Option<Vec<String>>,
}

impl ScriptedSearch {
    pub fn with_results(results: Vec<String>) -> Self {
        Self {
            fixed_results: Some(results),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

pub fn abstract_for(query: &str) -> String {
    let slug = query.replace(' ', "-");
    format!("Paper about {query}\nPublished: 2024-01-01\nDOI: 10.5555/{slug}\n\nAbstract on {query}.")
}

#[async_trait]
impl SearchBackend for ScriptedSearch {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn search(&self, query: &str) -> Result<SearchResponse> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.failing_query.as_deref() == Some(query) {
            bail!("connection reset");
        }
        let texts = match &self.fixed_results {
            Some(results) => results.clone(),
            None => vec![abstract_for(query)],
        };
        Ok(SearchResponse::Structured(
            texts
                .into_iter()
                .map(|text| deepresearch_rs::tools::SearchDocument {
                    text,
                    metadata: serde_json::Value::Null,
                })
                .collect(),
        ))
    }
}

/// 开放获取查询结果固定为找到或找不到
pub struct ScriptedResolver {
    pub open_access: bool,
    pub dois: Mutex<Vec<String>>,
}

impl ScriptedResolver {
    pub fn new(open_access: bool) -> Self {
        Self {
            open_access,
            dois: Mutex::new(Vec::new()),
        }
    }

    pub fn resolved(&self) -> Vec<String> {
        self.dois.lock().unwrap().clone()
    }
}

pub fn pdf_url(doi: &str) -> String {
    format!("http://example.com/{}.pdf", doi.replace('/', "_"))
}

#[async_trait]
impl DoiResolver for ScriptedResolver {
    async fn resolve(&self, doi: &str) -> Result<OpenAccessStatus> {
        self.dois.lock().unwrap().push(doi.to_string());
        if self.open_access {
            Ok(OpenAccessStatus::Found {
                oa_status: "gold".to_string(),
                url: pdf_url(doi),
            })
        } else {
            Ok(OpenAccessStatus::NotFound)
        }
    }
}

/// 记录登记请求的文献管理器
pub struct ScriptedReferences {
    pub outcome: Option<RegistrationOutcome>,
    pub citations: Mutex<Vec<Citation>>,
}

impl ScriptedReferences {
    pub fn accepting() -> Self {
        Self {
            outcome: Some(RegistrationOutcome::Registered {
                key: "ABCD1234".to_string(),
            }),
            citations: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            outcome: Some(RegistrationOutcome::Rejected {
                detail: "some error".to_string(),
            }),
            citations: Mutex::new(Vec::new()),
        }
    }

    /// 未配置文献管理
    pub fn disabled() -> Self {
        Self {
            outcome: Some(RegistrationOutcome::Disabled),
            citations: Mutex::new(Vec::new()),
        }
    }

    /// 传输层失败
    pub fn unreachable() -> Self {
        Self {
            outcome: None,
            citations: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.citations.lock().unwrap().len()
    }
}

#[async_trait]
impl ReferenceManager for ScriptedReferences {
    async fn register(&self, citation: &Citation) -> Result<RegistrationOutcome> {
        self.citations.lock().unwrap().push(citation.clone());
        self.outcome
            .clone()
            .ok_or_else(|| anyhow!("Zotero is unreachable"))
    }
}

/// 返回固定内容或固定失败的下载器
pub struct ScriptedFetcher {
    pub fail: bool,
    pub urls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaperFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.fail {
            bail!("Download Error");
        }
        Ok(PAPER_BODY.as_bytes().to_vec())
    }
}

/// 为每条文本返回常量向量
#[derive(Default)]
pub struct ConstantEmbedder {
    pub calls: Mutex<usize>,
}

impl ConstantEmbedder {
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Embedder for ConstantEmbedder {
    fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        *self.calls.lock().unwrap() += 1;
        Ok(texts.iter().map(|_| vec![0.1; EMBEDDING_DIMENSIONS]).collect())
    }
}

/// 一次测试运行所需的全部服务
pub struct Harness {
    pub llm: Arc<ScriptedLlm>,
    pub search: Arc<ScriptedSearch>,
    pub resolver: Arc<ScriptedResolver>,
    pub references: Arc<ScriptedReferences>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub embedder: Arc<ConstantEmbedder>,
    pub store: Arc<InMemoryStore>,
    pub temp_dir: TempDir,
}

impl Harness {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            llm: Arc::new(ScriptedLlm::new(responses)),
            search: Arc::new(ScriptedSearch::default()),
            resolver: Arc::new(ScriptedResolver::new(true)),
            references: Arc::new(ScriptedReferences::accepting()),
            fetcher: Arc::new(ScriptedFetcher::new(false)),
            embedder: Arc::new(ConstantEmbedder::default()),
            store: Arc::new(InMemoryStore::new()),
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn with_search(mut self, search: ScriptedSearch) -> Self {
        self.search = Arc::new(search);
        self
    }

    pub fn with_resolver(mut self, resolver: ScriptedResolver) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn with_references(mut self, references: ScriptedReferences) -> Self {
        self.references = Arc::new(references);
        self
    }

    pub fn with_fetcher(mut self, fetcher: ScriptedFetcher) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn config(&self) -> Config {
        let mut config = Config {
            output_path: self.temp_dir.path().join("output"),
            in_memory_store: true,
            skip_connection_check: true,
            ..Default::default()
        };
        config.llm.api_key = "test-key".to_string();
        config.unpaywall.email = "test@example.com".to_string();
        config
    }

    pub fn context(&self) -> ResearchContext {
        self.context_with(self.config())
    }

    pub fn context_with(&self, config: Config) -> ResearchContext {
        let services = ResearchServices {
            llm: self.llm.clone(),
            search: self.search.clone(),
            resolver: self.resolver.clone(),
            references: self.references.clone(),
            fetcher: self.fetcher.clone(),
            extractor: Arc::new(PlainTextExtractor),
            embedder: self.embedder.clone(),
            store: self.store.clone(),
        };
        ResearchContext::new(config, services)
            .unwrap()
            .with_current_date("October 19, 2026")
    }
}
