use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use crate::error::ResearchError;
use crate::i18n::TargetLanguage;
use crate::store::EMBEDDING_DIMENSIONS;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "deepresearch.toml";

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    #[default]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Moonshot => write!(f, "moonshot"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Mistral => write!(f, "mistral"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "moonshot" => Ok(LLMProvider::Moonshot),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "mistral" => Ok(LLMProvider::Mistral),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "gemini" => Ok(LLMProvider::Gemini),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 学术检索来源
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    #[default]
    Arxiv,
    Pubmed,
}

impl std::fmt::Display for SearchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchSource::Arxiv => write!(f, "arxiv"),
            SearchSource::Pubmed => write!(f, "pubmed"),
        }
    }
}

impl std::str::FromStr for SearchSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arxiv" => Ok(SearchSource::Arxiv),
            "pubmed" => Ok(SearchSource::Pubmed),
            _ => Err(format!("Unknown search source: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 报告输出路径
    pub output_path: PathBuf,

    /// 报告语言
    pub target_language: TargetLanguage,

    /// 最大反思轮数
    pub max_research_loops: usize,

    /// 使用进程内向量存储代替Postgres
    pub in_memory_store: bool,

    /// 跳过启动时的模型连通性检查
    pub skip_connection_check: bool,

    /// 是否启用详细日志
    pub verbose: bool,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 向量化模型配置
    pub embedding: EmbeddingConfig,

    /// 向量数据库配置
    pub database: DatabaseConfig,

    /// 学术检索配置
    pub search: SearchConfig,

    pub unpaywall: UnpaywallConfig,

    pub zotero: ZoteroConfig,

    /// 全文切片配置
    pub chunking: ChunkingConfig,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址，为空时使用provider的默认地址
    pub api_base_url: String,

    /// 高能效模型，用于生成检索词与撰写报告
    pub model_efficient: String,

    /// 高质量模型，用于反思评估，以及作为efficient失效情况下的兜底
    pub model_powerful: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,
}

/// 向量化模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: LLMProvider,

    pub model: String,

    /// 为空时沿用LLM的API KEY
    pub api_key: String,

    pub api_base_url: String,

    /// 向量维度，必须与存储一致
    pub dimensions: usize,

    /// 单次请求的最大文本条数
    pub batch_size: usize,
}

/// 向量数据库配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres连接串
    pub url: String,

    pub schema: String,

    pub table: String,
}

/// 学术检索配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub source: SearchSource,

    /// 每条检索词返回的最大结果数
    pub max_results: usize,

    /// 初始检索词数量
    pub number_queries: usize,

    /// HTTP超时时间（秒）
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct UnpaywallConfig {
    /// Unpaywall要求每个请求附带联系邮箱
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ZoteroConfig {
    pub library_id: String,

    /// user 或 group
    pub library_type: String,

    pub api_key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,

    pub chunk_overlap: usize,
}

/// 环境变量候选，按顺序取第一个非空值
pub const LLM_API_KEY_VARS: &[&str] = &["DEEPRESEARCH_LLM_API_KEY", "GEMINI_API_KEY"];
pub const EMBEDDING_API_KEY_VARS: &[&str] = &["DEEPRESEARCH_EMBEDDING_API_KEY"];
pub const DATABASE_URL_VARS: &[&str] = &["DATABASE_URL", "POSTGRES_URI"];

fn first_configured<F>(keys: &[&str], lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
        .unwrap_or_default()
}

fn env_or_default(keys: &[&str]) -> String {
    first_configured(keys, |key| std::env::var(key).ok())
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 校验启动所需的配置项
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.llm.api_key.trim().is_empty() && self.llm.provider != LLMProvider::Ollama {
            return Err(ResearchError::config(
                "LLM API key is missing (set DEEPRESEARCH_LLM_API_KEY or --llm-api-key)",
            ));
        }
        if self.llm.model_efficient.trim().is_empty() || self.llm.model_powerful.trim().is_empty()
        {
            return Err(ResearchError::config("LLM model names must not be empty"));
        }
        if !self.in_memory_store && self.database.url.trim().is_empty() {
            return Err(ResearchError::config(
                "database url is missing (set DATABASE_URL or use --in-memory-store)",
            ));
        }
        if self.embedding.dimensions != EMBEDDING_DIMENSIONS {
            return Err(ResearchError::config(format!(
                "embedding dimensions must be {}, got {}",
                EMBEDDING_DIMENSIONS, self.embedding.dimensions
            )));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(ResearchError::config("embedding model must not be empty"));
        }
        if self.unpaywall.email.trim().is_empty() {
            return Err(ResearchError::config(
                "Unpaywall requires a contact email (set UNPAYWALL_EMAIL)",
            ));
        }
        if self.max_research_loops == 0 {
            return Err(ResearchError::config("max_research_loops must be at least 1"));
        }
        if self.search.number_queries == 0 || self.search.max_results == 0 {
            return Err(ResearchError::config(
                "number_queries and max_results must be at least 1",
            ));
        }
        if self.chunking.chunk_overlap == 0
            || self.chunking.chunk_overlap >= self.chunking.chunk_size
        {
            return Err(ResearchError::config(format!(
                "chunk_overlap ({}) must be non-zero and smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        Ok(())
    }

    /// 向量化服务使用的API KEY，未单独配置时沿用LLM的
    pub fn embedding_api_key(&self) -> &str {
        if self.embedding.api_key.trim().is_empty() {
            &self.llm.api_key
        } else {
            &self.embedding.api_key
        }
    }
}

impl ZoteroConfig {
    /// 库ID与API KEY齐全时才启用Zotero登记
    pub fn is_configured(&self) -> bool {
        !self.library_id.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./research.reports"),
            target_language: TargetLanguage::default(),
            max_research_loops: 3,
            in_memory_store: false,
            skip_connection_check: false,
            verbose: false,
            llm: LLMConfig::default(),
            embedding: EmbeddingConfig::default(),
            database: DatabaseConfig::default(),
            search: SearchConfig::default(),
            unpaywall: UnpaywallConfig::default(),
            zotero: ZoteroConfig::default(),
            chunking: ChunkingConfig::default(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: env_or_default(LLM_API_KEY_VARS),
            api_base_url: String::new(),
            model_efficient: String::from("gemini-2.5-flash"),
            model_powerful: String::from("gemini-2.5-pro"),
            max_tokens: 8192,
            temperature: 0.1,
            retry_attempts: 3,
            retry_delay_ms: 3000,
            timeout_seconds: 300,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Gemini,
            model: String::from("gemini-embedding-001"),
            api_key: env_or_default(EMBEDDING_API_KEY_VARS),
            api_base_url: String::new(),
            dimensions: EMBEDDING_DIMENSIONS,
            batch_size: 64,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env_or_default(DATABASE_URL_VARS),
            schema: String::from("public"),
            table: String::from("documents"),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            source: SearchSource::default(),
            max_results: 3,
            number_queries: 3,
            timeout_seconds: 60,
        }
    }
}

impl Default for UnpaywallConfig {
    fn default() -> Self {
        Self {
            email: env_or_default(&["UNPAYWALL_EMAIL"]),
        }
    }
}

impl Default for ZoteroConfig {
    fn default() -> Self {
        Self {
            library_id: env_or_default(&["ZOTERO_LIBRARY_ID"]),
            library_type: Some(env_or_default(&["ZOTERO_LIBRARY_TYPE"]))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| String::from("user")),
            api_key: env_or_default(&["ZOTERO_API_KEY"]),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}
