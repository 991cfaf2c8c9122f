use crate::config::{Config, DEFAULT_CONFIG_FILE, LLMProvider, SearchSource};
use crate::i18n::TargetLanguage;
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::path::PathBuf;

/// DeepResearch-RS - 由Rust与AI驱动的学术文献调研引擎
#[derive(Parser, Debug)]
#[command(name = "deepresearch-rs")]
#[command(
    about = "AI-driven research engine: generates academic search queries for a topic, reflects on the literature it finds, collects open-access full texts into a vector store and writes a research report."
)]
#[command(version)]
pub struct Args {
    /// 调研主题
    pub topic: String,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 输出路径
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// LLM Provider (openai, moonshot, deepseek, mistral, openrouter, anthropic, gemini, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// 高能效模型，用于生成检索词与撰写报告
    #[arg(long)]
    pub model_efficient: Option<String>,

    /// 高质量模型，用于反思评估，以及作为efficient失效情况下的兜底
    #[arg(long)]
    pub model_powerful: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// Postgres连接串
    #[arg(long)]
    pub database_url: Option<String>,

    /// 学术检索来源 (arxiv, pubmed)
    #[arg(long)]
    pub search_source: Option<String>,

    /// 初始检索词数量
    #[arg(long)]
    pub number_queries: Option<usize>,

    /// 每个检索词返回的最大结果数
    #[arg(long)]
    pub max_results: Option<usize>,

    /// 目标语言 (zh, en, ja, ko, de, fr, ru)
    #[arg(long)]
    pub target_language: Option<String>,

    /// 使用内存向量存储，不连接数据库
    #[arg(long)]
    pub in_memory_store: bool,

    /// 跳过启动时的模型连接检查
    #[arg(long)]
    pub skip_connection_check: bool,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            // 显式指定的配置文件必须可读
            Some(config_path) => Config::from_file(config_path)
                .with_context(|| format!("无法读取配置文件 {:?}", config_path))?,
            None => {
                let default_config_path = std::env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join(DEFAULT_CONFIG_FILE);
                if default_config_path.exists() {
                    Config::from_file(&default_config_path).with_context(|| {
                        format!("无法读取默认配置文件 {:?}", default_config_path)
                    })?
                } else {
                    Config::default()
                }
            }
        };

        if let Some(output_path) = self.output_path {
            config.output_path = output_path;
        }

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            config.llm.provider = provider_str.parse::<LLMProvider>().map_err(|e| anyhow!(e))?;
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model_efficient) = self.model_efficient {
            config.llm.model_efficient = model_efficient;
        }
        if let Some(model_powerful) = self.model_powerful {
            config.llm.model_powerful = model_powerful;
        }

        if let Some(database_url) = self.database_url {
            config.database.url = database_url;
        }

        // 检索配置
        if let Some(source_str) = self.search_source {
            config.search.source = source_str.parse::<SearchSource>().map_err(|e| anyhow!(e))?;
        }
        if let Some(number_queries) = self.number_queries {
            config.search.number_queries = number_queries;
        }
        if let Some(max_results) = self.max_results {
            config.search.max_results = max_results;
        }

        // 目标语言配置
        if let Some(target_language_str) = self.target_language {
            if let Ok(target_language) = target_language_str.parse::<TargetLanguage>() {
                config.target_language = target_language;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的目标语言: {}，使用默认语言 (English)",
                    target_language_str
                );
            }
        }

        // 开关类参数只在命令行显式给出时覆盖配置文件
        if self.in_memory_store {
            config.in_memory_store = true;
        }
        if self.skip_connection_check {
            config.skip_connection_check = true;
        }
        if self.verbose {
            config.verbose = true;
        }

        Ok(config)
    }
}

// Include tests
#[cfg(test)]
mod tests;
