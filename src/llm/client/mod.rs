//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;

use crate::config::LLMConfig;

mod providers;
pub mod types;
pub mod utils;

pub use providers::ProviderClient;
pub use types::{ChatMessage, CompletionRequest, Role, TokenUsage};

use utils::estimate_token_usage;

/// 补全服务接口，调研各阶段只依赖该接口
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// 将JSON Schema要求附加到system prompt
pub fn with_schema_instruction(system_prompt: &str, schema: &serde_json::Value) -> String {
    let schema_text =
        serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "{}\n\nRespond with a single JSON object that strictly conforms to the following JSON Schema. \
         Output only the JSON object, without any commentary.\n```json\n{}\n```",
        system_prompt, schema_text
    )
}

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    client: ProviderClient,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let client = ProviderClient::new(&config.provider, &config.api_key, &config.api_base_url)?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<()> {
        println!("🔄 正在检查模型连接...");
        // 使用一个简单的prompt来测试连接
        match self
            .prompt_once(
                &self.config.model_efficient,
                "System: You are a helpful assistant.",
                "Hello",
            )
            .await
        {
            Ok(_) => {
                println!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ 模型连接失败: {}", e);
                Err(e)
            }
        }
    }

    /// 通用重试逻辑，用于处理异步操作的重试机制
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let max_retries = self.config.retry_attempts.max(1);
        let retry_delay_ms = self.config.retry_delay_ms;
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    eprintln!(
                        "❌ 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                        retries, max_retries, err
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(retry_delay_ms)).await;
                }
            }
        }
    }

    async fn prompt_once(&self, model: &str, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let agent = self.client.create_agent(model, system_prompt, &self.config)?;
        let timeout = std::time::Duration::from_secs(self.config.timeout_seconds);
        self.retry_with_backoff(|| async {
            tokio::time::timeout(timeout, agent.prompt(user_prompt))
                .await
                .map_err(|_| anyhow::anyhow!("model call timed out after {:?}", timeout))?
        })
        .await
    }

    /// 主模型重试仍失败时切换到备选模型
    async fn complete_inner(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: String,
        fallback_model: Option<String>,
    ) -> Result<String> {
        let err = match self.prompt_once(&model, system_prompt, user_prompt).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };
        let Some(fallback) = fallback_model else {
            eprintln!(
                "❌ 调用模型服务出错，尝试 {} 次均失败...{}",
                self.config.retry_attempts, err
            );
            return Err(err);
        };

        eprintln!(
            "❌ 调用模型服务出错，尝试 {} 次均失败，尝试使用备选模型{}...{}",
            self.config.retry_attempts, fallback, err
        );
        self.prompt_once(&fallback, system_prompt, user_prompt).await
    }
}

#[async_trait]
impl CompletionBackend for LLMClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let mut system_prompt = request.system_prompt();
        if let Some(schema) = &request.response_schema {
            system_prompt = with_schema_instruction(&system_prompt, schema);
        }
        let user_prompt = request.user_prompt();

        let usage = estimate_token_usage(&format!("{}{}", system_prompt, user_prompt), "");
        tracing::debug!(
            "calling model {} with ~{} input tokens",
            request.model,
            usage.input_tokens
        );

        let response = self
            .complete_inner(
                &system_prompt,
                &user_prompt,
                request.model.clone(),
                request.fallback_model.clone(),
            )
            .await?;

        let usage = estimate_token_usage("", &response);
        tracing::debug!("model {} answered with ~{} tokens", request.model, usage.output_tokens);
        Ok(response)
    }
}
