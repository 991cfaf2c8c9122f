//! 结构化输出 - 通过JSON Schema约束模型输出并严格校验

use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ResearchError, Result};
use crate::llm::client::{ChatMessage, CompletionBackend, CompletionRequest};

/// 生成的学术检索词
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchQueryList {
    /// A list of search queries to be used for academic literature research.
    pub query: Vec<String>,
    /// A brief explanation of why these queries are relevant to the research topic.
    pub rationale: String,
}

/// 对已有摘要的反思结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Reflection {
    /// Whether the provided summaries are sufficient to answer the research topic.
    pub is_sufficient: bool,
    /// A description of what information is missing or needs clarification.
    pub knowledge_gap: String,
    /// A list of follow-up queries to address the knowledge gap.
    pub follow_up_queries: Vec<String>,
}

/// 可由模型结构化输出的类型
pub trait StructuredOutput: DeserializeOwned + JsonSchema {
    const NAME: &'static str;
}

impl StructuredOutput for SearchQueryList {
    const NAME: &'static str = "SearchQueryList";
}

impl StructuredOutput for Reflection {
    const NAME: &'static str = "Reflection";
}

/// 类型对应的JSON Schema
pub fn response_schema<T: StructuredOutput>() -> Value {
    Value::from(schema_for!(T))
}

/// 去掉模型常加的```json代码块包裹
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// 严格解析结构化输出，字段缺失或类型不符都视为错误
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> Result<T> {
    serde_json::from_str(strip_code_fence(raw)).map_err(|e| ResearchError::SchemaValidation {
        schema: T::NAME,
        detail: e.to_string(),
    })
}

/// 发起一次带Schema约束的请求并解析结果
pub async fn request_structured<T: StructuredOutput>(
    backend: &dyn CompletionBackend,
    model: String,
    fallback_model: Option<String>,
    system_prompt: String,
    user_prompt: String,
) -> Result<T> {
    let request = CompletionRequest::new(
        model,
        vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)],
    )
    .with_fallback(fallback_model)
    .with_schema(response_schema::<T>());

    let raw = backend.complete(request).await.map_err(ResearchError::llm)?;
    tracing::debug!("structured {} response: {}", T::NAME, raw);
    parse_structured(&raw)
}
