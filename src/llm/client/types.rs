use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// 对话消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// 一次补全请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    /// 主模型多次重试仍失败时改用的模型
    pub fallback_model: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// 要求模型按该JSON Schema输出
    pub response_schema: Option<Value>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            fallback_model: None,
            messages,
            response_schema: None,
        }
    }

    pub fn with_fallback(mut self, fallback_model: Option<String>) -> Self {
        self.fallback_model = fallback_model;
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// 合并所有system消息作为preamble
    pub fn system_prompt(&self) -> String {
        self.joined(Role::System)
    }

    /// 合并所有user消息作为本轮输入
    pub fn user_prompt(&self) -> String {
        self.joined(Role::User)
    }

    fn joined(&self, role: Role) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == role)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Token使用情况
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_split_by_role() {
        let request = CompletionRequest::new(
            "model-a",
            vec![
                ChatMessage::system("rules"),
                ChatMessage::user("part one"),
                ChatMessage::system("more rules"),
                ChatMessage::user("part two"),
            ],
        );
        assert_eq!(request.system_prompt(), "rules\n\nmore rules");
        assert_eq!(request.user_prompt(), "part one\n\npart two");
        assert!(request.response_schema.is_none());
        assert!(request.fallback_model.is_none());
    }

    #[test]
    fn test_token_usage_total() {
        assert_eq!(TokenUsage::new(10, 5).total(), 15);
    }
}
