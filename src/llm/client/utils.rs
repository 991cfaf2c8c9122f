use crate::{
    config::LLMConfig, llm::client::types::TokenUsage, utils::token_estimator::TokenEstimator,
};

use std::sync::LazyLock;

static TOKEN_ESTIMATOR: LazyLock<TokenEstimator> = LazyLock::new(TokenEstimator::new);

/// 超过该长度的prompt直接交给powerful模型
const OVERSIZE_PROMPT_BYTES: usize = 32 * 1024;

/// 选择主模型与备选模型
///
/// 常规任务使用efficient模型并以powerful兜底；复杂任务或超长prompt直接使用powerful模型。
pub fn evaluate_befitting_model(
    llm_config: &LLMConfig,
    prefer_powerful: bool,
    system_prompt: &str,
    user_prompt: &str,
) -> (String, Option<String>) {
    if !prefer_powerful && system_prompt.len() + user_prompt.len() <= OVERSIZE_PROMPT_BYTES {
        return (
            llm_config.model_efficient.clone(),
            Some(llm_config.model_powerful.clone()).filter(|m| *m != llm_config.model_efficient),
        );
    }
    (llm_config.model_powerful.clone(), None)
}

/// 估算token使用情况（基于文本长度）
pub fn estimate_token_usage(input_text: &str, output_text: &str) -> TokenUsage {
    // 粗略估算：1个token约等于4个字符（英文）或1.5个字符（中文）
    let input_estimate = TOKEN_ESTIMATOR.estimate_tokens(input_text);
    let output_estimate = TOKEN_ESTIMATOR.estimate_tokens(output_text);
    TokenUsage::new(
        input_estimate.estimated_tokens,
        output_estimate.estimated_tokens,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_prompt_uses_efficient_with_fallback() {
        let config = LLMConfig::default();
        let (model, fallback) = evaluate_befitting_model(&config, false, "sys", "user");
        assert_eq!(model, config.model_efficient);
        assert_eq!(fallback, Some(config.model_powerful.clone()));
    }

    #[test]
    fn test_oversize_prompt_escalates() {
        let config = LLMConfig::default();
        let big = "x".repeat(OVERSIZE_PROMPT_BYTES + 1);
        let (model, fallback) = evaluate_befitting_model(&config, false, "sys", &big);
        assert_eq!(model, config.model_powerful);
        assert!(fallback.is_none());
    }

    #[test]
    fn test_prefer_powerful() {
        let config = LLMConfig::default();
        let (model, fallback) = evaluate_befitting_model(&config, true, "sys", "user");
        assert_eq!(model, config.model_powerful);
        assert!(fallback.is_none());
    }

    #[test]
    fn test_same_models_have_no_fallback() {
        let mut config = LLMConfig::default();
        config.model_powerful = config.model_efficient.clone();
        let (_, fallback) = evaluate_befitting_model(&config, false, "sys", "user");
        assert!(fallback.is_none());
    }

    #[test]
    fn test_estimate_token_usage() {
        let usage = estimate_token_usage("hello world", "");
        assert!(usage.input_tokens > 0);
        assert!(usage.total() >= usage.input_tokens);
    }
}
