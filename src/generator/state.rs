use serde::{Deserialize, Serialize};

/// 调研状态，在各阶段之间按值传递
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchState {
    /// 调研主题
    pub topic: String,
    /// 待执行的检索词
    pub search_queries: Vec<String>,
    /// 模型生成检索词时给出的理由
    pub query_rationale: String,
    /// 累积的文献摘要
    pub abstracts: Vec<String>,
    /// 找到的开放获取全文地址
    pub full_text_urls: Vec<String>,
    pub is_sufficient: bool,
    pub knowledge_gap: String,
    /// 已完成的反思轮数
    pub loop_count: usize,
    pub report: Option<String>,
}

impl ResearchState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    /// 摘要按分隔线拼接，供提示词使用
    pub fn joined_abstracts(&self) -> String {
        self.abstracts.join("\n---\n")
    }
}
