//! 调研流程的错误类型

use std::fmt::Display;

/// 调研流程错误
///
/// 单条检索、单个DOI、单篇论文的失败由各阶段自行吞掉并记录日志，
/// 只有会导致整个阶段失败的错误才会以该类型向上传播。
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    /// 启动前的配置缺失或非法
    #[error("configuration error: {0}")]
    Config(String),

    /// 模型返回的结构化输出不符合约定的Schema
    #[error("structured output does not match schema `{schema}`: {detail}")]
    SchemaValidation {
        schema: &'static str,
        detail: String,
    },

    /// 文档存储读写失败（写入批次已整体回滚）
    #[error("document store error: {0}")]
    Storage(String),

    /// LLM服务调用失败
    #[error("language model error: {0}")]
    Llm(String),

    /// 向量化服务调用失败
    #[error("embedding error: {0}")]
    Embedding(String),

    /// 某个阶段执行失败
    #[error("stage `{stage}` failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<ResearchError>,
    },
}

impl ResearchError {
    pub fn config(detail: impl Display) -> Self {
        Self::Config(detail.to_string())
    }

    pub fn storage(err: impl Display) -> Self {
        Self::Storage(format!("{err:#}"))
    }

    pub fn llm(err: impl Display) -> Self {
        Self::Llm(format!("{err:#}"))
    }

    pub fn embedding(err: impl Display) -> Self {
        Self::Embedding(format!("{err:#}"))
    }

    /// 为错误标注失败的阶段名称
    pub fn in_stage(self, stage: &'static str) -> Self {
        match self {
            already @ Self::Stage { .. } => already,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// 返回失败阶段的名称（如有）
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Self::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// 剥离阶段包装后的原始错误
    pub fn root(&self) -> &ResearchError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T, E = ResearchError> = std::result::Result<T, E>;
