//! 文档向量存储 - 保存全文切片及其向量，并按余弦距离检索

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ResearchError, Result};

pub mod memory;
pub mod pgvector;

pub use memory::InMemoryStore;
pub use pgvector::{PgVectorStore, TableName};

/// 全系统统一的向量维度，写入与查询必须一致
pub const EMBEDDING_DIMENSIONS: usize = 1024;

/// 存储的文档切片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

impl Document {
    /// 创建新文档，自动分配UUID作为标识
    pub fn new(content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), content, embedding)
    }

    /// 使用调用方指定的标识创建文档，相同标识的再次写入会覆盖旧内容
    pub fn with_id(id: impl Into<String>, content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            embedding,
        }
    }
}

/// 带余弦距离的检索结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub distance: f64,
}

/// 文档存储接口
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 幂等的初始化（启用向量扩展、建表），首次使用前调用
    async fn init(&self) -> Result<()>;

    /// 按标识插入或更新一批文档，整批原子提交，返回写入条数
    async fn upsert(&self, documents: &[Document]) -> Result<usize>;

    /// 返回与给定向量余弦距离最小的k条文档，距离相同时按写入顺序
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredDocument>>;

    /// 按写入顺序返回全部文档
    async fn all(&self) -> Result<Vec<Document>>;

    async fn count(&self) -> Result<usize>;

    /// 清空存储，仅用于测试收尾
    async fn clear(&self) -> Result<()>;
}

/// 校验向量维度
pub fn ensure_dimensions(embedding: &[f32], expected: usize) -> Result<()> {
    if embedding.len() != expected {
        return Err(ResearchError::Storage(format!(
            "embedding has {} dimensions, store expects {}",
            embedding.len(),
            expected
        )));
    }
    Ok(())
}

/// 余弦距离（1 - 余弦相似度），零向量视为与任何向量正交
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}
