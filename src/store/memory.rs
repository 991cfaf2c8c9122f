//! 进程内向量存储，语义与pgvector实现一致，用于测试与离线运行

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    Document, DocumentStore, EMBEDDING_DIMENSIONS, ScoredDocument, cosine_distance,
    ensure_dimensions,
};
use crate::error::Result;

/// 进程内存储，Vec中的顺序即写入顺序
pub struct InMemoryStore {
    dimensions: usize,
    rows: RwLock<Vec<Document>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_dimensions(EMBEDDING_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            rows: RwLock::new(Vec::new()),
        }
    }
}

/// 将距离量化到1e-9，避免浮点噪声打乱并列结果的顺序
fn distance_key(distance: f64) -> i64 {
    (distance * 1e9).round() as i64
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, documents: &[Document]) -> Result<usize> {
        // 先整体校验，任何一条不合法则整批不写入
        for document in documents {
            ensure_dimensions(&document.embedding, self.dimensions)?;
        }

        let mut rows = self.rows.write().await;
        for document in documents {
            match rows.iter_mut().find(|row| row.id == document.id) {
                Some(existing) => *existing = document.clone(),
                None => rows.push(document.clone()),
            }
        }
        Ok(documents.len())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredDocument>> {
        ensure_dimensions(embedding, self.dimensions)?;

        let rows = self.rows.read().await;
        let mut scored: Vec<ScoredDocument> = rows
            .iter()
            .map(|row| ScoredDocument {
                distance: cosine_distance(embedding, &row.embedding),
                document: row.clone(),
            })
            .collect();
        // 稳定排序，距离相同的保持写入顺序
        scored.sort_by_key(|s| distance_key(s.distance));
        scored.truncate(k);
        Ok(scored)
    }

    async fn all(&self) -> Result<Vec<Document>> {
        Ok(self.rows.read().await.clone())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.rows.read().await.len())
    }

    async fn clear(&self) -> Result<()> {
        self.rows.write().await.clear();
        Ok(())
    }
}
