//! 文本向量化

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::config::EmbeddingConfig;
use crate::llm::client::ProviderClient;

/// 向量化接口，每条文本返回一个向量，顺序与输入一致
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// 基于rig provider的向量化实现
pub struct ProviderEmbedder {
    client: ProviderClient,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl ProviderEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> Result<Self> {
        let client = ProviderClient::new(&config.provider, api_key, &config.api_base_url)?;
        Ok(Self {
            client,
            model: config.model.clone(),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        })
    }
}

/// 校验服务返回的向量条数与维度
pub fn check_embeddings(
    expected_count: usize,
    dimensions: usize,
    vectors: &[Vec<f32>],
) -> Result<()> {
    if vectors.len() != expected_count {
        return Err(anyhow!(
            "embedding service returned {} vectors for {} texts",
            vectors.len(),
            expected_count
        ));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
        return Err(anyhow!(
            "embedding service returned a {}-dimensional vector, expected {}",
            bad.len(),
            dimensions
        ));
    }
    Ok(())
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embedded = self
                .client
                .embed_texts(&self.model, self.dimensions, batch.to_vec())
                .await?;
            check_embeddings(batch.len(), self.dimensions, &embedded)?;
            vectors.extend(embedded);
        }
        tracing::debug!("embedded {} texts with {}", texts.len(), self.model);
        Ok(vectors)
    }
}
