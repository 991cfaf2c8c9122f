use async_trait::async_trait;
use md5::{Digest, Md5};

use crate::error::{ResearchError, Result};
use crate::generator::context::ResearchContext;
use crate::generator::stages::ResearchStage;
use crate::generator::state::ResearchState;
use crate::store::Document;

/// 切片标识，同一论文重复处理时覆盖而非新增
pub fn chunk_id(url: &str, index: usize) -> String {
    let digest = Md5::digest(format!("{url}#{index}").as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// 下载全文、切片、向量化后写入文档存储
#[derive(Default)]
pub struct KnowledgeSynthesizer;

impl KnowledgeSynthesizer {
    /// 把单篇论文处理为待写入的文档，下载、解析或向量化失败时返回None
    async fn prepare_documents(&self, context: &ResearchContext, url: &str) -> Option<Vec<Document>> {
        let services = &context.services;

        let bytes = match services.fetcher.fetch(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("failed to download {}: {:#}", url, e);
                return None;
            }
        };
        let text = match services.extractor.extract(bytes).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("failed to extract text from {}: {:#}", url, e);
                return None;
            }
        };

        let chunks = context.splitter.split_text(&text);
        if chunks.is_empty() {
            tracing::info!("{} contains no text, skipped", url);
            return None;
        }

        let embeddings = match services.embedder.embed(&chunks).await {
            Ok(vectors) if vectors.len() == chunks.len() => vectors,
            Ok(vectors) => {
                let err = ResearchError::embedding(format!(
                    "{} vectors returned for {} chunks",
                    vectors.len(),
                    chunks.len()
                ));
                tracing::warn!("failed to embed {}: {}", url, err);
                return None;
            }
            Err(e) => {
                tracing::warn!("failed to embed {}: {}", url, ResearchError::embedding(e));
                return None;
            }
        };

        Some(
            chunks
                .into_iter()
                .zip(embeddings)
                .enumerate()
                .map(|(index, (chunk, embedding))| {
                    Document::with_id(chunk_id(url, index), chunk, embedding)
                })
                .collect(),
        )
    }
}

#[async_trait]
impl ResearchStage for KnowledgeSynthesizer {
    fn name(&self) -> &'static str {
        "knowledge_synthesizer"
    }

    async fn execute(
        &self,
        context: &ResearchContext,
        state: ResearchState,
    ) -> Result<ResearchState> {
        for url in &state.full_text_urls {
            let Some(documents) = self.prepare_documents(context, url).await else {
                continue;
            };
            let written = context.services.store.upsert(&documents).await?;
            println!("   📄 {} -> {} 个切片已入库", url, written);
        }
        Ok(state)
    }
}
