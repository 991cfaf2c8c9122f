use async_trait::async_trait;

use crate::error::Result;
use crate::generator::context::ResearchContext;
use crate::generator::stages::ResearchStage;
use crate::generator::state::ResearchState;

/// 依次执行待检索的查询并累积摘要
#[derive(Default)]
pub struct SearchExecutor;

#[async_trait]
impl ResearchStage for SearchExecutor {
    fn name(&self) -> &'static str {
        "search_executor"
    }

    async fn execute(
        &self,
        context: &ResearchContext,
        mut state: ResearchState,
    ) -> Result<ResearchState> {
        let backend = &context.services.search;
        for query in &state.search_queries {
            match backend.search(query).await {
                Ok(response) => {
                    let texts = response.into_texts();
                    tracing::debug!("{} returned {} results for {:?}", backend.name(), texts.len(), query);
                    state.abstracts.extend(texts);
                }
                Err(e) => {
                    tracing::warn!("{} search failed for {:?}, skipped: {:#}", backend.name(), query, e);
                }
            }
        }
        println!("   📚 已累计 {} 篇文献摘要", state.abstracts.len());
        Ok(state)
    }
}
