use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::{ResearchError, Result};
use crate::generator::context::ResearchContext;
use crate::generator::prompts::query_writer_prompt;
use crate::generator::stages::ResearchStage;
use crate::generator::state::ResearchState;
use crate::llm::structured::{SearchQueryList, StructuredOutput, request_structured};

/// 根据调研主题生成初始检索词
#[derive(Default)]
pub struct QueryWriter;

#[async_trait]
impl ResearchStage for QueryWriter {
    fn name(&self) -> &'static str {
        "query_writer"
    }

    async fn execute(
        &self,
        context: &ResearchContext,
        state: ResearchState,
    ) -> Result<ResearchState> {
        let prompt = query_writer_prompt(
            &state.topic,
            context.config.search.number_queries,
            &context.current_date,
        );
        let (model, fallback) = context.select_models(false, &prompt.system, &prompt.user);
        let generated: SearchQueryList = request_structured(
            context.services.llm.as_ref(),
            model,
            fallback,
            prompt.system,
            prompt.user,
        )
        .await?;

        let queries = dedup_queries(generated.query);
        if queries.is_empty() {
            return Err(ResearchError::SchemaValidation {
                schema: SearchQueryList::NAME,
                detail: "the model returned no usable search query".to_string(),
            });
        }
        tracing::info!("generated {} search queries: {:?}", queries.len(), queries);

        Ok(ResearchState {
            search_queries: queries,
            query_rationale: generated.rationale,
            abstracts: Vec::new(),
            loop_count: 0,
            ..state
        })
    }
}

/// 去掉空白与重复的检索词（忽略大小写），保留首次出现的顺序
pub fn dedup_queries(queries: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    queries
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty() && seen.insert(q.to_lowercase()))
        .collect()
}
