use async_trait::async_trait;

use crate::error::Result;
use crate::generator::context::ResearchContext;
use crate::generator::prompts::reflection_prompt;
use crate::generator::stages::ResearchStage;
use crate::generator::state::ResearchState;
use crate::llm::structured::{Reflection, request_structured};

/// 评估摘要是否充分，不足时给出后续检索词
#[derive(Default)]
pub struct ReflectionEvaluator;

#[async_trait]
impl ResearchStage for ReflectionEvaluator {
    fn name(&self) -> &'static str {
        "reflection"
    }

    async fn execute(
        &self,
        context: &ResearchContext,
        state: ResearchState,
    ) -> Result<ResearchState> {
        let prompt = reflection_prompt(&state.topic, &state.joined_abstracts(), &context.current_date);
        let (model, fallback) = context.select_models(true, &prompt.system, &prompt.user);
        let reflection: Reflection = request_structured(
            context.services.llm.as_ref(),
            model,
            fallback,
            prompt.system,
            prompt.user,
        )
        .await?;

        let loop_count = state.loop_count + 1;
        if reflection.is_sufficient {
            tracing::info!("reflection #{}: literature is sufficient", loop_count);
            return Ok(ResearchState {
                is_sufficient: true,
                knowledge_gap: String::new(),
                search_queries: Vec::new(),
                loop_count,
                ..state
            });
        }

        tracing::info!(
            "reflection #{}: knowledge gap {:?}, {} follow-up queries",
            loop_count,
            reflection.knowledge_gap,
            reflection.follow_up_queries.len()
        );
        Ok(ResearchState {
            is_sufficient: false,
            knowledge_gap: reflection.knowledge_gap,
            search_queries: reflection.follow_up_queries,
            loop_count,
            ..state
        })
    }
}
