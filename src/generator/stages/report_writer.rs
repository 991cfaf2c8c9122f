use async_trait::async_trait;

use crate::error::{ResearchError, Result};
use crate::generator::context::ResearchContext;
use crate::generator::prompts::report_prompt;
use crate::generator::stages::ResearchStage;
use crate::generator::state::ResearchState;
use crate::llm::client::{ChatMessage, CompletionRequest};

/// 读取全部入库内容并撰写最终报告
#[derive(Default)]
pub struct ReportWriter;

#[async_trait]
impl ResearchStage for ReportWriter {
    fn name(&self) -> &'static str {
        "report_writer"
    }

    async fn execute(
        &self,
        context: &ResearchContext,
        state: ResearchState,
    ) -> Result<ResearchState> {
        let documents = context.services.store.all().await?;
        tracing::info!("writing report from {} stored chunks", documents.len());
        let literature = documents
            .iter()
            .map(|doc| doc.content.as_str())
            .collect::<Vec<_>>()
            .join("\n---\n");

        let prompt = report_prompt(
            &state.topic,
            &literature,
            &context.current_date,
            &context.config.target_language,
        );
        let (model, fallback) = context.select_models(false, &prompt.system, &prompt.user);
        let request = CompletionRequest::new(
            model,
            vec![ChatMessage::system(prompt.system), ChatMessage::user(prompt.user)],
        )
        .with_fallback(fallback);

        let report = context
            .services
            .llm
            .complete(request)
            .await
            .map_err(ResearchError::llm)?;

        Ok(ResearchState {
            report: Some(report.trim().to_string()),
            ..state
        })
    }
}
