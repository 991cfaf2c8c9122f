use async_trait::async_trait;

use crate::error::Result;
use crate::generator::context::ResearchContext;
use crate::generator::state::ResearchState;

pub mod knowledge_synthesizer;
pub mod query_writer;
pub mod reflection;
pub mod report_writer;
pub mod resource_resolver;
pub mod search_executor;

pub use knowledge_synthesizer::KnowledgeSynthesizer;
pub use query_writer::QueryWriter;
pub use reflection::ReflectionEvaluator;
pub use report_writer::ReportWriter;
pub use resource_resolver::ResourceResolver;
pub use search_executor::SearchExecutor;

/// 调研流程中的一个阶段，接收当前状态并返回下一状态
#[async_trait]
pub trait ResearchStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, context: &ResearchContext, state: ResearchState)
    -> Result<ResearchState>;
}
