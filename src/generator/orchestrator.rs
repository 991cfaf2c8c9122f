use crate::error::Result;
use crate::generator::context::ResearchContext;
use crate::generator::stages::{
    KnowledgeSynthesizer, QueryWriter, ReflectionEvaluator, ReportWriter, ResearchStage,
    ResourceResolver, SearchExecutor,
};
use crate::generator::state::ResearchState;
use crate::generator::workflow::TimingScope;

/// 反思轮数上限
pub const MAX_LOOPS: usize = 3;

/// 检索-反思循环的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// 仍需按后续检索词继续检索
    Searching,
    /// 进入全文获取与报告撰写
    Done,
}

/// 根据反思结果决定是否继续检索
pub fn decide(state: &ResearchState, max_loops: usize) -> LoopState {
    if state.is_sufficient || state.loop_count >= max_loops || state.search_queries.is_empty() {
        LoopState::Done
    } else {
        LoopState::Searching
    }
}

/// 调研流程编排器
pub struct ResearchOrchestrator {
    max_loops: usize,
}

impl Default for ResearchOrchestrator {
    fn default() -> Self {
        Self::new(MAX_LOOPS)
    }
}

impl ResearchOrchestrator {
    pub fn new(max_loops: usize) -> Self {
        Self {
            max_loops: max_loops.max(1),
        }
    }

    /// 执行完整的调研流程
    pub async fn run(
        &self,
        context: &ResearchContext,
        state: ResearchState,
        timing: &mut TimingScope,
    ) -> Result<ResearchState> {
        println!("🚀 开始执行调研流程: {}", state.topic);

        let mut state = self.execute_stage(&QueryWriter, context, state, timing).await?;

        loop {
            state = self.execute_stage(&SearchExecutor, context, state, timing).await?;
            state = self.execute_stage(&ReflectionEvaluator, context, state, timing).await?;
            match decide(&state, self.max_loops) {
                LoopState::Searching => {
                    println!(
                        "🔁 知识缺口: {}，开始第 {} 轮补充检索",
                        state.knowledge_gap,
                        state.loop_count + 1
                    );
                }
                LoopState::Done => break,
            }
        }
        if !state.is_sufficient {
            tracing::info!(
                "leaving research loop after {} reflections without sufficiency",
                state.loop_count
            );
        }

        let state = self.execute_stage(&ResourceResolver, context, state, timing).await?;
        let state = self.execute_stage(&KnowledgeSynthesizer, context, state, timing).await?;
        let state = self.execute_stage(&ReportWriter, context, state, timing).await?;

        println!("✓ 调研流程执行完毕");
        Ok(state)
    }

    /// 执行单个阶段，失败时标注阶段名称
    async fn execute_stage<S>(
        &self,
        stage: &S,
        context: &ResearchContext,
        state: ResearchState,
        timing: &mut TimingScope,
    ) -> Result<ResearchState>
    where
        S: ResearchStage,
    {
        println!("🤖 执行 {} 阶段...", stage.name());
        timing.start_phase(stage.name());

        let result = stage.execute(context, state).await;
        timing.end_phase(stage.name());

        let state = result.map_err(|e| e.in_stage(stage.name()))?;
        println!("✓ {} 阶段完成", stage.name());
        Ok(state)
    }
}
