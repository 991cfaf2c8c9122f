use crate::config::Config;
use crate::error::ResearchError;
use crate::generator::context::{ResearchContext, ResearchServices};
use crate::generator::orchestrator::ResearchOrchestrator;
use crate::generator::outlet;
use crate::generator::state::ResearchState;
use crate::llm::client::LLMClient;

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: HashMap<String, Instant>,
    /// 按首次出现顺序记录，同一阶段多次执行时累加
    phase_durations: Vec<(String, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: HashMap::new(),
            phase_durations: Vec::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &str) {
        self.phase_start_times
            .insert(phase_name.to_string(), Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &str) -> Option<Duration> {
        let duration = self.phase_start_times.remove(phase_name)?.elapsed();
        match self
            .phase_durations
            .iter_mut()
            .find(|(name, _)| name == phase_name)
        {
            Some((_, total)) => *total += duration,
            None => self
                .phase_durations
                .push((phase_name.to_string(), duration)),
        }
        Some(duration)
    }

    /// 获取总执行时间
    pub fn get_total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 获取某个阶段的累计执行时间
    pub fn get_phase_duration(&self, phase_name: &str) -> Option<Duration> {
        self.phase_durations
            .iter()
            .find(|(name, _)| name == phase_name)
            .map(|(_, duration)| *duration)
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.get_total_duration().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for (phase, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}秒\n", phase, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// 时间跟踪常量
pub struct TimingKeys;

impl TimingKeys {
    pub const RESEARCH: &'static str = "research";
    pub const OUTPUT: &'static str = "output";
}

/// 启动调研工作流
pub async fn launch(config: &Config, topic: &str) -> Result<ResearchState> {
    config.validate()?;

    let llm_client = LLMClient::new(&config.llm)?;
    // 启动时检查模型连接
    if !config.skip_connection_check {
        llm_client.check_connection().await?;
    }

    let services = ResearchServices::from_config(config, Arc::new(llm_client))?;
    let context = ResearchContext::new(config.clone(), services)?;
    execute(&context, topic).await
}

/// 在给定上下文中执行调研并保存结果
pub async fn execute(context: &ResearchContext, topic: &str) -> Result<ResearchState> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(ResearchError::config("research topic must not be empty").into());
    }

    let mut timing = TimingScope::new();
    context
        .services
        .store
        .init()
        .await
        .map_err(|e| e.in_stage("store_init"))?;

    timing.start_phase(TimingKeys::RESEARCH);
    let orchestrator = ResearchOrchestrator::new(context.config.max_research_loops);
    let state = orchestrator
        .run(context, ResearchState::new(topic), &mut timing)
        .await?;
    timing.end_phase(TimingKeys::RESEARCH);

    timing.start_phase(TimingKeys::OUTPUT);
    outlet::save(context, &state).await?;
    timing.end_phase(TimingKeys::OUTPUT);

    tracing::info!("{}", timing.generate_timing_report());
    Ok(state)
}
