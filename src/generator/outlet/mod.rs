use crate::generator::context::ResearchContext;
use crate::generator::state::ResearchState;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// 调研状态快照的文件名
pub const STATE_FILENAME: &str = "research_state.json";

/// 保存调研结果
pub async fn save(context: &ResearchContext, state: &ResearchState) -> Result<()> {
    let outlet = DiskOutlet::new(&context.config.output_path);
    outlet.save(context, state).await
}

pub trait Outlet {
    async fn save(&self, context: &ResearchContext, state: &ResearchState) -> Result<()>;
}

pub struct DiskOutlet {
    output_dir: PathBuf,
}

impl DiskOutlet {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// 报告文件的完整路径
    pub fn report_path(&self, context: &ResearchContext) -> PathBuf {
        self.output_dir
            .join(context.config.target_language.get_report_filename())
    }
}

impl Outlet for DiskOutlet {
    async fn save(&self, context: &ResearchContext, state: &ResearchState) -> Result<()> {
        println!("\n🖊️ 调研结果存储中...");
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("failed to create output directory {}", self.output_dir.display())
        })?;

        match &state.report {
            Some(report) => {
                let report_path = self.report_path(context);
                fs::write(&report_path, report)
                    .with_context(|| format!("failed to write {}", report_path.display()))?;
                println!("💾 已保存调研报告: {}", report_path.display());
            }
            None => {
                // 报告缺失时仍保留状态快照，便于排查
                eprintln!("⚠️ 警告: 未生成调研报告，主题: {}", state.topic);
            }
        }

        let state_path = self.output_dir.join(STATE_FILENAME);
        let snapshot = serde_json::to_string_pretty(state)?;
        fs::write(&state_path, snapshot)
            .with_context(|| format!("failed to write {}", state_path.display()))?;
        tracing::debug!("research state written to {}", state_path.display());

        println!("💾 调研结果保存完成，输出目录: {}", self.output_dir.display());
        Ok(())
    }
}
