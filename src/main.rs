use anyhow::Result;
use clap::Parser;
use deepresearch_rs::cli::Args;
use deepresearch_rs::launch;
use tracing_subscriber::{EnvFilter, fmt};

/// 初始化日志，RUST_LOG优先，其次按--verbose选择级别
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("deepresearch_rs={default_level}")));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env中的变量需要在读取配置前加载
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let topic = args.topic.clone();
    let config = args.into_config()?;
    init_tracing(config.verbose);

    match launch(&config, &topic).await {
        Ok(state) => {
            println!(
                "🎉 调研完成: {} 篇摘要，{} 篇全文，{} 轮反思",
                state.abstracts.len(),
                state.full_text_urls.len(),
                state.loop_count
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ 调研失败: {:#}", e);
            std::process::exit(1);
        }
    }
}
