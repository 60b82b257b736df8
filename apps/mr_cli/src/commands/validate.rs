// apps/mr_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 解析并验证配置文件，报告激活模型实际使用的参数。

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use mr_config::RomConfig;

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径 (JSON)
    #[arg(short, long)]
    pub config: PathBuf,
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    let config = RomConfig::from_file(&args.config)
        .with_context(|| format!("配置无效: {}", args.config.display()))?;

    info!("配置有效: {}", args.config.display());

    let model = config.filtering.filter_model;
    println!("滤波模型: {model}");
    println!("积分格式: {}", config.time.scheme);
    println!(
        "时间窗口: [{}, {}], dt = {}",
        config.time.initial_time, config.time.final_time, config.time.time_step
    );
    println!("雷诺数: {}", config.dns.reynolds_n);
    println!("输出间隔: 每 {} 步", config.output.output_interval);

    if model.uses_filter_radius() {
        println!("滤波半径: {}", config.filtering.filter_radius);
    }
    if model.uses_cutoff() {
        println!("截断模态数: {}", config.filtering.cutoff_n);
    }
    if model.is_deconvolution() {
        println!("噪声系数: {}", config.filtering.noise_multiplier);
        println!("噪声种子: {}", config.filtering.noise_seed);
    }

    Ok(())
}
