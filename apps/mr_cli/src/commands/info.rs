// apps/mr_cli/src/commands/info.rs

//! 信息显示命令
//!
//! 显示版本、可用滤波模型和默认配置。

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use mr_config::{FilterModel, RomConfig};

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 以 JSON 输出默认配置（可直接存为配置文件模板）
    #[arg(long)]
    pub defaults: bool,

    /// 检视一个矩阵产物（维度与范数）
    #[arg(long)]
    pub matrix: Option<PathBuf>,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    if args.defaults {
        let config = RomConfig::default();
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Some(path) = &args.matrix {
        let matrix = mr_io::load_matrix(path)
            .with_context(|| format!("加载矩阵失败: {}", path.display()))?;
        println!("文件: {}", path.display());
        println!("维度: {} × {}", matrix.nrows(), matrix.ncols());
        println!("Frobenius 范数: {:.6e}", matrix.norm());
        println!(
            "最大绝对值: {:.6e}",
            matrix.iter().fold(0.0f64, |m, v| m.max(v.abs()))
        );
        return Ok(());
    }

    println!("=== MariROM 信息 ===");
    println!("版本: {}", env!("CARGO_PKG_VERSION"));

    println!("\n可用滤波模型:");
    for model in [
        FilterModel::Identity,
        FilterModel::L2Projection,
        FilterModel::Differential,
        FilterModel::PostL2ProjectionFilter,
        FilterModel::PostDifferentialFilter,
        FilterModel::LerayHybrid,
        FilterModel::ADLavrentiev,
        FilterModel::ADTikhonov,
    ] {
        let mut notes = Vec::new();
        if model.uses_filter_radius() {
            notes.push("filter_radius");
        }
        if model.uses_cutoff() {
            notes.push("cutoff_n");
        }
        if model.is_deconvolution() {
            notes.push("noise_multiplier");
        }
        if notes.is_empty() {
            println!("  - {model}");
        } else {
            println!("  - {model} (参数: {})", notes.join(", "));
        }
    }

    println!("\n默认配置见: mr_cli info --defaults");
    Ok(())
}
