// apps/mr_cli/src/commands/project.rs

//! 快照投影命令
//!
//! 把全阶 DNS 快照投影为降阶系数矩阵，产物可直接作为降阶模型
//! 轨迹的参考解或初始条件来源。

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use mr_io::{
    list_artifacts, load_pod_basis, project_snapshots, save_matrix, BlockVector,
};

/// 投影参数
#[derive(Args)]
pub struct ProjectArgs {
    /// POD 基底与快照所在目录
    #[arg(short, long, default_value = "rom-data")]
    pub data_dir: PathBuf,

    /// 全阶快照文件前缀
    #[arg(long, default_value = "snapshot")]
    pub snapshot_prefix: String,

    /// 输出系数矩阵文件
    #[arg(short, long, default_value = "projected-coefficients.mrmx")]
    pub output: PathBuf,
}

/// 执行投影命令
pub fn execute(args: ProjectArgs) -> Result<()> {
    info!("=== MariROM 快照投影 ===");

    let basis = load_pod_basis(&args.data_dir)
        .with_context(|| format!("加载 POD 基底失败: {}", args.data_dir.display()))?;

    // 各分量块的全阶质量矩阵, 按文件名序与块序对应
    let mass_paths = list_artifacts(&args.data_dir, "mass-block", ".mrmx")
        .context("列举质量矩阵块失败")?;
    anyhow::ensure!(
        !mass_paths.is_empty(),
        "{} 下没有 mass-block-*.mrmx",
        args.data_dir.display()
    );
    let mut mass_blocks = Vec::with_capacity(mass_paths.len());
    for path in &mass_paths {
        mass_blocks.push(
            mr_io::load_matrix(path)
                .with_context(|| format!("加载质量矩阵块失败: {}", path.display()))?,
        );
    }

    let snapshot_paths = list_artifacts(&args.data_dir, &args.snapshot_prefix, ".mrbv")
        .context("列举快照失败")?;
    anyhow::ensure!(
        !snapshot_paths.is_empty(),
        "{} 下没有 {}*.mrbv",
        args.data_dir.display(),
        args.snapshot_prefix
    );
    let mut snapshots = Vec::with_capacity(snapshot_paths.len());
    for path in &snapshot_paths {
        snapshots.push(
            BlockVector::load(path)
                .with_context(|| format!("加载快照失败: {}", path.display()))?,
        );
    }

    info!(
        "基底: {} 模态, 快照: {} 个",
        basis.n_modes(),
        snapshots.len()
    );

    let coefficients =
        project_snapshots(&mass_blocks, &basis, &snapshots).context("投影失败")?;
    save_matrix(&args.output, &coefficients).context("系数矩阵落盘失败")?;

    info!("=== 投影完成 ===");
    info!("系数矩阵: {} ({} × {})", args.output.display(), coefficients.nrows(), coefficients.ncols());
    Ok(())
}
