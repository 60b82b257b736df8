// apps/mr_cli/src/commands/run.rs

//! 运行降阶模型积分命令
//!
//! 从数据目录加载降阶矩阵集合与初始条件，按配置构建
//! (输出标识, 积分器, 滤波器)，推进时间循环并落盘轨迹。

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use mr_config::{FilterModel, RomConfig};
use mr_io::{load_initial_condition, load_pod_basis, load_projections, save_trajectory,
    PodSnapshotWriter};
use mr_rom::{assemble_reduced_operators, build_rom, RomEngine};

/// 运行参数
#[derive(Args)]
pub struct RunArgs {
    /// 配置文件路径 (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 降阶矩阵与初始条件所在目录
    #[arg(short, long, default_value = "rom-data")]
    pub data_dir: PathBuf,

    /// 输出目录（覆盖配置文件）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 滤波模型（覆盖配置文件）
    #[arg(long)]
    pub filter_model: Option<FilterModel>,

    /// 终止时间（覆盖配置文件）
    #[arg(short = 't', long)]
    pub final_time: Option<f64>,

    /// 时间步长（覆盖配置文件）
    #[arg(long)]
    pub dt: Option<f64>,
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== MariROM 积分启动 ===");

    let mut config = match &args.config {
        Some(path) => RomConfig::from_file(path)
            .with_context(|| format!("加载配置失败: {}", path.display()))?,
        None => RomConfig::default(),
    };
    if let Some(model) = args.filter_model {
        config.filtering.filter_model = model;
    }
    if let Some(final_time) = args.final_time {
        config.time.final_time = final_time;
    }
    if let Some(dt) = args.dt {
        config.time.time_step = dt;
    }
    if let Some(output) = &args.output {
        config.output.directory = output.clone();
    }
    config.validate().context("配置无效")?;

    info!(
        "滤波模型: {}, Re={}, t∈[{}, {}], dt={}",
        config.filtering.filter_model,
        config.dns.reynolds_n,
        config.time.initial_time,
        config.time.final_time,
        config.time.time_step
    );

    // 加载降阶矩阵集合与初始条件
    let projections = load_projections(&args.data_dir)
        .with_context(|| format!("加载降阶矩阵失败: {}", args.data_dir.display()))?;
    let initial = load_initial_condition(&args.data_dir)
        .with_context(|| format!("加载初始条件失败: {}", args.data_dir.display()))?;

    // 装配 + 工厂 + 引擎
    let operators = assemble_reduced_operators(projections, config.dns.reynolds_n)
        .context("算子装配失败")?;
    let build = build_rom(&operators, &config).context("积分装置构建失败")?;
    let output_name = build.output_name.clone();
    let mut engine = RomEngine::new(build, &config).context("引擎组装失败")?;

    std::fs::create_dir_all(&config.output.directory)?;

    let start = Instant::now();
    let trajectory = if config.output.save_plot_pictures {
        // 快照写出需要基底: 降阶系数提升回全阶分块向量
        let basis = load_pod_basis(&args.data_dir)
            .with_context(|| format!("加载 POD 基底失败: {}", args.data_dir.display()))?;
        let mut sink = PodSnapshotWriter::new(&config.output.directory, &output_name, basis);
        let trajectory = engine
            .run_with_sink(&initial, Some(&mut sink))
            .context("积分失败")?;
        info!("物理空间快照: {} 个", sink.n_written());
        trajectory
    } else {
        engine.run(&initial).context("积分失败")?
    };
    let elapsed = start.elapsed();

    let path = save_trajectory(&config.output.directory, &output_name, &trajectory)
        .context("轨迹落盘失败")?;

    info!("=== 积分完成 ===");
    info!("轨迹行数: {}", trajectory.n_rows());
    info!("计算时间: {:.2} s", elapsed.as_secs_f64());
    info!("输出文件: {}", path.display());

    Ok(())
}
