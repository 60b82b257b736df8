// apps/mr_cli/src/main.rs

//! MariROM 命令行界面
//!
//! 驱动降阶模型时间积分的命令行工具：加载上游基底阶段的投影产物，
//! 按配置构建滤波/积分装置，推进时间循环并落盘轨迹。

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// MariROM 降阶模型命令行工具
#[derive(Parser)]
#[command(name = "mr_cli")]
#[command(author = "MariROM Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MariROM reduced-order model integrator", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行降阶模型积分
    Run(commands::run::RunArgs),
    /// 把全阶快照投影为降阶系数
    Project(commands::project::ProjectArgs),
    /// 验证配置
    Validate(commands::validate::ValidateArgs),
    /// 显示信息
    Info(commands::info::InfoArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // 执行命令
    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Project(args) => commands::project::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Info(args) => commands::info::execute(args),
    }
}
