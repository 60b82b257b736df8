// crates/mr_rom/src/lib.rs

//! MariROM 降阶模型核心层
//!
//! 将 Navier-Stokes 方程投影到 POD 基底得到的小型 ODE 系统的时间积分引擎：
//!
//! ```text
//! dx/dt = A·x + xᵀN x + m
//! ```
//!
//! 其中 `A` 为常值线性算子，`N` 为三阶非线性张量（以 r 个 r×r 矩阵表示），
//! `m` 为平均流贡献向量。截断到 r 个模态引入的能量损失由可插拔的
//! 滤波/稳定化模型补偿。
//!
//! # 模块概览
//!
//! - [`operators`]: 常值（仿射）降阶算子的装配
//! - [`filter`]: 滤波/稳定化策略族（枚举分发）
//! - [`integrator`]: 显式 Runge-Kutta 时间积分器与右端项求值
//! - [`factory`]: 按滤波模型选择降阶算子形式并构建积分器
//! - [`engine`]: 时间循环编排器
//!
//! # 控制流
//!
//! ```text
//! operators::assemble_reduced_operators
//!     → factory::build_rom (输出名 + 积分器 + 滤波器)
//!         → engine::RomEngine 驱动 step() 循环，
//!           按输出间隔做逆滤波并记录轨迹
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod factory;
pub mod filter;
pub mod integrator;
pub mod operators;

pub use engine::{RomEngine, RomTrajectory, SnapshotSink};
pub use factory::{build_rom, RomBuild};
pub use filter::RomFilter;
pub use integrator::{
    ForwardEuler, ReducedRhs, RhsComputer, RungeKutta4, TimeIntegrator, TimeIntegratorEnum,
};
pub use operators::{assemble_reduced_operators, PodProjections, ReducedOperators};
