// crates/mr_config/src/lib.rs

//! MariROM Config Layer
//!
//! 配置层，提供降阶模型运行的全部配置参数。
//! 本层完全无泛型，所有数值使用 f64 存储以便 JSON 序列化。
//!
//! # 模块概览
//!
//! - [`rom_config`]: RomConfig 降阶模型运行配置（全 f64）
//! - [`filter_model`]: FilterModel 滤波模型枚举
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! Layer 5: mr_cli        ─> uses RomConfig
//! Layer 4: mr_config     ─> RomConfig, FilterModel (本层)
//! Layer 3: mr_rom        ─> 按 FilterModel 构建滤波器与积分器
//! Layer 1: mr_foundation
//! ```
//!
//! # 设计原则
//!
//! 1. **显式传参**: 配置作为不可变值传入每个组件构造函数，不读全局状态，
//!    保证独立参数扫描运行之间互不干扰
//! 2. **先验证后计算**: `validate()` 在任何算子装配开始前报告配置错误

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod filter_model;
pub mod rom_config;

pub use error::ConfigError;
pub use filter_model::{FilterModel, IntegratorScheme};
pub use rom_config::{DnsConfig, FilterConfig, OutputConfig, RomConfig, TimeConfig};
