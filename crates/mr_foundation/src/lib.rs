// crates/mr_foundation/src/lib.rs

//! MariROM Foundation Layer
//!
//! 近零依赖基础层，提供整个项目的基础抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `MrError` / `MrResult`
//!
//! # 设计原则
//!
//! 1. **近零外部依赖**: 仅依赖 thiserror
//! 2. **层次化**: 基础层只定义核心错误，降阶模型相关错误在 mr_rom 中扩展
//! 3. **可追溯**: 支持错误链，数值发散错误携带出错的步数与时间

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

pub use error::{MrError, MrResult};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{MrError, MrResult};
    pub use crate::{ensure, require};
}

/// 条件检查宏：条件不满足时提前返回错误
///
/// # 示例
///
/// ```
/// use mr_foundation::{ensure, MrError, MrResult};
///
/// fn check(dt: f64) -> MrResult<()> {
///     ensure!(dt > 0.0, MrError::config("time_step 必须为正"));
///     Ok(())
/// }
///
/// assert!(check(0.01).is_ok());
/// assert!(check(-1.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

/// Option 解包宏：为 None 时提前返回错误
///
/// # 示例
///
/// ```
/// use mr_foundation::{require, MrError, MrResult};
///
/// fn first(values: &[f64]) -> MrResult<f64> {
///     let v = require!(values.first(), MrError::not_found("values"));
///     Ok(*v)
/// }
/// ```
#[macro_export]
macro_rules! require {
    ($opt:expr, $err:expr) => {
        match $opt {
            Some(v) => v,
            None => return Err($err.into()),
        }
    };
}
