// crates/mr_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `MrError` 枚举和 `MrResult` 类型别名，用于整个项目的错误处理。
//!
//! # 错误分类
//!
//! 按规约分为四类，均为致命错误，不做自动重试：
//!
//! 1. **配置错误**: 未识别的滤波模型、非法数值范围，在任何计算开始前报告
//! 2. **维度不匹配**: 降阶算子或向量的维度不一致，在装配阶段报告
//! 3. **数值发散**: 积分过程中降阶状态出现非有限值，携带出错步数与时间
//! 4. **IO 错误**: 基底/快照文件读写失败

use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型
pub type MrResult<T> = Result<T, MrError>;

/// MariROM 错误类型
///
/// 核心错误类型，用于整个项目。IO 细节相关的错误在 `mr_io` 中扩展。
#[derive(Error, Debug)]
pub enum MrError {
    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },

    /// 文件不存在
    #[error("文件不存在: {path}")]
    FileNotFound {
        /// 未找到的路径
        path: PathBuf,
    },

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 矩阵/向量维度不匹配
    #[error("维度不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望维度
        expected: usize,
        /// 实际维度
        actual: usize,
    },

    /// 配置错误
    #[error("配置错误: {message}")]
    Config {
        /// 具体错误信息
        message: String,
    },

    /// 数值发散：降阶状态中出现非有限值
    #[error("数值发散: 第{step}步 (t={time}) 降阶状态出现 NaN/Inf")]
    Divergence {
        /// 出错的时间步编号
        step: usize,
        /// 出错的模拟时间
        time: f64,
    },

    /// 滤波算子奇异，无法分解
    #[error("滤波算子奇异: {context}")]
    SingularOperator {
        /// 奇异算子的上下文描述
        context: &'static str,
    },

    /// 资源未找到
    #[error("资源未找到: {resource}")]
    NotFound {
        /// 资源名称
        resource: String,
    },

    /// 内部错误
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl MrError {
    /// 从IO错误创建
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 从IO错误创建（带源）
    pub fn io_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 文件不存在
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 维度不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// 数值发散
    pub fn divergence(step: usize, time: f64) -> Self {
        Self::Divergence { step, time }
    }

    /// 滤波算子奇异
    pub fn singular_operator(context: &'static str) -> Self {
        Self::SingularOperator { context }
    }

    /// 资源未找到
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// 内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl MrError {
    /// 检查维度是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> MrResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查标量是否为正
    #[inline]
    pub fn check_positive(key: &'static str, value: f64) -> MrResult<()> {
        if value <= 0.0 {
            Err(Self::config(format!("{key} 必须为正, 实际 {value}")))
        } else {
            Ok(())
        }
    }

    /// 检查一组值是否全部有限
    #[inline]
    pub fn check_finite<'a>(
        values: impl IntoIterator<Item = &'a f64>,
        step: usize,
        time: f64,
    ) -> MrResult<()> {
        if values.into_iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(Self::divergence(step, time))
        }
    }
}

// ========================================================================
// 标准库错误转换
// ========================================================================

impl From<std::io::Error> for MrError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

// ========================================================================
// 测试
// ========================================================================
