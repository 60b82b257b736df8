// crates/mr_io/src/error.rs

//! IO 错误类型定义
//!
//! 提供 IO 模块的统一错误枚举，支持通过 thiserror 自动转换底层错误。
//! 所有错误最终可转换为 MrError 以实现跨层错误传递。

use mr_foundation::MrError;
use thiserror::Error;

/// IO 模块结果类型别名
pub type IoResult<T> = Result<T, IoError>;

/// IO 错误枚举
#[derive(Error, Debug)]
pub enum IoError {
    /// 底层 IO 错误
    #[error("IO 错误 [{path}]: {source}")]
    Io {
        /// 出错的文件或目录路径
        path: String,
        /// 底层系统错误
        #[source]
        source: std::io::Error,
    },

    /// 文件格式识别失败
    #[error("无法识别文件格式: {path}, 期望魔数 {expected}")]
    UnknownFormat {
        /// 出错的文件路径
        path: String,
        /// 期望的魔数
        expected: &'static str,
    },

    /// 版本不兼容
    #[error("版本不兼容: 文件版本 {file}, 当前版本 {current}")]
    Version {
        /// 文件中记录的格式版本
        file: u32,
        /// 当前实现支持的格式版本
        current: u32,
    },

    /// 校验和错误
    #[error("校验和错误 [{path}]: 期望 {expected:08x}, 实际 {found:08x}")]
    Checksum {
        /// 出错的文件路径
        path: String,
        /// 文件尾部记录的校验和
        expected: u32,
        /// 实际计算得到的校验和
        found: u32,
    },

    /// 文件被截断或结构损坏
    #[error("数据损坏 [{path}]: {reason}")]
    Corrupted {
        /// 出错的文件路径
        path: String,
        /// 损坏原因描述
        reason: String,
    },

    /// 基底文件集合不完整
    #[error("基底不完整: {reason}")]
    IncompleteBasis {
        /// 缺失或不一致的具体描述
        reason: String,
    },

    /// 基础层错误转换
    #[error("基础层错误: {0}")]
    Foundation(#[from] MrError),
}

impl IoError {
    /// 包装带路径的底层 IO 错误
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 构造数据损坏错误
    pub fn corrupted(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<IoError> for MrError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Io { path, source } => MrError::io_with_source(path, source),
            IoError::UnknownFormat { path, expected } => {
                MrError::invalid_input(format!("无法识别文件格式 [{path}]: 期望 {expected}"))
            }
            IoError::Version { file, current } => MrError::invalid_input(format!(
                "版本不兼容: 文件版本 {file}, 当前版本 {current}"
            )),
            IoError::Checksum {
                path,
                expected,
                found,
            } => MrError::internal(format!(
                "校验和错误 [{path}]: 期望 {expected:08x}, 实际 {found:08x}"
            )),
            IoError::Corrupted { path, reason } => {
                MrError::internal(format!("数据损坏 [{path}]: {reason}"))
            }
            IoError::IncompleteBasis { reason } => {
                MrError::invalid_input(format!("基底不完整: {reason}"))
            }
            IoError::Foundation(mr_err) => mr_err,
        }
    }
}
