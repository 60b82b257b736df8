// crates/mr_io/src/lib.rs

//! MariROM IO 层
//!
//! 降阶模型产物的二进制格式与目录约定：
//!
//! - [`matrix`]: 稠密矩阵格式 (MRMX, 含 CRC32 与原子写入)
//! - [`pod`]: 分块向量格式 (MRBV)、POD 基底与降阶矩阵集合的加载、
//!   快照投影
//! - [`snapshot`]: 轨迹落盘与物理空间快照写出
//! - [`compare`]: 带容差的产物比较
//!
//! 所有写入都走临时文件 + 原子重命名，所有读取都验证 CRC32。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compare;
pub mod error;
pub mod matrix;
pub mod pod;
pub mod snapshot;

pub use compare::{block_vectors_equal, matrices_equal, vectors_equal};
pub use error::{IoError, IoResult};
pub use matrix::{load_matrix, save_matrix};
pub use pod::{
    list_artifacts, load_initial_condition, load_pod_basis, load_projections, project_snapshots,
    BlockVector, PodBasis,
};
pub use snapshot::{load_trajectory, save_trajectory, PodSnapshotWriter};
