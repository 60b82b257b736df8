// crates/mr_io/src/snapshot.rs

//! 轨迹落盘与物理空间快照输出
//!
//! 引擎产出的轨迹以两份矩阵文件持久化：系数矩阵
//! `<输出标识>.mrmx` 与记录时刻列向量 `<输出标识>-times.mrmx`。
//!
//! [`PodSnapshotWriter`] 实现引擎的快照回调：把记录时刻的降阶
//! 系数提升回全阶分块向量并写出，供可视化管线消费。

use std::path::{Path, PathBuf};

use nalgebra::DMatrix;
use tracing::info;

use mr_foundation::{MrError, MrResult};
use mr_rom::{RomTrajectory, SnapshotSink};

use crate::error::IoResult;
use crate::matrix::{load_matrix, save_matrix};
use crate::pod::PodBasis;

/// 保存轨迹（系数矩阵 + 记录时刻）
///
/// # 参数
/// - `directory`: 输出目录
/// - `output_name`: 工厂生成的输出标识
pub fn save_trajectory(
    directory: &Path,
    output_name: &str,
    trajectory: &RomTrajectory,
) -> IoResult<PathBuf> {
    let coefficients_path = directory.join(format!("{output_name}.mrmx"));
    save_matrix(&coefficients_path, &trajectory.coefficients)?;

    let times = DMatrix::from_fn(trajectory.times.len(), 1, |i, _| trajectory.times[i]);
    save_matrix(&directory.join(format!("{output_name}-times.mrmx")), &times)?;

    info!(
        path = %coefficients_path.display(),
        n_rows = trajectory.n_rows(),
        "轨迹已保存"
    );
    Ok(coefficients_path)
}

/// 加载轨迹
pub fn load_trajectory(directory: &Path, output_name: &str) -> IoResult<RomTrajectory> {
    let coefficients = load_matrix(&directory.join(format!("{output_name}.mrmx")))?;
    let times_matrix = load_matrix(&directory.join(format!("{output_name}-times.mrmx")))?;
    let times = times_matrix.column(0).iter().copied().collect();
    Ok(RomTrajectory {
        times,
        coefficients,
    })
}

/// 物理空间快照写出器
///
/// 由引擎在快照窗口内回调；每次回调提升一个降阶状态并写出一个
/// `<输出标识>-snapshot-<步数>.mrbv`。
pub struct PodSnapshotWriter {
    directory: PathBuf,
    output_name: String,
    basis: PodBasis,
    n_written: usize,
}

impl PodSnapshotWriter {
    /// 构建快照写出器
    pub fn new(directory: impl Into<PathBuf>, output_name: impl Into<String>, basis: PodBasis) -> Self {
        Self {
            directory: directory.into(),
            output_name: output_name.into(),
            basis,
            n_written: 0,
        }
    }

    /// 已写出的快照数
    pub fn n_written(&self) -> usize {
        self.n_written
    }
}

impl SnapshotSink for PodSnapshotWriter {
    fn save_snapshot(
        &mut self,
        step: usize,
        time: f64,
        state: &nalgebra::DVector<f64>,
    ) -> MrResult<()> {
        let lifted = self.basis.lift(state).map_err(MrError::from)?;
        let path = self
            .directory
            .join(format!("{}-snapshot-{step:08}.mrbv", self.output_name));
        lifted.save(&path).map_err(MrError::from)?;
        self.n_written += 1;
        tracing::debug!(step, time, path = %path.display(), "物理空间快照已写出");
        Ok(())
    }
}
