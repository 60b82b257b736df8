// crates/mr_rom/src/engine.rs

//! 时间循环编排器
//!
//! 驱动积分器从初始时间推进到终止时间，按输出间隔做逆滤波并把
//! 降阶系数记入轨迹矩阵。时间用 `t = t0 + step·dt` 重算而非累加，
//! 避免长时间积分的浮点漂移；总步数在进入循环前一次算定：
//!
//! ```text
//! n_total = round((tf − t0) / dt)
//! n_save  = n_total / output_interval
//! ```
//!
//! 轨迹恒有 `n_save + 1` 行：第 0 行是（逆滤波后的）初始状态，
//! 之后每满一个输出间隔记一行。终止时间不晚于初始时间时轨迹退化
//! 为单行。
//!
//! 近似反卷积模型在进入循环前对初始条件施加正向滤波，使演化变量
//! 与逆滤波输出的约定一致。
//!
//! 任一步出现非有限分量立即以 [`MrError::Divergence`] 中止，
//! 已记录的行不会写出半成品。

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, warn};

use mr_config::RomConfig;
use mr_foundation::{ensure, MrError, MrResult};

use crate::factory::RomBuild;
use crate::filter::RomFilter;
use crate::integrator::{ReducedRhs, TimeIntegrator, TimeIntegratorEnum};

/// 物理空间快照接收端
///
/// 引擎只负责在快照窗口内的记录时刻回调；提升到物理空间、落盘
/// 等重活由实现方（IO 层）承担。
pub trait SnapshotSink {
    /// 在记录时刻接收（逆滤波后的）降阶系数
    fn save_snapshot(&mut self, step: usize, time: f64, state: &DVector<f64>) -> MrResult<()>;
}

/// 积分产物：记录时刻与对应的降阶系数轨迹
#[derive(Debug, Clone)]
pub struct RomTrajectory {
    /// 各记录行对应的物理时间，长度 = 行数
    pub times: Vec<f64>,
    /// 轨迹矩阵，(n_save + 1) × r，每行一个记录时刻
    pub coefficients: DMatrix<f64>,
}

impl RomTrajectory {
    /// 记录行数
    pub fn n_rows(&self) -> usize {
        self.coefficients.nrows()
    }

    /// 末行（最终记录状态）
    pub fn final_state(&self) -> DVector<f64> {
        self.coefficients.row(self.n_rows() - 1).transpose()
    }
}

/// 时间循环编排器
///
/// 独占持有积分器与滤波器，一次 `run()` 完成一条轨迹。
pub struct RomEngine {
    output_name: String,
    integrator: TimeIntegratorEnum<ReducedRhs>,
    filter: RomFilter,
    initial_time: f64,
    final_time: f64,
    time_step: f64,
    output_interval: usize,
    plot_time_start: f64,
    plot_time_stop: f64,
    save_plot_pictures: bool,
}

impl RomEngine {
    /// 由工厂产物与运行配置组装引擎
    pub fn new(build: RomBuild, config: &RomConfig) -> MrResult<Self> {
        ensure!(
            config.time.time_step > 0.0,
            MrError::config(format!(
                "time_step 必须为正, 实际 {}",
                config.time.time_step
            ))
        );
        ensure!(
            config.output.output_interval > 0,
            MrError::config("output_interval 必须为正".to_string())
        );

        Ok(Self {
            output_name: build.output_name,
            integrator: build.integrator,
            filter: build.filter,
            initial_time: config.time.initial_time,
            final_time: config.time.final_time,
            time_step: config.time.time_step,
            output_interval: config.output.output_interval,
            plot_time_start: config.output.plot_time_start,
            plot_time_stop: config.output.plot_time_stop,
            save_plot_pictures: config.output.save_plot_pictures,
        })
    }

    /// 输出文件标识
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// 从初始条件积分到终止时间
    pub fn run(&mut self, initial: &DVector<f64>) -> MrResult<RomTrajectory> {
        self.run_with_sink(initial, None)
    }

    /// 带物理空间快照回调的积分
    ///
    /// # 参数
    /// - `initial`: 未滤波的初始降阶系数
    /// - `sink`: 快照接收端；仅在配置开启且时间落在快照窗口内时回调
    pub fn run_with_sink(
        &mut self,
        initial: &DVector<f64>,
        mut sink: Option<&mut dyn SnapshotSink>,
    ) -> MrResult<RomTrajectory> {
        let n_dofs = self.integrator.n_dofs();
        MrError::check_size("initial state", n_dofs, initial.len())?;

        let span = self.final_time - self.initial_time;
        let n_total = if span > 0.0 {
            (span / self.time_step).round() as usize
        } else {
            warn!(
                initial_time = self.initial_time,
                final_time = self.final_time,
                "终止时间不晚于初始时间, 轨迹退化为单行"
            );
            0
        };
        let n_save = n_total / self.output_interval;

        info!(
            model = self.filter.model_name(),
            scheme = self.integrator.scheme_name(),
            n_dofs,
            n_total,
            n_save,
            dt = self.time_step,
            "开始降阶模型积分"
        );

        let mut solution = initial.clone();
        if self.filter.is_deconvolution() {
            // 演化变量是滤波后的状态, 输出时刻再反卷积还原
            let mut filtered = DVector::zeros(n_dofs);
            self.filter.apply(initial, &mut filtered)?;
            solution = filtered;
            debug!("初始条件已施加正向滤波");
        }

        let mut coefficients = DMatrix::zeros(n_save + 1, n_dofs);
        let mut times = Vec::with_capacity(n_save + 1);
        let mut output = DVector::zeros(n_dofs);
        let mut next_row = 0usize;

        record_row(
            &self.filter,
            &solution,
            &mut output,
            &mut coefficients,
            &mut times,
            &mut next_row,
            0,
            self.initial_time,
            self.save_plot_pictures,
            self.plot_time_start,
            self.plot_time_stop,
            sink.as_deref_mut(),
        )?;

        let mut previous = solution.clone();
        for step in 1..=n_total {
            let time_old = self.initial_time + (step - 1) as f64 * self.time_step;
            std::mem::swap(&mut previous, &mut solution);
            self.integrator
                .step(self.time_step, time_old, &previous, &mut solution)?;

            let time = self.initial_time + step as f64 * self.time_step;
            if solution.iter().any(|v| !v.is_finite()) {
                return Err(MrError::divergence(step, time));
            }

            if step % self.output_interval == 0 {
                record_row(
                    &self.filter,
                    &solution,
                    &mut output,
                    &mut coefficients,
                    &mut times,
                    &mut next_row,
                    step,
                    time,
                    self.save_plot_pictures,
                    self.plot_time_start,
                    self.plot_time_stop,
                    sink.as_deref_mut(),
                )?;
            }
        }

        info!(
            output_name = %self.output_name,
            n_rows = next_row,
            "降阶模型积分完成"
        );

        Ok(RomTrajectory {
            times,
            coefficients,
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn record_row(
    filter: &RomFilter,
    solution: &DVector<f64>,
    output: &mut DVector<f64>,
    coefficients: &mut DMatrix<f64>,
    times: &mut Vec<f64>,
    next_row: &mut usize,
    step: usize,
    time: f64,
    save_plot_pictures: bool,
    plot_time_start: f64,
    plot_time_stop: f64,
    sink: Option<&mut (dyn SnapshotSink + '_)>,
) -> MrResult<()> {
    filter.apply_inverse(solution, output)?;
    coefficients.row_mut(*next_row).tr_copy_from(output);
    times.push(time);
    *next_row += 1;
    debug!(step, time, row = *next_row - 1, "记录轨迹行");

    if save_plot_pictures && time >= plot_time_start && time <= plot_time_stop {
        if let Some(sink) = sink {
            sink.save_snapshot(step, time, output)?;
        }
    }
    Ok(())
}
