// crates/mr_rom/src/integrator.rs

//! 显式时间积分器与降阶右端项求值
//!
//! 降阶系统右端项为二次型 ODE：
//!
//! ```text
//! f(x) = A·x + q(x) + m,    q(x)_k = aᵀ·N_k·x
//! ```
//!
//! 其中平流状态 `a` 默认为 `x` 本身；Leray 混合模型把 `a` 替换为
//! 平滑状态 `G·x`。折入积分过程的滤波模型通过有效线性算子 `A` 与
//! 非线性滤波矩阵 `F`（作用于 `q(x)`）表达，右端项求值本身不感知
//! 滤波模型的存在。
//!
//! 积分器使用枚举分发而非 trait 对象，所有阶段缓冲在构造时分配，
//! `step()` 内零分配。

use nalgebra::{DMatrix, DVector};

use mr_foundation::{MrError, MrResult};

/// 右端项求值接口
///
/// `step()` 每步调用一到四次，实现方可以持有可变的内部工作区。
pub trait RhsComputer {
    /// 求值 f(t, x)，写入 `rhs_out`
    fn compute_rhs(&mut self, time: f64, state: &DVector<f64>, rhs_out: &mut DVector<f64>)
        -> MrResult<()>;

    /// 状态向量维数
    fn n_dofs(&self) -> usize;
}

/// 降阶系统右端项
///
/// 持有常值有效算子与三个工作区向量，求值路径全部走 BLAS 风格的
/// `gemv`/`dot`，无堆分配。
pub struct ReducedRhs {
    linear: DMatrix<f64>,
    nonlinearity: Vec<DMatrix<f64>>,
    mean_contribution: DVector<f64>,
    /// 作用于二次项输出的滤波矩阵（折入式模型）
    nonlinear_filter: Option<DMatrix<f64>>,
    /// 平流状态的平滑矩阵（Leray 模型）
    leray_smoother: Option<DMatrix<f64>>,
    advect_scratch: DVector<f64>,
    tensor_scratch: DVector<f64>,
    quadratic_scratch: DVector<f64>,
}

impl ReducedRhs {
    /// 构建降阶右端项
    ///
    /// # 参数
    /// - `linear`: 有效线性算子 A（r×r）
    /// - `nonlinearity`: 非线性张量，r 个 r×r 矩阵
    /// - `mean_contribution`: 有效平均流贡献向量 m（长度 r）
    pub fn new(
        linear: DMatrix<f64>,
        nonlinearity: Vec<DMatrix<f64>>,
        mean_contribution: DVector<f64>,
    ) -> MrResult<Self> {
        let n_dofs = linear.nrows();
        MrError::check_size("linear", n_dofs, linear.ncols())?;
        MrError::check_size("nonlinearity", n_dofs, nonlinearity.len())?;
        for component in &nonlinearity {
            MrError::check_size("nonlinearity component", n_dofs, component.nrows())?;
            MrError::check_size("nonlinearity component", n_dofs, component.ncols())?;
        }
        MrError::check_size("mean_contribution", n_dofs, mean_contribution.len())?;

        Ok(Self {
            linear,
            nonlinearity,
            mean_contribution,
            nonlinear_filter: None,
            leray_smoother: None,
            advect_scratch: DVector::zeros(n_dofs),
            tensor_scratch: DVector::zeros(n_dofs),
            quadratic_scratch: DVector::zeros(n_dofs),
        })
    }

    /// 对二次项输出施加滤波矩阵 F
    pub fn with_nonlinear_filter(mut self, filter: DMatrix<f64>) -> MrResult<Self> {
        MrError::check_size("nonlinear_filter", self.n_dofs(), filter.nrows())?;
        MrError::check_size("nonlinear_filter", self.n_dofs(), filter.ncols())?;
        self.nonlinear_filter = Some(filter);
        Ok(self)
    }

    /// 平流状态替换为 G·x（Leray 模型）
    pub fn with_leray_smoother(mut self, smoother: DMatrix<f64>) -> MrResult<Self> {
        MrError::check_size("leray_smoother", self.n_dofs(), smoother.nrows())?;
        MrError::check_size("leray_smoother", self.n_dofs(), smoother.ncols())?;
        self.leray_smoother = Some(smoother);
        Ok(self)
    }
}

impl RhsComputer for ReducedRhs {
    fn compute_rhs(
        &mut self,
        _time: f64,
        state: &DVector<f64>,
        rhs_out: &mut DVector<f64>,
    ) -> MrResult<()> {
        MrError::check_size("state", self.n_dofs(), state.len())?;
        MrError::check_size("rhs_out", self.n_dofs(), rhs_out.len())?;

        // 线性部分 + 平均流贡献
        rhs_out.copy_from(&self.mean_contribution);
        rhs_out.gemv(1.0, &self.linear, state, 1.0);

        // 平流状态：x 或 G·x
        let advecting: &DVector<f64> = match &self.leray_smoother {
            Some(smoother) => {
                self.advect_scratch.gemv(1.0, smoother, state, 0.0);
                &self.advect_scratch
            }
            None => state,
        };

        // 二次项 q_k = aᵀ·N_k·x
        for (k, component) in self.nonlinearity.iter().enumerate() {
            self.tensor_scratch.gemv(1.0, component, state, 0.0);
            self.quadratic_scratch[k] = advecting.dot(&self.tensor_scratch);
        }

        match &self.nonlinear_filter {
            Some(filter) => rhs_out.gemv(1.0, filter, &self.quadratic_scratch, 1.0),
            None => *rhs_out += &self.quadratic_scratch,
        }

        Ok(())
    }

    fn n_dofs(&self) -> usize {
        self.linear.nrows()
    }
}

/// 单步显式积分接口
pub trait TimeIntegrator {
    /// 从 `state_old` 推进一个步长 `dt`，结果写入 `state_new`
    fn step(
        &mut self,
        dt: f64,
        time: f64,
        state_old: &DVector<f64>,
        state_new: &mut DVector<f64>,
    ) -> MrResult<()>;
}

/// 一阶前向 Euler 格式
pub struct ForwardEuler<R: RhsComputer> {
    rhs: R,
    k1: DVector<f64>,
}

impl<R: RhsComputer> ForwardEuler<R> {
    /// 构建前向 Euler 积分器
    pub fn new(rhs: R) -> Self {
        let n_dofs = rhs.n_dofs();
        Self {
            rhs,
            k1: DVector::zeros(n_dofs),
        }
    }

    /// 状态向量维数
    pub fn n_dofs(&self) -> usize {
        self.rhs.n_dofs()
    }
}

impl<R: RhsComputer> TimeIntegrator for ForwardEuler<R> {
    fn step(
        &mut self,
        dt: f64,
        time: f64,
        state_old: &DVector<f64>,
        state_new: &mut DVector<f64>,
    ) -> MrResult<()> {
        self.rhs.compute_rhs(time, state_old, &mut self.k1)?;
        state_new.copy_from(state_old);
        state_new.axpy(dt, &self.k1, 1.0);
        Ok(())
    }
}

/// 经典四阶 Runge-Kutta 格式
///
/// 四个阶段缓冲与一个中间状态缓冲在构造时分配。
pub struct RungeKutta4<R: RhsComputer> {
    rhs: R,
    k1: DVector<f64>,
    k2: DVector<f64>,
    k3: DVector<f64>,
    k4: DVector<f64>,
    stage: DVector<f64>,
}

impl<R: RhsComputer> RungeKutta4<R> {
    /// 构建 RK4 积分器
    pub fn new(rhs: R) -> Self {
        let n_dofs = rhs.n_dofs();
        Self {
            rhs,
            k1: DVector::zeros(n_dofs),
            k2: DVector::zeros(n_dofs),
            k3: DVector::zeros(n_dofs),
            k4: DVector::zeros(n_dofs),
            stage: DVector::zeros(n_dofs),
        }
    }

    /// 状态向量维数
    pub fn n_dofs(&self) -> usize {
        self.rhs.n_dofs()
    }
}

impl<R: RhsComputer> TimeIntegrator for RungeKutta4<R> {
    fn step(
        &mut self,
        dt: f64,
        time: f64,
        state_old: &DVector<f64>,
        state_new: &mut DVector<f64>,
    ) -> MrResult<()> {
        let half = 0.5 * dt;

        self.rhs.compute_rhs(time, state_old, &mut self.k1)?;

        self.stage.copy_from(state_old);
        self.stage.axpy(half, &self.k1, 1.0);
        self.rhs.compute_rhs(time + half, &self.stage, &mut self.k2)?;

        self.stage.copy_from(state_old);
        self.stage.axpy(half, &self.k2, 1.0);
        self.rhs.compute_rhs(time + half, &self.stage, &mut self.k3)?;

        self.stage.copy_from(state_old);
        self.stage.axpy(dt, &self.k3, 1.0);
        self.rhs.compute_rhs(time + dt, &self.stage, &mut self.k4)?;

        let sixth = dt / 6.0;
        state_new.copy_from(state_old);
        state_new.axpy(sixth, &self.k1, 1.0);
        state_new.axpy(2.0 * sixth, &self.k2, 1.0);
        state_new.axpy(2.0 * sixth, &self.k3, 1.0);
        state_new.axpy(sixth, &self.k4, 1.0);
        Ok(())
    }
}

/// 时间积分器枚举 - 替代 Box<dyn TimeIntegrator>
pub enum TimeIntegratorEnum<R: RhsComputer> {
    /// 前向 Euler
    ForwardEuler(ForwardEuler<R>),
    /// 经典 RK4
    RungeKutta4(RungeKutta4<R>),
}

impl<R: RhsComputer> TimeIntegratorEnum<R> {
    /// 格式名称
    pub fn scheme_name(&self) -> &'static str {
        match self {
            Self::ForwardEuler(_) => "ForwardEuler",
            Self::RungeKutta4(_) => "RungeKutta4",
        }
    }

    /// 状态向量维数
    pub fn n_dofs(&self) -> usize {
        match self {
            Self::ForwardEuler(inner) => inner.n_dofs(),
            Self::RungeKutta4(inner) => inner.n_dofs(),
        }
    }
}

impl<R: RhsComputer> TimeIntegrator for TimeIntegratorEnum<R> {
    fn step(
        &mut self,
        dt: f64,
        time: f64,
        state_old: &DVector<f64>,
        state_new: &mut DVector<f64>,
    ) -> MrResult<()> {
        match self {
            Self::ForwardEuler(inner) => inner.step(dt, time, state_old, state_new),
            Self::RungeKutta4(inner) => inner.step(dt, time, state_old, state_new),
        }
    }
}
