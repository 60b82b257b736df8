// crates/mr_rom/src/operators.rs

//! 仿射降阶算子装配
//!
//! 上游基底/装配阶段提供已投影到 POD 基底的全阶矩阵（质量、扩散、
//! 边界、两个对流矩阵、非线性张量、平均流贡献向量），本模块把它们
//! 组合为积分引擎使用的常值算子束。
//!
//! 线性组合的系数顺序与符号是契约的一部分，编码了无量纲化
//! Navier-Stokes 弱形式：
//!
//! ```text
//! linear           = -(1/Re)·L + (1/Re)·B - C0 - C1
//! joint_convection = -C0 - C1
//! ```
//!
//! L2 投影模型需要联合对流矩阵：所有源自非线性项的贡献都必须被滤波。

use nalgebra::{DMatrix, DVector};

use mr_foundation::{ensure, MrError, MrResult};
use tracing::info;

/// 上游基底阶段提供的投影矩阵集合
///
/// 全部矩阵均为 r×r 稠密方阵，r 为降阶基底维数。
#[derive(Debug, Clone)]
pub struct PodProjections {
    /// 质量矩阵 M
    pub mass: DMatrix<f64>,
    /// 扩散（Laplace）矩阵 L
    pub laplace: DMatrix<f64>,
    /// 出流边界矩阵 B
    pub boundary: DMatrix<f64>,
    /// 对流矩阵 C0（平均流平流降阶模态）
    pub convection_0: DMatrix<f64>,
    /// 对流矩阵 C1（降阶模态平流平均流）
    pub convection_1: DMatrix<f64>,
    /// 非线性张量，r 个 r×r 矩阵
    pub nonlinearity: Vec<DMatrix<f64>>,
    /// 平均流贡献向量 m
    pub mean_contribution: DVector<f64>,
}

/// 装配完成的常值降阶算子束
///
/// 装配后不可变，由编排器独占持有，r 在一次运行的生命周期内固定。
#[derive(Debug, Clone)]
pub struct ReducedOperators {
    /// 质量矩阵 M
    pub mass: DMatrix<f64>,
    /// 扩散矩阵 L
    pub laplace: DMatrix<f64>,
    /// 边界矩阵 B
    pub boundary: DMatrix<f64>,
    /// 组合线性算子 A = -(1/Re)L + (1/Re)B - C0 - C1
    pub linear: DMatrix<f64>,
    /// 联合对流矩阵 -C0 - C1
    pub joint_convection: DMatrix<f64>,
    /// 非线性张量
    pub nonlinearity: Vec<DMatrix<f64>>,
    /// 平均流贡献向量
    pub mean_contribution: DVector<f64>,
}

impl ReducedOperators {
    /// 降阶基底维数 r
    pub fn n_dofs(&self) -> usize {
        self.mass.nrows()
    }

    /// 粘性部分 (-L + B)/Re
    ///
    /// 滤波模型把非线性相关项单独滤波时，线性算子需要拆出粘性部分。
    pub fn viscous_operator(&self, reynolds_n: f64) -> DMatrix<f64> {
        &self.laplace * (-1.0 / reynolds_n) + &self.boundary * (1.0 / reynolds_n)
    }
}

fn check_square(name: &'static str, matrix: &DMatrix<f64>, n_dofs: usize) -> MrResult<()> {
    MrError::check_size(name, n_dofs, matrix.nrows())?;
    MrError::check_size(name, n_dofs, matrix.ncols())?;
    Ok(())
}

/// 装配仿射降阶算子
///
/// # 参数
/// - `projections`: 已投影的全阶矩阵集合
/// - `reynolds_n`: 雷诺数
///
/// # 返回
/// 常值算子束；任意两个操作数维度不一致时失败。
pub fn assemble_reduced_operators(
    projections: PodProjections,
    reynolds_n: f64,
) -> MrResult<ReducedOperators> {
    ensure!(
        reynolds_n > 0.0,
        MrError::config(format!("reynolds_n 必须为正, 实际 {reynolds_n}"))
    );

    let n_dofs = projections.mass.nrows();
    check_square("mass", &projections.mass, n_dofs)?;
    check_square("laplace", &projections.laplace, n_dofs)?;
    check_square("boundary", &projections.boundary, n_dofs)?;
    check_square("convection_0", &projections.convection_0, n_dofs)?;
    check_square("convection_1", &projections.convection_1, n_dofs)?;
    MrError::check_size("nonlinearity", n_dofs, projections.nonlinearity.len())?;
    for component in &projections.nonlinearity {
        check_square("nonlinearity component", component, n_dofs)?;
    }
    MrError::check_size(
        "mean_contribution",
        n_dofs,
        projections.mean_contribution.len(),
    )?;

    let joint_convection = -&projections.convection_0 - &projections.convection_1;

    let linear = &projections.laplace * (-1.0 / reynolds_n)
        + &projections.boundary * (1.0 / reynolds_n)
        - &projections.convection_0
        - &projections.convection_1;

    info!(n_dofs, "仿射降阶算子装配完成");

    Ok(ReducedOperators {
        mass: projections.mass,
        laplace: projections.laplace,
        boundary: projections.boundary,
        linear,
        joint_convection,
        nonlinearity: projections.nonlinearity,
        mean_contribution: projections.mean_contribution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projections(n: usize) -> PodProjections {
        // 生成确定性的非平凡矩阵
        let fill = |offset: f64| {
            DMatrix::from_fn(n, n, |i, j| offset + (i as f64) * 1.5 - (j as f64) * 0.25)
        };
        PodProjections {
            mass: DMatrix::identity(n, n),
            laplace: fill(1.0),
            boundary: fill(-2.0),
            convection_0: fill(0.5),
            convection_1: fill(3.0),
            nonlinearity: (0..n).map(|k| fill(k as f64)).collect(),
            mean_contribution: DVector::from_fn(n, |i, _| i as f64 * 0.1),
        }
    }

    #[test]
    fn test_affine_combination_exact() {
        let n = 4;
        let reynolds_n = 50.0;
        let proj = projections(n);
        let ops = assemble_reduced_operators(proj.clone(), reynolds_n).unwrap();

        for i in 0..n {
            for j in 0..n {
                let expected = proj.laplace[(i, j)] * (-1.0 / reynolds_n)
                    + proj.boundary[(i, j)] * (1.0 / reynolds_n)
                    - proj.convection_0[(i, j)]
                    - proj.convection_1[(i, j)];
                // double 算术下逐位一致
                assert_eq!(ops.linear[(i, j)], expected, "linear({i},{j})");

                let expected_joint = -proj.convection_0[(i, j)] - proj.convection_1[(i, j)];
                assert_eq!(ops.joint_convection[(i, j)], expected_joint);
            }
        }
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut proj = projections(4);
        proj.boundary = DMatrix::zeros(3, 3);
        let err = assemble_reduced_operators(proj, 50.0).unwrap_err();
        assert!(matches!(err, MrError::SizeMismatch { .. }));
    }

    #[test]
    fn test_tensor_length_mismatch_rejected() {
        let mut proj = projections(4);
        proj.nonlinearity.pop();
        assert!(assemble_reduced_operators(proj, 50.0).is_err());
    }

    #[test]
    fn test_mean_length_mismatch_rejected() {
        let mut proj = projections(4);
        proj.mean_contribution = DVector::zeros(5);
        assert!(assemble_reduced_operators(proj, 50.0).is_err());
    }

    #[test]
    fn test_nonpositive_reynolds_rejected() {
        let proj = projections(3);
        assert!(assemble_reduced_operators(proj.clone(), 0.0).is_err());
        assert!(assemble_reduced_operators(proj, -10.0).is_err());
    }

    #[test]
    fn test_viscous_operator() {
        let n = 3;
        let reynolds_n = 25.0;
        let proj = projections(n);
        let ops = assemble_reduced_operators(proj.clone(), reynolds_n).unwrap();
        let viscous = ops.viscous_operator(reynolds_n);
        for i in 0..n {
            for j in 0..n {
                let expected = proj.laplace[(i, j)] * (-1.0 / reynolds_n)
                    + proj.boundary[(i, j)] * (1.0 / reynolds_n);
                assert_eq!(viscous[(i, j)], expected);
            }
        }
    }
}
