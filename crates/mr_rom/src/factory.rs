// crates/mr_rom/src/factory.rs

//! 积分器工厂
//!
//! 按滤波模型把常值降阶算子折算为有效右端项算子，并构建
//! (输出标识, 积分器, 滤波器) 三元组。
//!
//! 折入式模型（Differential / L2Projection）把滤波矩阵 F 合成进
//! 右端项：有效线性算子为 `(-L+B)/Re + F·(-C0-C1)`，二次项输出再乘 F。
//! 后置与近似反卷积模型保持右端项不变，滤波只发生在初始条件与
//! 输出时刻。Leray 模型保持线性算子不变，仅替换二次项的平流状态。
//!
//! 输出标识编码模型名、降阶维数与所有激活参数，保证参数扫描中
//! 不同运行的产物互不覆盖。

use tracing::info;

use mr_config::{FilterModel, IntegratorScheme, RomConfig};
use mr_foundation::MrResult;

use crate::filter::{
    DeconvolutionFilter, DifferentialFilter, L2ProjectionFilter, RomFilter,
};
use crate::integrator::{ForwardEuler, ReducedRhs, RungeKutta4, TimeIntegratorEnum};
use crate::operators::ReducedOperators;

/// 工厂产物：输出标识 + 积分器 + 滤波器
pub struct RomBuild {
    /// 输出文件标识（含模型名与参数编码）
    pub output_name: String,
    /// 绑定了有效右端项的积分器
    pub integrator: TimeIntegratorEnum<ReducedRhs>,
    /// 滤波策略实例（编排器在初始条件与输出时刻调用）
    pub filter: RomFilter,
}

fn encode_output_name(config: &RomConfig, n_dofs: usize) -> String {
    let r = n_dofs;
    let filtering = &config.filtering;
    match filtering.filter_model {
        FilterModel::Identity => format!("pod-rom-identity-r{r}"),
        FilterModel::Differential => format!(
            "pod-rom-differential-r{r}-radius-{:.6e}",
            filtering.filter_radius
        ),
        FilterModel::L2Projection => {
            format!("pod-rom-l2-projection-r{r}-cutoff-{}", filtering.cutoff_n)
        }
        FilterModel::PostDifferentialFilter => format!(
            "pod-rom-post-differential-r{r}-radius-{:.6e}",
            filtering.filter_radius
        ),
        FilterModel::PostL2ProjectionFilter => format!(
            "pod-rom-post-l2-projection-r{r}-cutoff-{}",
            filtering.cutoff_n
        ),
        FilterModel::LerayHybrid => format!(
            "pod-rom-leray-hybrid-r{r}-radius-{:.6e}",
            filtering.filter_radius
        ),
        FilterModel::ADLavrentiev => format!(
            "pod-rom-ad-lavrentiev-r{r}-radius-{:.6e}-alpha-{:.6e}-noise-{:.6e}",
            filtering.filter_radius, filtering.lavrentiev_parameter, filtering.noise_multiplier
        ),
        FilterModel::ADTikhonov => format!(
            "pod-rom-ad-tikhonov-r{r}-radius-{:.6e}-noise-{:.6e}",
            filtering.filter_radius, filtering.noise_multiplier
        ),
    }
}

fn differential_filter(
    operators: &ReducedOperators,
    filter_radius: f64,
) -> MrResult<DifferentialFilter> {
    DifferentialFilter::new(
        &operators.mass,
        &operators.laplace,
        &operators.boundary,
        filter_radius,
    )
}

/// 按配置构建 (输出标识, 积分器, 滤波器)
///
/// # 参数
/// - `operators`: 装配完成的降阶算子束
/// - `config`: 运行配置（滤波模型、参数、积分格式）
///
/// # 返回
/// 绑定了有效右端项的完整积分装置；滤波算子奇异或参数越界时失败，
/// 不进入时间循环。
pub fn build_rom(operators: &ReducedOperators, config: &RomConfig) -> MrResult<RomBuild> {
    let n_dofs = operators.n_dofs();
    let filtering = &config.filtering;
    let reynolds_n = config.dns.reynolds_n;

    // 有效右端项 + 滤波器
    let (rhs, filter) = match filtering.filter_model {
        FilterModel::Identity => {
            let rhs = ReducedRhs::new(
                operators.linear.clone(),
                operators.nonlinearity.clone(),
                operators.mean_contribution.clone(),
            )?;
            (rhs, RomFilter::Identity)
        }

        FilterModel::Differential => {
            let diff = differential_filter(operators, filtering.filter_radius)?;
            let smoothing = diff.smoothing_matrix()?;

            let linear = operators.viscous_operator(reynolds_n)
                + &smoothing * &operators.joint_convection;
            let mean = if filtering.filter_mean {
                &smoothing * &operators.mean_contribution
            } else {
                operators.mean_contribution.clone()
            };
            let rhs = ReducedRhs::new(linear, operators.nonlinearity.clone(), mean)?
                .with_nonlinear_filter(smoothing)?;
            (rhs, RomFilter::Differential(diff))
        }

        FilterModel::L2Projection => {
            let proj = L2ProjectionFilter::new(filtering.cutoff_n, n_dofs)?;
            let projection = proj.projection_matrix();

            let linear = operators.viscous_operator(reynolds_n)
                + &projection * &operators.joint_convection;
            let mean = if filtering.filter_mean {
                &projection * &operators.mean_contribution
            } else {
                operators.mean_contribution.clone()
            };
            let rhs = ReducedRhs::new(linear, operators.nonlinearity.clone(), mean)?
                .with_nonlinear_filter(projection)?;
            (rhs, RomFilter::L2Projection(proj))
        }

        FilterModel::PostDifferentialFilter => {
            let diff = differential_filter(operators, filtering.filter_radius)?;
            let rhs = ReducedRhs::new(
                operators.linear.clone(),
                operators.nonlinearity.clone(),
                operators.mean_contribution.clone(),
            )?;
            (rhs, RomFilter::PostDifferential(diff))
        }

        FilterModel::PostL2ProjectionFilter => {
            let proj = L2ProjectionFilter::new(filtering.cutoff_n, n_dofs)?;
            let rhs = ReducedRhs::new(
                operators.linear.clone(),
                operators.nonlinearity.clone(),
                operators.mean_contribution.clone(),
            )?;
            (rhs, RomFilter::PostL2Projection(proj))
        }

        FilterModel::LerayHybrid => {
            let diff = differential_filter(operators, filtering.filter_radius)?;
            let smoothing = diff.smoothing_matrix()?;
            let rhs = ReducedRhs::new(
                operators.linear.clone(),
                operators.nonlinearity.clone(),
                operators.mean_contribution.clone(),
            )?
            .with_leray_smoother(smoothing)?;
            (rhs, RomFilter::LerayHybrid(diff))
        }

        FilterModel::ADLavrentiev => {
            let ad = DeconvolutionFilter::lavrentiev(
                &operators.mass,
                &operators.laplace,
                &operators.boundary,
                filtering.filter_radius,
                filtering.noise_multiplier,
                filtering.lavrentiev_parameter,
                filtering.noise_seed,
            )?;
            let rhs = ReducedRhs::new(
                operators.linear.clone(),
                operators.nonlinearity.clone(),
                operators.mean_contribution.clone(),
            )?;
            (rhs, RomFilter::ADLavrentiev(ad))
        }

        FilterModel::ADTikhonov => {
            let ad = DeconvolutionFilter::tikhonov(
                &operators.mass,
                &operators.laplace,
                &operators.boundary,
                filtering.filter_radius,
                filtering.noise_multiplier,
                filtering.noise_seed,
            )?;
            let rhs = ReducedRhs::new(
                operators.linear.clone(),
                operators.nonlinearity.clone(),
                operators.mean_contribution.clone(),
            )?;
            (rhs, RomFilter::ADTikhonov(ad))
        }
    };

    let integrator = match config.time.scheme {
        IntegratorScheme::ForwardEuler => {
            TimeIntegratorEnum::ForwardEuler(ForwardEuler::new(rhs))
        }
        IntegratorScheme::RungeKutta4 => TimeIntegratorEnum::RungeKutta4(RungeKutta4::new(rhs)),
    };

    let output_name = encode_output_name(config, n_dofs);
    info!(
        model = %filtering.filter_model,
        scheme = integrator.scheme_name(),
        n_dofs,
        output_name = %output_name,
        "积分装置构建完成"
    );

    Ok(RomBuild {
        output_name,
        integrator,
        filter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::{RhsComputer, TimeIntegrator};
    use crate::operators::{assemble_reduced_operators, PodProjections};
    use nalgebra::{DMatrix, DVector};

    fn operators(n: usize) -> ReducedOperators {
        let fill =
            |offset: f64| DMatrix::from_fn(n, n, |i, j| offset + i as f64 * 0.4 - j as f64 * 0.3);
        let proj = PodProjections {
            mass: DMatrix::identity(n, n),
            laplace: DMatrix::from_fn(n, n, |i, j| {
                if i == j {
                    2.0
                } else if i.abs_diff(j) == 1 {
                    -1.0
                } else {
                    0.0
                }
            }),
            boundary: DMatrix::from_fn(n, n, |i, j| if i == j { 0.1 } else { 0.0 }),
            convection_0: fill(0.5),
            convection_1: fill(-1.0),
            nonlinearity: (0..n).map(|k| fill(k as f64 * 0.2)).collect(),
            mean_contribution: DVector::from_fn(n, |i, _| 0.1 * i as f64),
        };
        assemble_reduced_operators(proj, 50.0).unwrap()
    }

    fn config_with(model: FilterModel) -> RomConfig {
        let mut config = RomConfig::default();
        config.filtering.filter_model = model;
        config.filtering.filter_radius = 0.2;
        config.filtering.cutoff_n = 2;
        config
    }

    #[test]
    fn test_output_name_encodes_model_and_parameters() {
        let ops = operators(4);

        let build = build_rom(&ops, &config_with(FilterModel::Identity)).unwrap();
        assert_eq!(build.output_name, "pod-rom-identity-r4");

        let build = build_rom(&ops, &config_with(FilterModel::Differential)).unwrap();
        assert_eq!(build.output_name, "pod-rom-differential-r4-radius-2.000000e-1");

        let build = build_rom(&ops, &config_with(FilterModel::L2Projection)).unwrap();
        assert_eq!(build.output_name, "pod-rom-l2-projection-r4-cutoff-2");

        let mut config = config_with(FilterModel::ADLavrentiev);
        config.filtering.lavrentiev_parameter = 0.01;
        config.filtering.noise_multiplier = 0.5;
        let build = build_rom(&ops, &config).unwrap();
        assert_eq!(
            build.output_name,
            "pod-rom-ad-lavrentiev-r4-radius-2.000000e-1-alpha-1.000000e-2-noise-5.000000e-1"
        );
    }

    #[test]
    fn test_distinct_parameters_give_distinct_names() {
        let ops = operators(3);
        let mut a = config_with(FilterModel::Differential);
        let mut b = config_with(FilterModel::Differential);
        a.filtering.filter_radius = 0.1;
        b.filtering.filter_radius = 0.2;
        let name_a = build_rom(&ops, &a).unwrap().output_name;
        let name_b = build_rom(&ops, &b).unwrap().output_name;
        assert_ne!(name_a, name_b);
    }

    #[test]
    fn test_identity_build_matches_plain_operators() {
        let ops = operators(3);
        let mut build = build_rom(&ops, &config_with(FilterModel::Identity)).unwrap();

        // 单步结果应与手写前向 Euler 的 RK4 展开一致: 取 dt 极小比较 RHS
        let x = DVector::from_vec(vec![0.3, -0.2, 0.1]);
        let mut stepped = DVector::zeros(3);
        build.integrator.step(1e-8, 0.0, &x, &mut stepped).unwrap();

        let mut rhs = ReducedRhs::new(
            ops.linear.clone(),
            ops.nonlinearity.clone(),
            ops.mean_contribution.clone(),
        )
        .unwrap();
        let mut f = DVector::zeros(3);
        rhs.compute_rhs(0.0, &x, &mut f).unwrap();

        for i in 0..3 {
            let derivative = (stepped[i] - x[i]) / 1e-8;
            assert!((derivative - f[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_l2_projection_truncates_state_derivative() {
        // 折入投影后, cutoff 之上坐标的对流/非线性贡献经 P 滤除,
        // 只剩粘性与未滤波的平均流贡献
        let n = 4;
        let ops = operators(n);
        let mut config = config_with(FilterModel::L2Projection);
        config.filtering.cutoff_n = n; // 全保留时应与 Identity 一致

        let mut full = build_rom(&ops, &config).unwrap();
        let mut ident = build_rom(&ops, &config_with(FilterModel::Identity)).unwrap();

        let x = DVector::from_fn(n, |i, _| 0.1 + 0.05 * i as f64);
        let mut a = DVector::zeros(n);
        let mut b = DVector::zeros(n);
        full.integrator.step(0.01, 0.0, &x, &mut a).unwrap();
        ident.integrator.step(0.01, 0.0, &x, &mut b).unwrap();

        for i in 0..n {
            assert!((a[i] - b[i]).abs() < 1e-12, "分量 {i}: {} vs {}", a[i], b[i]);
        }
    }

    #[test]
    fn test_differential_zero_radius_matches_identity() {
        let n = 3;
        let ops = operators(n);
        let mut config = config_with(FilterModel::Differential);
        config.filtering.filter_radius = 0.0;

        let mut diff = build_rom(&ops, &config).unwrap();
        let mut ident = build_rom(&ops, &config_with(FilterModel::Identity)).unwrap();

        let x = DVector::from_fn(n, |i, _| 0.2 - 0.1 * i as f64);
        let mut a = DVector::zeros(n);
        let mut b = DVector::zeros(n);
        diff.integrator.step(0.01, 0.0, &x, &mut a).unwrap();
        ident.integrator.step(0.01, 0.0, &x, &mut b).unwrap();

        for i in 0..n {
            assert!((a[i] - b[i]).abs() < 1e-10);
        }
    }

    #[test]
    fn test_filter_mean_folds_filter_into_mean_forcing() {
        // x = 0 时线性项与二次项均为零, 前向 Euler 单步 (dt = 1)
        // 直接暴露平均流强迫向量
        let n = 4;
        let ops = operators(n);
        let x = DVector::zeros(n);
        let mut a = DVector::zeros(n);
        let mut b = DVector::zeros(n);

        // L2 投影: filter_mean 把 cutoff 之上的 mean 分量截断为零
        let mut config = config_with(FilterModel::L2Projection);
        config.time.scheme = IntegratorScheme::ForwardEuler;
        let mut plain = build_rom(&ops, &config).unwrap();
        config.filtering.filter_mean = true;
        let mut truncated = build_rom(&ops, &config).unwrap();

        plain.integrator.step(1.0, 0.0, &x, &mut a).unwrap();
        truncated.integrator.step(1.0, 0.0, &x, &mut b).unwrap();

        for i in 0..2 {
            assert!((a[i] - b[i]).abs() < 1e-14, "cutoff 之下分量 {i} 不应改变");
        }
        for i in 2..n {
            assert!((a[i] - 0.1 * i as f64).abs() < 1e-14);
            assert_eq!(b[i], 0.0, "cutoff 之上分量 {i} 应被截断");
        }

        // 微分滤波: filter_mean 用 G·m 替换 m, 半径非零时两者必不相等
        let mut config = config_with(FilterModel::Differential);
        config.time.scheme = IntegratorScheme::ForwardEuler;
        let mut plain = build_rom(&ops, &config).unwrap();
        config.filtering.filter_mean = true;
        let mut smoothed = build_rom(&ops, &config).unwrap();

        plain.integrator.step(1.0, 0.0, &x, &mut a).unwrap();
        smoothed.integrator.step(1.0, 0.0, &x, &mut b).unwrap();
        assert!((&a - &b).norm() > 1e-6, "filter_mean 未改变平均流强迫");
    }

    #[test]
    fn test_post_variants_leave_rhs_plain() {
        let n = 3;
        let ops = operators(n);
        let mut post = build_rom(&ops, &config_with(FilterModel::PostDifferentialFilter)).unwrap();
        let mut ident = build_rom(&ops, &config_with(FilterModel::Identity)).unwrap();

        let x = DVector::from_fn(n, |i, _| 0.3 * (i as f64 + 1.0));
        let mut a = DVector::zeros(n);
        let mut b = DVector::zeros(n);
        post.integrator.step(0.01, 0.0, &x, &mut a).unwrap();
        ident.integrator.step(0.01, 0.0, &x, &mut b).unwrap();
        assert_eq!(a, b);
        assert_eq!(post.filter.model_name(), "PostDifferentialFilter");
    }

    #[test]
    fn test_ad_builds_deconvolution_filter() {
        let ops = operators(3);
        let build = build_rom(&ops, &config_with(FilterModel::ADLavrentiev)).unwrap();
        assert!(build.filter.is_deconvolution());

        let build = build_rom(&ops, &config_with(FilterModel::ADTikhonov)).unwrap();
        assert!(build.filter.is_deconvolution());
        assert_eq!(build.filter.model_name(), "ADTikhonov");
    }

    #[test]
    fn test_cutoff_beyond_rank_rejected() {
        let ops = operators(3);
        let mut config = config_with(FilterModel::L2Projection);
        config.filtering.cutoff_n = 7;
        assert!(build_rom(&ops, &config).is_err());
    }

    #[test]
    fn test_forward_euler_scheme_selected() {
        let ops = operators(2);
        let mut config = config_with(FilterModel::Identity);
        config.time.scheme = IntegratorScheme::ForwardEuler;
        let build = build_rom(&ops, &config).unwrap();
        assert_eq!(build.integrator.scheme_name(), "ForwardEuler");
    }
}
