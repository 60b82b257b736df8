// crates/mr_config/src/filter_model.rs

//! 滤波模型与积分格式枚举
//!
//! `FilterModel` 选择 POD-ROM 的稳定化策略，每次运行恰好激活一种模型。
//! 各模型使用的参数互不相同（例如 Lavrentiev 正则化参数只对
//! `ADLavrentiev` 有意义），参数一致性由 `RomConfig::validate` 检查。
//!
//! # 历史拼写
//!
//! 早期参数文件中 `ADTikhonov` 曾被误拼为 `ADTikonov`，两处拼写不一致
//! 导致该模型实际无法选中。本实现以 `ADTikhonov` 为规范拼写，同时通过
//! serde alias 接受旧拼写以兼容存量参数文件。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// POD-ROM 滤波/稳定化模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FilterModel {
    /// 无滤波，直接积分 Galerkin 降阶系统
    Identity,
    /// L2 投影滤波：截断 cutoff_n 之后的降阶坐标
    L2Projection,
    /// 微分滤波：椭圆算子平滑，折入积分右端项
    #[default]
    Differential,
    /// 后置 L2 投影滤波：仅在输出时刻截断
    PostL2ProjectionFilter,
    /// 后置微分滤波：仅在输出时刻平滑
    PostDifferentialFilter,
    /// Leray 混合模型：仅平滑非线性项中的平流状态
    LerayHybrid,
    /// 近似反卷积 + Lavrentiev 正则化
    ADLavrentiev,
    /// 近似反卷积 + Tikhonov 正则化
    #[serde(alias = "ADTikonov")]
    ADTikhonov,
}

impl FilterModel {
    /// 该模型是否属于近似反卷积（AD）家族
    ///
    /// AD 模型需要在积分开始前对初始条件做一次正向滤波，
    /// 并在每个输出时刻施加代数逆滤波还原未滤波状态。
    pub fn is_deconvolution(self) -> bool {
        matches!(self, Self::ADLavrentiev | Self::ADTikhonov)
    }

    /// 该模型是否使用滤波半径参数
    pub fn uses_filter_radius(self) -> bool {
        matches!(
            self,
            Self::Differential
                | Self::PostDifferentialFilter
                | Self::LerayHybrid
                | Self::ADLavrentiev
                | Self::ADTikhonov
        )
    }

    /// 该模型是否使用 L2 截断参数
    pub fn uses_cutoff(self) -> bool {
        matches!(self, Self::L2Projection | Self::PostL2ProjectionFilter)
    }
}

impl fmt::Display for FilterModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Identity => "Identity",
            Self::L2Projection => "L2Projection",
            Self::Differential => "Differential",
            Self::PostL2ProjectionFilter => "PostL2ProjectionFilter",
            Self::PostDifferentialFilter => "PostDifferentialFilter",
            Self::LerayHybrid => "LerayHybrid",
            Self::ADLavrentiev => "ADLavrentiev",
            Self::ADTikhonov => "ADTikhonov",
        };
        write!(f, "{name}")
    }
}

impl FromStr for FilterModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Identity" => Ok(Self::Identity),
            "L2Projection" => Ok(Self::L2Projection),
            "Differential" => Ok(Self::Differential),
            "PostL2ProjectionFilter" => Ok(Self::PostL2ProjectionFilter),
            "PostDifferentialFilter" => Ok(Self::PostDifferentialFilter),
            "LerayHybrid" => Ok(Self::LerayHybrid),
            "ADLavrentiev" => Ok(Self::ADLavrentiev),
            "ADTikhonov" | "ADTikonov" => Ok(Self::ADTikhonov),
            other => Err(ConfigError::invalid(
                "filter_model",
                other,
                "未知的滤波模型",
            )),
        }
    }
}

/// 显式时间积分格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IntegratorScheme {
    /// 一阶前向欧拉（保留用于调试和对比）
    ForwardEuler,
    /// 经典四级四阶 Runge-Kutta（默认）
    #[default]
    RungeKutta4,
}

impl fmt::Display for IntegratorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForwardEuler => write!(f, "ForwardEuler"),
            Self::RungeKutta4 => write!(f, "RK4"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_differential() {
        assert_eq!(FilterModel::default(), FilterModel::Differential);
    }

    #[test]
    fn test_legacy_tikonov_spelling_accepted() {
        // 旧参数文件中的误拼写应解析为规范变体
        let parsed: FilterModel = serde_json::from_str("\"ADTikonov\"").unwrap();
        assert_eq!(parsed, FilterModel::ADTikhonov);

        let canonical: FilterModel = serde_json::from_str("\"ADTikhonov\"").unwrap();
        assert_eq!(canonical, FilterModel::ADTikhonov);
    }

    #[test]
    fn test_unknown_model_rejected() {
        let result: Result<FilterModel, _> = serde_json::from_str("\"Bogus\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_deconvolution_family() {
        assert!(FilterModel::ADLavrentiev.is_deconvolution());
        assert!(FilterModel::ADTikhonov.is_deconvolution());
        assert!(!FilterModel::Differential.is_deconvolution());
        assert!(!FilterModel::Identity.is_deconvolution());
    }

    #[test]
    fn test_parameter_usage_flags() {
        assert!(FilterModel::Differential.uses_filter_radius());
        assert!(!FilterModel::L2Projection.uses_filter_radius());
        assert!(FilterModel::L2Projection.uses_cutoff());
        assert!(!FilterModel::LerayHybrid.uses_cutoff());
    }

    #[test]
    fn test_from_str_accepts_legacy_spelling() {
        assert_eq!(
            "ADTikonov".parse::<FilterModel>().unwrap(),
            FilterModel::ADTikhonov
        );
        assert_eq!(
            "LerayHybrid".parse::<FilterModel>().unwrap(),
            FilterModel::LerayHybrid
        );
        assert!("Bogus".parse::<FilterModel>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let model = FilterModel::PostDifferentialFilter;
        let json = format!("\"{model}\"");
        let parsed: FilterModel = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, model);
    }
}
