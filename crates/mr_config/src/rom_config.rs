// crates/mr_config/src/rom_config.rs

//! RomConfig - 降阶模型运行配置（全 f64）
//!
//! 按参数文件的四个小节组织：DNS 物理信息、滤波模型、时间积分、输出。
//! 所有字段带默认值，`validate()` 在任何算子装配开始前检查取值范围。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::filter_model::{FilterModel, IntegratorScheme};

/// 降阶模型运行配置
///
/// 作为不可变值传入各组件构造函数，一次运行期间不再修改。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RomConfig {
    /// 底层 DNS 模拟的物理信息
    #[serde(default)]
    pub dns: DnsConfig,

    /// 滤波模型配置
    #[serde(default)]
    pub filtering: FilterConfig,

    /// 时间积分配置
    #[serde(default)]
    pub time: TimeConfig,

    /// 输出配置
    #[serde(default)]
    pub output: OutputConfig,
}

/// 底层 DNS 模拟信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// 雷诺数
    #[serde(default = "default_reynolds_n")]
    pub reynolds_n: f64,

    /// 出流边界标号
    #[serde(default = "default_outflow_label")]
    pub outflow_label: u32,

    /// 有限元阶数
    #[serde(default = "default_fe_order")]
    pub fe_order: u32,

    /// 是否对自由度做 Cuthill-McKee 重编号
    #[serde(default)]
    pub renumber: bool,
}

fn default_reynolds_n() -> f64 {
    50.0
}
fn default_outflow_label() -> u32 {
    3
}
fn default_fe_order() -> u32 {
    2
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            reynolds_n: default_reynolds_n(),
            outflow_label: default_outflow_label(),
            fe_order: default_fe_order(),
            renumber: false,
        }
    }
}

/// 滤波模型配置
///
/// 每次运行恰好激活一种模型；未被激活模型使用的参数被忽略。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// 滤波模型
    #[serde(default)]
    pub filter_model: FilterModel,

    /// 近似反卷积模型中随机噪声向量的放大系数
    #[serde(default)]
    pub noise_multiplier: f64,

    /// Lavrentiev 正则化参数
    #[serde(default)]
    pub lavrentiev_parameter: f64,

    /// 微分/后置滤波的滤波半径
    #[serde(default)]
    pub filter_radius: f64,

    /// L2 投影滤波的截断模态数
    #[serde(default = "default_cutoff_n")]
    pub cutoff_n: usize,

    /// 是否对中心化轨迹（均值贡献项）也施加滤波
    #[serde(default)]
    pub filter_mean: bool,

    /// 噪声向量的随机种子（保证参数扫描可复现）
    #[serde(default)]
    pub noise_seed: u64,
}

fn default_cutoff_n() -> usize {
    5
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            filter_model: FilterModel::default(),
            noise_multiplier: 0.0,
            lavrentiev_parameter: 0.0,
            filter_radius: 0.0,
            cutoff_n: default_cutoff_n(),
            filter_mean: false,
            noise_seed: 0,
        }
    }
}

/// 时间积分配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// 初始时间
    #[serde(default = "default_initial_time")]
    pub initial_time: f64,

    /// 终止时间
    #[serde(default = "default_final_time")]
    pub final_time: f64,

    /// 时间步长
    #[serde(default = "default_time_step")]
    pub time_step: f64,

    /// 显式积分格式
    #[serde(default)]
    pub scheme: IntegratorScheme,
}

fn default_initial_time() -> f64 {
    30.0
}
fn default_final_time() -> f64 {
    500.0
}
fn default_time_step() -> f64 {
    1.0e-4
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            initial_time: default_initial_time(),
            final_time: default_final_time(),
            time_step: default_time_step(),
            scheme: IntegratorScheme::default(),
        }
    }
}

/// 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 图形输出的单元细分级别
    #[serde(default = "default_patch_refinement")]
    pub patch_refinement: u32,

    /// 开始保存物理空间快照的时间
    #[serde(default = "default_plot_time_start")]
    pub plot_time_start: f64,

    /// 停止保存物理空间快照的时间
    #[serde(default = "default_plot_time_stop")]
    pub plot_time_stop: f64,

    /// 每隔多少个时间步记录一次输出
    #[serde(default = "default_output_interval")]
    pub output_interval: usize,

    /// 是否保存物理空间快照（开销很大）
    #[serde(default)]
    pub save_plot_pictures: bool,

    /// 输出目录
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
}

fn default_patch_refinement() -> u32 {
    2
}
fn default_plot_time_start() -> f64 {
    100.0
}
fn default_plot_time_stop() -> f64 {
    110.0
}
fn default_output_interval() -> usize {
    10
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            patch_refinement: default_patch_refinement(),
            plot_time_start: default_plot_time_start(),
            plot_time_stop: default_plot_time_stop(),
            output_interval: default_output_interval(),
            save_plot_pictures: false,
            directory: default_output_dir(),
        }
    }
}

impl RomConfig {
    /// 从 JSON 文件加载配置并验证
    ///
    /// # 参数
    /// - `path`: 配置文件路径
    ///
    /// # 返回
    /// 验证通过的配置；任何解析或取值范围错误都在此处失败，
    /// 不会进入算子装配阶段。
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;

        let config: RomConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dns.reynolds_n <= 0.0 {
            return Err(ConfigError::invalid(
                "dns.reynolds_n",
                self.dns.reynolds_n,
                "雷诺数必须为正",
            ));
        }

        if self.time.time_step <= 0.0 {
            return Err(ConfigError::invalid(
                "time.time_step",
                self.time.time_step,
                "时间步长必须为正",
            ));
        }

        if self.output.output_interval == 0 {
            return Err(ConfigError::invalid(
                "output.output_interval",
                0,
                "输出间隔为零会导致保存步数计算除零",
            ));
        }

        if self.filtering.noise_multiplier < 0.0 {
            return Err(ConfigError::invalid(
                "filtering.noise_multiplier",
                self.filtering.noise_multiplier,
                "噪声系数不能为负",
            ));
        }

        if self.filtering.lavrentiev_parameter < 0.0 {
            return Err(ConfigError::invalid(
                "filtering.lavrentiev_parameter",
                self.filtering.lavrentiev_parameter,
                "正则化参数不能为负",
            ));
        }

        if self.filtering.filter_radius < 0.0 {
            return Err(ConfigError::invalid(
                "filtering.filter_radius",
                self.filtering.filter_radius,
                "滤波半径不能为负",
            ));
        }

        if self.output.plot_time_stop < self.output.plot_time_start {
            return Err(ConfigError::invalid(
                "output.plot_time_stop",
                self.output.plot_time_stop,
                "快照窗口终点不能早于起点",
            ));
        }

        Ok(())
    }

    /// 保存配置到 JSON 文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }
}
