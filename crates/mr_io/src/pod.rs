// crates/mr_io/src/pod.rs

//! POD 基底与投影产物的加载
//!
//! 上游基底阶段的产物以文件集合的形式组织在一个目录下：
//!
//! - `mean-vector.mrbv`: 平均流（分块向量）
//! - `pod-vector-*.mrbv`: POD 模态，按文件名字典序即模态序
//! - `mass.mrmx` / `laplace.mrmx` / `boundary.mrmx`: 降阶矩阵
//! - `convection-0.mrmx` / `convection-1.mrmx`: 对流矩阵
//! - `nonlinearity-*.mrmx`: 非线性张量分量，按文件名字典序
//! - `mean-contribution.mrmx`: 平均流贡献向量（r×1 矩阵）
//! - `initial-condition.mrmx`: 初始降阶系数（r×1 矩阵）
//!
//! 分块向量格式 (MRBV v1)：
//!
//! ```text
//! [魔数: 4 bytes] "MRBV"
//! [版本: u32]
//! [块数: u64]
//! [各块长度: n_blocks * u64]
//! [各块数据: f64...] (逐块连续)
//! [CRC32: u32]
//! ```

use std::path::{Path, PathBuf};

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info};

use mr_rom::PodProjections;

use crate::error::{IoError, IoResult};
use crate::matrix::{
    load_matrix, read_f64, read_u32, read_u64, read_verified, write_atomic,
};

/// 分块向量文件格式版本
const BLOCK_VECTOR_VERSION: u32 = 1;

/// 分块向量魔数
const BLOCK_VECTOR_MAGIC: &[u8; 4] = b"MRBV";

/// 分块向量
///
/// 每个速度分量一块，块长度可以不同（混合有限元空间）。
#[derive(Debug, Clone, PartialEq)]
pub struct BlockVector {
    /// 分量块
    pub blocks: Vec<DVector<f64>>,
}

impl BlockVector {
    /// 由分量块构造
    pub fn new(blocks: Vec<DVector<f64>>) -> Self {
        Self { blocks }
    }

    /// 块数
    pub fn n_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// 总自由度数
    pub fn total_len(&self) -> usize {
        self.blocks.iter().map(|b| b.len()).sum()
    }

    /// 与另一向量的块结构是否一致
    pub fn same_structure(&self, other: &Self) -> bool {
        self.n_blocks() == other.n_blocks()
            && self
                .blocks
                .iter()
                .zip(&other.blocks)
                .all(|(a, b)| a.len() == b.len())
    }

    /// 保存到文件
    pub fn save(&self, path: &Path) -> IoResult<()> {
        let mut data = Vec::new();
        data.extend_from_slice(BLOCK_VECTOR_MAGIC);
        data.extend_from_slice(&BLOCK_VECTOR_VERSION.to_le_bytes());
        data.extend_from_slice(&(self.n_blocks() as u64).to_le_bytes());
        for block in &self.blocks {
            data.extend_from_slice(&(block.len() as u64).to_le_bytes());
        }
        for block in &self.blocks {
            for &value in block.iter() {
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
        write_atomic(path, &data)?;
        debug!(path = %path.display(), n_blocks = self.n_blocks(), "分块向量已保存");
        Ok(())
    }

    /// 从文件加载
    pub fn load(path: &Path) -> IoResult<Self> {
        let data = read_verified(path)?;
        let mut offset = 0;

        let magic = data
            .get(0..4)
            .ok_or_else(|| IoError::corrupted(path.display().to_string(), "文件被截断"))?;
        if magic != BLOCK_VECTOR_MAGIC {
            return Err(IoError::UnknownFormat {
                path: path.display().to_string(),
                expected: "MRBV",
            });
        }
        offset += 4;

        let version = read_u32(&data, &mut offset, path)?;
        if version > BLOCK_VECTOR_VERSION {
            return Err(IoError::Version {
                file: version,
                current: BLOCK_VECTOR_VERSION,
            });
        }

        let n_blocks = read_u64(&data, &mut offset, path)? as usize;
        let mut lengths = Vec::with_capacity(n_blocks);
        for _ in 0..n_blocks {
            lengths.push(read_u64(&data, &mut offset, path)? as usize);
        }

        let total: usize = lengths.iter().sum();
        let expected_len = offset + total * 8;
        if data.len() != expected_len {
            return Err(IoError::corrupted(
                path.display().to_string(),
                format!("数据长度不符: 期望 {expected_len}, 实际 {}", data.len()),
            ));
        }

        let mut blocks = Vec::with_capacity(n_blocks);
        for len in lengths {
            let mut block = DVector::zeros(len);
            for value in block.iter_mut() {
                *value = read_f64(&data, &mut offset, path)?;
            }
            blocks.push(block);
        }
        Ok(Self { blocks })
    }
}

/// 列出目录下匹配 `前缀*后缀` 的文件，按文件名字典序排序
///
/// 文件名字典序即模态序/分量序的约定由上游写出端保证（序号零填充）。
pub fn list_artifacts(directory: &Path, prefix: &str, suffix: &str) -> IoResult<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(directory).map_err(|e| IoError::io(directory.display().to_string(), e))?;

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| IoError::io(directory.display().to_string(), e))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(prefix) && name.ends_with(suffix) {
            matches.push(path);
        }
    }
    matches.sort();
    Ok(matches)
}

/// POD 基底：平均流 + 模态集合
#[derive(Debug, Clone)]
pub struct PodBasis {
    /// 平均流
    pub mean: BlockVector,
    /// POD 模态，按能量序
    pub modes: Vec<BlockVector>,
}

impl PodBasis {
    /// 降阶维数 r
    pub fn n_modes(&self) -> usize {
        self.modes.len()
    }

    /// 由降阶系数提升到全阶分块向量: mean + Σ x_k·φ_k
    pub fn lift(&self, coefficients: &DVector<f64>) -> IoResult<BlockVector> {
        if coefficients.len() != self.n_modes() {
            return Err(IoError::IncompleteBasis {
                reason: format!(
                    "系数长度 {} 与模态数 {} 不一致",
                    coefficients.len(),
                    self.n_modes()
                ),
            });
        }
        let mut lifted = self.mean.clone();
        for (k, mode) in self.modes.iter().enumerate() {
            for (block, mode_block) in lifted.blocks.iter_mut().zip(&mode.blocks) {
                block.axpy(coefficients[k], mode_block, 1.0);
            }
        }
        Ok(lifted)
    }
}

/// 从目录加载 POD 基底
///
/// 平均流取 `mean-vector.mrbv`，模态取 `pod-vector-*.mrbv` 并按
/// 文件名排序。所有向量的块结构必须一致。
pub fn load_pod_basis(directory: &Path) -> IoResult<PodBasis> {
    let mean_path = directory.join("mean-vector.mrbv");
    let mean = BlockVector::load(&mean_path)?;

    let mode_paths = list_artifacts(directory, "pod-vector", ".mrbv")?;
    if mode_paths.is_empty() {
        return Err(IoError::IncompleteBasis {
            reason: format!("{} 下没有 pod-vector-*.mrbv", directory.display()),
        });
    }

    let mut modes = Vec::with_capacity(mode_paths.len());
    for path in &mode_paths {
        let mode = BlockVector::load(path)?;
        if !mode.same_structure(&mean) {
            return Err(IoError::IncompleteBasis {
                reason: format!("{} 的块结构与平均流不一致", path.display()),
            });
        }
        modes.push(mode);
    }

    info!(
        directory = %directory.display(),
        n_modes = modes.len(),
        n_dofs = mean.total_len(),
        "POD 基底加载完成"
    );
    Ok(PodBasis { mean, modes })
}

/// 从目录加载已投影的降阶矩阵集合
pub fn load_projections(directory: &Path) -> IoResult<PodProjections> {
    let mass = load_matrix(&directory.join("mass.mrmx"))?;
    let laplace = load_matrix(&directory.join("laplace.mrmx"))?;
    let boundary = load_matrix(&directory.join("boundary.mrmx"))?;
    let convection_0 = load_matrix(&directory.join("convection-0.mrmx"))?;
    let convection_1 = load_matrix(&directory.join("convection-1.mrmx"))?;

    let tensor_paths = list_artifacts(directory, "nonlinearity", ".mrmx")?;
    if tensor_paths.is_empty() {
        return Err(IoError::IncompleteBasis {
            reason: format!("{} 下没有 nonlinearity-*.mrmx", directory.display()),
        });
    }
    let mut nonlinearity = Vec::with_capacity(tensor_paths.len());
    for path in &tensor_paths {
        nonlinearity.push(load_matrix(path)?);
    }

    let mean_contribution = load_column_vector(&directory.join("mean-contribution.mrmx"))?;

    info!(
        directory = %directory.display(),
        n_dofs = mass.nrows(),
        "降阶矩阵集合加载完成"
    );
    Ok(PodProjections {
        mass,
        laplace,
        boundary,
        convection_0,
        convection_1,
        nonlinearity,
        mean_contribution,
    })
}

/// 加载初始降阶系数
pub fn load_initial_condition(directory: &Path) -> IoResult<DVector<f64>> {
    load_column_vector(&directory.join("initial-condition.mrmx"))
}

/// 读取以 n×1 矩阵存储的向量
fn load_column_vector(path: &Path) -> IoResult<DVector<f64>> {
    let matrix = load_matrix(path)?;
    if matrix.ncols() != 1 {
        return Err(IoError::corrupted(
            path.display().to_string(),
            format!("期望单列矩阵, 实际 {} 列", matrix.ncols()),
        ));
    }
    Ok(matrix.column(0).into_owned())
}

/// 把全阶快照投影为降阶系数
///
/// 第 s 行第 k 列为第 s 个（中心化后的）快照与第 k 个模态的
/// 质量加权内积，逐块累加：
///
/// ```text
/// coeff(s, k) = Σ_d  (M_d·(snapshot_d − mean_d)) · φ_k,d
/// ```
///
/// # 参数
/// - `mass_blocks`: 各分量块的全阶质量矩阵
/// - `basis`: POD 基底
/// - `snapshots`: 全阶快照集合
pub fn project_snapshots(
    mass_blocks: &[DMatrix<f64>],
    basis: &PodBasis,
    snapshots: &[BlockVector],
) -> IoResult<DMatrix<f64>> {
    let n_blocks = basis.mean.n_blocks();
    if mass_blocks.len() != n_blocks {
        return Err(IoError::IncompleteBasis {
            reason: format!(
                "质量矩阵块数 {} 与基底块数 {n_blocks} 不一致",
                mass_blocks.len()
            ),
        });
    }

    let r = basis.n_modes();
    let mut coefficients = DMatrix::zeros(snapshots.len(), r);

    for (s, snapshot) in snapshots.iter().enumerate() {
        if !snapshot.same_structure(&basis.mean) {
            return Err(IoError::IncompleteBasis {
                reason: format!("快照 {s} 的块结构与基底不一致"),
            });
        }
        for d in 0..n_blocks {
            let centered = &snapshot.blocks[d] - &basis.mean.blocks[d];
            let weighted = &mass_blocks[d] * centered;
            for k in 0..r {
                coefficients[(s, k)] += weighted.dot(&basis.modes[k].blocks[d]);
            }
        }
    }
    Ok(coefficients)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mr_io_pod_{}_{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn block_vector(values: &[Vec<f64>]) -> BlockVector {
        BlockVector::new(
            values
                .iter()
                .map(|v| DVector::from_column_slice(v))
                .collect(),
        )
    }

    #[test]
    fn test_block_vector_round_trip() {
        let dir = temp_dir("roundtrip");
        let path = dir.join("vector.mrbv");
        let vector = block_vector(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0]]);

        vector.save(&path).unwrap();
        let loaded = BlockVector::load(&path).unwrap();

        assert_eq!(loaded, vector);
        assert_eq!(loaded.total_len(), 5);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_list_artifacts_sorted() {
        let dir = temp_dir("list");
        for name in ["pod-vector-0002.mrbv", "pod-vector-0000.mrbv", "pod-vector-0001.mrbv"] {
            block_vector(&[vec![1.0]]).save(&dir.join(name)).unwrap();
        }
        // 干扰文件
        std::fs::write(dir.join("notes.txt"), b"x").unwrap();

        let found = list_artifacts(&dir, "pod-vector", ".mrbv").unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "pod-vector-0000.mrbv",
                "pod-vector-0001.mrbv",
                "pod-vector-0002.mrbv"
            ]
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_pod_basis() {
        let dir = temp_dir("basis");
        block_vector(&[vec![1.0, 1.0], vec![0.5]])
            .save(&dir.join("mean-vector.mrbv"))
            .unwrap();
        block_vector(&[vec![1.0, 0.0], vec![0.0]])
            .save(&dir.join("pod-vector-0000.mrbv"))
            .unwrap();
        block_vector(&[vec![0.0, 1.0], vec![0.0]])
            .save(&dir.join("pod-vector-0001.mrbv"))
            .unwrap();

        let basis = load_pod_basis(&dir).unwrap();
        assert_eq!(basis.n_modes(), 2);
        assert_eq!(basis.mean.total_len(), 3);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_basis_structure_mismatch_rejected() {
        let dir = temp_dir("mismatch");
        block_vector(&[vec![1.0, 1.0]])
            .save(&dir.join("mean-vector.mrbv"))
            .unwrap();
        block_vector(&[vec![1.0, 0.0, 0.0]])
            .save(&dir.join("pod-vector-0000.mrbv"))
            .unwrap();

        let err = load_pod_basis(&dir).unwrap_err();
        assert!(matches!(err, IoError::IncompleteBasis { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_lift_combines_mean_and_modes() {
        let basis = PodBasis {
            mean: block_vector(&[vec![1.0, 1.0]]),
            modes: vec![
                block_vector(&[vec![1.0, 0.0]]),
                block_vector(&[vec![0.0, 1.0]]),
            ],
        };
        let lifted = basis.lift(&DVector::from_vec(vec![2.0, 3.0])).unwrap();
        assert_eq!(lifted.blocks[0][0], 3.0);
        assert_eq!(lifted.blocks[0][1], 4.0);

        assert!(basis.lift(&DVector::zeros(3)).is_err());
    }

    #[test]
    fn test_project_snapshots_orthonormal_basis() {
        // 单位质量矩阵 + 正交基底: 投影恢复展开系数
        let basis = PodBasis {
            mean: block_vector(&[vec![0.5, 0.5]]),
            modes: vec![
                block_vector(&[vec![1.0, 0.0]]),
                block_vector(&[vec![0.0, 1.0]]),
            ],
        };
        let mass = vec![DMatrix::identity(2, 2)];
        // snapshot = mean + 2·φ0 − 1·φ1
        let snapshot = block_vector(&[vec![2.5, -0.5]]);

        let coeff = project_snapshots(&mass, &basis, &[snapshot]).unwrap();
        assert!((coeff[(0, 0)] - 2.0).abs() < 1e-14);
        assert!((coeff[(0, 1)] + 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_load_projections_round_trip() {
        use crate::matrix::save_matrix;

        let dir = temp_dir("projections");
        let n = 2;
        let eye = DMatrix::identity(n, n);
        save_matrix(&dir.join("mass.mrmx"), &eye).unwrap();
        save_matrix(&dir.join("laplace.mrmx"), &(&eye * 2.0)).unwrap();
        save_matrix(&dir.join("boundary.mrmx"), &(&eye * 0.1)).unwrap();
        save_matrix(&dir.join("convection-0.mrmx"), &(&eye * 0.2)).unwrap();
        save_matrix(&dir.join("convection-1.mrmx"), &(&eye * 0.3)).unwrap();
        save_matrix(&dir.join("nonlinearity-0000.mrmx"), &(&eye * 0.4)).unwrap();
        save_matrix(&dir.join("nonlinearity-0001.mrmx"), &(&eye * 0.5)).unwrap();
        save_matrix(
            &dir.join("mean-contribution.mrmx"),
            &DMatrix::from_column_slice(n, 1, &[1.0, -1.0]),
        )
        .unwrap();
        save_matrix(
            &dir.join("initial-condition.mrmx"),
            &DMatrix::from_column_slice(n, 1, &[0.7, 0.3]),
        )
        .unwrap();

        let projections = load_projections(&dir).unwrap();
        assert_eq!(projections.nonlinearity.len(), 2);
        assert!((projections.laplace[(0, 0)] - 2.0).abs() < 1e-14);
        assert!((projections.mean_contribution[1] + 1.0).abs() < 1e-14);

        let initial = load_initial_condition(&dir).unwrap();
        assert!((initial[0] - 0.7).abs() < 1e-14);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
