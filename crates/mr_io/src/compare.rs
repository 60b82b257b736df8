// crates/mr_io/src/compare.rs

//! 数值产物比较辅助
//!
//! 回归测试与产物校验用的带容差逐元素比较。

use nalgebra::{DMatrix, DVector};

use crate::pod::BlockVector;

/// 向量逐元素比较
pub fn vectors_equal(left: &DVector<f64>, right: &DVector<f64>, tolerance: f64) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right.iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
}

/// 矩阵逐元素比较
pub fn matrices_equal(left: &DMatrix<f64>, right: &DMatrix<f64>, tolerance: f64) -> bool {
    left.nrows() == right.nrows()
        && left.ncols() == right.ncols()
        && left
            .iter()
            .zip(right.iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
}

/// 分块向量逐块比较
pub fn block_vectors_equal(left: &BlockVector, right: &BlockVector, tolerance: f64) -> bool {
    left.same_structure(right)
        && left
            .blocks
            .iter()
            .zip(&right.blocks)
            .all(|(a, b)| vectors_equal(a, b, tolerance))
}
