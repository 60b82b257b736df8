// crates/mr_io/src/matrix.rs

//! 稠密矩阵二进制格式
//!
//! 轨迹矩阵与降阶算子的落盘格式，小端序。
//!
//! # 文件格式 (v1)
//!
//! ```text
//! [魔数: 4 bytes] "MRMX"
//! [版本: u32]
//! [行数: u64]
//! [列数: u64]
//! [数据: n_rows * n_cols * f64] (行优先)
//! [CRC32: u32]
//! ```
//!
//! 写入走临时文件 + 原子重命名，崩溃不会留下半写的产物。

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use nalgebra::DMatrix;
use tracing::debug;

use crate::error::{IoError, IoResult};

/// 矩阵文件格式版本
const MATRIX_VERSION: u32 = 1;

/// 矩阵文件魔数
const MATRIX_MAGIC: &[u8; 4] = b"MRMX";

/// 生成 CRC32 查找表（编译期计算）
const fn generate_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = 0xEDB88320 ^ (crc >> 1);
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// CRC32 查找表（IEEE 多项式，编译期生成）
const CRC32_TABLE: [u32; 256] = generate_crc32_table();

/// 计算 CRC32 校验和
pub(crate) fn compute_crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFFFFFFu32;
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = CRC32_TABLE[index] ^ (crc >> 8);
    }
    !crc
}

pub(crate) fn read_u32(data: &[u8], offset: &mut usize, path: &Path) -> IoResult<u32> {
    let end = *offset + 4;
    let bytes = data
        .get(*offset..end)
        .ok_or_else(|| IoError::corrupted(path.display().to_string(), "文件被截断"))?;
    *offset = end;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(crate) fn read_u64(data: &[u8], offset: &mut usize, path: &Path) -> IoResult<u64> {
    let end = *offset + 8;
    let bytes = data
        .get(*offset..end)
        .ok_or_else(|| IoError::corrupted(path.display().to_string(), "文件被截断"))?;
    *offset = end;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(buf))
}

pub(crate) fn read_f64(data: &[u8], offset: &mut usize, path: &Path) -> IoResult<f64> {
    let bits = read_u64(data, offset, path)?;
    Ok(f64::from_bits(bits))
}

/// 读取整个文件并剥离、验证末尾的 CRC32
pub(crate) fn read_verified(path: &Path) -> IoResult<Vec<u8>> {
    let file = File::open(path).map_err(|e| IoError::io(path.display().to_string(), e))?;
    let mut reader = BufReader::new(file);
    let mut all_data = Vec::new();
    reader
        .read_to_end(&mut all_data)
        .map_err(|e| IoError::io(path.display().to_string(), e))?;

    if all_data.len() < 12 {
        return Err(IoError::corrupted(path.display().to_string(), "文件太小"));
    }

    let crc_offset = all_data.len() - 4;
    let stored_crc = u32::from_le_bytes([
        all_data[crc_offset],
        all_data[crc_offset + 1],
        all_data[crc_offset + 2],
        all_data[crc_offset + 3],
    ]);
    let computed_crc = compute_crc32(&all_data[..crc_offset]);
    if stored_crc != computed_crc {
        return Err(IoError::Checksum {
            path: path.display().to_string(),
            expected: stored_crc,
            found: computed_crc,
        });
    }

    all_data.truncate(crc_offset);
    Ok(all_data)
}

/// 原子写入：临时文件 + 重命名
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> IoResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| IoError::io(path.display().to_string(), e))?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let file =
            File::create(&temp_path).map_err(|e| IoError::io(temp_path.display().to_string(), e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(data)
            .map_err(|e| IoError::io(temp_path.display().to_string(), e))?;
        let crc = compute_crc32(data);
        writer
            .write_all(&crc.to_le_bytes())
            .map_err(|e| IoError::io(temp_path.display().to_string(), e))?;
        writer
            .flush()
            .map_err(|e| IoError::io(temp_path.display().to_string(), e))?;
    }
    std::fs::rename(&temp_path, path).map_err(|e| IoError::io(path.display().to_string(), e))?;
    Ok(())
}

/// 保存稠密矩阵
pub fn save_matrix(path: &Path, matrix: &DMatrix<f64>) -> IoResult<()> {
    let n_rows = matrix.nrows();
    let n_cols = matrix.ncols();

    let mut data = Vec::with_capacity(28 + n_rows * n_cols * 8);
    data.extend_from_slice(MATRIX_MAGIC);
    data.extend_from_slice(&MATRIX_VERSION.to_le_bytes());
    data.extend_from_slice(&(n_rows as u64).to_le_bytes());
    data.extend_from_slice(&(n_cols as u64).to_le_bytes());
    for i in 0..n_rows {
        for j in 0..n_cols {
            data.extend_from_slice(&matrix[(i, j)].to_le_bytes());
        }
    }

    write_atomic(path, &data)?;
    debug!(path = %path.display(), n_rows, n_cols, "矩阵已保存");
    Ok(())
}

/// 加载稠密矩阵
pub fn load_matrix(path: &Path) -> IoResult<DMatrix<f64>> {
    let data = read_verified(path)?;
    let mut offset = 0;

    let magic = data
        .get(0..4)
        .ok_or_else(|| IoError::corrupted(path.display().to_string(), "文件被截断"))?;
    if magic != MATRIX_MAGIC {
        return Err(IoError::UnknownFormat {
            path: path.display().to_string(),
            expected: "MRMX",
        });
    }
    offset += 4;

    let version = read_u32(&data, &mut offset, path)?;
    if version > MATRIX_VERSION {
        return Err(IoError::Version {
            file: version,
            current: MATRIX_VERSION,
        });
    }

    let n_rows = read_u64(&data, &mut offset, path)? as usize;
    let n_cols = read_u64(&data, &mut offset, path)? as usize;

    let expected_len = offset + n_rows * n_cols * 8;
    if data.len() != expected_len {
        return Err(IoError::corrupted(
            path.display().to_string(),
            format!("数据长度不符: 期望 {expected_len}, 实际 {}", data.len()),
        ));
    }

    let mut matrix = DMatrix::zeros(n_rows, n_cols);
    for i in 0..n_rows {
        for j in 0..n_cols {
            matrix[(i, j)] = read_f64(&data, &mut offset, path)?;
        }
    }
    Ok(matrix)
}
