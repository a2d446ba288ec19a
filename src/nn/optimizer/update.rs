/*
 * @Description  : 优化器接收的更新量：稠密更新（与参数同形的张量）或稀疏更新（若干行及其行索引）
 */

use std::collections::{HashMap, HashSet};

use crate::errors::{NnError, TensorError};
use crate::nn::Parameter;
use crate::tensor::{DType, Tensor};

/// 稀疏更新：`values`的第i行对应参数首维的第`indices[i]`行，
/// `dense_shape`为其对应的稠密形状（须与参数形状一致）
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedSlices {
    pub values: Tensor,
    pub indices: Vec<usize>,
    pub dense_shape: Vec<usize>,
}

impl IndexedSlices {
    pub fn new(values: Tensor, indices: Vec<usize>, dense_shape: Vec<usize>) -> Self {
        Self {
            values,
            indices,
            dense_shape,
        }
    }

    pub fn has_duplicates(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.indices.len());
        !self.indices.iter().all(|index| seen.insert(*index))
    }

    /// 合并重复索引：同一行的多个更新按元素求和，索引保持首次出现的顺序。
    /// 无重复时原样克隆返回。
    pub fn deduplicate(&self) -> Result<IndexedSlices, TensorError> {
        if !self.has_duplicates() {
            return Ok(self.clone());
        }
        let mut unique = Vec::new();
        let mut slots = HashMap::new();
        let segment_ids = self
            .indices
            .iter()
            .map(|&index| {
                *slots.entry(index).or_insert_with(|| {
                    unique.push(index);
                    unique.len() - 1
                })
            })
            .collect::<Vec<_>>();
        let values = self.values.unsorted_segment_sum(&segment_ids, unique.len())?;
        Ok(IndexedSlices::new(values, unique, self.dense_shape.clone()))
    }
}

/// 单个参数的更新量
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Dense(Tensor),
    Sparse(IndexedSlices),
}

impl Update {
    pub fn dtype(&self) -> DType {
        match self {
            Self::Dense(tensor) => tensor.dtype(),
            Self::Sparse(slices) => slices.values.dtype(),
        }
    }
}

impl From<Tensor> for Update {
    fn from(tensor: Tensor) -> Self {
        Self::Dense(tensor)
    }
}

impl From<IndexedSlices> for Update {
    fn from(slices: IndexedSlices) -> Self {
        Self::Sparse(slices)
    }
}

/// 在修改任何参数之前，检查整批更新与参数是否匹配：
/// 先查数量与空列表，再逐对查dtype，最后逐对查形状与行索引。
pub(crate) fn check_updates_parameters(
    updates: &[Option<Update>],
    parameters: &[Parameter],
) -> Result<(), NnError> {
    if updates.len() != parameters.len() {
        return Err(NnError::LengthMismatch {
            updates: updates.len(),
            parameters: parameters.len(),
        });
    }
    if parameters.is_empty() {
        return Err(NnError::EmptyParameters);
    }

    let pairs = || {
        updates
            .iter()
            .zip(parameters)
            .filter_map(|(update, parameter)| update.as_ref().map(|u| (u, parameter)))
    };

    for (update, parameter) in pairs() {
        if update.dtype() != parameter.dtype() {
            return Err(NnError::DTypeMismatch {
                parameter: parameter.name().to_string(),
                update: update.dtype(),
                expected: parameter.dtype(),
            });
        }
    }

    for (update, parameter) in pairs() {
        let expected = parameter.shape();
        match update {
            Update::Dense(grad) => {
                if grad.shape() != expected.as_slice() {
                    return Err(NnError::ShapeMismatch {
                        parameter: parameter.name().to_string(),
                        update: grad.shape().to_vec(),
                        expected,
                    });
                }
            }
            Update::Sparse(slices) => check_sparse(slices, parameter, expected)?,
        }
    }
    Ok(())
}

fn check_sparse(
    slices: &IndexedSlices,
    parameter: &Parameter,
    expected: Vec<usize>,
) -> Result<(), NnError> {
    if slices.dense_shape != expected {
        return Err(NnError::ShapeMismatch {
            parameter: parameter.name().to_string(),
            update: slices.dense_shape.clone(),
            expected,
        });
    }
    let Some(&rows) = expected.first() else {
        return Err(TensorError::RowOpNeedAtLeast1Dim.into());
    };
    let value = parameter.borrow();
    let rows_shape = value.rows_shape(slices.indices.len());
    if slices.values.shape() != rows_shape.as_slice() {
        return Err(NnError::ShapeMismatch {
            parameter: parameter.name().to_string(),
            update: slices.values.shape().to_vec(),
            expected: rows_shape,
        });
    }
    if let Some(&index) = slices.indices.iter().find(|&&index| index >= rows) {
        return Err(TensorError::IndexOutOfRange { index, len: rows }.into());
    }
    Ok(())
}
