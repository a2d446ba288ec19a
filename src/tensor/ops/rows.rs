/*
 * @Description  : 沿首维（axis 0）按索引读写若干行，是稀疏更新（按行散射）所需的基本操作
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use ndarray::{Array, Axis, IxDyn};

impl Tensor {
    /// 按`indices`从首维取出若干行，结果形状为`[indices.len(), ..行形状]`
    pub fn gather_rows(&self, indices: &[usize]) -> Result<Tensor, TensorError> {
        self.check_row_indices(indices)?;
        Ok(self.with_data(self.data.select(Axis(0), indices)))
    }

    /// 将`rows`的第i行写回到本张量首维的第`indices[i]`行，未被索引的行保持不变。
    /// 若`indices`中有重复，后出现的行覆盖先出现的。
    pub fn scatter_rows(&mut self, indices: &[usize], rows: &Tensor) -> Result<(), TensorError> {
        self.check_row_indices(indices)?;
        if self.dtype != rows.dtype {
            return Err(TensorError::DTypeError {
                operator: Operator::Scatter,
                dtype1: self.dtype,
                dtype2: rows.dtype,
            });
        }
        let expected = self.rows_shape(indices.len());
        if rows.shape() != expected.as_slice() {
            return Err(TensorError::RowShapeMismatch {
                expected,
                got: rows.shape().to_vec(),
            });
        }
        for (i, &index) in indices.iter().enumerate() {
            self.data
                .index_axis_mut(Axis(0), index)
                .assign(&rows.data.index_axis(Axis(0), i));
        }
        Ok(())
    }

    /// 首维替换为`n`后的形状，即`n`行数据应有的形状
    pub fn rows_shape(&self, n: usize) -> Vec<usize> {
        let mut shape = self.shape().to_vec();
        if let Some(first) = shape.first_mut() {
            *first = n;
        }
        shape
    }

    pub(in crate::tensor) fn check_row_indices(&self, indices: &[usize]) -> Result<(), TensorError> {
        let Some(&len) = self.shape().first() else {
            return Err(TensorError::RowOpNeedAtLeast1Dim);
        };
        match indices.iter().find(|&&index| index >= len) {
            Some(&index) => Err(TensorError::IndexOutOfRange { index, len }),
            None => Ok(()),
        }
    }
}

impl Tensor {
    /// 将第i行累加到结果的第`segment_ids[i]`行，结果共`num_segments`行，未被引用的行为零。
    /// 用于合并稀疏更新中重复索引对应的行。
    pub fn unsorted_segment_sum(
        &self,
        segment_ids: &[usize],
        num_segments: usize,
    ) -> Result<Tensor, TensorError> {
        let Some(&rows) = self.shape().first() else {
            return Err(TensorError::RowOpNeedAtLeast1Dim);
        };
        if segment_ids.len() != rows {
            return Err(TensorError::SegmentIdsMismatch {
                ids: segment_ids.len(),
                rows,
            });
        }
        let mut data = Array::zeros(IxDyn(&self.rows_shape(num_segments)));
        for (i, &id) in segment_ids.iter().enumerate() {
            if id >= num_segments {
                return Err(TensorError::SegmentIdOutOfRange { id, num_segments });
            }
            let mut row = data.index_axis_mut(Axis(0), id);
            row += &self.data.index_axis(Axis(0), i);
        }
        Ok(self.with_data(data))
    }
}
