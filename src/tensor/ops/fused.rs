/*
 * @Description  : 融合的逐元素就地更新：在一次遍历中同时改写本张量与一个状态张量，
 *                 避免为每个中间结果分配新张量（供优化器的融合实现使用）
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::{DType, Tensor};
use ndarray::{ArrayViewD, ArrayViewMutD, Axis, Zip};

impl Tensor {
    /// 对三者的对应元素调用`f(&mut self_i, &mut state_i, input_i)`，三者形状须完全一致
    pub fn zip_update<F>(&mut self, state: &mut Tensor, input: &Tensor, f: F) -> Result<(), TensorError>
    where
        F: FnMut(&mut f64, &mut f64, f64),
    {
        for other in [&*state, input] {
            if !self.is_same_shape(other) {
                return Err(TensorError::OperatorError {
                    operator: Operator::SubAssign,
                    tensor1_shape: self.shape().to_vec(),
                    tensor2_shape: other.shape().to_vec(),
                });
            }
        }
        let (self_dtype, state_dtype) = (self.dtype, state.dtype);
        zip_rounded(
            self.data.view_mut(),
            state.data.view_mut(),
            input.data.view(),
            (self_dtype, state_dtype),
            f,
        );
        Ok(())
    }

    /// `zip_update`的按行版本：只更新首维中`indices`所指的行，
    /// `rows`的第i行对应`indices[i]`，其余行保持不变
    pub fn zip_update_rows<F>(
        &mut self,
        state: &mut Tensor,
        indices: &[usize],
        rows: &Tensor,
        mut f: F,
    ) -> Result<(), TensorError>
    where
        F: FnMut(&mut f64, &mut f64, f64),
    {
        self.check_row_indices(indices)?;
        if !self.is_same_shape(state) {
            return Err(TensorError::OperatorError {
                operator: Operator::SubAssign,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: state.shape().to_vec(),
            });
        }
        let expected = self.rows_shape(indices.len());
        if rows.shape() != expected.as_slice() {
            return Err(TensorError::RowShapeMismatch {
                expected,
                got: rows.shape().to_vec(),
            });
        }
        let dtypes = (self.dtype, state.dtype);
        for (i, &index) in indices.iter().enumerate() {
            zip_rounded(
                self.data.index_axis_mut(Axis(0), index),
                state.data.index_axis_mut(Axis(0), index),
                rows.data.index_axis(Axis(0), i),
                dtypes,
                &mut f,
            );
        }
        Ok(())
    }
}

fn zip_rounded<F>(
    target: ArrayViewMutD<'_, f64>,
    state: ArrayViewMutD<'_, f64>,
    input: ArrayViewD<'_, f64>,
    (target_dtype, state_dtype): (DType, DType),
    mut f: F,
) where
    F: FnMut(&mut f64, &mut f64, f64),
{
    Zip::from(target)
        .and(state)
        .and(input)
        .for_each(|t, s, &x| {
            f(t, s, x);
            *t = target_dtype.round(*t);
            *s = state_dtype.round(*s);
        });
}
