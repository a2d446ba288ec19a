use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use approx::AbsDiffEq;
use std::cmp::PartialEq;

/// 数据、形状和dtype均相同才算相等（不比较设备）
impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.dtype == other.dtype && self.data == other.data
    }
}

impl AbsDiffEq for Tensor {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.is_same_shape(other)
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl Tensor {
    /// 对张量中的所有元素求和并返回一个形状为[1]的标量。
    pub fn sum(&self) -> Tensor {
        let value = self.data.sum();
        Tensor::new_with_dtype(&[value], &[1], self.dtype).to_device(self.device)
    }

    /// 逐元素映射，结果保持原dtype
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Tensor {
        self.with_data(self.data.mapv(f))
    }

    pub(in crate::tensor) fn assert_same_dtype(&self, other: &Tensor, operator: Operator) {
        assert!(
            self.dtype == other.dtype,
            "{}",
            TensorError::DTypeError {
                operator,
                dtype1: self.dtype,
                dtype2: other.dtype,
            }
        );
    }

    pub(in crate::tensor) fn assert_binary_compatible(&self, other: &Tensor, operator: Operator) {
        self.assert_same_dtype(other, operator);
        assert!(
            self.can_broadcast_with(other),
            "{}",
            TensorError::OperatorError {
                operator,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            }
        );
    }
}
