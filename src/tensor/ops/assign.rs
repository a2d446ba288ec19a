/*
 * @Description  : 张量的复合赋值运算（+=、-=、*=），直接在原张量的数据上修改。
 *                 右操作数为张量时，其形状须与左操作数一致或可广播到左操作数的形状。
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::{DType, Tensor};
use std::ops::{AddAssign, MulAssign, SubAssign};

macro_rules! impl_assign_op {
    ($trait:ident, $method:ident, $operator:expr, $op:tt) => {
        impl $trait for Tensor {
            fn $method(&mut self, other: Tensor) {
                self.$method(&other);
            }
        }

        impl<'a> $trait<&'a Tensor> for Tensor {
            fn $method(&mut self, other: &'a Tensor) {
                self.assert_assign_compatible(other, $operator);
                self.data $op &other.data;
                self.round_inplace();
            }
        }

        impl $trait<f64> for Tensor {
            fn $method(&mut self, scalar: f64) {
                self.data $op scalar;
                self.round_inplace();
            }
        }
    };
}

impl_assign_op!(AddAssign, add_assign, Operator::AddAssign, +=);
impl_assign_op!(SubAssign, sub_assign, Operator::SubAssign, -=);
impl_assign_op!(MulAssign, mul_assign, Operator::MulAssign, *=);

impl Tensor {
    /// 复合赋值不会改变左操作数的形状，故右操作数只能单向广播
    fn assert_assign_compatible(&self, other: &Tensor, operator: Operator) {
        self.assert_same_dtype(other, operator);
        assert!(
            other.data.broadcast(self.data.raw_dim()).is_some(),
            "{}",
            TensorError::OperatorError {
                operator,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            }
        );
    }

    fn round_inplace(&mut self) {
        let dtype = self.dtype;
        if dtype != DType::F64 {
            self.data.mapv_inplace(|x| dtype.round(x));
        }
    }
}
