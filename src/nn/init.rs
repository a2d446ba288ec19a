/*
 * @Description  : 参数初始化方式
 */

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::tensor::{DType, Tensor};

/// 参数初始化策略
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Init {
    /// 常数初始化
    Constant(f64),
    /// 全零
    Zeros,
    /// 全一
    Ones,
    /// 正态分布
    Normal { mean: f64, std: f64 },
    /// 截断正态分布（丢弃偏离均值超过2个标准差的样本）
    TruncatedNormal { mean: f64, std: f64 },
    /// Kaiming/He 初始化（适用于 `ReLU`）
    Kaiming,
    /// Xavier/Glorot 初始化（适用于 Sigmoid/Tanh）
    Xavier,
}

impl Init {
    /// 生成指定形状与数据类型的初始化张量
    pub fn generate<R: Rng + ?Sized>(&self, shape: &[usize], dtype: DType, rng: &mut R) -> Tensor {
        let tensor = match *self {
            Self::Constant(v) => Tensor::ones(shape) * v,
            Self::Zeros => Tensor::zeros(shape),
            Self::Ones => Tensor::ones(shape),
            Self::Normal { mean, std } => Tensor::new_normal_with_rng(mean, std, shape, rng),
            Self::TruncatedNormal { mean, std } => {
                Tensor::new_truncated_normal_with_rng(mean, std, shape, rng)
            }
            Self::Kaiming => {
                let fan_in = shape.first().copied().unwrap_or(1).max(1);
                let std = (2.0 / fan_in as f64).sqrt();
                Tensor::new_normal_with_rng(0.0, std, shape, rng)
            }
            Self::Xavier => {
                let (fan_in, fan_out) = (
                    shape.first().copied().unwrap_or(1),
                    shape.get(1).copied().unwrap_or(1),
                );
                let std = (2.0 / (fan_in + fan_out).max(1) as f64).sqrt();
                Tensor::new_normal_with_rng(0.0, std, shape, rng)
            }
        };
        tensor.cast(dtype)
    }
}
