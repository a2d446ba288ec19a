use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;

/// 层与层之间使用的激活函数
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Activation {
    #[default]
    Relu,
    Sigmoid,
    Tanh,
    LeakyRelu(f64),
    Identity,
}

impl Activation {
    pub fn apply(&self, x: &Tensor) -> Tensor {
        match *self {
            Self::Relu => x.relu(),
            Self::Sigmoid => x.sigmoid(),
            Self::Tanh => x.tanh(),
            Self::LeakyRelu(alpha) => x.leaky_relu(alpha),
            Self::Identity => x.clone(),
        }
    }
}
