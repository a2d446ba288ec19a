/*
 * @Description  : 逐元素激活函数与dropout
 */

use crate::errors::TensorError;
use crate::tensor::Tensor;
use rand::Rng;

impl Tensor {
    pub fn relu(&self) -> Tensor {
        self.map(|x| x.max(0.0))
    }

    pub fn leaky_relu(&self, alpha: f64) -> Tensor {
        self.map(|x| if x > 0.0 { x } else { alpha * x })
    }

    pub fn sigmoid(&self) -> Tensor {
        self.map(|x| 1.0 / (1.0 + (-x).exp()))
    }

    pub fn tanh(&self) -> Tensor {
        self.map(f64::tanh)
    }

    /// 随机失活：每个元素以`1 - rate`的概率保留并放大为原来的`1 / (1 - rate)`倍，
    /// 否则置零，从而保持期望不变。`rate`须在[0, 1)内，为0时原样返回。
    pub fn dropout<R: Rng + ?Sized>(&self, rate: f64, rng: &mut R) -> Result<Tensor, TensorError> {
        if !(0.0..1.0).contains(&rate) {
            return Err(TensorError::InvalidDropoutRate(rate));
        }
        if rate == 0.0 {
            return Ok(self.clone());
        }
        let scale = 1.0 / (1.0 - rate);
        let data = self
            .data
            .mapv(|x| if rng.gen_bool(1.0 - rate) { x * scale } else { 0.0 });
        Ok(self.with_data(data))
    }
}
