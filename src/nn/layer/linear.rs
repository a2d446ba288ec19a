/*
 * @Description  : Linear (全连接) 层
 *
 * 输入尺寸在构造时未知，第一次前向传播时才由输入推断，并在此时创建权重与偏置。
 */

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::errors::NnError;
use crate::nn::{Init, Module, Parameter};
use crate::tensor::Tensor;

/// Linear (全连接) 层：`output = x @ W + b`
///
/// # 输入/输出形状
/// - 输入：[batch_size, input_size]
/// - 输出：[batch_size, output_size]
///
/// # 使用示例
/// ```ignore
/// let mut fc = Linear::new(128, true, None, None, "fc1")?;
/// let h = fc.forward(&x)?.relu();
/// ```
pub struct Linear {
    /// 层名称，同时作为参数名前缀
    name: String,
    output_size: usize,
    /// 第一次前向传播之前为 None
    input_size: Option<usize>,
    with_bias: bool,
    /// 为 None 时使用标准差为 1/√input_size 的截断正态分布
    w_init: Option<Init>,
    /// 为 None 时全零
    b_init: Option<Init>,
    /// 权重参数 [input_size, output_size]
    weights: Option<Parameter>,
    /// 偏置参数 [output_size]（可选）
    bias: Option<Parameter>,
    rng: StdRng,
}

impl Linear {
    /// 创建新的 Linear 层
    ///
    /// # 参数
    /// - `output_size`: 输出特征维度
    /// - `with_bias`: 是否使用偏置
    /// - `w_init`/`b_init`: 权重/偏置初始化方式，None 表示默认
    /// - `name`: 层名称
    ///
    /// # 错误
    /// `with_bias` 为 false 却给出了 `b_init` 时返回 [`NnError::BiasInitWithoutBias`]
    pub fn new(
        output_size: usize,
        with_bias: bool,
        w_init: Option<Init>,
        b_init: Option<Init>,
        name: &str,
    ) -> Result<Self, NnError> {
        Self::with_rng(output_size, with_bias, w_init, b_init, name, StdRng::from_entropy())
    }

    /// 创建新的 Linear 层（带种子，确保可重复性）
    pub fn new_seeded(
        output_size: usize,
        with_bias: bool,
        w_init: Option<Init>,
        b_init: Option<Init>,
        name: &str,
        seed: u64,
    ) -> Result<Self, NnError> {
        let rng = StdRng::seed_from_u64(seed);
        Self::with_rng(output_size, with_bias, w_init, b_init, name, rng)
    }

    fn with_rng(
        output_size: usize,
        with_bias: bool,
        w_init: Option<Init>,
        b_init: Option<Init>,
        name: &str,
        rng: StdRng,
    ) -> Result<Self, NnError> {
        if !with_bias && b_init.is_some() {
            return Err(NnError::BiasInitWithoutBias);
        }
        Ok(Self {
            name: name.to_string(),
            output_size,
            input_size: None,
            with_bias,
            w_init,
            b_init,
            weights: None,
            bias: None,
            rng,
        })
    }

    /// 前向传播，计算 `x @ W + b`
    ///
    /// 第一次调用时记录输入尺寸，并以输入的dtype与设备创建参数；
    /// 之后的输入尺寸须与第一次一致。
    pub fn forward(&mut self, x: &Tensor) -> Result<Tensor, NnError> {
        if x.dimension() != 2 {
            return Err(NnError::InvalidInputRank {
                layer: self.name.clone(),
                got: x.dimension(),
            });
        }
        let input_size = x.shape()[1];
        let weights = match (self.input_size, self.weights.clone()) {
            (Some(expected), Some(weights)) => {
                if expected != input_size {
                    return Err(NnError::InputSizeMismatch {
                        layer: self.name.clone(),
                        expected,
                        got: input_size,
                    });
                }
                weights
            }
            _ => self.initialize(input_size, x),
        };
        if weights.dtype() != x.dtype() {
            return Err(NnError::DTypeMismatch {
                parameter: weights.name().to_string(),
                update: x.dtype(),
                expected: weights.dtype(),
            });
        }

        // x @ W: [batch, in] @ [in, out] = [batch, out]
        let output = x.mat_mul(&weights.borrow());
        log::trace!("{}: {:?} -> {:?}", self.name, x.shape(), output.shape());
        match &self.bias {
            // [batch, out] + [out] 广播
            Some(bias) => Ok(&output + &*bias.borrow()),
            None => Ok(output),
        }
    }

    fn initialize(&mut self, input_size: usize, x: &Tensor) -> Parameter {
        let (dtype, device) = (x.dtype(), x.device());
        let w_init = self.w_init.unwrap_or(Init::TruncatedNormal {
            mean: 0.0,
            std: 1.0 / (input_size as f64).sqrt(),
        });
        let w = w_init
            .generate(&[input_size, self.output_size], dtype, &mut self.rng)
            .to_device(device);
        let weights = Parameter::new(&format!("{}/w", self.name), w);

        if self.with_bias {
            let b = self
                .b_init
                .unwrap_or(Init::Zeros)
                .generate(&[self.output_size], dtype, &mut self.rng)
                .to_device(device);
            self.bias = Some(Parameter::new(&format!("{}/b", self.name), b));
        }
        log::debug!(
            "{}: 创建参数 w{:?}（{}，{}），bias={}",
            self.name,
            [input_size, self.output_size],
            dtype,
            device,
            self.with_bias
        );

        self.input_size = Some(input_size);
        self.weights = Some(weights.clone());
        weights
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 获取输入特征维度（第一次前向传播之前为 None）
    pub fn input_size(&self) -> Option<usize> {
        self.input_size
    }

    /// 获取输出特征维度
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn with_bias(&self) -> bool {
        self.with_bias
    }

    /// 获取权重（第一次前向传播之前为 None）
    pub fn weights(&self) -> Option<&Parameter> {
        self.weights.as_ref()
    }

    /// 获取偏置（如果有且已创建）
    pub fn bias(&self) -> Option<&Parameter> {
        self.bias.as_ref()
    }
}

impl Module for Linear {
    fn parameters(&self) -> Vec<Parameter> {
        self.weights.iter().chain(self.bias.iter()).cloned().collect()
    }
}
