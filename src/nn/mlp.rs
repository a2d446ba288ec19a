/*
 * @Description  : 多层感知机（MLP）：若干 Linear 层顺序相连，层间施加激活函数（训练时可选 dropout）
 */

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::errors::NnError;
use crate::nn::{Activation, Init, Linear, Module, Parameter};
use crate::tensor::Tensor;

/// MLP 的共享配置，所有层使用相同的偏置设置与初始化方式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    /// 权重初始化方式，None 时由 Linear 决定
    pub w_init: Option<Init>,
    /// 偏置初始化方式，`with_bias` 为 false 时必须为 None
    pub b_init: Option<Init>,
    pub with_bias: bool,
    /// 层间激活函数
    pub activation: Activation,
    /// 是否对隐藏层使用 dropout
    pub use_dropout: bool,
    pub dropout_rate: f64,
    /// 最后一层是否也施加激活（及 dropout）
    pub activate_final: bool,
    /// 随机种子（参数初始化与 dropout），None 时取系统熵
    pub seed: Option<u64>,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            w_init: None,
            b_init: None,
            with_bias: true,
            activation: Activation::Relu,
            use_dropout: false,
            dropout_rate: 0.5,
            activate_final: false,
            seed: None,
        }
    }
}

impl MlpConfig {
    /// 从JSON读取配置，缺省字段取默认值
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// 多层感知机
///
/// # 使用示例
/// ```ignore
/// let mut mlp = Mlp::new(&[64, 32, 10], MlpConfig::default(), Some("encoder"))?;
/// let y = mlp.forward(&x, None)?;
/// let mut decoder = mlp.reverse(None, None)?; // 名为 "encoder_reversed"
/// ```
pub struct Mlp {
    name: String,
    config: MlpConfig,
    layers: Vec<Linear>,
    rng: StdRng,
}

impl Mlp {
    /// 按`output_sizes`逐个创建 Linear 层，层名为`<name>/linear_<i>`
    ///
    /// # 错误
    /// - `with_bias` 为 false 且设置了 `b_init`：[`NnError::BiasInitWithoutBias`]
    /// - 启用 dropout 但比率不在[0, 1)内：[`NnError::InvalidDropoutRate`]
    pub fn new(output_sizes: &[usize], config: MlpConfig, name: Option<&str>) -> Result<Self, NnError> {
        if !config.with_bias && config.b_init.is_some() {
            return Err(NnError::BiasInitWithoutBias);
        }
        if config.use_dropout && !(0.0..1.0).contains(&config.dropout_rate) {
            return Err(NnError::InvalidDropoutRate(config.dropout_rate));
        }
        let name = name.unwrap_or("mlp").to_string();

        let layers = output_sizes
            .iter()
            .enumerate()
            .map(|(index, &output_size)| {
                let layer_name = format!("{name}/linear_{index}");
                match config.seed {
                    Some(seed) => Linear::new_seeded(
                        output_size,
                        config.with_bias,
                        config.w_init,
                        config.b_init,
                        &layer_name,
                        seed.wrapping_add(index as u64 + 1),
                    ),
                    None => Linear::new(
                        output_size,
                        config.with_bias,
                        config.w_init,
                        config.b_init,
                        &layer_name,
                    ),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            name,
            config,
            layers,
            rng,
        })
    }

    /// 前向传播
    ///
    /// 除最后一层外（`activate_final` 为 true 时也包括最后一层），
    /// 每层仿射变换之后先做 dropout（仅当启用且 `is_training == Some(true)`），再施加激活函数。
    ///
    /// # Panics
    /// 启用 dropout 时 `is_training` 为 None
    pub fn forward(&mut self, inputs: &Tensor, is_training: Option<bool>) -> Result<Tensor, NnError> {
        if self.config.use_dropout {
            assert!(is_training.is_some(), "使用 dropout 时必须提供 is_training 参数");
        }
        let apply_dropout = self.config.use_dropout && is_training == Some(true);
        let num_layers = self.layers.len();

        let mut x = inputs.clone();
        for (i, layer) in self.layers.iter_mut().enumerate() {
            x = layer.forward(&x)?;
            if i + 1 < num_layers || self.config.activate_final {
                if apply_dropout {
                    x = x.dropout(self.config.dropout_rate, &mut self.rng)?;
                }
                x = self.config.activation.apply(&x);
            }
        }
        Ok(x)
    }

    /// 返回一个逐层“反向”的新 MLP：其各层输出尺寸依次为本 MLP 各层输入尺寸的逆序，
    /// 因此它接受本 MLP 的输出作为输入，并输出本 MLP 输入的尺寸。
    /// 两者除形状对称外互不相干，不共享任何参数。
    ///
    /// - `activate_final`: None 时沿用本 MLP 的设置
    /// - `name`: None 时为`<本 MLP 名称>_reversed`
    ///
    /// # 错误
    /// 任一层尚未前向传播过（输入尺寸未知）时返回 [`NnError::InputSizeUndetermined`]
    pub fn reverse(&self, activate_final: Option<bool>, name: Option<&str>) -> Result<Mlp, NnError> {
        let output_sizes = self
            .layers
            .iter()
            .rev()
            .map(|layer| {
                layer.input_size().ok_or_else(|| NnError::InputSizeUndetermined {
                    layer: layer.name().to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let config = MlpConfig {
            activate_final: activate_final.unwrap_or(self.config.activate_final),
            ..self.config.clone()
        };
        let name = name.map_or_else(|| format!("{}_reversed", self.name), str::to_string);
        Mlp::new(&output_sizes, config, Some(&name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &MlpConfig {
        &self.config
    }

    pub fn layers(&self) -> &[Linear] {
        &self.layers
    }

    /// 最后一层的输出尺寸（没有层时为 None）
    pub fn output_size(&self) -> Option<usize> {
        self.layers.last().map(Linear::output_size)
    }
}

impl Module for Mlp {
    fn parameters(&self) -> Vec<Parameter> {
        self.layers.iter().flat_map(|layer| layer.parameters()).collect()
    }
}
