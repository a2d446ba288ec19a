/*
 * @Description  : 动量优化器的可序列化配置与检查点
 */

use serde::{Deserialize, Serialize};

use super::{FastMomentum, Momentum, Optimizer};
use crate::tensor::Tensor;

/// 单个参数的累积量快照，以参数名关联
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorState {
    pub parameter: String,
    pub velocity: Tensor,
}

/// `Momentum::state`导出的检查点，按累积量的创建顺序排列
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MomentumState {
    pub accumulators: Vec<AccumulatorState>,
}

/// 以常量超参数构建动量优化器的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    pub learning_rate: f64,
    pub momentum: f64,
    pub use_nesterov: bool,
    /// 为true时构建`FastMomentum`
    pub fused: bool,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            momentum: 0.9,
            use_nesterov: false,
            fused: false,
        }
    }
}

impl MomentumState {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl MomentumConfig {
    /// 从JSON读取配置，缺省字段取默认值
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn build(&self) -> Box<dyn Optimizer> {
        if self.fused {
            Box::new(FastMomentum::new(self.learning_rate, self.momentum).with_nesterov(self.use_nesterov))
        } else {
            Box::new(Momentum::new(self.learning_rate, self.momentum).with_nesterov(self.use_nesterov))
        }
    }
}
