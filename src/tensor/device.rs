use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// 张量所在的设备。
/// 本库只在CPU上做实际计算，这里仅作为放置（placement）标签，
/// 用于保证优化器累积量与其参数处于同一设备。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    Cpu(usize),
    Gpu(usize),
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu(0)
    }
}

impl Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu(index) => write!(f, "CPU:{}", index),
            Self::Gpu(index) => write!(f, "GPU:{}", index),
        }
    }
}
