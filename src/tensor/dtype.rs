use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// 张量元素的数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DType {
    #[default]
    F32,
    F64,
    I32,
}

impl DType {
    /// 将`value`取整到本类型可表示的值（仍以f64返回）
    pub fn round(self, value: f64) -> f64 {
        match self {
            Self::F32 => value as f32 as f64,
            Self::F64 => value,
            // `as`转换会饱和截断，NaN变为0
            Self::I32 => value as i32 as f64,
        }
    }

    pub fn is_floating(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::I32 => "int32",
        };
        write!(f, "{}", name)
    }
}
