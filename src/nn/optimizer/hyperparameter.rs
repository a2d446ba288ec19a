/*
 * @Description  : 优化器超参数（学习率、动量）。既可以是构造时固定的常量，
 *                 也可以是外部持有的参数句柄：后者在每次`apply`开始时重新读取，
 *                 因此外部修改可在下一步生效。
 */

use crate::errors::NnError;
use crate::nn::Parameter;
use crate::tensor::{DType, Tensor};

#[derive(Debug, Clone)]
pub enum Hyperparameter {
    Constant(Tensor),
    Variable(Parameter),
}

impl Hyperparameter {
    /// 以指定dtype创建常量超参数
    pub fn constant(value: f64, dtype: DType) -> Self {
        Self::Constant(Tensor::scalar(value, dtype))
    }

    /// 当前值（对Variable而言即此刻参数的快照）
    pub fn read(&self) -> Tensor {
        match self {
            Self::Constant(tensor) => tensor.clone(),
            Self::Variable(parameter) => parameter.value(),
        }
    }

    /// 当前值转换为`dtype`后的结果（超参数作用于参数时按参数的dtype取值）
    pub fn read_as(&self, dtype: DType) -> Tensor {
        self.read().cast(dtype)
    }

    /// 按`dtype`读取当前的标量值；非标量报错
    pub(crate) fn scalar_as(&self, name: &str, dtype: DType) -> Result<f64, NnError> {
        let value = self.read_as(dtype);
        value.number().ok_or_else(|| NnError::NonScalarHyperparameter {
            name: name.to_string(),
            shape: value.shape().to_vec(),
        })
    }
}

impl From<f32> for Hyperparameter {
    fn from(value: f32) -> Self {
        Self::constant(value as f64, DType::F32)
    }
}

impl From<f64> for Hyperparameter {
    fn from(value: f64) -> Self {
        Self::constant(value, DType::F64)
    }
}

impl From<Tensor> for Hyperparameter {
    fn from(tensor: Tensor) -> Self {
        Self::Constant(tensor)
    }
}

impl From<Parameter> for Hyperparameter {
    fn from(parameter: Parameter) -> Self {
        Self::Variable(parameter)
    }
}

impl From<&Parameter> for Hyperparameter {
    fn from(parameter: &Parameter) -> Self {
        Self::Variable(parameter.clone())
    }
}
