/*
 * @Description  : 优化器的公共接口
 */

use super::{Hyperparameter, Update};
use crate::errors::NnError;
use crate::nn::Parameter;
use crate::tensor::Tensor;

/// 优化器接口：把一批更新量作用到对应的参数上
///
/// # 使用示例
/// ```ignore
/// let mut optimizer = Momentum::new(0.1, 0.9);
/// let parameters = model.parameters();
/// let updates = grads.into_iter().map(|g| Some(Update::Dense(g))).collect::<Vec<_>>();
/// optimizer.apply(&updates, &parameters)?;
/// ```
pub trait Optimizer {
    /// `updates[i]`作用于`parameters[i]`；`None`表示该参数本步不更新。
    /// 任何校验失败都会在修改参数之前返回错误。
    fn apply(&mut self, updates: &[Option<Update>], parameters: &[Parameter]) -> Result<(), NnError>;

    /// 学习率的当前值
    fn learning_rate(&self) -> Tensor;

    /// 动量系数的当前值
    fn momentum(&self) -> Tensor;

    fn set_learning_rate(&mut self, learning_rate: Hyperparameter);

    /// 清空累积状态
    fn reset(&mut self);
}
