/*
 * @Description  : 动量更新的两种执行方式。两者共用同一个递推式`momentum_recurrence`：
 *                 - Unfused：以张量运算组合而成，每步产生若干中间张量；
 *                 - Fused：用ndarray::Zip在一次遍历中就地改写参数与累积量。
 *                 两者数值结果一致（在dtype精度内），区别只在执行方式。
 */

use std::ops::{Add, Mul};

use enum_dispatch::enum_dispatch;

use super::IndexedSlices;
use crate::errors::NnError;
use crate::nn::Parameter;
use crate::tensor::Tensor;

/// 单步更新所需的超参数（已按参数的dtype取整）
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Step {
    pub learning_rate: f64,
    pub momentum: f64,
    pub use_nesterov: bool,
}

/// 动量递推：`v ← m·v + g`；
/// 返回新的累积量与要从参数中减去的量：普通动量为`lr·v`，Nesterov为`lr·(g + m·v)`。
/// 对纯数与张量均适用。
pub(crate) fn momentum_recurrence<T>(velocity: T, grad: &T, step: Step) -> (T, T)
where
    T: Clone + Mul<f64, Output = T> + for<'a> Add<&'a T, Output = T>,
{
    let velocity = velocity * step.momentum + grad;
    let delta = if step.use_nesterov {
        (velocity.clone() * step.momentum + grad) * step.learning_rate
    } else {
        velocity.clone() * step.learning_rate
    };
    (velocity, delta)
}

#[enum_dispatch]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kernel {
    Unfused(Unfused),
    Fused(Fused),
}

#[enum_dispatch(Kernel)]
pub(crate) trait MomentumKernel {
    /// 稠密更新：参数与累积量的全部元素
    fn apply_dense(
        &self,
        parameter: &Parameter,
        accumulator: &Parameter,
        grad: &Tensor,
        step: Step,
    ) -> Result<(), NnError>;

    /// 稀疏更新：只改写`slices.indices`所指的行。调用方须保证索引无重复
    fn apply_sparse(
        &self,
        parameter: &Parameter,
        accumulator: &Parameter,
        slices: &IndexedSlices,
        step: Step,
    ) -> Result<(), NnError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Unfused;

impl MomentumKernel for Unfused {
    fn apply_dense(
        &self,
        parameter: &Parameter,
        accumulator: &Parameter,
        grad: &Tensor,
        step: Step,
    ) -> Result<(), NnError> {
        let mut velocity = accumulator.borrow_mut();
        let (new_velocity, delta) = momentum_recurrence(velocity.clone(), grad, step);
        *parameter.borrow_mut() -= &delta;
        *velocity = new_velocity;
        Ok(())
    }

    fn apply_sparse(
        &self,
        parameter: &Parameter,
        accumulator: &Parameter,
        slices: &IndexedSlices,
        step: Step,
    ) -> Result<(), NnError> {
        let indices = &slices.indices;
        let velocity_rows = accumulator.borrow().gather_rows(indices)?;
        let (velocity_rows, delta) = momentum_recurrence(velocity_rows, &slices.values, step);
        let parameter_rows = parameter.borrow().gather_rows(indices)? - &delta;
        accumulator.scatter_rows(indices, &velocity_rows)?;
        parameter.scatter_rows(indices, &parameter_rows)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Fused;

impl MomentumKernel for Fused {
    fn apply_dense(
        &self,
        parameter: &Parameter,
        accumulator: &Parameter,
        grad: &Tensor,
        step: Step,
    ) -> Result<(), NnError> {
        let mut velocity = accumulator.borrow_mut();
        parameter
            .borrow_mut()
            .zip_update(&mut velocity, grad, |p, v, g| fused_element(p, v, g, step))?;
        Ok(())
    }

    fn apply_sparse(
        &self,
        parameter: &Parameter,
        accumulator: &Parameter,
        slices: &IndexedSlices,
        step: Step,
    ) -> Result<(), NnError> {
        let mut velocity = accumulator.borrow_mut();
        parameter.borrow_mut().zip_update_rows(
            &mut velocity,
            &slices.indices,
            &slices.values,
            |p, v, g| fused_element(p, v, g, step),
        )?;
        Ok(())
    }
}

#[inline]
fn fused_element(parameter: &mut f64, velocity: &mut f64, grad: f64, step: Step) {
    let (new_velocity, delta) = momentum_recurrence(*velocity, &grad, step);
    *velocity = new_velocity;
    *parameter -= delta;
}
