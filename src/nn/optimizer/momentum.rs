/*
 * @Description  : 带动量的随机梯度下降（可选Nesterov）。
 *                 每个参数在首次收到更新时懒创建一个同形、同dtype、同设备的零累积量，
 *                 之后按`v ← m·v + g`递推，参数减去`lr·v`（Nesterov为`lr·(g + m·v)`）。
 */

use std::collections::{HashMap, HashSet};

use super::kernel::{Fused, Kernel, MomentumKernel, Step, Unfused};
use super::update::check_updates_parameters;
use super::{AccumulatorState, Hyperparameter, MomentumState, Optimizer, Update};
use crate::errors::NnError;
use crate::nn::{DistributionContext, Parameter, ParameterId, Strategy};
use crate::tensor::{DType, Tensor};

/// 某参数对应的累积量
#[derive(Debug, Clone)]
struct Accumulator {
    parameter_name: String,
    velocity: Parameter,
}

pub struct Momentum {
    learning_rate: Hyperparameter,
    momentum: Hyperparameter,
    use_nesterov: bool,
    kernel: Kernel,
    /// 按创建顺序存放
    accumulators: Vec<Accumulator>,
    slots: HashMap<ParameterId, usize>,
    distribution: Box<dyn DistributionContext>,
}

impl Momentum {
    pub fn new(learning_rate: impl Into<Hyperparameter>, momentum: impl Into<Hyperparameter>) -> Self {
        Self::with_kernel(learning_rate.into(), momentum.into(), Unfused.into())
    }

    fn with_kernel(learning_rate: Hyperparameter, momentum: Hyperparameter, kernel: Kernel) -> Self {
        Self {
            learning_rate,
            momentum,
            use_nesterov: false,
            kernel,
            accumulators: Vec::new(),
            slots: HashMap::new(),
            distribution: Box::new(Strategy::default()),
        }
    }

    pub fn with_nesterov(mut self, use_nesterov: bool) -> Self {
        self.use_nesterov = use_nesterov;
        self
    }

    /// 注入分布式上下文，`apply`时据此拒绝多副本策略
    pub fn with_distribution(mut self, distribution: Box<dyn DistributionContext>) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn use_nesterov(&self) -> bool {
        self.use_nesterov
    }

    pub fn set_momentum(&mut self, momentum: impl Into<Hyperparameter>) {
        self.momentum = momentum.into();
    }

    /// 已创建的全部累积量，按创建顺序排列
    pub fn accumulated_momentum(&self) -> Vec<Parameter> {
        self.accumulators.iter().map(|a| a.velocity.clone()).collect()
    }

    /// 某参数的累积量；尚未收到过更新的参数返回None
    pub fn accumulator(&self, parameter: &Parameter) -> Option<&Parameter> {
        self.slots
            .get(&parameter.id())
            .map(|&slot| &self.accumulators[slot].velocity)
    }

    /// 导出累积量的快照。快照以参数名关联累积量，
    /// 若有两个累积量对应同名参数则无法区分，返回错误。
    pub fn state(&self) -> Result<MomentumState, NnError> {
        find_duplicate(self.accumulators.iter().map(|a| a.parameter_name.as_str()))?;
        Ok(MomentumState {
            accumulators: self
                .accumulators
                .iter()
                .map(|a| AccumulatorState {
                    parameter: a.parameter_name.clone(),
                    velocity: a.velocity.value(),
                })
                .collect(),
        })
    }

    /// 从快照恢复累积量。`parameters`用于按名字找回对应参数，其中的名字须互不相同；
    /// 全部条目校验通过后才写入，任一失败则保持原状态不变。
    pub fn load_state(&mut self, state: &MomentumState, parameters: &[Parameter]) -> Result<(), NnError> {
        find_duplicate(parameters.iter().map(Parameter::name))?;
        find_duplicate(state.accumulators.iter().map(|entry| entry.parameter.as_str()))?;

        let mut resolved = Vec::with_capacity(state.accumulators.len());
        for entry in &state.accumulators {
            let parameter = parameters
                .iter()
                .find(|p| p.name() == entry.parameter)
                .ok_or_else(|| NnError::UnknownParameter(entry.parameter.clone()))?;
            if entry.velocity.dtype() != parameter.dtype() {
                return Err(NnError::DTypeMismatch {
                    parameter: entry.parameter.clone(),
                    update: entry.velocity.dtype(),
                    expected: parameter.dtype(),
                });
            }
            if entry.velocity.shape() != parameter.shape().as_slice() {
                return Err(NnError::ShapeMismatch {
                    parameter: entry.parameter.clone(),
                    update: entry.velocity.shape().to_vec(),
                    expected: parameter.shape(),
                });
            }
            resolved.push((parameter, &entry.velocity));
        }
        for (parameter, velocity) in resolved {
            self.accumulator_or_zeros(parameter).assign(velocity)?;
        }
        log::debug!("已恢复{}个动量累积量", state.accumulators.len());
        Ok(())
    }

    fn check_strategy(&self) -> Result<(), NnError> {
        let strategy = self.distribution.current_strategy();
        if strategy.is_single_replica() {
            return Ok(());
        }
        log::warn!("动量优化器不支持`{}`，拒绝本次更新", strategy.name());
        Err(NnError::UnsupportedStrategy {
            strategy: strategy.name().to_string(),
        })
    }

    /// 取出参数的累积量，首次访问时以零初始化（与参数同设备）
    fn accumulator_or_zeros(&mut self, parameter: &Parameter) -> Parameter {
        if let Some(&slot) = self.slots.get(&parameter.id()) {
            return self.accumulators[slot].velocity.clone();
        }
        let velocity = Parameter::new(
            &format!("{}/momentum", parameter.name()),
            Tensor::zeros_like(&parameter.borrow()),
        );
        log::debug!(
            "为参数`{}`创建动量累积量，形状{:?}，设备{}",
            parameter.name(),
            velocity.shape(),
            velocity.device()
        );
        self.slots.insert(parameter.id(), self.accumulators.len());
        self.accumulators.push(Accumulator {
            parameter_name: parameter.name().to_string(),
            velocity: velocity.clone(),
        });
        velocity
    }
}

impl Optimizer for Momentum {
    fn apply(&mut self, updates: &[Option<Update>], parameters: &[Parameter]) -> Result<(), NnError> {
        self.check_strategy()?;
        check_updates_parameters(updates, parameters)?;

        // 先确认超参数为标量，之后逐参数按其dtype取值
        let learning_rate = self.learning_rate.scalar_as("learning_rate", DType::F64)?;
        let momentum = self.momentum.scalar_as("momentum", DType::F64)?;
        log::trace!(
            "动量更新：{}个参数，lr={}，momentum={}，nesterov={}",
            parameters.len(),
            learning_rate,
            momentum,
            self.use_nesterov
        );

        for (update, parameter) in updates.iter().zip(parameters) {
            let Some(update) = update else {
                continue;
            };
            let dtype = parameter.dtype();
            let step = Step {
                learning_rate: self.learning_rate.scalar_as("learning_rate", dtype)?,
                momentum: self.momentum.scalar_as("momentum", dtype)?,
                use_nesterov: self.use_nesterov,
            };
            let velocity = self.accumulator_or_zeros(parameter);
            match update {
                Update::Dense(grad) => self.kernel.apply_dense(parameter, &velocity, grad, step)?,
                Update::Sparse(slices) => {
                    let slices = slices.deduplicate()?;
                    self.kernel.apply_sparse(parameter, &velocity, &slices, step)?
                }
            }
        }
        Ok(())
    }

    fn learning_rate(&self) -> Tensor {
        self.learning_rate.read()
    }

    fn momentum(&self) -> Tensor {
        self.momentum.read()
    }

    fn set_learning_rate(&mut self, learning_rate: Hyperparameter) {
        self.learning_rate = learning_rate;
    }

    fn reset(&mut self) {
        self.accumulators.clear();
        self.slots.clear();
    }
}

/// 融合实现的动量优化器：语义与`Momentum`完全相同，
/// 但每个参数的更新在一次逐元素遍历中完成，不产生中间张量。
pub struct FastMomentum(Momentum);

impl FastMomentum {
    pub fn new(learning_rate: impl Into<Hyperparameter>, momentum: impl Into<Hyperparameter>) -> Self {
        Self(Momentum::with_kernel(
            learning_rate.into(),
            momentum.into(),
            Fused.into(),
        ))
    }

    pub fn with_nesterov(self, use_nesterov: bool) -> Self {
        Self(self.0.with_nesterov(use_nesterov))
    }

    pub fn with_distribution(self, distribution: Box<dyn DistributionContext>) -> Self {
        Self(self.0.with_distribution(distribution))
    }

    pub fn use_nesterov(&self) -> bool {
        self.0.use_nesterov()
    }

    pub fn set_momentum(&mut self, momentum: impl Into<Hyperparameter>) {
        self.0.set_momentum(momentum)
    }

    pub fn accumulated_momentum(&self) -> Vec<Parameter> {
        self.0.accumulated_momentum()
    }

    pub fn accumulator(&self, parameter: &Parameter) -> Option<&Parameter> {
        self.0.accumulator(parameter)
    }

    pub fn state(&self) -> Result<MomentumState, NnError> {
        self.0.state()
    }

    pub fn load_state(&mut self, state: &MomentumState, parameters: &[Parameter]) -> Result<(), NnError> {
        self.0.load_state(state, parameters)
    }
}

impl Optimizer for FastMomentum {
    fn apply(&mut self, updates: &[Option<Update>], parameters: &[Parameter]) -> Result<(), NnError> {
        self.0.apply(updates, parameters)
    }

    fn learning_rate(&self) -> Tensor {
        self.0.learning_rate()
    }

    fn momentum(&self) -> Tensor {
        self.0.momentum()
    }

    fn set_learning_rate(&mut self, learning_rate: Hyperparameter) {
        self.0.set_learning_rate(learning_rate)
    }

    fn reset(&mut self) {
        self.0.reset()
    }
}

/// 名字重复时返回`DuplicateParameterName`
fn find_duplicate<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), NnError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(NnError::DuplicateParameterName(name.to_string()));
        }
    }
    Ok(())
}
