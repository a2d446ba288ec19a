/*
 * @Description  : 优化器模块：带动量的随机梯度下降（普通实现与融合实现），
 *                 支持稠密与稀疏更新、可变超参数以及累积量的检查点。
 */

mod base;
mod hyperparameter;
mod kernel;
mod momentum;
mod state;
mod update;

pub use base::Optimizer;
pub use hyperparameter::Hyperparameter;
pub use momentum::{FastMomentum, Momentum};
pub use state::{AccumulatorState, MomentumConfig, MomentumState};
pub use update::{IndexedSlices, Update};
