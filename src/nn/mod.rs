/*
 * @Description  : 负责神经网络（neural network）的构建：参数、层、多层感知机与优化器
 */

mod activation;
mod distribute;
mod init;
pub mod layer;
mod mlp;
mod module;
pub mod optimizer;
mod parameter;

pub use activation::Activation;
pub use distribute::{DistributionContext, Strategy};
pub use init::Init;
pub use layer::Linear;
pub use mlp::{Mlp, MlpConfig};
pub use module::Module;
pub use optimizer::{
    AccumulatorState, FastMomentum, Hyperparameter, IndexedSlices, Momentum, MomentumConfig,
    MomentumState, Optimizer, Update,
};
pub use parameter::{Parameter, ParameterId};
