//! # Momentum MLP
//!
//! 用纯rust实现的小型神经网络组件：
//! 以ndarray为底层的张量、可训练参数、全连接层与多层感知机（MLP），
//! 以及支持稠密/稀疏更新的动量（Momentum / Nesterov）优化器。
//!

pub mod errors;
pub mod nn;
pub mod tensor;
