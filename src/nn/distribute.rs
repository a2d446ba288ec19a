/*
 * @Description  : 分布式执行上下文查询。优化器通过注入的 DistributionContext 获取当前策略，
 *                 而非读取全局状态，从而在没有真实分布式运行时的情况下也能测试拒绝逻辑。
 */

use crate::tensor::Device;

/// 分布式执行策略
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Strategy {
    /// 单一逻辑副本（默认）
    #[default]
    Default,
    /// 单设备
    OneDevice(Device),
    /// 单机多设备镜像：同一计算在各设备上复制执行，结果再合并
    Mirrored(Vec<Device>),
    /// 多机多设备镜像
    MultiWorkerMirrored(Vec<Device>),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "DefaultDistributionStrategy",
            Self::OneDevice(_) => "OneDeviceStrategy",
            Self::Mirrored(_) => "MirroredStrategy",
            Self::MultiWorkerMirrored(_) => "MultiWorkerMirroredStrategy",
        }
    }

    /// 该策略下每个参数的更新是否只经过单一逻辑副本
    pub fn is_single_replica(&self) -> bool {
        matches!(self, Self::Default | Self::OneDevice(_))
    }
}

/// 查询当前分布式执行上下文
pub trait DistributionContext {
    fn current_strategy(&self) -> Strategy;
}

/// 固定策略本身即可作为上下文
impl DistributionContext for Strategy {
    fn current_strategy(&self) -> Strategy {
        self.clone()
    }
}
