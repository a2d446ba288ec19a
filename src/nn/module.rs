/*
 * @Description  : Module trait 定义
 */

use super::Parameter;

/// 模块 trait
///
/// # 设计原则
/// - `forward()` **不是** trait 方法（签名各异）
/// - `new()` **不是** trait 方法（参数各异）
/// - `parameters()` 返回 `Vec<Parameter>`（签名一致，放入 trait）
///
/// 层的参数可能要等到第一次前向传播后才创建，此前 `parameters()` 返回空列表。
pub trait Module {
    /// 获取所有可训练参数
    ///
    /// 这是 Module trait 的唯一必须实现的方法。
    /// 用于：
    /// - 优化器需要知道要更新哪些参数
    /// - 检查点保存/恢复
    /// - 统计参数数量
    fn parameters(&self) -> Vec<Parameter>;

    /// 获取参数数量
    fn num_params(&self) -> usize {
        self.parameters().len()
    }
}
