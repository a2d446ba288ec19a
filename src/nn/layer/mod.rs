/*
 * @Description  : Layer 模块
 */

mod linear;

pub use linear::Linear;
