/*
 * @Description  : 张量模块。数据统一以f64存放于ndarray动态维数组中，
 *                 并附带数据类型（DType）与设备（Device）两个标签：
 *                 每次写入都会按DType取整，因此F32张量的运算结果与f32精度一致。
 */

use ndarray::{Array, IxDyn};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::TensorError;

mod device;
mod dtype;

mod ops {
    pub mod activation;
    pub mod add;
    pub mod assign;
    pub mod fused;
    pub mod mat_mul;
    pub mod mul;
    pub mod others;
    pub mod rows;
    pub mod sub;
}

mod property;

pub use device::Device;
pub use dtype::DType;


/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 注：只要通Tensor初始化的都是张量（即使标量也是张量）；
/// 而通常意义上的数字（类型为usize、f32、f64等）就只是纯数（number），在这里不被认为是张量。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "TensorData")]
pub struct Tensor {
    data: Array<f64, IxDyn>,
    dtype: DType,
    device: Device,
}

/// 反序列化的中间形态：读入的数据未必已按dtype取整，须经`from_array`才成为张量
#[derive(Deserialize)]
struct TensorData {
    data: Array<f64, IxDyn>,
    dtype: DType,
    device: Device,
}

impl From<TensorData> for Tensor {
    fn from(raw: TensorData) -> Self {
        Self::from_array(raw.data, raw.dtype, raw.device)
    }
}

impl Tensor {
    /// 创建一个F32张量，若为标量，`shape`可以是[]、[1]、[1,1]...
    /// 若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为矩阵，`shape`可以是[n,m]；
    /// 注：`data`的长度必须和`shape`中所有元素的乘积相等，否则panic。
    pub fn new(data: &[f32], shape: &[usize]) -> Tensor {
        let data = data.iter().map(|&x| x as f64).collect::<Vec<_>>();
        Self::new_with_dtype(&data, shape, DType::F32)
    }

    /// 创建一个F64张量，其余同`new`
    pub fn new_f64(data: &[f64], shape: &[usize]) -> Tensor {
        Self::new_with_dtype(data, shape, DType::F64)
    }

    /// 创建一个I32张量，其余同`new`
    pub fn new_i32(data: &[i32], shape: &[usize]) -> Tensor {
        let data = data.iter().map(|&x| x as f64).collect::<Vec<_>>();
        Self::new_with_dtype(&data, shape, DType::I32)
    }

    /// 以指定数据类型创建张量，`data`中的值会按`dtype`取整
    pub fn new_with_dtype(data: &[f64], shape: &[usize], dtype: DType) -> Tensor {
        let data = Array::from_shape_vec(IxDyn(shape), data.to_vec()).unwrap_or_else(|_| {
            panic!(
                "{}",
                TensorError::DataShapeMismatch {
                    len: data.len(),
                    shape: shape.to_vec(),
                }
            )
        });
        Self::from_array(data, dtype, Device::default())
    }

    /// 创建一个形状为`[]`的标量张量
    pub fn scalar(value: f64, dtype: DType) -> Tensor {
        Self::new_with_dtype(&[value], &[], dtype)
    }

    /// 全零F32张量
    pub fn zeros(shape: &[usize]) -> Tensor {
        Self::from_array(Array::zeros(IxDyn(shape)), DType::F32, Device::default())
    }

    /// 全一F32张量
    pub fn ones(shape: &[usize]) -> Tensor {
        Self::from_array(Array::ones(IxDyn(shape)), DType::F32, Device::default())
    }

    /// 创建与`other`形状、数据类型、设备均相同的全零张量。
    /// 优化器的累积量即由此创建，从而与其参数处于同一设备上。
    pub fn zeros_like(other: &Tensor) -> Tensor {
        Self::from_array(Array::zeros(other.data.raw_dim()), other.dtype, other.device)
    }

    /// 创建一个随机F32张量，其值在[min, max]的闭区间
    pub fn new_random(min: f64, max: f64, shape: &[usize]) -> Tensor {
        Self::new_random_with_rng(min, max, shape, &mut rand::thread_rng())
    }

    pub fn new_random_with_rng<R: Rng + ?Sized>(
        min: f64,
        max: f64,
        shape: &[usize],
        rng: &mut R,
    ) -> Tensor {
        let uniform = Uniform::from(min..=max);
        let data = (0..shape.iter().product::<usize>())
            .map(|_| uniform.sample(rng))
            .collect::<Vec<_>>();
        Self::new_with_dtype(&data, shape, DType::F32)
    }

    /// 创建一个服从正态分布的随机F32张量
    pub fn new_normal(mean: f64, std_dev: f64, shape: &[usize]) -> Tensor {
        Self::new_normal_with_rng(mean, std_dev, shape, &mut rand::thread_rng())
    }

    pub fn new_normal_with_rng<R: Rng + ?Sized>(
        mean: f64,
        std_dev: f64,
        shape: &[usize],
        rng: &mut R,
    ) -> Tensor {
        let data_len = shape.iter().product::<usize>();
        let data = sample_normal(mean, std_dev, data_len, rng, |_| true);
        Self::new_with_dtype(&data, shape, DType::F32)
    }

    /// 截断正态分布：偏离均值超过2个标准差的样本会被丢弃重采
    pub fn new_truncated_normal(mean: f64, std_dev: f64, shape: &[usize]) -> Tensor {
        Self::new_truncated_normal_with_rng(mean, std_dev, shape, &mut rand::thread_rng())
    }

    pub fn new_truncated_normal_with_rng<R: Rng + ?Sized>(
        mean: f64,
        std_dev: f64,
        shape: &[usize],
        rng: &mut R,
    ) -> Tensor {
        let data_len = shape.iter().product::<usize>();
        let data = sample_normal(mean, std_dev, data_len, rng, |z| {
            std_dev == 0.0 || (z - mean).abs() <= 2.0 * std_dev
        });
        Self::new_with_dtype(&data, shape, DType::F32)
    }
}

// 私有方法
impl Tensor {
    /// 所有构造最终都经过这里，以保证数据已按dtype取整
    fn from_array(mut data: Array<f64, IxDyn>, dtype: DType, device: Device) -> Tensor {
        if dtype != DType::F64 {
            data.mapv_inplace(|x| dtype.round(x));
        }
        Tensor {
            data,
            dtype,
            device,
        }
    }

    /// 以`self`的dtype和device包装一个新的数组
    fn with_data(&self, data: Array<f64, IxDyn>) -> Tensor {
        Self::from_array(data, self.dtype, self.device)
    }
}

/// Box-Muller采样，`accept`返回false的样本会被丢弃
fn sample_normal<R, F>(mean: f64, std_dev: f64, len: usize, rng: &mut R, accept: F) -> Vec<f64>
where
    R: Rng + ?Sized,
    F: Fn(f64) -> bool,
{
    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        let u1: f64 = rng.r#gen();
        let u2: f64 = rng.r#gen();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;
        let z0 = mean + std_dev * r * theta.cos();
        let z1 = mean + std_dev * r * theta.sin();

        if z0.is_finite() && accept(z0) {
            data.push(z0);
        }
        if data.len() < len && z1.is_finite() && accept(z1) {
            data.push(z1);
        }
    }
    data
}
