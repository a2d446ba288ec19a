use thiserror::Error;
mod ops;
pub use self::ops::*;

use crate::tensor::DType;

#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
    // 张量二元运算
    #[error(
        "形状不一致，故无法{operator}：第一个张量的形状为{tensor1_shape:?}，第二个张量的形状为{tensor2_shape:?}"
    )]
    OperatorError {
        operator: Operator,
        tensor1_shape: Vec<usize>,
        tensor2_shape: Vec<usize>,
    },
    #[error("数据类型不一致，故无法{operator}：第一个张量为{dtype1}，第二个张量为{dtype2}")]
    DTypeError {
        operator: Operator,
        dtype1: DType,
        dtype2: DType,
    },

    #[error("数据长度{len}与形状{shape:?}不匹配")]
    DataShapeMismatch { len: usize, shape: Vec<usize> },
    #[error("行索引{index}超出首维长度{len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("按行操作要求张量至少为1阶")]
    RowOpNeedAtLeast1Dim,
    #[error("行数据的形状应为{expected:?}，实际为{got:?}")]
    RowShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("dropout比率须在[0, 1)内，实际为{0}")]
    InvalidDropoutRate(f64),
    #[error("分段ID有{ids}个，但张量首维有{rows}行")]
    SegmentIdsMismatch { ids: usize, rows: usize },
    #[error("分段ID{id}超出分段数{num_segments}")]
    SegmentIdOutOfRange { id: usize, num_segments: usize },
}

/// 神经网络层面（优化器、层、MLP）的错误
///
/// 除 [`NnError::Tensor`] 外均为参数校验错误，见 [`NnError::is_invalid_argument`]。
#[derive(Error, Debug, PartialEq)]
pub enum NnError {
    #[error("`updates` 和 `parameters` 的长度必须相同：updates 有{updates}个，parameters 有{parameters}个")]
    LengthMismatch { updates: usize, parameters: usize },
    #[error("`parameters` 不能为空")]
    EmptyParameters,
    #[error("更新量的数据类型{update}与参数`{parameter}`的数据类型{expected}不一致")]
    DTypeMismatch {
        parameter: String,
        update: DType,
        expected: DType,
    },
    #[error("更新量的形状{update:?}与参数`{parameter}`的形状{expected:?}不一致")]
    ShapeMismatch {
        parameter: String,
        update: Vec<usize>,
        expected: Vec<usize>,
    },
    #[error("优化器与`{strategy}`不兼容，请改用`Default`或`OneDeviceStrategy`")]
    UnsupportedStrategy { strategy: String },
    #[error("with_bias 为 false 时不可设置 b_init")]
    BiasInitWithoutBias,
    #[error("dropout比率须在[0, 1)内，实际为{0}")]
    InvalidDropoutRate(f64),
    #[error("层`{layer}`的输入尺寸尚未确定，须先调用一次前向传播")]
    InputSizeUndetermined { layer: String },
    #[error("层`{layer}`的输入尺寸应为{expected}，实际为{got}")]
    InputSizeMismatch {
        layer: String,
        expected: usize,
        got: usize,
    },
    #[error("层`{layer}`的输入须为2阶张量，实际为{got}阶")]
    InvalidInputRank { layer: String, got: usize },
    #[error("超参数`{name}`须为标量，实际形状为{shape:?}")]
    NonScalarHyperparameter { name: String, shape: Vec<usize> },
    #[error("找不到名为`{0}`的参数")]
    UnknownParameter(String),
    #[error("参数名`{0}`不唯一，无法按名字关联累积量")]
    DuplicateParameterName(String),
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

impl NnError {
    /// 是否为调用方传参错误（即 InvalidArgument 一类）
    pub fn is_invalid_argument(&self) -> bool {
        !matches!(self, Self::Tensor(_) | Self::InputSizeUndetermined { .. })
    }
}
