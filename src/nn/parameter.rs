/*
 * @Description  : 可训练参数。Parameter 是对张量的共享句柄（Rc<RefCell<Tensor>>），
 *                 模型持有它，优化器与层只持有句柄的克隆并就地修改，从不复制张量本身。
 */

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::{NnError, TensorError};
use crate::tensor::{DType, Device, Tensor};

static NEXT_PARAMETER_ID: AtomicUsize = AtomicUsize::new(0);

/// 参数的唯一标识，进程内自增，克隆出的句柄共享同一ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId(usize);

#[derive(Clone)]
pub struct Parameter {
    id: ParameterId,
    name: Rc<str>,
    value: Rc<RefCell<Tensor>>,
}

impl Parameter {
    pub fn new(name: &str, value: Tensor) -> Self {
        Self {
            id: ParameterId(NEXT_PARAMETER_ID.fetch_add(1, Ordering::Relaxed)),
            name: Rc::from(name),
            value: Rc::new(RefCell::new(value)),
        }
    }

    pub fn id(&self) -> ParameterId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 当前值的快照（克隆）
    pub fn value(&self) -> Tensor {
        self.value.borrow().clone()
    }

    pub fn borrow(&self) -> Ref<'_, Tensor> {
        self.value.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Tensor> {
        self.value.borrow_mut()
    }

    /// 整体赋新值，形状与dtype须与原值一致；设备保持不变
    pub fn assign(&self, value: &Tensor) -> Result<(), NnError> {
        let mut current = self.value.borrow_mut();
        if current.dtype() != value.dtype() {
            return Err(NnError::DTypeMismatch {
                parameter: self.name.to_string(),
                update: value.dtype(),
                expected: current.dtype(),
            });
        }
        if !current.is_same_shape(value) {
            return Err(NnError::ShapeMismatch {
                parameter: self.name.to_string(),
                update: value.shape().to_vec(),
                expected: current.shape().to_vec(),
            });
        }
        *current = value.to_device(current.device());
        Ok(())
    }

    /// 按行写回（稀疏赋值）
    pub fn scatter_rows(&self, indices: &[usize], rows: &Tensor) -> Result<(), TensorError> {
        self.value.borrow_mut().scatter_rows(indices, rows)
    }

    pub fn shape(&self) -> Vec<usize> {
        self.value.borrow().shape().to_vec()
    }

    pub fn dtype(&self) -> DType {
        self.value.borrow().dtype()
    }

    pub fn device(&self) -> Device {
        self.value.borrow().device()
    }

    /// 两个句柄是否指向同一参数
    pub fn ptr_eq(&self, other: &Parameter) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value.borrow();
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("shape", &value.shape())
            .field("dtype", &value.dtype())
            .field("device", &value.device())
            .finish()
    }
}
