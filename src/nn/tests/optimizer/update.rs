use crate::errors::TensorError;
use crate::nn::{IndexedSlices, Update};
use crate::tensor::{DType, Tensor};

#[test]
fn test_deduplicate_sums_rows_in_first_seen_order() -> Result<(), TensorError> {
    let slices = IndexedSlices::new(
        Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], &[4, 2]),
        vec![3, 1, 3, 3],
        vec![5, 2],
    );
    assert!(slices.has_duplicates());

    let merged = slices.deduplicate()?;
    assert_eq!(merged.indices, vec![3, 1]);
    assert_eq!(merged.values, Tensor::new(&[13.0, 16.0, 3.0, 4.0], &[2, 2]));
    assert_eq!(merged.dense_shape, vec![5, 2]);
    assert!(!merged.has_duplicates());
    Ok(())
}

#[test]
fn test_deduplicate_without_duplicates_is_identity() -> Result<(), TensorError> {
    let slices = IndexedSlices::new(Tensor::new(&[1.0, 2.0], &[2, 1]), vec![1, 0], vec![2, 1]);
    assert_eq!(slices.deduplicate()?, slices);
    Ok(())
}

#[test]
fn test_update_dtype() {
    let dense: Update = Tensor::new_i32(&[1], &[1]).into();
    assert_eq!(dense.dtype(), DType::I32);
    let sparse: Update = IndexedSlices::new(Tensor::new_f64(&[1.0], &[1, 1]), vec![0], vec![3, 1]).into();
    assert_eq!(sparse.dtype(), DType::F64);
}
