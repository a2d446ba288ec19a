use super::{assert_values, dense_parameters, dense_updates, sparse_parameters, sparse_updates, values};
use crate::errors::{NnError, TensorError};
use crate::nn::{
    AccumulatorState, FastMomentum, Hyperparameter, IndexedSlices, Mlp, MlpConfig, Module, Momentum,
    MomentumState, Optimizer, Parameter, Strategy, Update,
};
use crate::tensor::{DType, Device, Tensor};

macro_rules! momentum_suite {
    ($suite:ident, $optimizer:ident) => {
        mod $suite {
            use super::*;

            #[test]
            fn test_dense() -> Result<(), NnError> {
                let parameters = dense_parameters();
                let mut optimizer = $optimizer::new(0.1, 0.9);

                optimizer.apply(&dense_updates(), &parameters)?;
                assert_values(&parameters, &[&[0.5, 1.5], &[2.7, 3.7]]);
                optimizer.apply(&dense_updates(), &parameters)?;
                assert_values(&parameters, &[&[-0.45, 0.55], &[2.13, 3.13]]);
                optimizer.apply(&dense_updates(), &parameters)?;
                assert_values(&parameters, &[&[-1.805, -0.805], &[1.317, 2.317]]);
                Ok(())
            }

            #[test]
            fn test_dense_nesterov() -> Result<(), NnError> {
                let parameters = dense_parameters();
                let mut optimizer = $optimizer::new(0.1, 0.9).with_nesterov(true);
                assert!(optimizer.use_nesterov());

                optimizer.apply(&dense_updates(), &parameters)?;
                assert_values(&parameters, &[&[0.05, 1.05], &[2.43, 3.43]]);
                optimizer.apply(&dense_updates(), &parameters)?;
                assert_values(&parameters, &[&[-1.305, -0.305], &[1.617, 2.617]]);
                optimizer.apply(&dense_updates(), &parameters)?;
                assert_values(&parameters, &[&[-3.0245, -2.0245], &[0.5853, 1.5853]]);
                Ok(())
            }

            #[test]
            fn test_sparse() -> Result<(), NnError> {
                let parameters = sparse_parameters();
                let mut optimizer = $optimizer::new(3.0, 0.9);

                optimizer.apply(&sparse_updates(), &parameters)?;
                assert_values(&parameters, &[&[0.7, 2.0], &[3.0, 3.97]]);
                optimizer.apply(&sparse_updates(), &parameters)?;
                assert_values(&parameters, &[&[0.13, 2.0], &[3.0, 3.913]]);
                optimizer.apply(&sparse_updates(), &parameters)?;
                assert_values(&parameters, &[&[-0.683, 2.0], &[3.0, 3.8317]]);
                Ok(())
            }

            #[test]
            fn test_sparse_nesterov() -> Result<(), NnError> {
                let parameters = sparse_parameters();
                let mut optimizer = $optimizer::new(3.0, 0.9).with_nesterov(true);

                optimizer.apply(&sparse_updates(), &parameters)?;
                assert_values(&parameters, &[&[0.43, 2.0], &[3.0, 3.943]]);
                optimizer.apply(&sparse_updates(), &parameters)?;
                assert_values(&parameters, &[&[-0.383, 2.0], &[3.0, 3.8617]]);
                optimizer.apply(&sparse_updates(), &parameters)?;
                assert_values(&parameters, &[&[-1.4147, 2.0], &[3.0, 3.75853]]);
                Ok(())
            }

            /// 未被索引的行，其累积量保持为零
            #[test]
            fn test_sparse_leaves_untouched_rows_of_accumulator() -> Result<(), NnError> {
                let parameters = sparse_parameters();
                let mut optimizer = $optimizer::new(3.0, 0.9);
                optimizer.apply(&sparse_updates(), &parameters)?;

                let velocity = optimizer.accumulator(&parameters[0]).map(Parameter::value);
                assert_eq!(velocity.map(|v| v.to_vec()), Some(vec![0.1f32 as f64, 0.0]));
                let velocity = optimizer.accumulator(&parameters[1]).map(Parameter::value);
                assert_eq!(velocity.map(|v| v.to_vec()), Some(vec![0.0, 0.01f32 as f64]));
                Ok(())
            }

            /// 重复索引按行求和后再更新，与预先合并的结果一致
            #[test]
            fn test_sparse_duplicate_indices() -> Result<(), NnError> {
                let duplicated = vec![Parameter::new("w", Tensor::new(&[1.0, 2.0, 3.0], &[3, 1]))];
                let merged = vec![Parameter::new("w", Tensor::new(&[1.0, 2.0, 3.0], &[3, 1]))];
                let mut optimizer_1 = $optimizer::new(1.0, 0.9);
                let mut optimizer_2 = $optimizer::new(1.0, 0.9);

                let update = IndexedSlices::new(Tensor::new(&[1.0, 0.5, 2.0], &[3, 1]), vec![2, 0, 2], vec![3, 1]);
                let expected = IndexedSlices::new(Tensor::new(&[3.0, 0.5], &[2, 1]), vec![2, 0], vec![3, 1]);
                for _ in 0..2 {
                    optimizer_1.apply(&[Some(update.clone().into())], &duplicated)?;
                    optimizer_2.apply(&[Some(expected.clone().into())], &merged)?;
                }
                // 第一步：v=[0.5, 0, 3]；第二步：v=[0.95, 0, 5.7]
                assert_values(&duplicated, &[&[-0.45, 2.0, -5.7]]);
                assert_eq!(values(&duplicated), values(&merged));
                Ok(())
            }

            #[test]
            fn test_mixed_dense_and_sparse() -> Result<(), NnError> {
                let parameters = vec![dense_parameters().remove(0), sparse_parameters().remove(1)];
                let updates = vec![dense_updates().remove(0), sparse_updates().remove(1)];
                let mut optimizer = $optimizer::new(0.1, 0.9);
                optimizer.apply(&updates, &parameters)?;
                assert_values(&parameters, &[&[0.5, 1.5], &[3.0, 3.999]]);
                Ok(())
            }

            #[test]
            fn test_variable_hyperparameters() -> Result<(), NnError> {
                let parameters = dense_parameters();
                let learning_rate = Parameter::new("learning_rate", Tensor::scalar(0.1, DType::F32));
                let momentum = Parameter::new("momentum", Tensor::scalar(0.9, DType::F32));
                let mut optimizer = $optimizer::new(&learning_rate, &momentum);

                optimizer.apply(&dense_updates(), &parameters)?;
                assert_values(&parameters, &[&[0.5, 1.5], &[2.7, 3.7]]);

                // 外部修改在下一步生效
                learning_rate.assign(&Tensor::scalar(0.01, DType::F32))?;
                momentum.assign(&Tensor::scalar(0.09, DType::F32))?;
                assert_eq!(optimizer.learning_rate().number(), Some(0.01f32 as f64));
                assert_eq!(optimizer.momentum().number(), Some(0.09f32 as f64));

                optimizer.apply(&dense_updates(), &parameters)?;
                assert_values(&parameters, &[&[0.4455, 1.4455], &[2.6673, 3.6673]]);
                Ok(())
            }

            /// F64超参数作用于F32参数时，先转换为参数的dtype
            #[test]
            fn test_float64_hyperparameters() -> Result<(), NnError> {
                let parameters = dense_parameters();
                let mut optimizer = $optimizer::new(
                    Hyperparameter::constant(0.1, DType::F64),
                    Hyperparameter::constant(0.9, DType::F64),
                );
                optimizer.apply(&dense_updates(), &parameters)?;
                assert_values(&parameters, &[&[0.5, 1.5], &[2.7, 3.7]]);
                assert!(parameters.iter().all(|p| p.dtype() == DType::F32));
                Ok(())
            }

            #[test]
            fn test_set_learning_rate() -> Result<(), NnError> {
                let parameters = dense_parameters();
                let mut optimizer = $optimizer::new(0.1, 0.9);
                optimizer.set_learning_rate(0.0.into());
                optimizer.apply(&dense_updates(), &parameters)?;
                assert_values(&parameters, &[&[1.0, 2.0], &[3.0, 4.0]]);
                assert_eq!(optimizer.learning_rate(), Tensor::scalar(0.0, DType::F64));
                Ok(())
            }

            /// 动量系数置零后与普通梯度下降一致
            #[test]
            fn test_set_momentum() -> Result<(), NnError> {
                let parameters = dense_parameters();
                let mut optimizer = $optimizer::new(0.1, 0.9);
                optimizer.set_momentum(0.0);
                assert_eq!(optimizer.momentum(), Tensor::scalar(0.0, DType::F64));
                optimizer.apply(&dense_updates(), &parameters)?;
                optimizer.apply(&dense_updates(), &parameters)?;
                assert_values(&parameters, &[&[0.0, 1.0], &[2.4, 3.4]]);
                Ok(())
            }

            #[test]
            fn test_skipped_update_creates_no_accumulator() -> Result<(), NnError> {
                let parameters = dense_parameters();
                let mut updates = dense_updates();
                updates[0] = None;
                let mut optimizer = $optimizer::new(0.1, 0.9);
                optimizer.apply(&updates, &parameters)?;

                assert_values(&parameters, &[&[1.0, 2.0], &[2.7, 3.7]]);
                assert!(optimizer.accumulator(&parameters[0]).is_none());
                assert_eq!(optimizer.accumulated_momentum().len(), 1);
                Ok(())
            }

            #[test]
            fn test_accumulators_follow_parameters() -> Result<(), NnError> {
                let parameters = vec![
                    Parameter::new("a", Tensor::new(&[1.0, 2.0], &[2]).to_device(Device::Gpu(1))),
                    Parameter::new("b", Tensor::new_f64(&[1.0], &[1])),
                ];
                let updates = vec![
                    Some(Update::Dense(Tensor::new(&[1.0, 1.0], &[2]))),
                    Some(Update::Dense(Tensor::new_f64(&[1.0], &[1]))),
                ];
                let mut optimizer = $optimizer::new(0.1, 0.9);
                optimizer.apply(&updates, &parameters)?;

                let accumulators = optimizer.accumulated_momentum();
                let names = accumulators.iter().map(Parameter::name).collect::<Vec<_>>();
                assert_eq!(names, vec!["a/momentum", "b/momentum"]);
                assert_eq!(accumulators[0].device(), Device::Gpu(1));
                assert_eq!(accumulators[0].shape(), vec![2]);
                assert_eq!(accumulators[1].dtype(), DType::F64);
                // 参数的设备不受更新影响
                assert_eq!(parameters[0].device(), Device::Gpu(1));

                // 再次更新不会新建累积量
                optimizer.apply(&updates, &parameters)?;
                assert_eq!(optimizer.accumulated_momentum().len(), 2);
                assert!(optimizer.accumulator(&parameters[0]).is_some_and(|a| a.ptr_eq(&accumulators[0])));
                Ok(())
            }

            #[test]
            fn test_reset() -> Result<(), NnError> {
                let parameters = dense_parameters();
                let mut optimizer = $optimizer::new(0.1, 0.9);
                optimizer.apply(&dense_updates(), &parameters)?;
                optimizer.reset();
                assert!(optimizer.accumulated_momentum().is_empty());

                // 重置后等同于从零开始：p=0.5-0.1*5
                optimizer.apply(&dense_updates(), &parameters)?;
                assert_values(&parameters, &[&[0.0, 1.0], &[2.4, 3.4]]);
                Ok(())
            }

            #[test]
            fn test_dtype_mismatch() {
                let parameters = vec![Parameter::new("param0", Tensor::new(&[1.0, 2.0], &[2]))];
                let updates = vec![Some(Update::Dense(Tensor::new_i32(&[5, 5], &[2])))];
                let mut optimizer = $optimizer::new(0.1, 0.9);

                let error = optimizer.apply(&updates, &parameters).unwrap_err();
                assert_eq!(
                    error,
                    NnError::DTypeMismatch {
                        parameter: "param0".to_string(),
                        update: DType::I32,
                        expected: DType::F32,
                    }
                );
                assert!(error.is_invalid_argument());
                assert_values(&parameters, &[&[1.0, 2.0]]);
            }

            #[test]
            fn test_length_mismatch() {
                let mut optimizer = $optimizer::new(0.1, 0.9);
                let result = optimizer.apply(&dense_updates()[..1], &dense_parameters());
                assert_eq!(result, Err(NnError::LengthMismatch { updates: 1, parameters: 2 }));
            }

            #[test]
            fn test_empty_parameters() {
                let mut optimizer = $optimizer::new(0.1, 0.9);
                assert_eq!(optimizer.apply(&[], &[]), Err(NnError::EmptyParameters));
            }

            /// 后面的参数校验失败时，前面的参数也不应被修改
            #[test]
            fn test_validation_happens_before_mutation() {
                let parameters = dense_parameters();
                let mut updates = dense_updates();
                updates[1] = Some(Update::Dense(Tensor::new(&[3.0, 3.0, 3.0], &[3])));
                let mut optimizer = $optimizer::new(0.1, 0.9);

                let result = optimizer.apply(&updates, &parameters);
                assert_eq!(
                    result,
                    Err(NnError::ShapeMismatch {
                        parameter: "param1".to_string(),
                        update: vec![3],
                        expected: vec![2],
                    })
                );
                assert_values(&parameters, &[&[1.0, 2.0], &[3.0, 4.0]]);
                assert!(optimizer.accumulated_momentum().is_empty());
            }

            #[test]
            fn test_sparse_index_out_of_range() {
                let parameters = sparse_parameters();
                let mut updates = sparse_updates();
                updates[1] = Some(Update::Sparse(IndexedSlices::new(
                    Tensor::new(&[0.01], &[1, 1]),
                    vec![2],
                    vec![2, 1],
                )));
                let mut optimizer = $optimizer::new(3.0, 0.9);

                let result = optimizer.apply(&updates, &parameters);
                assert_eq!(
                    result,
                    Err(NnError::Tensor(TensorError::IndexOutOfRange { index: 2, len: 2 }))
                );
                assert_values(&parameters, &[&[1.0, 2.0], &[3.0, 4.0]]);
            }

            #[test]
            fn test_sparse_dense_shape_mismatch() {
                let parameters = sparse_parameters();
                let mut updates = sparse_updates();
                updates[0] = Some(Update::Sparse(IndexedSlices::new(
                    Tensor::new(&[0.1], &[1, 1]),
                    vec![0],
                    vec![4, 1],
                )));
                let mut optimizer = $optimizer::new(3.0, 0.9);
                assert!(matches!(
                    optimizer.apply(&updates, &parameters),
                    Err(NnError::ShapeMismatch { ref parameter, .. }) if parameter == "param0"
                ));
            }

            #[test]
            fn test_unsupported_strategies() {
                let devices = vec![Device::Cpu(0), Device::Gpu(0)];
                for (strategy, name) in [
                    (Strategy::Mirrored(devices.clone()), "MirroredStrategy"),
                    (Strategy::MultiWorkerMirrored(devices.clone()), "MultiWorkerMirroredStrategy"),
                ] {
                    let parameters = dense_parameters();
                    let mut optimizer = $optimizer::new(0.1, 0.9).with_distribution(Box::new(strategy));
                    let error = optimizer.apply(&dense_updates(), &parameters).unwrap_err();
                    assert_eq!(error, NnError::UnsupportedStrategy { strategy: name.to_string() });
                    assert!(error.is_invalid_argument());
                    assert_values(&parameters, &[&[1.0, 2.0], &[3.0, 4.0]]);
                }
            }

            /// 策略检查先于其他校验
            #[test]
            fn test_strategy_checked_first() {
                let mut optimizer = $optimizer::new(0.1, 0.9)
                    .with_distribution(Box::new(Strategy::Mirrored(vec![Device::Cpu(0)])));
                assert!(matches!(
                    optimizer.apply(&[], &[]),
                    Err(NnError::UnsupportedStrategy { .. })
                ));
            }

            #[test]
            fn test_single_device_strategy() -> Result<(), NnError> {
                let parameters = dense_parameters();
                let mut optimizer =
                    $optimizer::new(0.1, 0.9).with_distribution(Box::new(Strategy::OneDevice(Device::Gpu(0))));
                optimizer.apply(&dense_updates(), &parameters)?;
                assert_values(&parameters, &[&[0.5, 1.5], &[2.7, 3.7]]);
                Ok(())
            }

            #[test]
            fn test_state_round_trip() -> Result<(), NnError> {
                let parameters_1 = dense_parameters();
                let parameters_2 = dense_parameters();
                let mut optimizer_1 = $optimizer::new(0.1, 0.9);
                optimizer_1.apply(&dense_updates(), &parameters_1)?;
                $optimizer::new(0.1, 0.9).apply(&dense_updates(), &parameters_2)?;

                let json = optimizer_1.state()?.to_json().unwrap();
                let mut optimizer_2 = $optimizer::new(0.1, 0.9);
                optimizer_2.load_state(&MomentumState::from_json(&json).unwrap(), &parameters_2)?;
                assert_eq!(optimizer_2.state()?, optimizer_1.state()?);

                optimizer_1.apply(&dense_updates(), &parameters_1)?;
                optimizer_2.apply(&dense_updates(), &parameters_2)?;
                assert_eq!(values(&parameters_1), values(&parameters_2));
                Ok(())
            }
        }
    };
}

momentum_suite!(unfused, Momentum);
momentum_suite!(fused, FastMomentum);

#[test]
fn test_load_state_unknown_parameter() -> Result<(), NnError> {
    let parameters = dense_parameters();
    let mut optimizer = Momentum::new(0.1, 0.9);
    optimizer.apply(&dense_updates(), &parameters)?;
    let state = optimizer.state()?;

    let mut restored = Momentum::new(0.1, 0.9);
    let result = restored.load_state(&state, &parameters[1..]);
    assert_eq!(result, Err(NnError::UnknownParameter("param0".to_string())));
    // 失败时不留下部分恢复的状态
    assert!(restored.accumulated_momentum().is_empty());
    Ok(())
}

#[test]
fn test_load_state_shape_mismatch() -> Result<(), NnError> {
    let parameters = dense_parameters();
    let mut optimizer = Momentum::new(0.1, 0.9);
    optimizer.apply(&dense_updates(), &parameters)?;
    let state = optimizer.state()?;

    let other = vec![
        Parameter::new("param0", Tensor::new(&[1.0, 2.0, 3.0], &[3])),
        Parameter::new("param1", Tensor::new(&[3.0, 4.0], &[2])),
    ];
    assert!(matches!(
        Momentum::new(0.1, 0.9).load_state(&state, &other),
        Err(NnError::ShapeMismatch { .. })
    ));
    Ok(())
}

/// 累积量按创建顺序导出，而非参数顺序
#[test]
fn test_state_keeps_creation_order() -> Result<(), NnError> {
    let parameters = dense_parameters();
    let mut optimizer = Momentum::new(0.1, 0.9);
    optimizer.apply(&[None, dense_updates().remove(1)], &parameters)?;
    optimizer.apply(&dense_updates(), &parameters)?;

    let names = optimizer
        .state()?
        .accumulators
        .into_iter()
        .map(|a| a.parameter)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["param1", "param0"]);
    Ok(())
}

/// 同名参数（如两个默认命名的 MLP）无法按名字区分累积量：导出与恢复都应报错，而非写错位置
#[test]
fn test_state_rejects_duplicate_parameter_names() -> Result<(), NnError> {
    let mut first = Mlp::new(&[1], MlpConfig::default(), None)?;
    let mut second = Mlp::new(&[1], MlpConfig::default(), None)?;
    first.forward(&Tensor::ones(&[1, 1]), None)?;
    second.forward(&Tensor::ones(&[1, 1]), None)?;
    let parameters = [first.parameters(), second.parameters()].concat();
    assert_eq!(parameters[0].name(), parameters[2].name());

    let updates = parameters
        .iter()
        .zip([1.0, 1.0, 7.0, 7.0])
        .map(|(p, g)| Some(Update::Dense(Tensor::ones(&p.shape()) * g)))
        .collect::<Vec<_>>();
    let mut optimizer = Momentum::new(0.1, 0.9);
    optimizer.apply(&updates, &parameters)?;

    let duplicated = || NnError::DuplicateParameterName("mlp/linear_0/w".to_string());
    assert_eq!(optimizer.state(), Err(duplicated()));

    // 快照本身含有重复条目时同样拒绝
    let entry = AccumulatorState {
        parameter: "mlp/linear_0/w".to_string(),
        velocity: Tensor::zeros(&[1, 1]),
    };
    let state = MomentumState {
        accumulators: vec![entry.clone(), entry],
    };
    let mut restored = Momentum::new(0.1, 0.9);
    assert_eq!(restored.load_state(&state, &first.parameters()), Err(duplicated()));

    // 参数列表中名字重复时拒绝，且不创建任何累积量
    assert_eq!(
        restored.load_state(&MomentumState::default(), &parameters),
        Err(duplicated())
    );
    assert!(restored.accumulated_momentum().is_empty());
    Ok(())
}
