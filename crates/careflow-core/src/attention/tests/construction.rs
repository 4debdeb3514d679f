//! Construction-time validation of the attention engine.

use candle_core::Device;

use crate::attention::HawkesAttention;
use crate::config::{Initializer, InitializerMap, COMBINE_INIT, MUTUAL_INTENSITY_INIT};
use crate::error::AttentionError;

use super::unit_config;

#[test]
fn engine_builds_with_required_initializers() {
    let engine = HawkesAttention::new(&unit_config(4, vec![1.0, 0.5]), &Device::Cpu).unwrap();
    assert_eq!(engine.x_depth(), 4);
    assert_eq!(engine.t_depth(), 1);
    assert_eq!(engine.decay().len(), 2);
}

#[test]
fn mutual_parameter_has_declared_shape() {
    let engine = HawkesAttention::new(&unit_config(5, vec![1.0]), &Device::Cpu).unwrap();
    assert_eq!(engine.mutual_parameter().as_tensor().dims(), &[5, 1]);
    assert_eq!(engine.trainable_vars().len(), 1);
}

#[test]
fn missing_mutual_intensity_initializer_fails_before_any_computation() {
    let mut config = unit_config(4, vec![1.0, 0.5]);
    config.initializers = InitializerMap::new().with(COMBINE_INIT, Initializer::Xavier);
    let err = HawkesAttention::new(&config, &Device::Cpu).unwrap_err();
    assert!(matches!(
        err,
        AttentionError::MissingInitializer { ref name } if name == MUTUAL_INTENSITY_INIT
    ));
}

#[test]
fn missing_combine_initializer_fails_before_any_computation() {
    let mut config = unit_config(4, vec![1.0, 0.5]);
    config.initializers =
        InitializerMap::new().with(MUTUAL_INTENSITY_INIT, Initializer::Xavier);
    let err = HawkesAttention::new(&config, &Device::Cpu).unwrap_err();
    assert!(matches!(
        err,
        AttentionError::MissingInitializer { ref name } if name == COMBINE_INIT
    ));
}

#[test]
fn invalid_decay_table_is_rejected_at_construction() {
    let mut config = unit_config(4, vec![1.0, 0.5]);
    config.decay = vec![1.0, -1.0];
    assert!(HawkesAttention::new(&config, &Device::Cpu).is_err());
}

#[test]
fn constant_initializer_sets_every_component() {
    let engine = HawkesAttention::new(&unit_config(3, vec![1.0]), &Device::Cpu).unwrap();
    let values: Vec<f64> = engine
        .mutual_parameter()
        .as_tensor()
        .flatten_all()
        .unwrap()
        .to_vec1()
        .unwrap();
    assert_eq!(values, vec![1.0, 1.0, 1.0]);
}
