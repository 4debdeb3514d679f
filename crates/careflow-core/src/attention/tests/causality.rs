//! Causality, purity, and boundary validation of `mix`.

use candle_core::Device;

use crate::attention::HawkesAttention;
use crate::config::{
    AttentionConfig, Initializer, InitializerMap, COMBINE_INIT, MUTUAL_INTENSITY_INIT,
};
use crate::error::AttentionError;

use super::{identity_mutual, tensor3, unit_engine};

#[test]
fn future_entries_cannot_affect_the_mixed_state() {
    let engine = unit_engine(2, vec![1.0, 0.5, 0.25, 0.125]);
    let mutual = identity_mutual(2);

    let features = tensor3(
        &[1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0],
        4,
        1,
        2,
    );
    let timestamps = tensor3(&[0.0, 1.0, 2.0, 3.0], 4, 1, 1);
    let hidden = tensor3(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8], 4, 1, 2);

    let baseline = engine
        .mix(1, &hidden, &features, &timestamps, &mutual)
        .unwrap()
        .to_vec2::<f64>()
        .unwrap();

    // Rewrite every entry at indices 2 and 3.
    let features_mutated = tensor3(
        &[1.0, 0.0, 0.0, 1.0, 9.0, 9.0, 9.0, 9.0],
        4,
        1,
        2,
    );
    let timestamps_mutated = tensor3(&[0.0, 1.0, 900.0, 901.0], 4, 1, 1);
    let hidden_mutated = tensor3(&[0.1, 0.2, 0.3, 0.4, -5.0, -5.0, -5.0, -5.0], 4, 1, 2);

    let mutated = engine
        .mix(1, &hidden_mutated, &features_mutated, &timestamps_mutated, &mutual)
        .unwrap()
        .to_vec2::<f64>()
        .unwrap();

    assert_eq!(baseline, mutated, "indices > t must never be read");
}

#[test]
fn mix_is_idempotent_without_parameter_updates() {
    let engine = unit_engine(2, vec![1.0, 0.5, 0.25]);
    let mutual = identity_mutual(2);
    let features = tensor3(&[1.0, 0.0, 0.0, 1.0, 1.0, 0.0], 3, 1, 2);
    let timestamps = tensor3(&[0.0, 1.0, 2.0], 3, 1, 1);
    let hidden = tensor3(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 3, 1, 2);

    let first = engine
        .mix(2, &hidden, &features, &timestamps, &mutual)
        .unwrap()
        .to_vec2::<f64>()
        .unwrap();
    let second = engine
        .mix(2, &hidden, &features, &timestamps, &mutual)
        .unwrap()
        .to_vec2::<f64>()
        .unwrap();
    assert_eq!(first, second);
}

/// Declared `x_depth = 4` against width-3 features must fail at the boundary,
/// before the accumulation loop runs.
#[test]
fn feature_width_mismatch_fails_before_numeric_work() {
    let config = AttentionConfig {
        x_depth: 4,
        t_depth: 1,
        decay: vec![1.0, 0.5],
        initializers: InitializerMap::new()
            .with(MUTUAL_INTENSITY_INIT, Initializer::Xavier)
            .with(COMBINE_INIT, Initializer::Xavier),
    };
    let engine = HawkesAttention::new(&config, &Device::Cpu).unwrap();
    let mutual = identity_mutual(4);
    let features = tensor3(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 2, 1, 3);
    let timestamps = tensor3(&[0.0, 1.0], 2, 1, 1);
    let hidden = tensor3(&[0.1, 0.2, 0.3, 0.4], 2, 1, 2);

    let err = engine
        .mix(1, &hidden, &features, &timestamps, &mutual)
        .unwrap_err();
    assert!(matches!(
        err,
        AttentionError::ShapeMismatch { context: "features", .. }
    ));
}

#[test]
fn timestamp_width_mismatch_is_rejected() {
    let engine = unit_engine(2, vec![1.0, 0.5]);
    let mutual = identity_mutual(2);
    let features = tensor3(&[1.0, 0.0, 0.0, 1.0], 2, 1, 2);
    let timestamps = tensor3(&[0.0, 0.0, 1.0, 1.0], 2, 1, 2);
    let hidden = tensor3(&[0.1, 0.2, 0.3, 0.4], 2, 1, 2);

    let err = engine
        .mix(1, &hidden, &features, &timestamps, &mutual)
        .unwrap_err();
    assert!(matches!(
        err,
        AttentionError::ShapeMismatch { context: "timestamps", .. }
    ));
}

#[test]
fn batch_size_disagreement_is_rejected() {
    let engine = unit_engine(2, vec![1.0, 0.5]);
    let mutual = identity_mutual(2);
    let features = tensor3(&[1.0, 0.0, 0.0, 1.0], 2, 1, 2);
    let timestamps = tensor3(&[0.0, 0.0, 1.0, 1.0], 2, 2, 1);
    let hidden = tensor3(&[0.1, 0.2, 0.3, 0.4], 2, 1, 2);

    assert!(engine.mix(1, &hidden, &features, &timestamps, &mutual).is_err());
}

#[test]
fn mutual_matrix_side_mismatch_is_rejected() {
    let engine = unit_engine(2, vec![1.0, 0.5]);
    let mutual = identity_mutual(3);
    let features = tensor3(&[1.0, 0.0, 0.0, 1.0], 2, 1, 2);
    let timestamps = tensor3(&[0.0, 1.0], 2, 1, 1);
    let hidden = tensor3(&[0.1, 0.2, 0.3, 0.4], 2, 1, 2);

    let err = engine
        .mix(1, &hidden, &features, &timestamps, &mutual)
        .unwrap_err();
    assert!(matches!(
        err,
        AttentionError::ShapeMismatch { context: "mutual-intensity matrix", .. }
    ));
}

#[test]
fn time_index_beyond_history_is_rejected() {
    let engine = unit_engine(2, vec![1.0, 0.5]);
    let mutual = identity_mutual(2);
    let features = tensor3(&[1.0, 0.0, 0.0, 1.0], 2, 1, 2);
    let timestamps = tensor3(&[0.0, 1.0], 2, 1, 1);
    let hidden = tensor3(&[0.1, 0.2, 0.3, 0.4], 2, 1, 2);

    assert!(engine.mix(2, &hidden, &features, &timestamps, &mutual).is_err());
}
