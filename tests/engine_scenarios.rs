//! End-to-end scenarios for the counterfactual engine
//!
//! Exercises the orchestration contract: strategy dispatch, constraint
//! respect, default-outcome resolution, empty-result semantics, and the
//! single fatal configuration error.

use std::collections::HashMap;

use approx::assert_relative_eq;
use ndarray::{Array1, Array2, ArrayView2};

use explicar::{
    ConstraintOverride, CounterfactualEngine, CounterfactualRequest, DistanceMetric,
    DesiredOutcome, EngineConfig, Error, FnModel, Instance, Model, OptimizationMethod,
};

/// Binary classifier: class 1 iff the first feature exceeds 0.5. Exposes
/// probabilities so default-outcome resolution takes the binary-flip path.
struct FirstFeatureThreshold;

impl Model for FirstFeatureThreshold {
    fn predict(&self, batch: ArrayView2<'_, f64>) -> explicar::Result<Array1<f64>> {
        Ok(batch
            .rows()
            .into_iter()
            .map(|row| if row[0] > 0.5 { 1.0 } else { 0.0 })
            .collect())
    }

    fn predict_proba(
        &self,
        batch: ArrayView2<'_, f64>,
    ) -> explicar::Result<Option<Array2<f64>>> {
        let rows: Vec<[f64; 2]> = batch
            .rows()
            .into_iter()
            .map(|row| if row[0] > 0.5 { [0.1, 0.9] } else { [0.9, 0.1] })
            .collect();
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Ok(Some(
            Array2::from_shape_vec((rows.len(), 2), flat).expect("shape"),
        ))
    }
}

#[test]
fn binary_flip_with_random_search() {
    let instance = Instance::from_values(vec![0.2, 0.9]);
    let mut constraints = HashMap::new();
    constraints.insert("feature_0".to_string(), ConstraintOverride::range(0.0, 1.0));
    constraints.insert("feature_1".to_string(), ConstraintOverride::immutable());

    let request = CounterfactualRequest {
        method: OptimizationMethod::RandomSearch,
        max_changes: 1,
        constraints,
        ..Default::default()
    };
    let result = CounterfactualEngine::default()
        .generate_counterfactuals(&FirstFeatureThreshold, &instance, &request)
        .unwrap();

    assert_eq!(result.original_prediction, 0.0);
    assert_eq!(result.desired_outcome, DesiredOutcome::Class(1));
    assert!(!result.counterfactuals.is_empty());
    for cf in &result.counterfactuals {
        assert_eq!(cf.values[1], 0.9, "immutable feature must be untouched");
        assert!(cf.values[0] > 0.5, "flip requires feature_0 past threshold");
        assert!(cf.achieves_desired_outcome);
        assert_eq!(cf.prediction, 1.0);
    }
}

#[test]
fn unknown_method_string_is_a_configuration_error() {
    let err = "nonexistent".parse::<OptimizationMethod>();
    match err {
        Err(Error::UnknownMethod(name)) => assert_eq!(name, "nonexistent"),
        other => panic!("expected UnknownMethod, got {other:?}"),
    }
}

#[test]
fn genetic_search_fills_quota_on_always_flippable_model() {
    // Every prediction already satisfies the desired class, so the genetic
    // strategy must fill the quota well within its generation budget.
    let model = FnModel::new(|_: &[f64]| 1.0);
    let instance = Instance::from_values(vec![10.0, 20.0, 30.0]);
    let request = CounterfactualRequest {
        method: OptimizationMethod::Genetic,
        desired_outcome: Some(DesiredOutcome::Class(1)),
        ..Default::default()
    };
    let result = CounterfactualEngine::default()
        .generate_counterfactuals(&model, &instance, &request)
        .unwrap();

    assert_eq!(result.counterfactuals.len(), request.n_counterfactuals);
    assert_eq!(result.metadata.method, "genetic_algorithm");
    assert!(result.feasibility_scores.average_feasibility > 0.0);
}

#[test]
fn unreachable_outcome_returns_empty_well_formed_result() {
    let model = FnModel::new(|_: &[f64]| 0.0);
    let instance = Instance::from_values(vec![1.0, 2.0]);
    for method in [
        OptimizationMethod::GradientDescent,
        OptimizationMethod::Genetic,
        OptimizationMethod::RandomSearch,
    ] {
        let request = CounterfactualRequest {
            method,
            desired_outcome: Some(DesiredOutcome::Class(5)),
            ..Default::default()
        };
        let result = CounterfactualEngine::default()
            .generate_counterfactuals(&model, &instance, &request)
            .unwrap();
        assert!(result.counterfactuals.is_empty(), "{method:?}");
        assert!(result.actionable_insights.is_empty());
        assert_eq!(result.feasibility_scores.average_feasibility, 0.0);
        assert_eq!(result.metadata.n_produced, 0);
    }
}

#[test]
fn gradient_descent_reaches_regression_target() {
    // Linear model: prediction is the feature sum, so finite differences
    // recover an exact gradient and descent walks straight to the target.
    let model = FnModel::new(|x: &[f64]| x.iter().sum());
    let instance = Instance::from_values(vec![1.0, 2.0]);
    let request = CounterfactualRequest::default(); // gradient, default outcome
    let result = CounterfactualEngine::default()
        .generate_counterfactuals(&model, &instance, &request)
        .unwrap();

    assert_eq!(result.original_prediction, 3.0);
    // Regression default: 0.8 * prediction.
    assert_eq!(result.desired_outcome, DesiredOutcome::Value(2.4));
    assert!(!result.counterfactuals.is_empty());
    for cf in &result.counterfactuals {
        assert!((cf.prediction - 2.4).abs() < 0.1);
        assert!(cf.achieves_desired_outcome);
    }
}

#[test]
fn gradient_descent_honors_single_change_budget() {
    // Only the first feature matters to the model, so a budget of one must
    // leave the second feature bit-identical in every accepted candidate —
    // including the randomized start of each attempt.
    let model = FnModel::new(|x: &[f64]| x[0]);
    let instance = Instance::from_values(vec![10.0, 20.0]);
    let request = CounterfactualRequest {
        method: OptimizationMethod::GradientDescent,
        desired_outcome: Some(DesiredOutcome::Value(9.8)),
        max_changes: 1,
        ..Default::default()
    };

    let mut produced = 0;
    for seed in 0..20 {
        let engine = CounterfactualEngine::new(EngineConfig { seed, ..Default::default() });
        let result = engine
            .generate_counterfactuals(&model, &instance, &request)
            .unwrap();
        produced += result.counterfactuals.len();
        for cf in &result.counterfactuals {
            assert!(cf.sparsity <= 1, "seed {seed}: {:?}", cf.values);
            assert_eq!(cf.values[1], 20.0, "seed {seed}: untouched feature drifted");
        }
    }
    assert!(produced > 0);
}

#[test]
fn manhattan_metric_changes_distance_not_ranking_contract() {
    let model = FnModel::new(|_: &[f64]| 1.0);
    let instance = Instance::from_values(vec![10.0, 20.0, 30.0]);
    let request = CounterfactualRequest {
        method: OptimizationMethod::RandomSearch,
        metric: DistanceMetric::Manhattan,
        desired_outcome: Some(DesiredOutcome::Class(1)),
        n_counterfactuals: 5,
        ..Default::default()
    };
    let result = CounterfactualEngine::default()
        .generate_counterfactuals(&model, &instance, &request)
        .unwrap();

    assert!(!result.counterfactuals.is_empty());
    for pair in result.counterfactuals.windows(2) {
        assert!(pair[0].proximity_score >= pair[1].proximity_score);
    }
    for cf in &result.counterfactuals {
        let manhattan: f64 = cf
            .values
            .iter()
            .zip(instance.values())
            .map(|(a, b)| (a - b).abs())
            .sum();
        assert_relative_eq!(cf.distance, manhattan, max_relative = 1e-12);
    }
}

#[test]
fn model_call_cap_degrades_instead_of_failing() {
    let model = FnModel::new(|_: &[f64]| 1.0);
    let instance = Instance::from_values(vec![10.0, 20.0]);
    let engine = CounterfactualEngine::new(EngineConfig {
        max_model_calls: Some(10),
        ..Default::default()
    });
    let request = CounterfactualRequest {
        method: OptimizationMethod::RandomSearch,
        desired_outcome: Some(DesiredOutcome::Class(1)),
        n_counterfactuals: 100,
        ..Default::default()
    };
    let result = engine
        .generate_counterfactuals(&model, &instance, &request)
        .unwrap();
    assert!(result.metadata.model_calls <= 10);
    assert!(result.counterfactuals.len() <= 100);
}

#[test]
fn cancellation_flag_stops_search_early() {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    let cancel = Arc::new(AtomicBool::new(true));
    let engine = CounterfactualEngine::new(EngineConfig {
        cancel: Some(Arc::clone(&cancel)),
        ..Default::default()
    });
    let model = FnModel::new(|_: &[f64]| 1.0);
    let instance = Instance::from_values(vec![1.0, 2.0]);
    let request = CounterfactualRequest {
        method: OptimizationMethod::RandomSearch,
        desired_outcome: Some(DesiredOutcome::Class(1)),
        ..Default::default()
    };
    let result = engine
        .generate_counterfactuals(&model, &instance, &request)
        .unwrap();
    assert!(result.counterfactuals.is_empty());
    // Baseline predict plus the probability probe, nothing from the search.
    assert_eq!(result.metadata.model_calls, 2);
}

#[test]
fn insights_rank_frequently_changed_actionable_features() {
    let model = FnModel::new(|_: &[f64]| 1.0);
    let instance = Instance::new(
        vec![40_000.0, 12.0, 30.0],
        vec![
            "income".to_string(),
            "education_years".to_string(),
            "age".to_string(),
        ],
    )
    .unwrap();
    let mut constraints = HashMap::new();
    constraints.insert("age".to_string(), ConstraintOverride::immutable());

    let request = CounterfactualRequest {
        method: OptimizationMethod::RandomSearch,
        desired_outcome: Some(DesiredOutcome::Class(1)),
        n_counterfactuals: 5,
        constraints,
        ..Default::default()
    };
    let result = CounterfactualEngine::default()
        .generate_counterfactuals(&model, &instance, &request)
        .unwrap();

    assert!(!result.actionable_insights.is_empty());
    for (i, insight) in result.actionable_insights.iter().enumerate() {
        assert_eq!(insight.importance_rank, i + 1);
        assert_ne!(insight.feature, "age", "immutable features never change");
        assert_eq!(insight.actionability_score, 0.9);
        assert!(!insight.recommendation_text.is_empty());
    }
}

#[test]
fn desired_outcome_default_multiclass_picks_runner_up() {
    struct ThreeClass;
    impl Model for ThreeClass {
        fn predict(&self, batch: ArrayView2<'_, f64>) -> explicar::Result<Array1<f64>> {
            Ok(Array1::from_elem(batch.nrows(), 2.0))
        }
        fn predict_proba(
            &self,
            batch: ArrayView2<'_, f64>,
        ) -> explicar::Result<Option<Array2<f64>>> {
            let mut probs = Array2::zeros((batch.nrows(), 3));
            for mut row in probs.rows_mut() {
                row[0] = 0.1;
                row[1] = 0.3;
                row[2] = 0.6;
            }
            Ok(Some(probs))
        }
    }

    let instance = Instance::from_values(vec![1.0]);
    let request = CounterfactualRequest {
        method: OptimizationMethod::RandomSearch,
        ..Default::default()
    };
    let result = CounterfactualEngine::default()
        .generate_counterfactuals(&ThreeClass, &instance, &request)
        .unwrap();
    assert_eq!(result.desired_outcome, DesiredOutcome::Class(1));
    assert_eq!(result.original_probabilities, Some(vec![0.1, 0.3, 0.6]));
}
