//! Linear-model classifier over a regularized logistic-regression solver.
//!
//! Training builds the feature index map and normalization aggregations,
//! encodes every point into a normalized feature matrix, and delegates
//! fitting to `linfa-logistic`'s multinomial solver. The fitted
//! coefficients and intercepts are extracted into an owned `LinearFit`, so
//! inference (a softmax over `x·W + b`) and persistence do not depend on
//! solver internals.
use std::collections::HashMap;

use linfa::traits::Fit;
use linfa::Dataset;
use linfa_logistic::MultiLogisticRegression;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::data_handling::{DataPoint, FeatureSet};
use crate::distribution::Distribution;
use crate::encoding::{self, FeatureIndexMap, SparseVector};
use crate::error::ClassifierError;
use crate::models::classifier_trait::Classifier;
use crate::persistence::SavedClassifier;
use crate::stats::Aggregation;
use crate::weights::{train_class_weights, WeightScheme};

/// Solver hyper-parameters for the linear backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearParams {
    /// L2 regularization strength.
    pub alpha: f64,
    /// Convergence tolerance on the loss gradient.
    pub gradient_tolerance: f64,
    pub max_iterations: u64,
    /// Apply linear-scheme class weights during training.
    pub class_weighted: bool,
}

impl Default for LinearParams {
    fn default() -> Self {
        LinearParams {
            alpha: 1.0,
            gradient_tolerance: 1e-4,
            max_iterations: 200,
            class_weighted: false,
        }
    }
}

/// Fitted coefficients extracted from the solver. Row-major weights with
/// one column per trained class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearFit {
    pub(crate) weights: Vec<f64>,
    pub(crate) intercept: Vec<f64>,
    /// Class-vocabulary indices with a trained column, ascending.
    pub(crate) classes: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearState {
    pub(crate) map: FeatureIndexMap,
    pub(crate) aggregations: HashMap<String, Aggregation>,
    pub(crate) fit: LinearFit,
    /// Full class vocabulary, in declaration order.
    pub(crate) class_labels: Vec<String>,
}

/// Linear-model classifier, plain or class-weighted.
#[derive(Debug, Clone, Default)]
pub struct LinearClassifier {
    params: LinearParams,
    state: Option<LinearState>,
}

impl LinearClassifier {
    pub fn new(params: LinearParams) -> Self {
        LinearClassifier { params, state: None }
    }

    pub(crate) fn from_state(params: LinearParams, state: LinearState) -> Self {
        LinearClassifier { params, state: Some(state) }
    }

    pub fn params(&self) -> &LinearParams {
        &self.params
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_some()
    }

    fn encode_normalized(
        state: &LinearState,
        point: &DataPoint,
    ) -> Result<Vec<f64>, ClassifierError> {
        let mut sparse: SparseVector = encoding::encode(point, &state.map)?;
        encoding::normalize(&mut sparse, &state.map, &state.aggregations);
        let mut dense = vec![0.0; state.map.len()];
        for (index, value) in sparse {
            dense[index - 1] = value;
        }
        Ok(dense)
    }

    /// Expand rows in proportion to their linear class weight, so rare
    /// classes contribute as much to the solver's loss as frequent ones.
    /// The solver itself fits unweighted rows.
    fn replicate_by_class_weight(
        data: &FeatureSet,
        class_attribute: &str,
        rows: &mut Vec<Vec<f64>>,
        targets: &mut Vec<usize>,
    ) -> Result<(), ClassifierError> {
        let weight_fn =
            train_class_weights(data.data_points(), class_attribute, WeightScheme::Linear)?;
        let min_weight = weight_fn
            .iter()
            .map(|(_, w)| w)
            .fold(f64::INFINITY, f64::min);

        let mut expanded_rows = Vec::with_capacity(rows.len());
        let mut expanded_targets = Vec::with_capacity(targets.len());
        for (point, (row, target)) in data
            .data_points()
            .iter()
            .zip(rows.iter().zip(targets.iter()))
        {
            let weight = weight_fn.weight_for(point);
            let copies = ((weight / min_weight).round() as usize).max(1);
            for _ in 0..copies {
                expanded_rows.push(row.clone());
                expanded_targets.push(*target);
            }
        }
        log::debug!(
            "class-weighted training expanded {} rows to {}",
            rows.len(),
            expanded_rows.len()
        );
        *rows = expanded_rows;
        *targets = expanded_targets;
        Ok(())
    }
}

impl Classifier for LinearClassifier {
    fn train(&mut self, data: &FeatureSet) -> Result<(), ClassifierError> {
        let class_attribute = data.class_attribute().to_owned();
        let class_feature = data.feature(&class_attribute).ok_or_else(|| {
            ClassifierError::Schema(format!(
                "class attribute '{}' is not declared",
                class_attribute
            ))
        })?;
        let class_labels: Vec<String> = class_feature
            .vocabulary()
            .ok_or_else(|| {
                ClassifierError::Schema(format!(
                    "class attribute '{}' declares no nominal vocabulary",
                    class_attribute
                ))
            })?
            .to_vec();
        if data.is_empty() {
            return Err(ClassifierError::EmptyTrainingSet);
        }

        let map = FeatureIndexMap::build(data);
        if map.is_empty() {
            return Err(ClassifierError::DegenerateTrainingSet(
                "feature set declares no encodable features".to_owned(),
            ));
        }
        let aggregations = encoding::build_aggregations(data, &map)?;

        let state_view = LinearState {
            map,
            aggregations,
            fit: LinearFit { weights: vec![], intercept: vec![], classes: vec![] },
            class_labels: class_labels.clone(),
        };

        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(data.len());
        let mut targets: Vec<usize> = Vec::with_capacity(data.len());
        for point in data.data_points() {
            let label = point.symbolic(&class_attribute).ok_or_else(|| {
                ClassifierError::Schema(format!(
                    "a data point is missing the class attribute '{}'",
                    class_attribute
                ))
            })?;
            let target = class_feature.value_index(label).ok_or_else(|| {
                ClassifierError::Schema(format!(
                    "class value '{}' is not in the declared vocabulary",
                    label
                ))
            })?;
            rows.push(Self::encode_normalized(&state_view, point)?);
            targets.push(target);
        }

        let mut classes: Vec<usize> = targets.clone();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(ClassifierError::DegenerateTrainingSet(format!(
                "all data points share the class '{}'",
                class_labels[classes[0]]
            )));
        }

        if self.params.class_weighted {
            Self::replicate_by_class_weight(data, &class_attribute, &mut rows, &mut targets)?;
        }

        let n_features = state_view.map.len();
        let n_rows = rows.len();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let records = Array2::from_shape_vec((n_rows, n_features), flat)
            .map_err(|e| ClassifierError::Backend(e.to_string()))?;
        let dataset = Dataset::new(records, Array1::from_vec(targets));

        let model = MultiLogisticRegression::default()
            .alpha(self.params.alpha)
            .gradient_tolerance(self.params.gradient_tolerance)
            .max_iterations(self.params.max_iterations)
            .fit(&dataset)
            .map_err(|e| ClassifierError::Backend(e.to_string()))?;

        // Solver columns follow ascending class order; `classes` matches.
        let coeffs = model.params();
        let intercept = model.intercept();
        let n_classes = classes.len();
        let mut weights = Vec::with_capacity(n_features * n_classes);
        for i in 0..n_features {
            for j in 0..n_classes {
                weights.push(coeffs[(i, j)]);
            }
        }

        log::debug!(
            "fitted linear model over {} features and {} classes",
            n_features,
            n_classes
        );

        self.state = Some(LinearState {
            fit: LinearFit {
                weights,
                intercept: intercept.to_vec(),
                classes,
            },
            ..state_view
        });
        Ok(())
    }

    fn distribution_for_instance(
        &self,
        point: &DataPoint,
    ) -> Result<Distribution, ClassifierError> {
        let state = self.state.as_ref().ok_or(ClassifierError::NotTrained)?;
        let x = Self::encode_normalized(state, point)?;

        let n_classes = state.fit.classes.len();
        let mut scores = state.fit.intercept.clone();
        for (i, value) in x.iter().enumerate() {
            if *value == 0.0 {
                continue;
            }
            for (j, score) in scores.iter_mut().enumerate() {
                *score += value * state.fit.weights[i * n_classes + j];
            }
        }

        let max_score = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut probs: Vec<f64> = scores.iter().map(|s| (s - max_score).exp()).collect();
        let total: f64 = probs.iter().sum();
        for p in &mut probs {
            *p /= total;
        }

        let mut dist = Distribution::new();
        for (vocab_index, label) in state.class_labels.iter().enumerate() {
            let mass = state
                .fit
                .classes
                .iter()
                .position(|&c| c == vocab_index)
                .map(|j| probs[j])
                .unwrap_or(0.0);
            dist.set(label, mass);
        }
        Ok(dist)
    }

    fn new_instance(&self) -> Box<dyn Classifier> {
        // The fitted state is logically immutable and train() replaces it
        // wholesale, so a value clone is safe to hand out.
        Box::new(self.clone())
    }

    fn name(&self) -> &str {
        if self.params.class_weighted {
            "linear (class-weighted)"
        } else {
            "linear"
        }
    }

    fn to_saved(&self) -> Result<SavedClassifier, ClassifierError> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| {
                ClassifierError::Persistence("linear classifier is not trained".to_owned())
            })?
            .clone();
        Ok(SavedClassifier::Linear {
            params: self.params.clone(),
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::Feature;

    fn accent_schema() -> Vec<Feature> {
        vec![
            Feature::numeric("f0_range"),
            Feature::numeric("intensity"),
            Feature::nominal("accent", vec!["none".to_owned(), "H*".to_owned()]),
        ]
    }

    fn separable_set() -> FeatureSet {
        let mut data = FeatureSet::new(accent_schema(), "accent");
        for (f0, intensity, label) in [
            (1.8, 0.9, "H*"),
            (2.1, 1.1, "H*"),
            (2.4, 0.8, "H*"),
            (1.9, 1.0, "H*"),
            (-2.0, -0.9, "none"),
            (-1.7, -1.2, "none"),
            (-2.2, -1.0, "none"),
            (-1.9, -0.8, "none"),
        ] {
            let mut p = DataPoint::new();
            p.set_attribute("f0_range", f0);
            p.set_attribute("intensity", intensity);
            p.set_attribute("accent", label);
            data.push(p);
        }
        data
    }

    #[test]
    fn trains_and_separates_accented_tokens() {
        let mut classifier = LinearClassifier::new(LinearParams {
            alpha: 0.01,
            ..LinearParams::default()
        });
        let data = separable_set();
        classifier.train(&data).unwrap();

        let dist = classifier
            .distribution_for_instance(&data.data_points()[0])
            .unwrap();
        assert_eq!(dist.len(), 2);
        assert!((dist.total() - 1.0).abs() < 1e-9);
        assert_eq!(dist.argmax(), Some("H*"));

        let label = classifier.classify(&data.data_points()[4]).unwrap();
        assert_eq!(label, "none");
    }

    #[test]
    fn class_weighted_variant_trains_on_imbalanced_data() {
        let mut data = FeatureSet::new(accent_schema(), "accent");
        for (f0, label) in [
            (2.0, "H*"),
            (-1.8, "none"),
            (-2.2, "none"),
            (-1.9, "none"),
            (-2.1, "none"),
            (-2.0, "none"),
        ] {
            let mut p = DataPoint::new();
            p.set_attribute("f0_range", f0);
            p.set_attribute("intensity", f0 / 2.0);
            p.set_attribute("accent", label);
            data.push(p);
        }
        let mut classifier = LinearClassifier::new(LinearParams {
            alpha: 0.01,
            class_weighted: true,
            ..LinearParams::default()
        });
        classifier.train(&data).unwrap();
        let dist = classifier
            .distribution_for_instance(&data.data_points()[0])
            .unwrap();
        assert_eq!(dist.argmax(), Some("H*"));
    }

    #[test]
    fn training_requires_a_nominal_class_vocabulary() {
        let mut data = FeatureSet::new(
            vec![Feature::numeric("f0_range"), Feature::numeric("accent")],
            "accent",
        );
        let mut p = DataPoint::new();
        p.set_attribute("f0_range", 1.0);
        p.set_attribute("accent", 0.0);
        data.push(p);

        let mut classifier = LinearClassifier::new(LinearParams::default());
        assert!(matches!(
            classifier.train(&data),
            Err(ClassifierError::Schema(_))
        ));
    }

    #[test]
    fn single_class_training_is_rejected() {
        let mut data = FeatureSet::new(accent_schema(), "accent");
        for f0 in [1.0, 2.0, 3.0] {
            let mut p = DataPoint::new();
            p.set_attribute("f0_range", f0);
            p.set_attribute("intensity", 0.5);
            p.set_attribute("accent", "H*");
            data.push(p);
        }
        let mut classifier = LinearClassifier::new(LinearParams::default());
        assert!(matches!(
            classifier.train(&data),
            Err(ClassifierError::DegenerateTrainingSet(_))
        ));
    }

    #[test]
    fn untrained_inference_fails_explicitly() {
        let classifier = LinearClassifier::new(LinearParams::default());
        let point = DataPoint::new();
        assert!(matches!(
            classifier.distribution_for_instance(&point),
            Err(ClassifierError::NotTrained)
        ));
    }

    #[test]
    fn unseen_features_fall_back_to_a_defined_distribution() {
        let mut classifier = LinearClassifier::new(LinearParams {
            alpha: 0.01,
            ..LinearParams::default()
        });
        let data = separable_set();
        classifier.train(&data).unwrap();

        // every feature absent: the encoded vector is all zeros, which is
        // a defined (intercept-only) distribution, not an error
        let bare = DataPoint::new();
        let dist = classifier.distribution_for_instance(&bare).unwrap();
        assert!((dist.total() - 1.0).abs() < 1e-9);
    }
}
