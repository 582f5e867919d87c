//! Gradient-boosting classifier over the general-purpose `gbdt` library.
//!
//! Adapts the crate's data model to the library's instance representation:
//! one column per declared feature (nominal values as vocabulary indices,
//! text values through a train-time value dictionary), the class attribute
//! located by name with a fallback to the final declared feature.
//! Multiclass prediction is one-vs-rest, and the instance-weighted variant
//! feeds linear-scheme class weights straight into the library's
//! per-instance weight slot.
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::data_handling::{DataPoint, Feature, FeatureKind, FeatureSet};
use crate::distribution::Distribution;
use crate::error::ClassifierError;
use crate::models::classifier_trait::Classifier;
use crate::persistence::SavedClassifier;
use crate::weights::{train_class_weights, WeightScheme};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtParams {
    pub max_depth: u32,
    pub num_boost_round: u32,
    pub learning_rate: f32,
    /// Weight each training instance by its linear class weight.
    pub instance_weighted: bool,
}

impl Default for GbdtParams {
    fn default() -> Self {
        GbdtParams {
            max_depth: 6,
            num_boost_round: 50,
            learning_rate: 0.1,
            instance_weighted: false,
        }
    }
}

/// The library's instance layout: one column per non-class feature, with
/// per-feature value dictionaries for text columns. Built once at training
/// time and frozen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSchema {
    pub(crate) features: Vec<Feature>,
    pub(crate) class_attribute: String,
    pub(crate) text_tables: HashMap<String, Vec<String>>,
}

impl InstanceSchema {
    fn build(data: &FeatureSet, class_attribute: &str) -> Self {
        let features: Vec<Feature> = data
            .features()
            .iter()
            .filter(|f| f.name() != class_attribute)
            .cloned()
            .collect();

        let mut text_tables: HashMap<String, Vec<String>> = HashMap::new();
        for feature in &features {
            if matches!(feature.kind(), FeatureKind::Text) {
                let mut table: Vec<String> = Vec::new();
                for point in data.data_points() {
                    if let Some(value) = point.symbolic(feature.name()) {
                        if !table.iter().any(|v| v == value) {
                            table.push(value.to_owned());
                        }
                    }
                }
                text_tables.insert(feature.name().to_owned(), table);
            }
        }

        InstanceSchema { features, class_attribute: class_attribute.to_owned(), text_tables }
    }

    fn len(&self) -> usize {
        self.features.len()
    }

    /// Dense row for one data point. Absent numeric values encode as 0,
    /// unknown nominal or text values as -1.
    fn encode_row(&self, point: &DataPoint) -> Vec<f32> {
        self.features
            .iter()
            .map(|feature| match feature.kind() {
                FeatureKind::Numeric => point
                    .numeric(feature.name())
                    .filter(|v| v.is_finite())
                    .unwrap_or(0.0) as f32,
                FeatureKind::Nominal(_) => point
                    .symbolic(feature.name())
                    .and_then(|v| feature.value_index(v))
                    .map(|i| i as f32)
                    .unwrap_or(-1.0),
                FeatureKind::Text => point
                    .symbolic(feature.name())
                    .and_then(|v| {
                        self.text_tables
                            .get(feature.name())
                            .and_then(|table| table.iter().position(|t| t == v))
                    })
                    .map(|i| i as f32)
                    .unwrap_or(-1.0),
            })
            .collect()
    }
}

#[derive(Serialize, Deserialize)]
pub struct GbdtState {
    pub(crate) schema: InstanceSchema,
    /// Full class vocabulary at training time, in declaration order.
    pub(crate) class_labels: Vec<String>,
    /// Vocabulary indices with a fitted one-vs-rest model, aligned with
    /// `models`.
    pub(crate) trained_classes: Vec<usize>,
    pub(crate) models: Vec<GBDT>,
}

/// Gradient Boosting Decision Tree classifier, plain or instance-weighted.
pub struct GbdtClassifier {
    params: GbdtParams,
    state: Option<GbdtState>,
}

impl GbdtClassifier {
    pub fn new(params: GbdtParams) -> Self {
        GbdtClassifier { params, state: None }
    }

    pub(crate) fn from_state(params: GbdtParams, state: GbdtState) -> Self {
        GbdtClassifier { params, state: Some(state) }
    }

    pub fn params(&self) -> &GbdtParams {
        &self.params
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_some()
    }

    fn solver_config(&self, feature_size: usize) -> Config {
        let mut config = Config::new();
        config.set_feature_size(feature_size);
        config.set_shrinkage(self.params.learning_rate);
        config.set_max_depth(self.params.max_depth);
        config.set_iterations(self.params.num_boost_round as usize);
        config.set_loss("LogLikelyhood");
        // optimization level 2 assumes uniform sample weights
        config.set_training_optimization_level(if self.params.instance_weighted { 1 } else { 2 });
        config
    }

    fn deep_copy_state(state: &GbdtState) -> Result<GbdtState, ClassifierError> {
        let bytes = bincode::serialize(state)
            .map_err(|e| ClassifierError::Persistence(e.to_string()))?;
        bincode::deserialize(&bytes).map_err(|e| ClassifierError::Persistence(e.to_string()))
    }
}

impl Classifier for GbdtClassifier {
    fn train(&mut self, data: &FeatureSet) -> Result<(), ClassifierError> {
        // locate the class feature by name, falling back to the final
        // declared feature
        let class_feature = data
            .feature(data.class_attribute())
            .or_else(|| data.features().last())
            .ok_or_else(|| {
                ClassifierError::Schema("feature set declares no features".to_owned())
            })?;
        let class_attribute = class_feature.name().to_owned();
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

        let schema = InstanceSchema::build(data, &class_attribute);
        if schema.len() == 0 {
            return Err(ClassifierError::DegenerateTrainingSet(
                "feature set declares no encodable features".to_owned(),
            ));
        }

        let mut rows: Vec<Vec<f32>> = Vec::with_capacity(data.len());
        let mut labels: Vec<usize> = Vec::with_capacity(data.len());
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
            rows.push(schema.encode_row(point));
            labels.push(target);
        }

        let mut trained_classes: Vec<usize> = labels.clone();
        trained_classes.sort_unstable();
        trained_classes.dedup();
        if trained_classes.len() < 2 {
            return Err(ClassifierError::DegenerateTrainingSet(format!(
                "all data points share the class '{}'",
                class_labels[trained_classes[0]]
            )));
        }

        let instance_weights: Vec<f32> = if self.params.instance_weighted {
            let weight_fn =
                train_class_weights(data.data_points(), &class_attribute, WeightScheme::Linear)?;
            data.data_points()
                .iter()
                .map(|p| weight_fn.weight_for(p) as f32)
                .collect()
        } else {
            vec![1.0; rows.len()]
        };

        let mut models = Vec::with_capacity(trained_classes.len());
        for &class_index in &trained_classes {
            let mut gbdt = GBDT::new(&self.solver_config(schema.len()));
            let mut train_x = DataVec::new();
            for ((row, &label), &weight) in
                rows.iter().zip(labels.iter()).zip(instance_weights.iter())
            {
                // log-likelihood loss takes labels in {-1, 1}
                let target = if label == class_index { 1.0 } else { -1.0 };
                train_x.push(Data::new_training_data(row.clone(), weight, target, None));
            }
            gbdt.fit(&mut train_x);
            models.push(gbdt);
        }
        log::debug!(
            "fitted {} one-vs-rest gbdt models over {} features",
            models.len(),
            schema.len()
        );

        self.state = Some(GbdtState { schema, class_labels, trained_classes, models });
        Ok(())
    }

    fn distribution_for_instance(
        &self,
        point: &DataPoint,
    ) -> Result<Distribution, ClassifierError> {
        let state = self.state.as_ref().ok_or(ClassifierError::NotTrained)?;
        let row = state.schema.encode_row(point);
        let test_x: DataVec = vec![Data::new_test_data(row, None)];

        let mut dist = Distribution::new();
        for (vocab_index, label) in state.class_labels.iter().enumerate() {
            let mass = state
                .trained_classes
                .iter()
                .position(|&c| c == vocab_index)
                .map(|j| state.models[j].predict(&test_x)[0] as f64)
                .unwrap_or(0.0);
            dist.set(label, mass);
        }
        dist.normalize()?;
        Ok(dist)
    }

    fn new_instance(&self) -> Box<dyn Classifier> {
        if self.params.instance_weighted {
            // weight-trained models are retrained from scratch on each
            // resampling
            return Box::new(GbdtClassifier::new(self.params.clone()));
        }
        match &self.state {
            Some(state) => match Self::deep_copy_state(state) {
                Ok(copy) => Box::new(GbdtClassifier::from_state(self.params.clone(), copy)),
                Err(err) => {
                    log::warn!("failed to copy fitted gbdt state: {}; returning untrained", err);
                    Box::new(GbdtClassifier::new(self.params.clone()))
                }
            },
            None => Box::new(GbdtClassifier::new(self.params.clone())),
        }
    }

    fn name(&self) -> &str {
        if self.params.instance_weighted {
            "gbdt (instance-weighted)"
        } else {
            "gbdt"
        }
    }

    fn to_saved(&self) -> Result<SavedClassifier, ClassifierError> {
        let state = self.state.as_ref().ok_or_else(|| {
            ClassifierError::Persistence("gbdt classifier is not trained".to_owned())
        })?;
        Ok(SavedClassifier::Gbdt {
            params: self.params.clone(),
            state: Self::deep_copy_state(state)?,
        })
    }
}
