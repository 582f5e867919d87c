//! Sparse feature encoding and z-score normalization for the linear backend.
//!
//! A `FeatureIndexMap` assigns every declared feature a dense index starting
//! at 1; `encode` turns a data point into sparse (index, value) pairs, and
//! `normalize` rescales each entry against aggregations built once at
//! training time. The map and aggregations are computed from training data
//! only and reused verbatim at inference, so indexing stays consistent and
//! no test-time statistics leak into the model.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::data_handling::{DataPoint, Feature, FeatureKind, FeatureSet};
use crate::error::ClassifierError;
use crate::stats::Aggregation;

/// Sparse feature vector: (index, value) pairs with indices dense from 1.
pub type SparseVector = Vec<(usize, f64)>;

/// Bidirectional feature-to-index map. Built once from a training feature
/// set's declarations and frozen; the class attribute is not indexed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureIndexMap {
    features: Vec<Feature>,
    index_by_name: HashMap<String, usize>,
}

impl FeatureIndexMap {
    /// Assign each declared feature a unique index starting at 1, in
    /// declaration order, skipping the class attribute.
    pub fn build(data: &FeatureSet) -> Self {
        let mut map = FeatureIndexMap::default();
        for feature in data.features() {
            if feature.name() == data.class_attribute() {
                continue;
            }
            map.index_by_name
                .insert(feature.name().to_owned(), map.features.len() + 1);
            map.features.push(feature.clone());
        }
        map
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    /// Feature assigned to a 1-based index.
    pub fn feature_at(&self, index: usize) -> Option<&Feature> {
        if index == 0 {
            return None;
        }
        self.features.get(index - 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Feature)> {
        self.features.iter().enumerate().map(|(i, f)| (i + 1, f))
    }
}

/// Encode a data point as a sparse vector against `map`.
///
/// Nominal values encode as their vocabulary index, numeric values as the
/// literal value (NaN skipped), and absent features are simply omitted.
/// Text features cannot be encoded by this backend and fail fast.
pub fn encode(point: &DataPoint, map: &FeatureIndexMap) -> Result<SparseVector, ClassifierError> {
    let mut vector = SparseVector::new();
    for (index, feature) in map.iter() {
        match feature.kind() {
            FeatureKind::Numeric => {
                if let Some(value) = point.numeric(feature.name()) {
                    if value.is_nan() {
                        continue;
                    }
                    vector.push((index, value));
                }
            }
            FeatureKind::Nominal(_) => {
                if let Some(value) = point.symbolic(feature.name()) {
                    match feature.value_index(value) {
                        Some(pos) => vector.push((index, pos as f64)),
                        None => log::debug!(
                            "value '{}' is not in the vocabulary of '{}'; skipping",
                            value,
                            feature.name()
                        ),
                    }
                }
            }
            FeatureKind::Text => {
                return Err(ClassifierError::UnsupportedFeatureType {
                    feature: feature.name().to_owned(),
                    kind: feature.kind().describe().to_owned(),
                });
            }
        }
    }
    Ok(vector)
}

/// Accumulate one `Aggregation` per indexed feature name over the encoded
/// values of every training point.
pub fn build_aggregations(
    data: &FeatureSet,
    map: &FeatureIndexMap,
) -> Result<HashMap<String, Aggregation>, ClassifierError> {
    let mut aggregations: HashMap<String, Aggregation> = HashMap::new();
    for point in data.data_points() {
        for (index, value) in encode(point, map)? {
            if let Some(feature) = map.feature_at(index) {
                aggregations
                    .entry(feature.name().to_owned())
                    .or_default()
                    .insert(value);
            }
        }
    }
    Ok(aggregations)
}

/// Replace each entry's value with its z-score against `aggregations`.
///
/// The value is forced to 0 when the feature's aggregation holds fewer than
/// two samples, when the feature is not recognized at all, or when the
/// result is not finite (zero-variance feature). Inference never fails for
/// incomplete or unseen attributes; uninformative entries go to 0 instead.
pub fn normalize(
    vector: &mut SparseVector,
    map: &FeatureIndexMap,
    aggregations: &HashMap<String, Aggregation>,
) {
    for (index, value) in vector.iter_mut() {
        let agg = map
            .feature_at(*index)
            .and_then(|f| aggregations.get(f.name()));
        *value = match agg {
            Some(agg) if agg.count() >= 2 => {
                let z = (*value - agg.mean()) / agg.stddev();
                if z.is_finite() {
                    z
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::Feature;

    fn boundary_set() -> FeatureSet {
        let mut data = FeatureSet::new(
            vec![
                Feature::numeric("f0_mean"),
                Feature::numeric("pause_dur"),
                Feature::nominal("stress", vec!["primary".to_owned(), "none".to_owned()]),
                Feature::nominal("boundary", vec!["B".to_owned(), "NB".to_owned()]),
            ],
            "boundary",
        );
        for (f0, pause, stress, label) in [
            (110.0, 0.0, "primary", "NB"),
            (150.0, 0.4, "none", "B"),
            (130.0, 0.2, "primary", "NB"),
        ] {
            let mut p = DataPoint::new();
            p.set_attribute("f0_mean", f0);
            p.set_attribute("pause_dur", pause);
            p.set_attribute("stress", stress);
            p.set_attribute("boundary", label);
            data.push(p);
        }
        data
    }

    #[test]
    fn map_indexes_declared_features_from_one_and_skips_class() {
        let data = boundary_set();
        let map = FeatureIndexMap::build(&data);
        assert_eq!(map.len(), 3);
        assert_eq!(map.index_of("f0_mean"), Some(1));
        assert_eq!(map.index_of("stress"), Some(3));
        assert_eq!(map.index_of("boundary"), None);
        assert_eq!(map.feature_at(0), None);
        assert_eq!(map.feature_at(2).map(Feature::name), Some("pause_dur"));
    }

    #[test]
    fn encode_emits_sparse_entries_and_skips_absent_or_nan() {
        let data = boundary_set();
        let map = FeatureIndexMap::build(&data);

        let mut point = DataPoint::new();
        point.set_attribute("f0_mean", f64::NAN);
        point.set_attribute("stress", "none");
        let vector = encode(&point, &map).unwrap();
        assert_eq!(vector, vec![(3, 1.0)]);
    }

    #[test]
    fn encode_fails_fast_on_text_features() {
        let mut data = boundary_set();
        data = FeatureSet::new(
            {
                let mut features = data.features().to_vec();
                features.push(Feature::text("word"));
                features
            },
            "boundary",
        );
        let map = FeatureIndexMap::build(&data);
        let point = DataPoint::new();
        match encode(&point, &map) {
            Err(ClassifierError::UnsupportedFeatureType { feature, .. }) => {
                assert_eq!(feature, "word");
            }
            other => panic!("expected unsupported feature type, got {:?}", other),
        }
    }

    #[test]
    fn normalize_zeroes_unseen_sparse_and_degenerate_entries() {
        let data = boundary_set();
        let map = FeatureIndexMap::build(&data);
        let aggregations = build_aggregations(&data, &map).unwrap();

        // pause_dur aggregation: mean 0.2, stdev 0.2
        let mut vector = vec![(2, 0.4)];
        normalize(&mut vector, &map, &aggregations);
        assert!((vector[0].1 - 1.0).abs() < 1e-12);

        // index outside the map resolves to 0
        let mut unknown = vec![(99, 5.0)];
        normalize(&mut unknown, &map, &aggregations);
        assert_eq!(unknown[0].1, 0.0);

        // a feature seen fewer than twice resolves to 0
        let mut single = FeatureSet::new(data.features().to_vec(), "boundary");
        let mut p = DataPoint::new();
        p.set_attribute("f0_mean", 100.0);
        single.push(p);
        let sparse_aggs = build_aggregations(&single, &map).unwrap();
        let mut vector = vec![(1, 100.0)];
        normalize(&mut vector, &map, &sparse_aggs);
        assert_eq!(vector[0].1, 0.0);
    }

    #[test]
    fn encode_then_normalize_is_repeatable_with_frozen_parameters() {
        let data = boundary_set();
        let map = FeatureIndexMap::build(&data);
        let aggregations = build_aggregations(&data, &map).unwrap();

        let point = &data.data_points()[1];
        let mut first = encode(point, &map).unwrap();
        normalize(&mut first, &map, &aggregations);
        let mut second = encode(point, &map).unwrap();
        normalize(&mut second, &map, &aggregations);
        assert_eq!(first, second);
    }

    #[test]
    fn zero_variance_feature_normalizes_to_zero() {
        let mut data = FeatureSet::new(
            vec![
                Feature::numeric("constant"),
                Feature::nominal("boundary", vec!["B".to_owned(), "NB".to_owned()]),
            ],
            "boundary",
        );
        for label in ["B", "NB"] {
            let mut p = DataPoint::new();
            p.set_attribute("constant", 7.0);
            p.set_attribute("boundary", label);
            data.push(p);
        }
        let map = FeatureIndexMap::build(&data);
        let aggregations = build_aggregations(&data, &map).unwrap();
        let mut vector = vec![(1, 7.0)];
        normalize(&mut vector, &map, &aggregations);
        assert_eq!(vector[0].1, 0.0);
    }
}
