//! Class-weight training for imbalance-aware backends.
//!
//! Derives a per-class importance weight from the empirical class
//! distribution. LINEAR weighting (`1/p`) fully inverse-compensates
//! frequency, so rare classes are weighted up proportionally; ENTROPY
//! weighting (`-p ln p`) is a softer, information-theoretic alternative.
use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data_handling::DataPoint;
use crate::distribution::Distribution;
use crate::error::ClassifierError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightScheme {
    #[default]
    Linear,
    Entropy,
}

impl FromStr for WeightScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(WeightScheme::Linear),
            "entropy" => Ok(WeightScheme::Entropy),
            _ => Err(format!(
                "Unknown weight scheme: {}. Valid options are: linear, entropy",
                s
            )),
        }
    }
}

/// Maps a data point to the trained weight of its class value.
/// Produced once per training run and held immutably afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightFunction {
    class_attribute: String,
    weights: HashMap<String, f64>,
}

impl WeightFunction {
    pub fn class_attribute(&self) -> &str {
        &self.class_attribute
    }

    /// Weight of the point's class value; 0 if the point lacks the class
    /// attribute or carries an unknown value.
    pub fn weight_for(&self, point: &DataPoint) -> f64 {
        point
            .symbolic(&self.class_attribute)
            .and_then(|label| self.weights.get(label))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.weights.get(label).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(l, w)| (l.as_str(), *w))
    }
}

/// Train a `WeightFunction` from the empirical class distribution of
/// `points`. Fails on empty input rather than silently proceeding.
pub fn train_class_weights(
    points: &[DataPoint],
    class_attribute: &str,
    scheme: WeightScheme,
) -> Result<WeightFunction, ClassifierError> {
    let mut dist = Distribution::count_values(points, class_attribute);
    dist.normalize()?;

    let weights = dist
        .iter()
        .map(|(label, p)| {
            let weight = match scheme {
                WeightScheme::Linear => 1.0 / p,
                WeightScheme::Entropy => -p * p.ln(),
            };
            (label.to_owned(), weight)
        })
        .collect();

    Ok(WeightFunction {
        class_attribute: class_attribute.to_owned(),
        weights,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled_points(counts: &[(&str, usize)]) -> Vec<DataPoint> {
        let mut points = Vec::new();
        for (label, count) in counts {
            for _ in 0..*count {
                let mut p = DataPoint::new();
                p.set_attribute("accent", *label);
                points.push(p);
            }
        }
        points
    }

    #[test]
    fn linear_weights_invert_empirical_probabilities() {
        let points = labeled_points(&[("none", 8), ("H*", 2)]);
        let weights = train_class_weights(&points, "accent", WeightScheme::Linear).unwrap();
        assert!((weights.get("none").unwrap() - 1.25).abs() < 1e-12);
        assert!((weights.get("H*").unwrap() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn entropy_weights_match_information_content() {
        let points = labeled_points(&[("none", 8), ("H*", 2)]);
        let weights = train_class_weights(&points, "accent", WeightScheme::Entropy).unwrap();
        let expected_none = -0.8f64 * 0.8f64.ln();
        let expected_accent = -0.2f64 * 0.2f64.ln();
        assert!((weights.get("none").unwrap() - expected_none).abs() < 1e-12);
        assert!((weights.get("H*").unwrap() - expected_accent).abs() < 1e-12);
        assert!((expected_none - 0.1785).abs() < 1e-3);
        assert!((expected_accent - 0.3219).abs() < 1e-3);
    }

    #[test]
    fn empty_input_surfaces_a_training_error() {
        assert!(train_class_weights(&[], "accent", WeightScheme::Linear).is_err());
    }

    #[test]
    fn points_without_a_known_class_weigh_zero() {
        let points = labeled_points(&[("none", 3), ("H*", 1)]);
        let weights = train_class_weights(&points, "accent", WeightScheme::Linear).unwrap();

        let bare = DataPoint::new();
        assert_eq!(weights.weight_for(&bare), 0.0);

        let mut unknown = DataPoint::new();
        unknown.set_attribute("accent", "L+H*");
        assert_eq!(weights.weight_for(&unknown), 0.0);

        let mut known = DataPoint::new();
        known.set_attribute("accent", "H*");
        assert!((weights.weight_for(&known) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn scheme_parses_from_config_strings() {
        assert_eq!("linear".parse::<WeightScheme>(), Ok(WeightScheme::Linear));
        assert_eq!("ENTROPY".parse::<WeightScheme>(), Ok(WeightScheme::Entropy));
        assert!("quadratic".parse::<WeightScheme>().is_err());
    }
}
