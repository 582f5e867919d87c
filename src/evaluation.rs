//! Batch prediction and scoring helpers.
//!
//! Predictions are written back onto the data points themselves, as a
//! hypothesis label plus a confidence attribute, so downstream consumers
//! read them like any other attribute.
use anyhow::{bail, Result};

use crate::data_handling::FeatureSet;
use crate::models::classifier_trait::Classifier;

/// Classify every data point in place, writing the winning label to
/// `hyp_attribute` and its mass to `conf_attribute`. A point the
/// classifier cannot score is logged, given `default_label` with zero
/// confidence, and counted in the returned failure total.
pub fn assign_predictions(
    classifier: &dyn Classifier,
    data: &mut FeatureSet,
    hyp_attribute: &str,
    conf_attribute: &str,
    default_label: &str,
) -> usize {
    let mut failures = 0;
    for point in data.data_points_mut() {
        match classifier.distribution_for_instance(point) {
            Ok(dist) => {
                let (label, confidence) = dist
                    .max()
                    .map(|(label, mass)| (label.to_owned(), mass))
                    .unwrap_or_else(|| (default_label.to_owned(), 0.0));
                point.set_attribute(hyp_attribute, label);
                point.set_attribute(conf_attribute, confidence);
            }
            Err(err) => {
                log::warn!("failed to classify a data point: {}", err);
                point.set_attribute(hyp_attribute, default_label);
                point.set_attribute(conf_attribute, 0.0);
                failures += 1;
            }
        }
    }
    if failures > 0 {
        log::warn!("{} of {} data points fell back to '{}'", failures, data.len(), default_label);
    }
    failures
}

/// Fraction of data points whose hypothesis label matches the reference
/// class attribute. Points missing either attribute are left out of the
/// denominator.
pub fn accuracy(data: &FeatureSet, hyp_attribute: &str) -> Result<f64> {
    if data.is_empty() {
        bail!("cannot score an empty data set");
    }
    let class_attribute = data.class_attribute();
    let mut scored = 0usize;
    let mut correct = 0usize;
    for point in data.data_points() {
        let (Some(reference), Some(hypothesis)) = (
            point.symbolic(class_attribute),
            point.symbolic(hyp_attribute),
        ) else {
            continue;
        };
        scored += 1;
        if reference == hypothesis {
            correct += 1;
        }
    }
    if scored == 0 {
        bail!(
            "no data point carries both '{}' and '{}'",
            class_attribute,
            hyp_attribute
        );
    }
    Ok(correct as f64 / scored as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::{DataPoint, Feature};
    use crate::distribution::Distribution;
    use crate::error::ClassifierError;

    /// Labels points by the sign of `f0_range`; fails on points without it.
    struct SignClassifier;

    impl Classifier for SignClassifier {
        fn train(&mut self, _data: &FeatureSet) -> Result<(), ClassifierError> {
            Ok(())
        }

        fn distribution_for_instance(
            &self,
            point: &DataPoint,
        ) -> Result<Distribution, ClassifierError> {
            let value = point
                .numeric("f0_range")
                .ok_or(ClassifierError::NotTrained)?;
            let mut dist = Distribution::new();
            if value > 0.0 {
                dist.set("H*", 0.9);
                dist.set("none", 0.1);
            } else {
                dist.set("H*", 0.2);
                dist.set("none", 0.8);
            }
            Ok(dist)
        }

        fn new_instance(&self) -> Box<dyn Classifier> {
            Box::new(SignClassifier)
        }
    }

    fn labeled_set(values: &[(Option<f64>, &str)]) -> FeatureSet {
        let mut data = FeatureSet::new(
            vec![
                Feature::numeric("f0_range"),
                Feature::nominal("accent", vec!["none".to_owned(), "H*".to_owned()]),
            ],
            "accent",
        );
        for (value, label) in values {
            let mut p = DataPoint::new();
            if let Some(v) = value {
                p.set_attribute("f0_range", *v);
            }
            p.set_attribute("accent", *label);
            data.push(p);
        }
        data
    }

    #[test]
    fn predictions_and_confidences_are_written_in_place() {
        let mut data = labeled_set(&[(Some(1.5), "H*"), (Some(-0.5), "none")]);
        let failures = assign_predictions(&SignClassifier, &mut data, "hyp", "conf", "none");
        assert_eq!(failures, 0);

        let first = &data.data_points()[0];
        assert_eq!(first.symbolic("hyp"), Some("H*"));
        assert!((first.numeric("conf").unwrap() - 0.9).abs() < 1e-12);

        assert!((accuracy(&data, "hyp").unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unscorable_points_fall_back_to_the_default_label() {
        let mut data = labeled_set(&[(Some(2.0), "H*"), (None, "H*")]);
        let failures = assign_predictions(&SignClassifier, &mut data, "hyp", "conf", "none");
        assert_eq!(failures, 1);

        let fallback = &data.data_points()[1];
        assert_eq!(fallback.symbolic("hyp"), Some("none"));
        assert_eq!(fallback.numeric("conf"), Some(0.0));

        // one hit, one miss
        assert!((accuracy(&data, "hyp").unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn accuracy_requires_scored_points() {
        let data = labeled_set(&[]);
        assert!(accuracy(&data, "hyp").is_err());

        let unscored = labeled_set(&[(Some(1.0), "H*")]);
        assert!(accuracy(&unscored, "hyp").is_err());
    }
}
