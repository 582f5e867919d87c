//! Resampling decorators that correct class imbalance around training.
//!
//! All three decorators wrap an inner `Classifier` and are backend
//! agnostic, so they compose with either model family and with each other.
//! Each decorator owns its own seedable random generator; tests inject a
//! seed to make fold and reservoir construction deterministic.
use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::data_handling::{DataPoint, FeatureSet};
use crate::distribution::Distribution;
use crate::error::ClassifierError;
use crate::models::classifier_trait::Classifier;
use crate::persistence::SavedClassifier;

/// Transient attribute naming the sub-sample a point belongs to. Written
/// onto working copies during fold assignment and stripped before the
/// sub-samples reach the inner classifier.
const FOLD_ATTRIBUTE: &str = "__fold__";

/// Class counts of a training set, with the degenerate resampling cases
/// ruled out: empty input, unlabeled input, one class only.
fn class_counts(data: &FeatureSet) -> Result<Distribution, ClassifierError> {
    if data.is_empty() {
        return Err(ClassifierError::EmptyTrainingSet);
    }
    let counts = Distribution::count_values(data.data_points(), data.class_attribute());
    if counts.is_empty() {
        return Err(ClassifierError::Schema(format!(
            "no data point carries the class attribute '{}'",
            data.class_attribute()
        )));
    }
    if counts.len() < 2 {
        return Err(ClassifierError::DegenerateTrainingSet(format!(
            "all labeled data points share the class '{}'",
            counts.argmax().unwrap_or("")
        )));
    }
    Ok(counts)
}

/// Count of the most frequent class other than `majority_label`. Later
/// classes only overtake on strictly greater counts.
fn runner_up_count(counts: &Distribution, majority_label: &str) -> f64 {
    let mut best = 0.0;
    for (label, count) in counts.iter() {
        if label != majority_label && count > best {
            best = count;
        }
    }
    best
}

fn smallest_count(counts: &Distribution) -> f64 {
    let mut smallest = f64::INFINITY;
    for (_, count) in counts.iter() {
        if count < smallest {
            smallest = count;
        }
    }
    smallest
}

/// Train untrained member clones of `prototype`, one per fold. Fold
/// training is independent, so members fan out across threads.
fn train_members(
    prototype: &dyn Classifier,
    folds: &[FeatureSet],
) -> Result<Vec<Box<dyn Classifier>>, ClassifierError> {
    let mut members: Vec<Box<dyn Classifier>> =
        folds.iter().map(|_| prototype.new_instance()).collect();
    members
        .par_iter_mut()
        .zip(folds.par_iter())
        .try_for_each(|(member, fold)| member.train(fold))?;
    Ok(members)
}

/// Combine member outputs by multiplying per-label masses and
/// renormalizing. Labels the ensemble agrees on are rewarded; labels only
/// some members support are suppressed. A label first seen in a later
/// member enters with its mass unmultiplied.
fn product_of_experts(
    members: &[Box<dyn Classifier>],
    point: &DataPoint,
) -> Result<Distribution, ClassifierError> {
    if members.is_empty() {
        return Err(ClassifierError::NotTrained);
    }
    let mut combined = members[0].distribution_for_instance(point)?;
    for member in &members[1..] {
        let dist = member.distribution_for_instance(point)?;
        for (label, mass) in dist.iter() {
            if combined.contains(label) {
                let product = combined.get(label) * mass;
                combined.set(label, product);
            } else {
                combined.set(label, mass);
            }
        }
    }
    combined.normalize()?;
    Ok(combined)
}

/// Undersamples the majority class down to the size of the second most
/// frequent class before delegating training to the inner classifier.
///
/// Majority points stream through a fixed-size reservoir: the first
/// `target_size` fill it in input order, and each later point replaces a
/// uniformly chosen slot when a random draw passes the replacement
/// probability. All non-majority points pass through unchanged.
pub struct UndersamplingClassifier {
    inner: Box<dyn Classifier>,
    rng: StdRng,
}

impl UndersamplingClassifier {
    pub fn new(inner: Box<dyn Classifier>) -> Self {
        UndersamplingClassifier { inner, rng: StdRng::from_entropy() }
    }

    pub fn with_seed(inner: Box<dyn Classifier>, seed: u64) -> Self {
        UndersamplingClassifier { inner, rng: StdRng::seed_from_u64(seed) }
    }

    pub(crate) fn from_trained(inner: Box<dyn Classifier>) -> Self {
        Self::new(inner)
    }

    pub fn inner(&self) -> &dyn Classifier {
        self.inner.as_ref()
    }
}

impl Classifier for UndersamplingClassifier {
    fn train(&mut self, data: &FeatureSet) -> Result<(), ClassifierError> {
        let counts = class_counts(data)?;
        let majority_label = counts.argmax().unwrap_or("").to_owned();
        let majority_count = counts.get(&majority_label);
        let target_size = runner_up_count(&counts, &majority_label) as usize;
        let class_attribute = data.class_attribute();

        let mut sample = data.new_instance();
        let mut reservoir: Vec<DataPoint> = Vec::with_capacity(target_size);
        for point in data.data_points() {
            if point.symbolic(class_attribute) == Some(majority_label.as_str()) {
                if reservoir.len() < target_size {
                    reservoir.push(point.clone());
                } else if self.rng.gen::<f64>()
                    < target_size as f64 / reservoir.len() as f64
                {
                    let slot = self.rng.gen_range(0..reservoir.len());
                    reservoir[slot] = point.clone();
                }
            } else {
                sample.push(point.clone());
            }
        }
        sample.data_points_mut().extend(reservoir);

        log::debug!(
            "undersampled '{}' from {} to {} points ({} points total)",
            majority_label,
            majority_count,
            target_size,
            sample.len()
        );
        self.inner.train(&sample)
    }

    fn distribution_for_instance(
        &self,
        point: &DataPoint,
    ) -> Result<Distribution, ClassifierError> {
        self.inner.distribution_for_instance(point)
    }

    fn classify(&self, point: &DataPoint) -> Result<String, ClassifierError> {
        self.inner.classify(point)
    }

    fn new_instance(&self) -> Box<dyn Classifier> {
        Box::new(UndersamplingClassifier::new(self.inner.new_instance()))
    }

    fn name(&self) -> &str {
        "undersampling"
    }

    fn to_saved(&self) -> Result<SavedClassifier, ClassifierError> {
        Ok(SavedClassifier::Undersampling {
            inner: Box::new(self.inner.to_saved()?),
        })
    }
}

/// Splits the majority class across `floor(majority / second_largest)`
/// random folds and trains one inner-classifier clone per fold; every fold
/// keeps all non-majority points. Inference combines member outputs by
/// product of experts.
pub struct EnsembleSamplingClassifier {
    prototype: Box<dyn Classifier>,
    members: Vec<Box<dyn Classifier>>,
    rng: StdRng,
}

impl EnsembleSamplingClassifier {
    pub fn new(inner: Box<dyn Classifier>) -> Self {
        EnsembleSamplingClassifier {
            prototype: inner,
            members: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(inner: Box<dyn Classifier>, seed: u64) -> Self {
        EnsembleSamplingClassifier {
            prototype: inner,
            members: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub(crate) fn from_trained(
        members: Vec<Box<dyn Classifier>>,
    ) -> Result<Self, ClassifierError> {
        let prototype = members
            .first()
            .map(|m| m.new_instance())
            .ok_or_else(|| {
                ClassifierError::Persistence("ensemble artifact holds no members".to_owned())
            })?;
        Ok(EnsembleSamplingClassifier {
            prototype,
            members,
            rng: StdRng::from_entropy(),
        })
    }

    pub fn num_members(&self) -> usize {
        self.members.len()
    }
}

impl Classifier for EnsembleSamplingClassifier {
    fn train(&mut self, data: &FeatureSet) -> Result<(), ClassifierError> {
        let counts = class_counts(data)?;
        let majority_label = counts.argmax().unwrap_or("").to_owned();
        let majority_count = counts.get(&majority_label);
        let second_count = runner_up_count(&counts, &majority_label);
        let num_folds = (majority_count / second_count).floor() as usize;
        let class_attribute = data.class_attribute();

        // assign a random fold id to every majority point on a working copy
        let mut working: Vec<DataPoint> = data.data_points().to_vec();
        for point in &mut working {
            if point.symbolic(class_attribute) == Some(majority_label.as_str()) {
                let fold = self.rng.gen_range(0..num_folds);
                point.set_attribute(FOLD_ATTRIBUTE, fold as f64);
            }
        }

        let folds: Vec<FeatureSet> = (0..num_folds)
            .map(|i| {
                let mut fold = data.new_instance();
                for point in &working {
                    match point.numeric(FOLD_ATTRIBUTE) {
                        Some(assigned) => {
                            if assigned as usize == i {
                                let mut kept = point.clone();
                                kept.remove_attribute(FOLD_ATTRIBUTE);
                                fold.push(kept);
                            }
                        }
                        None => fold.push(point.clone()),
                    }
                }
                log::trace!("ensemble fold {} holds {} points", i, fold.len());
                fold
            })
            .collect();

        log::debug!(
            "ensemble sampling split '{}' ({} points) across {} folds",
            majority_label,
            majority_count,
            num_folds
        );
        self.members = train_members(self.prototype.as_ref(), &folds)?;
        Ok(())
    }

    fn distribution_for_instance(
        &self,
        point: &DataPoint,
    ) -> Result<Distribution, ClassifierError> {
        product_of_experts(&self.members, point)
    }

    fn new_instance(&self) -> Box<dyn Classifier> {
        Box::new(EnsembleSamplingClassifier::new(self.prototype.new_instance()))
    }

    fn name(&self) -> &str {
        "ensemble sampling"
    }

    fn to_saved(&self) -> Result<SavedClassifier, ClassifierError> {
        if self.members.is_empty() {
            return Err(ClassifierError::Persistence(
                "ensemble classifier is not trained".to_owned(),
            ));
        }
        let members = self
            .members
            .iter()
            .map(|m| m.to_saved())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SavedClassifier::Ensemble { members })
    }
}

/// Stratified variant: `floor(majority / smallest_class)` folds, with
/// every point (majority or minority) assigned to exactly one fold by
/// per-class round-robin in encounter order, so each fold mirrors the
/// overall class balance. Inference combines member outputs by product of
/// experts.
pub struct StratifiedEnsembleSamplingClassifier {
    prototype: Box<dyn Classifier>,
    members: Vec<Box<dyn Classifier>>,
}

impl StratifiedEnsembleSamplingClassifier {
    pub fn new(inner: Box<dyn Classifier>) -> Self {
        StratifiedEnsembleSamplingClassifier { prototype: inner, members: Vec::new() }
    }

    pub(crate) fn from_trained(
        members: Vec<Box<dyn Classifier>>,
    ) -> Result<Self, ClassifierError> {
        let prototype = members
            .first()
            .map(|m| m.new_instance())
            .ok_or_else(|| {
                ClassifierError::Persistence("ensemble artifact holds no members".to_owned())
            })?;
        Ok(StratifiedEnsembleSamplingClassifier { prototype, members })
    }

    pub fn num_members(&self) -> usize {
        self.members.len()
    }
}

impl Classifier for StratifiedEnsembleSamplingClassifier {
    fn train(&mut self, data: &FeatureSet) -> Result<(), ClassifierError> {
        let counts = class_counts(data)?;
        let majority_label = counts.argmax().unwrap_or("").to_owned();
        let majority_count = counts.get(&majority_label);
        let num_folds = (majority_count / smallest_count(&counts)).floor() as usize;
        let class_attribute = data.class_attribute();

        // round-robin fold ids per class value, in encounter order
        let mut working: Vec<DataPoint> = data.data_points().to_vec();
        let mut cursors: HashMap<String, usize> = HashMap::new();
        let mut unlabeled = 0usize;
        for point in &mut working {
            let Some(label) = point.symbolic(class_attribute).map(str::to_owned) else {
                unlabeled += 1;
                continue;
            };
            let cursor = cursors.entry(label).or_insert(0);
            point.set_attribute(FOLD_ATTRIBUTE, (*cursor % num_folds) as f64);
            *cursor += 1;
        }
        if unlabeled > 0 {
            log::debug!("{} unlabeled points left out of stratified folds", unlabeled);
        }

        let folds: Vec<FeatureSet> = (0..num_folds)
            .map(|i| {
                let mut fold = data.new_instance();
                for point in &working {
                    if point.numeric(FOLD_ATTRIBUTE) == Some(i as f64) {
                        let mut kept = point.clone();
                        kept.remove_attribute(FOLD_ATTRIBUTE);
                        fold.push(kept);
                    }
                }
                log::trace!("stratified fold {} holds {} points", i, fold.len());
                fold
            })
            .collect();

        log::debug!(
            "stratified ensemble sampling split {} points across {} folds",
            data.len(),
            num_folds
        );
        self.members = train_members(self.prototype.as_ref(), &folds)?;
        Ok(())
    }

    fn distribution_for_instance(
        &self,
        point: &DataPoint,
    ) -> Result<Distribution, ClassifierError> {
        product_of_experts(&self.members, point)
    }

    fn new_instance(&self) -> Box<dyn Classifier> {
        Box::new(StratifiedEnsembleSamplingClassifier::new(
            self.prototype.new_instance(),
        ))
    }

    fn name(&self) -> &str {
        "stratified ensemble sampling"
    }

    fn to_saved(&self) -> Result<SavedClassifier, ClassifierError> {
        if self.members.is_empty() {
            return Err(ClassifierError::Persistence(
                "ensemble classifier is not trained".to_owned(),
            ));
        }
        let members = self
            .members
            .iter()
            .map(|m| m.to_saved())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SavedClassifier::StratifiedEnsemble { members })
    }
}
