use crate::data_handling::{DataPoint, FeatureSet};
use crate::distribution::Distribution;
use crate::error::ClassifierError;
use crate::persistence::SavedClassifier;

/// The contract implemented by every concrete classifier and every
/// resampling decorator in the crate. Decorators wrap any inner
/// `Classifier`, including another decorator, so strategies compose
/// by construction.
///
/// The `Send` bound lets ensemble decorators train independent members
/// in parallel; classifiers hold no shared mutable state across callers.
pub trait Classifier: Send {
    /// Fit model state from labeled data. Fails when an upstream
    /// precondition is unmet, e.g. the class attribute declares no
    /// nominal vocabulary.
    fn train(&mut self, data: &FeatureSet) -> Result<(), ClassifierError>;

    /// Per-class probability distribution for a single data point.
    fn distribution_for_instance(&self, point: &DataPoint)
        -> Result<Distribution, ClassifierError>;

    /// Label of maximum mass for a single data point.
    fn classify(&self, point: &DataPoint) -> Result<String, ClassifierError> {
        let dist = self.distribution_for_instance(point)?;
        dist.argmax()
            .map(str::to_owned)
            .ok_or(ClassifierError::EmptyDistribution)
    }

    /// An independent instance of this classifier. Trained parameter state
    /// is never shared mutably: training the new instance must not touch
    /// this one. Weight-trained backends reset to untrained so resampling
    /// decorators retrain them from scratch.
    fn new_instance(&self) -> Box<dyn Classifier>;

    /// Human readable name for logging.
    fn name(&self) -> &str {
        "classifier"
    }

    /// Persistable representation of the trained classifier.
    fn to_saved(&self) -> Result<SavedClassifier, ClassifierError> {
        Err(ClassifierError::Persistence(format!(
            "{} does not support persistence",
            self.name()
        )))
    }
}
