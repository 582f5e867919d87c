use crate::config::{ClassifierConfig, ClassifierType, SamplingStrategy};
use crate::models::classifier_trait::Classifier;
use crate::models::gbdt::GbdtClassifier;
use crate::models::linear::LinearClassifier;
use crate::sampling::{
    EnsembleSamplingClassifier, StratifiedEnsembleSamplingClassifier, UndersamplingClassifier,
};

/// Build a boxed classifier from a `ClassifierConfig`, wrapping the
/// backend in the configured resampling decorator.
/// Currently this is a thin factory implemented as a single function.
pub fn build_classifier(config: ClassifierConfig) -> Box<dyn Classifier> {
    let base: Box<dyn Classifier> = match config.classifier_type {
        ClassifierType::Linear(params) => Box::new(LinearClassifier::new(params)),
        ClassifierType::Gbdt(params) => Box::new(GbdtClassifier::new(params)),
    };

    match config.sampling {
        SamplingStrategy::None => base,
        SamplingStrategy::Undersampling => match config.seed {
            Some(seed) => Box::new(UndersamplingClassifier::with_seed(base, seed)),
            None => Box::new(UndersamplingClassifier::new(base)),
        },
        SamplingStrategy::Ensemble => match config.seed {
            Some(seed) => Box::new(EnsembleSamplingClassifier::with_seed(base, seed)),
            None => Box::new(EnsembleSamplingClassifier::new(base)),
        },
        SamplingStrategy::StratifiedEnsemble => {
            Box::new(StratifiedEnsembleSamplingClassifier::new(base))
        }
    }
}
