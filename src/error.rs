use std::error::Error;
use std::fmt;

/// Error type for classifier training, inference, and persistence failures.
#[derive(Debug)]
pub enum ClassifierError {
    /// A distribution with zero total mass cannot be normalized.
    EmptyDistribution,
    /// Training was requested on a feature set with no data points.
    EmptyTrainingSet,
    /// The declared schema does not satisfy a training or inference
    /// precondition (missing class attribute, no nominal vocabulary, ...).
    Schema(String),
    /// A feature type the backend cannot encode was passed to it.
    UnsupportedFeatureType { feature: String, kind: String },
    /// The training data cannot produce a meaningful model (single class,
    /// no encodable features).
    DegenerateTrainingSet(String),
    /// Inference was requested on a classifier that has not been trained.
    NotTrained,
    /// The external solver or classifier library reported a failure.
    Backend(String),
    /// A classifier artifact could not be written or restored.
    Persistence(String),
    Io(std::io::Error),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClassifierError::EmptyDistribution => {
                write!(f, "cannot normalize a distribution with zero total mass")
            }
            ClassifierError::EmptyTrainingSet => {
                write!(f, "training set contains no data points")
            }
            ClassifierError::Schema(msg) => write!(f, "schema error: {}", msg),
            ClassifierError::UnsupportedFeatureType { feature, kind } => {
                write!(f, "unsupported feature type: '{}' is a {} feature", feature, kind)
            }
            ClassifierError::DegenerateTrainingSet(msg) => {
                write!(f, "degenerate training set: {}", msg)
            }
            ClassifierError::NotTrained => write!(f, "classifier has not been trained"),
            ClassifierError::Backend(msg) => write!(f, "backend failure: {}", msg),
            ClassifierError::Persistence(msg) => write!(f, "persistence failure: {}", msg),
            ClassifierError::Io(err) => write!(f, "i/o error: {}", err),
        }
    }
}

impl Error for ClassifierError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClassifierError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClassifierError {
    fn from(err: std::io::Error) -> Self {
        ClassifierError::Io(err)
    }
}
