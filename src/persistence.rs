//! Saving and restoring trained classifiers.
//!
//! Trained classifiers serialize into a self-describing [`Artifact`]
//! (magic bytes, format version, then the classifier tree) through
//! `bincode`. Decorator nesting is preserved structurally, so a stratified
//! ensemble of undersampled gbdt members round-trips as exactly that.
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;
use crate::models::classifier_trait::Classifier;
use crate::models::gbdt::{GbdtClassifier, GbdtParams, GbdtState};
use crate::models::linear::{LinearClassifier, LinearParams, LinearState};
use crate::sampling::{
    EnsembleSamplingClassifier, StratifiedEnsembleSamplingClassifier, UndersamplingClassifier,
};

const MAGIC: [u8; 4] = *b"PCLS";
const FORMAT_VERSION: u32 = 1;

/// Serializable form of a trained classifier, mirroring the decorator
/// structure it was built with.
#[derive(Serialize, Deserialize)]
pub enum SavedClassifier {
    Linear {
        params: LinearParams,
        state: LinearState,
    },
    Gbdt {
        params: GbdtParams,
        state: GbdtState,
    },
    Undersampling {
        inner: Box<SavedClassifier>,
    },
    Ensemble {
        members: Vec<SavedClassifier>,
    },
    StratifiedEnsemble {
        members: Vec<SavedClassifier>,
    },
}

impl SavedClassifier {
    /// Rebuild a ready-to-classify classifier from its saved form.
    pub fn restore(self) -> Result<Box<dyn Classifier>, ClassifierError> {
        match self {
            SavedClassifier::Linear { params, state } => {
                Ok(Box::new(LinearClassifier::from_state(params, state)))
            }
            SavedClassifier::Gbdt { params, state } => {
                Ok(Box::new(GbdtClassifier::from_state(params, state)))
            }
            SavedClassifier::Undersampling { inner } => Ok(Box::new(
                UndersamplingClassifier::from_trained(inner.restore()?),
            )),
            SavedClassifier::Ensemble { members } => {
                let members = members
                    .into_iter()
                    .map(SavedClassifier::restore)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Box::new(EnsembleSamplingClassifier::from_trained(members)?))
            }
            SavedClassifier::StratifiedEnsemble { members } => {
                let members = members
                    .into_iter()
                    .map(SavedClassifier::restore)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Box::new(StratifiedEnsembleSamplingClassifier::from_trained(
                    members,
                )?))
            }
        }
    }
}

/// On-disk envelope around a saved classifier.
#[derive(Serialize, Deserialize)]
struct Artifact {
    magic: [u8; 4],
    version: u32,
    classifier: SavedClassifier,
}

pub fn save_classifier<W: Write>(
    classifier: &dyn Classifier,
    writer: W,
) -> Result<(), ClassifierError> {
    let artifact = Artifact {
        magic: MAGIC,
        version: FORMAT_VERSION,
        classifier: classifier.to_saved()?,
    };
    bincode::serialize_into(writer, &artifact)
        .map_err(|e| ClassifierError::Persistence(e.to_string()))
}

pub fn load_classifier<R: Read>(reader: R) -> Result<Box<dyn Classifier>, ClassifierError> {
    let artifact: Artifact = bincode::deserialize_from(reader)
        .map_err(|e| ClassifierError::Persistence(e.to_string()))?;
    if artifact.magic != MAGIC {
        return Err(ClassifierError::Persistence(
            "not a classifier artifact (bad magic bytes)".to_owned(),
        ));
    }
    if artifact.version != FORMAT_VERSION {
        return Err(ClassifierError::Persistence(format!(
            "unsupported artifact version {} (expected {})",
            artifact.version, FORMAT_VERSION
        )));
    }
    artifact.classifier.restore()
}

pub fn save_classifier_to_path<P: AsRef<Path>>(
    classifier: &dyn Classifier,
    path: P,
) -> Result<(), ClassifierError> {
    let file = File::create(path.as_ref())?;
    save_classifier(classifier, BufWriter::new(file))
}

pub fn load_classifier_from_path<P: AsRef<Path>>(
    path: P,
) -> Result<Box<dyn Classifier>, ClassifierError> {
    let file = File::open(path.as_ref())?;
    load_classifier(BufReader::new(file))
}
