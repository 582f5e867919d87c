//! Declarative classifier configuration.
//!
//! A `ClassifierConfig` names a backend, its hyper-parameters, and an
//! optional resampling strategy; the factory in `models::factory` turns it
//! into a ready-to-train classifier. The struct derives serde, so configs
//! deserialize from whatever format the caller embeds them in.
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::gbdt::GbdtParams;
use crate::models::linear::LinearParams;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierType {
    Linear(LinearParams),
    Gbdt(GbdtParams),
}

impl FromStr for ClassifierType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(ClassifierType::Linear(LinearParams::default())),
            "gbdt" => Ok(ClassifierType::Gbdt(GbdtParams::default())),
            _ => Err(format!("Unknown classifier type: {}", s)),
        }
    }
}

/// How to counter class imbalance around the backend, if at all.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    #[default]
    None,
    Undersampling,
    Ensemble,
    StratifiedEnsemble,
}

impl FromStr for SamplingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(SamplingStrategy::None),
            "undersampling" => Ok(SamplingStrategy::Undersampling),
            "ensemble" => Ok(SamplingStrategy::Ensemble),
            "stratified_ensemble" => Ok(SamplingStrategy::StratifiedEnsemble),
            _ => Err(format!("Unknown sampling strategy: {}", s)),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub sampling: SamplingStrategy,

    /// Seed for the resampling generators. Unset means entropy-seeded.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(flatten)]
    pub classifier_type: ClassifierType,
}

impl ClassifierConfig {
    pub fn new(classifier_type: ClassifierType, sampling: SamplingStrategy) -> Self {
        Self {
            sampling,
            seed: None,
            classifier_type,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingStrategy::None,
            seed: None,
            classifier_type: ClassifierType::Linear(LinearParams::default()),
        }
    }
}
