//! prosody-classifiers: classification engine for prosodic events.
//!
//! This crate predicts categorical labels (pitch accents, phrase boundaries)
//! for spoken-word tokens from derived acoustic and linguistic attributes.
//! It provides the classifier abstraction, class-imbalance-correcting
//! training strategies (undersampling, ensemble sampling, stratified
//! ensemble sampling, class-weighted training), and the sparse feature
//! encoding/normalization layer that feeds the linear-model backend.
//!
//! Feature extraction, annotation parsing, and file I/O are external
//! collaborators: they produce the labeled data points this engine consumes
//! and consume the probability distributions it produces.
pub mod config;
pub mod data_handling;
pub mod distribution;
pub mod encoding;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod persistence;
pub mod sampling;
pub mod stats;
pub mod weights;
