//! Data structures for labeled prosodic data points and their schema.
//!
//! This module defines `DataPoint`, `Feature`, and `FeatureSet`: the data
//! model consumed by every classifier in the crate. A `FeatureSet` carries
//! an ordered feature declaration, the name of the class attribute, and a
//! mutable list of data points; classifiers read the declarations but never
//! mutate them.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single attribute value on a data point. Symbolic values serve both
/// nominal and free-string attributes; the declared `Feature` decides the
/// interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Numeric(f64),
    Symbolic(String),
}

impl AttributeValue {
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            AttributeValue::Numeric(v) => Some(*v),
            AttributeValue::Symbolic(_) => None,
        }
    }

    pub fn as_symbolic(&self) -> Option<&str> {
        match self {
            AttributeValue::Numeric(_) => None,
            AttributeValue::Symbolic(s) => Some(s),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Numeric(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Symbolic(s.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Symbolic(s)
    }
}

/// A spoken-word token with named attributes, including its class label
/// under the feature set's class-attribute name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataPoint {
    attributes: HashMap<String, AttributeValue>,
}

impl DataPoint {
    pub fn new() -> Self {
        DataPoint::default()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn get_attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    /// Numeric value of the named attribute, if present and numeric.
    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(AttributeValue::as_numeric)
    }

    /// Symbolic value of the named attribute, if present and symbolic.
    pub fn symbolic(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(AttributeValue::as_symbolic)
    }
}

/// Feature type tag. Nominal features carry an ordered vocabulary of valid
/// values, each addressable by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureKind {
    Numeric,
    Nominal(Vec<String>),
    Text,
}

impl FeatureKind {
    pub fn describe(&self) -> &'static str {
        match self {
            FeatureKind::Numeric => "numeric",
            FeatureKind::Nominal(_) => "nominal",
            FeatureKind::Text => "text",
        }
    }
}

/// A named feature descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    name: String,
    kind: FeatureKind,
}

impl Feature {
    pub fn numeric(name: impl Into<String>) -> Self {
        Feature { name: name.into(), kind: FeatureKind::Numeric }
    }

    pub fn nominal(name: impl Into<String>, vocabulary: Vec<String>) -> Self {
        Feature { name: name.into(), kind: FeatureKind::Nominal(vocabulary) }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Feature { name: name.into(), kind: FeatureKind::Text }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FeatureKind {
        &self.kind
    }

    /// The ordered vocabulary of a nominal feature.
    pub fn vocabulary(&self) -> Option<&[String]> {
        match &self.kind {
            FeatureKind::Nominal(vocab) => Some(vocab),
            _ => None,
        }
    }

    /// Index of `value` in the nominal vocabulary.
    pub fn value_index(&self, value: &str) -> Option<usize> {
        self.vocabulary()?.iter().position(|v| v == value)
    }

    /// Vocabulary value at `index`.
    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.vocabulary()?.get(index).map(String::as_str)
    }
}

/// An ordered collection of data points plus their declared schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSet {
    features: Vec<Feature>,
    class_attribute: String,
    data_points: Vec<DataPoint>,
}

impl FeatureSet {
    pub fn new(features: Vec<Feature>, class_attribute: impl Into<String>) -> Self {
        FeatureSet {
            features,
            class_attribute: class_attribute.into(),
            data_points: Vec::new(),
        }
    }

    /// A fresh, empty feature set sharing this one's schema.
    pub fn new_instance(&self) -> FeatureSet {
        FeatureSet {
            features: self.features.clone(),
            class_attribute: self.class_attribute.clone(),
            data_points: Vec::new(),
        }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name() == name)
    }

    pub fn class_attribute(&self) -> &str {
        &self.class_attribute
    }

    pub fn data_points(&self) -> &[DataPoint] {
        &self.data_points
    }

    pub fn data_points_mut(&mut self) -> &mut Vec<DataPoint> {
        &mut self.data_points
    }

    pub fn push(&mut self, point: DataPoint) {
        self.data_points.push(point);
    }

    pub fn len(&self) -> usize {
        self.data_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_points.is_empty()
    }
}
