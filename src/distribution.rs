//! Label distributions returned by every classifier.
//!
//! A `Distribution` maps labels to non-negative masses and preserves
//! insertion order, so argmax ties resolve toward the earliest-inserted
//! label. Label sets are small (ToBI inventories run to a few dozen
//! values), so storage is a plain vector with linear lookup.
use serde::{Deserialize, Serialize};

use crate::data_handling::DataPoint;
use crate::error::ClassifierError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    masses: Vec<(String, f64)>,
}

impl Distribution {
    pub fn new() -> Self {
        Distribution::default()
    }

    /// Count occurrences of the symbolic values of `attribute` across
    /// `points`. Points lacking the attribute contribute nothing.
    pub fn count_values<'a, I>(points: I, attribute: &str) -> Distribution
    where
        I: IntoIterator<Item = &'a DataPoint>,
    {
        let mut dist = Distribution::new();
        for point in points {
            if let Some(value) = point.symbolic(attribute) {
                dist.add(value, 1.0);
            }
        }
        dist
    }

    /// Add `mass` to `label`, inserting it at the end if absent.
    pub fn add(&mut self, label: &str, mass: f64) {
        match self.masses.iter_mut().find(|(l, _)| l == label) {
            Some((_, m)) => *m += mass,
            None => self.masses.push((label.to_owned(), mass)),
        }
    }

    /// Set the mass of `label`, inserting it at the end if absent.
    pub fn set(&mut self, label: &str, mass: f64) {
        match self.masses.iter_mut().find(|(l, _)| l == label) {
            Some((_, m)) => *m = mass,
            None => self.masses.push((label.to_owned(), mass)),
        }
    }

    /// Mass of `label`; 0 for an absent label.
    pub fn get(&self, label: &str) -> f64 {
        self.masses
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, m)| *m)
            .unwrap_or(0.0)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.masses.iter().any(|(l, _)| l == label)
    }

    /// Label of maximum mass, ties broken toward earlier insertion.
    pub fn argmax(&self) -> Option<&str> {
        self.max().map(|(label, _)| label)
    }

    /// Label and mass of the maximum entry.
    pub fn max(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (label, mass) in &self.masses {
            match best {
                Some((_, m)) if *mass <= m => {}
                _ => best = Some((label, *mass)),
            }
        }
        best
    }

    pub fn total(&self) -> f64 {
        self.masses.iter().map(|(_, m)| m).sum()
    }

    /// Scale all masses so they sum to 1. Fails on zero total mass.
    pub fn normalize(&mut self) -> Result<(), ClassifierError> {
        let total = self.total();
        if total <= 0.0 {
            return Err(ClassifierError::EmptyDistribution);
        }
        for (_, mass) in &mut self.masses {
            *mass /= total;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.masses.iter().map(|(l, m)| (l.as_str(), *m))
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }
}
