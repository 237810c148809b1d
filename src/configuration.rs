//! Configuration-space values, keyed by frame name.
//!
//! A [`Configuration`] assigns an ordered vector of DOF values to every frame
//! of a kinematic system. The planner never interprets the values itself;
//! interpolation and limits belong to the frame system, validity belongs to
//! the constraint handler. Distances between configurations are computed by a
//! [`DistanceMetric`].

use std::collections::BTreeMap;

/// An immutable assignment of joint values, organized as a mapping from frame
/// name to ordered DOF values. All values are finite 64-bit floats; two
/// configurations are equal iff all corresponding values are equal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Configuration {
    values: BTreeMap<String, Vec<f64>>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from (frame name, DOF values) pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        Configuration {
            values: pairs
                .into_iter()
                .map(|(name, vals)| (name.into(), vals))
                .collect(),
        }
    }

    /// Shorthand for a configuration with a single frame.
    pub fn single(name: &str, values: Vec<f64>) -> Self {
        Self::from_pairs([(name, values)])
    }

    pub fn set(&mut self, name: &str, values: Vec<f64>) {
        self.values.insert(name.to_string(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.values.get(name).map(|v| v.as_slice())
    }

    /// Frames in stable (lexicographic) order.
    pub fn frames(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn frame_count(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Total number of DOF values across all frames.
    pub fn total_dof(&self) -> usize {
        self.values.values().map(|v| v.len()).sum()
    }

    /// True if every value is a finite float.
    pub fn is_finite(&self) -> bool {
        self.values.values().flatten().all(|v| v.is_finite())
    }
}

/// Distance metric over configuration segments. The reference metric is the
/// (optionally per-DOF weighted) squared norm over all DOF deltas.
#[derive(Clone, Debug, Default)]
pub enum DistanceMetric {
    /// Sum of squared per-DOF differences.
    #[default]
    SquaredNorm,
    /// Sum of squared per-DOF differences, each scaled by the matching weight.
    /// Frames or DOFs without a weight entry use weight 1.
    WeightedSquaredNorm(BTreeMap<String, Vec<f64>>),
}

impl DistanceMetric {
    /// Distance between two configurations. Frames present in `a` but absent
    /// in `b` contribute nothing; the planner only compares configurations
    /// with identical frame layouts.
    pub fn evaluate(&self, a: &Configuration, b: &Configuration) -> f64 {
        let mut total = 0.0;
        for (name, va) in a.frames() {
            let Some(vb) = b.get(name) else {
                debug_assert!(false, "configurations with mismatched frames: {}", name);
                continue;
            };
            match self {
                DistanceMetric::SquaredNorm => {
                    for (x, y) in va.iter().zip(vb) {
                        let d = x - y;
                        total += d * d;
                    }
                }
                DistanceMetric::WeightedSquaredNorm(weights) => {
                    let w = weights.get(name);
                    for (i, (x, y)) in va.iter().zip(vb).enumerate() {
                        let weight = w.and_then(|w| w.get(i)).copied().unwrap_or(1.0);
                        let d = x - y;
                        total += weight * d * d;
                    }
                }
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_exact() {
        let a = Configuration::single("arm", vec![0.1, 0.2]);
        let b = Configuration::single("arm", vec![0.1, 0.2]);
        let c = Configuration::single("arm", vec![0.1, 0.2 + 1e-15]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn squared_norm_distance() {
        let a = Configuration::from_pairs([("arm", vec![0.0, 0.0]), ("base", vec![1.0])]);
        let b = Configuration::from_pairs([("arm", vec![3.0, 4.0]), ("base", vec![1.0])]);
        let d = DistanceMetric::SquaredNorm.evaluate(&a, &b);
        assert_eq!(d, 25.0);
    }

    #[test]
    fn weighted_distance_defaults_missing_weights_to_one() {
        let a = Configuration::single("arm", vec![0.0, 0.0]);
        let b = Configuration::single("arm", vec![2.0, 2.0]);
        let mut weights = BTreeMap::new();
        weights.insert("arm".to_string(), vec![0.5]);
        let d = DistanceMetric::WeightedSquaredNorm(weights).evaluate(&a, &b);
        // First DOF weighted 0.5, second defaults to 1.0
        assert_eq!(d, 0.5 * 4.0 + 4.0);
    }

    #[test]
    fn total_dof_sums_frames() {
        let q = Configuration::from_pairs([("arm", vec![0.0; 6]), ("gripper", vec![0.0])]);
        assert_eq!(q.total_dof(), 7);
    }
}
