//! Helper functions

use nalgebra::DVector;

use crate::configuration::{Configuration, DistanceMetric};
use crate::node::PathNode;

/// Print a configuration, one frame per line.
#[allow(dead_code)]
pub fn dump_configuration(q: &Configuration) {
    for (name, values) in q.frames() {
        let row = values
            .iter()
            .map(|v| format!("{:8.4}", v))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{}: [{}]", name, row);
    }
}

/// Print every step of a path, marking corner nodes.
#[allow(dead_code)]
pub fn dump_path(steps: &[PathNode]) {
    if steps.is_empty() {
        println!("Empty path");
    }
    for (i, step) in steps.iter().enumerate() {
        println!("step {}{}:", i, if step.corner() { " (corner)" } else { "" });
        dump_configuration(&step.q);
    }
}

/// Total travel of a path: the sum of per-segment root distances under the
/// given metric. Useful for comparing paths before and after smoothing.
pub fn path_travel_distance(steps: &[PathNode], metric: &DistanceMetric) -> f64 {
    steps
        .windows(2)
        .map(|pair| metric.evaluate(&pair[0].q, &pair[1].q).sqrt())
        .sum()
}

/// Converts a flat DOF vector to ```nalgebra::DVector<f64>```.
pub fn slice_to_dvector(values: &[f64]) -> DVector<f64> {
    DVector::from_column_slice(values)
}

/// Converts a ```nalgebra::DVector<f64>``` to a flat DOF vector.
pub fn dvector_to_vec(v: &DVector<f64>) -> Vec<f64> {
    v.as_slice().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn travel_distance_sums_segment_lengths() {
        let steps: Vec<PathNode> = [0.0, 3.0, 7.0]
            .iter()
            .map(|&x| PathNode::new(Configuration::single("j", vec![x])))
            .collect();
        let travel = path_travel_distance(&steps, &DistanceMetric::SquaredNorm);
        assert!((travel - 7.0).abs() < 1e-12);
    }

    #[test]
    fn dvector_round_trip() {
        let values = vec![1.0, -2.0, 3.5];
        let v = slice_to_dvector(&values);
        assert_eq!(dvector_to_vec(&v), values);
    }
}
