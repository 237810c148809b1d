//! Supports extracting planner options from a YAML file (optional).

use std::path::Path;
use std::time::Duration;

use garde::Validate;
use serde::Deserialize;

use crate::plan_error::PlanError;
use crate::planner_options::{
    PlannerOptions, DEFAULT_FRAME_STEP, DEFAULT_INPUT_IDENT_DIST, DEFAULT_ITER_BEFORE_RAND,
    DEFAULT_NUM_THREADS, DEFAULT_PLAN_ITER, DEFAULT_RESOLUTION, DEFAULT_SMOOTH_ITER,
    DEFAULT_SOLUTIONS_TO_SEED,
};

fn default_plan_iter() -> usize {
    DEFAULT_PLAN_ITER
}
fn default_input_ident_dist() -> f64 {
    DEFAULT_INPUT_IDENT_DIST
}
fn default_resolution() -> f64 {
    DEFAULT_RESOLUTION
}
fn default_num_threads() -> usize {
    DEFAULT_NUM_THREADS
}
fn default_smooth_iter() -> usize {
    DEFAULT_SMOOTH_ITER
}
fn default_solutions_to_seed() -> usize {
    DEFAULT_SOLUTIONS_TO_SEED
}
fn default_frame_step() -> f64 {
    DEFAULT_FRAME_STEP
}
fn default_iter_before_rand() -> usize {
    DEFAULT_ITER_BEFORE_RAND
}

fn validate_positive_finite_f64(v: &f64, _ctx: &()) -> garde::Result {
    if !v.is_finite() {
        return Err(garde::Error::new("must be finite"));
    }
    if *v <= 0.0 {
        return Err(garde::Error::new("must be positive"));
    }
    Ok(())
}

fn validate_fraction_f64(v: &f64, _ctx: &()) -> garde::Result {
    if !v.is_finite() || *v <= 0.0 || *v >= 1.0 {
        return Err(garde::Error::new("must lie in (0, 1)"));
    }
    Ok(())
}

fn validate_timeout_secs(v: &Option<f64>, _ctx: &()) -> garde::Result {
    match v {
        Some(secs) if !secs.is_finite() || *secs <= 0.0 => {
            Err(garde::Error::new("must be a positive number of seconds"))
        }
        _ => Ok(()),
    }
}

#[derive(Deserialize, Validate)]
struct Root {
    #[serde(default = "default_plan_iter")]
    #[garde(range(min = 1))]
    pub plan_iter: usize,
    #[serde(default = "default_input_ident_dist")]
    #[garde(custom(validate_positive_finite_f64))]
    pub input_ident_dist: f64,
    #[serde(default = "default_resolution")]
    #[garde(custom(validate_positive_finite_f64))]
    pub resolution: f64,
    #[serde(default = "default_num_threads")]
    #[garde(range(min = 1))]
    pub num_threads: usize,
    #[serde(default = "default_smooth_iter")]
    #[garde(skip)]
    pub smooth_iter: usize,
    #[serde(default = "default_solutions_to_seed")]
    #[garde(range(min = 1))]
    pub solutions_to_seed: usize,
    #[serde(default = "default_frame_step")]
    #[garde(custom(validate_fraction_f64))]
    pub frame_step: f64,
    #[serde(default = "default_iter_before_rand")]
    #[garde(skip)]
    pub iter_before_rand: usize,
    /// Optional wall-clock budget in seconds.
    #[serde(default)]
    #[garde(custom(validate_timeout_secs))]
    pub timeout_secs: Option<f64>,
}

impl PlannerOptions {
    /// Read planner options from a YAML file. All fields are optional and
    /// fall back to the crate defaults. A YAML file like this is supported:
    /// ```yaml
    /// plan_iter: 500
    /// input_ident_dist: 0.01
    /// resolution: 0.05
    /// num_threads: 4
    /// smooth_iter: 100
    /// solutions_to_seed: 5
    /// frame_step: 0.02
    /// timeout_secs: 30.0
    /// ```
    /// The distance metric is not configurable from YAML; set it on the
    /// returned options if a weighted metric is needed.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, PlanError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parse planner options from a YAML document; see [`Self::from_yaml_file`].
    pub fn from_yaml_str(contents: &str) -> Result<Self, PlanError> {
        let root: Root = serde_saphyr::from_str(contents)
            .map_err(|e| PlanError::InvalidOptions(format!("{}", e)))?;
        root.validate()
            .map_err(|e| PlanError::InvalidOptions(format!("{}", e)))?;

        let options = PlannerOptions {
            plan_iter: root.plan_iter,
            input_ident_dist: root.input_ident_dist,
            resolution: root.resolution,
            num_threads: root.num_threads,
            smooth_iter: root.smooth_iter,
            solutions_to_seed: root.solutions_to_seed,
            frame_step: root.frame_step,
            iter_before_rand: root.iter_before_rand,
            timeout: root.timeout_secs.map(Duration::from_secs_f64),
            ..Default::default()
        };
        // validate() repeats the range checks; garde already enforced them,
        // this catches any drift between the two layers.
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() {
        let yaml = "\
plan_iter: 500
input_ident_dist: 0.01
resolution: 0.05
num_threads: 4
smooth_iter: 100
solutions_to_seed: 5
frame_step: 0.02
timeout_secs: 30.0
";
        let options = PlannerOptions::from_yaml_str(yaml).unwrap();
        assert_eq!(options.plan_iter, 500);
        assert_eq!(options.input_ident_dist, 0.01);
        assert_eq!(options.resolution, 0.05);
        assert_eq!(options.num_threads, 4);
        assert_eq!(options.smooth_iter, 100);
        assert_eq!(options.solutions_to_seed, 5);
        assert_eq!(options.frame_step, 0.02);
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let options = PlannerOptions::from_yaml_str("plan_iter: 77\n").unwrap();
        assert_eq!(options.plan_iter, 77);
        assert_eq!(options.resolution, DEFAULT_RESOLUTION);
        assert_eq!(options.num_threads, DEFAULT_NUM_THREADS);
        assert!(options.timeout.is_none());
    }

    #[test]
    fn rejects_non_positive_resolution() {
        assert!(matches!(
            PlannerOptions::from_yaml_str("resolution: 0.0\n"),
            Err(PlanError::InvalidOptions(_))
        ));
    }

    #[test]
    fn rejects_frame_step_outside_unit_interval() {
        assert!(PlannerOptions::from_yaml_str("frame_step: 1.5\n").is_err());
    }

    #[test]
    fn reads_from_file() {
        let path = std::env::temp_dir().join("rs_cbirrt_options_test.yaml");
        std::fs::write(&path, "plan_iter: 9\nnum_threads: 2\n").unwrap();
        let options = PlannerOptions::from_yaml_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(options.plan_iter, 9);
        assert_eq!(options.num_threads, 2);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = PlannerOptions::from_yaml_file("/nonexistent/rs_cbirrt.yaml");
        assert!(matches!(result, Err(PlanError::IoError(_))));
    }
}
