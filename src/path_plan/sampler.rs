//! Configuration sampling for tree growth targets.
//!
//! Early iterations sample near the anchor node, which converges much
//! faster in lightly constrained space; once warmed up, every second pair
//! of iterations draws a fully random configuration so no region of the
//! feasible set starves. Both modes draw from the caller's PRNG only, so
//! runs are reproducible under the planner's master seed.

use rand::rngs::StdRng;
use rand::Rng;

use crate::configuration::Configuration;
use crate::linearized::LinearizedFrameSystem;

/// Fraction of each DOF's total range used as the local sampling
/// neighborhood around the anchor.
const NEAR_RADIUS: f64 = 0.1;

pub struct Sampler {
    /// Iterations before fully random samples are mixed in.
    pub iter_before_rand: usize,
}

impl Sampler {
    pub fn new(iter_before_rand: usize) -> Self {
        Sampler { iter_before_rand }
    }

    /// Produce the target configuration for iteration `iteration`, anchored
    /// at `anchor` (the most recently reached node).
    pub fn sample(
        &self,
        lfs: &LinearizedFrameSystem,
        anchor: &Configuration,
        iteration: usize,
        rng: &mut StdRng,
    ) -> Configuration {
        if iteration >= self.iter_before_rand && iteration % 4 >= 2 {
            return uniform_configuration(lfs, rng);
        }
        self.near_configuration(lfs, anchor, rng)
    }

    /// Uniform per-DOF sample within `NEAR_RADIUS` of the anchor, clamped
    /// to the DOF limits.
    fn near_configuration(
        &self,
        lfs: &LinearizedFrameSystem,
        anchor: &Configuration,
        rng: &mut StdRng,
    ) -> Configuration {
        let mut config = Configuration::new();
        for frame in lfs.frames() {
            let reference = anchor.get(&frame.name);
            let values = frame
                .limits
                .iter()
                .enumerate()
                .map(|(i, lim)| {
                    let (min, max) = lim.clamped();
                    let center = reference
                        .and_then(|r| r.get(i))
                        .copied()
                        .unwrap_or((min + max) / 2.0);
                    let half = (max - min) * NEAR_RADIUS / 2.0;
                    let lo = (center - half).max(min);
                    let hi = (center + half).min(max);
                    if hi > lo {
                        rng.gen_range(lo..hi)
                    } else {
                        lo
                    }
                })
                .collect();
            config.set(&frame.name, values);
        }
        config
    }
}

/// Uniform sample across every frame's DOF limits, with infinite limits
/// clamped to the finite substitute range.
pub fn uniform_configuration(lfs: &LinearizedFrameSystem, rng: &mut StdRng) -> Configuration {
    let mut config = Configuration::new();
    for frame in lfs.frames() {
        let values = frame
            .limits
            .iter()
            .map(|lim| {
                let (min, max) = lim.clamped();
                if max > min {
                    rng.gen_range(min..max)
                } else {
                    min
                }
            })
            .collect();
        config.set(&frame.name, values);
    }
    config
}
