//! Response delays.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay before a stub answers.
///
/// Serialized the way WireMock writes `delayDistribution`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Delay {
    /// Fixed delay in milliseconds
    Fixed { milliseconds: u64 },
    /// Uniformly random delay within `lower..=upper`
    Uniform { lower: u64, upper: u64 },
    /// Log-normal delay around `median`
    #[serde(rename = "lognormal")]
    LogNormal { median: f64, sigma: f64 },
}

impl Delay {
    /// Get a delay in milliseconds
    pub fn sample_ms(&self, rng: &mut impl Rng) -> u64 {
        match self {
            Delay::Fixed { milliseconds } => *milliseconds,
            Delay::Uniform { lower, upper } if lower <= upper => rng.gen_range(*lower..=*upper),
            Delay::Uniform { lower, .. } => *lower,
            Delay::LogNormal { median, sigma } => {
                // Box-Muller
                let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
                let u2: f64 = rng.gen();
                let normal = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
                (median * (sigma * normal).exp()).round().max(0.0) as u64
            }
        }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> Duration {
        Duration::from_millis(self.sample_ms(rng))
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Delay::Fixed { .. })
    }
}
