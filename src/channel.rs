//! Noisy channel stage: adds zero-mean Gaussian noise to every sample.

use crate::codec::write_sample;
use crate::error::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;
use std::io::Write;
use tracing::debug;

/// Seed used when none is configured
pub const DEFAULT_NOISE_SEED: u64 = 123_123_123;

/// Parameters of the channel noise
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseConfig {
    pub seed: u64,
    pub mean: f32,
    pub stdev: f32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_NOISE_SEED,
            mean: 0.0,
            stdev: 1.0,
        }
    }
}

/// Seeded Gaussian noise source using the Box-Muller transform
#[derive(Debug, Clone)]
pub struct GaussianNoise {
    rng: StdRng,
    mean: f32,
    stdev: f32,
}

impl GaussianNoise {
    /// Create a noise source, rejecting non-finite or negative parameters
    pub fn new(config: NoiseConfig) -> Result<Self> {
        if !config.mean.is_finite() {
            return Err(PipelineError::ConfigError(format!(
                "noise mean must be finite, got {}",
                config.mean
            )));
        }
        if !config.stdev.is_finite() || config.stdev < 0.0 {
            return Err(PipelineError::ConfigError(format!(
                "noise standard deviation must be finite and non-negative, got {}",
                config.stdev
            )));
        }
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            mean: config.mean,
            stdev: config.stdev,
        })
    }

    /// Draw one noise term
    pub fn sample(&mut self) -> f32 {
        // (0, 1] keeps ln() finite
        let u1: f32 = 1.0 - self.rng.gen::<f32>();
        let u2: f32 = self.rng.gen();

        let magnitude = self.stdev * (-2.0 * u1.ln()).sqrt();
        magnitude * (2.0 * PI * u2).cos() + self.mean
    }

    /// Add one noise term to `signal`
    pub fn apply(&mut self, signal: f32) -> f32 {
        signal + self.sample()
    }
}

/// Add noise to every sample of `samples` and write the results.
/// Returns the number of samples written.
pub fn run_channel<I, W>(samples: I, noise: &mut GaussianNoise, writer: &mut W) -> Result<usize>
where
    I: IntoIterator<Item = Result<f32>>,
    W: Write,
{
    let mut written = 0;
    for sample in samples {
        write_sample(writer, noise.apply(sample?))?;
        written += 1;
    }
    writer.flush()?;
    debug!(written, "channel drained");
    Ok(written)
}
