//! Simulated channel: adds zero-mean Gaussian noise to samples from stdin.
//!
//! `$ ./transmitter | ./channel | ./receiver`

use anyhow::{Context, Result};
use clap::Parser;
use radio_pipeline::channel::{run_channel, DEFAULT_NOISE_SEED};
use radio_pipeline::{telemetry, GaussianNoise, NoiseConfig, SampleReader};
use std::io::{self, BufWriter};

#[derive(Parser, Debug)]
#[command(name = "channel")]
#[command(about = "Add Gaussian noise to a sample stream", long_about = None)]
#[command(version)]
struct Cli {
    /// Seed for the noise generator
    #[arg(long, env = "RADIO_NOISE_SEED", default_value_t = DEFAULT_NOISE_SEED)]
    seed: u64,

    /// Mean of the noise
    #[arg(long, env = "RADIO_NOISE_MEAN", default_value = "0.0", allow_negative_numbers = true)]
    mean: f32,

    /// Standard deviation of the noise
    #[arg(long, env = "RADIO_NOISE_STDEV", default_value = "1.0")]
    stdev: f32,
}

fn main() -> Result<()> {
    telemetry::init_tracing("info");
    let cli = Cli::parse();

    let mut noise = GaussianNoise::new(NoiseConfig {
        seed: cli.seed,
        mean: cli.mean,
        stdev: cli.stdev,
    })
    .context("invalid noise configuration")?;

    let samples = SampleReader::new(io::stdin().lock());
    let mut out = BufWriter::new(io::stdout().lock());

    let written = run_channel(samples, &mut noise, &mut out).context("channel failed")?;
    tracing::debug!(written, seed = cli.seed, "channel finished");
    Ok(())
}
