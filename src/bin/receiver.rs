//! AM receiver: rectifies samples from stdin on a worker pool and writes the
//! envelope to stdout.
//!
//! `$ ./transmitter | ./channel | ./receiver`
//!
//! Output order follows completion order across workers, not input order.

use anyhow::{Context, Result};
use clap::Parser;
use radio_pipeline::{telemetry, write_sample, EnvelopeDetector, PipelineBuilder, SampleReader};
use std::io::{self, BufReader, BufWriter, Write};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "receiver")]
#[command(about = "Envelope-detect an AM signal read from stdin", long_about = None)]
#[command(version)]
struct Cli {
    /// Number of worker threads
    #[arg(short, long, env = "RADIO_WORKERS", default_value = "3")]
    workers: usize,

    /// Capacity of the input and output queues
    #[arg(short, long, env = "RADIO_QUEUE_CAPACITY", default_value = "16")]
    capacity: usize,

    /// Simulated detector cost per sample, in milliseconds
    #[arg(long, env = "RADIO_LATENCY_MS", default_value = "0")]
    latency_ms: u64,
}

fn main() -> Result<()> {
    telemetry::init_tracing("info");
    let cli = Cli::parse();

    let detector = EnvelopeDetector::with_latency(Duration::from_millis(cli.latency_ms));
    let pipeline = PipelineBuilder::new()
        .name("receiver")
        .workers(cli.workers)
        .capacity(cli.capacity)
        .build(detector)
        .context("invalid receiver configuration")?;

    let samples = SampleReader::new(BufReader::new(io::stdin()));
    let mut out = BufWriter::new(io::stdout());

    let summary = pipeline
        .run(samples, |sample| write_sample(&mut out, sample))
        .context("receiver failed")?;
    out.flush().context("failed to flush stdout")?;

    tracing::debug!(
        items_in = summary.items_in,
        items_out = summary.items_out,
        "receiver finished"
    );
    Ok(())
}
