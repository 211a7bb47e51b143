//! Feed a synthetic stereo tone through the spectrum analyzer and report
//! the strongest bin of the published power spectrum.

use anyhow::{bail, Context, Result};
use clap::Parser;
use effects_host::{IdleDispatcher, Plugin, PowerSource, SpectrumAnalyzer, SpectrumConfig};
use log::info;
use std::f32::consts::PI;
use std::path::PathBuf;
use std::time::Duration;

/// Spectrum analyzer probe
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tone frequency in Hz
    #[arg(long, default_value_t = 1000.0)]
    frequency: f32,

    /// Tone amplitude (linear)
    #[arg(long, default_value_t = 0.5)]
    amplitude: f32,

    /// Samples per host block
    #[arg(long, default_value_t = 1024)]
    block_size: usize,

    /// Number of blocks to feed
    #[arg(long, default_value_t = 16)]
    blocks: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let config = match &args.config {
        Some(path) => SpectrumConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SpectrumConfig::default(),
    };

    if args.block_size == 0 || args.block_size > config.max_block_size {
        bail!(
            "block size must be between 1 and {} (got {})",
            config.max_block_size,
            args.block_size
        );
    }

    let (dispatcher, dispatch_thread) = IdleDispatcher::spawn(config.dispatch_queue_capacity)
        .context("starting idle dispatch thread")?;
    let analyzer = SpectrumAnalyzer::new(&config, dispatcher)?;
    analyzer.setup(config.sample_rate);
    analyzer.set_post_messages(true);

    let (tx, rx) = crossbeam_channel::unbounded();
    let _subscription = analyzer.subscribe_power(move |spectrum| {
        let _ = tx.send(spectrum.clone());
    });

    info!(
        "feeding {} blocks of {} samples at {} Hz ({} bands)",
        args.blocks, args.block_size, config.sample_rate, config.n_bands
    );

    let rate = config.sample_rate as f32;
    let mut left = vec![0.0; args.block_size];
    let mut right = vec![0.0; args.block_size];
    let mut left_out = vec![0.0; args.block_size];
    let mut right_out = vec![0.0; args.block_size];

    for block in 0..args.blocks {
        let offset = block * args.block_size;
        for (n, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            let t = (offset + n) as f32 / rate;
            *l = args.amplitude * (2.0 * PI * args.frequency * t).sin();
            *r = *l;
        }

        analyzer.process(&left, &right, &mut left_out, &mut right_out);

        if left_out != left || right_out != right {
            bail!("output differs from input in block {block}");
        }
    }

    let spectrum = rx
        .recv_timeout(Duration::from_secs(5))
        .context("no spectrum published")?;
    // Keep only the newest publish
    let spectrum = rx.try_iter().last().unwrap_or(spectrum);

    match spectrum.peak_bin() {
        Some((bin, _)) => println!(
            "peak bin {} of {} at {:.1} Hz, power {:.3} dB",
            bin,
            spectrum.bin_count,
            spectrum.frequency_hz(bin),
            spectrum.db(bin).unwrap_or(f64::NEG_INFINITY)
        ),
        None => println!("empty spectrum"),
    }

    println!("latency: {} s", analyzer.latency_seconds());

    drop(analyzer);
    dispatch_thread.stop();

    Ok(())
}
