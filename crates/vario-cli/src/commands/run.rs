//! Run a machine's processing loop.

use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use vario_core::SocketChanged;

use super::common::{load, resolve, value_text};

#[derive(Args)]
pub struct RunArgs {
    /// Machine file (TOML)
    #[arg(value_name = "MACHINE")]
    machine: PathBuf,

    /// Stop after this many cycles (runs until Ctrl+C otherwise)
    #[arg(short = 'n', long)]
    cycles: Option<u64>,

    /// Socket path to print every cycle (repeatable)
    #[arg(short, long = "watch", value_name = "PATH")]
    watch: Vec<String>,

    /// Only print a watched socket when its serial changed
    #[arg(long)]
    on_change: bool,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let (machine, mut pl) = load(&args.machine)?;
    let conversion = machine.conversion.to_settings();

    let watched = resolve(pl.graph(), &args.watch)?;
    // With explicit roots only their upstream runs, so watched sockets must
    // be driven too.
    if !pl.roots().is_empty() {
        for &id in &watched {
            pl.add_root(id);
        }
    }
    pl.start()
        .with_context(|| format!("failed to start machine '{}'", machine.name))?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    tracing::info!(
        machine = %machine.name,
        frequency_hz = machine.frequency_hz,
        modules = pl.graph().module_count(),
        "running"
    );
    if args.cycles.is_none() {
        eprintln!("Press Ctrl+C to stop...");
    }

    let mut detectors: Vec<SocketChanged> = watched.iter().map(|&id| SocketChanged::new(id)).collect();
    let count = pl.run(args.cycles, &running, |graph, cycle| {
        let mut fields = Vec::new();
        for (detector, path) in detectors.iter_mut().zip(&args.watch) {
            let changed = detector.serial_changed(graph, cycle);
            if !args.on_change || changed {
                fields.push(format!(
                    "{path}={}",
                    value_text(graph, detector.socket(), &conversion)
                ));
            }
        }
        if !fields.is_empty() {
            println!(
                "{:>6} {:>9.3}s  {}",
                cycle.number(),
                cycle.update_time().as_secs_f64(),
                fields.join("  ")
            );
        }
    })?;

    let frequency = pl
        .actual_frequency()
        .map_or_else(|| "-".to_string(), |hz| format!("{hz:.1} Hz"));
    let processing = pl
        .processing_times()
        .mean()
        .map_or_else(|| "-".to_string(), |d| format!("{:.1} µs", d.as_secs_f64() * 1e6));
    eprintln!("Ran {count} cycles (actual {frequency}, mean processing {processing})");
    Ok(())
}
