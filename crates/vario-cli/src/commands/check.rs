//! Load, wire and validate a machine without running it.

use clap::Args;
use std::path::PathBuf;

use super::common::load;

#[derive(Args)]
pub struct CheckArgs {
    /// Machine file (TOML)
    #[arg(value_name = "MACHINE")]
    machine: PathBuf,
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let (machine, mut pl) = load(&args.machine)?;
    pl.start()?;

    let graph = pl.graph();
    let order: Vec<&str> = graph
        .validate()?
        .into_iter()
        .filter_map(|id| graph.module_info(id).map(|m| m.instance))
        .collect();

    println!("{}: OK", machine.name);
    println!("  Modules:   {}", graph.module_count());
    println!("  Sockets:   {}", graph.socket_count());
    println!("  Frequency: {} Hz", machine.frequency_hz);
    println!("  Order:     {}", order.join(" -> "));

    let open: Vec<_> = graph
        .unconnected_inputs()
        .into_iter()
        .filter_map(|id| graph.socket_info(id))
        .collect();
    if !open.is_empty() {
        println!();
        println!("Unconnected inputs:");
        for info in open {
            let note = if info.socket.is_nil() { "nil" } else { "fallback" };
            println!("  {:32}  {}", info.socket.path(), note);
        }
    }
    Ok(())
}
