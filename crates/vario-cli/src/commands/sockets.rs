//! Run a machine briefly and print its socket table.

use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use vario_core::graph::{Direction, ModuleGraph, SocketId, SourceKind};

use super::common::load;

#[derive(Args)]
pub struct SocketsArgs {
    /// Machine file (TOML)
    #[arg(value_name = "MACHINE")]
    machine: PathBuf,

    /// Number of cycles to run before printing
    #[arg(short = 'n', long, default_value_t = 1)]
    cycles: u64,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

/// One row of the socket table.
#[derive(Serialize)]
struct SocketRow {
    path: String,
    direction: &'static str,
    kind: String,
    owner: Option<String>,
    source: String,
    readers: usize,
    serial: u64,
    value: String,
    nil_by_fetch_error: bool,
}

pub fn run(args: SocketsArgs) -> anyhow::Result<()> {
    let (machine, mut pl) = load(&args.machine)?;
    let conversion = machine.conversion.to_settings();

    for i in 0..args.cycles {
        let now = pl.period() * u32::try_from(i)?;
        pl.execute_cycle(now)?;
    }

    let graph = pl.graph();
    let rows: Vec<SocketRow> = graph
        .sockets()
        .map(|info| SocketRow {
            path: info.socket.path().to_string(),
            direction: match info.direction {
                Direction::Input => "in",
                Direction::Output => "out",
            },
            kind: info.socket.kind().to_string(),
            owner: info
                .owner
                .and_then(|id| graph.module_info(id))
                .map(|m| m.instance.to_string()),
            source: match info.source {
                SourceKind::None => "-".to_string(),
                SourceKind::Constant => "constant".to_string(),
                SourceKind::Socket(src) => socket_path(graph, src),
                SourceKind::Transformed(src) => format!("fn({})", socket_path(graph, src)),
            },
            readers: info.readers,
            serial: info.socket.serial(),
            value: info.socket.to_string(&conversion),
            nil_by_fetch_error: info.socket.nil_by_fetch_error(),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "{:32}  {:3}  {:12}  {:28}  {:>7}  {:>6}  VALUE",
        "PATH", "DIR", "KIND", "SOURCE", "READERS", "SERIAL"
    );
    for row in &rows {
        let flag = if row.nil_by_fetch_error { " (error)" } else { "" };
        println!(
            "{:32}  {:3}  {:12}  {:28}  {:>7}  {:>6}  {}{}",
            row.path, row.direction, row.kind, row.source, row.readers, row.serial, row.value, flag
        );
    }
    Ok(())
}

fn socket_path(graph: &ModuleGraph, id: SocketId) -> String {
    graph
        .socket_info(id)
        .map_or_else(|| id.to_string(), |s| s.socket.path().to_string())
}
