//! Module type listing and information command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use vario_modules::{ModuleCategory, ModuleDescriptor, ModuleRegistry};

#[derive(Args)]
pub struct ModulesArgs {
    /// Show details for a specific module type
    #[arg(value_name = "TYPE")]
    module: Option<String>,
}

pub fn run(args: ModulesArgs) -> anyhow::Result<()> {
    let registry = ModuleRegistry::new();

    if let Some(id) = &args.module {
        let desc = registry
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("Unknown module type: {id}"))?;
        print_details(desc);
        return Ok(());
    }

    println!("Available Modules");
    println!("=================");
    for category in [
        ModuleCategory::Source,
        ModuleCategory::Computer,
        ModuleCategory::Filter,
        ModuleCategory::Warning,
    ] {
        let modules = registry.modules_in_category(category);
        if modules.is_empty() {
            continue;
        }
        println!();
        println!("{}:", category.name());
        for desc in modules {
            println!("  {:16}  {}", desc.id, desc.description);
        }
    }
    println!();
    println!("Use 'vario modules <TYPE>' for sockets and settings.");
    Ok(())
}

fn print_details(desc: &ModuleDescriptor) {
    println!("{} ({})", desc.name, desc.id);
    println!("{}", "=".repeat(desc.name.len() + desc.id.len() + 3));
    println!();
    println!("{}", desc.description);

    for (title, sockets) in [("Inputs", desc.inputs), ("Outputs", desc.outputs)] {
        if sockets.is_empty() {
            continue;
        }
        println!();
        println!("{title}:");
        for socket in sockets {
            println!("  {:20}  {}", socket.name, socket.kind);
        }
    }

    if !desc.settings.is_empty() {
        println!();
        println!("Settings:");
        println!();
        println!("  {:22}  {:10}  {}", "Name", "Default", "Description");
        println!("  {:22}  {:10}  {}", "----", "-------", "-----------");
        for s in desc.settings {
            let default = match (s.required, s.default) {
                (true, _) => "required",
                (false, Some("")) | (false, None) => "-",
                (false, Some(d)) => d,
            };
            println!("  {:22}  {:10}  {}", s.name, default, s.description);
        }
    }
}
