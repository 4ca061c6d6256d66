//! Machine files on disk.

use std::time::Duration;

use tempfile::TempDir;
use vario_config::{ConfigError, Machine, ModuleEntry};
use vario_core::Speed;
use vario_modules::ModuleRegistry;

fn machine() -> Machine {
    Machine::new("disk")
        .with_frequency(25.0)
        .with_module(ModuleEntry::new("air-sim", "sim").with_setting("airspeed", "90 kt"))
        .with_module(ModuleEntry::new("adc", "adc"))
        .with_connection("/adc/static-pressure", "/sim/static-pressure")
        .with_connection("/adc/total-pressure", "/sim/total-pressure")
        .with_connection("/adc/temperature", "/sim/temperature")
        .with_root("/adc/tas")
}

#[test]
fn test_save_creates_directories_and_loads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("sim.toml");

    machine().save(&path).unwrap();
    assert!(path.exists());
    assert_eq!(Machine::load(&path).unwrap(), machine());
}

#[test]
fn test_load_missing_file_names_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let err = Machine::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_load_invalid_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "name = \n").unwrap();
    assert!(matches!(
        Machine::load(&path).unwrap_err(),
        ConfigError::TomlParse(_)
    ));
}

#[test]
fn test_loaded_machine_runs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sim.toml");
    machine().save(&path).unwrap();

    let mut pl = Machine::load(&path)
        .unwrap()
        .build(&ModuleRegistry::new())
        .unwrap();
    pl.execute_cycle(Duration::ZERO).unwrap();

    let g = pl.graph();
    let ias = g.output::<Speed>("/adc/ias").unwrap();
    let tas = g.output::<Speed>("/adc/tas").unwrap();
    assert!((g.get(ias).unwrap().knots() - 90.0).abs() < 1e-6);
    // At sea level TAS equals CAS.
    assert!((g.get(tas).unwrap().knots() - 90.0).abs() < 0.1);
}
