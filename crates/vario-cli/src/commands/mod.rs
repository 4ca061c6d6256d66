//! CLI command implementations.

pub mod check;
pub mod common;
pub mod modules;
pub mod run;
pub mod sockets;
