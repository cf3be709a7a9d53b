//! Wiring for the `jarvis` binary: the `Cli` struct that turns spec.md §6's
//! environment-variable table into clap-derived flags, the bootstrap
//! routine that builds an `Orchestrator` from them, and a small telemetry
//! sink built on `jarvis-core`'s log rotation for the "flush telemetry"
//! step of graceful shutdown.

pub mod bootstrap;
pub mod cli_args;
pub mod telemetry;

pub use bootstrap::{bootstrap, Bootstrapped};
pub use cli_args::Cli;
pub use telemetry::TelemetrySink;
