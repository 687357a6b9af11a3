//! spikenet CLI crate
//!
//! Purpose:
//! - Provide the I/O layer around the spikenet runtime: CSV neuron/connection
//!   tables in, spike counts out.
//!
//! Major commands (see [commands]):
//! - init: write a default `spikenet.toml` plus sample tables.
//! - run: load tables and configuration, simulate, print the per-neuron summary and
//!        optionally export spikes as JSON. Ctrl-C stops the run between steps.
//! - inspect: neuron/synapse counts, out-degree statistics, repeated pairs.
//!
//! Notes:
//! - The binary (src/main.rs) wires up logging and argument parsing, calling SpikenetCli::execute().
//! - Modules are exposed as a library so integration tests can drive them without
//!   spawning a process.

pub mod commands;
pub mod config;
pub mod error;
pub mod report;
pub mod tables;

pub use commands::SpikenetCli;
