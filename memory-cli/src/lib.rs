//! # Memory CLI
//!
//! Thin `clap`-based front end over `memory-core`'s stores: every
//! subcommand is a direct call into the strategic, topic, skill,
//! observational, core-memory, orientation or tool-call surface, backed
//! by the `memory-storage-sql`/`memory-storage-cache` durable stack.

pub mod app;
pub mod cli_config;
pub mod commands;
pub mod output;
