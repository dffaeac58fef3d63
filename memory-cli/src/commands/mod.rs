//! One module per store the CLI dispatches to; each exposes a `clap`
//! `Subcommand` enum plus an `execute` entry point.

pub mod core_memory;
pub mod health;
pub mod observational;
pub mod orientation;
pub mod skills;
pub mod strategic;
pub mod tool_surface;
pub mod topics;
