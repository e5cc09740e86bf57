//! Thin command-line front end over `rafko-gym`'s training context: reads a
//! network/dataset description from a TOML file, then runs `init`, `train`
//! or `inspect` against it. Not part of the core's tested surface, a
//! developer tool for manual smoke-testing.

pub mod commands;
pub mod config;
pub mod error;
pub mod netfile;

pub use commands::RafkoCli;
