//! Sparse recurrent network data model, scalar function families and
//! shared settings for Rafko's autodiff training core.
//!
//! This crate owns everything the training core treats as static: the
//! network's neurons and weight table, the sparse synapse encoding used to
//! address them, the closed set of transfer/input/spike scalar functions,
//! per-layer features (softmax, dropout, L1/L2 regularization), and the
//! tunable settings every other crate in the workspace reads from.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod functions;
pub mod network;

pub use config::RafkoSettings;
pub use error::{CoreError, Result};
pub use functions::{InputFunction, SpikeFunction, TransferFunction};
pub use network::{NetworkBuilder, NetworkFeature, RafkoNetwork, WeightFragment};

/// Crate version for compatibility checking between `rafko-core` and
/// `rafko-gym`.
pub const CORE_VERSION: u32 = 1;
