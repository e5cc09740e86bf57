//! Autodiff training engine for Rafko's sparse recurrent networks.
//!
//! This crate owns everything the training core treats as dynamic: the
//! ring-buffered backprop storage, the operation kernels, the graph builder
//! that compiles a [`rafko_core::RafkoNetwork`] into a topologically ordered
//! operation list, the autodiff optimizer, the five weight-update
//! strategies, the dataset/cost-function interfaces, a forward-only solver
//! for evaluation, and the training context tying all of it together.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod backprop_data;
pub mod cost;
pub mod dataset;
pub mod error;
pub mod graph;
pub mod operations;
pub mod optimizer;
#[cfg(feature = "parallel")]
pub mod pool;
pub mod solver;
pub mod training;
pub mod weight_updater;

pub use backprop_data::BackpropData;
pub use cost::CostFunction;
pub use dataset::DatasetView;
pub use error::{GymError, Result};
pub use graph::{GraphBuilder, OperationGraph};
pub use operations::{InputSource, Operation};
pub use optimizer::{AutodiffOptimizer, IterationOutcome};
pub use solver::Solver;
pub use training::TrainingContext;
pub use weight_updater::WeightUpdater;

/// Crate version for compatibility checking between `rafko-core` and
/// `rafko-gym`.
pub const GYM_VERSION: u32 = 1;
