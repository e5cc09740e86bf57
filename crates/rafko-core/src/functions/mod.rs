//! Pure scalar function families used by operation kernels: activation
//! (`TransferFunction`), merge (`InputFunction`) and state (`SpikeFunction`).
//! Each is a closed `Copy` enum dispatched by exhaustive match rather than a
//! trait object, since no consumer ever needs to add a new variant at
//! runtime.

mod input;
mod spike;
mod transfer;

pub use input::InputFunction;
pub use spike::SpikeFunction;
pub use transfer::TransferFunction;
