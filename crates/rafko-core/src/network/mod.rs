//! Network data model: neurons, the shared weight table, sparse synapse
//! iteration, and per-layer features.

mod builder;
mod feature;
mod net;
mod neuron;
pub mod synapse;

pub use builder::NetworkBuilder;
pub use feature::NetworkFeature;
pub use net::{RafkoNetwork, WeightFragment};
pub use neuron::Neuron;
pub use synapse::{
    external_index_from_array_index, is_index_input, synapse_index_from_input_index,
    InputSynapse, SynapseIterator, SynapseRange,
};
