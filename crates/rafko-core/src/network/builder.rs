//! Fluent builder for assembling a [`RafkoNetwork`] by hand, primarily used
//! by tests, the CLI's `init` command, and the end-to-end scenarios in the
//! test suite.

use crate::error::Result;
use crate::functions::{InputFunction, SpikeFunction, TransferFunction};
use crate::network::feature::NetworkFeature;
use crate::network::net::RafkoNetwork;
use crate::network::neuron::Neuron;
use crate::network::synapse::{InputSynapse, SynapseRange};

/// Incrementally assembles neurons and their weights, then compiles them
/// into a [`RafkoNetwork`].
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    neurons: Vec<Neuron>,
    weight_table: Vec<f64>,
    input_data_size: usize,
    memory_size: usize,
    features: Vec<NetworkFeature>,
}

impl NetworkBuilder {
    /// Start a new builder for a network with `input_data_size` external
    /// inputs per step and `memory_size` steps of required history.
    pub fn new(input_data_size: usize, memory_size: usize) -> Self {
        Self {
            neurons: Vec::new(),
            weight_table: Vec::new(),
            input_data_size,
            memory_size,
            features: Vec::new(),
        }
    }

    /// Attach a solution-relevant or performance-relevant feature to the
    /// network under construction.
    pub fn add_feature(&mut self, feature: NetworkFeature) -> &mut Self {
        self.features.push(feature);
        self
    }

    /// Append one neuron. `weights` must be laid out `[spike, bias.., input..]`
    /// and have exactly `1 + bias_count + flat_input_count` entries, where
    /// `flat_input_count` is the sum of `interval_size` across
    /// `input_synapses` (an entry spanning several indices gets one weight
    /// per index, not one shared weight); its contents are appended to the
    /// network-wide weight table and the neuron's `weight_synapses` is set
    /// to the single contiguous range they occupy.
    pub fn add_neuron(
        &mut self,
        transfer_function: TransferFunction,
        input_function: InputFunction,
        spike_function: SpikeFunction,
        weights: Vec<f64>,
        bias_count: usize,
        input_synapses: Vec<InputSynapse>,
    ) -> &mut Self {
        let start = self.weight_table.len() as i64;
        let len = weights.len() as u32;
        self.weight_table.extend(weights);
        self.neurons.push(Neuron {
            transfer_function,
            input_function,
            spike_function,
            weight_synapses: vec![SynapseRange::new(start, len)],
            bias_count,
            input_synapses,
        });
        self
    }

    /// Compile the accumulated neurons into a [`RafkoNetwork`] with the last
    /// `output_neuron_count` neurons marked as outputs.
    pub fn build(self, output_neuron_count: usize) -> Result<RafkoNetwork> {
        let net = RafkoNetwork::new(
            self.neurons,
            self.weight_table,
            self.input_data_size,
            self.memory_size,
            output_neuron_count,
        )?;
        Ok(net.with_features(self.features))
    }
}
