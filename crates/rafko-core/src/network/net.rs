//! The network data model: neurons, the shared weight table, and a fluent
//! builder for assembling both by hand (primarily for tests and the CLI).

use log::debug;

use crate::error::{CoreError, Result};
use crate::network::feature::NetworkFeature;
use crate::network::neuron::Neuron;

/// A sparse update to the weight table: a flat list of per-weight deltas
/// paired with the `(start, length)` ranges of the weight table they target,
/// in the same order as `deltas`.
#[derive(Debug, Clone, Default)]
pub struct WeightFragment {
    /// One delta per flattened index across `ranges`
    pub deltas: Vec<f64>,
    /// `(start, length)` ranges into the weight table, in flattening order
    pub ranges: Vec<(usize, usize)>,
}

impl WeightFragment {
    /// The flattened weight-table indices this fragment targets, in the
    /// same order as `deltas`.
    pub fn flat_indices(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.deltas.len());
        for (start, len) in &self.ranges {
            out.extend(*start..*start + *len);
        }
        out
    }

    /// The fragment that exactly undoes this one.
    pub fn negated(&self) -> Self {
        Self {
            deltas: self.deltas.iter().map(|d| -d).collect(),
            ranges: self.ranges.clone(),
        }
    }
}

/// The compiled network: an ordered neuron array plus a shared weight table.
#[derive(Debug, Clone)]
pub struct RafkoNetwork {
    neurons: Vec<Neuron>,
    weight_table: Vec<f64>,
    input_data_size: usize,
    memory_size: usize,
    output_neuron_count: usize,
    features: Vec<NetworkFeature>,
}

impl RafkoNetwork {
    /// Assemble and validate a network. Fails if the weight table does not
    /// match the sum of every neuron's `weight_count()`, if any neuron's
    /// weight synapses address outside the table, or if the output count
    /// exceeds the neuron count.
    pub fn new(
        neurons: Vec<Neuron>,
        weight_table: Vec<f64>,
        input_data_size: usize,
        memory_size: usize,
        output_neuron_count: usize,
    ) -> Result<Self> {
        if output_neuron_count > neurons.len() {
            return Err(CoreError::invalid_config(format!(
                "output_neuron_count {} exceeds neuron count {}",
                output_neuron_count,
                neurons.len()
            )));
        }
        if input_data_size == 0 {
            return Err(CoreError::invalid_config("input_data_size must be > 0"));
        }

        let expected_weights: usize = neurons.iter().map(|n| n.weight_count()).sum();
        if expected_weights != weight_table.len() {
            return Err(CoreError::invalid_config(format!(
                "weight table has {} entries, neurons require {}",
                weight_table.len(),
                expected_weights
            )));
        }

        for (n_idx, neuron) in neurons.iter().enumerate() {
            for idx in neuron.weight_indices() {
                if idx < 0 || idx as usize >= weight_table.len() {
                    return Err(CoreError::invalid_synapse(format!(
                        "neuron {n_idx} weight synapse addresses {idx}, table has {} entries",
                        weight_table.len()
                    )));
                }
            }
            for synapse in &neuron.input_synapses {
                let range = synapse.range;
                for k in 0..range.interval_size {
                    let flat = range.index_at(k);
                    if flat >= 0 && flat as usize >= neurons.len() {
                        return Err(CoreError::invalid_synapse(format!(
                            "neuron {n_idx} input synapse addresses internal neuron {flat}, only {} neurons exist",
                            neurons.len()
                        )));
                    }
                    if flat < 0 {
                        let external = -flat - 1;
                        if external as usize >= input_data_size {
                            return Err(CoreError::invalid_synapse(format!(
                                "neuron {n_idx} input synapse addresses external input {external}, input_data_size is {input_data_size}"
                            )));
                        }
                    }
                }
            }
        }

        debug!(
            "network built: {} neurons, {} weights, {} outputs",
            neurons.len(),
            weight_table.len(),
            output_neuron_count
        );

        Ok(Self {
            neurons,
            weight_table,
            input_data_size,
            memory_size,
            output_neuron_count,
            features: Vec::new(),
        })
    }

    /// Attach solution-relevant and performance-relevant features (softmax
    /// groups, L1/L2 regularization) to this network.
    pub fn with_features(mut self, features: Vec<NetworkFeature>) -> Self {
        self.features = features;
        self
    }

    /// The network's configured features, in the order they were attached.
    pub fn features(&self) -> &[NetworkFeature] {
        &self.features
    }

    /// The neuron array.
    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    /// The shared weight table.
    pub fn weight_table(&self) -> &[f64] {
        &self.weight_table
    }

    /// Mutable access to the shared weight table (used by weight updaters
    /// between training sweeps).
    pub fn weight_table_mut(&mut self) -> &mut Vec<f64> {
        &mut self.weight_table
    }

    /// Number of external input features per time step.
    pub fn input_data_size(&self) -> usize {
        self.input_data_size
    }

    /// Minimum history length the network requires.
    pub fn memory_size(&self) -> usize {
        self.memory_size
    }

    /// Indices of the output neurons: the last `output_neuron_count`
    /// neurons.
    pub fn output_range(&self) -> std::ops::Range<usize> {
        (self.neurons.len() - self.output_neuron_count)..self.neurons.len()
    }

    /// Number of output neurons.
    pub fn output_neuron_count(&self) -> usize {
        self.output_neuron_count
    }

    /// Read a single weight.
    pub fn get_weight(&self, index: usize) -> Result<f64> {
        self.weight_table
            .get(index)
            .copied()
            .ok_or_else(|| CoreError::index_out_of_bounds("weight", index, self.weight_table.len()))
    }

    /// Overwrite a single weight.
    pub fn set_weight(&mut self, index: usize, value: f64) -> Result<()> {
        let len = self.weight_table.len();
        let slot = self
            .weight_table
            .get_mut(index)
            .ok_or_else(|| CoreError::index_out_of_bounds("weight", index, len))?;
        *slot = value;
        Ok(())
    }

    /// Apply a sparse weight fragment: `weight[i] -= learning_rate * delta`
    /// for every flattened `(index, delta)` pair the fragment names.
    pub fn apply_weight_vector_delta(
        &mut self,
        fragment: &WeightFragment,
        learning_rate: f64,
    ) -> Result<()> {
        let indices = fragment.flat_indices();
        if indices.len() != fragment.deltas.len() {
            return Err(CoreError::invalid_config(
                "weight fragment delta count does not match its ranges",
            ));
        }
        for (idx, delta) in indices.iter().zip(fragment.deltas.iter()) {
            let slot = self
                .weight_table
                .get_mut(*idx)
                .ok_or_else(|| CoreError::index_out_of_bounds("weight", *idx, self.weight_table.len()))?;
            *slot -= learning_rate * delta;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{InputFunction, SpikeFunction, TransferFunction};
    use crate::network::synapse::{InputSynapse, SynapseRange};

    fn two_input_network() -> RafkoNetwork {
        let neuron = Neuron {
            transfer_function: TransferFunction::Identity,
            input_function: InputFunction::Add,
            spike_function: SpikeFunction::None,
            weight_synapses: vec![SynapseRange::new(0, 4)],
            bias_count: 1,
            input_synapses: vec![
                InputSynapse::new(-1, 1, 0),
                InputSynapse::new(-2, 1, 0),
            ],
        };
        RafkoNetwork::new(vec![neuron], vec![0.0, 0.0, 1.0, 1.0], 2, 0, 1).unwrap()
    }

    #[test]
    fn test_network_construction() {
        let net = two_input_network();
        assert_eq!(net.output_range(), 0..1);
        assert_eq!(net.input_data_size(), 2);
    }

    #[test]
    fn test_weight_table_mismatch_rejected() {
        let neuron = Neuron {
            transfer_function: TransferFunction::Identity,
            input_function: InputFunction::Add,
            spike_function: SpikeFunction::None,
            weight_synapses: vec![SynapseRange::new(0, 4)],
            bias_count: 1,
            input_synapses: vec![InputSynapse::new(-1, 1, 0), InputSynapse::new(-2, 1, 0)],
        };
        let result = RafkoNetwork::new(vec![neuron], vec![0.0, 0.0], 2, 0, 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_weight_fragment_apply_and_undo() {
        let mut net = two_input_network();
        let fragment = WeightFragment {
            deltas: vec![0.5],
            ranges: vec![(2, 1)],
        };
        let before = net.get_weight(2).unwrap();
        net.apply_weight_vector_delta(&fragment, 0.1).unwrap();
        assert!((net.get_weight(2).unwrap() - (before - 0.05)).abs() < 1e-12);
        net.apply_weight_vector_delta(&fragment.negated(), 0.1).unwrap();
        assert_eq!(net.get_weight(2).unwrap(), before);
    }
}
