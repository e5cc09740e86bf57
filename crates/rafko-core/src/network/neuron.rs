//! A single neuron's static configuration: which scalar functions it uses,
//! and where its weights and input sources live.

use crate::error::{CoreError, Result};
use crate::functions::{InputFunction, SpikeFunction, TransferFunction};
use crate::network::synapse::{InputSynapse, SynapseIterator, SynapseRange};

/// Static description of one neuron.
///
/// Weight synapses obey the layout invariant: the flattened weight index
/// list always opens with exactly one spike-function weight, followed by
/// `bias_count` bias weights, followed by one weight per *flat index*
/// denoted by `input_synapses` — an entry whose range has `interval_size > 1`
/// contributes one weight per index in that range, not a single shared one.
#[derive(Debug, Clone)]
pub struct Neuron {
    /// Activation function applied to the folded input sum
    pub transfer_function: TransferFunction,
    /// Merge function used to fold inputs and biases together
    pub input_function: InputFunction,
    /// State-update rule blending this step's transfer output with the past
    pub spike_function: SpikeFunction,
    /// Index ranges into the global weight table owned by this neuron
    pub weight_synapses: Vec<SynapseRange>,
    /// How many of this neuron's weights (after the spike weight) are biases
    pub bias_count: usize,
    /// Ordered input source synapses (network inputs or internal neurons)
    pub input_synapses: Vec<InputSynapse>,
}

impl Neuron {
    /// Flattened weight-table indices for this neuron, in layout order:
    /// `[spike_weight, bias_0, .., bias_{k-1}, input_weight_0, ..]`.
    pub fn weight_indices(&self) -> Vec<i64> {
        let it = SynapseIterator::new(&self.weight_synapses);
        let mut out = Vec::with_capacity(it.len() as usize);
        it.iterate(|i| out.push(i));
        out
    }

    /// Index into the global weight table of this neuron's spike weight.
    pub fn spike_weight_index(&self) -> Result<i64> {
        let indices = self.weight_indices();
        indices
            .first()
            .copied()
            .ok_or_else(|| CoreError::invalid_config("neuron has no spike weight"))
    }

    /// Index into the global weight table of bias slot `k < bias_count`.
    pub fn bias_weight_index(&self, k: usize) -> Result<i64> {
        if k >= self.bias_count {
            return Err(CoreError::index_out_of_bounds("bias", k, self.bias_count));
        }
        let indices = self.weight_indices();
        indices
            .get(1 + k)
            .copied()
            .ok_or_else(|| CoreError::invalid_config("neuron weight synapses shorter than bias_count"))
    }

    /// Total number of flat indices denoted across every input synapse's
    /// range — the number of actual neuron inputs, as distinct from the
    /// number of synapse *entries*.
    pub fn input_flat_count(&self) -> usize {
        self.input_synapses
            .iter()
            .map(|s| s.range.interval_size as usize)
            .sum()
    }

    /// Index into the global weight table of the `offset`-th flat index
    /// within input synapse entry `synapse_idx` (`offset < that entry's
    /// `interval_size`).
    pub fn input_weight_index(&self, synapse_idx: usize, offset: u32) -> Result<i64> {
        let synapse = self.input_synapses.get(synapse_idx).ok_or_else(|| {
            CoreError::index_out_of_bounds("neuron_input_synapse", synapse_idx, self.input_synapses.len())
        })?;
        if offset >= synapse.range.interval_size {
            return Err(CoreError::index_out_of_bounds(
                "neuron_input_offset",
                offset as usize,
                synapse.range.interval_size as usize,
            ));
        }
        let preceding: usize = self.input_synapses[..synapse_idx]
            .iter()
            .map(|s| s.range.interval_size as usize)
            .sum();
        let flat_k = preceding + offset as usize;
        let indices = self.weight_indices();
        indices
            .get(1 + self.bias_count + flat_k)
            .copied()
            .ok_or_else(|| CoreError::invalid_config("neuron weight synapses shorter than input count"))
    }

    /// Total number of weights this neuron owns.
    pub fn weight_count(&self) -> usize {
        1 + self.bias_count + self.input_flat_count()
    }

    /// `true` when this neuron has no neuron-input synapses, in which case
    /// the transfer function's source is the last bias rather than the
    /// first `NeuronInput`.
    pub fn has_inputs(&self) -> bool {
        !self.input_synapses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_neuron() -> Neuron {
        Neuron {
            transfer_function: TransferFunction::Identity,
            input_function: InputFunction::Add,
            spike_function: SpikeFunction::None,
            weight_synapses: vec![SynapseRange::new(0, 4)],
            bias_count: 1,
            input_synapses: vec![
                InputSynapse::new(-1, 1, 0),
                InputSynapse::new(-2, 1, 0),
            ],
        }
    }

    #[test]
    fn test_weight_layout() {
        let n = simple_neuron();
        assert_eq!(n.weight_count(), 4);
        assert_eq!(n.spike_weight_index().unwrap(), 0);
        assert_eq!(n.bias_weight_index(0).unwrap(), 1);
        assert_eq!(n.input_weight_index(0, 0).unwrap(), 2);
        assert_eq!(n.input_weight_index(1, 0).unwrap(), 3);
    }

    #[test]
    fn test_weight_layout_expands_multi_index_input_synapse() {
        // A single input synapse entry spanning 3 flat indices must still
        // reserve one weight per index, not one weight for the whole entry.
        let n = Neuron {
            transfer_function: TransferFunction::Identity,
            input_function: InputFunction::Add,
            spike_function: SpikeFunction::None,
            weight_synapses: vec![SynapseRange::new(0, 5)],
            bias_count: 1,
            input_synapses: vec![InputSynapse::new(-1, 3, 0)],
        };
        assert_eq!(n.input_flat_count(), 3);
        assert_eq!(n.weight_count(), 5);
        assert_eq!(n.input_weight_index(0, 0).unwrap(), 2);
        assert_eq!(n.input_weight_index(0, 1).unwrap(), 3);
        assert_eq!(n.input_weight_index(0, 2).unwrap(), 4);
        assert!(n.input_weight_index(0, 3).is_err());
    }

    #[test]
    fn test_bias_index_out_of_range() {
        let n = simple_neuron();
        assert!(n.bias_weight_index(1).is_err());
    }
}
