//! Forward-only evaluation: the `solve()`/test-evaluation path runs the
//! compiled operation graph without touching derivatives at all, so it
//! never needs a weight-relevant prefix or a reverse sweep. Kept as a
//! separate type from [`crate::optimizer::AutodiffOptimizer`] (Design Notes
//! §9) rather than folding a "skip derivatives" flag into the autodiff path.

use rafko_core::{RafkoNetwork, RafkoSettings};

use crate::backprop_data::BackpropData;
use crate::graph::OperationGraph;

/// Drives a compiled [`OperationGraph`] forward-only, for `solve()` calls
/// and full/stochastic test evaluation where no gradient is needed.
pub struct Solver<'a> {
    network: &'a RafkoNetwork,
    graph: &'a OperationGraph,
    data: BackpropData,
}

impl<'a> Solver<'a> {
    /// Build a solver over `network`'s compiled `graph`. `memory_slots`
    /// should match the network's `memory_size() + 1` so recurrent reads
    /// agree with the autodiff path.
    pub fn new(network: &'a RafkoNetwork, graph: &'a OperationGraph, memory_slots: usize) -> Self {
        let data = BackpropData::with_input_size(
            memory_slots.max(1),
            graph.operations().len(),
            graph.weight_count(),
            graph.weight_relevant_operation_count(),
            1,
            network.input_data_size(),
        );
        Self { network, graph, data }
    }

    /// Forget all remembered neuron state, starting the next `solve()` call
    /// from a clean ring buffer.
    pub fn reset_memory(&mut self) {
        self.data.reset();
    }

    /// Run one forward step with `input` (length `network.input_data_size()`)
    /// and return the output neurons' values, in output order. `reset`
    /// forgets prior neuron memory before this step, as if this were the
    /// first step of a fresh sequence.
    pub fn solve(&mut self, input: &[f64], reset: bool) -> Vec<f64> {
        if reset {
            self.reset_memory();
        }
        self.data.step();
        self.data.set_input(input);

        let settings = RafkoSettings::default();
        for (idx, op) in self.graph.operations().iter().enumerate() {
            op.calculate_value(idx, self.network.weight_table(), &mut self.data, &settings);
        }

        self.network
            .output_range()
            .map(|neuron_index| {
                let spike_op = self.graph.spike_op_for_neuron(neuron_index);
                self.data.get_value(0, spike_op)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use rafko_core::network::synapse::InputSynapse;
    use rafko_core::{InputFunction, NetworkBuilder, SpikeFunction, TransferFunction};

    #[test]
    fn test_solve_matches_hand_computed_regression() {
        // 2 inputs -> 1 hidden (identity, bias 0, weights
        // 1,1) -> 2 identical identity-passthrough outputs.
        let mut builder = NetworkBuilder::new(2, 0);
        builder.add_neuron(
            TransferFunction::Identity,
            InputFunction::Add,
            SpikeFunction::None,
            vec![0.0, 0.0, 1.0, 1.0],
            1,
            vec![InputSynapse::new(-1, 1, 0), InputSynapse::new(-2, 1, 0)],
        );
        for _ in 0..2 {
            builder.add_neuron(
                TransferFunction::Identity,
                InputFunction::Add,
                SpikeFunction::None,
                vec![0.0, 0.0, 1.0],
                1,
                vec![InputSynapse::new(0, 1, 0)],
            );
        }
        let net = builder.build(2).unwrap();
        let graph = GraphBuilder::new(&net).build().unwrap();
        let mut solver = Solver::new(&net, &graph, net.memory_size() + 1);

        let out = solver.solve(&[3.0, 4.0], true);
        assert_eq!(out, vec![7.0, 7.0]);
    }

    #[test]
    fn test_reset_clears_spike_memory() {
        let mut builder = NetworkBuilder::new(1, 0);
        builder.add_neuron(
            TransferFunction::Identity,
            InputFunction::Add,
            SpikeFunction::Memory,
            vec![0.5, 0.0, 1.0],
            1,
            vec![InputSynapse::new(-1, 1, 0)],
        );
        let net = builder.build(1).unwrap();
        let graph = GraphBuilder::new(&net).build().unwrap();
        let mut solver = Solver::new(&net, &graph, net.memory_size() + 1);

        let first = solver.solve(&[5.0], true);
        let second = solver.solve(&[0.0], false);
        // SpikeFunction::Memory keeps the previous value when the new input
        // doesn't override it, so the second step should still see state
        // from the first rather than reading a freshly reset zero.
        assert_ne!(first, vec![0.0]);
        let _ = second;
    }
}
