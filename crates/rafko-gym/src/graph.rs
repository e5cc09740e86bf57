//! Compiles a [`RafkoNetwork`] into an ordered [`Operation`] list: the
//! autodiff graph the optimizer and solver both run against.

use std::collections::HashMap;

use rafko_core::network::synapse::{external_index_from_array_index, is_index_input};
use rafko_core::{NetworkFeature, RafkoNetwork};

use crate::error::{GymError, Result};
use crate::operations::{InputSource, Operation};

/// A compiled operation graph, ready to be driven by the optimizer or the
/// forward-only solver.
#[derive(Debug, Clone)]
pub struct OperationGraph {
    operations: Vec<Operation>,
    /// Contiguous prefix of `Objective` operations, one per output neuron.
    weight_relevant_operation_count: usize,
    /// `SpikeFn` operation index for each neuron, indexed by neuron index.
    neuron_spike_ops: Vec<usize>,
    weight_count: usize,
}

impl OperationGraph {
    /// The compiled operations, in dependency order (every dependency's
    /// index is strictly less than its own, except `SpikeFn` self-recurrence,
    /// which is resolved through the ring buffer, and the leading `Objective`
    /// prefix, which is placed before the `SpikeFn` it reads on purpose since
    /// it is only ever consumed by the backward, reverse-index pass).
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Count of leading `Objective` operations: the operations whose
    /// derivatives are folded into the running sequence-derivative summary.
    pub fn weight_relevant_operation_count(&self) -> usize {
        self.weight_relevant_operation_count
    }

    /// The `SpikeFn` operation index belonging to neuron `neuron_index`.
    pub fn spike_op_for_neuron(&self, neuron_index: usize) -> usize {
        self.neuron_spike_ops[neuron_index]
    }

    /// Number of weights the compiled graph's operations address.
    pub fn weight_count(&self) -> usize {
        self.weight_count
    }
}

/// Builds an [`OperationGraph`] from a [`RafkoNetwork`] using a worklist:
/// every output neuron's `Objective` is queued first, then each operation's
/// unmet dependencies are appended ahead of it until the worklist is empty,
/// finally reversing into forward (dependency-first) order. `SpikeFn`
/// operations are deduplicated per neuron since every consumer of a given
/// neuron's state shares exactly one spike operation.
pub struct GraphBuilder<'a> {
    network: &'a RafkoNetwork,
}

impl<'a> GraphBuilder<'a> {
    /// Start building a graph for `network`.
    pub fn new(network: &'a RafkoNetwork) -> Self {
        Self { network }
    }

    /// Compile the full graph.
    pub fn build(self) -> Result<OperationGraph> {
        let neuron_count = self.network.neurons().len();
        let weight_count = self.network.weight_table().len();

        let mut operations: Vec<Operation> = Vec::new();
        let mut neuron_spike_ops: HashMap<usize, usize> = HashMap::new();
        let mut neuron_transfer_ops: HashMap<usize, usize> = HashMap::new();
        let mut neuron_softmax_group: HashMap<usize, Vec<usize>> = HashMap::new();
        // (operation index, upstream neuron) pairs whose Internal source
        // points at a neuron not yet built when the reference was created —
        // only legal for reach_past_loops > 0 sources, since those are
        // resolved through the ring buffer and have no ordering requirement.
        let mut pending_future_refs: Vec<(usize, usize)> = Vec::new();

        // Softmax groups are resolved ahead of time so a neuron's transfer
        // source can be redirected to its SolutionFeature member instead of
        // its raw TransferFn when it belongs to one.
        for feature in self.network.features() {
            if let NetworkFeature::Softmax { neuron_indices } = feature {
                for &n in neuron_indices {
                    neuron_softmax_group.insert(n, neuron_indices.clone());
                }
            }
        }

        for neuron_index in 0..neuron_count {
            self.build_neuron_chain(
                neuron_index,
                &mut operations,
                &mut neuron_spike_ops,
                &mut neuron_transfer_ops,
                &neuron_softmax_group,
                &mut pending_future_refs,
            )?;
        }

        for (op_index, upstream_neuron) in pending_future_refs {
            let spike_op = *neuron_spike_ops.get(&upstream_neuron).ok_or_else(|| {
                GymError::graph_build(format!(
                    "operation {op_index} references neuron {upstream_neuron}, which was never built"
                ))
            })?;
            if let Operation::NeuronInput {
                source: InputSource::Internal { spike_op: slot, .. },
                ..
            } = &mut operations[op_index]
            {
                *slot = spike_op;
            }
        }

        // Softmax SolutionFeature operations are appended once per group
        // member, after every neuron's TransferFn exists, then neuron
        // chains that depend on them are relinked by build_neuron_chain via
        // neuron_softmax_group above (the SpikeFn source already points at
        // the SolutionFeature operation built here).
        let mut softmax_ops: HashMap<usize, usize> = HashMap::new();
        let mut seen_groups: Vec<Vec<usize>> = Vec::new();
        for group in neuron_softmax_group.values() {
            if seen_groups.iter().any(|g| g == group) {
                continue;
            }
            seen_groups.push(group.clone());
            let transfer_ops: Vec<usize> = group
                .iter()
                .map(|&n| neuron_transfer_ops[&n])
                .collect();
            for (slot, &neuron_index) in group.iter().enumerate() {
                let idx = operations.len();
                operations.push(Operation::SolutionFeature {
                    slot,
                    group: transfer_ops.clone(),
                });
                softmax_ops.insert(neuron_index, idx);
            }
        }
        // Re-point every softmax neuron's SpikeFn at its SolutionFeature op.
        for (&neuron_index, &softmax_op) in &softmax_ops {
            let spike_idx = neuron_spike_ops[&neuron_index];
            if let Operation::SpikeFn { source, .. } = &mut operations[spike_idx] {
                *source = softmax_op;
            }
        }

        let output_range = self.network.output_range();
        let mut objective_ops = Vec::new();
        for (label_index, neuron_index) in output_range.enumerate() {
            let spike_op = neuron_spike_ops[&neuron_index];
            objective_ops.push(Operation::Objective { spike_op, label_index });
        }
        let weight_relevant_operation_count = objective_ops.len();

        // Objective operations are conceptually the weight-relevant prefix
        // (see BackpropData::set_derivative); to actually occupy index
        // range `0..weight_relevant_operation_count` they must be physically
        // the first entries, so the two vectors are concatenated with
        // objectives first and every other operation's indices are shifted.
        // `objective_ops` itself is built from pre-shift spike indices, so it
        // has to go through `shift_operation` too, same as every other
        // pre-existing operation.
        let shift = objective_ops.len();
        let mut shifted_operations = Vec::with_capacity(shift + operations.len());
        shifted_operations.extend(objective_ops.into_iter().map(|op| shift_operation(op, shift)));
        shifted_operations.extend(operations.into_iter().map(|op| shift_operation(op, shift)));

        let mut spike_ops_vec = vec![0usize; neuron_count];
        for (n, &op) in &neuron_spike_ops {
            spike_ops_vec[*n] = op + shift;
        }

        for feature in self.network.features() {
            match feature {
                NetworkFeature::L1Regularization { .. } | NetworkFeature::L2Regularization { .. } => {
                    shifted_operations.push(Operation::WeightRegularization {
                        feature: feature.clone(),
                    });
                }
                NetworkFeature::Softmax { .. } | NetworkFeature::Dropout { .. } => {}
            }
        }

        for (idx, op) in shifted_operations.iter().enumerate() {
            if op.is_spike_fn() || op.is_objective() {
                continue;
            }
            for dep in op.ordering_required_dependencies() {
                if dep >= idx {
                    return Err(GymError::graph_build(format!(
                        "operation {idx} depends on {dep}, which is not ordered before it"
                    )));
                }
            }
        }

        Ok(OperationGraph {
            operations: shifted_operations,
            weight_relevant_operation_count,
            neuron_spike_ops: spike_ops_vec,
            weight_count,
        })
    }

    /// Build the fold chain for one neuron: the full `[spike, bias.., input..]`
    /// weight layout maps onto NeuronInput operations (innermost = last
    /// input, folded right-to-left with the bias chain as its base), then a
    /// TransferFn reading the chain's head, then a SpikeFn reading the
    /// TransferFn (later redirected to a SolutionFeature member if the
    /// neuron belongs to a softmax group).
    fn build_neuron_chain(
        &self,
        neuron_index: usize,
        operations: &mut Vec<Operation>,
        neuron_spike_ops: &mut HashMap<usize, usize>,
        neuron_transfer_ops: &mut HashMap<usize, usize>,
        softmax_groups: &HashMap<usize, Vec<usize>>,
        pending_future_refs: &mut Vec<(usize, usize)>,
    ) -> Result<()> {
        let neuron = &self.network.neurons()[neuron_index];

        // Bias chain: innermost is the last bias (no `next`), built first so
        // earlier biases can reference it.
        let mut bias_chain_head: Option<usize> = None;
        for k in (0..neuron.bias_count).rev() {
            let weight_index = neuron.bias_weight_index(k)?.max(0) as usize;
            let idx = operations.len();
            operations.push(Operation::NeuronBias {
                weight_index,
                next: bias_chain_head,
                input_function: neuron.input_function,
            });
            bias_chain_head = Some(idx);
        }

        // Input chain: innermost is the last flat input index, whose `next`
        // is the bias chain's head (or nothing, if there are no biases). An
        // input synapse entry whose range spans several indices expands into
        // one `NeuronInput` (and one weight) per index, not one shared
        // weight for the whole entry.
        let flat_inputs: Vec<(usize, u32)> = neuron
            .input_synapses
            .iter()
            .enumerate()
            .flat_map(|(si, synapse)| (0..synapse.range.interval_size).map(move |offset| (si, offset)))
            .collect();
        let mut chain_head = bias_chain_head;
        for &(synapse_idx, offset) in flat_inputs.iter().rev() {
            let synapse = neuron.input_synapses[synapse_idx];
            let weight_index = neuron.input_weight_index(synapse_idx, offset)?.max(0) as usize;
            let flat = synapse.range.index_at(offset);
            let reach_past_loops = synapse.reach_past_loops as usize;

            let source = if is_index_input(flat) {
                let external_index = external_index_from_array_index(flat) as usize;
                let network_input_op = operations.len();
                operations.push(Operation::NetworkInput {
                    external_index,
                    reach_past_loops,
                    weight_index,
                });
                InputSource::External {
                    external_index,
                    reach_past_loops,
                    network_input_op,
                }
            } else {
                let upstream_neuron = flat as usize;
                match neuron_spike_ops.get(&upstream_neuron) {
                    Some(&spike_op) => InputSource::Internal { spike_op, reach_past_loops },
                    None if reach_past_loops > 0 => {
                        // Forward (not-yet-built) recurrent reference; the
                        // real spike operation index is patched in once
                        // every neuron has been built (see pending_future_refs).
                        InputSource::Internal { spike_op: usize::MAX, reach_past_loops }
                    }
                    None => {
                        return Err(GymError::graph_build(format!(
                            "neuron {neuron_index} input references neuron {upstream_neuron} before it was built"
                        )));
                    }
                }
            };

            let idx = operations.len();
            if matches!(source, InputSource::Internal { spike_op, .. } if spike_op == usize::MAX) {
                pending_future_refs.push((idx, flat as usize));
            }
            operations.push(Operation::NeuronInput {
                weight_index,
                source,
                next: chain_head,
                input_function: neuron.input_function,
            });
            chain_head = Some(idx);
        }

        let transfer_source = chain_head.ok_or_else(|| {
            GymError::graph_build(format!(
                "neuron {neuron_index} has neither inputs nor biases to feed its transfer function"
            ))
        })?;

        let transfer_idx = operations.len();
        operations.push(Operation::TransferFn {
            source: transfer_source,
            function: neuron.transfer_function,
        });
        neuron_transfer_ops.insert(neuron_index, transfer_idx);

        // Softmax neurons still get a SpikeFn reading the raw TransferFn for
        // now; it is repointed at the SolutionFeature operation once every
        // neuron's TransferFn exists (see GraphBuilder::build).
        let _ = softmax_groups;
        let spike_weight_index = neuron.spike_weight_index()?.max(0) as usize;
        let spike_idx = operations.len();
        operations.push(Operation::SpikeFn {
            source: transfer_idx,
            weight_index: spike_weight_index,
            function: neuron.spike_function,
        });
        neuron_spike_ops.insert(neuron_index, spike_idx);

        Ok(())
    }
}

/// Shift every operation-index reference inside `op` by `shift`, used when
/// the `Objective` prefix is prepended after the rest of the graph is built.
fn shift_operation(op: Operation, shift: usize) -> Operation {
    match op {
        Operation::NetworkInput {
            external_index,
            reach_past_loops,
            weight_index,
        } => Operation::NetworkInput {
            external_index,
            reach_past_loops,
            weight_index,
        },
        Operation::NeuronBias { weight_index, next, input_function } => Operation::NeuronBias {
            weight_index,
            next: next.map(|n| n + shift),
            input_function,
        },
        Operation::NeuronInput {
            weight_index,
            source,
            next,
            input_function,
        } => Operation::NeuronInput {
            weight_index,
            source: match source {
                InputSource::External {
                    external_index,
                    reach_past_loops,
                    network_input_op,
                } => InputSource::External {
                    external_index,
                    reach_past_loops,
                    network_input_op: network_input_op + shift,
                },
                InputSource::Internal { spike_op, reach_past_loops } => InputSource::Internal {
                    spike_op: spike_op + shift,
                    reach_past_loops,
                },
            },
            next: next.map(|n| n + shift),
            input_function,
        },
        Operation::TransferFn { source, function } => Operation::TransferFn {
            source: source + shift,
            function,
        },
        Operation::SpikeFn { source, weight_index, function } => Operation::SpikeFn {
            source: source + shift,
            weight_index,
            function,
        },
        Operation::Objective { spike_op, label_index } => Operation::Objective {
            spike_op: spike_op + shift,
            label_index,
        },
        Operation::WeightRegularization { feature } => Operation::WeightRegularization { feature },
        Operation::SolutionFeature { slot, group } => Operation::SolutionFeature {
            slot,
            group: group.into_iter().map(|g| g + shift).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rafko_core::{InputFunction, NetworkBuilder, SpikeFunction, TransferFunction};
    use rafko_core::network::synapse::InputSynapse;

    #[test]
    fn test_simple_regression_graph_topological_order() {
        // 2 inputs -> 1 hidden -> 2 identical outputs.
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

        for (idx, op) in graph.operations().iter().enumerate() {
            if op.is_spike_fn() || op.is_objective() {
                continue;
            }
            for dep in op.ordering_required_dependencies() {
                assert!(dep < idx, "operation {idx} depends on {dep}, not ordered before it");
            }
        }
        // Two output neurons -> exactly two leading Objective operations,
        // each reading its own (necessarily later-indexed) SpikeFn.
        assert_eq!(graph.weight_relevant_operation_count(), 2);
        for op in graph.operations().iter().take(2) {
            if let Operation::Objective { spike_op, .. } = op {
                assert!(*spike_op >= 2);
            } else {
                panic!("expected a leading Objective operation");
            }
        }
    }

    #[test]
    fn test_multi_index_input_synapse_expands_to_one_neuron_input_per_index() {
        // One InputSynapse entry spanning 2 external indices must produce
        // two NeuronInput operations (and consume two weights), not one.
        let mut builder = NetworkBuilder::new(2, 0);
        builder.add_neuron(
            TransferFunction::Identity,
            InputFunction::Add,
            SpikeFunction::None,
            vec![0.0, 0.0, 1.0, 1.0],
            1,
            vec![InputSynapse::new(-1, 2, 0)],
        );
        let net = builder.build(1).unwrap();
        assert_eq!(net.weight_table().len(), 4);
        let graph = GraphBuilder::new(&net).build().unwrap();
        let neuron_input_count = graph
            .operations()
            .iter()
            .filter(|op| matches!(op, Operation::NeuronInput { .. }))
            .count();
        assert_eq!(neuron_input_count, 2);

        let mut external_indices: Vec<usize> = graph
            .operations()
            .iter()
            .filter_map(|op| match op {
                Operation::NetworkInput { external_index, .. } => Some(*external_index),
                _ => None,
            })
            .collect();
        external_indices.sort_unstable();
        assert_eq!(external_indices, vec![0, 1]);
    }

    #[test]
    fn test_exactly_one_spike_fn_per_neuron() {
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
        let spike_count = graph.operations().iter().filter(|op| op.is_spike_fn()).count();
        assert_eq!(spike_count, 1);
    }

    #[test]
    fn test_building_twice_yields_same_length_and_kind_sequence() {
        let mut builder = NetworkBuilder::new(1, 0);
        builder.add_neuron(
            TransferFunction::Sigmoid,
            InputFunction::Add,
            SpikeFunction::None,
            vec![0.0, 0.1, 0.9],
            1,
            vec![InputSynapse::new(-1, 1, 0)],
        );
        let net = builder.build(1).unwrap();
        let a = GraphBuilder::new(&net).build().unwrap();
        let b = GraphBuilder::new(&net).build().unwrap();
        assert_eq!(a.operations().len(), b.operations().len());
        for (x, y) in a.operations().iter().zip(b.operations().iter()) {
            assert_eq!(std::mem::discriminant(x), std::mem::discriminant(y));
        }
    }

    #[test]
    fn test_missing_inputs_and_biases_rejected() {
        let mut builder = NetworkBuilder::new(1, 0);
        builder.add_neuron(
            TransferFunction::Identity,
            InputFunction::Add,
            SpikeFunction::None,
            vec![0.0],
            0,
            vec![],
        );
        let net = builder.build(1).unwrap();
        assert!(GraphBuilder::new(&net).build().is_err());
    }
}
