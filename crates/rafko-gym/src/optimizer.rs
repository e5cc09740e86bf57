//! The autodiff training loop: one `iterate()` call replays a full sequence
//! (an optional unlabeled prefill, then the labeled steps) through the
//! compiled operation graph, accumulates per-weight gradients into the
//! ring-buffered sequence-derivative summary, and asks the configured
//! weight updater for new weights.

use log::debug;

use rafko_core::{RafkoNetwork, RafkoSettings};

use crate::backprop_data::BackpropData;
use crate::cost::CostFunction;
use crate::error::Result;
use crate::graph::OperationGraph;
use crate::weight_updater::WeightUpdater;

/// Outcome of one `iterate()` call. A NaN/Inf observed mid-sweep surfaces as
/// a value rather than unwinding, so a caller driving many iterations can
/// decide for itself whether to abort the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IterationOutcome {
    /// The sweep completed and the weight updater applied a new weight set.
    Completed,
    /// A non-finite value or derivative was observed; the weight table was
    /// left untouched and `BackpropData` requires a reset before reuse.
    NumericalFailure {
        /// Operation whose value or derivative was non-finite
        operation_index: usize,
        /// Sequence step (prefill steps count too) at which it was observed
        step: usize,
    },
}

/// Drives one compiled [`OperationGraph`] through repeated training
/// sequences, mutating `network`'s weight table between sequences via the
/// configured [`WeightUpdater`].
pub struct AutodiffOptimizer<'a> {
    network: &'a mut RafkoNetwork,
    graph: &'a OperationGraph,
    data: BackpropData,
    cost_fn: &'a dyn CostFunction,
}

impl<'a> AutodiffOptimizer<'a> {
    /// Allocate backprop storage for `network`'s already-compiled `graph`,
    /// sized for `sequence_size` labeled steps.
    pub fn new(
        network: &'a mut RafkoNetwork,
        graph: &'a OperationGraph,
        cost_fn: &'a dyn CostFunction,
        sequence_size: usize,
    ) -> Self {
        let memory_slots = network.memory_size() + 1;
        let input_data_size = network.input_data_size();
        let data = BackpropData::with_input_size(
            memory_slots,
            graph.operations().len(),
            graph.weight_count(),
            graph.weight_relevant_operation_count(),
            sequence_size.max(1),
            input_data_size,
        );
        Self { network, graph, data, cost_fn }
    }

    /// The compiled operation graph this optimizer drives.
    pub fn graph(&self) -> &OperationGraph {
        self.graph
    }

    /// Gradient of the sequence's cost with respect to weight `w`, read off
    /// the running sequence-derivative summary after an `iterate()` call.
    pub fn avg_gradient(&self, w: usize) -> f64 {
        self.data.get_average_derivative(0, w)
    }

    /// Run one full prefill + labeled-sequence sweep and apply the
    /// configured weight updater's result to `network`'s weight table.
    pub fn iterate(
        &mut self,
        prefill_inputs: &[Vec<f64>],
        sequence: &[(Vec<f64>, Vec<f64>)],
        weight_updater: &mut dyn WeightUpdater,
        settings: &RafkoSettings,
    ) -> Result<IterationOutcome> {
        debug!(
            "iterate: sequence_len={}, prefill={}",
            sequence.len(),
            prefill_inputs.len()
        );

        let weight_count = self.graph.weight_count();
        let sample_count = sequence.len().max(1);

        weight_updater.start();
        while !weight_updater.is_finished() {
            self.data.reset();
            let effective_weights: Vec<f64> = (0..weight_count)
                .map(|i| weight_updater.probe_weight(i, self.network.weight_table()[i]))
                .collect();

            for (step, input) in prefill_inputs.iter().enumerate() {
                self.data.step();
                self.data.set_input(input);
                for (idx, op) in self.graph.operations().iter().enumerate() {
                    op.calculate_value(idx, &effective_weights, &mut self.data, settings);
                    if !self.check_value(idx) {
                        return Ok(IterationOutcome::NumericalFailure { operation_index: idx, step });
                    }
                }
            }

            for (step, (input, label)) in sequence.iter().enumerate() {
                self.data.step();
                self.data.set_input(input);

                for w in 0..weight_count {
                    if cfg!(debug_assertions) {
                        debug!("iterate: step={step}, weight={w}");
                    }
                    for (idx, op) in self.graph.operations().iter().enumerate().rev() {
                        if w == 0 {
                            op.calculate_value(idx, &effective_weights, &mut self.data, settings);
                            if !self.check_value(idx) {
                                return Ok(IterationOutcome::NumericalFailure {
                                    operation_index: idx,
                                    step: prefill_inputs.len() + step,
                                });
                            }
                        }
                        op.calculate_derivative(
                            idx,
                            w,
                            label,
                            &mut self.data,
                            &effective_weights,
                            self.cost_fn,
                            sample_count,
                            settings,
                        );
                        if !self.check_derivative(idx, w) {
                            return Ok(IterationOutcome::NumericalFailure {
                                operation_index: idx,
                                step: prefill_inputs.len() + step,
                            });
                        }
                    }
                }
            }

            let gradients: Vec<f64> = (0..weight_count).map(|w| self.avg_gradient(w)).collect();
            weight_updater.iterate(&gradients);
        }

        let weight_table = self.network.weight_table_mut();
        let gradients: Vec<f64> = (0..weight_count).map(|w| self.data.get_average_derivative(0, w)).collect();
        for i in 0..weight_count {
            weight_table[i] = weight_updater.new_weight(i, weight_table[i], &gradients);
        }

        Ok(IterationOutcome::Completed)
    }

    /// `true` if the stored value is finite.
    fn check_value(&self, operation_index: usize) -> bool {
        self.data.get_value(0, operation_index).is_finite()
    }

    /// `true` if the stored derivative is finite.
    fn check_derivative(&self, operation_index: usize, w: usize) -> bool {
        self.data.get_derivative(0, operation_index, w).is_finite()
    }
}
