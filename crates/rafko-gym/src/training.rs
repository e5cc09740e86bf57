//! Owns the network, dataset, objective, weight updater and compiled graph,
//! and exposes the handful of operations a caller drives a training run
//! through: full/stochastic fitness evaluation, one-off forward `solve()`
//! calls, and swapping any of the pluggable collaborators mid-run.

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rafko_core::{RafkoNetwork, RafkoSettings};

use crate::cost::CostFunction;
use crate::dataset::DatasetView;
use crate::error::Result;
use crate::graph::{GraphBuilder, OperationGraph};
use crate::optimizer::{AutodiffOptimizer, IterationOutcome};
use crate::solver::Solver;
use crate::weight_updater::WeightUpdater;

/// The training context: the single entry point a CLI or test harness talks
/// to once a network and dataset have been assembled.
pub struct TrainingContext {
    network: RafkoNetwork,
    graph: OperationGraph,
    dataset: Box<dyn DatasetView>,
    cost_fn: Box<dyn CostFunction>,
    weight_updater: Box<dyn WeightUpdater>,
    settings: RafkoSettings,
}

impl TrainingContext {
    /// Compile `network`'s operation graph and assemble a training context
    /// around it.
    pub fn new(
        network: RafkoNetwork,
        dataset: Box<dyn DatasetView>,
        cost_fn: Box<dyn CostFunction>,
        weight_updater: Box<dyn WeightUpdater>,
        settings: RafkoSettings,
    ) -> Result<Self> {
        let graph = GraphBuilder::new(&network).build()?;
        info!(
            "training context ready: {} neurons, {} weights, {} operations",
            network.neurons().len(),
            network.weight_table().len(),
            graph.operations().len()
        );
        Ok(Self {
            network,
            graph,
            dataset,
            cost_fn,
            weight_updater,
            settings,
        })
    }

    /// Read-only access to the underlying network (weights, neuron count).
    pub fn network(&self) -> &RafkoNetwork {
        &self.network
    }

    /// Swap the dataset this context trains/evaluates against.
    pub fn set_environment(&mut self, dataset: Box<dyn DatasetView>) {
        self.dataset = dataset;
    }

    /// Swap the cost function used both for fitness evaluation and for
    /// gradient computation during training.
    pub fn set_objective(&mut self, cost_fn: Box<dyn CostFunction>) {
        self.cost_fn = cost_fn;
    }

    /// Swap the weight-update strategy driving future `train_sequence` calls.
    pub fn set_weight_updater(&mut self, weight_updater: Box<dyn WeightUpdater>) {
        self.weight_updater = weight_updater;
    }

    /// Run one autodiff training iteration over sequence `seq_index` in the
    /// current dataset, updating the network's weights in place.
    pub fn train_sequence(&mut self, seq_index: usize) -> Result<IterationOutcome> {
        let (prefill, sequence) = self.gather_sequence(seq_index);
        let sequence_size = self.dataset.sequence_size().max(1);
        let mut optimizer = AutodiffOptimizer::new(
            &mut self.network,
            &self.graph,
            self.cost_fn.as_ref(),
            sequence_size,
        );
        optimizer.iterate(&prefill, &sequence, &mut *self.weight_updater, &self.settings)
    }

    /// Fitness over the entire training set: `-sum(cost)` across every
    /// sequence's labeled steps, evaluated forward-only (no gradients).
    pub fn full_evaluation(&self) -> f64 {
        let mut total = 0.0;
        for seq in 0..self.dataset.number_of_sequences() {
            total += self.evaluate_sequence(seq, None);
        }
        -total
    }

    /// Fitness over a random minibatch of `settings.minibatch_size`
    /// sequences, each evaluated from a random start index that still
    /// leaves a full `memory_truncation` window (or the full sequence, if
    /// unset) of labeled steps before the sequence ends.
    pub fn stochastic_evaluation(&self, seed: Option<u64>) -> f64 {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let sequence_count = self.dataset.number_of_sequences();
        if sequence_count == 0 {
            return 0.0;
        }
        let minibatch = self.settings.minibatch_size.min(sequence_count).max(1);
        let window = self
            .settings
            .memory_truncation
            .unwrap_or(self.dataset.sequence_size())
            .min(self.dataset.sequence_size())
            .max(1);
        let max_start = self.dataset.sequence_size().saturating_sub(window);

        let mut total = 0.0;
        for _ in 0..minibatch {
            let seq = rng.gen_range(0..sequence_count);
            let start = if max_start == 0 { 0 } else { rng.gen_range(0..=max_start) };
            total += self.evaluate_sequence(seq, Some((start, window)));
        }
        -total
    }

    /// Run one forward step through the solver, returning the output
    /// neurons' values. `reset` forgets prior neuron memory first.
    pub fn solve(&self, input: &[f64], reset: bool) -> Vec<f64> {
        let mut solver = Solver::new(&self.network, &self.graph, self.network.memory_size() + 1);
        solver.solve(input, reset)
    }

    fn gather_sequence(&self, seq_index: usize) -> (Vec<Vec<f64>>, Vec<(Vec<f64>, Vec<f64>)>) {
        let prefill_size = self.dataset.prefill_size();
        let sequence_size = self.dataset.sequence_size();
        let steps_per_sequence = prefill_size + sequence_size;

        let mut prefill = Vec::with_capacity(prefill_size);
        for i in 0..prefill_size {
            let raw = seq_index * steps_per_sequence + i;
            prefill.push(self.dataset.input_sample(raw).to_vec());
        }

        let mut sequence = Vec::with_capacity(sequence_size);
        for i in 0..sequence_size {
            let input_raw = seq_index * steps_per_sequence + prefill_size + i;
            let label_raw = seq_index * sequence_size + i;
            sequence.push((
                self.dataset.input_sample(input_raw).to_vec(),
                self.dataset.label_sample(label_raw).to_vec(),
            ));
        }
        (prefill, sequence)
    }

    fn evaluate_sequence(&self, seq_index: usize, window: Option<(usize, usize)>) -> f64 {
        let (prefill, sequence) = self.gather_sequence(seq_index);
        let mut solver = Solver::new(&self.network, &self.graph, self.network.memory_size() + 1);

        let mut first = true;
        for input in &prefill {
            solver.solve(input, first);
            first = false;
        }

        let (start, count) = window.unwrap_or((0, sequence.len()));
        let sample_count = count.max(1);
        let mut cost = 0.0;
        for (i, (input, label)) in sequence.iter().enumerate() {
            let output = solver.solve(input, first && i == 0);
            first = false;
            if i < start || i >= start + count {
                continue;
            }
            for (&feature, &label_value) in output.iter().zip(label.iter()) {
                cost += self.cost_fn.error(label_value, feature) / sample_count as f64;
            }
        }
        cost
    }
}
