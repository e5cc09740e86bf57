//! The dataset view the optimizer and training context read samples
//! through. Implementations own the actual sample storage; this crate only
//! needs the shape and indexing contract.

/// A sequence-structured dataset of `f64` feature/label samples.
///
/// Samples are addressed by a flat "raw index" the caller computes: for
/// sequence `s` and step `i` within it, the input sample lives at
/// `s * (sequence_size() + prefill_size()) + i` (prefill steps have inputs
/// but no labels) and the label sample lives at `s * sequence_size() + i`
/// (labels start only once the prefill is over).
pub trait DatasetView: Send + Sync {
    /// Number of external input features per step.
    fn input_size(&self) -> usize;

    /// Number of label features per step (equal to the network's output
    /// neuron count).
    fn feature_size(&self) -> usize;

    /// Number of labeled steps per sequence.
    fn sequence_size(&self) -> usize;

    /// Number of unlabeled warm-up steps prepended to every sequence.
    fn prefill_size(&self) -> usize;

    /// Total number of sequences in the dataset.
    fn number_of_sequences(&self) -> usize;

    /// The input sample at flat index `raw_index`, length [`DatasetView::input_size`].
    fn input_sample(&self, raw_index: usize) -> &[f64];

    /// The label sample at flat index `raw_index`, length [`DatasetView::feature_size`].
    fn label_sample(&self, raw_index: usize) -> &[f64];
}

/// An in-memory [`DatasetView`] backed by flat `Vec<f64>` sample arrays, the
/// shape most tests and the CLI's file-backed loader produce.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    input_size: usize,
    feature_size: usize,
    sequence_size: usize,
    prefill_size: usize,
    inputs: Vec<Vec<f64>>,
    labels: Vec<Vec<f64>>,
}

impl InMemoryDataset {
    /// Build a dataset from flattened per-step sample vectors. `inputs` must
    /// hold `number_of_sequences * (sequence_size + prefill_size)` entries
    /// and `labels` must hold `number_of_sequences * sequence_size` entries.
    pub fn new(
        input_size: usize,
        feature_size: usize,
        sequence_size: usize,
        prefill_size: usize,
        inputs: Vec<Vec<f64>>,
        labels: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            input_size,
            feature_size,
            sequence_size,
            prefill_size,
            inputs,
            labels,
        }
    }

    /// Number of sequences this dataset was built with.
    pub fn number_of_sequences(&self) -> usize {
        let steps_per_sequence = self.sequence_size + self.prefill_size;
        if steps_per_sequence == 0 {
            0
        } else {
            self.inputs.len() / steps_per_sequence
        }
    }
}

impl DatasetView for InMemoryDataset {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn feature_size(&self) -> usize {
        self.feature_size
    }

    fn sequence_size(&self) -> usize {
        self.sequence_size
    }

    fn prefill_size(&self) -> usize {
        self.prefill_size
    }

    fn number_of_sequences(&self) -> usize {
        InMemoryDataset::number_of_sequences(self)
    }

    fn input_sample(&self, raw_index: usize) -> &[f64] {
        &self.inputs[raw_index]
    }

    fn label_sample(&self, raw_index: usize) -> &[f64] {
        &self.labels[raw_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> InMemoryDataset {
        // 2 sequences, 1 prefill step, 2 labeled steps, 1 input feature.
        InMemoryDataset::new(
            1,
            1,
            2,
            1,
            vec![vec![0.0]; 2 * 3],
            vec![vec![0.0]; 2 * 2],
        )
    }

    #[test]
    fn test_number_of_sequences() {
        let ds = sample_dataset();
        assert_eq!(ds.number_of_sequences(), 2);
    }

    #[test]
    fn test_raw_index_formulas_stay_in_bounds() {
        let ds = sample_dataset();
        for s in 0..ds.number_of_sequences() {
            for i in 0..(ds.sequence_size() + ds.prefill_size()) {
                let raw = s * (ds.sequence_size() + ds.prefill_size()) + i;
                let _ = ds.input_sample(raw);
            }
            for i in 0..ds.sequence_size() {
                let raw = s * ds.sequence_size() + i;
                let _ = ds.label_sample(raw);
            }
        }
    }
}
