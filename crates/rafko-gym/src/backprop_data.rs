//! Ring-buffered storage for per-time-step operation values, per-weight
//! derivatives, and the running per-sequence gradient summary.
//!
//! Three logical buffers, each a fixed-size ring so that looking `k` steps
//! into the past costs no allocation: `values` (one scalar per operation per
//! remembered step), `derivatives` (one scalar per operation per weight per
//! remembered step), and `sequence_derivatives` (one running average per
//! weight per sequence step, populated only by weight-relevant operations).

/// Ring-buffered backprop storage for one compiled operation graph.
#[derive(Debug, Clone)]
pub struct BackpropData {
    memory_slots: usize,
    num_operations: usize,
    weight_count: usize,
    sequence_size: usize,
    weight_relevant_operation_count: usize,

    values: Vec<Vec<f64>>,
    derivatives: Vec<Vec<Vec<f64>>>,
    sequence_derivatives: Vec<Vec<f64>>,
    /// Ring-buffered copy of each step's external input vector, so that an
    /// input synapse's `reach_past_loops` can be resolved the same way a
    /// `SpikeFn`'s self-recurrence is: a bounded look-back with a
    /// well-defined zero past the buffer's depth.
    inputs: Vec<Vec<f64>>,

    /// Ring index holding "past_index 0" (the current step) for
    /// `values`/`derivatives`.
    current: usize,
    /// Ring index holding "past_index 0" for `sequence_derivatives`.
    seq_current: usize,
}

impl BackpropData {
    /// Allocate storage for a graph of `num_operations` operations over
    /// `weight_count` weights. `memory_slots` is `network.memory_size() + 1`
    /// (the network always remembers at least the previous value, for the
    /// spike function); `weight_relevant_operation_count` is the count of
    /// leading Objective operations; `sequence_size` bounds the running
    /// gradient summary.
    pub fn new(
        memory_slots: usize,
        num_operations: usize,
        weight_count: usize,
        weight_relevant_operation_count: usize,
        sequence_size: usize,
    ) -> Self {
        Self::with_input_size(memory_slots, num_operations, weight_count, weight_relevant_operation_count, sequence_size, 0)
    }

    /// Like [`BackpropData::new`], additionally sizing the per-step external
    /// input ring buffer for `input_data_size` features per step.
    pub fn with_input_size(
        memory_slots: usize,
        num_operations: usize,
        weight_count: usize,
        weight_relevant_operation_count: usize,
        sequence_size: usize,
        input_data_size: usize,
    ) -> Self {
        let memory_slots = memory_slots.max(1);
        let sequence_size = sequence_size.max(1);
        Self {
            memory_slots,
            num_operations,
            weight_count,
            sequence_size,
            weight_relevant_operation_count,
            values: vec![vec![0.0; num_operations]; memory_slots],
            derivatives: vec![vec![vec![0.0; weight_count]; num_operations]; memory_slots],
            sequence_derivatives: vec![vec![0.0; weight_count]; sequence_size],
            inputs: vec![vec![0.0; input_data_size]; memory_slots],
            current: 0,
            seq_current: 0,
        }
    }

    /// Number of operations this storage was built for.
    pub fn num_operations(&self) -> usize {
        self.num_operations
    }

    /// Number of weights this storage was built for.
    pub fn weight_count(&self) -> usize {
        self.weight_count
    }

    /// Erase all stored values, derivatives and sequence averages, and
    /// rewind to the first slot.
    pub fn reset(&mut self) {
        for slot in &mut self.values {
            slot.iter_mut().for_each(|v| *v = 0.0);
        }
        for slot in &mut self.derivatives {
            for row in slot.iter_mut() {
                row.iter_mut().for_each(|v| *v = 0.0);
            }
        }
        for slot in &mut self.sequence_derivatives {
            slot.iter_mut().for_each(|v| *v = 0.0);
        }
        for slot in &mut self.inputs {
            slot.iter_mut().for_each(|v| *v = 0.0);
        }
        self.current = 0;
        self.seq_current = 0;
    }

    /// Advance one time step: values keep their last contents (the forward
    /// sweep is expected to overwrite every slot each step), while the new
    /// derivative slot and the new sequence-derivative slot are zeroed, so
    /// that operations skipped by a truncated sequence contribute zero.
    pub fn step(&mut self) {
        self.current = (self.current + 1) % self.memory_slots;
        for w in self.derivatives[self.current].iter_mut() {
            w.iter_mut().for_each(|v| *v = 0.0);
        }
        self.seq_current = (self.seq_current + 1) % self.sequence_size;
        self.sequence_derivatives[self.seq_current]
            .iter_mut()
            .for_each(|v| *v = 0.0);
    }

    fn physical_value_slot(&self, past_index: usize) -> Option<usize> {
        if past_index >= self.memory_slots {
            None
        } else {
            Some((self.current + self.memory_slots - past_index) % self.memory_slots)
        }
    }

    /// Store `value` as the current step's result for `operation_index`.
    pub fn set_value(&mut self, operation_index: usize, value: f64) {
        self.values[self.current][operation_index] = value;
    }

    /// Read the value of `operation_index` from `past_index` steps ago.
    /// Reads further back than the ring buffer holds return `0.0` (a
    /// well-defined "out of memory" zero).
    pub fn get_value(&self, past_index: usize, operation_index: usize) -> f64 {
        match self.physical_value_slot(past_index) {
            Some(slot) => self.values[slot][operation_index],
            None => 0.0,
        }
    }

    /// Record the current step's external input vector, for later lookup by
    /// `reach_past_loops`-bearing input synapses.
    pub fn set_input(&mut self, input: &[f64]) {
        self.inputs[self.current][..input.len()].copy_from_slice(input);
    }

    /// Read external input feature `external_index` from `past_index` steps
    /// ago (`reach_past_loops`). Reads further back than the ring buffer
    /// holds, or beyond how many steps have actually elapsed, return `0.0`.
    pub fn get_input(&self, past_index: usize, external_index: usize) -> f64 {
        match self.physical_value_slot(past_index) {
            Some(slot) => self.inputs[slot].get(external_index).copied().unwrap_or(0.0),
            None => 0.0,
        }
    }

    /// Store the partial derivative of `operation_index` with respect to
    /// weight `d_w_index` for the current step, and, if this operation is
    /// weight-relevant, fold it into the running sequence-derivative
    /// summary as `(stored + new) / 2` (a recency-biased running summary,
    /// not a true mean).
    pub fn set_derivative(&mut self, operation_index: usize, d_w_index: usize, value: f64) {
        self.derivatives[self.current][operation_index][d_w_index] = value;
        if operation_index < self.weight_relevant_operation_count {
            let stored = &mut self.sequence_derivatives[self.seq_current][d_w_index];
            *stored = (*stored + value) / 2.0;
        }
    }

    /// Read the derivative of `operation_index` with respect to weight
    /// `weight_index` from `past_index` steps ago.
    pub fn get_derivative(&self, past_index: usize, operation_index: usize, weight_index: usize) -> f64 {
        match self.physical_value_slot(past_index) {
            Some(slot) => self.derivatives[slot][operation_index][weight_index],
            None => 0.0,
        }
    }

    /// Read the running sequence-derivative summary for weight
    /// `weight_index`, `past_sequence_index` sequence steps ago.
    pub fn get_average_derivative(&self, past_sequence_index: usize, weight_index: usize) -> f64 {
        if past_sequence_index >= self.sequence_size {
            return 0.0;
        }
        let slot = (self.seq_current + self.sequence_size - past_sequence_index) % self.sequence_size;
        self.sequence_derivatives[slot][weight_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_zeroes_everything() {
        let mut data = BackpropData::new(3, 2, 2, 1, 4);
        data.set_value(0, 5.0);
        data.set_derivative(0, 0, 7.0);
        data.reset();
        assert_eq!(data.get_value(0, 0), 0.0);
        assert_eq!(data.get_derivative(0, 0, 0), 0.0);
        assert_eq!(data.get_average_derivative(0, 0), 0.0);
    }

    #[test]
    fn test_step_with_no_writes_stays_zero_for_derivatives() {
        let mut data = BackpropData::new(3, 2, 2, 1, 4);
        for _ in 0..5 {
            data.step();
        }
        assert_eq!(data.get_derivative(0, 0, 0), 0.0);
        assert_eq!(data.get_average_derivative(0, 0), 0.0);
    }

    #[test]
    fn test_past_value_access() {
        let mut data = BackpropData::new(3, 1, 1, 0, 1);
        data.set_value(0, 1.0);
        data.step();
        data.set_value(0, 2.0);
        data.step();
        data.set_value(0, 3.0);
        assert_eq!(data.get_value(0, 0), 3.0);
        assert_eq!(data.get_value(1, 0), 2.0);
        assert_eq!(data.get_value(2, 0), 1.0);
    }

    #[test]
    fn test_out_of_memory_read_is_zero() {
        let data = BackpropData::new(2, 1, 1, 0, 1);
        assert_eq!(data.get_value(5, 0), 0.0);
    }

    #[test]
    fn test_sequence_derivative_recency_average() {
        let mut data = BackpropData::new(2, 1, 1, 1, 1);
        data.set_derivative(0, 0, 4.0);
        assert_eq!(data.get_average_derivative(0, 0), 2.0);
        data.set_derivative(0, 0, 4.0);
        assert_eq!(data.get_average_derivative(0, 0), 3.0);
    }
}
