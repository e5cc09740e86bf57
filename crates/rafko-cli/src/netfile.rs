//! TOML file format describing a network, its training dataset and the
//! settings a training run should use. This is the CLI's own convenience
//! format, not part of `rafko-core`/`rafko-gym`'s public surface: `init`
//! writes one, `train` and `inspect` read one.

use serde::Deserialize;

use rafko_core::network::synapse::InputSynapse;
use rafko_core::{InputFunction, NetworkBuilder, RafkoNetwork, RafkoSettings, SpikeFunction, TransferFunction};
use rafko_gym::dataset::InMemoryDataset;

use crate::error::{CliError, CliResult};

/// Top-level file contents: a network, an optional dataset and optional
/// setting overrides.
#[derive(Debug, Deserialize)]
pub struct NetworkFile {
    /// Network topology and weights
    pub network: NetworkSection,
    /// Training/evaluation samples, if this file is used for `train`
    #[serde(default)]
    pub dataset: Option<DatasetSection>,
    /// Settings overrides layered on top of [`RafkoSettings::default`]
    #[serde(default)]
    pub settings: SettingsSection,
}

/// The `[network]` table.
#[derive(Debug, Deserialize)]
pub struct NetworkSection {
    /// External input features per step
    pub input_data_size: usize,
    /// Required history length
    #[serde(default)]
    pub memory_size: usize,
    /// Number of trailing neurons treated as network outputs
    pub output_neuron_count: usize,
    /// Neurons, in construction order
    pub neurons: Vec<NeuronSection>,
}

/// One `[[network.neurons]]` entry.
#[derive(Debug, Deserialize)]
pub struct NeuronSection {
    /// Activation function name (`identity`, `sigmoid`, `tanh`, `relu`, `elu`, `selu`)
    pub transfer_function: String,
    /// Merge function name (`add`, `multiply`)
    pub input_function: String,
    /// State function name (`none`, `memory`, `p`, `amplify`)
    pub spike_function: String,
    /// `[spike_weight, bias_0..bias_{k-1}, input_weight_0..]`
    pub weights: Vec<f64>,
    /// Number of bias weights among `weights`
    #[serde(default)]
    pub bias_count: usize,
    /// `[start, interval_size, reach_past_loops]` triples
    pub input_synapses: Vec<(i64, u32, usize)>,
}

/// The `[dataset]` table.
#[derive(Debug, Deserialize)]
pub struct DatasetSection {
    /// Label features per step (the network's output neuron count)
    pub feature_size: usize,
    /// Labeled steps per sequence
    pub sequence_size: usize,
    /// Unlabeled warm-up steps prepended to every sequence
    #[serde(default)]
    pub prefill_size: usize,
    /// Flattened input samples, `number_of_sequences * (sequence_size + prefill_size)` long
    pub inputs: Vec<Vec<f64>>,
    /// Flattened label samples, `number_of_sequences * sequence_size` long
    pub labels: Vec<Vec<f64>>,
}

/// The optional `[settings]` table; every field defaults to
/// [`RafkoSettings::default`]'s value when omitted.
#[derive(Debug, Deserialize, Default)]
pub struct SettingsSection {
    /// Base learning rate
    pub learning_rate: Option<f64>,
    /// Stochastic-evaluation minibatch size
    pub minibatch_size: Option<usize>,
    /// Per-sequence backprop truncation window
    pub memory_truncation: Option<usize>,
    /// Which weight-update strategy `train` should use
    pub weight_updater: Option<String>,
    /// Which cost function `train` should use
    pub cost_function: Option<String>,
}

impl NetworkFile {
    /// Parse a network file from its TOML text.
    pub fn parse(text: &str) -> CliResult<Self> {
        toml::from_str(text).map_err(|e| CliError::parse(e.to_string()))
    }

    /// Compile the `[network]` section into a [`RafkoNetwork`].
    pub fn build_network(&self) -> CliResult<RafkoNetwork> {
        let mut builder = NetworkBuilder::new(self.network.input_data_size, self.network.memory_size);
        for neuron in &self.network.neurons {
            let transfer = parse_transfer_function(&neuron.transfer_function)?;
            let input_fn = parse_input_function(&neuron.input_function)?;
            let spike = parse_spike_function(&neuron.spike_function)?;
            let synapses = neuron
                .input_synapses
                .iter()
                .map(|&(start, len, reach)| InputSynapse::new(start, len, reach))
                .collect();
            builder.add_neuron(transfer, input_fn, spike, neuron.weights.clone(), neuron.bias_count, synapses);
        }
        builder
            .build(self.network.output_neuron_count)
            .map_err(CliError::Network)
    }

    /// Build the `[dataset]` section into an [`InMemoryDataset`], if present.
    pub fn build_dataset(&self) -> CliResult<InMemoryDataset> {
        let dataset = self
            .dataset
            .as_ref()
            .ok_or_else(|| CliError::config("file has no [dataset] section"))?;
        Ok(InMemoryDataset::new(
            self.network.input_data_size,
            dataset.feature_size,
            dataset.sequence_size,
            dataset.prefill_size,
            dataset.inputs.clone(),
            dataset.labels.clone(),
        ))
    }

    /// Layer the `[settings]` overrides onto [`RafkoSettings::default`].
    pub fn build_settings(&self) -> RafkoSettings {
        let mut settings = RafkoSettings::default();
        if let Some(lr) = self.settings.learning_rate {
            settings = settings.with_learning_rate(lr);
        }
        if let Some(mb) = self.settings.minibatch_size {
            settings = settings.with_minibatch_size(mb);
        }
        if let Some(mt) = self.settings.memory_truncation {
            settings = settings.with_memory_truncation(mt);
        }
        settings
    }
}

fn parse_transfer_function(name: &str) -> CliResult<TransferFunction> {
    match name {
        "identity" => Ok(TransferFunction::Identity),
        "sigmoid" => Ok(TransferFunction::Sigmoid),
        "tanh" => Ok(TransferFunction::Tanh),
        "relu" => Ok(TransferFunction::Relu),
        "elu" => Ok(TransferFunction::Elu),
        "selu" => Ok(TransferFunction::Selu),
        other => Err(CliError::parse(format!("unknown transfer_function '{other}'"))),
    }
}

fn parse_input_function(name: &str) -> CliResult<InputFunction> {
    match name {
        "add" => Ok(InputFunction::Add),
        "multiply" => Ok(InputFunction::Multiply),
        other => Err(CliError::parse(format!("unknown input_function '{other}'"))),
    }
}

fn parse_spike_function(name: &str) -> CliResult<SpikeFunction> {
    match name {
        "none" => Ok(SpikeFunction::None),
        "memory" => Ok(SpikeFunction::Memory),
        "p" => Ok(SpikeFunction::P),
        "amplify" => Ok(SpikeFunction::Amplify),
        other => Err(CliError::parse(format!("unknown spike_function '{other}'"))),
    }
}
