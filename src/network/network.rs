use std::fmt;

use rand::Rng;

use crate::activation::activation::ActivationKind;
use crate::error::{Error, Result};
use crate::layers::dense::Layer;
use crate::network::spec::NetworkSpec;
use crate::train::epoch_stats::EpochStats;
use crate::train::loop_fn::train_loop;
use crate::train::train_config::TrainConfig;

/// An ordered stack of fully-connected layers.
///
/// `layers[0]` is the input layer: its outputs hold the current input vector
/// and it has no weights. The last layer's outputs are the network output.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    /// Wraps pre-built layers, checking that layer 0 has no weights and that
    /// each later layer's input width equals the previous neuron count.
    pub fn from_layers(layers: Vec<Layer>) -> Result<Network> {
        let Some(first) = layers.first() else {
            return Err(Error::Configuration("a network needs at least an input layer".into()));
        };
        if !first.is_input() {
            return Err(Error::Configuration(format!(
                "layer 0 must be an input layer, but it expects {} inputs",
                first.previous_neuron_count()
            )));
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[1].previous_neuron_count() != pair[0].neuron_count() {
                return Err(Error::Configuration(format!(
                    "layer {} expects {} inputs but layer {} has {} neurons",
                    i + 1,
                    pair[1].previous_neuron_count(),
                    i,
                    pair[0].neuron_count()
                )));
            }
        }
        Ok(Network { layers })
    }

    /// Builds a network from neuron counts, applying `activation` to every
    /// hidden and output layer.
    pub fn from_structure<R: Rng + ?Sized>(
        structure: &[usize],
        activation: ActivationKind,
        rng: &mut R,
    ) -> Result<Network> {
        Network::from_spec(&NetworkSpec::uniform(structure.to_vec(), activation), rng)
    }

    /// Builds a network from neuron counts and one activation per layer
    /// (the first entry belongs to the input layer).
    pub fn from_structure_per_layer<R: Rng + ?Sized>(
        structure: &[usize],
        activations: &[ActivationKind],
        rng: &mut R,
    ) -> Result<Network> {
        Network::from_spec(&NetworkSpec::per_layer(structure.to_vec(), activations.to_vec()), rng)
    }

    pub fn from_spec<R: Rng + ?Sized>(spec: &NetworkSpec, rng: &mut R) -> Result<Network> {
        let activations = spec.resolved_activations()?;
        let structure = &spec.structure;

        let mut layers = Vec::with_capacity(structure.len());
        for (i, (&size, &activation)) in structure.iter().zip(&activations).enumerate() {
            let previous = if i == 0 { 0 } else { structure[i - 1] };
            layers.push(Layer::new(size, previous, activation, rng));
        }
        tracing::debug!(?structure, ?activations, "built network");
        Ok(Network { layers })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn input_width(&self) -> usize {
        self.layers[0].neuron_count()
    }

    pub fn output_width(&self) -> usize {
        self.output_layer().neuron_count()
    }

    fn output_layer(&self) -> &Layer {
        &self.layers[self.layers.len() - 1]
    }

    pub fn inputs(&self) -> &[f64] {
        self.layers[0].outputs()
    }

    pub fn outputs(&self) -> &[f64] {
        self.output_layer().outputs()
    }

    /// Loads `values` into the input layer.
    pub fn set_inputs(&mut self, values: &[f64]) -> Result<()> {
        self.layers[0].set_outputs(values)
    }

    /// Forward pass from layer 1 to the output layer using the inputs already
    /// loaded into layer 0. Training caches are left untouched.
    pub fn update(&mut self) -> Result<&[f64]> {
        for i in 1..self.layers.len() {
            let (done, rest) = self.layers.split_at_mut(i);
            rest[0].forward(done[i - 1].outputs())?;
        }
        Ok(self.outputs())
    }

    /// `set_inputs` followed by `update`.
    pub fn predict(&mut self, input: &[f64]) -> Result<&[f64]> {
        self.set_inputs(input)?;
        self.update()
    }

    /// Trains on `examples` (input, target) for `epochs` epochs.
    ///
    /// Every example's gradients are computed against the weights as they
    /// stood at the start of the epoch, then applied one example at a time.
    pub fn backpropagate(
        &mut self,
        examples: &[(Vec<f64>, Vec<f64>)],
        epochs: usize,
        learning_rate: f64,
    ) -> Result<&mut Self> {
        self.train(examples, &TrainConfig::new(epochs, learning_rate))?;
        Ok(self)
    }

    /// Trains with a full `TrainConfig`; returns the last epoch's statistics.
    pub fn train(
        &mut self,
        examples: &[(Vec<f64>, Vec<f64>)],
        config: &TrainConfig,
    ) -> Result<Option<EpochStats>> {
        train_loop(self, examples, config)
    }

    /// Adds uniform noise in [-1, 1] to every weight and bias.
    pub fn add_noise<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for layer in self.layers.iter_mut().skip(1) {
            layer.add_noise(rng);
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for layer in &self.layers {
            writeln!(f, "{layer}")?;
        }
        Ok(())
    }
}
