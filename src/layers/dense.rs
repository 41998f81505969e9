use std::fmt;

use rand::Rng;

use crate::activation::activation::{ActivationKind, DerivativeMode};
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// A fully-connected layer.
///
/// The input layer of a network is a `Layer` with zero weight columns: it
/// holds the caller's input vector in `outputs` and never computes anything.
#[derive(Debug, Clone)]
pub struct Layer {
    weights: Matrix,
    biases: Vec<f64>,
    outputs: Vec<f64>,
    activation: ActivationKind,
    // Per-example training caches, indexed by example position in the batch.
    derivative_cache: Vec<Vec<f64>>,
    weight_gradients: Vec<Matrix>,
    delta_cache: Vec<Vec<f64>>,
}

impl Layer {
    /// Weights start uniform in [0, 1), biases at zero.
    pub fn new<R: Rng + ?Sized>(
        neuron_count: usize,
        previous_neuron_count: usize,
        activation: ActivationKind,
        rng: &mut R,
    ) -> Layer {
        tracing::trace!(neuron_count, previous_neuron_count, %activation, "building layer");
        Layer {
            weights: Matrix::random(neuron_count, previous_neuron_count, rng),
            biases: vec![0.0; neuron_count],
            outputs: vec![0.0; neuron_count],
            activation,
            derivative_cache: Vec::new(),
            weight_gradients: Vec::new(),
            delta_cache: Vec::new(),
        }
    }

    /// An input layer: `neuron_count` pass-through neurons, no weights.
    pub fn input(neuron_count: usize) -> Layer {
        Layer {
            weights: Matrix::zeros(neuron_count, 0),
            biases: vec![0.0; neuron_count],
            outputs: vec![0.0; neuron_count],
            activation: ActivationKind::Linear,
            derivative_cache: Vec::new(),
            weight_gradients: Vec::new(),
            delta_cache: Vec::new(),
        }
    }

    /// Rebuilds a layer from previously extracted parameters.
    pub fn from_parts(weights: Matrix, biases: Vec<f64>, activation: ActivationKind) -> Result<Layer> {
        Error::check_len("layer biases", weights.rows, biases.len())?;
        Ok(Layer {
            outputs: vec![0.0; biases.len()],
            weights,
            biases,
            activation,
            derivative_cache: Vec::new(),
            weight_gradients: Vec::new(),
            delta_cache: Vec::new(),
        })
    }

    pub fn neuron_count(&self) -> usize {
        self.biases.len()
    }

    pub fn previous_neuron_count(&self) -> usize {
        self.weights.cols
    }

    /// True when the layer has no weight columns, as layer 0 of a network
    /// must. Training decides input-ness by position, not by this check.
    pub fn is_input(&self) -> bool {
        self.weights.cols == 0
    }

    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    pub fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    pub fn activation(&self) -> ActivationKind {
        self.activation
    }

    pub(crate) fn set_outputs(&mut self, values: &[f64]) -> Result<()> {
        Error::check_len("network input", self.outputs.len(), values.len())?;
        self.outputs.copy_from_slice(values);
        Ok(())
    }

    /// Computes `activate(bias + W · previous)` into the layer's output buffer.
    pub fn forward(&mut self, previous_outputs: &[f64]) -> Result<&[f64]> {
        self.feed(previous_outputs, None)?;
        Ok(&self.outputs)
    }

    /// Same as `forward`, and appends this example's local derivatives to the
    /// derivative cache for the backward sweep.
    pub fn forward_recording(&mut self, previous_outputs: &[f64], mode: DerivativeMode) -> Result<&[f64]> {
        self.feed(previous_outputs, Some(mode))?;
        Ok(&self.outputs)
    }

    fn feed(&mut self, previous_outputs: &[f64], record: Option<DerivativeMode>) -> Result<()> {
        Error::check_len("layer input", self.weights.cols, previous_outputs.len())?;

        let mut local = record.map(|_| Vec::with_capacity(self.outputs.len()));
        for (i, out) in self.outputs.iter_mut().enumerate() {
            let pre = self.biases[i]
                + self.weights.row(i).iter()
                    .zip(previous_outputs)
                    .map(|(w, x)| w * x)
                    .sum::<f64>();
            *out = self.activation.function(pre);
            if let (Some(mode), Some(local)) = (record, local.as_mut()) {
                local.push(mode.local_derivative(self.activation, pre, *out));
            }
        }
        if let Some(local) = local {
            self.derivative_cache.push(local);
        }
        Ok(())
    }

    pub(crate) fn clear_caches(&mut self) {
        self.derivative_cache.clear();
        self.weight_gradients.clear();
        self.delta_cache.clear();
    }

    pub(crate) fn local_derivatives(&self, example: usize) -> &[f64] {
        &self.derivative_cache[example]
    }

    pub(crate) fn deltas(&self, example: usize) -> &[f64] {
        &self.delta_cache[example]
    }

    /// Stores the deltas for the next example slot and, for non-input layers,
    /// the weight gradient `delta[j] * previous_outputs[k]`.
    pub(crate) fn record_gradients(&mut self, deltas: Vec<f64>, previous_outputs: &[f64]) {
        let mut gradient = Matrix::zeros(self.neuron_count(), self.previous_neuron_count());
        for (row, &delta) in gradient.data.iter_mut().zip(deltas.iter()) {
            for (g, &x) in row.iter_mut().zip(previous_outputs) {
                *g = delta * x;
            }
        }
        self.weight_gradients.push(gradient);
        self.delta_cache.push(deltas);
    }

    /// Applies the stored gradient of one example:
    /// `W -= lr * gradient[example]`, `b -= lr * delta[example]`.
    /// The training loop never calls this on layer 0.
    pub fn apply_gradient_step(&mut self, learning_rate: f64, example_index: usize) {
        self.weights.scaled_sub_assign(&self.weight_gradients[example_index], learning_rate);
        for (b, d) in self.biases.iter_mut().zip(&self.delta_cache[example_index]) {
            *b -= d * learning_rate;
        }
    }

    /// Adds uniform noise in [-1, 1] to every weight and bias.
    pub fn add_noise<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for (row, bias) in self.weights.data.iter_mut().zip(self.biases.iter_mut()) {
            *bias += rng.gen_range(-1.0..=1.0);
            for w in row.iter_mut() {
                *w += rng.gen_range(-1.0..=1.0);
            }
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.neuron_count() {
            write!(f, "((")?;
            for w in self.weights.row(i) {
                write!(f, "{w}, ")?;
            }
            writeln!(f, "), {}, {})", self.biases[i], self.outputs[i])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn fixed(weights: Vec<Vec<f64>>, biases: Vec<f64>, activation: ActivationKind) -> Layer {
        Layer::from_parts(Matrix::from_data(weights).unwrap(), biases, activation).unwrap()
    }

    #[test]
    fn new_layer_initialisation() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = Layer::new(4, 3, ActivationKind::Tanh, &mut rng);
        assert_eq!(layer.neuron_count(), 4);
        assert_eq!(layer.previous_neuron_count(), 3);
        assert!(layer.biases().iter().all(|&b| b == 0.0));
        assert!(layer.weights().data.iter().flatten().all(|&w| (0.0..1.0).contains(&w)));
    }

    #[test]
    fn forward_weighted_sum_plus_bias() {
        let mut layer = fixed(vec![vec![1.0, 2.0], vec![-1.0, 0.5]], vec![0.5, 0.0], ActivationKind::Linear);
        let out = layer.forward(&[1.0, 1.0]).unwrap().to_vec();
        assert_eq!(out, vec![3.5, -0.5]);
    }

    #[test]
    fn forward_rejects_wrong_width() {
        let mut layer = fixed(vec![vec![1.0, 2.0]], vec![0.0], ActivationKind::Linear);
        assert!(matches!(
            layer.forward(&[1.0]),
            Err(Error::ShapeMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn recording_appends_one_entry_per_call() {
        let mut layer = fixed(vec![vec![0.0]], vec![0.0], ActivationKind::Sigmoid);
        layer.forward(&[1.0]).unwrap();
        assert!(layer.derivative_cache.is_empty());
        layer.forward_recording(&[1.0], DerivativeMode::Fused).unwrap();
        layer.forward_recording(&[2.0], DerivativeMode::Fused).unwrap();
        assert_eq!(layer.derivative_cache.len(), 2);
        assert_relative_eq!(layer.local_derivatives(0)[0], 0.25);
    }

    #[test]
    fn gradient_step_uses_selected_example() {
        let mut layer = fixed(vec![vec![1.0]], vec![0.0], ActivationKind::Linear);
        layer.record_gradients(vec![2.0], &[3.0]);
        layer.record_gradients(vec![100.0], &[100.0]);
        layer.apply_gradient_step(0.5, 0);
        assert_relative_eq!(layer.weights()[(0, 0)], 1.0 - 0.5 * 6.0);
        assert_relative_eq!(layer.biases()[0], -1.0);
    }

    #[test]
    fn gradient_step_updates_bias_of_zero_width_layer() {
        let mut layer = fixed(vec![vec![]], vec![0.0], ActivationKind::Linear);
        layer.record_gradients(vec![-5.0], &[]);
        layer.apply_gradient_step(0.1, 0);
        assert_relative_eq!(layer.biases()[0], 0.5);
    }

    #[test]
    fn noise_stays_within_unit_band() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut layer = fixed(vec![vec![0.0; 3]; 2], vec![0.0; 2], ActivationKind::Relu);
        layer.add_noise(&mut rng);
        assert!(layer.weights().data.iter().flatten().all(|w| (-1.0..=1.0).contains(w)));
        assert!(layer.biases().iter().all(|b| (-1.0..=1.0).contains(b)));
    }
}
