use std::sync::atomic::Ordering;
use std::time::Instant;

use crate::activation::activation::DerivativeMode;
use crate::error::{Error, Result};
use crate::layers::dense::Layer;
use crate::loss::squared_error::SquaredError;
use crate::network::network::Network;
use crate::optim::sgd::Sgd;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `network` for `config.epochs` epochs over `examples`
/// (input, target) and returns the statistics of the last completed epoch.
///
/// Each epoch runs in two phases:
/// 1. every example is fed forward and swept backward, storing its deltas and
///    weight gradients per layer, all against the epoch's starting weights;
/// 2. the stored gradients are applied example by example, in order.
///
/// # Errors
/// `ShapeMismatch` if any example disagrees with the input/output widths and
/// `Configuration` for an invalid learning rate. Both are reported before any
/// weight is touched.
///
/// # Early termination
/// The loop breaks early if `config.stop_flag` is set, or if the
/// `progress_tx` receiver has been dropped.
pub fn train_loop(
    network: &mut Network,
    examples: &[(Vec<f64>, Vec<f64>)],
    config: &TrainConfig,
) -> Result<Option<EpochStats>> {
    config.validate()?;
    validate_examples(network, examples)?;

    let optimizer = Sgd::new(config.learning_rate);
    tracing::info!(
        epochs = config.epochs,
        examples = examples.len(),
        learning_rate = config.learning_rate,
        derivative_mode = ?config.derivative_mode,
        "starting backpropagation"
    );

    let mut last_stats = None;

    for epoch in 1..=config.epochs {
        if let Some(ref flag) = config.stop_flag {
            if flag.load(Ordering::Relaxed) {
                tracing::info!(epoch, "stop flag set, ending training");
                break;
            }
        }

        let t_start = Instant::now();
        let error = run_one_epoch(network, examples, &optimizer, config.derivative_mode)?;
        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            error,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        tracing::debug!(epoch, error, "epoch finished");
        last_stats = Some(stats.clone());

        if let Some(ref tx) = config.progress_tx {
            // If the receiver has been dropped, stop training.
            if tx.send(stats).is_err() {
                break;
            }
        }
    }

    tracing::info!(final_error = ?last_stats.as_ref().map(|s| s.error), "backpropagation finished");
    Ok(last_stats)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn validate_examples(network: &Network, examples: &[(Vec<f64>, Vec<f64>)]) -> Result<()> {
    let (input_width, output_width) = (network.input_width(), network.output_width());
    for (input, target) in examples {
        Error::check_len("training input", input_width, input.len())?;
        Error::check_len("training target", output_width, target.len())?;
    }
    Ok(())
}

/// One epoch: gradient pass over every example, then the update pass.
/// Returns the summed half squared error of the gradient pass.
fn run_one_epoch(
    network: &mut Network,
    examples: &[(Vec<f64>, Vec<f64>)],
    optimizer: &Sgd,
    mode: DerivativeMode,
) -> Result<f64> {
    let layers = network.layers_mut();
    for layer in layers.iter_mut() {
        layer.clear_caches();
    }

    let mut total_error = 0.0;
    for (example, (input, target)) in examples.iter().enumerate() {
        layers[0].set_outputs(input)?;
        for i in 1..layers.len() {
            let (done, rest) = layers.split_at_mut(i);
            rest[0].forward_recording(done[i - 1].outputs(), mode)?;
        }

        let outputs = layers[layers.len() - 1].outputs();
        total_error += SquaredError::loss(outputs, target);
        let d_error = SquaredError::derivative(outputs, target);

        backward_sweep(layers, example, &d_error);
    }

    // Second pass: apply every example's stored gradient in order.
    for example in 0..examples.len() {
        for layer in layers.iter_mut().skip(1) {
            optimizer.step(layer, example);
        }
    }

    Ok(total_error)
}

/// Walks from the output layer down to layer 0, storing each layer's deltas
/// and weight gradients for `example`. Layer 0 gets a zero-width slot.
fn backward_sweep(layers: &mut [Layer], example: usize, d_error: &[f64]) {
    let last = layers.len() - 1;

    for i in (0..layers.len()).rev() {
        let (before, from_here) = layers.split_at_mut(i);
        let (current, after) = from_here.split_at_mut(1);
        let layer = &mut current[0];

        let deltas: Vec<f64> = if i == 0 {
            vec![0.0; layer.neuron_count()]
        } else if i == last {
            // δ = ∂E/∂o ⊙ local derivative
            d_error.iter()
                .zip(layer.local_derivatives(example))
                .map(|(e, d)| e * d)
                .collect()
        } else {
            // δ_j = (Σ_k δ_next[k] · W_next[k, j]) · local[j]
            let next = &after[0];
            let next_deltas = next.deltas(example);
            layer.local_derivatives(example).iter()
                .enumerate()
                .map(|(j, local)| {
                    let sum: f64 = next_deltas.iter()
                        .enumerate()
                        .map(|(k, delta)| delta * next.weights()[(k, j)])
                        .sum();
                    sum * local
                })
                .collect()
        };

        let previous_outputs: &[f64] = if i == 0 { &[] } else { before[i - 1].outputs() };
        layer.record_gradients(deltas, previous_outputs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationKind;
    use crate::math::matrix::Matrix;
    use approx::assert_relative_eq;

    fn linear_1x1(weight: f64, bias: f64) -> Network {
        Network::from_layers(vec![
            Layer::input(1),
            Layer::from_parts(Matrix::from_data(vec![vec![weight]]).unwrap(), vec![bias], ActivationKind::Linear).unwrap(),
        ]).unwrap()
    }

    #[test]
    fn one_step_matches_hand_computation() {
        // out = 0.5, fused local = 0.25, δ = (0.5 - 0) * 0.25 = 0.125
        let mut net = linear_1x1(0.5, 0.0);
        let config = TrainConfig::new(1, 1.0);
        let stats = train_loop(&mut net, &[(vec![1.0], vec![0.0])], &config).unwrap().unwrap();

        assert_relative_eq!(stats.error, 0.125);
        assert_relative_eq!(net.layers()[1].weights()[(0, 0)], 0.5 - 0.125);
        assert_relative_eq!(net.layers()[1].biases()[0], -0.125);
    }

    #[test]
    fn gradients_use_epoch_start_weights() {
        // Two identical examples: both gradients come from the same frozen
        // weights, so the step is applied twice with the same magnitude.
        let mut net = linear_1x1(0.5, 0.0);
        let example = (vec![1.0], vec![0.0]);
        train_loop(&mut net, &[example.clone(), example], &TrainConfig::new(1, 1.0)).unwrap();
        assert_relative_eq!(net.layers()[1].weights()[(0, 0)], 0.5 - 2.0 * 0.125);
    }

    #[test]
    fn backward_sweep_chains_through_next_weights() {
        // 1 -> 1 -> 1, linear, exact derivatives (local = 1).
        let mut net = Network::from_layers(vec![
            Layer::input(1),
            Layer::from_parts(Matrix::from_data(vec![vec![2.0]]).unwrap(), vec![0.0], ActivationKind::Linear).unwrap(),
            Layer::from_parts(Matrix::from_data(vec![vec![3.0]]).unwrap(), vec![0.0], ActivationKind::Linear).unwrap(),
        ]).unwrap();
        let config = TrainConfig::new(1, 0.01).with_derivative_mode(DerivativeMode::Exact);
        train_loop(&mut net, &[(vec![1.0], vec![5.0])], &config).unwrap();

        // out = 6, dE = 1; δ2 = 1, δ1 = 1 * 3 = 3
        let layers = net.layers();
        assert_relative_eq!(layers[2].weights()[(0, 0)], 3.0 - 0.01 * 1.0 * 2.0);
        assert_relative_eq!(layers[1].weights()[(0, 0)], 2.0 - 0.01 * 3.0 * 1.0);
        assert_relative_eq!(layers[2].deltas(0)[0], 1.0);
        assert_relative_eq!(layers[1].deltas(0)[0], 3.0);
        assert!(layers[0].deltas(0).iter().all(|&d| d == 0.0));
    }

    #[test]
    fn shape_errors_leave_weights_untouched() {
        let mut net = linear_1x1(0.5, 0.0);
        let examples = vec![(vec![1.0], vec![0.0]), (vec![1.0, 2.0], vec![0.0])];
        let err = train_loop(&mut net, &examples, &TrainConfig::new(3, 0.1));
        assert!(matches!(err, Err(Error::ShapeMismatch { .. })));
        assert_eq!(net.layers()[1].weights()[(0, 0)], 0.5);
    }

    #[test]
    fn zero_epochs_returns_none() {
        let mut net = linear_1x1(0.5, 0.0);
        let stats = train_loop(&mut net, &[(vec![1.0], vec![0.0])], &TrainConfig::new(0, 0.1)).unwrap();
        assert!(stats.is_none());
    }
}
