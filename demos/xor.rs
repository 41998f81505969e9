use std::sync::mpsc;
use std::thread;

use ferrite_mlp::{evaluate_accuracy, ActivationKind, Network, TrainConfig};
use rand::{rngs::StdRng, SeedableRng};

fn main() -> ferrite_mlp::Result<()> {
    tracing_subscriber::fmt().init();

    let mut rng = StdRng::seed_from_u64(7);
    let mut network = Network::from_structure(&[2, 4, 2], ActivationKind::Sigmoid, &mut rng)?;

    // Two outputs: xor and xnor, so accuracy can be read off the argmax.
    let examples = vec![
        (vec![1.0, 0.0], vec![1.0, 0.0]),
        (vec![1.0, 1.0], vec![0.0, 1.0]),
        (vec![0.0, 1.0], vec![1.0, 0.0]),
        (vec![0.0, 0.0], vec![0.0, 1.0]),
    ];

    let (tx, rx) = mpsc::channel();
    let mut config = TrainConfig::new(10000, 0.5);
    config.progress_tx = Some(tx);

    let reporter = thread::spawn(move || {
        for stats in rx {
            if stats.epoch % 1000 == 0 {
                println!("Epoch {}: error = {:.6}", stats.epoch, stats.error);
            }
        }
    });

    network.train(&examples, &config)?;
    drop(config);
    reporter.join().expect("progress reporter thread panicked");

    for (input, _) in &examples {
        let output = network.predict(input)?;
        println!("Input: {:?} -> Output: [{:.4}, {:.4}]", input, output[0], output[1]);
    }
    println!("Accuracy: {:.2}", evaluate_accuracy(&mut network, &examples)?);
    Ok(())
}
