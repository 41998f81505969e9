// The library holds all network logic; this binary only trains a small XOR
// network so the crate can be smoke-tested from the command line.
// Optional arguments: a NetworkSpec JSON file and a TrainConfig JSON file.
//   RUST_LOG=debug cargo run -- spec.json train.json
use ferrite_mlp::{ActivationKind, Network, NetworkSpec, TrainConfig};
use rand::{rngs::StdRng, SeedableRng};
use tracing_subscriber::EnvFilter;

fn main() -> ferrite_mlp::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let spec = match args.next() {
        Some(path) => NetworkSpec::load_json(&path)?,
        None => NetworkSpec::uniform(vec![2, 3, 1], ActivationKind::Sigmoid),
    };
    let config = match args.next() {
        Some(path) => TrainConfig::load_json(&path)?,
        None => TrainConfig::new(5000, 0.5),
    };

    let mut rng = StdRng::seed_from_u64(42);
    let mut network = Network::from_spec(&spec, &mut rng)?;

    let examples = vec![
        (vec![0.0, 0.0], vec![0.0]),
        (vec![0.0, 1.0], vec![1.0]),
        (vec![1.0, 0.0], vec![1.0]),
        (vec![1.0, 1.0], vec![0.0]),
    ];

    let stats = network.train(&examples, &config)?;
    if let Some(stats) = stats {
        tracing::info!(epoch = stats.epoch, error = stats.error, "training complete");
    }

    for (input, _) in &examples {
        let output = network.predict(input)?;
        tracing::info!(?input, ?output, "prediction");
    }
    Ok(())
}
