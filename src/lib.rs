pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::matrix::Matrix;
pub use activation::activation::{ActivationKind, DerivativeMode};
pub use layers::dense::Layer;
pub use network::network::Network;
pub use network::spec::{Activations, NetworkSpec};
pub use loss::squared_error::SquaredError;
pub use optim::sgd::Sgd;
pub use train::{argmax, evaluate_accuracy, train_loop, EpochStats, TrainConfig};
