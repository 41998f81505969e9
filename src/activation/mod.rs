pub mod activation;

pub use activation::{ActivationKind, DerivativeMode};
