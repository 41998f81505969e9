use std::sync::mpsc;
use std::sync::{Arc, atomic::AtomicBool};

use serde::{Serialize, Deserialize};

use crate::activation::activation::DerivativeMode;
use crate::error::{Error, Result};
use crate::train::epoch_stats::EpochStats;

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`          — number of full passes over the example batch
/// - `learning_rate`   — step size of the gradient update
/// - `derivative_mode` — which local derivative the forward pass records
///                       (defaults to `Fused`)
/// - `progress_tx`     — optional channel sender; one `EpochStats` is sent per
///                       completed epoch.  If the receiver is dropped the loop
///                       terminates early.
/// - `stop_flag`       — optional atomic flag; when set to `true` from another
///                       thread the loop terminates before the next epoch.
///
/// Only the first three fields are read from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    #[serde(default)]
    pub derivative_mode: DerivativeMode,
    #[serde(skip)]
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
    #[serde(skip)]
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl TrainConfig {
    /// Creates a minimal `TrainConfig` with no progress channel and no stop flag.
    pub fn new(epochs: usize, learning_rate: f64) -> Self {
        TrainConfig {
            epochs,
            learning_rate,
            derivative_mode: DerivativeMode::default(),
            progress_tx: None,
            stop_flag: None,
        }
    }

    pub fn with_derivative_mode(mut self, mode: DerivativeMode) -> Self {
        self.derivative_mode = mode;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
            return Err(Error::Configuration(format!(
                "learning rate must be a finite non-negative number, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }

    /// Deserializes a `TrainConfig` from a JSON file.
    pub fn load_json(path: &str) -> Result<TrainConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: TrainConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_defaults_to_fused_derivative() {
        let config: TrainConfig =
            serde_json::from_str(r#"{"epochs": 50, "learning_rate": 0.2}"#).unwrap();
        assert_eq!(config.epochs, 50);
        assert_eq!(config.derivative_mode, DerivativeMode::Fused);
        assert!(config.progress_tx.is_none());

        let exact: TrainConfig = serde_json::from_str(
            r#"{"epochs": 1, "learning_rate": 0.1, "derivative_mode": "exact"}"#,
        ).unwrap();
        assert_eq!(exact.derivative_mode, DerivativeMode::Exact);
    }

    #[test]
    fn rejects_bad_learning_rate() {
        assert!(TrainConfig::new(1, f64::NAN).validate().is_err());
        assert!(TrainConfig::new(1, -0.5).validate().is_err());
        assert!(TrainConfig::new(1, 0.0).validate().is_ok());
    }
}
