/// Half squared error, `(predicted - expected)² / 2` per output.
pub struct SquaredError;

impl SquaredError {
    /// Summed half squared error over all outputs.
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        predicted.iter().zip(expected.iter())
            .map(|(a, b)| (a - b).powi(2) / 2.0)
            .sum()
    }

    /// Per-output gradient: predicted - expected
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(a, b)| a - b)
            .collect()
    }
}
