use crate::error::Result;
use crate::network::network::Network;

/// Fraction of examples whose output argmax matches the target argmax.
/// Returns 0 for an empty example set.
pub fn evaluate_accuracy(network: &mut Network, examples: &[(Vec<f64>, Vec<f64>)]) -> Result<f64> {
    if examples.is_empty() {
        return Ok(0.0);
    }
    let mut correct = 0usize;
    for (input, target) in examples {
        let output = network.predict(input)?;
        if argmax(output) == argmax(target) {
            correct += 1;
        }
    }
    Ok(correct as f64 / examples.len() as f64)
}

/// Index of the maximum element in a slice.
pub fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_picks_largest() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
