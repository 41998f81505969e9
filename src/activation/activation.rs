use serde::{Serialize, Deserialize};
use std::f64::consts::E;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The nonlinearity applied to a neuron's weighted sum.
///
/// Serialized as a lowercase name (`"linear"`, `"sigmoid"`, `"tanh"`, `"relu"`).
/// Unknown names fail to deserialize with an `UnsupportedActivation` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ActivationKind {
    #[default]
    Linear,
    Sigmoid,
    Tanh,
    Relu,
}

impl ActivationKind {
    pub const ALL: [ActivationKind; 4] = [
        ActivationKind::Linear,
        ActivationKind::Sigmoid,
        ActivationKind::Tanh,
        ActivationKind::Relu,
    ];

    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationKind::Linear => x,
            ActivationKind::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationKind::Tanh => x.tanh(),
            ActivationKind::Relu => x.max(0.0),
        }
    }

    /// True derivative with respect to the pre-activation value `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationKind::Linear => 1.0,
            ActivationKind::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            }
            ActivationKind::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationKind::Relu => if x >= 0.0 { 1.0 } else { 0.0 },
        }
    }

    /// The logistic shortcut `output * (1 - output)`, evaluated on the
    /// activated output. Only equals the true derivative for `Sigmoid`.
    pub fn fused_derivative(output: f64) -> f64 {
        output * (1.0 - output)
    }

    /// Stable numeric code, in declaration order.
    pub fn code(&self) -> u8 {
        match self {
            ActivationKind::Linear => 0,
            ActivationKind::Sigmoid => 1,
            ActivationKind::Tanh => 2,
            ActivationKind::Relu => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActivationKind::Linear => "linear",
            ActivationKind::Sigmoid => "sigmoid",
            ActivationKind::Tanh => "tanh",
            ActivationKind::Relu => "relu",
        }
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" | "identity" => Ok(ActivationKind::Linear),
            "sigmoid" | "logistic" => Ok(ActivationKind::Sigmoid),
            "tanh" => Ok(ActivationKind::Tanh),
            "relu" => Ok(ActivationKind::Relu),
            _ => Err(Error::UnsupportedActivation(s.to_string())),
        }
    }
}

impl TryFrom<String> for ActivationKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<u8> for ActivationKind {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        ActivationKind::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| Error::UnsupportedActivation(format!("code {code}")))
    }
}

/// Which local derivative a layer records during a training forward pass.
///
/// - `Fused`: `output * (1 - output)` for every activation kind. This is the
///   behaviour existing trained models were produced with.
/// - `Exact`: the derivative of the configured activation, evaluated at the
///   pre-activation value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivativeMode {
    #[default]
    Fused,
    Exact,
}

impl DerivativeMode {
    pub fn local_derivative(&self, activation: ActivationKind, pre_activation: f64, output: f64) -> f64 {
        match self {
            DerivativeMode::Fused => ActivationKind::fused_derivative(output),
            DerivativeMode::Exact => activation.derivative(pre_activation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn boundary_values() {
        assert_eq!(ActivationKind::Sigmoid.function(0.0), 0.5);
        assert_eq!(ActivationKind::Relu.function(-1.0), 0.0);
        assert_eq!(ActivationKind::Relu.function(1.0), 1.0);
        assert_eq!(ActivationKind::Tanh.function(0.0), 0.0);
        for x in [-3.5, 0.0, 1e-9, 42.0] {
            assert_eq!(ActivationKind::Linear.function(x), x);
        }
    }

    #[test]
    fn relu_derivative_is_one_at_zero() {
        assert_eq!(ActivationKind::Relu.derivative(0.0), 1.0);
        assert_eq!(ActivationKind::Relu.derivative(-0.1), 0.0);
    }

    #[test]
    fn sigmoid_and_tanh_derivatives() {
        assert_eq!(ActivationKind::Sigmoid.derivative(0.0), 0.25);
        assert_eq!(ActivationKind::Tanh.derivative(0.0), 1.0);
        for x in [-2.0_f64, -0.3, 0.7, 1.5] {
            let s = ActivationKind::Sigmoid.function(x);
            assert_relative_eq!(ActivationKind::Sigmoid.derivative(x), s * (1.0 - s), epsilon = 1e-15);
            assert_relative_eq!(ActivationKind::Tanh.derivative(x), 1.0 - x.tanh().powi(2), epsilon = 1e-15);
        }
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let h = 1e-6;
        for kind in ActivationKind::ALL {
            for x in [-1.3_f64, -0.4, 0.6, 2.1] {
                let numeric = (kind.function(x + h) - kind.function(x - h)) / (2.0 * h);
                assert_abs_diff_eq!(kind.derivative(x), numeric, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn parse_and_codes() {
        assert_eq!("ReLU".parse::<ActivationKind>().unwrap(), ActivationKind::Relu);
        assert!(matches!(
            "softmax".parse::<ActivationKind>(),
            Err(Error::UnsupportedActivation(_))
        ));
        for kind in ActivationKind::ALL {
            assert_eq!(ActivationKind::try_from(kind.code()).unwrap(), kind);
        }
        assert!(ActivationKind::try_from(4u8).is_err());
    }

    #[test]
    fn fused_mode_ignores_activation_kind() {
        let d = DerivativeMode::Fused.local_derivative(ActivationKind::Linear, 3.0, 3.0);
        assert_eq!(d, -6.0);
        let d = DerivativeMode::Exact.local_derivative(ActivationKind::Linear, 3.0, 3.0);
        assert_eq!(d, 1.0);
    }
}
