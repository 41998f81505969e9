use serde::{Serialize, Deserialize};
use crate::activation::activation::ActivationKind;
use crate::error::{Error, Result};

/// Activation assignment in a `NetworkSpec`.
///
/// In JSON this is either a single name (`"sigmoid"`), applied to every
/// hidden and output layer, or a list with one entry per layer including the
/// input layer (`["linear", "tanh", "sigmoid"]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Activations {
    Uniform(ActivationKind),
    PerLayer(Vec<ActivationKind>),
}

/// Structure descriptor: neuron count per layer (first entry is the input
/// width) plus the activations to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub structure: Vec<usize>,
    pub activations: Activations,
}

impl NetworkSpec {
    pub fn uniform(structure: Vec<usize>, activation: ActivationKind) -> NetworkSpec {
        NetworkSpec { structure, activations: Activations::Uniform(activation) }
    }

    pub fn per_layer(structure: Vec<usize>, activations: Vec<ActivationKind>) -> NetworkSpec {
        NetworkSpec { structure, activations: Activations::PerLayer(activations) }
    }

    /// One activation per layer; the input layer is always `Linear` in the
    /// uniform form.
    pub fn resolved_activations(&self) -> Result<Vec<ActivationKind>> {
        if self.structure.is_empty() {
            return Err(Error::Configuration("network structure must name at least one layer".into()));
        }
        match &self.activations {
            Activations::Uniform(kind) => Ok(
                std::iter::once(ActivationKind::Linear)
                    .chain(std::iter::repeat(*kind).take(self.structure.len() - 1))
                    .collect()
            ),
            Activations::PerLayer(kinds) if kinds.len() != self.structure.len() => {
                Err(Error::Configuration(format!(
                    "activation list has {} entries but the structure has {} layers",
                    kinds.len(),
                    self.structure.len()
                )))
            }
            Activations::PerLayer(kinds) => Ok(kinds.clone()),
        }
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: &str) -> Result<NetworkSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
