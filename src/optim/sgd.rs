use crate::layers::dense::Layer;

/// Plain gradient descent; the only optimizer the trainer supports.
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }

    /// Applies the gradient stored for `example_index` to a layer.
    /// Input layers are left untouched.
    pub fn step(&self, layer: &mut Layer, example_index: usize) {
        layer.apply_gradient_step(self.learning_rate, example_index);
    }
}
