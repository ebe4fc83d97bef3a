use anyhow::{anyhow, Result};
use ndarray::{Array, Array1, Array2, Axis, Dimension, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use super::{Classifier, ModelKind};
use crate::config::MlpSettings;
use crate::error::ExperimentError;

/// Fully connected layer: `out = input · weights + bias`
#[derive(Debug, Clone)]
struct DenseLayer {
    /// (fan_in x fan_out)
    weights: Array2<f64>,
    bias: Array1<f64>,
}

/// First and second moment estimates for one layer
#[derive(Debug, Clone)]
struct AdamState {
    m_weights: Array2<f64>,
    v_weights: Array2<f64>,
    m_bias: Array1<f64>,
    v_bias: Array1<f64>,
}

impl AdamState {
    fn for_layer(layer: &DenseLayer) -> Self {
        Self {
            m_weights: Array2::zeros(layer.weights.raw_dim()),
            v_weights: Array2::zeros(layer.weights.raw_dim()),
            m_bias: Array1::zeros(layer.bias.raw_dim()),
            v_bias: Array1::zeros(layer.bias.raw_dim()),
        }
    }
}

struct LayerGradient {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

/// Multilayer perceptron with ReLU hidden layers and a single logistic output unit,
/// trained on binary log-loss with mini-batch Adam.
pub struct MlpClassifier {
    settings: MlpSettings,
    layers: Vec<DenseLayer>,
    loss_curve: Vec<f64>,
    converged: bool,
}

impl MlpClassifier {
    pub fn new(settings: MlpSettings) -> Self {
        Self {
            settings,
            layers: Vec::new(),
            loss_curve: Vec::new(),
            converged: false,
        }
    }

    /// Mean training loss per epoch
    pub fn loss_curve(&self) -> &[f64] {
        &self.loss_curve
    }

    pub fn n_epochs(&self) -> usize {
        self.loss_curve().len()
    }

    /// Layer widths including input and output, e.g. `[9, 16, 12, 1]`
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self.layers.iter().map(|l| l.weights.nrows()).collect();
        if let Some(last) = self.layers.last() {
            sizes.push(last.weights.ncols());
        }
        sizes
    }

    /// Probability of the positive class for each row
    pub fn predict_probabilities(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        let input_width = self
            .layers
            .first()
            .map(|l| l.weights.nrows())
            .ok_or_else(|| anyhow!("MLP is not fitted"))?;
        if features.ncols() != input_width {
            return Err(ExperimentError::ShapeMismatch { expected: input_width, actual: features.ncols() }.into());
        }

        let activations = self.forward(features);
        let output = activations.last().ok_or_else(|| anyhow!("MLP has no layers"))?;
        Ok(output.column(0).to_owned())
    }

    fn initialize(&mut self, n_features: usize, rng: &mut StdRng) {
        let mut sizes = vec![n_features];
        sizes.extend(self.settings.hidden_layers.iter().copied());
        sizes.push(1);

        let n_layers = sizes.len() - 1;
        self.layers = (0..n_layers)
            .map(|i| {
                let (fan_in, fan_out) = (sizes[i], sizes[i + 1]);
                // Glorot uniform; the logistic output layer uses the tighter factor
                let factor = if i == n_layers - 1 { 2.0 } else { 6.0 };
                let bound = (factor / (fan_in + fan_out) as f64).sqrt();
                DenseLayer {
                    weights: Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-bound..bound)),
                    bias: Array1::from_shape_fn(fan_out, |_| rng.gen_range(-bound..bound)),
                }
            })
            .collect();
    }

    /// Activations of every layer, input first
    fn forward(&self, input: &Array2<f64>) -> Vec<Array2<f64>> {
        let last = self.layers.len() - 1;
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.to_owned());

        for (i, layer) in self.layers.iter().enumerate() {
            let z = activations[i].dot(&layer.weights) + &layer.bias;
            let a = if i == last { z.mapv(sigmoid) } else { z.mapv(|v| v.max(0.0)) };
            activations.push(a);
        }
        activations
    }

    /// Loss and per-layer gradients for one mini-batch
    fn backward(&self, activations: &[Array2<f64>], targets: &Array2<f64>) -> (f64, Vec<LayerGradient>) {
        let batch_len = targets.nrows() as f64;
        let alpha = self.settings.alpha;

        let probs = &activations[activations.len() - 1];
        let log_loss = Zip::from(probs)
            .and(targets)
            .fold(0.0, |acc, &p, &y| {
                let p = p.clamp(f64::EPSILON, 1.0 - f64::EPSILON);
                acc - (y * p.ln() + (1.0 - y) * (1.0 - p).ln())
            })
            / batch_len;
        let squared_weights: f64 = self.layers.iter().map(|l| l.weights.mapv(|w| w * w).sum()).sum();
        let loss = log_loss + 0.5 * alpha * squared_weights / batch_len;

        let mut gradients = Vec::with_capacity(self.layers.len());
        let mut delta = probs - targets;

        for i in (0..self.layers.len()).rev() {
            let layer = &self.layers[i];
            let weights = (activations[i].t().dot(&delta) + &layer.weights * alpha) / batch_len;
            let bias = delta.sum_axis(Axis(0)) / batch_len;

            if i > 0 {
                let relu_grad = activations[i].mapv(|a| if a > 0.0 { 1.0 } else { 0.0 });
                delta = delta.dot(&layer.weights.t()) * relu_grad;
            }
            gradients.push(LayerGradient { weights, bias });
        }
        gradients.reverse();

        (loss, gradients)
    }
}

impl Classifier for MlpClassifier {
    fn kind(&self) -> ModelKind {
        ModelKind::Mlp
    }

    fn fit(&mut self, features: &Array2<f64>, labels: &Array1<bool>) -> Result<()> {
        let (n, n_features) = features.dim();
        if n == 0 {
            return Err(anyhow!("cannot train MLP on an empty dataset"));
        }
        if labels.len() != n {
            return Err(anyhow!("MLP got {} rows but {} labels", n, labels.len()));
        }

        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        self.initialize(n_features, &mut rng);
        self.loss_curve.clear();
        self.converged = false;

        let targets: Array1<f64> = labels.mapv(|l| if l { 1.0 } else { 0.0 });
        let batch_size = self.settings.batch_size.clamp(1, n);
        let (beta_1, beta_2, epsilon) = (self.settings.beta_1, self.settings.beta_2, self.settings.epsilon);

        let mut adam: Vec<AdamState> = self.layers.iter().map(AdamState::for_layer).collect();
        let mut step = 0i32;
        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0usize;
        let mut indices: Vec<usize> = (0..n).collect();

        for epoch in 0..self.settings.max_iter {
            indices.shuffle(&mut rng);
            let mut accumulated = 0.0;

            for batch in indices.chunks(batch_size) {
                let x_batch = features.select(Axis(0), batch);
                let y_batch = targets.select(Axis(0), batch).insert_axis(Axis(1));

                let activations = self.forward(&x_batch);
                let (loss, gradients) = self.backward(&activations, &y_batch);
                accumulated += loss * batch.len() as f64;

                step += 1;
                let learning_rate = self.settings.learning_rate * (1.0 - beta_2.powi(step)).sqrt()
                    / (1.0 - beta_1.powi(step));

                for ((layer, state), grad) in self.layers.iter_mut().zip(adam.iter_mut()).zip(gradients.iter()) {
                    adam_update(&mut layer.weights, &grad.weights, &mut state.m_weights, &mut state.v_weights,
                        learning_rate, beta_1, beta_2, epsilon);
                    adam_update(&mut layer.bias, &grad.bias, &mut state.m_bias, &mut state.v_bias,
                        learning_rate, beta_1, beta_2, epsilon);
                }
            }

            let epoch_loss = accumulated / n as f64;
            self.loss_curve.push(epoch_loss);
            debug!("MLP epoch {}: loss={:.6}", epoch + 1, epoch_loss);

            if epoch_loss > best_loss - self.settings.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            if epoch_loss < best_loss {
                best_loss = epoch_loss;
            }
            if no_improvement > self.settings.n_iter_no_change {
                self.converged = true;
                break;
            }
        }

        if self.converged {
            info!(
                "✓ MLP {:?} converged after {} epochs (loss {:.4})",
                self.layer_sizes(),
                self.n_epochs(),
                best_loss
            );
        } else {
            warn!(
                "MLP reached max_iter={} without converging (loss {:.4})",
                self.settings.max_iter, best_loss
            );
        }
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Array1<bool>> {
        Ok(self.predict_probabilities(features)?.mapv(|p| p > 0.5))
    }
}

#[allow(clippy::too_many_arguments)]
fn adam_update<D: Dimension>(
    param: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    learning_rate: f64,
    beta_1: f64,
    beta_2: f64,
    epsilon: f64,
) {
    Zip::from(param).and(grad).and(m).and(v).for_each(|p, &g, m, v| {
        *m = beta_1 * *m + (1.0 - beta_1) * g;
        *v = beta_2 * *v + (1.0 - beta_2) * g * g;
        *p -= learning_rate * *m / (v.sqrt() + epsilon);
    });
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
