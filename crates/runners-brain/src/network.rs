//! Fixed-topology policy network and its genetic operators.
//!
//! A [`PolicyNetwork`] is a two-layer feedforward network
//! (input → hidden → output) with `tanh` activations on both layers. Its
//! shape never changes after construction; evolution only touches the
//! numeric values of weights and biases (the *genes*).
//!
//! # Operations
//!
//! - **Initialization**: [`PolicyNetwork::random`] draws weights from a Xavier-bounded
//!   uniform distribution and biases from `[-1, 1)`
//! - **Inference**: [`PolicyNetwork::infer`] runs the forward pass
//! - **Crossover**: [`PolicyNetwork::crossover`] picks every gene from either parent
//! - **Mutation**: [`PolicyNetwork::mutate`] perturbs genes uniformly in place
//!
//! Cloning a network copies all of its storage, so a clone can be mutated
//! without affecting the original.
//!
//! # Design Decisions
//!
//! ## Uniform Crossover per Scalar
//!
//! Each individual weight and bias is inherited independently with
//! probability 0.5 from either parent. The child never contains a value that
//! is absent from both parents at the same position, unlike blend crossovers.
//!
//! ## Gene Order
//!
//! Genes are enumerated as input→hidden weights (row-major by input),
//! hidden→output weights (row-major by hidden), hidden biases, output biases.
//! Two networks of the same shape therefore line up gene by gene.

use std::iter;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Layer sizes of a [`PolicyNetwork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("{input}-{hidden}-{output}")]
pub struct NetworkShape {
    pub input: usize,
    pub hidden: usize,
    pub output: usize,
}

impl NetworkShape {
    #[must_use]
    pub const fn new(input: usize, hidden: usize, output: usize) -> Self {
        Self {
            input,
            hidden,
            output,
        }
    }

    /// Returns `true` if every layer has at least one unit.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.input > 0 && self.hidden > 0 && self.output > 0
    }

    /// Total number of weights and biases.
    #[must_use]
    pub const fn gene_count(&self) -> usize {
        self.input * self.hidden + self.hidden * self.output + self.hidden + self.output
    }
}

/// Error returned when vectors or networks of incompatible sizes meet.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum DimensionMismatch {
    #[display("expected {expected} inputs, got {actual}")]
    Input { expected: usize, actual: usize },
    #[display("expected {expected} outputs, got {actual}")]
    Output { expected: usize, actual: usize },
    #[display("network shapes differ: {left} vs {right}")]
    Shape {
        left: NetworkShape,
        right: NetworkShape,
    },
    #[display("{layer}: expected {expected} values, got {actual}")]
    Parameters {
        layer: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// A fixed 2-layer `tanh` feedforward network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicyNetwork")]
pub struct PolicyNetwork {
    shape: NetworkShape,
    weights_input_hidden: Vec<f32>,
    weights_hidden_output: Vec<f32>,
    bias_hidden: Vec<f32>,
    bias_output: Vec<f32>,
}

/// Unchecked serialized form, validated on the way into [`PolicyNetwork`].
#[derive(Deserialize)]
struct RawPolicyNetwork {
    shape: NetworkShape,
    weights_input_hidden: Vec<f32>,
    weights_hidden_output: Vec<f32>,
    bias_hidden: Vec<f32>,
    bias_output: Vec<f32>,
}

impl TryFrom<RawPolicyNetwork> for PolicyNetwork {
    type Error = DimensionMismatch;

    fn try_from(raw: RawPolicyNetwork) -> Result<Self, Self::Error> {
        Self::from_parts(
            raw.shape,
            raw.weights_input_hidden,
            raw.weights_hidden_output,
            raw.bias_hidden,
            raw.bias_output,
        )
    }
}

fn check_len(layer: &'static str, values: &[f32], expected: usize) -> Result<(), DimensionMismatch> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(DimensionMismatch::Parameters {
            layer,
            expected,
            actual: values.len(),
        })
    }
}

#[expect(clippy::cast_precision_loss)]
fn xavier_limit(fan_in: usize, fan_out: usize) -> f32 {
    (6.0 / (fan_in + fan_out) as f32).sqrt()
}

fn uniform_vec<R>(rng: &mut R, limit: f32, len: usize) -> Vec<f32>
where
    R: Rng + ?Sized,
{
    iter::repeat_with(|| rng.random_range(-limit..limit))
        .take(len)
        .collect()
}

impl PolicyNetwork {
    /// Creates a network with randomly initialized parameters.
    ///
    /// Weights of each layer are drawn uniformly from `[-b, b)` where
    /// `b = sqrt(6 / (fan_in + fan_out))` for that layer. Biases are drawn
    /// uniformly from `[-1, 1)`.
    ///
    /// # Panics
    ///
    /// Panics if any layer of `shape` is empty.
    pub fn random<R>(shape: NetworkShape, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        assert!(shape.is_valid(), "network layers must not be empty");
        let NetworkShape {
            input,
            hidden,
            output,
        } = shape;
        let weights_input_hidden = uniform_vec(rng, xavier_limit(input, hidden), input * hidden);
        let weights_hidden_output =
            uniform_vec(rng, xavier_limit(hidden, output), hidden * output);
        let bias_hidden = uniform_vec(rng, 1.0, hidden);
        let bias_output = uniform_vec(rng, 1.0, output);
        Self {
            shape,
            weights_input_hidden,
            weights_hidden_output,
            bias_hidden,
            bias_output,
        }
    }

    /// Builds a network from explicit parameter vectors.
    ///
    /// Weight matrices are row-major: `weights_input_hidden[j * hidden + i]`
    /// connects input `j` to hidden unit `i`.
    pub fn from_parts(
        shape: NetworkShape,
        weights_input_hidden: Vec<f32>,
        weights_hidden_output: Vec<f32>,
        bias_hidden: Vec<f32>,
        bias_output: Vec<f32>,
    ) -> Result<Self, DimensionMismatch> {
        check_len(
            "weights_input_hidden",
            &weights_input_hidden,
            shape.input * shape.hidden,
        )?;
        check_len(
            "weights_hidden_output",
            &weights_hidden_output,
            shape.hidden * shape.output,
        )?;
        check_len("bias_hidden", &bias_hidden, shape.hidden)?;
        check_len("bias_output", &bias_output, shape.output)?;
        Ok(Self {
            shape,
            weights_input_hidden,
            weights_hidden_output,
            bias_hidden,
            bias_output,
        })
    }

    #[must_use]
    pub fn shape(&self) -> NetworkShape {
        self.shape
    }

    /// Runs the forward pass.
    ///
    /// ```text
    /// hidden[i] = tanh(bias_hidden[i] + Σ_j input[j] · W_ih[j][i])
    /// output[i] = tanh(bias_output[i] + Σ_j hidden[j] · W_ho[j][i])
    /// ```
    ///
    /// Sums and activations are evaluated in `f64`. Every output lies strictly
    /// in `(-1, 1)`, even once `tanh` saturates.
    ///
    /// # Examples
    ///
    /// ```
    /// use runners_brain::network::{NetworkShape, PolicyNetwork};
    ///
    /// let shape = NetworkShape::new(2, 3, 1);
    /// let net = PolicyNetwork::from_parts(shape, vec![0.0; 6], vec![0.0; 3], vec![0.0; 3], vec![0.5])
    ///     .unwrap();
    /// let out = net.infer(&[1.0, -1.0]).unwrap();
    /// assert!((out[0] - 0.5_f32.tanh()).abs() < 1e-6);
    /// assert!(net.infer(&[1.0]).is_err());
    /// ```
    pub fn infer(&self, input: &[f32]) -> Result<Vec<f32>, DimensionMismatch> {
        if input.len() != self.shape.input {
            return Err(DimensionMismatch::Input {
                expected: self.shape.input,
                actual: input.len(),
            });
        }
        let input = input.iter().copied().map(f64::from).collect::<Vec<_>>();
        let hidden = layer_forward(
            &input,
            &self.weights_input_hidden,
            &self.bias_hidden,
            self.shape.hidden,
        );
        let output = layer_forward(
            &hidden,
            &self.weights_hidden_output,
            &self.bias_output,
            self.shape.output,
        );
        Ok(output.into_iter().map(open_unit).collect())
    }

    /// Iterates over all genes in canonical order.
    pub fn genes(&self) -> impl Iterator<Item = f32> + '_ {
        self.weights_input_hidden
            .iter()
            .chain(&self.weights_hidden_output)
            .chain(&self.bias_hidden)
            .chain(&self.bias_output)
            .copied()
    }

    fn genes_mut(&mut self) -> impl Iterator<Item = &mut f32> + '_ {
        self.weights_input_hidden
            .iter_mut()
            .chain(&mut self.weights_hidden_output)
            .chain(&mut self.bias_hidden)
            .chain(&mut self.bias_output)
    }

    /// Produces a child by uniform crossover at the scalar-gene level.
    ///
    /// Every weight and bias of the child is taken from `self` with
    /// probability 0.5 and from `other` otherwise, independently per scalar.
    ///
    /// Fails without touching either parent if the shapes differ.
    pub fn crossover<R>(&self, other: &Self, rng: &mut R) -> Result<Self, DimensionMismatch>
    where
        R: Rng + ?Sized,
    {
        if self.shape != other.shape {
            return Err(DimensionMismatch::Shape {
                left: self.shape,
                right: other.shape,
            });
        }
        let mut child = self.clone();
        for (gene, theirs) in child.genes_mut().zip(other.genes()) {
            if !rng.random_bool(0.5) {
                *gene = theirs;
            }
        }
        Ok(child)
    }

    /// Applies uniform mutation in place.
    ///
    /// Each gene, independently with probability `rate`, receives a
    /// perturbation drawn uniformly from `[-strength, strength]`.
    ///
    /// `rate = 0` never perturbs anything and `strength = 0` perturbs by zero,
    /// so both leave the network unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `rate` is outside `[0, 1]` or `strength` is negative.
    pub fn mutate<R>(&mut self, rate: f32, strength: f32, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        assert!(strength >= 0.0, "mutation strength must not be negative");
        let rate = f64::from(rate);
        for gene in self.genes_mut() {
            if rng.random_bool(rate) {
                *gene += rng.random_range(-strength..=strength);
            }
        }
    }
}

fn layer_forward(input: &[f64], weights: &[f32], bias: &[f32], width: usize) -> Vec<f64> {
    (0..width)
        .map(|i| {
            let sum = input
                .iter()
                .enumerate()
                .map(|(j, x)| x * f64::from(weights[j * width + i]))
                .sum::<f64>();
            (f64::from(bias[i]) + sum).tanh()
        })
        .collect()
}

/// Narrows an activation to `f32` without letting it round onto ±1.
#[expect(clippy::cast_possible_truncation)]
fn open_unit(value: f64) -> f32 {
    const LIMIT: f32 = 1.0 - f32::EPSILON;
    (value as f32).clamp(-LIMIT, LIMIT)
}
