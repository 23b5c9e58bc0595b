// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Activation functions and the aggregate/cut cycle used to fold a freshly
//! observed tag-weight vector into a running personality vector.

const SELU_TO_ZERO: f64 = 0.01;
const SELU_TO_LESS: f64 = 0.1;
const SELU_ALPHA: f64 = 1.67326324235;
const SELU_LAMBDA: f64 = 0.957;

const SIGMOID_L: f64 = 1.0;
const SIGMOID_K: f64 = 8.0;
const SIGMOID_MID: f64 = 0.5;

const RELU_CUT: f64 = 0.01;
const CURVE_BEGIN: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
	Selu,
	Sigmoid,
	DSigmoid,
	Square,
	Direct,
}

impl Activation {
	fn apply(self, input: f64) -> f64 {
		match self {
			Activation::Selu => selu(input),
			Activation::Sigmoid => sigmoid(input),
			Activation::DSigmoid => d_sigmoid(input),
			Activation::Square => square(input),
			Activation::Direct => direct(input),
		}
	}
}

/// Piecewise-continuous squashing curve: zero below the noise floor,
/// exponential ramp up to `SELU_TO_LESS`, linear beyond it.
fn selu(input: f64) -> f64 {
	if input < SELU_TO_ZERO {
		0.0
	} else if input < SELU_TO_LESS {
		SELU_LAMBDA * SELU_ALPHA * ((input - SELU_TO_LESS).exp() - (SELU_TO_ZERO - SELU_TO_LESS).exp())
	} else {
		SELU_LAMBDA * input
			+ (SELU_LAMBDA * SELU_ALPHA * (1.0 - (SELU_TO_ZERO - SELU_TO_LESS).exp()) - SELU_LAMBDA * SELU_TO_LESS)
	}
}

fn sigmoid(input: f64) -> f64 {
	SIGMOID_L / (1.0 + (-SIGMOID_K * (input - SIGMOID_MID)).exp())
}

/// Sigmoid's slope at `input`, squared and normalized so the peak is 1.
fn d_sigmoid(input: f64) -> f64 {
	let f = sigmoid(input);
	let derivative = SIGMOID_K * SIGMOID_L * f * (1.0 - f / SIGMOID_L);
	let max_derivative = SIGMOID_K * SIGMOID_L / 4.0;
	let normalized = derivative / max_derivative;
	normalized * normalized
}

fn relu(input: f64) -> f64 {
	if input > RELU_CUT {
		input
	} else {
		0.0
	}
}

fn square(input: f64) -> f64 {
	input * input
}

fn direct(input: f64) -> f64 {
	input
}

/// Blend weight for iteration `time` of `limit`: rises towards 1 as the
/// simulation approaches `limit`, following an inverted quadratic.
fn curve(time: usize, limit: usize) -> f64 {
	let t = time as f64 / limit.max(1) as f64;
	CURVE_BEGIN * (t - 1.0) * (t - 1.0)
}

/// Blends `old` towards `new`'s activated weight for every tag `new`
/// carries, at a proportion set by [`curve`], then clamps near-zero
/// entries to zero. Tags present only in `old` are left untouched.
pub fn aggregate_cut(old: &mut Vec<(String, f64)>, new: &[(String, f64)], time: usize, limit: usize, activation: Activation) {
	let blend = curve(time, limit);
	for (tag, new_weight) in new {
		let activated = activation.apply(*new_weight);
		match old.iter_mut().find(|(id, _)| id == tag) {
			Some((_, weight)) => {
				*weight = (1.0 - blend) * *weight + blend * activated;
			}
			None => old.push((tag.clone(), blend * activated)),
		}
	}
	for (_, weight) in old.iter_mut() {
		*weight = relu(*weight);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn selu_is_zero_below_noise_floor() {
		assert_eq!(selu(0.0), 0.0);
	}

	#[test]
	fn sigmoid_at_midpoint_is_half() {
		assert!((sigmoid(SIGMOID_MID) - 0.5).abs() < 1e-9);
	}

	#[test]
	fn relu_cuts_small_weights_to_zero() {
		assert_eq!(relu(0.005), 0.0);
		assert_eq!(relu(0.5), 0.5);
	}

	#[test]
	fn aggregate_cut_introduces_new_tags() {
		let mut old = Vec::new();
		aggregate_cut(&mut old, &[("sports".to_string(), 0.8)], 99, 100, Activation::Direct);
		assert_eq!(old.len(), 1);
		assert_eq!(old[0].0, "sports");
	}

	#[test]
	fn curve_approaches_one_near_the_limit() {
		assert!(curve(99, 100) < curve(1, 100));
	}
}
