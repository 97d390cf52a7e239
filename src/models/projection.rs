//! Linear projection from embedder width to prosody-encoder width
//!
//! This is the one sub-model simple enough to ship in-crate: a single
//! `nn.Linear` with bias, keys `weight` `[out, in]` and `bias` `[out]`.

use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module};
use std::collections::HashMap;

use crate::core::error::Result;
use crate::core::traits::{FeatureProjection, ModelComponent, ParameterSpec};

/// Dense projection with bias
pub struct LinearProjection {
    linear: Linear,
    in_dim: usize,
    out_dim: usize,
}

impl LinearProjection {
    /// Zero-initialized projection, to be bound from a checkpoint
    pub fn new(in_dim: usize, out_dim: usize, device: &Device) -> Result<Self> {
        let weight = Tensor::zeros((out_dim, in_dim), DType::F32, device)?;
        let bias = Tensor::zeros(out_dim, DType::F32, device)?;
        Ok(Self {
            linear: Linear::new(weight, Some(bias)),
            in_dim,
            out_dim,
        })
    }

    /// Projection from explicit weights (`weight` is `[out, in]`)
    pub fn from_weights(weight: Tensor, bias: Tensor) -> Result<Self> {
        let (out_dim, in_dim) = weight.dims2()?;
        Ok(Self {
            linear: Linear::new(weight, Some(bias)),
            in_dim,
            out_dim,
        })
    }

    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    pub fn out_dim(&self) -> usize {
        self.out_dim
    }
}

impl ModelComponent for LinearProjection {
    fn name(&self) -> &str {
        "bert_encoder"
    }

    fn parameter_specs(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::new("weight", &[self.out_dim, self.in_dim]),
            ParameterSpec::new("bias", &[self.out_dim]),
        ]
    }

    fn bind_parameters(&mut self, params: &HashMap<String, Tensor>) -> Result<()> {
        let weight = match params.get("weight") {
            Some(w) => w.clone(),
            None => self.linear.weight().clone(),
        };
        let bias = match (params.get("bias"), self.linear.bias()) {
            (Some(b), _) => Some(b.clone()),
            (None, current) => current.cloned(),
        };
        self.linear = Linear::new(weight, bias);
        Ok(())
    }
}

impl FeatureProjection for LinearProjection {
    fn project(&self, x: &Tensor) -> Result<Tensor> {
        Ok(self.linear.forward(x)?)
    }
}
