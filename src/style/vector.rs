//! Style vectors
//!
//! A style vector is `[1, 2 * style_dim]`: the first half is the reference
//! (timbre) part fed to the decoder, the second half the prosody part fed
//! to the duration and pitch predictors.

use candle_core::{DType, Device, Tensor, D};
use std::collections::HashMap;
use std::path::Path;

use crate::core::error::{Result, TtsError};

/// Tensor name used when persisting a style vector
const STYLE_TENSOR_KEY: &str = "style";

/// Immutable reference + prosody embedding
#[derive(Debug, Clone)]
pub struct StyleVector {
    data: Tensor,
    reference_dim: usize,
}

impl StyleVector {
    /// Wrap a `[1, D]` tensor, split evenly into the two parts
    pub fn new(data: Tensor) -> Result<Self> {
        let (batch, dim) = data.dims2().map_err(|e| {
            TtsError::validation("style", format!("style vector must be [1, D]: {}", e))
        })?;
        if batch != 1 || dim == 0 || dim % 2 != 0 {
            return Err(TtsError::validation(
                "style",
                format!("style vector must be [1, D] with even D, got {:?}", data.dims()),
            ));
        }
        Ok(Self {
            data: data.to_dtype(DType::F32)?,
            reference_dim: dim / 2,
        })
    }

    /// Concatenate a reference part and a prosody part, both `[1, style_dim]`
    pub fn from_parts(reference: &Tensor, prosody: &Tensor) -> Result<Self> {
        if reference.dims() != prosody.dims() {
            return Err(TtsError::validation(
                "style",
                format!(
                    "reference part {:?} and prosody part {:?} differ in shape",
                    reference.dims(),
                    prosody.dims()
                ),
            ));
        }
        Self::new(Tensor::cat(&[reference, prosody], D::Minus1)?)
    }

    pub fn from_vec(values: Vec<f32>, device: &Device) -> Result<Self> {
        let dim = values.len();
        Self::new(Tensor::from_vec(values, (1, dim), device)?)
    }

    /// Full width (reference + prosody)
    pub fn dim(&self) -> usize {
        self.reference_dim * 2
    }

    pub fn tensor(&self) -> &Tensor {
        &self.data
    }

    /// Reference (timbre) part, `[1, style_dim]`
    pub fn reference(&self) -> Result<Tensor> {
        Ok(self.data.narrow(1, 0, self.reference_dim)?)
    }

    /// Prosody part, `[1, style_dim]`
    pub fn prosody(&self) -> Result<Tensor> {
        Ok(self.data.narrow(1, self.reference_dim, self.reference_dim)?)
    }

    /// Per-part convex blend with another style
    ///
    /// reference = `alpha * self + (1 - alpha) * other`,
    /// prosody = `beta * self + (1 - beta) * other`.
    pub fn blend(&self, other: &StyleVector, alpha: f64, beta: f64) -> Result<StyleVector> {
        self.check_same_width(other)?;
        let reference = mix(&self.reference()?, &other.reference()?, alpha)?;
        let prosody = mix(&self.prosody()?, &other.prosody()?, beta)?;
        Self::from_parts(&reference, &prosody)
    }

    /// Whole-vector convex combination `t * previous + (1 - t) * self`
    pub fn carry_over(&self, previous: &StyleVector, t: f64) -> Result<StyleVector> {
        self.check_same_width(previous)?;
        Self::new(mix(&previous.data, &self.data, t)?)
    }

    pub fn to_vec(&self) -> Result<Vec<f32>> {
        Ok(self.data.flatten_all()?.to_vec1::<f32>()?)
    }

    /// Save as a single-tensor safetensors file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut tensors = HashMap::new();
        tensors.insert(STYLE_TENSOR_KEY.to_string(), self.data.clone());
        candle_core::safetensors::save(&tensors, path).map_err(|e| TtsError::Io {
            message: format!("failed to save style vector: {}", e),
            path: Some(path.to_path_buf()),
        })
    }

    /// Load a style vector written by [`save`](Self::save)
    pub fn load<P: AsRef<Path>>(path: P, device: &Device) -> Result<Self> {
        let path = path.as_ref();
        let io_err = |message: String| TtsError::Io {
            message,
            path: Some(path.to_path_buf()),
        };
        let mut tensors = candle_core::safetensors::load(path, device)
            .map_err(|e| io_err(format!("failed to read style vector: {}", e)))?;
        let data = tensors
            .remove(STYLE_TENSOR_KEY)
            .ok_or_else(|| io_err(format!("no '{}' tensor in file", STYLE_TENSOR_KEY)))?;
        Self::new(data)
    }

    fn check_same_width(&self, other: &StyleVector) -> Result<()> {
        if self.dim() != other.dim() {
            return Err(TtsError::validation(
                "style",
                format!("style widths differ: {} vs {}", self.dim(), other.dim()),
            ));
        }
        Ok(())
    }
}

/// `w * a + (1 - w) * b`
fn mix(a: &Tensor, b: &Tensor, w: f64) -> Result<Tensor> {
    Ok(((a * w)? + (b * (1.0 - w))?)?)
}
