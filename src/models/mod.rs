//! Model collaborators and weight binding
//!
//! - `bundle`: the set of sub-models one synthesizer owns
//! - `weights`: safetensors checkpoints and strict/partial binding
//! - `projection`: the in-crate embedder projection
//! - `diffusion`: schedule, sampler and preconditioning for style diffusion

pub mod bundle;
pub mod diffusion;
pub mod projection;
pub mod weights;

pub use bundle::ModelBundle;
pub use projection::LinearProjection;
pub use weights::{BindMode, Checkpoint, ComponentReport, LoadReport};
