//! Checkpoint reading and sub-model weight binding
//!
//! A checkpoint is a flat safetensors file whose keys look like
//! `net.<component>.<parameter>` (the `net.` root is optional). Models
//! trained with data parallelism carry an extra `module.` segment right
//! after the component name.
//!
//! Binding runs in two phases per component:
//! 1. Strict: the key set and every shape must match exactly.
//! 2. Otherwise the `module.` prefix is stripped and whatever matches is
//!    bound; missing parameters keep their current values and are reported.
//!
//! A shape mismatch, or a component for which nothing matches, is fatal.

use candle_core::{Device, Tensor};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::error::{Result, TtsError};
use crate::core::traits::ModelComponent;

/// Optional root segment in front of every component key
pub const CHECKPOINT_ROOT: &str = "net.";

/// Key prefix left behind by data-parallel training wrappers
pub const DISTRIBUTED_PREFIX: &str = "module.";

/// Safetensors checkpoint grouped by component
#[derive(Debug)]
pub struct Checkpoint {
    path: Option<PathBuf>,
    groups: BTreeMap<String, HashMap<String, Tensor>>,
}

impl Checkpoint {
    /// Load a safetensors checkpoint
    pub fn load<P: AsRef<Path>>(path: P, device: &Device) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading checkpoint {:?}", path);

        if !path.exists() {
            return Err(TtsError::ModelLoad {
                message: "checkpoint file not found".to_string(),
                component: "checkpoint".to_string(),
                path: Some(path.to_path_buf()),
            });
        }

        let tensors =
            candle_core::safetensors::load(path, device).map_err(|e| TtsError::ModelLoad {
                message: format!("failed to read safetensors: {}", e),
                component: "checkpoint".to_string(),
                path: Some(path.to_path_buf()),
            })?;

        let mut checkpoint = Self::from_tensors(tensors);
        checkpoint.path = Some(path.to_path_buf());
        tracing::info!(
            "Checkpoint holds {} tensors across {} components",
            checkpoint.tensor_count(),
            checkpoint.groups.len()
        );
        Ok(checkpoint)
    }

    /// Group an in-memory tensor map by component
    pub fn from_tensors(tensors: HashMap<String, Tensor>) -> Self {
        let mut groups: BTreeMap<String, HashMap<String, Tensor>> = BTreeMap::new();
        for (key, tensor) in tensors {
            let rest = key.strip_prefix(CHECKPOINT_ROOT).unwrap_or(&key);
            match rest.split_once('.') {
                Some((component, param)) if !component.is_empty() && !param.is_empty() => {
                    groups
                        .entry(component.to_string())
                        .or_default()
                        .insert(param.to_string(), tensor);
                }
                _ => tracing::warn!("Ignoring checkpoint key without a component: {}", key),
            }
        }
        Self { path: None, groups }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Component names in sorted order
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Parameters of one component, keyed relative to it
    pub fn component(&self, name: &str) -> Option<&HashMap<String, Tensor>> {
        self.groups.get(name)
    }

    pub fn tensor_count(&self) -> usize {
        self.groups.values().map(HashMap::len).sum()
    }

    /// Whether any key of the component carries the data-parallel prefix
    pub fn has_distributed_prefix(&self, name: &str) -> bool {
        self.groups
            .get(name)
            .is_some_and(|g| g.keys().any(|k| k.starts_with(DISTRIBUTED_PREFIX)))
    }

    /// Bind one component from this checkpoint
    ///
    /// A component absent from the checkpoint is a `ModelLoad` error.
    pub fn bind<C: ModelComponent + ?Sized>(
        &self,
        key: &str,
        component: &mut C,
    ) -> Result<ComponentReport> {
        let params = self.component(key).ok_or_else(|| TtsError::ModelLoad {
            message: "component missing from checkpoint".to_string(),
            component: key.to_string(),
            path: self.path.clone(),
        })?;
        bind_component(key, component, params).map_err(|e| match e {
            TtsError::ModelLoad {
                message, component, ..
            } => TtsError::ModelLoad {
                message,
                component,
                path: self.path.clone(),
            },
            other => other,
        })
    }
}

/// How a component ended up bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// Exact key set and shapes
    Strict,
    /// After prefix stripping, tolerating missing and unexpected keys
    Partial,
}

impl fmt::Display for BindMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindMode::Strict => write!(f, "strict"),
            BindMode::Partial => write!(f, "partial"),
        }
    }
}

/// Outcome of binding one component
#[derive(Debug, Clone)]
pub struct ComponentReport {
    pub component: String,
    pub mode: BindMode,
    /// Parameters assigned from the checkpoint
    pub bound: usize,
    /// Expected parameters the checkpoint did not provide
    pub missing: Vec<String>,
    /// Checkpoint parameters the component does not know
    pub unexpected: Vec<String>,
}

/// Outcome of binding a whole model bundle
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub components: Vec<ComponentReport>,
}

impl LoadReport {
    /// True when every component bound strictly
    pub fn is_strict(&self) -> bool {
        self.components.iter().all(|c| c.mode == BindMode::Strict)
    }

    pub fn component(&self, name: &str) -> Option<&ComponentReport> {
        self.components.iter().find(|c| c.component == name)
    }
}

/// Bind `params` to `component` with the strict-then-partial policy
pub fn bind_component<C: ModelComponent + ?Sized>(
    key: &str,
    component: &mut C,
    params: &HashMap<String, Tensor>,
) -> Result<ComponentReport> {
    let specs = component.parameter_specs();

    let strict_ok = specs.len() == params.len()
        && specs.iter().all(|spec| {
            params
                .get(&spec.name)
                .is_some_and(|t| t.dims() == spec.shape.as_slice())
        });
    if strict_ok {
        component.bind_parameters(params)?;
        return Ok(ComponentReport {
            component: key.to_string(),
            mode: BindMode::Strict,
            bound: specs.len(),
            missing: Vec::new(),
            unexpected: Vec::new(),
        });
    }

    tracing::debug!(
        "{}: strict bind failed ({} expected, {} provided), retrying without '{}'",
        key,
        specs.len(),
        params.len(),
        DISTRIBUTED_PREFIX
    );

    let stripped: HashMap<&str, &Tensor> = params
        .iter()
        .map(|(k, t)| (k.strip_prefix(DISTRIBUTED_PREFIX).unwrap_or(k), t))
        .collect();

    let mut selected = HashMap::new();
    let mut missing = Vec::new();
    for spec in &specs {
        match stripped.get(spec.name.as_str()) {
            Some(tensor) if tensor.dims() == spec.shape.as_slice() => {
                selected.insert(spec.name.clone(), (*tensor).clone());
            }
            Some(tensor) => {
                return Err(TtsError::ModelLoad {
                    message: format!(
                        "shape mismatch for '{}': checkpoint {:?}, expected {:?}",
                        spec.name,
                        tensor.dims(),
                        spec.shape
                    ),
                    component: key.to_string(),
                    path: None,
                });
            }
            None => missing.push(spec.name.clone()),
        }
    }

    if selected.is_empty() && !specs.is_empty() {
        return Err(TtsError::ModelLoad {
            message: format!(
                "none of {} expected parameters found among {} checkpoint keys",
                specs.len(),
                params.len()
            ),
            component: key.to_string(),
            path: None,
        });
    }

    let mut unexpected: Vec<String> = stripped
        .keys()
        .filter(|k| !specs.iter().any(|s| s.name == **k))
        .map(|k| k.to_string())
        .collect();
    unexpected.sort();
    missing.sort();

    if !missing.is_empty() {
        tracing::warn!(
            "{}: {} parameter(s) missing from checkpoint, keeping current values (first: {})",
            key,
            missing.len(),
            missing[0]
        );
    }
    if !unexpected.is_empty() {
        tracing::warn!(
            "{}: ignoring {} unexpected checkpoint parameter(s)",
            key,
            unexpected.len()
        );
    }

    component.bind_parameters(&selected)?;
    Ok(ComponentReport {
        component: key.to_string(),
        mode: BindMode::Partial,
        bound: selected.len(),
        missing,
        unexpected,
    })
}
