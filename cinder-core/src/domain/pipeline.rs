//! Pipeline domain types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pipeline definition
///
/// An ordered sequence of stages belonging to a project. Stage order is
/// significant and preserved; stages are never executed out of order or
/// in parallel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub name: String,
    pub stages: Vec<Stage>,
    /// Environment variables injected into every stage process
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
}

impl PipelineDefinition {
    pub fn new(name: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self {
            name: name.into(),
            stages,
            env_vars: HashMap::new(),
        }
    }
}

/// One shell command executed as a unit within a pipeline run
///
/// Atomic from the engine's perspective; no sub-structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub command: String,
}

impl Stage {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}
