use crate::arg::{ArgDef, DataType};
use crate::output::OutputMode;
use crate::scope::Resolver;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FlowrefConfig {
    /// Default graph snapshot, relative to the working directory
    pub graph: Option<String>,
    pub format: Option<OutputMode>,
    /// Extra ignore patterns when scanning a directory of snapshots
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system_variables: Vec<SystemVariable>,
}

/// A system variable every Start node exposes in addition to the built-in ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemVariable {
    pub name: String,
    #[serde(default = "default_system_type")]
    pub data_type: DataType,
    #[serde(default)]
    pub description: String,
}

fn default_system_type() -> DataType {
    DataType::string()
}

impl SystemVariable {
    pub fn to_arg(&self) -> ArgDef {
        ArgDef::system(&self.name, self.data_type.clone(), &self.description)
    }
}

impl FlowrefConfig {
    pub fn resolver(&self) -> Resolver {
        Resolver::builder()
            .system_variables(self.system_variables.iter().map(SystemVariable::to_arg))
            .build()
    }

    pub fn graph_path(&self) -> Option<PathBuf> {
        self.graph.as_ref().map(PathBuf::from)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("flowref.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<FlowrefConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: FlowrefConfig = toml::from_str(&contents)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &FlowrefConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
