pub mod model;

use crate::group::GroupDef;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use model::{AppConfig, LoggingConfig, ServerConfig};

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crabmux")
}

fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

fn groups_path() -> PathBuf {
    config_dir().join("groups.toml")
}

pub fn load_config() -> Result<AppConfig> {
    let path = config_path();
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// On-disk shape of `groups.toml`: an ordered `[[group]]` array.
#[derive(Debug, Default, Serialize, Deserialize)]
struct GroupsFile {
    #[serde(default)]
    group: Vec<GroupDef>,
}

fn parse_groups(contents: &str) -> Result<Vec<GroupDef>> {
    let file: GroupsFile = toml::from_str(contents)?;
    Ok(file.group)
}

fn render_groups(defs: &[GroupDef]) -> Result<String> {
    let file = GroupsFile {
        group: defs.to_vec(),
    };
    Ok(toml::to_string_pretty(&file)?)
}

pub fn load_groups() -> Result<Vec<GroupDef>> {
    load_groups_from(&groups_path())
}

fn load_groups_from(path: &Path) -> Result<Vec<GroupDef>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read groups from {}", path.display()))?;
    parse_groups(&contents).with_context(|| format!("Failed to parse groups file {}", path.display()))
}

pub fn save_groups(defs: &[GroupDef]) -> Result<()> {
    let path = groups_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }
    let contents = render_groups(defs).with_context(|| "Failed to serialize groups")?;
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write groups to {}", path.display()))?;
    Ok(())
}
