//! Optional TOML configuration (`share-ext.toml`)

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::preferences::Preferences;
use crate::{HookError, HookResult};

/// File name looked up in the project root when no `--config` is given
pub const CONFIG_FILE_NAME: &str = "share-ext.toml";

/// Contents of `share-ext.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HookConfig {
    /// Values substituted for `__KEY__` tokens
    pub preferences: BTreeMap<String, String>,
}

impl HookConfig {
    /// Load a config file that must exist
    pub fn load(path: &Path) -> HookResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| HookError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| HookError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load `share-ext.toml` from the project root, or defaults if absent
    pub fn discover(project_root: &Path) -> HookResult<Self> {
        let path = project_root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
