//! Preference values and `__KEY__` token substitution
//!
//! Preferences come from Cordova's `config.xml`, the TOML config file and
//! the command line. Each key `KEY` replaces the token `__KEY__` in the
//! extension's config and source files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::debug;

use crate::config::HookConfig;
use crate::{HookError, HookResult};

/// Cordova's app configuration, in the project root
pub const CONFIG_XML: &str = "config.xml";

/// Suffix appended to the app id to form the extension's bundle id
pub const BUNDLE_ID_SUFFIX: &str = ".shareextension";

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Widget {
    #[serde(rename = "@id")]
    id: Option<String>,
    #[serde(rename = "@version")]
    version: Option<String>,
    #[serde(rename = "@ios-CFBundleVersion")]
    ios_bundle_version: Option<String>,
    name: Option<String>,
    #[serde(rename = "preference")]
    preferences: Vec<Preference>,
    #[serde(rename = "platform")]
    platforms: Vec<Platform>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Platform {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "preference")]
    preferences: Vec<Preference>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Preference {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@value")]
    value: Option<String>,
}

/// Preference key -> value, ordered by key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences(BTreeMap<String, String>);

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Insert only when the key is not set yet
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `other` on top of `self`
    pub fn merge(&mut self, other: Preferences) {
        self.0.extend(other.0);
    }

    /// Parse a `KEY=VALUE` command line argument
    pub fn parse_assignment(arg: &str) -> HookResult<(String, String)> {
        match arg.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(HookError::InvalidPreference(arg.to_string())),
        }
    }

    /// The placeholder a key substitutes
    pub fn token(key: &str) -> String {
        format!("__{}__", key)
    }

    /// Replace every known token in `content`
    pub fn apply(&self, content: &str) -> String {
        let mut out = content.to_string();
        for (key, value) in self.iter() {
            let token = Self::token(key);
            if out.contains(&token) {
                out = out.replace(&token, value);
            }
        }
        out
    }

    /// Substitute tokens in a file in place
    ///
    /// Returns whether the file changed. Unchanged files are not rewritten.
    pub fn replace_in_file(&self, path: &Path) -> HookResult<bool> {
        let content = read(path)?;
        let replaced = self.apply(&content);
        if replaced == content {
            return Ok(false);
        }
        fs::write(path, replaced).map_err(|source| HookError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(file = %path.display(), "Substituted preferences");
        Ok(true)
    }

    /// Gather preferences for a project: `config.xml` (when present), then
    /// the config file, then `KEY=VALUE` assignments
    pub fn collect(project_root: &Path, config: &HookConfig, assignments: &[String]) -> HookResult<Self> {
        let config_xml = project_root.join(CONFIG_XML);
        let mut prefs = if config_xml.is_file() {
            Self::from_config_xml(&config_xml)?
        } else {
            Self::new()
        };

        prefs.merge(config.preferences());
        for arg in assignments {
            let (key, value) = Self::parse_assignment(arg)?;
            prefs.insert(key, value);
        }
        Ok(prefs)
    }

    /// Read preferences from a Cordova `config.xml`
    ///
    /// Values derived from the `widget` element come first, then
    /// `<preference>` elements at widget level, then those inside
    /// `<platform name="ios">`.
    pub fn from_config_xml(path: &Path) -> HookResult<Self> {
        let content = read(path)?;
        let widget: Widget = from_str(&content).map_err(|e| HookError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut prefs = Preferences::new();
        if let Some(id) = &widget.id {
            prefs.insert("BUNDLE_IDENTIFIER", format!("{}{}", id, BUNDLE_ID_SUFFIX));
            prefs.insert("GROUP_IDENTIFIER", format!("group.{}", id));
        }
        if let Some(version) = &widget.version {
            prefs.insert("BUNDLE_SHORT_VERSION_STRING", version.as_str());
        }
        if let Some(build) = widget.ios_bundle_version.as_ref().or(widget.version.as_ref()) {
            prefs.insert("BUNDLE_VERSION", build.as_str());
        }
        if let Some(name) = &widget.name {
            let name = name.trim();
            if !name.is_empty() {
                prefs.insert("DISPLAY_NAME", name);
            }
        }

        let ios_preferences = widget
            .platforms
            .iter()
            .filter(|p| p.name.as_deref() == Some("ios"))
            .flat_map(|p| p.preferences.iter());
        for pref in widget.preferences.iter().chain(ios_preferences) {
            if let (Some(name), Some(value)) = (&pref.name, &pref.value) {
                prefs.insert(name.as_str(), value.as_str());
            }
        }

        Ok(prefs)
    }
}

fn read(path: &Path) -> HookResult<String> {
    fs::read_to_string(path).map_err(|source| HookError::Read {
        path: path.to_path_buf(),
        source,
    })
}

impl FromIterator<(String, String)> for Preferences {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
