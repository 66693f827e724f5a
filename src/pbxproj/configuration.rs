//! Typed access to `XCBuildConfiguration` objects

use super::value::{Dict, Value};

/// A build configuration with its optional parts made explicit
#[derive(Debug)]
pub struct BuildConfiguration<'a> {
    pub id: &'a str,
    pub name: Option<String>,
    pub build_settings: Option<&'a mut Dict>,
}

impl BuildConfiguration<'_> {
    pub fn product_name(&self) -> Option<&str> {
        self.build_settings.as_deref()?.get_str("PRODUCT_NAME")
    }

    /// Set a build setting, returning false when the configuration has no
    /// `buildSettings` dictionary to write into
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> bool {
        match self.build_settings.as_deref_mut() {
            Some(settings) => {
                settings.insert(key, value);
                true
            }
            None => false,
        }
    }
}
