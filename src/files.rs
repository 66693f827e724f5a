//! Classifier for the files making up the share extension

use std::fs;
use std::path::{Path, PathBuf};

use crate::{HookError, HookResult};

/// What a file contributes to the extension target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    /// Compiled into the target (sources build phase)
    Source,
    /// Referenced by build settings only, never part of a build phase
    Config,
    /// Copied into the bundle (resources build phase)
    Resource,
}

impl FileRole {
    /// Role for a file extension including its leading dot
    pub fn for_extension(extension: &str) -> FileRole {
        match extension {
            ".h" | ".m" => FileRole::Source,
            ".plist" | ".entitlements" => FileRole::Config,
            _ => FileRole::Resource,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FileRole::Source => "source",
            FileRole::Config => "config",
            FileRole::Resource => "resource",
        }
    }
}

impl std::fmt::Display for FileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A file found in the extension directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFile {
    /// File name, e.g. "ShareViewController.m"
    pub name: String,
    /// Full path on disk
    pub path: PathBuf,
    /// Extension with its leading dot (e.g. ".m"), empty when there is none
    pub extension: String,
}

impl ExtensionFile {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Self {
            name,
            path,
            extension,
        }
    }

    pub fn role(&self) -> FileRole {
        FileRole::for_extension(&self.extension)
    }
}

/// Extension files bucketed by role, each bucket ordered by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBucket {
    pub source: Vec<ExtensionFile>,
    pub config: Vec<ExtensionFile>,
    pub resource: Vec<ExtensionFile>,
}

impl FileBucket {
    pub fn push(&mut self, file: ExtensionFile) {
        match file.role() {
            FileRole::Source => self.source.push(file),
            FileRole::Config => self.config.push(file),
            FileRole::Resource => self.resource.push(file),
        }
    }

    pub fn get(&self, role: FileRole) -> &[ExtensionFile] {
        match role {
            FileRole::Source => &self.source,
            FileRole::Config => &self.config,
            FileRole::Resource => &self.resource,
        }
    }

    /// Files that may contain preference tokens: config files, then sources
    pub fn templated(&self) -> impl Iterator<Item = &ExtensionFile> {
        self.config.iter().chain(self.source.iter())
    }

    pub fn len(&self) -> usize {
        self.source.len() + self.config.len() + self.resource.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// List `dir` and bucket its entries by role
///
/// Entries whose name starts with a dot (`.DS_Store` and friends) are
/// skipped. Subdirectories such as asset catalogs are listed like files.
pub fn classify(dir: impl AsRef<Path>) -> HookResult<FileBucket> {
    let dir = dir.as_ref();
    let read_err = |source| HookError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        paths.push(entry.path());
    }
    paths.sort();

    let mut bucket = FileBucket::default();
    for path in paths {
        bucket.push(ExtensionFile::new(path));
    }
    Ok(bucket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "").unwrap();
    }

    fn names(files: &[ExtensionFile]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_role_table() {
        assert_eq!(FileRole::for_extension(".h"), FileRole::Source);
        assert_eq!(FileRole::for_extension(".m"), FileRole::Source);
        assert_eq!(FileRole::for_extension(".plist"), FileRole::Config);
        assert_eq!(FileRole::for_extension(".entitlements"), FileRole::Config);
        assert_eq!(FileRole::for_extension(".storyboard"), FileRole::Resource);
        assert_eq!(FileRole::for_extension(".swift"), FileRole::Resource);
        assert_eq!(FileRole::for_extension(""), FileRole::Resource);
    }

    #[test]
    fn test_classify_share_extension() {
        let dir = TempDir::new().unwrap();
        for name in [
            "ShareViewController.h",
            "ShareViewController.m",
            "Info.plist",
            "ShareExtension.entitlements",
            "MainInterface.storyboard",
        ] {
            touch(dir.path(), name);
        }

        let bucket = classify(dir.path()).unwrap();

        assert_eq!(
            names(&bucket.source),
            vec!["ShareViewController.h", "ShareViewController.m"]
        );
        assert_eq!(
            names(&bucket.config),
            vec!["Info.plist", "ShareExtension.entitlements"]
        );
        assert_eq!(names(&bucket.resource), vec!["MainInterface.storyboard"]);
        assert_eq!(bucket.len(), 5);

        let m = &bucket.source[1];
        assert_eq!(m.extension, ".m");
        assert_eq!(m.path, dir.path().join("ShareViewController.m"));
    }

    #[test]
    fn test_hidden_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".DS_Store");
        touch(dir.path(), ".hidden.m");
        touch(dir.path(), ".secret.plist");
        touch(dir.path(), "Visible.m");

        let bucket = classify(dir.path()).unwrap();
        assert_eq!(names(&bucket.source), vec!["Visible.m"]);
        assert!(bucket.config.is_empty());
        assert!(bucket.resource.is_empty());
    }

    #[test]
    fn test_directories_and_unknown_extensions_are_resources() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("Assets.xcassets")).unwrap();
        touch(dir.path(), "LICENSE");
        touch(dir.path(), "Localizable.strings");

        let bucket = classify(dir.path()).unwrap();
        assert_eq!(
            names(&bucket.resource),
            vec!["Assets.xcassets", "LICENSE", "Localizable.strings"]
        );
    }

    #[test]
    fn test_templated_files_exclude_resources() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "A.m");
        touch(dir.path(), "Info.plist");
        touch(dir.path(), "MainInterface.storyboard");

        let bucket = classify(dir.path()).unwrap();
        let templated: Vec<&str> = bucket.templated().map(|f| f.name.as_str()).collect();
        assert_eq!(templated, vec!["Info.plist", "A.m"]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = classify(dir.path().join("ShareExtension")).unwrap_err();
        assert!(matches!(err, HookError::ReadDir { .. }));
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let bucket = classify(dir.path()).unwrap();
        assert!(bucket.is_empty());
    }
}
