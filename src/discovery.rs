//! Locating the Cordova-generated Xcode project

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::{HookError, HookResult};

/// Name of the share extension's source folder under `platforms/ios`
pub const EXTENSION_DIR: &str = "ShareExtension";

/// An `.xcodeproj` bundle found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XcodeProject {
    /// The `.xcodeproj` directory
    pub folder: PathBuf,
    /// Project name, the folder name without `.xcodeproj`
    pub name: String,
}

impl XcodeProject {
    /// Path of the `project.pbxproj` inside the bundle
    pub fn pbxproj_path(&self) -> PathBuf {
        self.folder.join("project.pbxproj")
    }
}

/// `<project_root>/platforms/ios`
pub fn ios_dir(project_root: &Path) -> PathBuf {
    project_root.join("platforms").join("ios")
}

/// `<project_root>/platforms/ios/ShareExtension`
pub fn extension_dir(project_root: &Path) -> PathBuf {
    ios_dir(project_root).join(EXTENSION_DIR)
}

/// Find the first `*.xcodeproj` directly inside `dir`, by name
pub fn find_xcode_project(dir: impl AsRef<Path>) -> HookResult<XcodeProject> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(HookError::ProjectNotFound {
            dir: dir.to_path_buf(),
        });
    }

    let mut builder = WalkBuilder::new(dir);
    builder.max_depth(Some(1));
    builder.follow_links(false);
    // platforms/ is usually gitignored, so walk it unfiltered
    builder.standard_filters(false);
    builder.hidden(true);
    builder.sort_by_file_name(|a, b| a.cmp(b));

    for result in builder.build() {
        let entry = result?;
        if entry.depth() == 0 {
            continue;
        }

        let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
        let path = entry.path();
        if !is_dir || path.extension().and_then(|e| e.to_str()) != Some("xcodeproj") {
            continue;
        }

        if let Some(stem) = path.file_stem() {
            return Ok(XcodeProject {
                folder: path.to_path_buf(),
                name: stem.to_string_lossy().to_string(),
            });
        }
    }

    Err(HookError::ProjectNotFound {
        dir: dir.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_xcode_project() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("HelloCordova.xcodeproj")).unwrap();
        fs::create_dir_all(dir.path().join("HelloCordova")).unwrap();
        fs::create_dir_all(dir.path().join("CordovaLib")).unwrap();

        let project = find_xcode_project(dir.path()).unwrap();
        assert_eq!(project.name, "HelloCordova");
        assert_eq!(
            project.pbxproj_path(),
            dir.path().join("HelloCordova.xcodeproj").join("project.pbxproj")
        );
    }

    #[test]
    fn test_first_project_by_name_wins() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Zeta.xcodeproj")).unwrap();
        fs::create_dir_all(dir.path().join("Alpha.xcodeproj")).unwrap();

        let project = find_xcode_project(dir.path()).unwrap();
        assert_eq!(project.name, "Alpha");
    }

    #[test]
    fn test_nested_and_file_matches_are_ignored() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("CordovaLib").join("CordovaLib.xcodeproj")).unwrap();
        fs::write(dir.path().join("notes.xcodeproj"), "").unwrap();

        let err = find_xcode_project(dir.path()).unwrap_err();
        assert!(matches!(err, HookError::ProjectNotFound { .. }));
    }

    #[test]
    fn test_gitignored_project_is_found() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.xcodeproj\n").unwrap();
        fs::create_dir_all(dir.path().join("App.xcodeproj")).unwrap();

        assert_eq!(find_xcode_project(dir.path()).unwrap().name, "App");
    }

    #[test]
    fn test_missing_ios_platform() {
        let dir = TempDir::new().unwrap();
        let err = find_xcode_project(ios_dir(dir.path())).unwrap_err();
        assert!(matches!(err, HookError::ProjectNotFound { .. }));
    }

    #[test]
    fn test_extension_dir() {
        assert_eq!(
            extension_dir(Path::new("/app")),
            Path::new("/app/platforms/ios/ShareExtension")
        );
    }
}
