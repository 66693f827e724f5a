//! File references and build files

use std::path::Path;

use super::target::BuildPhaseKind;
use super::value::{name_matches, Dict};
use super::{Project, ProjectError};

/// `lastKnownFileType` by file extension
const FILE_TYPES: &[(&str, &str)] = &[
    ("a", "archive.ar"),
    ("appex", "wrapper.app-extension"),
    ("bundle", "wrapper.plug-in"),
    ("c", "sourcecode.c.c"),
    ("entitlements", "text.plist.entitlements"),
    ("framework", "wrapper.framework"),
    ("h", "sourcecode.c.h"),
    ("jpg", "image.jpeg"),
    ("json", "text.json"),
    ("m", "sourcecode.c.objc"),
    ("mm", "sourcecode.cpp.objcpp"),
    ("plist", "text.plist.xml"),
    ("png", "image.png"),
    ("storyboard", "file.storyboard"),
    ("strings", "text.plist.strings"),
    ("swift", "sourcecode.swift"),
    ("xcassets", "folder.assetcatalog"),
    ("xib", "file.xib"),
];

/// The `lastKnownFileType` Xcode would record for a path
pub fn file_type_for(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    FILE_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, file_type)| *file_type)
        .unwrap_or("file")
}

/// Text files get an explicit UTF-8 encoding
fn is_text(file_type: &str) -> bool {
    file_type.starts_with("sourcecode") || file_type.starts_with("text")
}

/// Objects created when a file is registered with a build phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAdded {
    pub file_ref: String,
    pub build_file: String,
}

impl Project {
    /// Find a file reference by its `path`
    pub fn file_by_path(&self, path: &str) -> Option<String> {
        self.objects_of_isa("PBXFileReference")
            .find(|(_, file)| file.get_str("path").is_some_and(|p| name_matches(p, path)))
            .map(|(id, _)| id.to_string())
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.file_by_path(path).is_some()
    }

    /// Add a file reference for `path` to `group`
    ///
    /// Returns `Ok(None)` without touching the project when a reference
    /// with the same path is already registered.
    pub fn add_file(&mut self, path: &str, group: &str) -> Result<Option<String>, ProjectError> {
        self.object_of_isa_mut(group, "PBXGroup")?;
        if self.has_file(path) {
            return Ok(None);
        }

        let file_type = file_type_for(path);
        let mut file = Dict::new().with("isa", "PBXFileReference");
        if is_text(file_type) {
            file.insert("fileEncoding", "4");
        }
        file.insert("lastKnownFileType", file_type);
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string());
        if name != path {
            file.insert("name", name);
        }
        file.insert("path", path);
        file.insert("sourceTree", "<group>");

        let id = self.add_object(file);
        self.push_to_array(group, "children", &id)?;
        Ok(Some(id))
    }

    /// Add a file to `group` and to the target's sources phase
    pub fn add_source_file(
        &mut self,
        path: &str,
        target: &str,
        group: &str,
    ) -> Result<Option<FileAdded>, ProjectError> {
        self.add_file_to_phase(path, target, group, BuildPhaseKind::Sources)
    }

    /// Add a file to `group` and to the target's resources phase
    pub fn add_resource_file(
        &mut self,
        path: &str,
        target: &str,
        group: &str,
    ) -> Result<Option<FileAdded>, ProjectError> {
        self.add_file_to_phase(path, target, group, BuildPhaseKind::Resources)
    }

    fn add_file_to_phase(
        &mut self,
        path: &str,
        target: &str,
        group: &str,
        kind: BuildPhaseKind,
    ) -> Result<Option<FileAdded>, ProjectError> {
        let phase = self
            .build_phase(target, kind)
            .ok_or_else(|| ProjectError::MissingBuildPhase {
                target: target.to_string(),
                phase: kind.name(),
            })?;

        let Some(file_ref) = self.add_file(path, group)? else {
            return Ok(None);
        };

        let build_file = self.add_object(
            Dict::new()
                .with("isa", "PBXBuildFile")
                .with("fileRef", file_ref.clone()),
        );
        self.push_to_array(&phase, "files", &build_file)?;

        Ok(Some(FileAdded {
            file_ref,
            build_file,
        }))
    }
}
