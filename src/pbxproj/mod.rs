//! Reading, editing and writing Xcode `project.pbxproj` files
//!
//! A [`Project`] is the parsed object graph: a top-level dictionary whose
//! `objects` table maps 24-digit hex ids to object dictionaries tagged by
//! `isa`. Queries return object ids; mutations create objects and wire
//! them together the way Xcode expects.

mod configuration;
mod file_ref;
mod parse;
mod target;
mod value;
mod write;

pub use configuration::BuildConfiguration;
pub use file_ref::{file_type_for, FileAdded};
pub use parse::{parse, SyntaxError};
pub use target::{BuildPhaseKind, TargetKind};
pub use value::{name_matches, Dict, Value};
pub use write::{quote, serialize};

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::{HookError, HookResult};

/// Errors from editing the object graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectError {
    #[error("object {id} not found in project")]
    MissingObject { id: String },

    #[error("object {id} is a {found}, expected {expected}")]
    WrongIsa {
        id: String,
        expected: &'static str,
        found: String,
    },

    #[error("target {target} has no {phase} build phase")]
    MissingBuildPhase { target: String, phase: &'static str },
}

/// Name used in comments until the project is named
const DEFAULT_NAME: &str = "Project";

/// A parsed Xcode project file
#[derive(Debug, Clone)]
pub struct Project {
    root: Dict,
    name: Option<String>,
}

impl Project {
    /// Parse project file contents
    pub fn parse(input: &str) -> Result<Self, SyntaxError> {
        let mut root = parse(input)?;
        if root.get_dict("objects").is_none() {
            root.insert("objects", Dict::new());
        }
        Ok(Self { root, name: None })
    }

    /// Read and parse a `project.pbxproj` file
    pub fn open(path: &Path) -> HookResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| HookError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let project = Self::parse(&content).map_err(|e| HookError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        // `Foo.xcodeproj/project.pbxproj` -> "Foo"
        let name = path
            .parent()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().to_string());
        Ok(match name {
            Some(name) => project.with_name(name),
            None => project,
        })
    }

    /// Serialize and overwrite `path`
    pub fn save(&self, path: &Path) -> HookResult<()> {
        fs::write(path, self.to_pbxproj_string()).map_err(|source| HookError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Set the project name used in the project's configuration list comment
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    /// Whether a name was given by `open` or `with_name`
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    pub fn to_pbxproj_string(&self) -> String {
        serialize(&self.root, self.name())
    }

    pub fn root(&self) -> &Dict {
        &self.root
    }

    pub fn objects(&self) -> &Dict {
        static EMPTY: Dict = Dict::new();
        self.root.get_dict("objects").unwrap_or(&EMPTY)
    }

    fn objects_mut(&mut self) -> Option<&mut Dict> {
        self.root.get_dict_mut("objects")
    }

    pub fn object(&self, id: &str) -> Option<&Dict> {
        self.objects().get_dict(id)
    }

    pub fn isa(&self, id: &str) -> Option<&str> {
        self.object(id).and_then(|object| object.get_str("isa"))
    }

    /// All objects of one kind, in file order
    pub fn objects_of_isa<'a>(&'a self, isa: &'a str) -> impl Iterator<Item = (&'a str, &'a Dict)> {
        self.objects().iter().filter_map(move |(id, object)| {
            let object = object.as_dict()?;
            (object.get_str("isa") == Some(isa)).then_some((id, object))
        })
    }

    pub fn root_object_id(&self) -> Option<&str> {
        self.root.get_str("rootObject")
    }

    /// Look up an object and check its `isa`
    fn object_of_isa_mut(&mut self, id: &str, expected: &'static str) -> Result<&mut Dict, ProjectError> {
        let object = self
            .objects_mut()
            .and_then(|objects| objects.get_dict_mut(id))
            .ok_or_else(|| ProjectError::MissingObject { id: id.to_string() })?;
        let found = object.get_str("isa").unwrap_or("object without isa");
        if found != expected {
            return Err(ProjectError::WrongIsa {
                id: id.to_string(),
                expected,
                found: found.to_string(),
            });
        }
        Ok(object)
    }

    /// A fresh object id that is not used anywhere in the project
    pub fn generate_id(&self) -> String {
        loop {
            let hex = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
            let id = hex[..24].to_string();
            if !self.objects().contains_key(&id) {
                return id;
            }
        }
    }

    /// Insert a new object under a fresh id and return the id
    fn add_object(&mut self, object: Dict) -> String {
        let id = self.generate_id();
        match self.objects_mut() {
            Some(objects) => objects.insert(id.clone(), object),
            None => self.root.insert("objects", Dict::new().with(id.clone(), object)),
        }
        id
    }

    /// Append `value` to the array `key` of object `id`, creating the array if needed
    fn push_to_array(&mut self, id: &str, key: &str, value: &str) -> Result<(), ProjectError> {
        let object = self
            .objects_mut()
            .and_then(|objects| objects.get_dict_mut(id))
            .ok_or_else(|| ProjectError::MissingObject { id: id.to_string() })?;
        match object.get_array_mut(key) {
            Some(items) => items.push(Value::from(value)),
            None => object.insert(key, vec![Value::from(value)]),
        }
        Ok(())
    }

    /// Target ids listed on the project object
    pub fn targets(&self) -> Vec<&str> {
        self.root_object_id()
            .and_then(|id| self.object(id))
            .and_then(|project| project.get_array("targets"))
            .map(|targets| targets.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// The main application target: the first listed on the project
    pub fn first_target(&self) -> Option<String> {
        self.targets()
            .first()
            .map(|id| id.to_string())
            .or_else(|| {
                self.objects_of_isa("PBXNativeTarget")
                    .next()
                    .map(|(id, _)| id.to_string())
            })
    }

    /// Find a native target by name, accepting a quoted stored name
    pub fn target_by_name(&self, name: &str) -> Option<String> {
        self.objects_of_isa("PBXNativeTarget")
            .find(|(_, target)| target.get_str("name").is_some_and(|n| name_matches(n, name)))
            .map(|(id, _)| id.to_string())
    }

    /// Find a group by its `name`
    pub fn group_by_name(&self, name: &str) -> Option<String> {
        self.objects_of_isa("PBXGroup")
            .find(|(_, group)| group.get_str("name").is_some_and(|n| name_matches(n, name)))
            .map(|(id, _)| id.to_string())
    }

    /// Create an empty group whose files live under `path`
    pub fn create_group(&mut self, name: &str, path: &str) -> String {
        self.add_object(
            Dict::new()
                .with("isa", "PBXGroup")
                .with("children", Vec::<Value>::new())
                .with("name", name)
                .with("path", path)
                .with("sourceTree", "<group>"),
        )
    }

    /// Make `child` (a file reference or group) a child of group `parent`
    pub fn add_to_group(&mut self, child: &str, parent: &str) -> Result<(), ProjectError> {
        if self.object(child).is_none() {
            return Err(ProjectError::MissingObject { id: child.to_string() });
        }
        self.object_of_isa_mut(parent, "PBXGroup")?;
        self.push_to_array(parent, "children", child)
    }

    /// Ids of the direct children of a group
    pub fn group_children(&self, group: &str) -> Vec<&str> {
        self.object(group)
            .and_then(|g| g.get_array("children"))
            .map(|children| children.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Typed views over every `XCBuildConfiguration`, with mutable settings
    pub fn build_configurations_mut(&mut self) -> impl Iterator<Item = BuildConfiguration<'_>> {
        self.objects_mut()
            .into_iter()
            .flat_map(|objects| objects.iter_mut())
            .filter_map(|(id, object)| {
                let object = object.as_dict_mut()?;
                if object.get_str("isa") != Some("XCBuildConfiguration") {
                    return None;
                }
                let name = object.get_str("name").map(str::to_string);
                Some(BuildConfiguration {
                    id,
                    name,
                    build_settings: object.get_dict_mut("buildSettings"),
                })
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A trimmed Cordova iOS project: one app target, a CustomTemplate
    /// group and project/target build configurations
    pub(crate) const CORDOVA_PBXPROJ: &str = include_str!(
        "../../fixtures/cordova-app/platforms/ios/HelloCordova.xcodeproj/project.pbxproj"
    );

    pub(crate) fn cordova_project() -> Project {
        Project::parse(CORDOVA_PBXPROJ).unwrap().with_name("HelloCordova")
    }

    #[test]
    fn test_parse_fixture() {
        let project = cordova_project();
        assert_eq!(project.isa(project.root_object_id().unwrap()), Some("PBXProject"));
        assert_eq!(project.targets().len(), 1);
        assert!(project.target_by_name("HelloCordova").is_some());
        assert!(project.group_by_name("CustomTemplate").is_some());
    }

    #[test]
    fn test_first_target() {
        let project = cordova_project();
        assert_eq!(project.first_target(), project.target_by_name("HelloCordova"));
    }

    #[test]
    fn test_generate_id_format() {
        let project = cordova_project();
        let id = project.generate_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert!(project.object(&id).is_none());
    }

    #[test]
    fn test_create_group_and_attach() {
        let mut project = cordova_project();
        let parent = project.group_by_name("CustomTemplate").unwrap();

        let group = project.create_group("ShareExtension", "ShareExtension");
        project.add_to_group(&group, &parent).unwrap();

        assert_eq!(project.group_by_name("ShareExtension"), Some(group.clone()));
        assert!(project.group_children(&parent).contains(&group.as_str()));
        let created = project.object(&group).unwrap();
        assert_eq!(created.get_str("path"), Some("ShareExtension"));
        assert_eq!(created.get_str("sourceTree"), Some("<group>"));
    }

    #[test]
    fn test_add_to_missing_group_fails() {
        let mut project = cordova_project();
        let group = project.create_group("ShareExtension", "ShareExtension");
        let err = project.add_to_group(&group, "000000000000000000000000").unwrap_err();
        assert!(matches!(err, ProjectError::MissingObject { .. }));
    }

    #[test]
    fn test_add_to_non_group_fails() {
        let mut project = cordova_project();
        let group = project.create_group("ShareExtension", "ShareExtension");
        let target = project.first_target().unwrap();
        let err = project.add_to_group(&group, &target).unwrap_err();
        assert!(matches!(err, ProjectError::WrongIsa { expected: "PBXGroup", .. }));
    }

    #[test]
    fn test_build_configurations_mut() {
        let mut project = cordova_project();
        let names: Vec<String> = project
            .build_configurations_mut()
            .filter_map(|config| config.name)
            .collect();
        assert_eq!(names.iter().filter(|n| *n == "Debug").count(), 2);
        assert_eq!(names.iter().filter(|n| *n == "Release").count(), 2);

        for config in project.build_configurations_mut() {
            if let Some(settings) = config.build_settings {
                settings.insert("TOUCHED", "YES");
            }
        }
        let touched = project
            .objects_of_isa("XCBuildConfiguration")
            .filter(|(_, c)| c.get_dict("buildSettings").and_then(|s| s.get_str("TOUCHED")) == Some("YES"))
            .count();
        assert_eq!(touched, 4);
    }

    #[test]
    fn test_open_and_save() {
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let xcodeproj = dir.path().join("HelloCordova.xcodeproj");
        fs::create_dir_all(&xcodeproj).unwrap();
        let path = xcodeproj.join("project.pbxproj");
        fs::write(&path, CORDOVA_PBXPROJ).unwrap();

        let mut project = Project::open(&path).unwrap();
        assert_eq!(project.name(), "HelloCordova");
        project.create_group("Extra", "Extra");
        project.save(&path).unwrap();

        let reopened = Project::open(&path).unwrap();
        assert!(reopened.group_by_name("Extra").is_some());
        assert!(fs::read_to_string(&path)
            .unwrap()
            .contains("Build configuration list for PBXProject \"HelloCordova\""));
    }

    #[test]
    fn test_fixture_round_trips_byte_for_byte() {
        let project = Project::parse(CORDOVA_PBXPROJ).unwrap().with_name("HelloCordova");
        let out = project.to_pbxproj_string();
        for (line, (written, original)) in out.lines().zip(CORDOVA_PBXPROJ.lines()).enumerate() {
            assert_eq!(written, original, "line {} differs", line + 1);
        }
        assert_eq!(out, CORDOVA_PBXPROJ);
    }

    #[test]
    fn test_unnamed_project() {
        let project = Project::parse(CORDOVA_PBXPROJ).unwrap();
        assert!(!project.is_named());
        assert_eq!(project.name(), "Project");
        assert!(cordova_project().is_named());
    }

    #[test]
    fn test_create_group_in_empty_project() {
        let mut project = Project::parse("{ archiveVersion = 1; }").unwrap();
        let group = project.create_group("ShareExtension", "ShareExtension");
        assert!(project.object(&group).is_some());
    }

    #[test]
    fn test_open_missing_file_names_the_path() {
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.pbxproj");
        let err = Project::open(&path).unwrap_err();
        assert!(matches!(err, HookError::Read { path: ref p, .. } if *p == path));
        assert!(err.to_string().contains("project.pbxproj"));
    }

    #[test]
    fn test_open_malformed() {
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.pbxproj");
        fs::write(&path, "{\n objects = {\n").unwrap();

        let err = Project::open(&path).unwrap_err();
        assert!(matches!(err, HookError::ParseError { .. }));
    }
}
