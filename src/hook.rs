//! Registration of the share extension target
//!
//! The hook runs as one linear pass over the project:
//!
//! 1. find and parse the Xcode project
//! 2. classify the files in `platforms/ios/ShareExtension`
//! 3. substitute preferences into config and source files
//! 4. find or create the `ShareExt` target with its sources and resources phases
//! 5. find or create the `ShareExtension` group under `CustomTemplate`
//! 6. register the files with the group and build phases
//! 7. point `CODE_SIGN_ENTITLEMENTS` at the extension's entitlements
//! 8. write the project back
//!
//! Steps 4 and 5 look before they create, so the hook can run on every build.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::discovery::{extension_dir, find_xcode_project, ios_dir, EXTENSION_DIR};
use crate::files::{classify, ExtensionFile, FileBucket, FileRole};
use crate::pbxproj::{BuildPhaseKind, Project, ProjectError, TargetKind, Value};
use crate::preferences::Preferences;
use crate::{HookError, HookResult};

/// Name of the extension target
pub const TARGET_NAME: &str = "ShareExt";

/// Name of the group holding the extension's files
pub const GROUP_NAME: &str = EXTENSION_DIR;

/// Group Cordova creates for app-specific files
pub const PARENT_GROUP_NAME: &str = "CustomTemplate";

/// Value written, quoted, to `CODE_SIGN_ENTITLEMENTS`
pub const ENTITLEMENTS_PATH: &str = "ShareExtension/ShareExtension.entitlements";

/// Everything the hook needs from the build that invokes it
#[derive(Debug, Clone)]
pub struct HookContext {
    /// Cordova project root, the directory holding `platforms/`
    pub project_root: PathBuf,
    /// An already parsed project to edit instead of reading it from disk
    pub project: Option<Project>,
    /// Values for `__KEY__` tokens
    pub preferences: Preferences,
}

impl HookContext {
    pub fn new(project_root: impl Into<PathBuf>, preferences: Preferences) -> Self {
        Self {
            project_root: project_root.into(),
            project: None,
            preferences,
        }
    }

    pub fn with_project(mut self, project: Project) -> Self {
        self.project = Some(project);
        self
    }
}

/// A target or group the hook looked up or created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectReport {
    pub name: String,
    pub id: String,
    pub created: bool,
}

/// What happened to one extension file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub name: String,
    pub role: FileRole,
    /// False when the project already referenced the file
    pub registered: bool,
}

/// Summary of a hook run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookReport {
    pub project_path: PathBuf,
    pub target: ObjectReport,
    pub group: ObjectReport,
    pub files: Vec<FileOutcome>,
    /// Config and source files whose tokens were substituted
    pub files_substituted: usize,
    /// Build configurations that received the entitlements setting
    pub configurations_patched: usize,
}

impl HookReport {
    pub fn registered(&self, role: FileRole) -> usize {
        self.files
            .iter()
            .filter(|f| f.role == role && f.registered)
            .count()
    }
}

/// Run the whole hook against the project under `context.project_root`
pub fn run(context: HookContext) -> HookResult<HookReport> {
    let HookContext {
        project_root,
        project,
        mut preferences,
    } = context;

    info!("Adding {} target to Xcode project", TARGET_NAME);

    let xcode = find_xcode_project(ios_dir(&project_root))?;
    preferences.set_default("DISPLAY_NAME", xcode.name.as_str());
    let pbxproj_path = xcode.pbxproj_path();

    info!("Parsing existing project at location: {}", pbxproj_path.display());
    let mut project = match project {
        Some(project) if project.is_named() => project,
        Some(project) => project.with_name(xcode.name.as_str()),
        None => Project::open(&pbxproj_path)?,
    };

    let files = classify(extension_dir(&project_root))?;
    debug!(
        source = files.source.len(),
        config = files.config.len(),
        resource = files.resource.len(),
        "Classified extension files"
    );
    let files_substituted = substitute_preferences(&files, &preferences)?;

    let target = ensure_target(&mut project, preferences.get("BUNDLE_IDENTIFIER"))?;
    let group = ensure_group(&mut project)?;
    let outcomes = attach_files(&mut project, &files, &target.id, &group.id)?;
    let configurations_patched = patch_entitlements(&mut project);

    project.save(&pbxproj_path)?;
    info!("Successfully added {} target to Xcode project", TARGET_NAME);

    Ok(HookReport {
        project_path: pbxproj_path,
        target,
        group,
        files: outcomes,
        files_substituted,
        configurations_patched,
    })
}

/// Rewrite preference tokens in every config and source file
pub fn substitute_preferences(files: &FileBucket, preferences: &Preferences) -> HookResult<usize> {
    let mut changed = 0;
    for file in files.templated() {
        if preferences.replace_in_file(&file.path)? {
            changed += 1;
        }
    }
    Ok(changed)
}

/// Find the extension target, or create it with empty sources and
/// resources phases
pub fn ensure_target(project: &mut Project, bundle_id: Option<&str>) -> Result<ObjectReport, ProjectError> {
    if let Some(id) = project.target_by_name(TARGET_NAME) {
        info!("{} target already exists", TARGET_NAME);
        return Ok(ObjectReport {
            name: TARGET_NAME.to_string(),
            id,
            created: false,
        });
    }

    let id = project.add_target(TARGET_NAME, TargetKind::AppExtension, EXTENSION_DIR, bundle_id)?;
    // The extension builds as its own product, so it needs its own phases
    project.add_build_phase(&id, BuildPhaseKind::Sources)?;
    project.add_build_phase(&id, BuildPhaseKind::Resources)?;
    debug!(target = %id, "Created {} target", TARGET_NAME);

    Ok(ObjectReport {
        name: TARGET_NAME.to_string(),
        id,
        created: true,
    })
}

/// Find the extension group, or create it inside `CustomTemplate`
pub fn ensure_group(project: &mut Project) -> HookResult<ObjectReport> {
    if let Some(id) = project.group_by_name(GROUP_NAME) {
        info!("{} group already exists", GROUP_NAME);
        return Ok(ObjectReport {
            name: GROUP_NAME.to_string(),
            id,
            created: false,
        });
    }

    let parent = project
        .group_by_name(PARENT_GROUP_NAME)
        .ok_or_else(|| HookError::MissingGroup {
            name: PARENT_GROUP_NAME.to_string(),
        })?;
    let id = project.create_group(GROUP_NAME, EXTENSION_DIR);
    project.add_to_group(&id, &parent)?;
    debug!(group = %id, "Created {} group", GROUP_NAME);

    Ok(ObjectReport {
        name: GROUP_NAME.to_string(),
        id,
        created: true,
    })
}

/// Register every file with the group, and sources and resources with the
/// matching build phase of the target
///
/// There is no check here for files registered by an earlier run; the
/// project skips a path it already references.
pub fn attach_files(
    project: &mut Project,
    files: &FileBucket,
    target: &str,
    group: &str,
) -> HookResult<Vec<FileOutcome>> {
    let mut outcomes = Vec::with_capacity(files.len());

    for file in &files.config {
        let registered = project.add_file(&file.name, group)?.is_some();
        outcomes.push(outcome(file, registered));
    }
    for file in &files.source {
        let registered = project.add_source_file(&file.name, target, group)?.is_some();
        outcomes.push(outcome(file, registered));
    }
    for file in &files.resource {
        let registered = project.add_resource_file(&file.name, target, group)?.is_some();
        outcomes.push(outcome(file, registered));
    }

    Ok(outcomes)
}

fn outcome(file: &ExtensionFile, registered: bool) -> FileOutcome {
    if registered {
        debug!(file = %file.name, role = %file.role(), "Registered file");
    } else {
        debug!(file = %file.name, "File already in project");
    }
    FileOutcome {
        name: file.name.clone(),
        role: file.role(),
        registered,
    }
}

/// Set the entitlements path on every configuration building the extension
pub fn patch_entitlements(project: &mut Project) -> usize {
    let mut patched = 0;
    for mut config in project.build_configurations_mut() {
        match config.product_name() {
            Some(product) if product.contains(TARGET_NAME) => {}
            _ => continue,
        }
        if config.set("CODE_SIGN_ENTITLEMENTS", Value::Quoted(ENTITLEMENTS_PATH.to_string())) {
            debug!(configuration = config.id, name = ?config.name, "Set entitlements");
            patched += 1;
        }
    }
    patched
}
