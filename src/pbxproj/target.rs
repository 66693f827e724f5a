//! Native targets and their build phases

use super::value::{Dict, Value};
use super::{Project, ProjectError};

/// `buildActionMask` Xcode puts on every build phase
const BUILD_ACTION_MASK: &str = "2147483647";

/// `dstSubfolderSpec` of the PlugIns folder, where app extensions are embedded
const PLUGINS_SUBFOLDER_SPEC: &str = "13";

const LD_RUNPATH_SEARCH_PATHS: &str =
    "$(inherited) @executable_path/Frameworks @executable_path/../../Frameworks";

/// The kind of product a new target builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Application,
    AppExtension,
}

impl TargetKind {
    pub fn product_type(&self) -> &'static str {
        match self {
            TargetKind::Application => "com.apple.product-type.application",
            TargetKind::AppExtension => "com.apple.product-type.app-extension",
        }
    }

    fn product_file_type(&self) -> &'static str {
        match self {
            TargetKind::Application => "wrapper.application",
            TargetKind::AppExtension => "wrapper.app-extension",
        }
    }

    fn product_extension(&self) -> &'static str {
        match self {
            TargetKind::Application => "app",
            TargetKind::AppExtension => "appex",
        }
    }
}

/// Build phases a target can be given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhaseKind {
    Sources,
    Resources,
    Frameworks,
}

impl BuildPhaseKind {
    pub fn isa(&self) -> &'static str {
        match self {
            BuildPhaseKind::Sources => "PBXSourcesBuildPhase",
            BuildPhaseKind::Resources => "PBXResourcesBuildPhase",
            BuildPhaseKind::Frameworks => "PBXFrameworksBuildPhase",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BuildPhaseKind::Sources => "Sources",
            BuildPhaseKind::Resources => "Resources",
            BuildPhaseKind::Frameworks => "Frameworks",
        }
    }
}

impl Project {
    /// Add a native target building `name`, with Debug and Release
    /// configurations reading their Info.plist from `subfolder`
    ///
    /// The new target starts without build phases. When the project already
    /// has a main target, that target gets a dependency on the new one, and
    /// app extensions are embedded into it.
    pub fn add_target(
        &mut self,
        name: &str,
        kind: TargetKind,
        subfolder: &str,
        bundle_id: Option<&str>,
    ) -> Result<String, ProjectError> {
        let name = name.trim();
        let host = self.first_target();
        let project_id = self
            .root_object_id()
            .map(str::to_string)
            .ok_or_else(|| ProjectError::MissingObject {
                id: "rootObject".to_string(),
            })?;
        self.object_of_isa_mut(&project_id, "PBXProject")?;

        let configurations: Vec<Value> = ["Debug", "Release"]
            .into_iter()
            .map(|config_name| {
                let settings = target_build_settings(config_name, name, subfolder, bundle_id);
                let id = self.add_object(
                    Dict::new()
                        .with("isa", "XCBuildConfiguration")
                        .with("buildSettings", settings)
                        .with("name", config_name),
                );
                Value::from(id)
            })
            .collect();

        let configuration_list = self.add_object(
            Dict::new()
                .with("isa", "XCConfigurationList")
                .with("buildConfigurations", configurations)
                .with("defaultConfigurationIsVisible", "0")
                .with("defaultConfigurationName", "Release"),
        );

        let product = self.add_object(
            Dict::new()
                .with("isa", "PBXFileReference")
                .with("explicitFileType", kind.product_file_type())
                .with("includeInIndex", "0")
                .with("path", format!("{}.{}", name, kind.product_extension()))
                .with("sourceTree", "BUILT_PRODUCTS_DIR"),
        );

        let target = self.add_object(
            Dict::new()
                .with("isa", "PBXNativeTarget")
                .with("buildConfigurationList", configuration_list)
                .with("buildPhases", Vec::<Value>::new())
                .with("buildRules", Vec::<Value>::new())
                .with("dependencies", Vec::<Value>::new())
                .with("name", name)
                .with("productName", name)
                .with("productReference", product.clone())
                .with("productType", kind.product_type()),
        );

        self.push_to_array(&project_id, "targets", &target)?;

        if let Some(host) = host {
            if kind == TargetKind::AppExtension {
                self.embed_app_extension(&host, &product)?;
            }
            self.add_target_dependency(&host, &target, name, &project_id)?;
        }

        if let Some(products) = self.group_by_name("Products") {
            self.add_to_group(&product, &products)?;
        }

        Ok(target)
    }

    /// Add an empty build phase to a target
    pub fn add_build_phase(&mut self, target: &str, kind: BuildPhaseKind) -> Result<String, ProjectError> {
        self.object_of_isa_mut(target, "PBXNativeTarget")?;
        let phase = self.add_object(
            Dict::new()
                .with("isa", kind.isa())
                .with("buildActionMask", BUILD_ACTION_MASK)
                .with("files", Vec::<Value>::new())
                .with("runOnlyForDeploymentPostprocessing", "0"),
        );
        self.push_to_array(target, "buildPhases", &phase)?;
        Ok(phase)
    }

    /// Ids of a target's build phases, in build order
    pub fn build_phases(&self, target: &str) -> Vec<&str> {
        self.object(target)
            .and_then(|t| t.get_array("buildPhases"))
            .map(|phases| phases.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// The first build phase of the given kind on a target
    pub fn build_phase(&self, target: &str, kind: BuildPhaseKind) -> Option<String> {
        self.build_phases(target)
            .into_iter()
            .find(|phase| self.isa(phase) == Some(kind.isa()))
            .map(str::to_string)
    }

    /// Ids of the build files listed in a build phase
    pub fn build_phase_files(&self, phase: &str) -> Vec<&str> {
        self.object(phase)
            .and_then(|p| p.get_array("files"))
            .map(|files| files.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Copy an extension product into the host app's PlugIns folder
    fn embed_app_extension(&mut self, host: &str, product: &str) -> Result<(), ProjectError> {
        let build_file = self.add_object(
            Dict::new()
                .with("isa", "PBXBuildFile")
                .with("fileRef", product)
                .with(
                    "settings",
                    Dict::new().with("ATTRIBUTES", vec![Value::from("RemoveHeadersOnCopy")]),
                ),
        );

        let existing = self.build_phases(host).into_iter().find(|phase| {
            self.object(phase).is_some_and(|p| {
                p.get_str("isa") == Some("PBXCopyFilesBuildPhase")
                    && p.get_str("dstSubfolderSpec") == Some(PLUGINS_SUBFOLDER_SPEC)
            })
        });

        let phase = match existing {
            Some(phase) => phase.to_string(),
            None => {
                let phase = self.add_object(
                    Dict::new()
                        .with("isa", "PBXCopyFilesBuildPhase")
                        .with("buildActionMask", BUILD_ACTION_MASK)
                        .with("dstPath", "")
                        .with("dstSubfolderSpec", PLUGINS_SUBFOLDER_SPEC)
                        .with("files", Vec::<Value>::new())
                        .with("name", "Embed App Extensions")
                        .with("runOnlyForDeploymentPostprocessing", "0"),
                );
                self.push_to_array(host, "buildPhases", &phase)?;
                phase
            }
        };

        self.push_to_array(&phase, "files", &build_file)
    }

    /// Make `dependent` build `target` first
    fn add_target_dependency(
        &mut self,
        dependent: &str,
        target: &str,
        target_name: &str,
        project_id: &str,
    ) -> Result<(), ProjectError> {
        let proxy = self.add_object(
            Dict::new()
                .with("isa", "PBXContainerItemProxy")
                .with("containerPortal", project_id)
                .with("proxyType", "1")
                .with("remoteGlobalIDString", target)
                .with("remoteInfo", target_name),
        );
        let dependency = self.add_object(
            Dict::new()
                .with("isa", "PBXTargetDependency")
                .with("target", target)
                .with("targetProxy", proxy),
        );
        self.push_to_array(dependent, "dependencies", &dependency)
    }
}

fn target_build_settings(config_name: &str, name: &str, subfolder: &str, bundle_id: Option<&str>) -> Dict {
    let mut settings = Dict::new();
    if config_name == "Debug" {
        settings.insert(
            "GCC_PREPROCESSOR_DEFINITIONS",
            vec![Value::from("DEBUG=1"), Value::from("$(inherited)")],
        );
    }
    settings.insert("INFOPLIST_FILE", format!("{0}/{0}-Info.plist", subfolder));
    settings.insert("LD_RUNPATH_SEARCH_PATHS", LD_RUNPATH_SEARCH_PATHS);
    if let Some(bundle_id) = bundle_id {
        settings.insert("PRODUCT_BUNDLE_IDENTIFIER", bundle_id);
    }
    settings.insert("PRODUCT_NAME", name);
    settings.insert("SKIP_INSTALL", "YES");
    settings
}
