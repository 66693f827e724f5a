//! Share Extension Hook - Register an iOS share extension in a Cordova Xcode project
//!
//! This crate finds the Xcode project Cordova generated under
//! `platforms/ios`, then adds a `ShareExt` app extension target and a
//! `ShareExtension` group for the files in `platforms/ios/ShareExtension`.
//! Running it again leaves the target and group alone.
//!
//! # Example
//!
//! ```no_run
//! use share_ext_hook::{run, HookContext, Preferences};
//!
//! let mut preferences = Preferences::new();
//! preferences.insert("DISPLAY_NAME", "Share to App");
//!
//! let report = run(HookContext::new("path/to/cordova-app", preferences)).unwrap();
//! println!("target {} (created: {})", report.target.id, report.target.created);
//! ```

pub mod config;
pub mod discovery;
pub mod files;
pub mod hook;
pub mod logging;
pub mod pbxproj;
pub mod preferences;

use std::path::PathBuf;
use thiserror::Error;

pub use config::HookConfig;
pub use discovery::{find_xcode_project, XcodeProject};
pub use files::{classify, ExtensionFile, FileBucket, FileRole};
pub use hook::{run, HookContext, HookReport};
pub use pbxproj::{Project, ProjectError};
pub use preferences::Preferences;

/// Errors that can abort the hook
#[derive(Error, Debug)]
pub enum HookError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("No Xcode project found in {dir}")]
    ProjectNotFound { dir: PathBuf },

    #[error("Group '{name}' not found in Xcode project")]
    MissingGroup { name: String },

    #[error("Invalid preference '{0}', expected KEY=VALUE")]
    InvalidPreference(String),

    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    #[error("Walk error: {0}")]
    WalkError(#[from] ignore::Error),
}

/// Result type for hook operations
pub type HookResult<T> = Result<T, HookError>;
