//! Sample and test site lookup.
//!
//! Test applications are declared at build time (see `build.rs`) as
//! `TestAssemblyApplication[<Project>] = <path>` metadata entries. Inside a
//! sandboxed test environment the build tree is not available and sites are
//! laid out next to the test executable instead.

use errors::ProjectError;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

include!(concat!(env!("OUT_DIR"), "/test_applications.rs"));

/// Environment variable set (non-empty) by the sandboxed test environment.
pub const SANDBOX_ENV_VAR: &str = "helix";

/// Marker of metadata keys declaring a test application.
pub const APPLICATION_METADATA_KEY: &str = "TestAssemblyApplication";

static PROJECTS: LazyLock<Result<ProjectRegistry, ProjectError>> = LazyLock::new(|| {
    let registry = ProjectRegistry::from_metadata(TEST_APPLICATION_METADATA.iter().copied());
    if let Ok(registry) = &registry {
        debug!(projects = registry.len(), "Test application registry built");
    }
    registry
});

/// Project name to directory mapping, immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectRegistry {
    projects: HashMap<String, PathBuf>,
}

impl ProjectRegistry {
    /// Builds a registry from raw metadata pairs.
    ///
    /// Only keys of the form `TestAssemblyApplication[<Project>]` are kept.
    /// Two keys naming the same project are rejected.
    pub fn from_metadata<I, K, V>(entries: I) -> Result<Self, ProjectError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut projects = HashMap::new();
        for (key, value) in entries {
            let Some(name) = application_name(key.as_ref()) else {
                continue;
            };
            if projects
                .insert(name.to_string(), PathBuf::from(value.as_ref()))
                .is_some()
            {
                return Err(ProjectError::DuplicateProject {
                    name: name.to_string(),
                });
            }
        }
        Ok(Self { projects })
    }

    /// The registry embedded at build time, built on first use.
    pub fn embedded() -> Result<&'static Self, ProjectError> {
        PROJECTS.as_ref().map_err(Clone::clone)
    }

    pub fn get(&self, project_name: &str) -> Option<&Path> {
        self.projects.get(project_name).map(PathBuf::as_path)
    }

    pub fn resolve(&self, project_name: &str) -> Result<PathBuf, ProjectError> {
        self.get(project_name)
            .map(Path::to_path_buf)
            .ok_or_else(|| ProjectError::ProjectNotFound {
                name: project_name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

fn application_name(key: &str) -> Option<&str> {
    let rest = key.strip_prefix(APPLICATION_METADATA_KEY)?;
    if !rest.starts_with('[') {
        return None;
    }
    Some(rest.trim_start_matches('[').trim_end_matches(']'))
}

/// Returns the directory of the sample or test site named `project_name`.
///
/// With [`SANDBOX_ENV_VAR`] set, the site must be a directory named after
/// the project next to the current executable; the registry is not read.
/// Otherwise the embedded registry is consulted.
pub fn find_sample_or_test_site_path(project_name: &str) -> Result<PathBuf, ProjectError> {
    if is_sandboxed() {
        return resolve_sandboxed(&executable_dir()?, project_name);
    }
    ProjectRegistry::embedded()?.resolve(project_name)
}

/// Whether the sandboxed test environment marker is set.
pub fn is_sandboxed() -> bool {
    env::var_os(SANDBOX_ENV_VAR).is_some_and(|value| !value.is_empty())
}

/// Resolves `project_name` below `base_dir`, which must contain it.
pub fn resolve_sandboxed(base_dir: &Path, project_name: &str) -> Result<PathBuf, ProjectError> {
    let dir = base_dir.join(project_name);
    if !dir.is_dir() {
        return Err(ProjectError::DirectoryNotFound { dir });
    }
    Ok(dir)
}

/// Directory holding the running executable.
pub fn executable_dir() -> Result<PathBuf, ProjectError> {
    let exe = env::current_exe().map_err(|e| ProjectError::CurrentExe {
        reason: e.to_string(),
    })?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| ProjectError::CurrentExe {
            reason: format!("'{}' has no parent directory", exe.display()),
        })
}
