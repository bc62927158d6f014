//! Process-startup configuration: introspection search paths.
//!
//! Read once (§6 Environment, §5 Concurrency) and threaded explicitly
//! through [`crate::idr::IdrCache`] rather than read again mid-compile.

use std::env;
use std::path::PathBuf;

/// The toolkit namespace and version this build accepts in `using` directives.
pub const SUPPORTED_TOOLKIT_NAMESPACE: &str = "Gtk";
pub const SUPPORTED_TOOLKIT_VERSION: &str = "4.0";

#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    /// Explicitly registered paths, highest priority, first-registered wins.
    extra_paths: Vec<PathBuf>,
    /// Paths collected from the environment at startup.
    env_paths: Vec<PathBuf>,
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the standard data-directory environment variables once.
    pub fn from_env() -> Self {
        let mut env_paths = Vec::new();
        if let Ok(dirs) = env::var("GI_TYPELIB_PATH") {
            env_paths.extend(env::split_paths(&dirs));
        }
        if let Ok(dirs) = env::var("XDG_DATA_DIRS") {
            for dir in env::split_paths(&dirs) {
                env_paths.push(dir.join("gir-1.0"));
            }
        }
        env_paths.push(PathBuf::from("/usr/share/gir-1.0"));
        Self {
            extra_paths: Vec::new(),
            env_paths,
        }
    }

    /// Registers an additional search path (`--typelib-path`). First
    /// registration for a given directory wins on later duplicate adds.
    pub fn add_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.extra_paths.contains(&path) {
            self.extra_paths.push(path);
        }
    }

    /// Iterates search directories in priority order: explicit paths first.
    pub fn search_dirs(&self) -> impl Iterator<Item = &PathBuf> {
        self.extra_paths.iter().chain(self.env_paths.iter())
    }

    pub fn candidate_files(&self, namespace: &str, version: &str) -> Vec<PathBuf> {
        let filename = format!("{namespace}-{version}.gir");
        self.search_dirs().map(|dir| dir.join(&filename)).collect()
    }
}
