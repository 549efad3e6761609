// Ordered search locations for the NVDA controller client library.

use std::env;
use std::path::{Path, PathBuf};

pub const CLIENT_LIBRARY_64: &str = "nvdaControllerClient64.dll";
pub const CLIENT_LIBRARY_32: &str = "nvdaControllerClient32.dll";

const DEFAULT_PROGRAM_FILES: &str = r"C:\Program Files";
const DEFAULT_PROGRAM_FILES_X86: &str = r"C:\Program Files (x86)";

/// Directories searched for the controller client, most specific first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLocations {
    /// Directory configured by the user, searched before anything else.
    pub configured_dir: Option<PathBuf>,
    /// Directory holding the bridge executable.
    pub local_dir: Option<PathBuf>,
    pub program_files: PathBuf,
    pub program_files_x86: PathBuf,
}

impl SearchLocations {
    /// Resolve locations from the running process and its environment.
    pub fn from_environment(configured_dir: Option<PathBuf>) -> Self {
        let local_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        Self {
            configured_dir,
            local_dir,
            program_files: env_dir("PROGRAMFILES", DEFAULT_PROGRAM_FILES),
            program_files_x86: env_dir("PROGRAMFILES(X86)", DEFAULT_PROGRAM_FILES_X86),
        }
    }

    /// Candidate library paths in load order, without duplicates.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        for dir in [&self.configured_dir, &self.local_dir].into_iter().flatten() {
            push_unique(&mut paths, dir.join(CLIENT_LIBRARY_64));
            push_unique(&mut paths, dir.join(CLIENT_LIBRARY_32));
        }

        push_unique(
            &mut paths,
            self.program_files.join("NVDA").join(CLIENT_LIBRARY_64),
        );
        push_unique(
            &mut paths,
            self.program_files_x86.join("NVDA").join(CLIENT_LIBRARY_32),
        );

        paths
    }
}

fn env_dir(key: &str, default: &str) -> PathBuf {
    match env::var_os(key) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(default),
    }
}

fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}
