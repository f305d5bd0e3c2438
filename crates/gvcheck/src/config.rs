//! Run settings and the CI build context consulted by the skip tables.

use std::path::{Path, PathBuf};

/// How a run treats the reference corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Compare generated output against the reference corpus.
    #[default]
    Compare,
    /// Write generated output into the reference directory instead of comparing.
    Generate,
    /// Count and print subtests without invoking anything.
    Noop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            "windows" => Self::Windows,
            _ => Self::Other,
        }
    }

    /// Reference-output directory used when `REFDIR` is unset.
    pub fn default_ref_dir(self) -> &'static str {
        match self {
            Self::Linux => "linux.x86",
            Self::MacOs => "macosx",
            Self::Windows | Self::Other => "nshare",
        }
    }
}

/// CI build-context inputs to the skip tables, read once at startup.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub platform: Platform,
    /// `build_system` environment variable (e.g. `cmake`, `msbuild`).
    pub build_system: Option<String>,
    /// `configuration` environment variable (e.g. `Debug`, `Release`).
    pub configuration: Option<String>,
}

impl BuildContext {
    pub fn from_env() -> Self {
        Self {
            platform: Platform::current(),
            build_system: std::env::var("build_system").ok(),
            configuration: std::env::var("configuration").ok(),
        }
    }

    pub fn build_system_is(&self, name: &str) -> bool {
        self.build_system.as_deref() == Some(name)
    }

    pub fn configuration_is(&self, name: &str) -> bool {
        self.configuration.as_deref() == Some(name)
    }
}

/// Fully resolved settings for one driver run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: RunMode,
    pub verbose: bool,
    /// The test-spec file.
    pub testfile: PathBuf,
    /// Directory of input graphs, conventionally `graphs/` next to the spec file.
    pub graphs_dir: PathBuf,
    /// Directory for generated artifacts. In generate mode this is `ref_dir`.
    pub out_dir: PathBuf,
    /// Reference corpus directory.
    pub ref_dir: PathBuf,
    /// Directory for the HTML report of failing raster comparisons.
    pub html_dir: PathBuf,
    /// The tool under test.
    pub dot: PathBuf,
    /// Pixel-diff tool; `None` only under configurations exempt from raster comparison.
    pub diffimg: Option<PathBuf>,
    pub build: BuildContext,
}

/// Searches `PATH` for an executable, like `shutil.which`.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        if cfg!(windows) {
            let candidate = dir.join(format!("{name}.exe"));
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ref_dirs_per_platform() {
        assert_eq!(Platform::Linux.default_ref_dir(), "linux.x86");
        assert_eq!(Platform::MacOs.default_ref_dir(), "macosx");
        assert_eq!(Platform::Windows.default_ref_dir(), "nshare");
        assert_eq!(Platform::Other.default_ref_dir(), "nshare");
    }

    #[cfg(unix)]
    #[test]
    fn executable_check_requires_exec_bit() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().expect("tempdir");
        let plain = tmp.path().join("plain");
        std::fs::write(&plain, "x").expect("write");
        assert!(!is_executable(&plain));

        let exec = tmp.path().join("exec");
        std::fs::write(&exec, "x").expect("write");
        let mut perms = std::fs::metadata(&exec).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&exec, perms).expect("chmod");
        assert!(is_executable(&exec));
    }
}
