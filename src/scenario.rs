//! Installation scenarios and their setup/teardown.
//!
//! The driver exercises package discovery three ways: against the build tree
//! itself, against a system-wide install, and against an install into a
//! temporary prefix. Each scenario is captured as an explicit [`ScenarioEnv`]
//! value handed to every check call; there is no hidden process-global state
//! to set up or forget to tear down.
//!
//! The package-config file (`LibeventConfig.cmake`) in the build directory
//! is renamed aside for the install scenarios so `find_package` cannot take
//! the build-tree shortcut, and renamed back afterwards.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::cmake::{BuildTool, CmakeError, ToolEnv};
use crate::component::LinkType;

/// Package-config file emitted into the library's build directory.
pub const PACKAGE_CONFIG: &str = "LibeventConfig.cmake";
/// Backup name used while the config file is hidden.
pub const CONFIG_BACKUP: &str = "tempconfig";

/// The three discovery scenarios, run in this fixed sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    BuildTree,
    SystemInstall,
    TempInstall,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] = [
        ScenarioKind::BuildTree,
        ScenarioKind::SystemInstall,
        ScenarioKind::TempInstall,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ScenarioKind::BuildTree => "build tree",
            ScenarioKind::SystemInstall => "install tree (system-wide path)",
            ScenarioKind::TempInstall => "install tree (non-system-wide path)",
        }
    }
}

/// Directory layout the tool operates in.
#[derive(Debug, Clone)]
pub struct Dirs {
    /// The library's CMake build directory (the tool's working directory).
    pub working_dir: PathBuf,
    /// Directory holding the probe project's `CMakeLists.txt`.
    pub project_dir: PathBuf,
}

impl Dirs {
    /// Scratch build directory for the probe project.
    pub fn scratch_build_dir(&self) -> PathBuf {
        self.project_dir.join("build")
    }
}

/// Explicit per-scenario configuration passed to each check call.
#[derive(Debug, Clone)]
pub struct ScenarioEnv {
    pub kind: ScenarioKind,
    /// Where `find_package` should look for the package config.
    pub cmake_prefix_path: PathBuf,
    /// Directory holding the shared library, when the platform resolves it
    /// through the search-path variable (Windows, shared linking only).
    pub exported_dll_dir: Option<PathBuf>,
}

impl ScenarioEnv {
    /// Environment for a single build-tool invocation under this scenario.
    pub fn tool_env(&self) -> ToolEnv {
        ToolEnv {
            cmake_prefix_path: Some(self.cmake_prefix_path.clone()),
            search_path: self.exported_dll_dir.as_deref().map(extended_search_path),
        }
    }
}

/// A set-up scenario. Holds the temporary install prefix alive for the
/// duration of the scenario's checks.
pub struct Scenario {
    pub env: ScenarioEnv,
    tempdir: Option<TempDir>,
}

impl Scenario {
    /// Prepare a scenario: install the library where the scenario needs it
    /// and hide or restore the package-config file accordingly.
    ///
    /// Install failures are not separately diagnosed; the downstream check
    /// surfaces them as a failed case.
    pub fn set_up(
        kind: ScenarioKind,
        dirs: &Dirs,
        tool: &dyn BuildTool,
        link_type: LinkType,
    ) -> Result<Scenario, CmakeError> {
        match kind {
            ScenarioKind::BuildTree => {
                config_restore(&dirs.working_dir)?;
                Ok(Scenario {
                    env: ScenarioEnv {
                        kind,
                        cmake_prefix_path: dirs.working_dir.clone(),
                        exported_dll_dir: dll_dir(
                            dirs.working_dir.join("bin").join("Debug"),
                            link_type,
                        ),
                    },
                    tempdir: None,
                })
            }
            ScenarioKind::SystemInstall => {
                let prefix = system_prefix();
                install_to(tool, dirs, &prefix)?;
                config_backup(&dirs.working_dir)?;
                Ok(Scenario {
                    env: ScenarioEnv {
                        kind,
                        cmake_prefix_path: package_config_dir(&prefix),
                        exported_dll_dir: dll_dir(prefix.join("lib"), link_type),
                    },
                    tempdir: None,
                })
            }
            ScenarioKind::TempInstall => {
                let tempdir = tempfile::tempdir()?;
                let prefix = tempdir.path().to_path_buf();
                install_to(tool, dirs, &prefix)?;
                config_backup(&dirs.working_dir)?;
                Ok(Scenario {
                    env: ScenarioEnv {
                        kind,
                        cmake_prefix_path: package_config_dir(&prefix),
                        exported_dll_dir: dll_dir(prefix.join("lib"), link_type),
                    },
                    tempdir: Some(tempdir),
                })
            }
        }
    }

    /// Undo the scenario's filesystem and install effects. The temporary
    /// install prefix, if any, is discarded here.
    pub fn tear_down(self, dirs: &Dirs, tool: &dyn BuildTool) -> Result<(), CmakeError> {
        match self.env.kind {
            ScenarioKind::BuildTree => {}
            ScenarioKind::SystemInstall | ScenarioKind::TempInstall => {
                // Best effort; the uninstall target may not exist.
                if let Ok(false) | Err(_) =
                    tool.build(&dirs.working_dir, Some("uninstall"), &ToolEnv::default())
                {
                    tracing::debug!("uninstall target failed; continuing");
                }
                config_restore(&dirs.working_dir)?;
            }
        }
        drop(self.tempdir);
        Ok(())
    }
}

/// Hide the package-config file by renaming it to the backup name.
/// Idempotent; tolerates either file being absent.
pub fn config_backup(working_dir: &Path) -> io::Result<()> {
    let config = working_dir.join(PACKAGE_CONFIG);
    let backup = working_dir.join(CONFIG_BACKUP);
    if backup.is_file() {
        fs::remove_file(&backup)?;
    }
    if config.is_file() {
        fs::rename(&config, &backup)?;
    }
    Ok(())
}

/// Put the package-config file back if a backup exists and the original is
/// missing. Idempotent.
pub fn config_restore(working_dir: &Path) -> io::Result<()> {
    let config = working_dir.join(PACKAGE_CONFIG);
    let backup = working_dir.join(CONFIG_BACKUP);
    if backup.is_file() && !config.is_file() {
        fs::rename(&backup, &config)?;
    }
    Ok(())
}

/// Compute the current `PATH` extended with `dir`, for child processes only.
/// The process-global variable is never touched.
pub fn extended_search_path(dir: &Path) -> OsString {
    match env::var_os("PATH") {
        Some(current) => {
            let mut paths: Vec<PathBuf> = env::split_paths(&current).collect();
            if !paths.contains(&dir.to_path_buf()) {
                paths.push(dir.to_path_buf());
            }
            env::join_paths(paths).unwrap_or(current)
        }
        None => dir.as_os_str().to_os_string(),
    }
}

fn dll_dir(dir: PathBuf, link_type: LinkType) -> Option<PathBuf> {
    (cfg!(windows) && link_type == LinkType::Shared).then_some(dir)
}

fn system_prefix() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\Program Files\libevent")
    } else {
        PathBuf::from("/usr/local")
    }
}

fn package_config_dir(prefix: &Path) -> PathBuf {
    prefix.join("lib").join("cmake").join("libevent")
}

/// Reconfigure the library build with an install prefix and run the install
/// target. Failures are logged and otherwise ignored; a broken install shows
/// up as a failed downstream check.
fn install_to(tool: &dyn BuildTool, dirs: &Dirs, prefix: &Path) -> Result<(), CmakeError> {
    let defines = vec![(
        "CMAKE_INSTALL_PREFIX".to_string(),
        prefix.display().to_string(),
    )];
    let env = ToolEnv::default();
    // The library build dir already has a cached generator; do not reselect.
    if !tool.configure(&dirs.working_dir, Path::new(".."), &defines, false, &env)? {
        tracing::debug!(prefix = %prefix.display(), "install configure step failed; continuing");
    }
    if !tool.build(&dirs.working_dir, Some("install"), &env)? {
        tracing::debug!(prefix = %prefix.display(), "install step failed; continuing");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_then_restore_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join(PACKAGE_CONFIG);
        fs::write(&config, "# config").unwrap();

        config_backup(dir.path()).unwrap();
        assert!(!config.is_file());
        assert!(dir.path().join(CONFIG_BACKUP).is_file());

        config_restore(dir.path()).unwrap();
        assert!(config.is_file());
        assert!(!dir.path().join(CONFIG_BACKUP).is_file());
        assert_eq!(fs::read_to_string(&config).unwrap(), "# config");
    }

    #[test]
    fn backup_without_config_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        config_backup(dir.path()).unwrap();
        assert!(!dir.path().join(CONFIG_BACKUP).is_file());
    }

    #[test]
    fn restore_without_backup_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        config_restore(dir.path()).unwrap();
        assert!(!dir.path().join(PACKAGE_CONFIG).is_file());
    }

    #[test]
    fn backup_replaces_stale_backup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_BACKUP), "stale").unwrap();
        fs::write(dir.path().join(PACKAGE_CONFIG), "fresh").unwrap();

        config_backup(dir.path()).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join(CONFIG_BACKUP)).unwrap(),
            "fresh"
        );
    }

    #[test]
    fn restore_does_not_clobber_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PACKAGE_CONFIG), "current").unwrap();
        fs::write(dir.path().join(CONFIG_BACKUP), "old").unwrap();

        config_restore(dir.path()).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join(PACKAGE_CONFIG)).unwrap(),
            "current"
        );
    }

    #[test]
    fn extended_search_path_leaves_process_env_untouched() {
        let before = env::var_os("PATH");
        let extended = extended_search_path(Path::new("/nonexistent/libdir"));
        assert!(!extended.is_empty());
        assert_eq!(env::var_os("PATH"), before);
    }

    #[test]
    fn extended_search_path_contains_the_new_entry() {
        let dir = Path::new("/nonexistent/libdir");
        let extended = extended_search_path(dir);
        let entries: Vec<PathBuf> = env::split_paths(&extended).collect();
        assert!(entries.contains(&dir.to_path_buf()));
    }
}
