//! Build-tool invocation layer.
//!
//! The scenario driver never talks to `cmake`/`ctest` directly; it goes
//! through the [`BuildTool`] trait so that driver logic can be exercised
//! against a mock. The real implementation, [`CmakeCli`], shells out via
//! `std::process::Command` with a per-invocation working directory and
//! per-invocation environment. Nothing mutates the process-global
//! environment: `CMAKE_PREFIX_PATH` and the runtime library search path
//! exist only in the child process.
//!
//! Non-zero exit codes are ordinary results (`Ok(false)`); failing to spawn
//! the tool at all is an error.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

/// Errors that abort a run, as opposed to checks that merely fail.
#[derive(Debug, Error)]
pub enum CmakeError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Environment applied to a single build-tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolEnv {
    /// Value for `CMAKE_PREFIX_PATH`, read by the package-discovery
    /// mechanism (`find_package`).
    pub cmake_prefix_path: Option<PathBuf>,
    /// Replacement `PATH` value extended with the directory holding the
    /// shared library, so the probe executable can load it at run time.
    /// Only set on platforms that resolve libraries through `PATH`.
    pub search_path: Option<OsString>,
}

impl ToolEnv {
    fn apply(&self, cmd: &mut Command) {
        if let Some(prefix) = &self.cmake_prefix_path {
            cmd.env("CMAKE_PREFIX_PATH", prefix);
        }
        if let Some(path) = &self.search_path {
            cmd.env("PATH", path);
        }
    }
}

/// The seam between the scenario driver and the real build tool.
pub trait BuildTool {
    /// Run the configuration step in `build_dir` against the project at
    /// `source_dir` with the given `-D` cache defines.
    ///
    /// `select_generator` picks the platform generator explicitly; only a
    /// fresh build tree wants this — reconfiguring an existing cache with a
    /// mismatched `-G` makes the tool error out.
    fn configure(
        &self,
        build_dir: &Path,
        source_dir: &Path,
        defines: &[(String, String)],
        select_generator: bool,
        env: &ToolEnv,
    ) -> Result<bool, CmakeError>;

    /// Run the build step (`cmake --build .`), optionally for a named
    /// target (`clean`, `install`, `uninstall`).
    fn build(&self, build_dir: &Path, target: Option<&str>, env: &ToolEnv)
    -> Result<bool, CmakeError>;

    /// Run the test-execution step (`ctest`).
    fn ctest(&self, build_dir: &Path, env: &ToolEnv) -> Result<bool, CmakeError>;
}

/// Default [`BuildTool`] shelling out to `cmake` and `ctest`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CmakeCli {
    /// Stream subprocess output instead of discarding it.
    pub verbose: bool,
}

impl CmakeCli {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn command(&self, tool: &'static str, build_dir: &Path, env: &ToolEnv) -> Command {
        let mut cmd = Command::new(tool);
        cmd.current_dir(build_dir);
        env.apply(&mut cmd);
        if !self.verbose {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        cmd
    }

    fn run(&self, mut cmd: Command, tool: &'static str) -> Result<bool, CmakeError> {
        tracing::debug!(?cmd, "running {tool}");
        let status = cmd
            .status()
            .map_err(|source| CmakeError::Spawn { tool, source })?;
        tracing::debug!(code = ?status.code(), "{tool} exited");
        Ok(status.success())
    }
}

/// Arguments for a configure invocation, separated out for testing.
fn configure_args(
    source_dir: &Path,
    defines: &[(String, String)],
    select_generator: bool,
) -> Vec<OsString> {
    let mut args = vec![source_dir.as_os_str().to_os_string()];
    if select_generator && cfg!(windows) {
        args.push("-G".into());
        args.push("Visual Studio 15 2017 Win64".into());
    }
    for (key, value) in defines {
        args.push(format!("-D{key}={value}").into());
    }
    args
}

impl BuildTool for CmakeCli {
    fn configure(
        &self,
        build_dir: &Path,
        source_dir: &Path,
        defines: &[(String, String)],
        select_generator: bool,
        env: &ToolEnv,
    ) -> Result<bool, CmakeError> {
        let mut cmd = self.command("cmake", build_dir, env);
        cmd.args(configure_args(source_dir, defines, select_generator));
        self.run(cmd, "cmake")
    }

    fn build(
        &self,
        build_dir: &Path,
        target: Option<&str>,
        env: &ToolEnv,
    ) -> Result<bool, CmakeError> {
        let mut cmd = self.command("cmake", build_dir, env);
        cmd.args(["--build", "."]);
        if let Some(target) = target {
            cmd.args(["--target", target]);
        }
        self.run(cmd, "cmake")
    }

    fn ctest(&self, build_dir: &Path, env: &ToolEnv) -> Result<bool, CmakeError> {
        let cmd = self.command("ctest", build_dir, env);
        self.run(cmd, "ctest")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconfigure_never_passes_a_generator() {
        // An existing cache keeps its generator; -G against a mismatched
        // cache is a hard error.
        let args = configure_args(
            Path::new(".."),
            &[("CMAKE_INSTALL_PREFIX".to_string(), "/usr/local".to_string())],
            false,
        );
        assert!(!args.contains(&OsString::from("-G")));
        assert_eq!(args[0], OsString::from(".."));
        assert_eq!(args[1], OsString::from("-DCMAKE_INSTALL_PREFIX=/usr/local"));
    }

    #[cfg(windows)]
    #[test]
    fn fresh_tree_configure_selects_the_generator() {
        let args = configure_args(Path::new(".."), &[], true);
        assert_eq!(args[1], OsString::from("-G"));
        assert_eq!(args[2], OsString::from("Visual Studio 15 2017 Win64"));
    }

    #[cfg(not(windows))]
    #[test]
    fn generator_selection_is_windows_only() {
        let args = configure_args(Path::new(".."), &[], true);
        assert!(!args.contains(&OsString::from("-G")));
    }
}
