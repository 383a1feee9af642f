//! Shell process launching.
//!
//! Builds and spawns the external shell process from a [`LaunchOptions`]
//! value. Launch policy (stop-before-start, exit propagation) lives in the
//! controller; this module only assembles the command.

use crate::config::LaunchDefaults;
use crate::error::{Result, ShellError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::info;

/// Configuration for launching the shell process.
///
/// Every field has a documented default; `with_*` methods override
/// individual fields. Options are passed through to the OS spawn facility
/// verbatim, merged with the stdio default below.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Program to execute. Default: `electron` from `PATH`.
    pub program: PathBuf,
    /// Arguments passed to the program. Default: `[".", "--no-sandbox"]`.
    pub args: Vec<String>,
    /// Environment variables set on the child, on top of the inherited
    /// host environment. Default: empty.
    pub env_vars: HashMap<String, String>,
    /// Working directory for the child. Default: inherit the host's.
    pub current_dir: Option<PathBuf>,
    /// Redirect the child's stdout/stderr to this file instead of the
    /// host's streams. Default: `None` — the child inherits the host's
    /// stdio so its console output stays visible to the operator.
    pub log_file: Option<PathBuf>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            program: PathBuf::from(LaunchDefaults::PROGRAM),
            args: LaunchDefaults::ARGS.iter().map(|s| s.to_string()).collect(),
            env_vars: HashMap::new(),
            current_dir: None,
            log_file: None,
        }
    }
}

impl LaunchOptions {
    /// Create launch options for a specific program with the default argv.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Replace the argument list.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Append a single argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    pub fn with_current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Redirect child output to the given log file.
    pub fn with_log_file(mut self, path: impl AsRef<Path>) -> Self {
        self.log_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Redirect child output to a timestamped log file under `dir`,
    /// e.g. `shell_20260808_141502.log`.
    pub fn with_timestamped_log(self, dir: impl AsRef<Path>) -> Self {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        self.with_log_file(dir.as_ref().join(format!("shell_{}.log", timestamp)))
    }

    /// Publish the resolved dev-server URL into the child's environment.
    pub fn with_dev_server_url(self, url: impl Into<String>) -> Self {
        self.with_env(LaunchDefaults::DEV_SERVER_URL_ENV, url)
    }
}

/// Spawn the shell process described by `options`.
///
/// Spawn failures (executable missing, permission denied) surface
/// synchronously as [`ShellError::Spawn`] and are never retried here.
pub fn spawn(options: &LaunchOptions) -> Result<Child> {
    let mut cmd = Command::new(&options.program);
    cmd.args(&options.args);

    if let Some(ref dir) = options.current_dir {
        cmd.current_dir(dir);
    }

    for (key, value) in &options.env_vars {
        cmd.env(key, value);
    }

    if let Some(ref log_file) = options.log_file {
        if let Some(parent) = log_file.parent() {
            fs::create_dir_all(parent).ok();
        }

        let file = fs::File::create(log_file)
            .map_err(|e| ShellError::io_with_path(e, log_file.clone()))?;
        let stdout_file = file
            .try_clone()
            .map_err(|e| ShellError::io_with_path(e, log_file.clone()))?;
        cmd.stdout(Stdio::from(stdout_file));
        cmd.stderr(Stdio::from(file));
    } else {
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
    }

    info!(
        "Launching {} {}",
        options.program.display(),
        options.args.join(" ")
    );

    cmd.spawn().map_err(|e| ShellError::Spawn {
        program: options.program.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_options() {
        let options = LaunchOptions::default();
        assert_eq!(options.program, PathBuf::from("electron"));
        assert_eq!(options.args, vec![".", "--no-sandbox"]);
        assert!(options.env_vars.is_empty());
        assert!(options.log_file.is_none());
    }

    #[test]
    fn test_options_builder() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("shell.log");

        let options = LaunchOptions::new("my-shell")
            .with_arg("--inspect=9229")
            .with_env("NODE_ENV", "development")
            .with_current_dir(temp_dir.path())
            .with_log_file(&log);

        assert_eq!(options.program, PathBuf::from("my-shell"));
        assert!(options.args.contains(&"--inspect=9229".to_string()));
        assert_eq!(
            options.env_vars.get("NODE_ENV"),
            Some(&"development".to_string())
        );
        assert_eq!(options.log_file, Some(log));
    }

    #[test]
    fn test_dev_server_url_env() {
        let options = LaunchOptions::default().with_dev_server_url("http://192.168.1.4:5173");
        assert_eq!(
            options.env_vars.get(LaunchDefaults::DEV_SERVER_URL_ENV),
            Some(&"http://192.168.1.4:5173".to_string())
        );
    }

    #[test]
    fn test_timestamped_log_name() {
        let temp_dir = TempDir::new().unwrap();
        let options = LaunchOptions::default().with_timestamped_log(temp_dir.path());
        let name = options
            .log_file
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap()
            .to_string();
        assert!(name.starts_with("shell_"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_spawn_missing_program() {
        let options = LaunchOptions::new("/nonexistent/definitely-not-a-program");
        let err = spawn(&options).unwrap_err();
        assert!(matches!(err, ShellError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_writes_log_file() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("out.log");

        let options = LaunchOptions::new("sh")
            .with_args(["-c", "echo hello-from-child"])
            .with_log_file(&log);

        let mut child = spawn(&options).unwrap();
        child.wait().unwrap();

        let contents = std::fs::read_to_string(&log).unwrap();
        assert!(contents.contains("hello-from-child"));
    }
}
