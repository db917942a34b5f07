use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::ConfigError;

/// Distribution-default profile shipped by the OS vendor.
pub const DEFAULT_DISTRIBUTION_PROFILE: &str = "/usr/share/defaults/etc/profile";
/// Administrator override, consulted after the distribution default.
pub const DEFAULT_ADMIN_PROFILE: &str = "/etc/profile";
pub const DEFAULT_MAX_SOURCE_DEPTH: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvbootConfig {
    pub profiles: ProfilesConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilesConfig {
    pub distribution: String,
    pub admin: String,
    /// Maximum nesting of `source` / `.` directives inside profile files.
    pub max_source_depth: usize,
    /// Fail instead of warning when a present profile cannot be read or parsed.
    pub strict: bool,
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            distribution: DEFAULT_DISTRIBUTION_PROFILE.to_string(),
            admin: DEFAULT_ADMIN_PROFILE.to_string(),
            max_source_depth: DEFAULT_MAX_SOURCE_DEPTH,
            strict: false,
        }
    }
}

impl ProfilesConfig {
    pub fn distribution_path(&self) -> PathBuf {
        expand_path(&self.distribution)
    }

    pub fn admin_path(&self) -> PathBuf {
        expand_path(&self.admin)
    }

    /// Optional profiles in the order they are sourced.
    pub fn optional_files(&self) -> [PathBuf; 2] {
        [self.distribution_path(), self.admin_path()]
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub shell: ShellKind,
}

/// Target dialect for the rendered session script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellKind {
    #[default]
    Sh,
    Bash,
    Zsh,
    Fish,
}

impl ShellKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sh => "sh",
            Self::Bash => "bash",
            Self::Zsh => "zsh",
            Self::Fish => "fish",
        }
    }

    /// True for shells that accept POSIX `alias` / `export` syntax.
    pub fn is_posix(&self) -> bool {
        !matches!(self, Self::Fish)
    }
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShellKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept a full path such as /bin/bash, as found in $SHELL.
        let name = s.rsplit('/').next().unwrap_or(s);
        match name.to_ascii_lowercase().as_str() {
            "sh" | "dash" | "ash" => Ok(Self::Sh),
            "bash" => Ok(Self::Bash),
            "zsh" => Ok(Self::Zsh),
            "fish" => Ok(Self::Fish),
            other => Err(ConfigError::InvalidValue(format!("unknown shell '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Pretty,
            filter: String::new(),
        }
    }
}

impl LoggingConfig {
    /// Filter directive for `tracing_subscriber::EnvFilter`.
    pub fn filter_directive(&self) -> String {
        if self.filter.is_empty() {
            self.level.as_str().to_string()
        } else {
            self.filter.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
}
