use crate::{ConfigError, EnvbootConfig, LogLevel, ShellKind};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

pub struct ConfigLoader {
    explicit_file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("envboot/envboot.yaml"));
        }
        search_paths.push(PathBuf::from("./envboot.yaml"));

        #[cfg(unix)]
        search_paths.insert(0, PathBuf::from("/etc/envboot/envboot.yaml"));

        Self {
            explicit_file: None,
            search_paths,
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }

    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    pub fn load(&self) -> Result<EnvbootConfig, ConfigError> {
        let mut config = EnvbootConfig::default();

        if let Some(path) = self.config_file(|name| std::env::var(name).ok()) {
            let content = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::ReadFile { path: path.clone(), source })?;
            config = self.parse_yaml(&content)?;
            tracing::debug!(path = %path.display(), "Loaded explicit config");
        } else {
            for path in &self.search_paths {
                if path.exists() {
                    if let Ok(content) = std::fs::read_to_string(path) {
                        config = self.merge_yaml(&config, &content)?;
                        tracing::debug!(path = %path.display(), "Merged config file");
                    }
                }
            }
        }

        self.apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        Ok(config)
    }

    /// The file that replaces the search path: `with_file` wins over
    /// `ENVBOOT_CONFIG`.
    fn config_file<F>(&self, lookup: F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.explicit_file
            .clone()
            .or_else(|| lookup("ENVBOOT_CONFIG").filter(|p| !p.is_empty()).map(PathBuf::from))
    }

    fn parse_yaml(&self, content: &str) -> Result<EnvbootConfig, ConfigError> {
        let expanded = self.expand_env_vars(content);
        if expanded.trim().is_empty() {
            return Ok(EnvbootConfig::default());
        }
        Ok(serde_yaml::from_str(&expanded)?)
    }

    fn merge_yaml(&self, base: &EnvbootConfig, content: &str) -> Result<EnvbootConfig, ConfigError> {
        let overlay = self.parse_yaml(content)?;
        Ok(self.merge_configs(base, &overlay))
    }

    fn merge_configs(&self, base: &EnvbootConfig, overlay: &EnvbootConfig) -> EnvbootConfig {
        let defaults = EnvbootConfig::default();
        let mut result = base.clone();

        if overlay.profiles.distribution != defaults.profiles.distribution {
            result.profiles.distribution = overlay.profiles.distribution.clone();
        }
        if overlay.profiles.admin != defaults.profiles.admin {
            result.profiles.admin = overlay.profiles.admin.clone();
        }
        if overlay.profiles.max_source_depth != defaults.profiles.max_source_depth {
            result.profiles.max_source_depth = overlay.profiles.max_source_depth;
        }
        if overlay.profiles.strict {
            result.profiles.strict = true;
        }
        if overlay.output.shell != defaults.output.shell {
            result.output.shell = overlay.output.shell;
        }
        if overlay.logging != defaults.logging {
            result.logging = overlay.logging.clone();
        }

        result
    }

    fn expand_env_vars(&self, content: &str) -> String {
        static VAR_RE: OnceLock<Regex> = OnceLock::new();
        let re = VAR_RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"));
        re.replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .to_string()
    }

    fn apply_env_overrides<F>(&self, config: &mut EnvbootConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("ENVBOOT_DISTRIBUTION_PROFILE") {
            config.profiles.distribution = path;
        }
        if let Some(path) = lookup("ENVBOOT_ADMIN_PROFILE") {
            config.profiles.admin = path;
        }
        if let Some(depth) = lookup("ENVBOOT_MAX_SOURCE_DEPTH") {
            match depth.parse() {
                Ok(d) => config.profiles.max_source_depth = d,
                Err(_) => tracing::warn!(value = %depth, "Ignoring invalid ENVBOOT_MAX_SOURCE_DEPTH"),
            }
        }
        if let Some(strict) = lookup("ENVBOOT_STRICT") {
            config.profiles.strict = matches!(strict.as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(shell) = lookup("ENVBOOT_SHELL") {
            match shell.parse::<ShellKind>() {
                Ok(kind) => config.output.shell = kind,
                Err(e) => tracing::warn!(error = %e, "Ignoring ENVBOOT_SHELL"),
            }
        }
        if let Some(level) = lookup("ENVBOOT_LOG_LEVEL") {
            if let Ok(l) = serde_yaml::from_str::<LogLevel>(&level) {
                config.logging.level = l;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn expand_env_vars_works() {
        std::env::set_var("ENVBOOT_TEST_VAR_123", "hello");
        let loader = ConfigLoader::new();
        let result = loader.expand_env_vars("value: ${ENVBOOT_TEST_VAR_123}");
        assert_eq!(result, "value: hello");
        std::env::remove_var("ENVBOOT_TEST_VAR_123");
    }

    #[test]
    fn missing_env_var_becomes_empty() {
        let loader = ConfigLoader::new();
        let result = loader.expand_env_vars("value: ${NONEXISTENT_VAR_XYZ}");
        assert_eq!(result, "value: ");
    }

    #[test]
    fn env_overrides_config() {
        let vars: HashMap<&str, &str> = [
            ("ENVBOOT_ADMIN_PROFILE", "/opt/site/profile"),
            ("ENVBOOT_STRICT", "1"),
            ("ENVBOOT_SHELL", "/usr/bin/zsh"),
            ("ENVBOOT_LOG_LEVEL", "debug"),
            ("ENVBOOT_MAX_SOURCE_DEPTH", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = EnvbootConfig::default();
        ConfigLoader::new().apply_env_overrides(&mut config, |name| {
            vars.get(name).map(|v| (*v).to_string())
        });

        assert_eq!(config.profiles.admin, "/opt/site/profile");
        assert!(config.profiles.strict);
        assert_eq!(config.output.shell, ShellKind::Zsh);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.profiles.max_source_depth, 8);
    }

    #[test]
    fn explicit_file_wins_over_env_config() {
        let from_env = |name: &str| (name == "ENVBOOT_CONFIG").then(|| "/a.yaml".to_string());

        let loader = ConfigLoader::new().with_file("/b.yaml");
        assert_eq!(loader.config_file(from_env), Some(PathBuf::from("/b.yaml")));

        let loader = ConfigLoader::new();
        assert_eq!(loader.config_file(from_env), Some(PathBuf::from("/a.yaml")));
        assert_eq!(loader.config_file(|_| None), None);
    }

    #[test]
    fn later_search_paths_override_earlier() {
        let dir = tempfile::tempdir().unwrap();
        let system = dir.path().join("system.yaml");
        let user = dir.path().join("user.yaml");
        std::fs::write(&system, "profiles:\n  admin: /srv/admin\n  strict: true\n").unwrap();
        std::fs::write(&user, "output:\n  shell: fish\n").unwrap();

        let loader = ConfigLoader::new().with_search_paths(vec![
            system,
            dir.path().join("missing.yaml"),
            user,
        ]);
        let config = loader.load().unwrap();

        assert_eq!(config.profiles.admin, "/srv/admin");
        assert!(config.profiles.strict);
        assert_eq!(config.output.shell, ShellKind::Fish);
        assert_eq!(
            config.profiles.distribution,
            crate::DEFAULT_DISTRIBUTION_PROFILE
        );
    }

    #[test]
    fn empty_file_yields_defaults() {
        let loader = ConfigLoader::new();
        assert_eq!(loader.parse_yaml("\n").unwrap(), EnvbootConfig::default());
    }
}
