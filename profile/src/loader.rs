//! Profile loader: sources the optional profiles, then registers the defaults

use crate::builtin;
use crate::directive::{parse_directives, Directive, ParsedDirectives};
use crate::error::{ProfileError, ProfileResult};
use crate::expansion::{expand_assignment, expand_word};
use crate::session::SessionState;
use envboot_config::ProfilesConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Read and parse one profile into directives.
pub fn load_config(path: &Path) -> ProfileResult<ParsedDirectives> {
    let content = std::fs::read_to_string(path).map_err(|source| ProfileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_directives(&content).map_err(|message| ProfileError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// What happened while initializing a session.
#[derive(Debug, Default, Serialize)]
pub struct InitReport {
    /// Every file sourced, nested ones included, in order
    pub sourced: Vec<PathBuf>,
    /// Optional profiles that were not present
    pub missing: Vec<PathBuf>,
    /// Files that were present but could not be loaded
    pub failed: Vec<(PathBuf, String)>,
    /// Statements skipped across all sourced files
    pub skipped_statements: usize,
}

#[derive(Debug, Clone)]
pub struct ProfileLoader {
    optional_files: Vec<PathBuf>,
    max_source_depth: usize,
    strict: bool,
}

impl Default for ProfileLoader {
    fn default() -> Self {
        Self::new(&ProfilesConfig::default())
    }
}

impl ProfileLoader {
    pub fn new(config: &ProfilesConfig) -> Self {
        Self {
            optional_files: config.optional_files().to_vec(),
            max_source_depth: config.max_source_depth,
            strict: config.strict,
        }
    }

    pub fn with_optional_files(mut self, files: Vec<PathBuf>) -> Self {
        self.optional_files = files;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn optional_files(&self) -> &[PathBuf] {
        &self.optional_files
    }

    /// Source the optional profiles that exist, in order, then register the
    /// fixed aliases and environment.
    ///
    /// Registration happens even when a profile fails. In strict mode the
    /// first failure is returned afterwards; otherwise it is only logged.
    pub fn initialize_session(&self, session: &mut SessionState) -> ProfileResult<InitReport> {
        let mut report = InitReport::default();
        let mut first_error = None;

        for path in &self.optional_files {
            if !path.exists() {
                tracing::debug!(path = %path.display(), "Optional profile not present");
                report.missing.push(path.clone());
                continue;
            }
            if let Err(e) = self.source_file(path, session, 0, &mut report) {
                first_error.get_or_insert(e);
            }
        }

        builtin::register(session);

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Load and apply one file. Failures are recorded in the report; they are
    /// only returned as errors in strict mode.
    pub fn source_file(
        &self,
        path: &Path,
        session: &mut SessionState,
        depth: usize,
        report: &mut InitReport,
    ) -> ProfileResult<()> {
        if depth > self.max_source_depth {
            let err = ProfileError::SourceDepth {
                path: path.to_path_buf(),
                limit: self.max_source_depth,
            };
            return self.fail(path, err, report);
        }

        let parsed = match load_config(path) {
            Ok(parsed) => parsed,
            Err(err) => return self.fail(path, err, report),
        };

        tracing::info!(
            path = %path.display(),
            directives = parsed.directives.len(),
            skipped = parsed.skipped,
            "Sourcing profile"
        );
        report.sourced.push(path.to_path_buf());
        report.skipped_statements += parsed.skipped;

        self.apply(&parsed.directives, session, depth, report)
    }

    fn fail(&self, path: &Path, err: ProfileError, report: &mut InitReport) -> ProfileResult<()> {
        tracing::warn!(path = %path.display(), error = %err, "Profile not applied");
        report.failed.push((path.to_path_buf(), err.to_string()));
        if self.strict {
            Err(err)
        } else {
            Ok(())
        }
    }

    /// Apply directives in order.
    pub fn apply(
        &self,
        directives: &[Directive],
        session: &mut SessionState,
        depth: usize,
        report: &mut InitReport,
    ) -> ProfileResult<()> {
        for directive in directives {
            match directive {
                Directive::Alias { name, expansion } => {
                    let expansion = expand_word(expansion, session);
                    session.set_alias(name, &expansion);
                }
                Directive::Unalias { name } => {
                    session.remove_alias(name);
                }
                Directive::UnaliasAll => session.clear_aliases(),
                Directive::Assign {
                    name,
                    value,
                    exported,
                } => {
                    let value = expand_assignment(value, session);
                    session.set_var(name, &value, *exported);
                }
                Directive::Export { name } => {
                    if !session.export(name) {
                        tracing::debug!(%name, "export of unset variable ignored");
                    }
                }
                Directive::Unset { name } => session.unset_var(name),
                Directive::Expand(words) => {
                    for word in words {
                        expand_word(word, session);
                    }
                }
                Directive::Source { path } => {
                    let target = PathBuf::from(expand_word(path, session));
                    if target.exists() {
                        self.source_file(&target, session, depth + 1, report)?;
                    } else {
                        tracing::warn!(path = %target.display(), "Sourced file not found");
                    }
                }
                Directive::Conditional {
                    test,
                    then,
                    otherwise,
                } => {
                    let branch = if test.evaluate(session) { then } else { otherwise };
                    self.apply(branch, session, depth, report)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_reports_missing_file() {
        let err = load_config(Path::new("/nonexistent/envboot/profile")).unwrap_err();
        assert!(matches!(err, ProfileError::Read { .. }));
    }

    #[test]
    fn load_config_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken");
        std::fs::write(&path, "if [ -f x ]; then\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ProfileError::Parse { .. }));
    }

    #[test]
    fn self_sourcing_profile_stops_at_depth_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop");
        std::fs::write(&path, format!("COUNT=x$COUNT\n. {}\n", path.display())).unwrap();

        let loader = ProfileLoader::new(&ProfilesConfig {
            max_source_depth: 3,
            ..ProfilesConfig::default()
        })
        .with_optional_files(vec![path.clone()]);

        let mut session = SessionState::new();
        let report = loader.initialize_session(&mut session).unwrap();
        assert_eq!(session.lookup("COUNT"), Some("xxxx"));
        assert_eq!(report.sourced.len(), 4);
        assert_eq!(report.failed.len(), 1);

        let mut strict_session = SessionState::new();
        let err = loader
            .strict(true)
            .initialize_session(&mut strict_session)
            .unwrap_err();
        assert!(matches!(err, ProfileError::SourceDepth { limit: 3, .. }));
        // Defaults are registered even when strict mode fails.
        assert_eq!(strict_session.aliases().len(), builtin::ALIASES.len());
    }
}
