use std::fmt;
use std::path::{Path, PathBuf};

use revpub_types::error::{Result, RevpubError};

use super::types::RevpubConfig;

pub const CONFIG_ENV_VAR: &str = "REVPUB_CONFIG";
const PROJECT_CONFIG: &str = "revpub.yaml";

/// Where the config file was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CliArg(PathBuf),
    EnvVar(PathBuf),
    Project(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::CliArg(p) | ConfigSource::EnvVar(p) | ConfigSource::Project(p) => p,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::CliArg(p) => write!(f, "{} (--config)", p.display()),
            ConfigSource::EnvVar(p) => write!(f, "{} ({CONFIG_ENV_VAR})", p.display()),
            ConfigSource::Project(p) => write!(f, "{} (project)", p.display()),
        }
    }
}

/// Priority: `--config` > `$REVPUB_CONFIG` > `./revpub.yaml` if present.
pub fn resolve_config_path(cli_config: Option<&str>) -> Option<ConfigSource> {
    if let Some(path) = cli_config {
        return Some(ConfigSource::CliArg(PathBuf::from(path)));
    }
    if let Ok(val) = std::env::var(CONFIG_ENV_VAR) {
        if !val.is_empty() {
            return Some(ConfigSource::EnvVar(PathBuf::from(val)));
        }
    }
    let project = PathBuf::from(PROJECT_CONFIG);
    project.exists().then_some(ConfigSource::Project(project))
}

/// Read, expand and validate a config file.
pub fn load_config(path: &Path) -> Result<RevpubConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| RevpubError::Config(format!("cannot read '{}': {e}", path.display())))?;
    parse_config(&contents, path)
}

/// Parse config text; `path` is only used in error messages.
pub fn parse_config(contents: &str, path: &Path) -> Result<RevpubConfig> {
    let expanded = expand_env_placeholders(contents, path)?;
    let config: RevpubConfig = serde_yaml::from_str(&expanded)
        .map_err(|e| RevpubError::Config(format!("invalid config '{}': {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

pub fn minimal_config_template() -> &'static str {
    r#"# revpub configuration file

repository:
  url: file:///path/to/store
  # username: builder
  # retrieve_revision: 42

publish:
  alias: false
  alias_folder: LATEST
  cleanup_publish_folder: false
  pattern: "[organisation]/[module]/[revision]/[artifact]"
  # temp_prefix: revpubtemp
"#
}

/// Expand `${VAR}` and `${VAR:-default}` placeholders in raw config text.
fn expand_env_placeholders(input: &str, path: &Path) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;

    while let Some(offset) = input[cursor..].find("${") {
        let start = cursor + offset;
        out.push_str(&input[cursor..start]);

        let token_start = start + 2;
        let Some(token_len) = input[token_start..].find('}') else {
            return Err(expand_error(
                path,
                input,
                start,
                "unterminated environment placeholder",
            ));
        };
        let token = &input[token_start..token_start + token_len];
        out.push_str(&resolve_env_token(token, path, input, start)?);
        cursor = token_start + token_len + 1;
    }

    out.push_str(&input[cursor..]);
    Ok(out)
}

fn resolve_env_token(token: &str, path: &Path, input: &str, start: usize) -> Result<String> {
    let (name, default) = match token.split_once(":-") {
        Some((name, default)) => (name, Some(default)),
        None => (token, None),
    };
    if !is_valid_env_var_name(name) {
        return Err(expand_error(
            path,
            input,
            start,
            format!("invalid environment placeholder '{token}'"),
        ));
    }

    match (std::env::var(name), default) {
        (Ok(value), Some(default)) if value.is_empty() => Ok(default.to_string()),
        (Ok(value), _) => Ok(value),
        (Err(std::env::VarError::NotPresent), Some(default)) => Ok(default.to_string()),
        (Err(std::env::VarError::NotPresent), None) => Err(expand_error(
            path,
            input,
            start,
            format!("environment variable '{name}' is not set"),
        )),
        (Err(std::env::VarError::NotUnicode(_)), _) => Err(expand_error(
            path,
            input,
            start,
            format!("environment variable '{name}' is not valid UTF-8"),
        )),
    }
}

fn is_valid_env_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn expand_error(path: &Path, input: &str, start: usize, message: impl fmt::Display) -> RevpubError {
    let (line, column) = line_col(input, start);
    RevpubError::Config(format!(
        "invalid config '{}': {message} at line {line}, column {column}",
        path.display()
    ))
}

fn line_col(input: &str, byte_offset: usize) -> (usize, usize) {
    let before = &input[..byte_offset];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rsplit_once('\n')
        .map(|(_, tail)| tail)
        .unwrap_or(before)
        .chars()
        .count()
        + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests that mutate process-global state (env vars, CWD) must be serialized.
    static GLOBAL_STATE: Mutex<()> = Mutex::new(());

    /// Sets an env var and restores its previous value on drop.
    struct EnvGuard {
        key: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, val: &str) -> Self {
            let prev = std::env::var(key).ok();
            std::env::set_var(key, val);
            Self { key, prev }
        }

        fn unset(key: &'static str) -> Self {
            let prev = std::env::var(key).ok();
            std::env::remove_var(key);
            Self { key, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    fn parse(yaml: &str) -> Result<RevpubConfig> {
        parse_config(yaml, Path::new("test.yaml"))
    }

    #[test]
    fn minimal_template_parses() {
        let cfg = parse(minimal_config_template()).unwrap();
        assert_eq!(cfg.repository.url, "file:///path/to/store");
        assert!(!cfg.publish.alias);
    }

    #[test]
    fn publish_section_is_optional() {
        let cfg = parse("repository:\n  url: mem://repo\n").unwrap();
        assert_eq!(cfg.publish.alias_folder, "LATEST");
        assert_eq!(cfg.repository.username, None);
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = parse("repository:\n  url: mem://repo\n  colour: blue\n").unwrap_err();
        assert!(err.to_string().contains("colour"), "unexpected error: {err}");
    }

    #[test]
    fn alias_without_cleanup_rejected_at_load() {
        let yaml = "repository:\n  url: mem://repo\npublish:\n  alias: true\n";
        assert!(matches!(parse(yaml), Err(RevpubError::Config(_))));
    }

    #[test]
    fn env_placeholders_expand() {
        let _lock = GLOBAL_STATE.lock().unwrap();
        let _guard = EnvGuard::set("REVPUB_TEST_USER", "builder");
        let _unset = EnvGuard::unset("REVPUB_TEST_UNSET");
        let yaml = "repository:\n  url: ${REVPUB_TEST_UNSET:-mem://fallback}\n  username: ${REVPUB_TEST_USER}\n";
        let cfg = parse(yaml).unwrap();
        assert_eq!(cfg.repository.url, "mem://fallback");
        assert_eq!(cfg.repository.username.as_deref(), Some("builder"));
    }

    #[test]
    fn unset_placeholder_reports_position() {
        let _lock = GLOBAL_STATE.lock().unwrap();
        let _unset = EnvGuard::unset("REVPUB_TEST_MISSING");
        let yaml = "repository:\n  url: ${REVPUB_TEST_MISSING}\n";
        let msg = parse(yaml).unwrap_err().to_string();
        assert!(msg.contains("REVPUB_TEST_MISSING"), "unexpected error: {msg}");
        assert!(msg.contains("line 2, column 8"), "unexpected error: {msg}");
    }

    #[test]
    fn unterminated_placeholder_rejected() {
        let msg = parse("repository:\n  url: ${OOPS\n").unwrap_err().to_string();
        assert!(msg.contains("unterminated"), "unexpected error: {msg}");
    }

    #[test]
    fn cli_arg_wins() {
        let source = resolve_config_path(Some("/tmp/override.yaml")).unwrap();
        assert!(matches!(source, ConfigSource::CliArg(_)));
        assert_eq!(source.path(), Path::new("/tmp/override.yaml"));
    }

    #[test]
    fn env_var_used_without_cli_arg() {
        let _lock = GLOBAL_STATE.lock().unwrap();
        let _guard = EnvGuard::set(CONFIG_ENV_VAR, "/tmp/env-config.yaml");
        let source = resolve_config_path(None).unwrap();
        assert_eq!(source, ConfigSource::EnvVar(PathBuf::from("/tmp/env-config.yaml")));
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(load_config(Path::new("/nonexistent/revpub.yaml")).is_err());
    }
}
