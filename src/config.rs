//! Configuration loading for `sandboxd`.
//!
//! Loads [`EngineConfig`] from a TOML file or string, then expands any
//! `${VAR}` references in the docker connection override so a deployment can
//! keep secrets and host-specific values out of the checked-in config file.

pub mod schema;

pub use schema::*;

use std::path::Path;

use anyhow::{Context, Result};

/// Loads engine configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file can't be read, isn't valid TOML, or doesn't
/// match [`EngineConfig`]'s schema.
///
/// # Example
///
/// ```no_run
/// use sandboxd::config::load_config;
/// use std::path::Path;
///
/// let config = load_config(Path::new("sandboxd.toml"))?;
/// println!("listening on port {}", config.server.port);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    load_config_str(&content)
}

/// Loads engine configuration from a TOML string.
///
/// Useful for tests and for embedding configuration without a file on disk.
pub fn load_config_str(content: &str) -> Result<EngineConfig> {
    let mut config: EngineConfig = toml::from_str(content).context("failed to parse config")?;

    if let Some(host) = &config.docker.docker_host {
        config.docker.docker_host = Some(
            expand_env_value(host)
                .map_err(|e| anyhow::anyhow!("failed to expand docker.docker_host: {e}"))?,
        );
    }

    Ok(config)
}

/// Expands environment variable references in a string value.
///
/// Syntax:
/// - `${VAR}` - required, fails if VAR is not set
/// - `${VAR:-default}` - optional, uses "default" if VAR not set
/// - `$$` - escaped dollar sign (becomes single `$`)
///
/// # Errors
/// Returns an error if a required variable is not set.
fn expand_env_value(value: &str) -> Result<String, String> {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' {
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();

                    let mut var_content = String::new();
                    let mut found_close = false;

                    for c in chars.by_ref() {
                        if c == '}' {
                            found_close = true;
                            break;
                        }
                        var_content.push(c);
                    }

                    if !found_close {
                        return Err(format!("unclosed variable reference: ${{{var_content}"));
                    }

                    let (var_name, default_value) = if let Some(idx) = var_content.find(":-") {
                        let (name, rest) = var_content.split_at(idx);
                        (name, Some(&rest[2..]))
                    } else {
                        (var_content.as_str(), None)
                    };

                    if var_name.is_empty() {
                        return Err("empty variable name in ${}".to_string());
                    }

                    match std::env::var(var_name) {
                        Ok(val) => result.push_str(&val),
                        Err(_) => {
                            if let Some(default) = default_value {
                                result.push_str(default);
                            } else {
                                return Err(format!(
                                    "required environment variable not set: {var_name}"
                                ));
                            }
                        }
                    }
                }
                _ => result.push('$'),
            }
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_env_value_no_variables() {
        assert_eq!(expand_env_value("hello world").unwrap(), "hello world");
    }

    #[test]
    fn expand_env_value_escaped_dollar() {
        assert_eq!(expand_env_value("price is $$100").unwrap(), "price is $100");
    }

    #[test]
    fn expand_env_value_unclosed_brace() {
        let result = expand_env_value("${VAR");
        assert!(matches!(&result, Err(e) if e.contains("unclosed variable reference")));
    }

    #[test]
    fn expand_env_value_empty_var_name() {
        let result = expand_env_value("${}");
        assert!(matches!(&result, Err(e) if e.contains("empty variable name")));
    }

    #[test]
    fn expand_env_value_var_unset_without_default_errors() {
        let result = expand_env_value("${_SANDBOXD_TEST_NONEXISTENT_VAR}");
        assert!(result.is_err());
    }

    #[test]
    fn expand_env_value_default_used_when_unset() {
        let result = expand_env_value("${_SANDBOXD_TEST_MISSING:-fallback}").unwrap();
        assert_eq!(result, "fallback");
    }

    #[test]
    fn load_config_str_applies_defaults() {
        let config = load_config_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.sandbox.default_image, "shellm-sandbox:latest");
    }

    #[test]
    fn load_config_str_expands_docker_host() {
        unsafe {
            std::env::set_var("_SANDBOXD_TEST_DOCKER_HOST", "tcp://10.0.0.5:2375");
        }
        let config = load_config_str(
            r#"
                [docker]
                docker_host = "${_SANDBOXD_TEST_DOCKER_HOST}"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.docker.docker_host.as_deref(),
            Some("tcp://10.0.0.5:2375")
        );
        unsafe {
            std::env::remove_var("_SANDBOXD_TEST_DOCKER_HOST");
        }
    }
}
