//! Configuration loading
//!
//! The YAML file at `$XDG_CONFIG_HOME/domains/config.yaml` (falling back to
//! `~/.config/domains/config.yaml`) is read first; a missing file is an
//! empty configuration. Environment variables then override the file.
//!
//! ## Environment
//!
//! - `CLOUDFLARE_API_TOKEN`: scoped API token
//! - `CLOUDFLARE_API_KEY` / `CLOUDFLARE_EMAIL`: global API key and account email
//! - `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`: Route53
//! - `AWS_PROFILE`: shared profile used when no Route53 key is set (default `default`)
//! - `AWS_SHARED_CREDENTIALS_FILE` / `AWS_CONFIG_FILE`: shared file locations,
//!   defaulting to `~/.aws/credentials` and `~/.aws/config`
//! - `DOMAINS_WHOIS_TIMEOUT_SECS`: WHOIS lookup timeout
//! - `DOMAINS_LOG_LEVEL`: trace, debug, info, warn (default) or error

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use domains_core::InventoryConfig;
use ini::Ini;
use tracing::{debug, warn, Level};

/// Default config file location, if a home directory can be found
pub fn config_path() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .map(|base| base.join("domains").join("config.yaml"))
}

/// Load the file, apply environment overrides and validate
pub fn load() -> Result<InventoryConfig> {
    let mut config = match config_path() {
        Some(path) => load_file(&path)?,
        None => InventoryConfig::default(),
    };

    let lookup = |key: &str| std::env::var(key).ok();
    apply_env(&mut config, lookup)?;
    apply_aws_profile(&mut config, lookup, dirs::home_dir().as_deref());
    config.validate()?;
    Ok(config)
}

/// Parse a YAML config file; a missing or empty file yields the defaults
pub fn load_file(path: &Path) -> Result<InventoryConfig> {
    if !path.exists() {
        return Ok(InventoryConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(InventoryConfig::default());
    }

    serde_yaml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Override `config` with environment values looked up through `lookup`
///
/// Empty values are ignored.
pub fn apply_env(
    config: &mut InventoryConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(token) = var("CLOUDFLARE_API_TOKEN") {
        config.cloudflare.api_token = Some(token);
    }
    if let Some(key) = var("CLOUDFLARE_API_KEY") {
        config.cloudflare.api_key = Some(key);
    }
    if let Some(email) = var("CLOUDFLARE_EMAIL") {
        config.cloudflare.email = Some(email);
    }

    if let Some(id) = var("AWS_ACCESS_KEY_ID") {
        config.route53.access_key_id = Some(id);
    }
    if let Some(secret) = var("AWS_SECRET_ACCESS_KEY") {
        config.route53.secret_access_key = Some(secret);
    }
    if let Some(token) = var("AWS_SESSION_TOKEN") {
        config.route53.session_token = Some(token);
    }

    if let Some(secs) = var("DOMAINS_WHOIS_TIMEOUT_SECS") {
        config.whois.timeout_secs = secs.trim().parse().with_context(|| {
            format!("DOMAINS_WHOIS_TIMEOUT_SECS must be a number of seconds. Got: {secs}")
        })?;
    }

    Ok(())
}

/// Route53 keys read from an AWS shared profile
#[derive(Debug, PartialEq, Eq)]
struct AwsProfile {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

/// Fill Route53 credentials from the AWS shared credentials and config files
///
/// Only applies when neither key was set by the config file or environment.
/// The profile is `AWS_PROFILE`, or `default`. The credentials file wins over
/// the config file. Missing files are skipped; unreadable ones are logged.
pub fn apply_aws_profile(
    config: &mut InventoryConfig,
    lookup: impl Fn(&str) -> Option<String>,
    home: Option<&Path>,
) {
    let route53 = &mut config.route53;
    if route53.access_key_id.is_some() || route53.secret_access_key.is_some() {
        return;
    }

    let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    let profile = var("AWS_PROFILE").unwrap_or_else(|| "default".to_string());
    let aws_dir = home.map(|home| home.join(".aws"));

    let credentials_file = var("AWS_SHARED_CREDENTIALS_FILE")
        .map(PathBuf::from)
        .or_else(|| aws_dir.as_ref().map(|dir| dir.join("credentials")));
    let config_file = var("AWS_CONFIG_FILE")
        .map(PathBuf::from)
        .or_else(|| aws_dir.as_ref().map(|dir| dir.join("config")));

    // The config file prefixes every section but the default with "profile "
    let config_section = if profile == "default" {
        profile.clone()
    } else {
        format!("profile {profile}")
    };

    let candidates = [
        (credentials_file, profile.as_str()),
        (config_file, config_section.as_str()),
    ];
    let found = candidates.iter().find_map(|(path, section)| {
        let path = path.as_deref()?;
        read_profile(path, section).map(|keys| (path, keys))
    });

    if let Some((path, keys)) = found {
        debug!("Using AWS profile '{}' from {}", profile, path.display());
        route53.access_key_id = Some(keys.access_key_id);
        route53.secret_access_key = Some(keys.secret_access_key);
        if route53.session_token.is_none() {
            route53.session_token = keys.session_token;
        }
    }
}

/// Keys of `section` in the INI file at `path`, if both keys are present
fn read_profile(path: &Path, section: &str) -> Option<AwsProfile> {
    if !path.exists() {
        return None;
    }

    let ini = match Ini::load_from_file(path) {
        Ok(ini) => ini,
        Err(e) => {
            warn!("Ignoring unreadable AWS file {}: {}", path.display(), e);
            return None;
        }
    };

    let props = ini.section(Some(section))?;
    let get = |key: &str| {
        props
            .get(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    Some(AwsProfile {
        access_key_id: get("aws_access_key_id")?,
        secret_access_key: get("aws_secret_access_key")?,
        session_token: get("aws_session_token"),
    })
}

/// Log level from `DOMAINS_LOG_LEVEL`, defaulting to warn
pub fn log_level(value: Option<&str>) -> Result<Level> {
    match value.map(|v| v.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("warn") => Ok(Level::WARN),
        Some("trace") => Ok(Level::TRACE),
        Some("debug") => Ok(Level::DEBUG),
        Some("info") => Ok(Level::INFO),
        Some("error") => Ok(Level::ERROR),
        Some(other) => anyhow::bail!(
            "DOMAINS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            other
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_file(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, InventoryConfig::default());
        assert!(!config.cloudflare.is_configured());
        assert!(!config.route53.is_configured());
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "cloudflare:\n  api_token: cf-token\n\
             route53:\n  access_key_id: AKID\n  secret_access_key: secret\n\
             whois:\n  timeout_secs: 3\n\
             certificates:\n  port: 8443"
        )
        .unwrap();

        let config = load_file(file.path()).unwrap();

        assert_eq!(config.cloudflare.api_token.as_deref(), Some("cf-token"));
        assert!(config.route53.is_configured());
        assert_eq!(config.whois.timeout_secs, 3);
        assert_eq!(config.certificates.port, 8443);
        assert_eq!(config.certificates.connect_timeout_secs, 5);
    }

    #[test]
    fn test_empty_file_is_empty_config() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(load_file(file.path()).unwrap(), InventoryConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cloudflare: [not, a, map]").unwrap();
        assert!(load_file(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = InventoryConfig::default();
        config.cloudflare.api_token = Some("from-file".to_string());

        apply_env(
            &mut config,
            env(&[
                ("CLOUDFLARE_API_TOKEN", "from-env"),
                ("AWS_ACCESS_KEY_ID", "AKID"),
                ("AWS_SECRET_ACCESS_KEY", "secret"),
                ("AWS_SESSION_TOKEN", "session"),
                ("DOMAINS_WHOIS_TIMEOUT_SECS", "7"),
            ]),
        )
        .unwrap();

        assert_eq!(config.cloudflare.api_token.as_deref(), Some("from-env"));
        assert_eq!(config.route53.session_token.as_deref(), Some("session"));
        assert!(config.route53.is_configured());
        assert_eq!(config.whois.timeout_secs, 7);
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = InventoryConfig::default();
        config.cloudflare.api_token = Some("from-file".to_string());

        apply_env(&mut config, env(&[("CLOUDFLARE_API_TOKEN", "  ")])).unwrap();

        assert_eq!(config.cloudflare.api_token.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_global_key_from_env() {
        let mut config = InventoryConfig::default();
        apply_env(
            &mut config,
            env(&[
                ("CLOUDFLARE_API_KEY", "key"),
                ("CLOUDFLARE_EMAIL", "ops@example.com"),
            ]),
        )
        .unwrap();
        assert!(config.cloudflare.is_configured());
    }

    #[test]
    fn test_invalid_whois_timeout() {
        let mut config = InventoryConfig::default();
        let err = apply_env(&mut config, env(&[("DOMAINS_WHOIS_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("DOMAINS_WHOIS_TIMEOUT_SECS"));
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_aws_default_profile_from_home() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir(home.path().join(".aws")).unwrap();
        write_file(
            &home.path().join(".aws"),
            "credentials",
            "[default]\naws_access_key_id = AKIDDEFAULT\naws_secret_access_key = s3cret\n",
        );

        let mut config = InventoryConfig::default();
        apply_aws_profile(&mut config, env(&[]), Some(home.path()));

        assert!(config.route53.is_configured());
        assert_eq!(config.route53.access_key_id.as_deref(), Some("AKIDDEFAULT"));
        assert_eq!(config.route53.session_token, None);
    }

    #[test]
    fn test_aws_named_profile_is_selected() {
        let dir = tempfile::tempdir().unwrap();
        let credentials = write_file(
            dir.path(),
            "credentials",
            "[default]\naws_access_key_id = AKIDDEFAULT\naws_secret_access_key = one\n\n\
             [ops]\naws_access_key_id = AKIDOPS\naws_secret_access_key = two\n\
             aws_session_token = tok\n",
        );

        let mut config = InventoryConfig::default();
        apply_aws_profile(
            &mut config,
            env(&[
                ("AWS_PROFILE", "ops"),
                ("AWS_SHARED_CREDENTIALS_FILE", credentials.to_str().unwrap()),
            ]),
            None,
        );

        assert_eq!(config.route53.access_key_id.as_deref(), Some("AKIDOPS"));
        assert_eq!(config.route53.secret_access_key.as_deref(), Some("two"));
        assert_eq!(config.route53.session_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_aws_config_file_uses_profile_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let aws_config = write_file(
            dir.path(),
            "config",
            "[profile ops]\nregion = us-east-1\n\
             aws_access_key_id = AKIDCFG\naws_secret_access_key = cfg\n",
        );

        let mut config = InventoryConfig::default();
        apply_aws_profile(
            &mut config,
            env(&[
                ("AWS_PROFILE", "ops"),
                ("AWS_SHARED_CREDENTIALS_FILE", "/nonexistent/credentials"),
                ("AWS_CONFIG_FILE", aws_config.to_str().unwrap()),
            ]),
            None,
        );

        assert_eq!(config.route53.access_key_id.as_deref(), Some("AKIDCFG"));
    }

    #[test]
    fn test_env_keys_take_precedence_over_profile() {
        let dir = tempfile::tempdir().unwrap();
        let credentials = write_file(
            dir.path(),
            "credentials",
            "[default]\naws_access_key_id = AKIDFILE\naws_secret_access_key = file\n",
        );
        let lookup = env(&[
            ("AWS_ACCESS_KEY_ID", "AKIDENV"),
            ("AWS_SECRET_ACCESS_KEY", "env"),
            ("AWS_SHARED_CREDENTIALS_FILE", credentials.to_str().unwrap()),
        ]);

        let mut config = InventoryConfig::default();
        apply_env(&mut config, &lookup).unwrap();
        apply_aws_profile(&mut config, &lookup, None);

        assert_eq!(config.route53.access_key_id.as_deref(), Some("AKIDENV"));
        assert_eq!(config.route53.secret_access_key.as_deref(), Some("env"));
    }

    #[test]
    fn test_missing_aws_files_leave_route53_unconfigured() {
        let home = tempfile::tempdir().unwrap();
        let mut config = InventoryConfig::default();
        apply_aws_profile(&mut config, env(&[("AWS_PROFILE", "ops")]), Some(home.path()));
        assert!(!config.route53.is_configured());
    }

    #[test]
    fn test_profile_without_secret_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let credentials = write_file(
            dir.path(),
            "credentials",
            "[default]\naws_access_key_id = AKIDONLY\n",
        );

        let mut config = InventoryConfig::default();
        apply_aws_profile(
            &mut config,
            env(&[("AWS_SHARED_CREDENTIALS_FILE", credentials.to_str().unwrap())]),
            None,
        );

        assert_eq!(config.route53.access_key_id, None);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(None).unwrap(), Level::WARN);
        assert_eq!(log_level(Some("DEBUG")).unwrap(), Level::DEBUG);
        assert_eq!(log_level(Some("error")).unwrap(), Level::ERROR);
        assert!(log_level(Some("loud")).is_err());
    }
}
