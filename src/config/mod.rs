mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use cinedex_common::SourceKind;

/// Environment variables that override `catalog.api_key`, in priority order.
const API_KEY_VARS: [&str; 2] = ["CATALOG_API_KEY", "TMDB_API_KEY"];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    prepare(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = ["./cinedex.toml", "~/.config/cinedex/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    let mut config = Config::default();
    prepare(&mut config);
    Ok(config)
}

fn prepare(config: &mut Config) {
    apply_env_overrides(config);

    config.database.path = expand(&config.database.path);
    for source in &mut config.sources {
        if let Some(mount) = &source.mount_point {
            source.mount_point = Some(expand(mount));
        }
        if source.kind == SourceKind::Local {
            source.paths = source
                .paths
                .iter()
                .map(|p| shellexpand::tilde(p).into_owned())
                .collect();
        }
    }
}

fn apply_env_overrides(config: &mut Config) {
    if let Some(key) = API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|key| !key.is_empty())
    {
        config.catalog.api_key = key;
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

/// Validate configuration
///
/// A missing catalog API key is accepted here; it fails when the catalog is
/// first used.
fn validate_config(config: &Config) -> Result<()> {
    if config.catalog.max_concurrent_requests == 0 {
        anyhow::bail!("catalog.max_concurrent_requests must be at least 1");
    }

    let mut seen = HashSet::new();
    for source in &config.sources {
        if !seen.insert(source.id.as_str()) {
            anyhow::bail!("Duplicate source id '{}'", source.id);
        }

        if source.paths.is_empty() {
            anyhow::bail!("Source '{}' has no paths to scan", source.id);
        }

        match source.kind {
            SourceKind::Local => {
                for path in &source.paths {
                    if !Path::new(path).exists() {
                        tracing::warn!(source_id = %source.id, path = %path, "Source path does not exist");
                    }
                }
            }
            SourceKind::Webdav => {
                if source.url.as_deref().unwrap_or_default().is_empty() {
                    anyhow::bail!("WebDAV source '{}' has no url", source.id);
                }
            }
            SourceKind::Smb => {
                if source.url.as_deref().unwrap_or_default().is_empty() {
                    anyhow::bail!("SMB source '{}' has no url", source.id);
                }
                if source.mount_point.is_none() {
                    anyhow::bail!("SMB source '{}' has no mount_point", source.id);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<Config> {
        let mut config: Config = toml::from_str(toml)?;
        prepare(&mut config);
        validate_config(&config)?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.catalog.max_concurrent_requests, 4);
        assert_eq!(config.catalog.min_request_interval_ms, 250);
        assert_eq!(config.scanner.max_concurrent_listings, 16);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
            [database]
            path = "/var/lib/cinedex/library.sqlite"

            [catalog]
            language = "de-DE"
            max_concurrent_requests = 2

            [[sources]]
            id = "nas"
            name = "NAS"
            kind = "webdav"
            url = "https://nas.local/dav"
            username = "me"
            paths = ["/Movies", "/TV"]

            [[sources]]
            id = "share"
            kind = "smb"
            url = "smb://server/media"
            mount_point = "/mnt/media"
            paths = ["/"]
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].kind, SourceKind::Webdav);
        assert_eq!(config.sources[0].display_name(), "NAS");
        assert_eq!(config.sources[1].display_name(), "share");
        assert_eq!(config.catalog.gateway_settings().max_concurrent_requests, 2);
    }

    #[test]
    fn test_missing_api_key_is_not_an_error() {
        assert!(parse("[catalog]\napi_key = \"\"").is_ok());
    }

    #[test]
    fn test_rejects_duplicate_source_ids() {
        let err = parse(
            r#"
            [[sources]]
            id = "a"
            kind = "local"
            paths = ["/tmp"]

            [[sources]]
            id = "a"
            kind = "local"
            paths = ["/tmp"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Duplicate source id"));
    }

    #[test]
    fn test_rejects_source_without_paths() {
        let err = parse("[[sources]]\nid = \"a\"\nkind = \"local\"").unwrap_err();
        assert!(err.to_string().contains("no paths"));
    }

    #[test]
    fn test_rejects_webdav_without_url() {
        let err = parse("[[sources]]\nid = \"a\"\nkind = \"webdav\"\npaths = [\"/\"]").unwrap_err();
        assert!(err.to_string().contains("no url"));
    }

    #[test]
    fn test_rejects_smb_without_mount_point() {
        let err = parse(
            "[[sources]]\nid = \"a\"\nkind = \"smb\"\nurl = \"smb://h/s\"\npaths = [\"/\"]",
        )
        .unwrap_err();
        assert!(err.to_string().contains("mount_point"));
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        assert!(parse("[catalog]\nmax_concurrent_requests = 0").is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cinedex.toml");
        std::fs::write(&path, "[scanner]\nmax_concurrent_listings = 3\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.scanner.max_concurrent_listings, 3);
        assert!(load_config(&dir.path().join("missing.toml")).is_err());
    }
}
