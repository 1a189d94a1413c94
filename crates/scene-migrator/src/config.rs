//! Migrator configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables and command-line flags (see [`crate::cli`]). Each
//! source is a [`ConfigLayer`]; [`ConfigLayer::resolve`] produces the final
//! [`MigratorConfig`].

use crate::error::ConfigError;
use scene_api::{ClientConfig, Credential, Position};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Service endpoint used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// Tiananmen Square, Beijing: longitude, latitude, height
pub const DEFAULT_FALLBACK_POSITION: Position = Position::new(116.397128, 39.908802, 100.0);

/// Fully resolved migrator configuration
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Service base URL, endpoint paths are appended to it
    pub base_url: String,
    /// Static bearer token
    pub credential: Credential,
    /// Position written to every object with an unset position
    pub fallback_position: Position,
    /// Per-request timeout; `None` keeps the HTTP client default
    pub request_timeout: Option<Duration>,
    /// Report qualifying objects without updating them
    pub dry_run: bool,
    /// Treat an explicit `[0, 0, 0]` like a missing position
    pub treat_origin_as_unset: bool,
}

impl MigratorConfig {
    /// Create configuration with default fallback and policy
    #[inline]
    #[must_use]
    pub fn new(base_url: impl Into<String>, credential: Credential) -> Self {
        Self {
            base_url: base_url.into(),
            credential,
            fallback_position: DEFAULT_FALLBACK_POSITION,
            request_timeout: None,
            dry_run: false,
            treat_origin_as_unset: true,
        }
    }

    /// With fallback position
    #[inline]
    #[must_use]
    pub fn with_fallback_position(mut self, position: Position) -> Self {
        self.fallback_position = position;
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// With dry run
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// With origin policy
    #[inline]
    #[must_use]
    pub fn with_treat_origin_as_unset(mut self, enabled: bool) -> Self {
        self.treat_origin_as_unset = enabled;
        self
    }

    /// Check invariants that would otherwise fail mid-run
    ///
    /// # Errors
    /// - `ConfigError::EmptyBaseUrl`
    /// - `ConfigError::MissingCredential` for a blank token
    /// - `ConfigError::NonFiniteFallback`
    /// - `ConfigError::ZeroTimeout`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if self.credential.is_blank() {
            return Err(ConfigError::MissingCredential);
        }
        if self.request_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::ZeroTimeout);
        }
        if !self.fallback_position.is_finite() {
            return Err(ConfigError::NonFiniteFallback(
                self.fallback_position.to_string(),
            ));
        }
        Ok(())
    }

    /// Connection settings for the HTTP client
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(self.base_url.clone(), self.credential.clone());
        match self.request_timeout {
            Some(timeout) => config.with_timeout(timeout),
            None => config,
        }
    }
}

/// One partial source of configuration
///
/// Also the schema of the TOML config file:
///
/// ```toml
/// base_url = "http://localhost:5000/api"
/// credential = "eyJhbGciOi..."
/// fallback_position = [116.397128, 39.908802, 100.0]
/// request_timeout_secs = 30
/// dry_run = false
/// treat_origin_as_unset = true
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub base_url: Option<String>,
    pub credential: Option<Credential>,
    pub fallback_position: Option<Position>,
    pub request_timeout_secs: Option<u64>,
    pub dry_run: Option<bool>,
    pub treat_origin_as_unset: Option<bool>,
}

impl ConfigLayer {
    /// Parse a layer from TOML text
    ///
    /// # Errors
    /// `ConfigError::Parse` on invalid TOML, wrong types or unknown keys
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "<inline>")
    }

    /// Read a layer from a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, otherwise as [`Self::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    /// Combine with a higher-precedence layer; set fields in `over` win
    #[must_use]
    pub fn merge(self, over: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            base_url: over.base_url.or(self.base_url),
            credential: over.credential.or(self.credential),
            fallback_position: over.fallback_position.or(self.fallback_position),
            request_timeout_secs: over.request_timeout_secs.or(self.request_timeout_secs),
            dry_run: over.dry_run.or(self.dry_run),
            treat_origin_as_unset: over.treat_origin_as_unset.or(self.treat_origin_as_unset),
        }
    }

    /// Fill unset fields with defaults and validate
    ///
    /// # Errors
    /// `ConfigError::MissingCredential` if no layer supplied a credential,
    /// otherwise as [`MigratorConfig::validate`]
    pub fn resolve(self) -> Result<MigratorConfig, ConfigError> {
        let credential = self.credential.ok_or(ConfigError::MissingCredential)?;
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut config = MigratorConfig::new(base_url, credential)
            .with_dry_run(self.dry_run.unwrap_or(false))
            .with_treat_origin_as_unset(self.treat_origin_as_unset.unwrap_or(true));
        if let Some(position) = self.fallback_position {
            config = config.with_fallback_position(position);
        }
        if let Some(secs) = self.request_timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parse `"x,y,z"` as used on the command line
///
/// # Errors
/// `ConfigError::PositionSyntax` unless the text is exactly three numbers
pub fn parse_position(text: &str) -> Result<Position, ConfigError> {
    let syntax = || ConfigError::PositionSyntax(text.to_string());

    let components = text
        .split(',')
        .map(|part| f64::from_str(part.trim()).map_err(|_| syntax()))
        .collect::<Result<Vec<_>, _>>()?;

    let components: [f64; 3] = components.try_into().map_err(|_| syntax())?;
    Ok(Position::from(components))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn new_uses_defaults() {
        let config = MigratorConfig::new(DEFAULT_BASE_URL, Credential::new("t"));
        assert_eq!(config.fallback_position, DEFAULT_FALLBACK_POSITION);
        assert!(config.treat_origin_as_unset);
        assert!(!config.dry_run);
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn default_fallback_is_beijing() {
        assert_eq!(DEFAULT_FALLBACK_POSITION.to_string(), "[116.397128, 39.908802, 100]");
    }

    #[test]
    fn resolve_requires_credential() {
        let err = ConfigLayer::default().resolve().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential));
    }

    #[test]
    fn resolve_rejects_blank_credential() {
        let layer = ConfigLayer {
            credential: Some(Credential::new("   ")),
            ..ConfigLayer::default()
        };
        assert!(matches!(layer.resolve(), Err(ConfigError::MissingCredential)));
    }

    #[test]
    fn resolve_fills_defaults() {
        let layer = ConfigLayer {
            credential: Some(Credential::new("t")),
            ..ConfigLayer::default()
        };
        let config = layer.resolve().unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.fallback_position, DEFAULT_FALLBACK_POSITION);
        assert!(config.treat_origin_as_unset);
    }

    #[test]
    fn resolve_rejects_non_finite_fallback() {
        let layer = ConfigLayer {
            credential: Some(Credential::new("t")),
            fallback_position: Some(Position::new(f64::NAN, 0.0, 0.0)),
            ..ConfigLayer::default()
        };
        assert!(matches!(layer.resolve(), Err(ConfigError::NonFiniteFallback(_))));
    }

    #[test]
    fn resolve_rejects_empty_base_url() {
        let layer = ConfigLayer {
            base_url: Some(String::new()),
            credential: Some(Credential::new("t")),
            ..ConfigLayer::default()
        };
        assert!(matches!(layer.resolve(), Err(ConfigError::EmptyBaseUrl)));
    }

    #[test]
    fn resolve_rejects_zero_timeout() {
        let layer = ConfigLayer {
            credential: Some(Credential::new("t")),
            request_timeout_secs: Some(0),
            ..ConfigLayer::default()
        };
        assert!(matches!(layer.resolve(), Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let config = MigratorConfig::new(DEFAULT_BASE_URL, Credential::new("t"))
            .with_request_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));
        assert!(config
            .with_request_timeout(Duration::from_secs(1))
            .validate()
            .is_ok());
    }

    #[test]
    fn merge_prefers_upper_layer() {
        let file = ConfigLayer {
            base_url: Some("http://file/api".to_string()),
            credential: Some(Credential::new("file-token")),
            dry_run: Some(true),
            ..ConfigLayer::default()
        };
        let flags = ConfigLayer {
            credential: Some(Credential::new("flag-token")),
            request_timeout_secs: Some(5),
            ..ConfigLayer::default()
        };

        let config = file.merge(flags).resolve().unwrap();
        assert_eq!(config.base_url, "http://file/api");
        assert_eq!(config.credential.expose(), "flag-token");
        assert!(config.dry_run);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn parse_toml() {
        let layer = ConfigLayer::from_toml_str(
            r#"
            base_url = "http://scenes.internal/api"
            credential = "abc"
            fallback_position = [1.5, 2.0, 3.0]
            request_timeout_secs = 10
            treat_origin_as_unset = false
            "#,
        )
        .unwrap();

        let config = layer.resolve().unwrap();
        assert_eq!(config.base_url, "http://scenes.internal/api");
        assert_eq!(config.fallback_position, Position::new(1.5, 2.0, 3.0));
        assert!(!config.treat_origin_as_unset);
    }

    #[test]
    fn parse_toml_rejects_unknown_keys() {
        let err = ConfigLayer::from_toml_str("token = \"abc\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn parse_toml_rejects_two_component_fallback() {
        let err = ConfigLayer::from_toml_str("fallback_position = [1.0, 2.0]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "credential = \"from-file\"").unwrap();
        writeln!(file, "dry_run = true").unwrap();

        let config = ConfigLayer::load(file.path()).unwrap().resolve().unwrap();
        assert_eq!(config.credential.expose(), "from-file");
        assert!(config.dry_run);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLayer::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn parse_position_text() {
        assert_eq!(
            parse_position("116.397128, 39.908802, 100").unwrap(),
            DEFAULT_FALLBACK_POSITION
        );
        assert_eq!(parse_position("-1,0,2.5").unwrap(), Position::new(-1.0, 0.0, 2.5));
    }

    #[test]
    fn parse_position_rejects_bad_text() {
        for text in ["", "1,2", "1,2,3,4", "a,b,c", "1;2;3"] {
            assert!(
                matches!(parse_position(text), Err(ConfigError::PositionSyntax(_))),
                "accepted {text:?}"
            );
        }
    }

    #[test]
    fn client_config_carries_timeout() {
        let config = MigratorConfig::new("http://x/api", Credential::new("t"))
            .with_request_timeout(Duration::from_secs(3));
        let client = config.client_config();
        assert_eq!(client.base_url, "http://x/api");
        assert_eq!(client.timeout, Some(Duration::from_secs(3)));
    }
}
