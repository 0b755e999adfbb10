//! Configuration management for archive-timeline.
//!
//! Configuration is loaded once at startup with figment (defaults, TOML file,
//! environment) and then handed around as an immutable value.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "archive-timeline";

/// Prefix for environment overrides, e.g. `ARCHIVE_TIMELINE_SERVER__PORT`.
const ENV_PREFIX: &str = "ARCHIVE_TIMELINE_";

/// Placeholder shown instead of the access token.
const REDACTED: &str = "********";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables prefixed with `ARCHIVE_TIMELINE_` (`__` nests)
/// 2. `AIRTABLE_BASE_ID`, `AIRTABLE_TABLE_ID`, `AIRTABLE_ACCESS_TOKEN`, `PORT`
/// 3. TOML config file at `~/.config/archive-timeline/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream records API.
    pub upstream: UpstreamConfig,
    /// Gateway listener and static hosting.
    pub server: ServerConfig,
    /// Fetch client settings.
    pub client: ClientConfig,
    /// Map view and layer styling.
    pub map: MapConfig,
}

/// Upstream records API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// API root, without a trailing slash.
    pub api_url: String,
    /// Base identifier.
    pub base_id: String,
    /// Table identifier.
    pub table_id: String,
    /// Bearer token attached to every upstream call.
    pub access_token: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Gateway configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Prebuilt frontend bundle. Static hosting is skipped when unset or missing.
    pub static_dir: Option<PathBuf>,
}

/// Fetch client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Gateway root the client talks to.
    pub gateway_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Map configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Initial center as `[longitude, latitude]`.
    pub center: [f64; 2],
    /// Initial zoom.
    pub zoom: f64,
    /// Record field whose value names the dataset a record belongs to.
    /// All records share one dataset when unset.
    pub dataset_field: Option<String>,
    /// Point layer paint.
    pub circle: CircleStyle,
}

/// Paint for a point layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleStyle {
    /// Radius in pixels.
    pub radius: f64,
    /// Fill color.
    pub color: String,
    /// Stroke width in pixels.
    pub stroke_width: f64,
    /// Stroke color.
    pub stroke_color: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.airtable.com/v0".to_string(),
            base_id: String::new(),
            table_id: String::new(),
            access_token: String::new(),
            timeout_secs: 30,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            static_dir: Some(PathBuf::from("client/build")),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:5000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [34.376_849_284_234_62, 31.425_424_890_670_165],
            zoom: 10.0,
            dataset_field: None,
            circle: CircleStyle::default(),
        }
    }
}

impl Default for CircleStyle {
    fn default() -> Self {
        Self {
            radius: 6.0,
            color: "#007cbf".to_string(),
            stroke_width: 1.0,
            stroke_color: "#ffffff".to_string(),
        }
    }
}

/// Maps the unprefixed variables the deployment already sets.
fn legacy_env_key(name: &str) -> Option<&'static str> {
    match name.to_ascii_uppercase().as_str() {
        "AIRTABLE_BASE_ID" => Some("upstream.base_id"),
        "AIRTABLE_TABLE_ID" => Some("upstream.table_id"),
        "AIRTABLE_ACCESS_TOKEN" => Some("upstream.access_token"),
        "PORT" => Some("server.port"),
        _ => None,
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(&config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Provider stack, lowest precedence first.
    fn figment(config_file: &std::path::Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::raw().filter_map(|key| legacy_env_key(key.as_str()).map(Into::into)))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate values that every command depends on.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.upstream.timeout_secs == 0 {
            return Err(Error::config("upstream.timeout_secs must be greater than 0"));
        }

        if self.client.timeout_secs == 0 {
            return Err(Error::config("client.timeout_secs must be greater than 0"));
        }

        if self.upstream.api_url.trim().is_empty() {
            return Err(Error::config("upstream.api_url must not be empty"));
        }

        let [lon, lat] = self.map.center;
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(Error::config(format!(
                "map.center ({lon}, {lat}) is outside longitude/latitude range"
            )));
        }

        if !(0.0..=24.0).contains(&self.map.zoom) {
            return Err(Error::config(format!(
                "map.zoom ({}) must be between 0 and 24",
                self.map.zoom
            )));
        }

        if self.map.circle.radius <= 0.0 {
            return Err(Error::config("map.circle.radius must be greater than 0"));
        }

        Ok(())
    }

    /// Validate the values the gateway cannot start without.
    ///
    /// # Errors
    ///
    /// Returns an error naming every missing upstream value.
    pub fn validate_upstream(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("base_id", &self.upstream.base_id),
            ("table_id", &self.upstream.table_id),
            ("access_token", &self.upstream.access_token),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::config(format!(
                "missing required upstream values: {}",
                missing.join(", ")
            )))
        }
    }

    /// Load `config_file` and check everything `serve` needs.
    ///
    /// Unlike [`Config::load_from`], a missing file is an error rather than
    /// an empty layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, does not parse, or leaves any
    /// value invalid or unset.
    pub fn validate_file(config_file: &std::path::Path) -> Result<Self> {
        if !config_file.is_file() {
            return Err(Error::config(format!(
                "{} does not exist",
                config_file.display()
            )));
        }
        let config = Self::load_from(Some(config_file.to_path_buf()))?;
        config.validate_upstream()?;
        Ok(config)
    }

    /// Full upstream table URL.
    #[must_use]
    pub fn upstream_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.upstream.api_url.trim_end_matches('/'),
            self.upstream.base_id,
            self.upstream.table_id
        )
    }

    /// Get the upstream timeout as a Duration.
    #[must_use]
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs)
    }

    /// Get the client timeout as a Duration.
    #[must_use]
    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client.timeout_secs)
    }

    /// Listener address as `host:port`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// A copy safe to print: the access token is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.upstream.access_token.is_empty() {
            copy.upstream.access_token = REDACTED.to_string();
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Config {
        let mut config = Config::default();
        config.upstream.base_id = "appBase".to_string();
        config.upstream.table_id = "tblTable".to_string();
        config.upstream.access_token = "patSecret".to_string();
        config
    }

    #[test]
    fn test_default_upstream_config() {
        let upstream = UpstreamConfig::default();

        assert_eq!(upstream.api_url, "https://api.airtable.com/v0");
        assert!(upstream.base_id.is_empty());
        assert!(upstream.access_token.is_empty());
        assert_eq!(upstream.timeout_secs, 30);
    }

    #[test]
    fn test_default_server_config() {
        let server = ServerConfig::default();

        assert_eq!(server.port, 5000);
        assert_eq!(server.static_dir, Some(PathBuf::from("client/build")));
    }

    #[test]
    fn test_default_map_config() {
        let map = MapConfig::default();

        assert!((map.zoom - 10.0).abs() < f64::EPSILON);
        assert!(map.dataset_field.is_none());
        assert!((map.circle.radius - 6.0).abs() < f64::EPSILON);
        assert_eq!(map.circle.color, "#007cbf");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.upstream.timeout_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("upstream.timeout_secs"));
    }

    #[test]
    fn test_validate_center_out_of_range() {
        let mut config = Config::default();
        config.map.center = [200.0, 0.0];

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("map.center"));
    }

    #[test]
    fn test_validate_zoom_out_of_range() {
        let mut config = Config::default();
        config.map.zoom = 30.0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_upstream_names_every_missing_value() {
        let err = Config::default().validate_upstream().unwrap_err().to_string();
        assert!(err.contains("base_id"));
        assert!(err.contains("table_id"));
        assert!(err.contains("access_token"));

        let mut config = complete();
        config.upstream.table_id = "  ".to_string();
        let err = config.validate_upstream().unwrap_err().to_string();
        assert!(err.contains("table_id"));
        assert!(!err.contains("base_id"));
    }

    #[test]
    fn test_validate_upstream_complete() {
        assert!(complete().validate_upstream().is_ok());
    }

    #[test]
    fn test_upstream_url() {
        let mut config = complete();
        assert_eq!(
            config.upstream_url(),
            "https://api.airtable.com/v0/appBase/tblTable"
        );

        config.upstream.api_url = "http://127.0.0.1:9000/v0/".to_string();
        assert_eq!(config.upstream_url(), "http://127.0.0.1:9000/v0/appBase/tblTable");
    }

    #[test]
    fn test_bind_addr() {
        assert_eq!(Config::default().bind_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn test_timeouts() {
        let config = Config::default();
        assert_eq!(config.upstream_timeout(), Duration::from_secs(30));
        assert_eq!(config.client_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_redacted_masks_token() {
        let config = complete();
        let redacted = config.redacted();

        assert_eq!(redacted.upstream.access_token, REDACTED);
        assert_eq!(redacted.upstream.base_id, "appBase");
        assert_eq!(config.upstream.access_token, "patSecret");

        let json = serde_json::to_string(&redacted).unwrap();
        assert!(!json.contains("patSecret"));
    }

    #[test]
    fn test_redacted_leaves_empty_token_empty() {
        assert!(Config::default().redacted().upstream.access_token.is_empty());
    }

    #[test]
    fn test_legacy_env_key() {
        assert_eq!(legacy_env_key("AIRTABLE_BASE_ID"), Some("upstream.base_id"));
        assert_eq!(legacy_env_key("airtable_table_id"), Some("upstream.table_id"));
        assert_eq!(legacy_env_key("PORT"), Some("server.port"));
        assert_eq!(legacy_env_key("HOME"), None);
    }

    #[test]
    fn test_load_from_toml_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [upstream]
                base_id = "appFromFile"
                table_id = "tblFromFile"

                [map]
                dataset_field = "Incident_Type"
                "#,
            )?;
            jail.set_env("AIRTABLE_ACCESS_TOKEN", "patFromEnv");
            jail.set_env("AIRTABLE_TABLE_ID", "tblLegacy");
            jail.set_env("ARCHIVE_TIMELINE_UPSTREAM__TABLE_ID", "tblPrefixed");
            jail.set_env("PORT", "8080");

            let config = Config::load_from(Some(PathBuf::from("config.toml")))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.upstream.base_id, "appFromFile");
            assert_eq!(config.upstream.table_id, "tblPrefixed");
            assert_eq!(config.upstream.access_token, "patFromEnv");
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.map.dataset_field.as_deref(), Some("Incident_Type"));
            assert!(config.validate_upstream().is_ok());
            Ok(())
        });
    }

    #[test]
    fn test_load_nonexistent_config_uses_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_validate_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "partial.toml",
                r#"
                [upstream]
                base_id = "appFromFile"
                "#,
            )?;
            let err = Config::validate_file(std::path::Path::new("partial.toml")).unwrap_err();
            assert!(err.to_string().contains("table_id"));
            assert!(err.to_string().contains("access_token"));

            let err = Config::validate_file(std::path::Path::new("missing.toml")).unwrap_err();
            assert!(err.to_string().contains("missing.toml"));

            jail.create_file(
                "bad.toml",
                r#"
                [client]
                timeout_secs = 0
                "#,
            )?;
            assert!(Config::validate_file(std::path::Path::new("bad.toml")).is_err());

            jail.create_file(
                "complete.toml",
                r#"
                [upstream]
                base_id = "appFromFile"
                table_id = "tblFromFile"
                access_token = "patFromFile"
                "#,
            )?;
            let config = Config::validate_file(std::path::Path::new("complete.toml"))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.upstream.table_id, "tblFromFile");
            Ok(())
        });
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("archive-timeline"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
