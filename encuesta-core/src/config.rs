use std::fmt;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::EncuestaError;
use crate::export::QuoteStyle;
use crate::form::CONFIRMATION_DISPLAY;

/// Prefix for environment overrides, e.g. `ENCUESTA__BACKEND__ANON_KEY`.
pub const ENV_PREFIX: &str = "ENCUESTA";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EncuestaConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub form: FormConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Hosted response table. `url` and `anon_key` have no built-in values and
/// must come from the config file or the environment.
#[derive(Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

fn default_table() -> String {
    "voting_responses".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            table: default_table(),
            request_timeout_seconds: None,
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.anon_key.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &key)
            .field("table", &self.table)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    /// Public base URL; the landing page's QR code points at `<base_url>/votar`.
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExportConfig {
    /// Offset applied to `created_at` before rendering dates, in minutes east of UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub quote_style: QuoteStyle,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FormConfig {
    pub confirmation_seconds: u64,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            confirmation_seconds: CONFIRMATION_DISPLAY.as_secs(),
        }
    }
}

impl EncuestaConfig {
    /// Load from an optional TOML file, then apply `ENCUESTA__*` environment overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX).separator("__"))
    }

    pub fn load_with_env(path: &str, env: Environment) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(env)
            .build()?;
        s.try_deserialize()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        s.try_deserialize()
    }

    /// The remote store cannot be reached without both an endpoint and a key.
    pub fn validate_backend(&self) -> Result<(), EncuestaError> {
        if self.backend.url.trim().is_empty() {
            return Err(EncuestaError::MissingSetting("backend.url"));
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(EncuestaError::MissingSetting("backend.anon_key"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_file_is_empty() {
        let config = EncuestaConfig::from_toml_str("").unwrap();
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.backend.table, "voting_responses");
        assert!(config.backend.url.is_empty());
        assert_eq!(config.form.confirmation_seconds, CONFIRMATION_DISPLAY.as_secs());
        assert_eq!(config.export.quote_style, QuoteStyle::Verbatim);
        assert_eq!(config.service.log_level, "info");
    }

    #[test]
    fn test_parses_full_file() {
        let config = EncuestaConfig::from_toml_str(
            r#"
            [http]
            host = "0.0.0.0"
            port = 9000

            [backend]
            url = "https://example.supabase.co"
            anon_key = "anon"
            request_timeout_seconds = 15

            [site]
            base_url = "https://demo.example.com"

            [export]
            utc_offset_minutes = 60
            quote_style = "escaped"
            "#,
        )
        .unwrap();

        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.backend.request_timeout_seconds, Some(15));
        assert_eq!(config.site.base_url, "https://demo.example.com");
        assert_eq!(config.export.utc_offset_minutes, 60);
        assert_eq!(config.export.quote_style, QuoteStyle::Escaped);
        assert!(config.validate_backend().is_ok());
    }

    #[test]
    fn test_environment_overrides_backend() {
        let mut vars = HashMap::new();
        vars.insert("ENCUESTA__BACKEND__URL".to_string(), "https://env.supabase.co".to_string());
        vars.insert("ENCUESTA__BACKEND__ANON_KEY".to_string(), "env-key".to_string());
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .source(Some(vars));

        let config = EncuestaConfig::load_with_env("does-not-exist.toml", env).unwrap();
        assert_eq!(config.backend.url, "https://env.supabase.co");
        assert_eq!(config.backend.anon_key, "env-key");
    }

    #[test]
    fn test_validate_backend_requires_url_and_key() {
        let mut config = EncuestaConfig::default();
        match config.validate_backend() {
            Err(EncuestaError::MissingSetting(name)) => assert_eq!(name, "backend.url"),
            other => panic!("Expected MissingSetting, got {:?}", other),
        }

        config.backend.url = "https://example.supabase.co".to_string();
        config.backend.anon_key = "   ".to_string();
        match config.validate_backend() {
            Err(EncuestaError::MissingSetting(name)) => assert_eq!(name, "backend.anon_key"),
            other => panic!("Expected MissingSetting, got {:?}", other),
        }
    }

    #[test]
    fn test_debug_redacts_anon_key() {
        let mut backend = BackendConfig::default();
        backend.anon_key = "super-secret".to_string();
        let rendered = format!("{:?}", backend);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
